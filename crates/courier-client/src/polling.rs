//! Activity polling and patch-merge.
//!
//! One background task per session, self-rescheduling with a trailing
//! sleep so polls never overlap. The task holds only a `Weak` reference
//! to the session and a shutdown receiver; dropping the session or
//! calling [`Session::stop_polling`] cancels it, including any in-flight
//! fetch awaited under `select!`.

use std::sync::atomic::Ordering;
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, warn};

use courier_shared::constants::PATCH_RESYNC_THRESHOLD;
use courier_shared::{Chat, Result};

use crate::session::Session;

/// Handle to the background polling task.
pub struct Poller {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Poller {
    pub(crate) fn cancel(&self) {
        let _ = self.shutdown.send(true);
        self.handle.abort();
    }
}

impl Session {
    /// Starts the activity poll loop. Idempotent: a second call while a
    /// poller is running does nothing.
    pub fn start_polling(self: &Arc<Self>) {
        let mut slot = self.poller.lock().expect("poller lock");
        if slot.is_some() {
            return;
        }
        let (shutdown, rx) = watch::channel(false);
        let frequency = Duration::from_millis(self.config.poll_frequency_ms);
        let handle = tokio::spawn(poll_loop(Arc::downgrade(self), rx, frequency));
        *slot = Some(Poller { shutdown, handle });
    }

    /// Cancels the poll loop and its pending timer.
    pub fn stop_polling(&self) {
        if let Some(poller) = self.poller.lock().expect("poller lock").take() {
            poller.cancel();
        }
    }

    /// Fetches page 1 of the chat list and merges it in: known chats are
    /// patched, unknown ones inserted. The returned set moves to the head
    /// of the list in server order; everything else keeps its relative
    /// order behind it. Nothing is ever removed by a refresh.
    pub async fn refresh_inbox(&self) -> Result<()> {
        let hint = self.state.lock().await.active.clone();
        let fetched = self
            .rpc
            .list_chats(1, hint.as_ref(), &self.config.nonce)
            .await?;

        let mut state = self.state.lock().await;
        let mut incoming = fetched.chats;
        if let Some(default_chat) = fetched.default_chat {
            if incoming.iter().all(|c| c.key != default_chat.key) {
                incoming.push(default_chat);
            }
        }

        let mut head = Vec::with_capacity(incoming.len());
        for chat in incoming {
            match state.chats.iter().position(|c| c.key == chat.key) {
                Some(pos) => {
                    let mut existing = state.chats.remove(pos);
                    patch_chat(&mut existing, chat);
                    head.push(existing);
                }
                None => head.push(chat),
            }
        }
        debug!(patched = head.len(), "Inbox refresh merged");

        let tail = std::mem::take(&mut state.chats);
        head.extend(tail);
        state.chats = head;
        Ok(())
    }
}

/// Reconciles a cached chat against a freshly fetched snapshot.
///
/// List-level fields are copied unconditionally. When both sides hold a
/// loaded message list, matched messages get their mutable flags
/// refreshed and genuinely new messages are prepended. Once the delta
/// reaches [`PATCH_RESYNC_THRESHOLD`] messages the local sublist is
/// replaced wholesale to bound the merge cost. Transient
/// client state (compose draft, processing) is never touched.
pub(crate) fn patch_chat(existing: &mut Chat, incoming: Chat) {
    existing.excerpt = incoming.excerpt;
    existing.is_new = incoming.is_new;
    existing.seen = incoming.seen;
    existing.last_activity_label = incoming.last_activity_label;
    existing.last_id = incoming.last_id;

    if !(existing.messages_loaded && incoming.messages_loaded) {
        return;
    }

    for fresh in &incoming.messages {
        if let Some(local) = existing.message_mut(fresh.id) {
            local.seen = fresh.seen;
            local.is_deleted = fresh.is_deleted;
            local.is_hidden = fresh.is_hidden;
        }
    }

    let local_max = existing.max_message_id().unwrap_or(0);
    let new_messages: Vec<_> = incoming
        .messages
        .iter()
        .filter(|m| m.id > local_max)
        .cloned()
        .collect();

    if new_messages.len() < PATCH_RESYNC_THRESHOLD {
        for message in new_messages.into_iter().rev() {
            existing.messages.insert(0, message);
        }
    } else {
        existing.messages = incoming.messages;
        existing.has_more = incoming.has_more;
    }
}

async fn poll_loop(
    session: Weak<Session>,
    mut shutdown: watch::Receiver<bool>,
    frequency: Duration,
) {
    loop {
        tokio::select! {
            _ = shutdown.changed() => return,
            _ = sleep(frequency) => {}
        }

        let Some(session) = session.upgrade() else {
            return;
        };

        // Hidden tab: skip the network call, keep the schedule.
        if !session.visible.load(Ordering::SeqCst) {
            continue;
        }

        let timestamp = Utc::now().timestamp_millis();
        let probe = tokio::select! {
            _ = shutdown.changed() => return,
            result = session
                .rpc
                .check_activity(&session.config.identity.id, timestamp) => result,
        };

        match probe {
            Ok(true) => {
                let refreshed = tokio::select! {
                    _ = shutdown.changed() => return,
                    result = session.refresh_inbox() => result,
                };
                if let Err(e) = refreshed {
                    warn!(error = %e, "Inbox refresh failed; retrying on the flat schedule");
                }
            }
            Ok(false) => {}
            // Transient and self-healing; no backoff growth, no user-facing error.
            Err(e) => debug!(error = %e, "Activity probe failed; retrying on the flat schedule"),
        }
    }
}
