//! Active-conversation operations: older-page loading, block toggle,
//! clear, message deletion. Destructive actions go through the host's
//! [`Confirm`](crate::Confirm) gate before any request is issued.

use tracing::{debug, info, warn};

use courier_shared::{CourierError, Result};

use crate::session::Session;

impl Session {
    /// Loads the next older message page for the active chat. The cursor
    /// is the oldest persisted id held; the merge never duplicates ids.
    pub async fn load_more_messages(&self) -> Result<()> {
        let (author, target, cursor) = {
            let state = self.state.lock().await;
            let chat = state
                .active_chat()
                .ok_or_else(|| CourierError::State("no active chat".into()))?;
            if !chat.has_more {
                return Ok(());
            }
            (chat.author.clone(), chat.target.clone(), chat.min_message_id())
        };

        let page = self
            .rpc
            .load_chat(&author, &target, cursor, &self.config.nonce)
            .await?;

        let mut state = self.state.lock().await;
        if let Some(chat) = state.active_chat_mut() {
            // Older messages append at the tail of the newest-first list.
            for message in page.messages {
                if chat.messages.iter().all(|m| m.id != message.id) {
                    chat.messages.push(message);
                }
            }
            chat.has_more = page.has_more;
            debug!(chat = %chat.key, total = chat.messages.len(), "Older page merged");
        }
        Ok(())
    }

    /// Flips the author-side block flag for the active chat. The target
    /// side is server-controlled and never written here.
    pub async fn toggle_block(&self) -> Result<()> {
        let (author, target, key, currently_blocked) = {
            let state = self.state.lock().await;
            let chat = state
                .active_chat()
                .ok_or_else(|| CourierError::State("no active chat".into()))?;
            (
                chat.author.clone(),
                chat.target.clone(),
                chat.key.clone(),
                chat.follow_status.author_blocked(),
            )
        };

        let prompt = if currently_blocked {
            "Unblock this conversation?"
        } else {
            "Block this conversation?"
        };
        if !self.confirm.confirm(prompt).await {
            return Ok(());
        }

        let status = self
            .rpc
            .block_chat(&author, &target, currently_blocked, &self.config.nonce)
            .await?;

        // Apply to the chat the request was issued for; the user may have
        // switched chats while the confirm dialog or request was pending.
        let mut state = self.state.lock().await;
        if let Some(chat) = state.chat_mut(&key) {
            chat.follow_status.author = status;
            info!(chat = %chat.key, status, "Block status updated");
        }
        Ok(())
    }

    /// Empties the active conversation on the server and locally; with
    /// `close_after` the chat is also removed from the list and closed.
    pub async fn clear_conversation(&self, close_after: bool) -> Result<()> {
        let (author, target) = {
            let state = self.state.lock().await;
            let chat = state
                .active_chat()
                .ok_or_else(|| CourierError::State("no active chat".into()))?;
            (chat.author.clone(), chat.target.clone())
        };

        if !self.confirm.confirm("Clear this conversation?").await {
            return Ok(());
        }

        self.rpc
            .clear_conversation(&author, &target, &self.config.nonce)
            .await?;

        let mut state = self.state.lock().await;
        let key = match state.active.clone() {
            Some(key) => key,
            None => return Ok(()),
        };
        if let Some(chat) = state.chat_mut(&key) {
            chat.messages.clear();
            chat.excerpt.clear();
            chat.has_more = false;
        }
        if close_after {
            state.chats.retain(|c| c.key != key);
            state.active = None;
            state.staged.clear();
            state.deep_link = None;
        }
        Ok(())
    }

    /// Deletes one message after confirmation and applies the server's
    /// resulting `is_deleted`/`is_hidden` flags.
    pub async fn delete_message(&self, message_id: i64) -> Result<()> {
        let (author, key) = {
            let state = self.state.lock().await;
            let chat = state
                .active_chat()
                .ok_or_else(|| CourierError::State("no active chat".into()))?;
            if !chat.messages.iter().any(|m| m.id == message_id) {
                warn!(message_id, "Delete requested for unknown message");
                return Ok(());
            }
            (chat.author.clone(), chat.key.clone())
        };

        if !self.confirm.confirm("Delete this message?").await {
            return Ok(());
        }

        let outcome = self
            .rpc
            .delete_message(&author, message_id, &self.config.nonce)
            .await?;

        let mut state = self.state.lock().await;
        if let Some(message) = state
            .chat_mut(&key)
            .and_then(|chat| chat.message_mut(message_id))
        {
            message.is_deleted = outcome.is_deleted;
            message.is_hidden = outcome.is_hidden;
        }
        Ok(())
    }
}
