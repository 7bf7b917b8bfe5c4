//! Shared session state and the engine facade.
//!
//! A [`Session`] is created once per client and handed to the host UI.
//! All state lives behind one async mutex; operations take the lock for
//! short synchronous sections only and never hold it across a network
//! await, so concurrent sends and polls interleave freely.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use tokio::sync::Mutex;

use courier_rpc::ChatRpc;
use courier_shared::{Chat, ChatKey, StagedAttachment};

use crate::config::ClientConfig;
use crate::emoji::EmojiStore;
use crate::polling::Poller;
use crate::staging::StagingCache;

/// Host-supplied gate for destructive actions (delete, block, clear).
///
/// Declining aborts the operation with zero state change and zero
/// network traffic.
#[async_trait]
pub trait Confirm: Send + Sync {
    async fn confirm(&self, prompt: &str) -> bool;
}

/// Approves everything. Suitable when the host renders its own gate
/// before calling into the engine.
pub struct AlwaysConfirm;

#[async_trait]
impl Confirm for AlwaysConfirm {
    async fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

/// Transient chat-list search state.
#[derive(Debug, Default, Clone)]
pub struct SearchState {
    pub term: String,
    pub results: Vec<Chat>,
    pub loading: bool,
}

/// Mutable engine state. One instance per session, behind a mutex.
#[derive(Default)]
pub struct SessionState {
    /// All known chats, head = most recently active.
    pub chats: Vec<Chat>,
    /// Key of the chat currently open, if any. At most one per session.
    pub active: Option<ChatKey>,
    /// Chat-list page cursor.
    pub list_page: u32,
    pub list_has_more: bool,
    /// Set once the server reports no further pages; enables pure
    /// client-side search.
    pub list_fully_loaded: bool,
    pub search: SearchState,
    /// Attachments staged for the active chat.
    pub staged: Vec<StagedAttachment>,
    /// Deep-link token for the active chat, published on open.
    pub deep_link: Option<String>,
    /// Monotonic counter for optimistic message ids (negative space).
    pub(crate) temp_id_counter: i64,
    /// Bumped on every search keystroke; stale debounce timers and stale
    /// responses check it and drop out.
    pub(crate) search_generation: u64,
}

impl SessionState {
    pub fn chat(&self, key: &ChatKey) -> Option<&Chat> {
        self.chats.iter().find(|c| &c.key == key)
    }

    pub fn chat_mut(&mut self, key: &ChatKey) -> Option<&mut Chat> {
        self.chats.iter_mut().find(|c| &c.key == key)
    }

    pub fn active_chat(&self) -> Option<&Chat> {
        self.active.as_ref().and_then(|key| self.chat(key))
    }

    pub fn active_chat_mut(&mut self) -> Option<&mut Chat> {
        let key = self.active.clone()?;
        self.chat_mut(&key)
    }

    pub(crate) fn next_temp_id(&mut self) -> i64 {
        self.temp_id_counter -= 1;
        self.temp_id_counter
    }
}

/// The conversation engine.
pub struct Session {
    pub(crate) rpc: Arc<dyn ChatRpc>,
    pub(crate) config: ClientConfig,
    pub(crate) state: Arc<Mutex<SessionState>>,
    pub(crate) staging: StagingCache,
    pub(crate) emoji: EmojiStore,
    pub(crate) confirm: Arc<dyn Confirm>,
    /// Whether the hosting page/tab is visible. Polling skips the network
    /// while hidden.
    pub(crate) visible: Arc<AtomicBool>,
    pub(crate) poller: StdMutex<Option<Poller>>,
}

impl Session {
    pub fn new(rpc: Arc<dyn ChatRpc>, config: ClientConfig) -> Arc<Self> {
        Self::with_confirm(rpc, config, Arc::new(AlwaysConfirm))
    }

    pub fn with_confirm(
        rpc: Arc<dyn ChatRpc>,
        config: ClientConfig,
        confirm: Arc<dyn Confirm>,
    ) -> Arc<Self> {
        let emoji = EmojiStore::new(config.recents_path.clone());
        Arc::new(Self {
            rpc,
            config,
            state: Arc::new(Mutex::new(SessionState::default())),
            staging: StagingCache::new(),
            emoji,
            confirm,
            visible: Arc::new(AtomicBool::new(true)),
            poller: StdMutex::new(None),
        })
    }

    /// The injected staging cache, shared by every attachment entry point.
    pub fn staging(&self) -> &StagingCache {
        &self.staging
    }

    pub fn set_visible(&self, visible: bool) {
        self.visible.store(visible, Ordering::SeqCst);
    }

    /// Snapshot of the chat list, head first.
    pub async fn chats(&self) -> Vec<Chat> {
        self.state.lock().await.chats.clone()
    }

    pub async fn active_chat(&self) -> Option<Chat> {
        self.state.lock().await.active_chat().cloned()
    }

    pub async fn deep_link(&self) -> Option<String> {
        self.state.lock().await.deep_link.clone()
    }

    pub async fn search_state(&self) -> SearchState {
        self.state.lock().await.search.clone()
    }

    pub async fn staged_attachments(&self) -> Vec<StagedAttachment> {
        self.state.lock().await.staged.clone()
    }

    /// Updates the compose draft of the active chat.
    pub async fn set_draft(&self, text: impl Into<String>) {
        let mut state = self.state.lock().await;
        if let Some(chat) = state.active_chat_mut() {
            chat.compose_draft = text.into();
        }
    }

    pub async fn draft(&self) -> String {
        self.state
            .lock()
            .await
            .active_chat()
            .map(|c| c.compose_draft.clone())
            .unwrap_or_default()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.poller.lock() {
            if let Some(poller) = slot.take() {
                poller.cancel();
            }
        }
    }
}
