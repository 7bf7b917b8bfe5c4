use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::types::{ChatKey, FollowStatus, Participant};

/// Which side of the conversation produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    Author,
    Target,
}

/// An attachment as it appears on a delivered message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageAttachment {
    pub id: Option<String>,
    pub name: String,
    pub mime_type: String,
    pub url: Option<String>,
}

/// One message in a conversation.
///
/// Server-assigned ids are positive and monotonically increasing per chat.
/// Optimistic placeholders carry negative session-local ids until the server
/// acknowledges the send.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    /// Pre-rendered for display.
    pub content: String,
    pub has_content: bool,
    pub sent_by: Sender,
    pub seen: bool,
    pub sending: bool,
    pub temporary: bool,
    pub is_deleted: bool,
    pub is_hidden: bool,
    pub attachments: Vec<MessageAttachment>,
    pub time_label: String,
}

impl Message {
    pub fn is_temp(&self) -> bool {
        self.temporary || self.id < 0
    }
}

/// One conversation thread.
///
/// `messages` is newest-first. `compose_draft` and `processing` are
/// transient client state and never come from the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub key: ChatKey,
    pub author: Participant,
    pub target: Participant,
    pub excerpt: String,
    pub last_activity_label: String,
    pub seen: bool,
    pub is_new: bool,
    pub follow_status: FollowStatus,
    pub messages: Vec<Message>,
    /// Whether a message page has ever been fetched for this chat.
    pub messages_loaded: bool,
    pub has_more: bool,
    /// Highest message id the server reported for this chat.
    pub last_id: i64,
    #[serde(skip)]
    pub compose_draft: String,
    #[serde(skip)]
    pub processing: bool,
}

impl Chat {
    pub fn new(author: Participant, target: Participant) -> Self {
        let key = ChatKey::derive(&author, &target);
        Self {
            key,
            author,
            target,
            excerpt: String::new(),
            last_activity_label: String::new(),
            seen: true,
            is_new: false,
            follow_status: FollowStatus::default(),
            messages: Vec::new(),
            messages_loaded: false,
            has_more: false,
            last_id: 0,
            compose_draft: String::new(),
            processing: false,
        }
    }

    /// Pagination cursor: the oldest (minimum) persisted message id held.
    pub fn min_message_id(&self) -> Option<i64> {
        self.messages
            .iter()
            .filter(|m| !m.is_temp())
            .map(|m| m.id)
            .min()
    }

    /// Highest persisted message id held locally.
    pub fn max_message_id(&self) -> Option<i64> {
        self.messages
            .iter()
            .filter(|m| !m.is_temp())
            .map(|m| m.id)
            .max()
    }

    pub fn message_mut(&mut self, id: i64) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id == id)
    }
}

/// Where a staged attachment came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentSource {
    /// Picked from disk; the binary is uploaded with the send.
    NewUpload,
    /// Already on the server; only its reference id is sent.
    Existing,
}

/// Locally owned preview resource for a fresh upload.
///
/// Must be released explicitly when the staging entry is discarded; holding
/// clones keeps the shared released flag observable for callers.
#[derive(Debug, Clone)]
pub struct LocalPreview {
    token: String,
    released: Arc<AtomicBool>,
}

impl LocalPreview {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            released: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn release(&self) {
        self.released.store(true, Ordering::SeqCst);
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

/// Preview shown for a staged attachment.
#[derive(Debug, Clone)]
pub enum PreviewRef {
    Local(LocalPreview),
    Remote(String),
}

/// A file staged for sending but not yet sent.
#[derive(Debug, Clone)]
pub struct StagedAttachment {
    pub source: AttachmentSource,
    pub staging_id: String,
    /// Server id, present only for `Existing` attachments.
    pub server_id: Option<String>,
    pub name: String,
    pub mime_type: String,
    pub size: u64,
    pub last_modified: i64,
    pub preview: PreviewRef,
    /// Raw bytes for `NewUpload`; the staging cache owns these until the
    /// send consumes them.
    pub data: Option<Arc<Vec<u8>>>,
}

impl StagedAttachment {
    /// Releases the locally owned preview, if any.
    pub fn release_preview(&self) {
        if let PreviewRef::Local(preview) = &self.preview {
            preview.release();
        }
    }
}

/// A file handed in by the host (drag-drop, picker).
#[derive(Debug, Clone)]
pub struct FileInput {
    pub name: String,
    pub mime_type: String,
    /// Part of the dedup identity tuple together with name, mime type
    /// and `last_modified`.
    pub size: u64,
    pub last_modified: i64,
    pub data: Vec<u8>,
}
