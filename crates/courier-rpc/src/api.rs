use async_trait::async_trait;

use courier_shared::{Chat, ChatKey, FollowStatus, Message, Participant, Result};

use crate::dto::EmojiDataset;

/// One page of the chat list.
#[derive(Debug, Default)]
pub struct ChatList {
    pub chats: Vec<Chat>,
    pub has_more: bool,
    /// Chat the server asks the client to open (autoload hint).
    pub default_chat: Option<Chat>,
    /// Key of a returned row flagged `autoload: true`.
    pub autoload: Option<ChatKey>,
}

/// One page of messages for a single chat, newest-first.
#[derive(Debug, Default)]
pub struct MessagePage {
    pub messages: Vec<Message>,
    pub has_more: bool,
    pub follow_status: Option<FollowStatus>,
}

#[derive(Debug, Clone, Copy)]
pub struct DeleteOutcome {
    pub is_deleted: bool,
    pub is_hidden: bool,
}

/// A file carried by an outgoing message.
#[derive(Debug, Clone)]
pub enum OutgoingFile {
    /// Fresh pick; the raw bytes go out as a multipart binary part.
    Upload {
        name: String,
        mime_type: String,
        data: Vec<u8>,
    },
    /// Already on the server; only the reference id is sent.
    Reference { id: String },
}

#[derive(Debug, Clone, Default)]
pub struct OutgoingMessage {
    pub content: String,
    pub files: Vec<OutgoingFile>,
}

/// The backend as the engine sees it: a handful of opaque endpoints.
///
/// Every mutating call carries the host-supplied nonce. Implementations map
/// `success: false` responses to [`CourierError::Server`] with the
/// server-provided text, and transport failures to
/// [`CourierError::Transport`].
///
/// [`CourierError::Server`]: courier_shared::CourierError::Server
/// [`CourierError::Transport`]: courier_shared::CourierError::Transport
#[async_trait]
pub trait ChatRpc: Send + Sync {
    /// Fetches one page of the chat list. `load_hint` names a chat the
    /// server should include (and may flag for autoload).
    async fn list_chats(
        &self,
        page: u32,
        load_hint: Option<&ChatKey>,
        nonce: &str,
    ) -> Result<ChatList>;

    /// Fetches messages for one chat, strictly older than `cursor` when set.
    async fn load_chat(
        &self,
        author: &Participant,
        target: &Participant,
        cursor: Option<i64>,
        nonce: &str,
    ) -> Result<MessagePage>;

    async fn send_message(
        &self,
        sender: &Participant,
        receiver: &Participant,
        outgoing: OutgoingMessage,
        nonce: &str,
    ) -> Result<Message>;

    async fn delete_message(
        &self,
        deleter: &Participant,
        message_id: i64,
        nonce: &str,
    ) -> Result<DeleteOutcome>;

    /// Blocks or unblocks the target; returns the new author-side status.
    async fn block_chat(
        &self,
        author: &Participant,
        target: &Participant,
        unblock: bool,
        nonce: &str,
    ) -> Result<i32>;

    async fn clear_conversation(
        &self,
        author: &Participant,
        target: &Participant,
        nonce: &str,
    ) -> Result<()>;

    async fn search_chats(&self, term: &str, nonce: &str) -> Result<Vec<Chat>>;

    /// Lightweight activity probe: `true` when the server reports new
    /// activity for this user since the last check.
    async fn check_activity(&self, user_id: &str, timestamp: i64) -> Result<bool>;

    /// Fetches the static categorized emoji dataset.
    async fn fetch_emoji_dataset(&self, url: &str) -> Result<EmojiDataset>;
}
