use serde::{Deserialize, Serialize};

use crate::constants::FOLLOW_BLOCKED;

/// Either side of a conversation: a person or a post (business entity).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantKind {
    User,
    Post,
}

impl ParticipantKind {
    /// Single-character code used in chat keys and deep links.
    pub fn code(&self) -> char {
        match self {
            ParticipantKind::User => 'u',
            ParticipantKind::Post => 'p',
        }
    }
}

/// One participant of a chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    pub kind: ParticipantKind,
    pub display_name: String,
    pub avatar_ref: Option<String>,
    pub profile_link: Option<String>,
}

impl Participant {
    pub fn new(id: impl Into<String>, kind: ParticipantKind) -> Self {
        Self {
            id: id.into(),
            kind,
            display_name: String::new(),
            avatar_ref: None,
            profile_link: None,
        }
    }
}

/// Deterministic identity of a chat, derived from both participants.
///
/// A key never appears twice in the chat list; all merge and lookup
/// operations go through it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatKey(pub String);

impl ChatKey {
    pub fn derive(author: &Participant, target: &Participant) -> Self {
        Self(format!(
            "{}{}-{}{}",
            author.kind.code(),
            author.id,
            target.kind.code(),
            target.id
        ))
    }
}

impl std::fmt::Display for ChatKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Deep-link token published when a chat is opened.
///
/// Format: author id when the author side is a post (empty otherwise),
/// then `p` or `u` for the target kind, then the target id.
pub fn deep_link_token(author: &Participant, target: &Participant) -> String {
    let author_part = match author.kind {
        ParticipantKind::Post => author.id.as_str(),
        ParticipantKind::User => "",
    };
    format!("{}{}{}", author_part, target.kind.code(), target.id)
}

/// Block/mute relationship flags between the two participants.
///
/// `author` is writable by this client (block toggle); `target` is
/// server-controlled and read-only here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowStatus {
    pub author: i32,
    pub target: i32,
}

impl FollowStatus {
    pub fn author_blocked(&self) -> bool {
        self.author == FOLLOW_BLOCKED
    }

    pub fn target_blocked(&self) -> bool {
        self.target == FOLLOW_BLOCKED
    }
}
