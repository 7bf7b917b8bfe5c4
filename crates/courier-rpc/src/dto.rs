//! Wire shapes as the backend serves them.
//!
//! Deserialization is deliberately lenient: unknown fields are ignored and
//! optional fields default, so a single malformed record in a refresh is
//! skipped instead of failing the whole response.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};

use courier_shared::{
    Chat, ChatKey, FollowStatus, Message, MessageAttachment, Participant, ParticipantKind, Sender,
};

/// Accepts both string and integer ids.
fn string_or_int<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Int(i64),
    }
    Ok(match Raw::deserialize(deserializer)? {
        Raw::Str(s) => s,
        Raw::Int(i) => i.to_string(),
    })
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParticipantDto {
    #[serde(default, deserialize_with = "string_or_int")]
    pub id: String,
    #[serde(default = "ParticipantDto::default_kind", rename = "type")]
    pub kind: ParticipantKind,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub profile_link: Option<String>,
}

impl ParticipantDto {
    fn default_kind() -> ParticipantKind {
        ParticipantKind::User
    }

    pub fn into_participant(self) -> Option<Participant> {
        if self.id.is_empty() {
            return None;
        }
        Some(Participant {
            id: self.id,
            kind: self.kind,
            display_name: self.display_name,
            avatar_ref: self.avatar,
            profile_link: self.profile_link,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttachmentDto {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub url: Option<String>,
}

impl AttachmentDto {
    pub fn into_attachment(self) -> MessageAttachment {
        MessageAttachment {
            id: self.id,
            name: self.name,
            mime_type: self.mime_type,
            url: self.url,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageDto {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub has_content: Option<bool>,
    #[serde(default)]
    pub sent_by: Option<Sender>,
    #[serde(default)]
    pub seen: bool,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub is_hidden: bool,
    #[serde(default)]
    pub attachments: Vec<AttachmentDto>,
    #[serde(default)]
    pub time_label: String,
}

impl MessageDto {
    /// Converts to the domain model; `None` for records without a usable id.
    pub fn into_message(self) -> Option<Message> {
        let id = self.id.filter(|id| *id > 0)?;
        let has_content = self.has_content.unwrap_or(!self.content.is_empty());
        Some(Message {
            id,
            has_content,
            sent_by: self.sent_by.unwrap_or(Sender::Target),
            seen: self.seen,
            sending: false,
            temporary: false,
            is_deleted: self.is_deleted,
            is_hidden: self.is_hidden,
            attachments: self
                .attachments
                .into_iter()
                .map(AttachmentDto::into_attachment)
                .collect(),
            time_label: self.time_label,
            content: self.content,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatDto {
    pub author: Option<ParticipantDto>,
    pub target: Option<ParticipantDto>,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub last_activity_label: String,
    #[serde(default = "default_true")]
    pub seen: bool,
    #[serde(default)]
    pub is_new: bool,
    #[serde(default)]
    pub follow_status: FollowStatus,
    /// Absent when the server sends a list row without message history.
    #[serde(default)]
    pub messages: Option<Vec<MessageDto>>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub last_id: i64,
    #[serde(default)]
    pub autoload: bool,
}

impl ChatDto {
    /// Converts to the domain model; `None` for rows missing a participant.
    pub fn into_chat(self) -> Option<Chat> {
        let author = self.author?.into_participant()?;
        let target = self.target?.into_participant()?;
        let mut chat = Chat::new(author, target);
        chat.excerpt = self.excerpt;
        chat.last_activity_label = self.last_activity_label;
        chat.seen = self.seen;
        chat.is_new = self.is_new;
        chat.follow_status = self.follow_status;
        chat.has_more = self.has_more;
        chat.last_id = self.last_id;
        if let Some(messages) = self.messages {
            chat.messages = messages
                .into_iter()
                .filter_map(MessageDto::into_message)
                .collect();
            chat.messages_loaded = true;
        }
        Some(chat)
    }

    pub fn key(&self) -> Option<ChatKey> {
        let author = self.author.clone()?.into_participant()?;
        let target = self.target.clone()?.into_participant()?;
        Some(ChatKey::derive(&author, &target))
    }
}

// Response envelopes. Every mutating endpoint reports logical failure as
// `success: false` plus optional user-facing text.

#[derive(Debug, Deserialize)]
pub struct ChatListEnvelope {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub list: Vec<ChatDto>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub default_chat: Option<ChatDto>,
}

#[derive(Debug, Deserialize)]
pub struct ChatPageEnvelope {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub list: Vec<MessageDto>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub follow_status: Option<FollowStatus>,
}

#[derive(Debug, Deserialize)]
pub struct SendEnvelope {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub sent: Option<MessageDto>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteEnvelope {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub is_hidden: bool,
}

#[derive(Debug, Deserialize)]
pub struct BlockEnvelope {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: i32,
}

#[derive(Debug, Deserialize)]
pub struct AckEnvelope {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// Static categorized emoji dataset, fetched once per session.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmojiDataset {
    #[serde(flatten)]
    pub categories: BTreeMap<String, Vec<EmojiDef>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmojiDef {
    pub name: String,
    pub glyph: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_message_is_skipped() {
        let raw = r#"{"success": true, "list": [
            {"id": 10, "content": "hello", "sent_by": "target"},
            {"content": "no id"},
            {"id": 11, "content": "world"}
        ], "has_more": false}"#;
        let env: ChatPageEnvelope = serde_json::from_str(raw).unwrap();
        let messages: Vec<_> = env
            .list
            .into_iter()
            .filter_map(MessageDto::into_message)
            .collect();
        assert_eq!(
            messages.iter().map(|m| m.id).collect::<Vec<_>>(),
            vec![10, 11]
        );
    }

    #[test]
    fn numeric_participant_ids_are_accepted() {
        let raw = r#"{"id": 42, "type": "post", "display_name": "Shop"}"#;
        let dto: ParticipantDto = serde_json::from_str(raw).unwrap();
        let p = dto.into_participant().unwrap();
        assert_eq!(p.id, "42");
    }

    #[test]
    fn chat_row_without_history_has_no_loaded_messages() {
        let raw = r#"{
            "author": {"id": "1", "type": "user"},
            "target": {"id": "2", "type": "user"},
            "excerpt": "hi"
        }"#;
        let dto: ChatDto = serde_json::from_str(raw).unwrap();
        let chat = dto.into_chat().unwrap();
        assert!(!chat.messages_loaded);
        assert!(chat.messages.is_empty());
    }
}
