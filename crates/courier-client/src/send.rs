//! Optimistic send with server reconciliation.
//!
//! A send inserts a placeholder message immediately, clears the compose
//! area, and reconciles once the server answers: the placeholder is
//! swapped for the canonical message on success, or removed (with the
//! draft restored) on failure. Concurrent sends each get an independent
//! placeholder; ordering between them is not serialized.

use tracing::{debug, error};

use courier_rpc::{OutgoingFile, OutgoingMessage};
use courier_shared::{
    AttachmentSource, ChatKey, CourierError, Message, MessageAttachment, PreviewRef, Result,
    Sender, StagedAttachment,
};

use crate::session::Session;

fn preview_attachment(staged: &StagedAttachment) -> MessageAttachment {
    MessageAttachment {
        id: staged.server_id.clone(),
        name: staged.name.clone(),
        mime_type: staged.mime_type.clone(),
        url: match &staged.preview {
            PreviewRef::Remote(url) => Some(url.clone()),
            PreviewRef::Local(preview) => Some(preview.token().to_string()),
        },
    }
}

fn outgoing_file(staged: &StagedAttachment) -> Option<OutgoingFile> {
    match staged.source {
        AttachmentSource::NewUpload => Some(OutgoingFile::Upload {
            name: staged.name.clone(),
            mime_type: staged.mime_type.clone(),
            data: staged.data.as_ref()?.as_ref().clone(),
        }),
        AttachmentSource::Existing => Some(OutgoingFile::Reference {
            id: staged.server_id.clone()?,
        }),
    }
}

impl Session {
    /// Sends the active chat's compose draft plus any staged attachments.
    ///
    /// No-op unless the trimmed draft is non-empty or at least one
    /// attachment is staged.
    pub async fn send_message(&self) -> Result<()> {
        // Phase 1: optimistic state, before any network traffic.
        let (author, target, temp_id, content, staged) = {
            let mut state = self.state.lock().await;
            let staged_empty = state.staged.is_empty();
            let chat = state
                .active_chat()
                .ok_or_else(|| CourierError::State("no active chat".into()))?;
            let content = chat.compose_draft.trim().to_string();
            if content.is_empty() && staged_empty {
                return Ok(());
            }
            let author = chat.author.clone();
            let target = chat.target.clone();

            let temp_id = state.next_temp_id();
            let staged = std::mem::take(&mut state.staged);
            let temp = Message {
                id: temp_id,
                has_content: !content.is_empty(),
                content: content.clone(),
                sent_by: Sender::Author,
                seen: false,
                sending: true,
                temporary: true,
                is_deleted: false,
                is_hidden: false,
                attachments: staged.iter().map(preview_attachment).collect(),
                time_label: String::new(),
            };

            if let Some(chat) = state.active_chat_mut() {
                chat.messages.insert(0, temp);
                chat.compose_draft.clear();
                chat.processing = true;
            }
            (author, target, temp_id, content, staged)
        };

        let outgoing = OutgoingMessage {
            content: content.clone(),
            files: staged.iter().filter_map(outgoing_file).collect(),
        };

        let result = self
            .rpc
            .send_message(&author, &target, outgoing, &self.config.nonce)
            .await;

        // Phase 2: reconcile against the chat the send originated from;
        // the user may have opened another chat while the request was in
        // flight.
        let key = ChatKey::derive(&author, &target);
        match result {
            Ok(canonical) => {
                let consumed: Vec<String> =
                    staged.iter().map(|s| s.staging_id.clone()).collect();
                self.staging.release(&consumed);

                let mut state = self.state.lock().await;
                if state.chat(&key).is_none() {
                    return Ok(());
                }
                if let Some(chat) = state.chat_mut(&key) {
                    chat.messages.retain(|m| m.id != temp_id);
                    // A poll may have delivered the canonical copy already.
                    if chat.messages.iter().all(|m| m.id != canonical.id) {
                        chat.messages.insert(0, canonical.clone());
                    }
                    chat.excerpt = canonical.content.clone();
                    chat.last_activity_label = canonical.time_label.clone();
                    chat.last_id = chat.last_id.max(canonical.id);
                    chat.processing = false;
                    debug!(chat = %chat.key, id = canonical.id, "Send reconciled");
                }
                // Most recent activity moves to the head of the list.
                if let Some(pos) = state.chats.iter().position(|c| c.key == key) {
                    let chat = state.chats.remove(pos);
                    state.chats.insert(0, chat);
                }
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Send failed; rolling back");
                let mut state = self.state.lock().await;
                if let Some(chat) = state.chat_mut(&key) {
                    chat.messages.retain(|m| m.id != temp_id);
                    chat.compose_draft = content;
                    chat.processing = false;
                }
                // Staged attachments are not restored; the cache still holds
                // them, so re-picking the same file reuses the entries.
                Err(e)
            }
        }
    }
}
