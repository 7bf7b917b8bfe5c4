use reqwest::multipart;
use serde_json::json;
use tracing::debug;

use async_trait::async_trait;

use courier_shared::{
    Chat, ChatKey, CourierError, Message, Participant, Result,
};

use crate::api::{ChatList, ChatRpc, DeleteOutcome, MessagePage, OutgoingFile, OutgoingMessage};
use crate::dto::{
    AckEnvelope, BlockEnvelope, ChatDto, ChatListEnvelope, ChatPageEnvelope, DeleteEnvelope,
    EmojiDataset, SendEnvelope,
};

/// Production [`ChatRpc`] over HTTP.
pub struct HttpRpc {
    http: reqwest::Client,
    base_url: String,
    activity_url: String,
}

impl HttpRpc {
    pub fn new(base_url: impl Into<String>, activity_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            activity_url: activity_url.into(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T> {
        let resp = self
            .http
            .post(self.endpoint(path))
            .json(&body)
            .send()
            .await
            .map_err(transport)?;
        resp.json::<T>().await.map_err(transport)
    }
}

fn transport(e: reqwest::Error) -> CourierError {
    CourierError::Transport(e.to_string())
}

fn server_error(message: Option<String>) -> CourierError {
    CourierError::Server(message.unwrap_or_else(|| "request rejected".to_string()))
}

fn participant_fields(prefix: &str, p: &Participant) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    map.insert(format!("{prefix}_type"), json!(p.kind.code().to_string()));
    map.insert(format!("{prefix}_id"), json!(p.id));
    serde_json::Value::Object(map)
}

fn merge(mut base: serde_json::Value, extra: serde_json::Value) -> serde_json::Value {
    if let (Some(base_map), Some(extra_map)) = (base.as_object_mut(), extra.as_object()) {
        for (k, v) in extra_map {
            base_map.insert(k.clone(), v.clone());
        }
    }
    base
}

#[async_trait]
impl ChatRpc for HttpRpc {
    async fn list_chats(
        &self,
        page: u32,
        load_hint: Option<&ChatKey>,
        nonce: &str,
    ) -> Result<ChatList> {
        let mut body = json!({ "page": page, "nonce": nonce });
        if let Some(hint) = load_hint {
            body = merge(body, json!({ "load_hint": hint.0 }));
        }
        let env: ChatListEnvelope = self.post_json("chats/list", body).await?;
        if !env.success {
            return Err(server_error(env.message));
        }

        let autoload = env
            .list
            .iter()
            .find(|dto| dto.autoload)
            .and_then(ChatDto::key);
        let chats: Vec<Chat> = env.list.into_iter().filter_map(ChatDto::into_chat).collect();
        debug!(page, count = chats.len(), "Fetched chat list page");

        Ok(ChatList {
            chats,
            has_more: env.has_more,
            default_chat: env.default_chat.and_then(ChatDto::into_chat),
            autoload,
        })
    }

    async fn load_chat(
        &self,
        author: &Participant,
        target: &Participant,
        cursor: Option<i64>,
        nonce: &str,
    ) -> Result<MessagePage> {
        let mut body = merge(
            participant_fields("author", author),
            participant_fields("target", target),
        );
        body = merge(body, json!({ "nonce": nonce }));
        if let Some(cursor) = cursor {
            body = merge(body, json!({ "cursor": cursor }));
        }
        let env: ChatPageEnvelope = self.post_json("chats/load", body).await?;
        if !env.success {
            return Err(server_error(env.message));
        }
        Ok(MessagePage {
            messages: env
                .list
                .into_iter()
                .filter_map(crate::dto::MessageDto::into_message)
                .collect(),
            has_more: env.has_more,
            follow_status: env.follow_status,
        })
    }

    async fn send_message(
        &self,
        sender: &Participant,
        receiver: &Participant,
        outgoing: OutgoingMessage,
        nonce: &str,
    ) -> Result<Message> {
        let mut form = multipart::Form::new()
            .text("sender_type", sender.kind.code().to_string())
            .text("sender_id", sender.id.clone())
            .text("receiver_type", receiver.kind.code().to_string())
            .text("receiver_id", receiver.id.clone())
            .text("content", outgoing.content)
            .text("nonce", nonce.to_string());

        for file in outgoing.files {
            form = match file {
                OutgoingFile::Upload {
                    name,
                    mime_type,
                    data,
                } => {
                    let part = multipart::Part::bytes(data)
                        .file_name(name)
                        .mime_str(&mime_type)
                        .map_err(|e| CourierError::Transport(e.to_string()))?;
                    form.part("files[]", part)
                }
                OutgoingFile::Reference { id } => form.text("existing[]", id),
            };
        }

        let resp = self
            .http
            .post(self.endpoint("messages/send"))
            .multipart(form)
            .send()
            .await
            .map_err(transport)?;
        let env: SendEnvelope = resp.json().await.map_err(transport)?;
        if !env.success {
            return Err(server_error(env.message));
        }
        env.sent
            .and_then(crate::dto::MessageDto::into_message)
            .ok_or_else(|| CourierError::Server("send acknowledged without a message".into()))
    }

    async fn delete_message(
        &self,
        deleter: &Participant,
        message_id: i64,
        nonce: &str,
    ) -> Result<DeleteOutcome> {
        let body = merge(
            participant_fields("deleter", deleter),
            json!({ "message_id": message_id, "nonce": nonce }),
        );
        let env: DeleteEnvelope = self.post_json("messages/delete", body).await?;
        if !env.success {
            return Err(server_error(env.message));
        }
        Ok(DeleteOutcome {
            is_deleted: env.is_deleted,
            is_hidden: env.is_hidden,
        })
    }

    async fn block_chat(
        &self,
        author: &Participant,
        target: &Participant,
        unblock: bool,
        nonce: &str,
    ) -> Result<i32> {
        let mut body = merge(
            participant_fields("author", author),
            participant_fields("target", target),
        );
        body = merge(body, json!({ "unblock": unblock, "nonce": nonce }));
        let env: BlockEnvelope = self.post_json("chats/block", body).await?;
        if !env.success {
            return Err(server_error(env.message));
        }
        Ok(env.status)
    }

    async fn clear_conversation(
        &self,
        author: &Participant,
        target: &Participant,
        nonce: &str,
    ) -> Result<()> {
        let mut body = merge(
            participant_fields("author", author),
            participant_fields("target", target),
        );
        body = merge(body, json!({ "nonce": nonce }));
        let env: AckEnvelope = self.post_json("chats/clear", body).await?;
        if !env.success {
            return Err(server_error(env.message));
        }
        Ok(())
    }

    async fn search_chats(&self, term: &str, nonce: &str) -> Result<Vec<Chat>> {
        let env: ChatListEnvelope = self
            .post_json("chats/search", json!({ "term": term, "nonce": nonce }))
            .await?;
        if !env.success {
            return Err(server_error(env.message));
        }
        Ok(env.list.into_iter().filter_map(ChatDto::into_chat).collect())
    }

    async fn check_activity(&self, user_id: &str, timestamp: i64) -> Result<bool> {
        let resp = self
            .http
            .get(&self.activity_url)
            .query(&[("user_id", user_id), ("t", &timestamp.to_string())])
            .send()
            .await
            .map_err(transport)?;
        let body = resp.text().await.map_err(transport)?;
        // The probe is bare text: "1" means new activity, anything else none.
        Ok(body.trim() == "1")
    }

    async fn fetch_emoji_dataset(&self, url: &str) -> Result<EmojiDataset> {
        let resp = self.http.get(url).send().await.map_err(transport)?;
        resp.json::<EmojiDataset>().await.map_err(transport)
    }
}
