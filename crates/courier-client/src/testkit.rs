//! Scripted `ChatRpc` double and fixture builders for engine tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use courier_rpc::{
    ChatList, ChatRpc, DeleteOutcome, EmojiDataset, MessagePage, OutgoingMessage,
};
use courier_shared::{
    Chat, ChatKey, CourierError, Message, Participant, ParticipantKind, Result, Sender,
};

use crate::config::ClientConfig;
use crate::session::Session;

/// Builds a chat between the fixed author "me" and the given target user.
pub fn chat(target_id: &str, target_name: &str) -> Chat {
    let author = Participant::new("me", ParticipantKind::User);
    let mut target = Participant::new(target_id, ParticipantKind::User);
    target.display_name = target_name.to_string();
    Chat::new(author, target)
}

pub fn message(id: i64, content: &str) -> Message {
    Message {
        id,
        content: content.to_string(),
        has_content: !content.is_empty(),
        sent_by: Sender::Target,
        seen: false,
        sending: false,
        temporary: false,
        is_deleted: false,
        is_hidden: false,
        attachments: Vec::new(),
        time_label: String::new(),
    }
}

/// `ChatRpc` double: queues of scripted responses, counters per endpoint.
/// An unscripted call on a queue-backed endpoint fails loudly.
#[derive(Default)]
pub struct MockRpc {
    list_responses: Mutex<VecDeque<Result<ChatList>>>,
    page_responses: Mutex<VecDeque<Result<MessagePage>>>,
    send_responses: Mutex<VecDeque<Result<Message>>>,
    delete_responses: Mutex<VecDeque<Result<DeleteOutcome>>>,
    block_responses: Mutex<VecDeque<Result<i32>>>,
    search_responses: Mutex<VecDeque<Result<Vec<Chat>>>>,
    activity_responses: Mutex<VecDeque<Result<bool>>>,
    pub emoji_dataset: Mutex<EmojiDataset>,
    /// Artificial latency for the emoji fetch, for idempotence tests.
    pub emoji_fetch_delay: Mutex<Duration>,
    /// Artificial latency for sends, for mid-flight interleaving tests.
    pub send_delay: Mutex<Duration>,
    list_calls: AtomicUsize,
    page_calls: AtomicUsize,
    send_calls: AtomicUsize,
    search_calls: AtomicUsize,
    activity_calls: AtomicUsize,
    emoji_fetches: AtomicUsize,
    clear_calls: AtomicUsize,
}

impl MockRpc {
    pub fn push_list(&self, list: ChatList) {
        self.list_responses.lock().unwrap().push_back(Ok(list));
    }

    pub fn push_page(&self, messages: Vec<Message>, has_more: bool) {
        self.page_responses.lock().unwrap().push_back(Ok(MessagePage {
            messages,
            has_more,
            follow_status: None,
        }));
    }

    pub fn push_send(&self, result: Result<Message>) {
        self.send_responses.lock().unwrap().push_back(result);
    }

    pub fn push_delete(&self, outcome: DeleteOutcome) {
        self.delete_responses.lock().unwrap().push_back(Ok(outcome));
    }

    pub fn push_block(&self, status: i32) {
        self.block_responses.lock().unwrap().push_back(Ok(status));
    }

    pub fn push_search(&self, chats: Vec<Chat>) {
        self.search_responses.lock().unwrap().push_back(Ok(chats));
    }

    pub fn push_activity(&self, result: Result<bool>) {
        self.activity_responses.lock().unwrap().push_back(result);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn page_calls(&self) -> usize {
        self.page_calls.load(Ordering::SeqCst)
    }

    pub fn send_calls(&self) -> usize {
        self.send_calls.load(Ordering::SeqCst)
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn activity_calls(&self) -> usize {
        self.activity_calls.load(Ordering::SeqCst)
    }

    pub fn emoji_fetches(&self) -> usize {
        self.emoji_fetches.load(Ordering::SeqCst)
    }

    pub fn clear_calls(&self) -> usize {
        self.clear_calls.load(Ordering::SeqCst)
    }

    fn pop<T>(queue: &Mutex<VecDeque<Result<T>>>, endpoint: &str) -> Result<T> {
        queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(CourierError::State(format!("unscripted {endpoint} call"))))
    }
}

#[async_trait]
impl ChatRpc for MockRpc {
    async fn list_chats(
        &self,
        _page: u32,
        _load_hint: Option<&ChatKey>,
        _nonce: &str,
    ) -> Result<ChatList> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Self::pop(&self.list_responses, "list_chats")
    }

    async fn load_chat(
        &self,
        _author: &Participant,
        _target: &Participant,
        _cursor: Option<i64>,
        _nonce: &str,
    ) -> Result<MessagePage> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);
        Self::pop(&self.page_responses, "load_chat")
    }

    async fn send_message(
        &self,
        _sender: &Participant,
        _receiver: &Participant,
        _outgoing: OutgoingMessage,
        _nonce: &str,
    ) -> Result<Message> {
        let delay = *self.send_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        Self::pop(&self.send_responses, "send_message")
    }

    async fn delete_message(
        &self,
        _deleter: &Participant,
        _message_id: i64,
        _nonce: &str,
    ) -> Result<DeleteOutcome> {
        Self::pop(&self.delete_responses, "delete_message")
    }

    async fn block_chat(
        &self,
        _author: &Participant,
        _target: &Participant,
        _unblock: bool,
        _nonce: &str,
    ) -> Result<i32> {
        Self::pop(&self.block_responses, "block_chat")
    }

    async fn clear_conversation(
        &self,
        _author: &Participant,
        _target: &Participant,
        _nonce: &str,
    ) -> Result<()> {
        self.clear_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn search_chats(&self, _term: &str, _nonce: &str) -> Result<Vec<Chat>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        Self::pop(&self.search_responses, "search_chats")
    }

    async fn check_activity(&self, _user_id: &str, _timestamp: i64) -> Result<bool> {
        self.activity_calls.fetch_add(1, Ordering::SeqCst);
        Self::pop(&self.activity_responses, "check_activity")
    }

    async fn fetch_emoji_dataset(&self, _url: &str) -> Result<EmojiDataset> {
        let delay = *self.emoji_fetch_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.emoji_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.emoji_dataset.lock().unwrap().clone())
    }
}

/// Session over a scripted rpc, with the recents store pointed at a
/// throwaway directory.
pub fn test_session(rpc: MockRpc) -> (Arc<Session>, Arc<MockRpc>) {
    test_session_with_config(rpc, test_config())
}

pub fn test_config() -> ClientConfig {
    let path = std::env::temp_dir().join(format!("courier-recents-{}.json", rand::random::<u64>()));
    ClientConfig {
        identity: Participant::new("me", ParticipantKind::User),
        nonce: "test-nonce".to_string(),
        emoji_dataset_url: "http://localhost/emoji.json".to_string(),
        poll_frequency_ms: 50,
        max_attachments: 5,
        recents_path: Some(path),
    }
}

pub fn test_session_with_config(
    rpc: MockRpc,
    config: ClientConfig,
) -> (Arc<Session>, Arc<MockRpc>) {
    let rpc = Arc::new(rpc);
    let session = Session::new(rpc.clone(), config);
    (session, rpc)
}
