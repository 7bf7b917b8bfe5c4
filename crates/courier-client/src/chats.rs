//! Chat-list management: paging, search, open/close.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use courier_shared::constants::{CLIENT_SEARCH_CAP, CLIENT_SEARCH_TERM_MAX, SEARCH_DEBOUNCE_MS};
use courier_shared::{deep_link_token, Chat, ChatKey, CourierError, Result};

use crate::session::Session;

fn matches_term(chat: &Chat, lower_term: &str) -> bool {
    chat.target.display_name.to_lowercase().contains(lower_term)
        || chat.author.display_name.to_lowercase().contains(lower_term)
        || chat.excerpt.to_lowercase().contains(lower_term)
}

impl Session {
    /// Fetches one page of the chat list. Page 1 replaces the list, later
    /// pages append, de-duplicated by chat key. With `initial` set the
    /// server may nominate a chat to open (autoload), which is opened
    /// before returning.
    pub async fn load_chats(&self, initial: bool, page: u32) -> Result<()> {
        let page = page.max(1);
        let hint = if initial {
            self.state.lock().await.active.clone()
        } else {
            None
        };

        let fetched = self
            .rpc
            .list_chats(page, hint.as_ref(), &self.config.nonce)
            .await?;

        let open_key = {
            let mut state = self.state.lock().await;
            if page == 1 {
                state.chats.clear();
            }
            for incoming in fetched.chats {
                if state.chat(&incoming.key).is_none() {
                    state.chats.push(incoming);
                }
            }
            state.list_page = page;
            state.list_has_more = fetched.has_more;
            if !fetched.has_more {
                state.list_fully_loaded = true;
            }
            debug!(page, total = state.chats.len(), "Chat list page merged");

            if !initial {
                None
            } else if let Some(default_chat) = fetched.default_chat {
                let key = default_chat.key.clone();
                if state.chat(&key).is_none() {
                    state.chats.insert(0, default_chat);
                }
                Some(key)
            } else {
                fetched.autoload
            }
        };

        if let Some(key) = open_key {
            self.open_chat(&key).await?;
        }
        Ok(())
    }

    /// Advances the page cursor and fetches the next chat-list page.
    pub async fn load_more_chats(&self) -> Result<()> {
        let next = self.state.lock().await.list_page + 1;
        self.load_chats(false, next).await
    }

    /// Chat-list search. Short terms, or a fully loaded list, are filtered
    /// in memory; anything else goes to the server after a debounce
    /// window. Every call bumps a generation counter, so a superseded
    /// timer or a stale response drops out silently.
    pub async fn search(self: &Arc<Self>, term: impl Into<String>) -> Result<()> {
        let term = term.into().trim().to_string();

        let generation = {
            let mut state = self.state.lock().await;
            state.search_generation += 1;
            state.search.term = term.clone();

            if term.is_empty() {
                state.search.results.clear();
                state.search.loading = false;
                return Ok(());
            }

            if state.list_fully_loaded || term.chars().count() <= CLIENT_SEARCH_TERM_MAX {
                let lower = term.to_lowercase();
                state.search.results = state
                    .chats
                    .iter()
                    .filter(|chat| matches_term(chat, &lower))
                    .take(CLIENT_SEARCH_CAP)
                    .cloned()
                    .collect();
                state.search.loading = false;
                return Ok(());
            }

            state.search.loading = true;
            state.search_generation
        };

        let session = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(SEARCH_DEBOUNCE_MS)).await;
            if session.state.lock().await.search_generation != generation {
                return;
            }

            match session.rpc.search_chats(&term, &session.config.nonce).await {
                Ok(results) => {
                    let mut state = session.state.lock().await;
                    if state.search_generation != generation {
                        return;
                    }
                    state.search.results = results;
                    state.search.loading = false;
                }
                Err(e) => {
                    warn!(term = %term, error = %e, "Chat search failed");
                    let mut state = session.state.lock().await;
                    if state.search_generation == generation {
                        state.search.loading = false;
                    }
                }
            }
        });
        Ok(())
    }

    /// Opens a chat: makes it active, clears any staged attachments,
    /// publishes its deep-link token, and fetches the newest message page.
    pub async fn open_chat(&self, key: &ChatKey) -> Result<()> {
        let (author, target) = {
            let mut state = self.state.lock().await;
            let chat = state
                .chat(key)
                .ok_or_else(|| CourierError::State(format!("unknown chat {key}")))?;
            let author = chat.author.clone();
            let target = chat.target.clone();
            state.active = Some(key.clone());
            state.staged.clear();
            state.deep_link = Some(deep_link_token(&author, &target));
            (author, target)
        };

        let page = self
            .rpc
            .load_chat(&author, &target, None, &self.config.nonce)
            .await?;

        let mut state = self.state.lock().await;
        if state.active.as_ref() != Some(key) {
            // Another chat was opened while this fetch was in flight.
            return Ok(());
        }
        if let Some(chat) = state.chat_mut(key) {
            chat.messages = page.messages;
            chat.messages_loaded = true;
            chat.has_more = page.has_more;
            if let Some(status) = page.follow_status {
                chat.follow_status = status;
            }
            chat.seen = true;
            chat.is_new = false;
        }
        Ok(())
    }

    /// Closes the active chat. No network call; staged attachments are
    /// detached from the compose area.
    pub async fn close_chat(&self) {
        let mut state = self.state.lock().await;
        state.active = None;
        state.staged.clear();
        state.deep_link = None;
    }
}

#[cfg(test)]
mod tests {
    use courier_rpc::ChatList;

    use crate::testkit::{chat, message, MockRpc, test_session};

    #[tokio::test]
    async fn later_pages_append_without_duplicates() {
        let rpc = MockRpc::default();
        rpc.push_list(ChatList {
            chats: vec![chat("a", "A"), chat("b", "B")],
            has_more: true,
            ..Default::default()
        });
        rpc.push_list(ChatList {
            chats: vec![chat("a", "A"), chat("c", "C")],
            has_more: false,
            ..Default::default()
        });
        let (session, _rpc) = test_session(rpc);

        session.load_chats(false, 1).await.unwrap();
        session.load_more_chats().await.unwrap();

        let keys: Vec<_> = session
            .chats()
            .await
            .iter()
            .map(|c| c.target.id.clone())
            .collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn page_one_replaces_the_list() {
        let rpc = MockRpc::default();
        rpc.push_list(ChatList {
            chats: vec![chat("a", "A")],
            has_more: false,
            ..Default::default()
        });
        rpc.push_list(ChatList {
            chats: vec![chat("b", "B")],
            has_more: false,
            ..Default::default()
        });
        let (session, _rpc) = test_session(rpc);

        session.load_chats(false, 1).await.unwrap();
        session.load_chats(false, 1).await.unwrap();

        let chats = session.chats().await;
        assert_eq!(chats.len(), 1);
        assert_eq!(chats[0].target.id, "b");
    }

    #[tokio::test]
    async fn open_chat_fetches_first_page_and_publishes_deep_link() {
        let rpc = MockRpc::default();
        rpc.push_list(ChatList {
            chats: vec![chat("a", "Ada")],
            has_more: false,
            ..Default::default()
        });
        rpc.push_page(vec![message(20, "newest"), message(19, "older")], true);
        let (session, _rpc) = test_session(rpc);

        session.load_chats(false, 1).await.unwrap();
        let key = session.chats().await[0].key.clone();
        session.open_chat(&key).await.unwrap();

        let active = session.active_chat().await.unwrap();
        assert!(active.messages_loaded);
        assert_eq!(active.messages.len(), 2);
        assert!(active.has_more);
        assert_eq!(session.deep_link().await.unwrap(), "ua");
    }

    #[tokio::test]
    async fn short_terms_filter_client_side() {
        let rpc = MockRpc::default();
        rpc.push_list(ChatList {
            chats: vec![chat("a", "Ada"), chat("b", "Bob"), chat("c", "Abby")],
            has_more: true,
            ..Default::default()
        });
        let (session, _rpc) = test_session(rpc);
        session.load_chats(false, 1).await.unwrap();

        session.search("ab").await.unwrap();

        let search = session.search_state().await;
        assert!(!search.loading);
        assert_eq!(search.results.len(), 1);
        assert_eq!(search.results[0].target.display_name, "Abby");
    }

    #[tokio::test(start_paused = true)]
    async fn newer_search_supersedes_debounced_older_one() {
        let rpc = MockRpc::default();
        rpc.push_list(ChatList {
            chats: vec![chat("a", "Ada")],
            has_more: true,
            ..Default::default()
        });
        rpc.push_search(vec![chat("z", "Zelda")]);
        let (session, rpc) = test_session(rpc);
        session.load_chats(false, 1).await.unwrap();

        session.search("first query").await.unwrap();
        session.search("second query").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(400)).await;
        tokio::task::yield_now().await;

        // Only the newest generation reached the server.
        assert_eq!(rpc.search_calls(), 1);
        let search = session.search_state().await;
        assert_eq!(search.term, "second query");
        assert_eq!(search.results.len(), 1);
        assert!(!search.loading);
    }

    #[tokio::test]
    async fn initial_load_opens_the_default_chat() {
        let rpc = MockRpc::default();
        let default = chat("d", "Dee");
        rpc.push_list(ChatList {
            chats: vec![chat("a", "Ada")],
            has_more: false,
            default_chat: Some(default.clone()),
            ..Default::default()
        });
        rpc.push_page(vec![message(5, "hi")], false);
        let (session, _rpc) = test_session(rpc);

        session.load_chats(true, 1).await.unwrap();

        let active = session.active_chat().await.unwrap();
        assert_eq!(active.key, default.key);
        assert!(active.messages_loaded);
    }

    #[tokio::test]
    async fn close_chat_clears_active_state() {
        let rpc = MockRpc::default();
        rpc.push_list(ChatList {
            chats: vec![chat("a", "Ada")],
            has_more: false,
            ..Default::default()
        });
        rpc.push_page(vec![message(1, "x")], false);
        let (session, _rpc) = test_session(rpc);
        session.load_chats(false, 1).await.unwrap();
        let key = session.chats().await[0].key.clone();
        session.open_chat(&key).await.unwrap();

        session.close_chat().await;

        assert!(session.active_chat().await.is_none());
        assert!(session.deep_link().await.is_none());
    }
}
