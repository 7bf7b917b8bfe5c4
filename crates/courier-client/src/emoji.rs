//! Emoji dataset, name search, and the durable recents list.

use std::path::PathBuf;
use std::sync::Mutex;

use tokio::sync::OnceCell;
use tracing::{debug, warn};

use courier_rpc::{ChatRpc, EmojiDataset, EmojiDef};
use courier_shared::constants::{EMOJI_SEARCH_CAP, RECENT_EMOJI_CAP};
use courier_shared::{CourierError, Result};

use crate::session::Session;

/// File name of the recents list inside the app data dir.
const RECENTS_FILE: &str = "recent_emoji.json";

/// Lazily loaded emoji dataset plus the persisted recents list.
pub struct EmojiStore {
    dataset: OnceCell<EmojiDataset>,
    recents: Mutex<Vec<String>>,
    path: PathBuf,
}

impl EmojiStore {
    /// Creates the store, reading any previously persisted recents.
    /// `path_override` points tests (or embedded hosts) at a custom file.
    pub fn new(path_override: Option<PathBuf>) -> Self {
        let path = path_override.unwrap_or_else(default_recents_path);
        let recents = load_recents(&path);
        Self {
            dataset: OnceCell::new(),
            recents: Mutex::new(recents),
            path,
        }
    }

    /// Fetches the dataset if it has not been fetched yet. Concurrent and
    /// repeated calls share one network fetch and one final state.
    pub async fn ensure_loaded(&self, rpc: &dyn ChatRpc, url: &str) -> Result<&EmojiDataset> {
        self.dataset
            .get_or_try_init(|| async {
                debug!(url, "Fetching emoji dataset");
                rpc.fetch_emoji_dataset(url).await
            })
            .await
    }

    pub fn is_loaded(&self) -> bool {
        self.dataset.initialized()
    }

    /// Case-insensitive substring match on emoji names across all
    /// categories, stopping once the result cap is reached. Empty until
    /// the dataset is loaded.
    pub fn search(&self, term: &str) -> Vec<EmojiDef> {
        let Some(dataset) = self.dataset.get() else {
            return Vec::new();
        };
        let lower = term.to_lowercase();
        let mut results = Vec::new();
        'outer: for defs in dataset.categories.values() {
            for def in defs {
                if def.name.to_lowercase().contains(&lower) {
                    results.push(def.clone());
                    if results.len() >= EMOJI_SEARCH_CAP {
                        break 'outer;
                    }
                }
            }
        }
        results
    }

    /// Most recently used first.
    pub fn recents(&self) -> Vec<String> {
        self.recents.lock().expect("recents lock").clone()
    }

    /// Records a use: moves an existing entry to the front instead of
    /// duplicating, evicts the least recent beyond the cap, persists.
    /// The list update is immediate; only the file write awaits.
    pub async fn record_recent(&self, glyph: &str) -> Result<()> {
        let snapshot = {
            let mut recents = self.recents.lock().expect("recents lock");
            recents.retain(|g| g != glyph);
            recents.insert(0, glyph.to_string());
            recents.truncate(RECENT_EMOJI_CAP);
            recents.clone()
        };

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string(&snapshot)?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| CourierError::Storage(format!("writing {}: {e}", self.path.display())))
    }
}

fn default_recents_path() -> PathBuf {
    directories::ProjectDirs::from("", "", courier_shared::constants::APP_NAME)
        .map(|dirs| dirs.data_dir().join(RECENTS_FILE))
        .unwrap_or_else(|| PathBuf::from(RECENTS_FILE))
}

fn load_recents(path: &std::path::Path) -> Vec<String> {
    match std::fs::read_to_string(path) {
        Ok(json) => serde_json::from_str(&json).unwrap_or_default(),
        Err(_) => Vec::new(),
    }
}

/// Inserts `glyph` at a character-indexed cursor, returning the new text
/// and the cursor position just after the insertion. With no cursor the
/// glyph is appended.
pub fn insert_at_cursor(text: &str, cursor: Option<usize>, glyph: &str) -> (String, usize) {
    match cursor {
        Some(pos) => {
            let byte = text
                .char_indices()
                .nth(pos)
                .map(|(i, _)| i)
                .unwrap_or(text.len());
            let mut out = String::with_capacity(text.len() + glyph.len());
            out.push_str(&text[..byte]);
            out.push_str(glyph);
            out.push_str(&text[byte..]);
            let new_cursor = pos.min(text.chars().count()) + glyph.chars().count();
            (out, new_cursor)
        }
        None => {
            let mut out = text.to_string();
            out.push_str(glyph);
            let cursor = out.chars().count();
            (out, cursor)
        }
    }
}

impl Session {
    /// Idempotent dataset load; safe to call on every picker open.
    pub async fn load_emoji(&self) -> Result<()> {
        self.emoji
            .ensure_loaded(self.rpc.as_ref(), &self.config.emoji_dataset_url)
            .await
            .map(|_| ())
    }

    pub fn search_emoji(&self, term: &str) -> Vec<EmojiDef> {
        self.emoji.search(term)
    }

    pub fn recent_emoji(&self) -> Vec<String> {
        self.emoji.recents()
    }

    /// Inserts an emoji into the active compose draft at the given
    /// character cursor and records it as recently used. Returns the new
    /// cursor position.
    pub async fn insert_emoji(&self, glyph: &str, cursor: Option<usize>) -> usize {
        let new_cursor = {
            let mut state = self.state.lock().await;
            match state.active_chat_mut() {
                Some(chat) => {
                    let (text, new_cursor) =
                        insert_at_cursor(&chat.compose_draft, cursor, glyph);
                    chat.compose_draft = text;
                    new_cursor
                }
                None => return 0,
            }
        };
        if let Err(e) = self.emoji.record_recent(glyph).await {
            warn!(error = %e, "Failed to persist recent emoji");
        }
        new_cursor
    }
}
