//! Attachment staging with a dedup cache.
//!
//! The cache is an injected per-session service, not process-global
//! state: every entry point (drag-drop, picker, library selection) goes
//! through the same [`StagingCache`], and tests get isolation for free.

use std::sync::{Arc, Mutex};

use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::debug;

use courier_shared::{
    AttachmentSource, CourierError, FileInput, LocalPreview, PreviewRef, Result, StagedAttachment,
};

use crate::session::Session;

fn short_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect()
}

/// Session-scoped store of pending uploads, deduplicated by the file
/// identity tuple (name, mime type, size, last modified).
#[derive(Default)]
pub struct StagingCache {
    entries: Mutex<Vec<StagedAttachment>>,
}

impl StagingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the existing staging for an identical file, or creates a
    /// fresh one at the front of the cache.
    pub fn reuse_or_create(&self, file: FileInput) -> StagedAttachment {
        let mut entries = self.entries.lock().expect("staging cache lock");

        if let Some(existing) = entries.iter().find(|e| {
            e.name == file.name
                && e.mime_type == file.mime_type
                && e.size == file.size
                && e.last_modified == file.last_modified
        }) {
            debug!(staging_id = %existing.staging_id, name = %file.name, "Reusing staged file");
            return existing.clone();
        }

        let staging_id = short_id();
        let entry = StagedAttachment {
            source: AttachmentSource::NewUpload,
            staging_id: staging_id.clone(),
            server_id: None,
            preview: PreviewRef::Local(LocalPreview::new(format!("preview:{staging_id}"))),
            name: file.name,
            mime_type: file.mime_type,
            size: file.size,
            last_modified: file.last_modified,
            data: Some(Arc::new(file.data)),
        };
        entries.insert(0, entry.clone());
        entry
    }

    /// Evicts the given stagings and releases their local previews.
    pub fn release(&self, staging_ids: &[String]) {
        let mut entries = self.entries.lock().expect("staging cache lock");
        entries.retain(|e| {
            if staging_ids.contains(&e.staging_id) {
                e.release_preview();
                false
            } else {
                true
            }
        });
    }

    pub fn contains(&self, staging_id: &str) -> bool {
        self.entries
            .lock()
            .expect("staging cache lock")
            .iter()
            .any(|e| e.staging_id == staging_id)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("staging cache lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An already-uploaded file picked from the attachment library.
#[derive(Debug, Clone)]
pub struct LibraryFile {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub url: String,
}

impl Session {
    /// Stages a freshly picked file on the active chat.
    ///
    /// With `max_attachments == 1` the new selection replaces the current
    /// one; otherwise selections beyond the cap are dropped silently.
    pub async fn attach_file(&self, file: FileInput) -> Result<()> {
        let staged = self.staging.reuse_or_create(file);

        let mut state = self.state.lock().await;
        if state.active.is_none() {
            return Err(CourierError::State("no active chat".into()));
        }

        let max = self.config.max_attachments;
        if max == 1 {
            for old in state.staged.drain(..) {
                // Re-picking the same file yields the same cache entry;
                // releasing it here would kill the preview about to be
                // staged again.
                if old.staging_id == staged.staging_id {
                    continue;
                }
                if old.source == AttachmentSource::NewUpload {
                    self.staging.release(&[old.staging_id.clone()]);
                }
            }
        } else if state.staged.len() >= max {
            debug!(name = %staged.name, "Attachment cap reached; selection dropped");
            return Ok(());
        }

        if state.staged.iter().any(|s| s.staging_id == staged.staging_id) {
            return Ok(());
        }
        state.staged.push(staged);
        Ok(())
    }

    /// Detaches a staged attachment from the active chat. Fresh uploads
    /// release their locally owned preview immediately.
    pub async fn remove_staged(&self, staging_id: &str) {
        let mut state = self.state.lock().await;
        let Some(pos) = state.staged.iter().position(|s| s.staging_id == staging_id) else {
            return;
        };
        let removed = state.staged.remove(pos);
        if removed.source == AttachmentSource::NewUpload {
            self.staging.release(&[removed.staging_id.clone()]);
        }
    }

    /// Merges library selections into the staged list, de-duplicated by
    /// server id and bounded by the attachment cap; overflow is dropped,
    /// not queued.
    pub async fn attach_library(&self, selections: Vec<LibraryFile>) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.active.is_none() {
            return Err(CourierError::State("no active chat".into()));
        }

        let max = self.config.max_attachments;
        if max == 1 {
            state.staged.clear();
        }

        for selection in selections {
            if state.staged.len() >= max {
                debug!(id = %selection.id, "Attachment cap reached; library selection dropped");
                break;
            }
            let duplicate = state
                .staged
                .iter()
                .any(|s| s.server_id.as_deref() == Some(selection.id.as_str()));
            if duplicate {
                continue;
            }
            state.staged.push(StagedAttachment {
                source: AttachmentSource::Existing,
                staging_id: short_id(),
                server_id: Some(selection.id),
                name: selection.name,
                mime_type: selection.mime_type,
                size: 0,
                last_modified: 0,
                preview: PreviewRef::Remote(selection.url),
                data: None,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use courier_rpc::ChatList;
    use courier_shared::{FileInput, PreviewRef};

    use crate::config::ClientConfig;
    use crate::session::Session;
    use crate::testkit::{chat, message, test_config, MockRpc};

    use super::{LibraryFile, StagingCache};

    fn file(name: &str) -> FileInput {
        FileInput {
            name: name.to_string(),
            mime_type: "image/png".to_string(),
            size: 10,
            last_modified: 1_700_000_000,
            data: vec![0; 10],
        }
    }

    fn library(id: &str) -> LibraryFile {
        LibraryFile {
            id: id.to_string(),
            name: format!("{id}.png"),
            mime_type: "image/png".to_string(),
            url: format!("https://cdn.example/{id}.png"),
        }
    }

    async fn opened_session(config: ClientConfig) -> Arc<Session> {
        let rpc = MockRpc::default();
        rpc.push_list(ChatList {
            chats: vec![chat("a", "Ada")],
            has_more: false,
            ..Default::default()
        });
        rpc.push_page(vec![message(1, "x")], false);
        let session = Session::new(Arc::new(rpc), config);
        session.load_chats(false, 1).await.unwrap();
        let key = session.chats().await[0].key.clone();
        session.open_chat(&key).await.unwrap();
        session
    }

    #[test]
    fn identical_files_share_one_staging() {
        let cache = StagingCache::new();
        let first = cache.reuse_or_create(file("photo.png"));
        let second = cache.reuse_or_create(file("photo.png"));
        assert_eq!(first.staging_id, second.staging_id);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn different_identity_creates_new_front_entry() {
        let cache = StagingCache::new();
        cache.reuse_or_create(file("a.png"));
        let mut newer = file("a.png");
        newer.last_modified += 1;
        let entry = cache.reuse_or_create(newer);
        assert_eq!(cache.len(), 2);
        assert!(cache.contains(&entry.staging_id));
    }

    #[tokio::test]
    async fn library_selection_is_capped_and_deduplicated() {
        let session = opened_session(test_config()).await;

        let mut picks: Vec<_> = (0..8).map(|i| library(&i.to_string())).collect();
        picks.push(library("0"));
        session.attach_library(picks).await.unwrap();

        let staged = session.staged_attachments().await;
        assert_eq!(staged.len(), 5);
        let ids: Vec<_> = staged.iter().filter_map(|s| s.server_id.clone()).collect();
        assert_eq!(ids, vec!["0", "1", "2", "3", "4"]);
    }

    #[tokio::test]
    async fn single_attachment_mode_replaces_instead_of_appending() {
        let mut config = test_config();
        config.max_attachments = 1;
        let session = opened_session(config).await;

        session.attach_file(file("first.png")).await.unwrap();
        session.attach_file(file("second.png")).await.unwrap();

        let staged = session.staged_attachments().await;
        assert_eq!(staged.len(), 1);
        assert_eq!(staged[0].name, "second.png");
        // The replaced staging was evicted from the cache as well.
        assert_eq!(session.staging().len(), 1);
    }

    #[tokio::test]
    async fn repicking_the_same_file_in_single_mode_keeps_the_staging_alive() {
        let mut config = test_config();
        config.max_attachments = 1;
        let session = opened_session(config).await;

        session.attach_file(file("photo.png")).await.unwrap();
        session.attach_file(file("photo.png")).await.unwrap();

        let staged = session.staged_attachments().await;
        assert_eq!(staged.len(), 1);
        assert!(session.staging().contains(&staged[0].staging_id));
        match &staged[0].preview {
            PreviewRef::Local(preview) => assert!(!preview.is_released()),
            PreviewRef::Remote(_) => panic!("expected a local preview"),
        }
    }

    #[tokio::test]
    async fn removing_a_fresh_staging_releases_its_preview() {
        let session = opened_session(test_config()).await;

        session.attach_file(file("doc.png")).await.unwrap();
        let staged = session.staged_attachments().await;
        let preview = match &staged[0].preview {
            PreviewRef::Local(preview) => preview.clone(),
            PreviewRef::Remote(_) => panic!("expected a local preview"),
        };

        session.remove_staged(&staged[0].staging_id).await;

        assert!(preview.is_released());
        assert!(session.staged_attachments().await.is_empty());
        assert!(!session.staging().contains(&staged[0].staging_id));
    }
}
