//! Engine configuration supplied by the host application.

use std::path::PathBuf;

use courier_shared::constants::{DEFAULT_MAX_ATTACHMENTS, DEFAULT_POLL_FREQUENCY_MS};
use courier_shared::{Participant, ParticipantKind};

/// Configuration for one [`Session`](crate::Session).
///
/// The host owns authentication; `nonce` is an opaque token attached to
/// every mutating request.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// The identity this client composes messages as.
    pub identity: Participant,

    /// Opaque request token supplied by the host session layer.
    pub nonce: String,

    /// URL of the static categorized emoji dataset.
    pub emoji_dataset_url: String,

    /// Activity-poll frequency in milliseconds. Flat schedule, no backoff.
    pub poll_frequency_ms: u64,

    /// Maximum attachments on one outgoing message. When `1`, a new
    /// selection replaces the staged file instead of appending.
    pub max_attachments: usize,

    /// Override for the durable recent-emoji store. `None` uses the
    /// platform data directory.
    pub recents_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            identity: Participant::new("0", ParticipantKind::User),
            nonce: String::new(),
            emoji_dataset_url: String::new(),
            poll_frequency_ms: DEFAULT_POLL_FREQUENCY_MS,
            max_attachments: DEFAULT_MAX_ATTACHMENTS,
            recents_path: None,
        }
    }
}
