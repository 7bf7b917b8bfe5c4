/// Application name
pub const APP_NAME: &str = "Courier";

/// When a chat refresh brings at least this many messages the local copy has
/// never seen, the cached message list is replaced wholesale instead of
/// merged incrementally.
pub const PATCH_RESYNC_THRESHOLD: usize = 15;

/// Delay before a chat-list search term is sent to the server
pub const SEARCH_DEBOUNCE_MS: u64 = 300;

/// Maximum number of results for a client-side chat-list search
pub const CLIENT_SEARCH_CAP: usize = 10;

/// Terms of this length or shorter are always filtered client-side
pub const CLIENT_SEARCH_TERM_MAX: usize = 2;

/// Default maximum number of attachments on one outgoing message
pub const DEFAULT_MAX_ATTACHMENTS: usize = 5;

/// Maximum number of entries kept in the recent-emoji list
pub const RECENT_EMOJI_CAP: usize = 16;

/// Emoji name search stops collecting after this many matches
pub const EMOJI_SEARCH_CAP: usize = 80;

/// Default activity-poll frequency in milliseconds
pub const DEFAULT_POLL_FREQUENCY_MS: u64 = 10_000;

/// `FollowStatus` value meaning the participant is blocked
pub const FOLLOW_BLOCKED: i32 = -1;
