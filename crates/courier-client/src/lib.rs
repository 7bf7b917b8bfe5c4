//! # courier-client
//!
//! Client-side conversation engine for the Courier messaging module:
//! chat-list management, active-conversation pagination, optimistic send
//! with server reconciliation, polling-based refresh with incremental
//! patch-merge, attachment staging with a dedup cache, and emoji
//! search/recents.
//!
//! The engine is transport-agnostic: it talks to the backend through the
//! [`ChatRpc`] trait from `courier-rpc` and to the host UI through plain
//! method calls on [`Session`].

pub mod chats;
pub mod config;
pub mod conversation;
pub mod emoji;
pub mod polling;
pub mod send;
pub mod session;
pub mod staging;

#[cfg(test)]
pub(crate) mod testkit;

pub use config::ClientConfig;
pub use courier_rpc::ChatRpc;
pub use emoji::{insert_at_cursor, EmojiStore};
pub use session::{AlwaysConfirm, Confirm, SearchState, Session, SessionState};
pub use staging::{LibraryFile, StagingCache};

use tracing_subscriber::{fmt, EnvFilter};

/// Installs a tracing subscriber with sane defaults for host applications
/// that do not bring their own.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("courier_client=debug,courier_rpc=info,warn"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
