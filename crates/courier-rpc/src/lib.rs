// Opaque RPC surface of the messaging backend.
//
// The engine only ever talks to the `ChatRpc` trait; `HttpRpc` is the
// production implementation, tests substitute their own.

pub mod api;
pub mod dto;
pub mod http;

pub use api::{ChatList, ChatRpc, DeleteOutcome, MessagePage, OutgoingFile, OutgoingMessage};
pub use dto::{EmojiDataset, EmojiDef};
pub use http::HttpRpc;
