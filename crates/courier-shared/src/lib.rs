// Domain model shared by the RPC layer and the client engine.

pub mod constants;
pub mod error;
pub mod model;
pub mod types;

pub use error::{CourierError, Result};
pub use model::{
    AttachmentSource, Chat, FileInput, LocalPreview, Message, MessageAttachment, PreviewRef,
    Sender, StagedAttachment,
};
pub use types::{deep_link_token, ChatKey, FollowStatus, Participant, ParticipantKind};
