//! Types shared by every ChatFlow crate: the inbound message model, the
//! event names spoken over the real-time channel, and common constants.

pub mod constants;
pub mod error;
pub mod protocol;
pub mod types;

pub use error::SharedError;
pub use protocol::{ClientEvent, FileShare, ServerEvent, TypingPayload};
pub use types::{InboundMessage, MessageKind, MessageTime};
