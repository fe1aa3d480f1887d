//! Who "self" is.
//!
//! There is no login handshake in this client. Unless configured up front,
//! the name is learned from the first non-system message the server sends.

use tracing::info;

use chatflow_shared::InboundMessage;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Identity {
    #[default]
    Unknown,
    Known(String),
}

impl Identity {
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Unknown => None,
            Self::Known(name) => Some(name),
        }
    }

    pub fn is(&self, user: &str) -> bool {
        self.name() == Some(user)
    }

    /// Apply the `Unknown -> Known(name)` transition if `msg` qualifies.
    /// Returns `true` when the identity was learned from this message.
    pub fn observe(&mut self, msg: &InboundMessage) -> bool {
        if matches!(self, Self::Unknown) && !msg.is_system() {
            info!(user = %msg.user, "Current user learned from inbound message");
            *self = Self::Known(msg.user.clone());
            return true;
        }
        false
    }
}
