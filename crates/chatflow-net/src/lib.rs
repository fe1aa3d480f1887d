// Real-time channel facade: one background task owns the connection and
// talks to the application through typed command / event channels.

pub mod channel;
pub mod error;
pub mod memory;
pub mod transport;

pub use channel::{spawn_connection, ChannelCommand, ChannelConfig, ConnectionEvent};
pub use error::NetError;
pub use memory::{MemoryConnector, MemoryPeer, MemoryServer};
pub use transport::{Connector, FrameConnection, WsConnector};
