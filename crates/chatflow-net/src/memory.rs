//! In-process connector.
//!
//! Every successful `connect()` hands the server half of a fresh frame pipe
//! to the paired [`MemoryServer`]. Used by tests and local demos.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::NetError;
use crate::transport::{Connector, FrameConnection};

/// Client side of the in-memory transport.
#[derive(Clone)]
pub struct MemoryConnector {
    accepting: Arc<AtomicBool>,
    peers_tx: mpsc::UnboundedSender<MemoryPeer>,
}

/// Accepts connections made through a [`MemoryConnector`].
pub struct MemoryServer {
    accepting: Arc<AtomicBool>,
    peers_rx: mpsc::UnboundedReceiver<MemoryPeer>,
}

/// Server view of one accepted connection. Dropping it closes the connection.
pub struct MemoryPeer {
    pub to_client: mpsc::UnboundedSender<String>,
    pub from_client: mpsc::UnboundedReceiver<String>,
}

impl MemoryConnector {
    pub fn pair() -> (MemoryConnector, MemoryServer) {
        let accepting = Arc::new(AtomicBool::new(true));
        let (peers_tx, peers_rx) = mpsc::unbounded_channel();
        (
            MemoryConnector {
                accepting: accepting.clone(),
                peers_tx,
            },
            MemoryServer {
                accepting,
                peers_rx,
            },
        )
    }
}

impl MemoryServer {
    /// Wait for the next client connection.
    pub async fn accept(&mut self) -> Option<MemoryPeer> {
        self.peers_rx.recv().await
    }

    /// While `false`, connection attempts fail with [`NetError::Connect`].
    pub fn set_accepting(&self, accepting: bool) {
        self.accepting.store(accepting, Ordering::SeqCst);
    }
}

impl MemoryPeer {
    pub fn send(&self, frame: impl Into<String>) -> bool {
        self.to_client.send(frame.into()).is_ok()
    }

    pub async fn recv(&mut self) -> Option<String> {
        self.from_client.recv().await
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    type Conn = MemoryConnection;

    async fn connect(&self) -> Result<Self::Conn, NetError> {
        if !self.accepting.load(Ordering::SeqCst) {
            return Err(NetError::Connect("connection refused".into()));
        }

        let (to_client, inbound) = mpsc::unbounded_channel();
        let (outbound, from_client) = mpsc::unbounded_channel();

        self.peers_tx
            .send(MemoryPeer {
                to_client,
                from_client,
            })
            .map_err(|_| NetError::Connect("server gone".into()))?;

        Ok(MemoryConnection {
            inbound,
            outbound: Some(outbound),
        })
    }
}

pub struct MemoryConnection {
    inbound: mpsc::UnboundedReceiver<String>,
    outbound: Option<mpsc::UnboundedSender<String>>,
}

#[async_trait]
impl FrameConnection for MemoryConnection {
    async fn send(&mut self, frame: String) -> Result<(), NetError> {
        let tx = self.outbound.as_ref().ok_or(NetError::Closed)?;
        tx.send(frame).map_err(|_| NetError::Closed)
    }

    async fn recv(&mut self) -> Option<Result<String, NetError>> {
        self.inbound.recv().await.map(Ok)
    }

    async fn close(&mut self) {
        self.outbound = None;
        self.inbound.close();
    }
}
