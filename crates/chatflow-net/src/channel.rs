//! Connection task with tokio mpsc command/event channels.
//!
//! The task owns the transport, reconnects after a fixed delay, and reports
//! lifecycle changes and decoded server events in arrival order.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use chatflow_shared::{ClientEvent, ServerEvent, SharedError};

use crate::transport::{Connector, FrameConnection};

// ---------------------------------------------------------------------------
// Command / event types
// ---------------------------------------------------------------------------

/// Commands sent *into* the connection task.
#[derive(Debug)]
pub enum ChannelCommand {
    /// Emit an event to the server. Dropped (with a log line) while offline.
    Emit(ClientEvent),
    /// Close the connection and stop the task.
    Disconnect,
}

/// Events sent *from* the connection task to the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Connected,
    Disconnected { reason: String },
    ConnectError { message: String },
    Server(ServerEvent),
}

/// Configuration for spawning the connection task.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Reconnect after a drop or a failed attempt.
    pub reconnect: bool,
    /// Delay between reconnect attempts.
    pub reconnect_delay: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            reconnect: true,
            reconnect_delay: Duration::from_secs(3),
        }
    }
}

/// Spawn the connection task.
///
/// # Returns
///
/// `(command_tx, event_rx)`
pub fn spawn_connection<C: Connector>(
    connector: C,
    config: ChannelConfig,
) -> (mpsc::Sender<ChannelCommand>, mpsc::Receiver<ConnectionEvent>) {
    let (cmd_tx, cmd_rx) = mpsc::channel::<ChannelCommand>(256);
    let (event_tx, event_rx) = mpsc::channel::<ConnectionEvent>(256);

    tokio::spawn(run(connector, config, cmd_rx, event_tx));

    (cmd_tx, event_rx)
}

/// How one connected session ended.
enum SessionEnd {
    Dropped(String),
    Shutdown,
}

async fn run<C: Connector>(
    connector: C,
    config: ChannelConfig,
    mut cmd_rx: mpsc::Receiver<ChannelCommand>,
    event_tx: mpsc::Sender<ConnectionEvent>,
) {
    loop {
        match connector.connect().await {
            Ok(mut conn) => {
                info!("Channel connected");
                if event_tx.send(ConnectionEvent::Connected).await.is_err() {
                    conn.close().await;
                    return;
                }

                match drive(&mut conn, &mut cmd_rx, &event_tx).await {
                    SessionEnd::Shutdown => {
                        conn.close().await;
                        let _ = event_tx
                            .send(ConnectionEvent::Disconnected {
                                reason: "client disconnect".into(),
                            })
                            .await;
                        info!("Channel closed by client");
                        return;
                    }
                    SessionEnd::Dropped(reason) => {
                        warn!(reason = %reason, "Channel disconnected");
                        if event_tx
                            .send(ConnectionEvent::Disconnected { reason })
                            .await
                            .is_err()
                        {
                            return;
                        }
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Channel connect failed");
                if event_tx
                    .send(ConnectionEvent::ConnectError {
                        message: e.to_string(),
                    })
                    .await
                    .is_err()
                {
                    return;
                }
            }
        }

        if !config.reconnect {
            debug!("Reconnect disabled, channel task exiting");
            return;
        }

        if !wait_for_retry(config.reconnect_delay, &mut cmd_rx).await {
            return;
        }
    }
}

/// Pump frames both ways until the connection drops or the client shuts down.
async fn drive<T: FrameConnection>(
    conn: &mut T,
    cmd_rx: &mut mpsc::Receiver<ChannelCommand>,
    event_tx: &mpsc::Sender<ConnectionEvent>,
) -> SessionEnd {
    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => match cmd {
                Some(ChannelCommand::Emit(event)) => {
                    let name = event.name();
                    let frame = match event.to_frame() {
                        Ok(f) => f,
                        Err(e) => {
                            warn!(event = name, error = %e, "Failed to encode client event");
                            continue;
                        }
                    };
                    if let Err(e) = conn.send(frame).await {
                        return SessionEnd::Dropped(e.to_string());
                    }
                    debug!(event = name, "Emitted");
                }
                Some(ChannelCommand::Disconnect) | None => return SessionEnd::Shutdown,
            },

            frame = conn.recv() => match frame {
                Some(Ok(text)) => match ServerEvent::from_frame(&text) {
                    Ok(event) => {
                        debug!(event = event.name(), "Received");
                        if event_tx.send(ConnectionEvent::Server(event)).await.is_err() {
                            return SessionEnd::Shutdown;
                        }
                    }
                    Err(SharedError::UnknownEvent(name)) => {
                        debug!(event = %name, "Ignoring unknown server event");
                    }
                    Err(e) => warn!(error = %e, "Dropping malformed server frame"),
                },
                Some(Err(e)) => return SessionEnd::Dropped(e.to_string()),
                None => return SessionEnd::Dropped("connection closed".into()),
            },
        }
    }
}

/// Sleep out the reconnect delay while still honouring `Disconnect`.
/// Returns `false` when the task should stop.
async fn wait_for_retry(delay: Duration, cmd_rx: &mut mpsc::Receiver<ChannelCommand>) -> bool {
    let deadline = Instant::now() + delay;
    loop {
        tokio::select! {
            _ = sleep_until(deadline) => return true,
            cmd = cmd_rx.recv() => match cmd {
                Some(ChannelCommand::Emit(event)) => {
                    debug!(event = event.name(), "Offline, dropping client event");
                }
                Some(ChannelCommand::Disconnect) | None => return false,
            },
        }
    }
}
