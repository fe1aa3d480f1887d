//! # chatflow-client
//!
//! Client core for a ChatFlow room: renders inbound messages, tracks the
//! roster, idle and typing state, raises alerts, keeps local preferences and
//! uploads files. [`run`] wires it to a WebSocket server and the terminal.

pub mod compose;
pub mod config;
pub mod error;
pub mod events;
pub mod identity;
pub mod intake;
pub mod markup;
pub mod notify;
pub mod presence;
pub mod session;
pub mod sound;
pub mod state;
pub mod terminal;
pub mod timefmt;
pub mod timers;
pub mod upload;

use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use chatflow_net::{spawn_connection, ChannelConfig, WsConnector};
use chatflow_shared::constants::APP_NAME;
use chatflow_store::{Database, KeyValueStore, MemoryStore, PreferenceStore};

pub use config::ClientConfig;
pub use error::ClientError;
pub use session::{ChatSession, SessionEnd, UserInput};
pub use state::AppContext;

use crate::notify::DesktopNotifier;
use crate::sound::{SpeakerPlayer, TerminalBell, TonePlayer};
use crate::terminal::{spawn_stdin_reader, TerminalNotifier, TerminalSink};

/// Install the global subscriber. Logs go to stderr; stdout carries the chat.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("chatflow_client=debug,chatflow_net=debug,chatflow_store=info,warn")
    });

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

fn open_database(config: &ClientConfig) -> Result<Database, ClientError> {
    let db = match &config.db_path {
        Some(path) => Database::open_at(path)?,
        None => Database::new()?,
    };
    Ok(db)
}

/// Preferences backed by SQLite, or by memory when the database cannot be
/// opened.
pub fn open_preferences(config: &ClientConfig) -> PreferenceStore {
    let backend: Box<dyn KeyValueStore> = match open_database(config) {
        Ok(db) => Box::new(db),
        Err(e) => {
            warn!(error = %e, "Preferences will not survive a restart");
            Box::new(MemoryStore::default())
        }
    };
    PreferenceStore::load(backend)
}

/// Connect, run the session against the terminal and return how it ended.
pub async fn run(config: ClientConfig) -> Result<SessionEnd, ClientError> {
    info!(
        app = APP_NAME,
        server = %config.server_url,
        http = %config.http_url,
        "Starting client"
    );

    let preferences = open_preferences(&config);
    let (commands, events) = spawn_connection(
        WsConnector::new(config.server_url.clone()),
        ChannelConfig {
            reconnect: true,
            reconnect_delay: config.reconnect_delay,
        },
    );

    let ctx = AppContext::new(config, preferences, Arc::new(TerminalSink), commands);
    let notifier: Arc<dyn DesktopNotifier> = Arc::new(TerminalNotifier::default());
    let player: Arc<dyn TonePlayer> = if sound::has_output_device() {
        Arc::new(SpeakerPlayer)
    } else {
        info!("No audio output device, alert tone falls back to the terminal bell");
        Arc::new(TerminalBell)
    };
    let (session, input) = ChatSession::new(ctx, events, notifier, player);

    println!("{}", terminal::HELP);
    let reader = spawn_stdin_reader(input);
    let end = tokio::spawn(session.run()).await?;
    reader.abort();
    Ok(end)
}
