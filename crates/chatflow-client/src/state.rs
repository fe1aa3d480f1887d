//! Application context.
//!
//! Built once at startup and handed to the session. It owns everything the
//! components share: configuration, the preference store, the rendering
//! sink and the command half of the real-time channel.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use chatflow_net::ChannelCommand;
use chatflow_shared::ClientEvent;
use chatflow_store::PreferenceStore;

use crate::config::ClientConfig;
use crate::events::{Notice, UiEvent, UiSink};

pub struct AppContext {
    pub config: ClientConfig,
    pub preferences: PreferenceStore,
    pub ui: Arc<dyn UiSink>,
    commands: mpsc::Sender<ChannelCommand>,
}

impl AppContext {
    pub fn new(
        config: ClientConfig,
        preferences: PreferenceStore,
        ui: Arc<dyn UiSink>,
        commands: mpsc::Sender<ChannelCommand>,
    ) -> Self {
        Self {
            config,
            preferences,
            ui,
            commands,
        }
    }

    pub fn emit(&self, event: UiEvent) {
        self.ui.emit(event);
    }

    pub fn notice(&self, notice: Notice) {
        self.ui.emit(UiEvent::Notice(notice));
    }

    /// Queue an event for the server. Lost if the channel task has stopped.
    pub async fn send(&mut self, event: ClientEvent) {
        let name = event.name();
        if self.commands.send(ChannelCommand::Emit(event)).await.is_err() {
            debug!(event = name, "Connection task gone, event dropped");
        }
    }

    pub async fn send_opt(&mut self, event: Option<ClientEvent>) {
        if let Some(event) = event {
            self.send(event).await;
        }
    }

    pub async fn disconnect(&mut self) {
        let _ = self.commands.send(ChannelCommand::Disconnect).await;
    }

    /// Push the resolved theme and the current preferences to the surface.
    pub fn apply_preferences(&self) {
        let prefs = self.preferences.preferences();
        self.emit(UiEvent::ThemeApplied(
            prefs.theme.resolve(self.config.prefers_dark),
        ));
        self.emit(UiEvent::PreferencesChanged(prefs));
    }
}
