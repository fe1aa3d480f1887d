//! Events pushed from the session to whatever draws the chat.
//!
//! Every string inside a [`UiEvent`] that came from the network is already
//! escaped; a sink may insert it as markup.

use std::sync::Mutex;

use serde::Serialize;
use uuid::Uuid;

use chatflow_shared::constants::NOTICE_TIMEOUT_MS;
use chatflow_store::{Preferences, ResolvedTheme};

use crate::intake::RenderedRecord;
use crate::presence::RosterView;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Transient toast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub id: Uuid,
    pub level: NoticeLevel,
    pub text: String,
    pub timeout_ms: u64,
}

impl Notice {
    pub fn new(level: NoticeLevel, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            level,
            text: text.into(),
            timeout_ms: NOTICE_TIMEOUT_MS,
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, text)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum UiEvent {
    MessageRendered(RenderedRecord),
    RosterUpdated(RosterView),
    ConnectionStatus { connected: bool, label: String },
    TypingShown { username: String, text: String },
    TypingHidden,
    /// Composer contents changed outside of a keystroke.
    ComposerChanged { text: String, cursor: usize, can_send: bool },
    UploadStarted { name: String },
    UploadFinished,
    Notice(Notice),
    ThemeApplied(ResolvedTheme),
    PreferencesChanged(Preferences),
    /// Terminal: the session has stopped.
    RedirectToLogin,
    /// Terminal: the session has stopped.
    RedirectToLogout,
}

/// Rendering surface.
pub trait UiSink: Send + Sync {
    fn emit(&self, event: UiEvent);
}

/// Keeps every event; used by tests and headless runs.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<UiEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<UiEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn take(&self) -> Vec<UiEvent> {
        self.events
            .lock()
            .map(|mut events| std::mem::take(&mut *events))
            .unwrap_or_default()
    }
}

impl UiSink for RecordingSink {
    fn emit(&self, event: UiEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_defaults() {
        let a = Notice::error("File type not supported");
        let b = Notice::error("File type not supported");
        assert_eq!(a.timeout_ms, 4_000);
        assert_eq!(a.level, NoticeLevel::Error);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_event_serialization() {
        let json = serde_json::to_value(UiEvent::ConnectionStatus {
            connected: false,
            label: "Connection Error".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "connection_status");
        assert_eq!(json["payload"]["label"], "Connection Error");

        let json = serde_json::to_value(UiEvent::TypingHidden).unwrap();
        assert_eq!(json["type"], "typing_hidden");
    }

    #[test]
    fn test_recording_sink_take() {
        let sink = RecordingSink::default();
        sink.emit(UiEvent::TypingHidden);
        assert_eq!(sink.take(), vec![UiEvent::TypingHidden]);
        assert!(sink.events().is_empty());
    }
}
