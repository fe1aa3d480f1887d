//! Notification dispatcher.
//!
//! For each rendered peer message it decides, once, whether to play the
//! alert tone and whether to raise a desktop alert. Delivery is
//! fire-and-forget: audio and permission prompts run on spawned tasks and
//! their failures are only logged.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use chatflow_shared::constants::{ALERT_BODY_CHARS, ALERT_TIMEOUT_MS};
use chatflow_shared::InboundMessage;
use chatflow_store::Preferences;

use crate::intake::RenderedRecord;
use crate::sound::{Tone, TonePlayer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    /// Not asked yet
    Default,
    Granted,
    Denied,
}

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Desktop notifications are not supported")]
    Unsupported,

    #[error("Failed to deliver notification: {0}")]
    Delivery(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DesktopAlert {
    pub title: String,
    pub body: String,
    pub tag: &'static str,
    /// Auto-dismiss after this many milliseconds.
    pub timeout_ms: u64,
    /// Bring the application to the front when clicked.
    pub focus_on_click: bool,
}

impl DesktopAlert {
    pub fn for_message(sender: &str, text: &str) -> Self {
        Self {
            title: sender.to_string(),
            body: text.chars().take(ALERT_BODY_CHARS).collect(),
            tag: "chat-message",
            timeout_ms: ALERT_TIMEOUT_MS,
            focus_on_click: true,
        }
    }
}

/// Platform desktop-notification API.
#[async_trait]
pub trait DesktopNotifier: Send + Sync {
    fn permission(&self) -> Permission;

    /// Prompt the user. Resolves to the permission after the prompt.
    async fn request_permission(&self) -> Permission;

    fn show(&self, alert: &DesktopAlert) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The surface is visible, the user sees the message anyway.
    Visible,
    Disabled,
    Denied,
    /// Permission is still undecided and the one prompt was already used.
    AlreadyRequested,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesktopDecision {
    Shown,
    /// Permission prompt started; the alert is shown if it is granted.
    PermissionRequested,
    Skipped(SkipReason),
}

/// What the dispatcher did for one message.
#[derive(Debug)]
pub struct DispatchOutcome {
    pub desktop: DesktopDecision,
    /// Tone playback task, when the sound preference is on.
    pub sound: Option<JoinHandle<()>>,
    /// Permission prompt task, when one was started.
    pub permission: Option<JoinHandle<()>>,
}

pub struct NotificationDispatcher {
    notifier: Arc<dyn DesktopNotifier>,
    player: Arc<dyn TonePlayer>,
    tone: Tone,
    permission_requested: bool,
}

impl NotificationDispatcher {
    pub fn new(notifier: Arc<dyn DesktopNotifier>, player: Arc<dyn TonePlayer>) -> Self {
        Self {
            notifier,
            player,
            tone: Tone::default(),
            permission_requested: false,
        }
    }

    /// Ask for permission once at startup if it was never decided.
    pub fn request_permission_early(&mut self) -> Option<JoinHandle<()>> {
        if self.permission_requested || self.notifier.permission() != Permission::Default {
            return None;
        }
        self.permission_requested = true;
        let notifier = self.notifier.clone();
        Some(tokio::spawn(async move {
            let permission = notifier.request_permission().await;
            info!(?permission, "Notification permission resolved");
        }))
    }

    /// Returns `None` for system and own messages, which never alert.
    pub fn dispatch(
        &mut self,
        record: &RenderedRecord,
        msg: &InboundMessage,
        prefs: Preferences,
        visible: bool,
    ) -> Option<DispatchOutcome> {
        if record.is_system || record.is_own {
            return None;
        }

        let sound = prefs.sound_enabled.then(|| self.play_tone());

        let mut permission = None;
        let desktop = if visible {
            DesktopDecision::Skipped(SkipReason::Visible)
        } else if !prefs.notifications_enabled {
            DesktopDecision::Skipped(SkipReason::Disabled)
        } else {
            let alert = DesktopAlert::for_message(&msg.user, &msg.text);
            match self.notifier.permission() {
                Permission::Granted => show(self.notifier.as_ref(), &alert),
                Permission::Denied => DesktopDecision::Skipped(SkipReason::Denied),
                Permission::Default if self.permission_requested => {
                    DesktopDecision::Skipped(SkipReason::AlreadyRequested)
                }
                Permission::Default => {
                    self.permission_requested = true;
                    let notifier = self.notifier.clone();
                    permission = Some(tokio::spawn(async move {
                        if notifier.request_permission().await == Permission::Granted {
                            show(notifier.as_ref(), &alert);
                        }
                    }));
                    DesktopDecision::PermissionRequested
                }
            }
        };

        debug!(user = %msg.user, ?desktop, sound = sound.is_some(), "Alert dispatched");

        Some(DispatchOutcome {
            desktop,
            sound,
            permission,
        })
    }

    fn play_tone(&self) -> JoinHandle<()> {
        let player = self.player.clone();
        let tone = self.tone;
        tokio::task::spawn_blocking(move || {
            let samples = tone.samples();
            if let Err(e) = player.play(&samples, tone.sample_rate) {
                debug!(error = %e, "Alert tone not played");
            }
        })
    }
}

fn show(notifier: &dyn DesktopNotifier, alert: &DesktopAlert) -> DesktopDecision {
    match notifier.show(alert) {
        Ok(()) => DesktopDecision::Shown,
        Err(e) => {
            debug!(error = %e, "Desktop alert not shown");
            DesktopDecision::Skipped(SkipReason::Failed)
        }
    }
}
