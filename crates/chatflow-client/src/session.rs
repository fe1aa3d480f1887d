//! The chat session event loop.
//!
//! One task owns all mutable client state and processes, strictly in
//! arrival order, connection events, timer firings, upload completions and
//! user input.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use chatflow_net::ConnectionEvent;
use chatflow_shared::constants::{AUTH_REDIRECT_DELAY_MS, IDLE_CHECK_SECS};
use chatflow_shared::{ClientEvent, InboundMessage, ServerEvent};
use chatflow_store::Theme;

use crate::compose::Composer;
use crate::events::{Notice, UiEvent};
use crate::identity::Identity;
use crate::intake::{MessageIntake, RenderOptions};
use crate::markup::escape_html;
use crate::notify::{DesktopNotifier, NotificationDispatcher};
use crate::presence::{roster_view, ActivityMonitor, PeerTyping, PresenceSet, TypingTracker};
use crate::sound::TonePlayer;
use crate::state::AppContext;
use crate::timers::{ScheduledTask, TimerEvent};
use crate::upload::{UploadClient, UploadError, UploadedFile};

pub const STATUS_CONNECTED: &str = "Connected";
pub const STATUS_DISCONNECTED: &str = "Disconnected";
pub const STATUS_ERROR: &str = "Connection Error";

const AUTH_NOTICE: &str = "Authentication required. Redirecting to login...";

/// Input from the user or the rendering surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserInput {
    /// The composer text after a keystroke.
    Text(String),
    Send,
    /// Pointer, key, scroll or touch activity.
    Activity,
    VisibilityChanged(bool),
    InsertEmoji(String),
    UploadFile(PathBuf),
    ToggleSound,
    ToggleNotifications,
    SetTheme(Theme),
    CycleTheme,
    Logout,
}

/// Why [`ChatSession::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    RedirectToLogin,
    Logout,
    /// Every input handle was dropped.
    InputClosed,
}

struct UploadDone {
    name: String,
    result: Result<UploadedFile, UploadError>,
}

enum Flow {
    Continue,
    Stop(SessionEnd),
}

pub struct ChatSession {
    ctx: AppContext,
    connection: mpsc::Receiver<ConnectionEvent>,
    input: mpsc::Receiver<UserInput>,
    timer_tx: mpsc::UnboundedSender<TimerEvent>,
    timer_rx: mpsc::UnboundedReceiver<TimerEvent>,
    upload_tx: mpsc::UnboundedSender<UploadDone>,
    upload_rx: mpsc::UnboundedReceiver<UploadDone>,

    intake: MessageIntake,
    dispatcher: NotificationDispatcher,
    uploader: UploadClient,
    presence: PresenceSet,
    activity: ActivityMonitor,
    typing: TypingTracker,
    peer_typing: PeerTyping,
    composer: Composer,

    connected: bool,
    visible: bool,
    idle_task: Option<ScheduledTask>,
    auth_task: Option<ScheduledTask>,
}

impl ChatSession {
    /// Returns the session and the handle used to feed it input.
    pub fn new(
        ctx: AppContext,
        connection: mpsc::Receiver<ConnectionEvent>,
        notifier: Arc<dyn DesktopNotifier>,
        player: Arc<dyn TonePlayer>,
    ) -> (Self, mpsc::Sender<UserInput>) {
        let (input_tx, input) = mpsc::channel(256);
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        let (upload_tx, upload_rx) = mpsc::unbounded_channel();

        let identity = ctx
            .config
            .username
            .clone()
            .map(Identity::Known)
            .unwrap_or_default();
        let options = RenderOptions {
            highlight_mentions: ctx.config.highlight_mentions,
        };
        let uploader = UploadClient::new(&ctx.config.http_url, ctx.config.allow_zip);

        let session = Self {
            intake: MessageIntake::new(identity, options),
            dispatcher: NotificationDispatcher::new(notifier, player),
            uploader,
            presence: PresenceSet::default(),
            activity: ActivityMonitor::default(),
            typing: TypingTracker::new(timer_tx.clone()),
            peer_typing: PeerTyping::default(),
            composer: Composer::default(),
            connected: false,
            visible: true,
            idle_task: None,
            auth_task: None,
            ctx,
            connection,
            input,
            timer_tx,
            timer_rx,
            upload_tx,
            upload_rx,
        };
        (session, input_tx)
    }

    pub async fn run(mut self) -> SessionEnd {
        self.start();

        let end = loop {
            let flow = tokio::select! {
                Some(event) = self.connection.recv() => self.on_connection(event).await,
                Some(timer) = self.timer_rx.recv() => self.on_timer(timer).await,
                Some(done) = self.upload_rx.recv() => self.on_upload_done(done).await,
                input = self.input.recv() => match input {
                    Some(input) => self.on_input(input).await,
                    None => Flow::Stop(SessionEnd::InputClosed),
                },
            };
            if let Flow::Stop(end) = flow {
                break end;
            }
        };

        self.stop_timers();
        info!(?end, "Chat session ended");
        end
    }

    fn start(&mut self) {
        self.ctx.apply_preferences();
        self.idle_task = Some(ScheduledTask::every(
            Duration::from_secs(IDLE_CHECK_SECS),
            self.timer_tx.clone(),
            TimerEvent::IdleCheck,
        ));
        // the surface was just opened; prompt now if it was never decided
        self.dispatcher.request_permission_early();
        info!(server = %self.ctx.config.server_url, "Chat session started");
    }

    fn stop_timers(&mut self) {
        for task in [self.idle_task.take(), self.auth_task.take()].into_iter().flatten() {
            task.cancel();
        }
        // drop any pending typing timer
        let _ = self.typing.on_send();
    }

    // -----------------------------------------------------------------------
    // Connection
    // -----------------------------------------------------------------------

    async fn on_connection(&mut self, event: ConnectionEvent) -> Flow {
        match event {
            ConnectionEvent::Connected => {
                self.set_status(true, STATUS_CONNECTED);
                let username = self.ctx.config.username.clone();
                self.ctx.send(ClientEvent::Join { username }).await;
            }
            ConnectionEvent::Disconnected { reason } => {
                info!(%reason, "Disconnected");
                self.set_status(false, STATUS_DISCONNECTED);
            }
            ConnectionEvent::ConnectError { message } => {
                warn!(error = %message, "Connection error");
                self.set_status(false, STATUS_ERROR);
            }
            ConnectionEvent::Server(event) => self.on_server(event),
        }
        Flow::Continue
    }

    fn on_server(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::UserUpdate(users) => {
                self.presence.replace(users);
                self.publish_roster();
            }
            ServerEvent::Message(msg) => self.on_message(msg),
            ServerEvent::UserTyping(payload) => {
                if self.intake.identity().is(&payload.username) {
                    return;
                }
                let text = self.peer_typing.show(&payload.username);
                self.ctx.emit(UiEvent::TypingShown {
                    username: escape_html(&payload.username),
                    text,
                });
            }
            ServerEvent::UserStoppedTyping(_) => {
                if self.peer_typing.hide() {
                    self.ctx.emit(UiEvent::TypingHidden);
                }
            }
            ServerEvent::AuthRequired => {
                if self.auth_task.is_some() {
                    return;
                }
                warn!("Server requires authentication");
                self.ctx.notice(Notice::error(AUTH_NOTICE));
                self.auth_task = Some(ScheduledTask::once(
                    Duration::from_millis(AUTH_REDIRECT_DELAY_MS),
                    self.timer_tx.clone(),
                    TimerEvent::AuthRedirect,
                ));
            }
        }
    }

    fn on_message(&mut self, msg: InboundMessage) {
        let was_known = self.intake.identity().name().is_some();
        let record = self.intake.intake(&msg);
        self.ctx.emit(UiEvent::MessageRendered(record.clone()));

        if !was_known && self.intake.identity().name().is_some() {
            // the current-user badge depends on the learned name
            self.publish_roster();
        }

        let prefs = self.ctx.preferences.preferences();
        // outcome handles are fire-and-forget
        let _ = self.dispatcher.dispatch(&record, &msg, prefs, self.visible);
    }

    fn publish_roster(&self) {
        let view = roster_view(&self.presence, self.intake.identity());
        debug!(online = self.presence.len(), "Roster updated");
        self.ctx.emit(UiEvent::RosterUpdated(view));
    }

    fn set_status(&mut self, connected: bool, label: &str) {
        self.connected = connected;
        self.ctx.emit(UiEvent::ConnectionStatus {
            connected,
            label: label.to_string(),
        });
        self.publish_composer();
    }

    // -----------------------------------------------------------------------
    // Timers
    // -----------------------------------------------------------------------

    async fn on_timer(&mut self, timer: TimerEvent) -> Flow {
        match timer {
            TimerEvent::TypingIdle { generation } => {
                let event = self.typing.on_timer(generation);
                self.ctx.send_opt(event).await;
            }
            TimerEvent::IdleCheck => {
                let event = self.activity.check_idle();
                self.ctx.send_opt(event).await;
            }
            TimerEvent::AuthRedirect => {
                self.ctx.disconnect().await;
                self.ctx.emit(UiEvent::RedirectToLogin);
                return Flow::Stop(SessionEnd::RedirectToLogin);
            }
        }
        Flow::Continue
    }

    // -----------------------------------------------------------------------
    // User input
    // -----------------------------------------------------------------------

    async fn on_input(&mut self, input: UserInput) -> Flow {
        match input {
            UserInput::Text(text) => {
                self.composer.set_text(text);
                let active = self.activity.record_activity();
                self.ctx.send_opt(active).await;
                let event = self.typing.on_input();
                self.ctx.send_opt(event).await;
                self.publish_composer();
            }
            UserInput::Send => self.send_message().await,
            UserInput::Activity => {
                let event = self.activity.record_activity();
                self.ctx.send_opt(event).await;
            }
            UserInput::VisibilityChanged(visible) => {
                self.visible = visible;
                if visible {
                    let event = self.activity.record_activity();
                    self.ctx.send_opt(event).await;
                }
            }
            UserInput::InsertEmoji(emoji) => {
                self.composer.insert_emoji(&emoji);
                self.publish_composer();
            }
            UserInput::UploadFile(path) => self.start_upload(path),
            UserInput::ToggleSound => {
                let enabled = self.ctx.preferences.toggle_sound();
                debug!(enabled, "Sound toggled");
                self.ctx.apply_preferences();
            }
            UserInput::ToggleNotifications => {
                let enabled = self.ctx.preferences.toggle_notifications();
                debug!(enabled, "Notifications toggled");
                self.ctx.apply_preferences();
            }
            UserInput::SetTheme(theme) => {
                self.ctx.preferences.set_theme(theme);
                self.ctx.apply_preferences();
            }
            UserInput::CycleTheme => {
                self.ctx.preferences.cycle_theme();
                self.ctx.apply_preferences();
            }
            UserInput::Logout => {
                info!("Logging out");
                self.ctx.disconnect().await;
                self.ctx.emit(UiEvent::RedirectToLogout);
                return Flow::Stop(SessionEnd::Logout);
            }
        }
        Flow::Continue
    }

    async fn send_message(&mut self) {
        if !self.composer.can_send(self.connected) {
            return;
        }
        let Some(text) = self.composer.take_text() else {
            return;
        };
        self.ctx.send(ClientEvent::Message { text }).await;
        let stop = self.typing.on_send();
        self.ctx.send_opt(stop).await;
        self.publish_composer();
    }

    fn publish_composer(&self) {
        self.ctx.emit(UiEvent::ComposerChanged {
            text: self.composer.text().to_string(),
            cursor: self.composer.cursor(),
            can_send: self.composer.can_send(self.connected),
        });
    }

    fn start_upload(&mut self, path: PathBuf) {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.ctx.emit(UiEvent::UploadStarted {
            name: escape_html(&name),
        });

        let uploader = self.uploader.clone();
        let done_tx = self.upload_tx.clone();
        tokio::spawn(async move {
            let result = uploader.upload(&path).await;
            let _ = done_tx.send(UploadDone { name, result });
        });
    }

    async fn on_upload_done(&mut self, done: UploadDone) -> Flow {
        self.ctx.emit(UiEvent::UploadFinished);
        match done.result {
            Ok(uploaded) => {
                self.ctx.send(ClientEvent::FileMessage(uploaded.share())).await;
                self.ctx.notice(Notice::success("File uploaded successfully"));
            }
            Err(e) => {
                warn!(file = %done.name, error = ?e, "Upload failed");
                self.ctx.notice(Notice::error(e.to_string()));
            }
        }
        Flow::Continue
    }
}
