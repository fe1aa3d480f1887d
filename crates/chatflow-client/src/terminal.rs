//! Line-oriented terminal front end.
//!
//! Prints UI events to stdout, raises alerts on stderr and turns stdin
//! lines into [`UserInput`].

use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use async_trait::async_trait;
use regex::Regex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use chatflow_store::Theme;

use crate::compose::EMOJI_PALETTE;
use crate::events::{NoticeLevel, UiEvent, UiSink};
use crate::notify::{DesktopAlert, DesktopNotifier, NotifyError, Permission};
use crate::session::UserInput;

pub const HELP: &str = "Commands: /sound /notify /theme [light|dark|auto] /upload <path> \
/emoji <n> /away /back /quit";

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("valid regex"))
}

/// Undo the markup applied for rendering: `<br>` becomes a newline, other
/// tags are dropped and entities decoded.
pub fn plain_text(html: &str) -> String {
    let text = html.replace("<br>", "\n");
    tag_regex()
        .replace_all(&text, "")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#039;", "'")
        .replace("&amp;", "&")
}

fn render_line(event: &UiEvent) -> Option<String> {
    let line = match event {
        UiEvent::MessageRendered(rec) if rec.is_system => {
            format!("[{}] * {}", rec.display_time, plain_text(&rec.sanitized_html))
        }
        UiEvent::MessageRendered(rec) => {
            let author = plain_text(rec.author.as_deref().unwrap_or_default());
            let marker = if rec.is_own { " (you)" } else { "" };
            let body = match &rec.file {
                Some(file) => format!("{} {} <{}>", file.icon, plain_text(&file.label), file.download_url),
                None => plain_text(&rec.sanitized_html),
            };
            format!("[{}] {}{}: {}", rec.display_time, author, marker, body)
        }
        UiEvent::RosterUpdated(view) => {
            let names: Vec<String> = view
                .entries
                .iter()
                .map(|e| {
                    let name = plain_text(&e.name);
                    if e.is_current {
                        format!("{name}*")
                    } else {
                        name
                    }
                })
                .collect();
            format!("-- {}: {}", view.online_label, names.join(", "))
        }
        UiEvent::ConnectionStatus { label, .. } => format!("-- {label}"),
        UiEvent::TypingShown { text, .. } => format!("   {}", plain_text(text)),
        UiEvent::Notice(notice) => {
            let level = match notice.level {
                NoticeLevel::Info => "info",
                NoticeLevel::Success => "ok",
                NoticeLevel::Warning => "warning",
                NoticeLevel::Error => "error",
            };
            format!("!! {level}: {}", notice.text)
        }
        UiEvent::UploadStarted { name } => format!("-- uploading {}", plain_text(name)),
        UiEvent::ThemeApplied(theme) => format!("-- theme: {}", theme.css_class()),
        UiEvent::PreferencesChanged(p) => format!(
            "-- sound {}, notifications {}",
            on_off(p.sound_enabled),
            on_off(p.notifications_enabled)
        ),
        UiEvent::RedirectToLogin => "-- login required".to_string(),
        UiEvent::RedirectToLogout => "-- signed out".to_string(),
        UiEvent::TypingHidden | UiEvent::ComposerChanged { .. } | UiEvent::UploadFinished => {
            return None
        }
    };
    Some(line)
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

#[derive(Debug, Default)]
pub struct TerminalSink;

impl UiSink for TerminalSink {
    fn emit(&self, event: UiEvent) {
        if let Some(line) = render_line(&event) {
            println!("{line}");
        }
    }
}

/// Alerts written to stderr. Unsupported when stderr is not a terminal.
#[derive(Debug)]
pub struct TerminalNotifier {
    permission: Mutex<Permission>,
}

impl Default for TerminalNotifier {
    fn default() -> Self {
        Self {
            permission: Mutex::new(Permission::Default),
        }
    }
}

#[async_trait]
impl DesktopNotifier for TerminalNotifier {
    fn permission(&self) -> Permission {
        self.permission
            .lock()
            .map(|p| *p)
            .unwrap_or(Permission::Denied)
    }

    async fn request_permission(&self) -> Permission {
        let granted = if std::io::stderr().is_terminal() {
            Permission::Granted
        } else {
            Permission::Denied
        };
        if let Ok(mut p) = self.permission.lock() {
            *p = granted;
        }
        granted
    }

    fn show(&self, alert: &DesktopAlert) -> Result<(), NotifyError> {
        if !std::io::stderr().is_terminal() {
            return Err(NotifyError::Unsupported);
        }
        eprintln!("\x1b[1m{}\x1b[0m: {}", alert.title, alert.body);
        Ok(())
    }
}

/// Map one stdin line to session input. Plain text is typed and sent.
pub fn parse_line(line: &str) -> Result<Vec<UserInput>, String> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Ok(Vec::new());
    }

    if !line.starts_with('/') {
        return Ok(vec![
            UserInput::Activity,
            UserInput::Text(line.to_string()),
            UserInput::Send,
        ]);
    }

    let (cmd, arg) = match line.split_once(' ') {
        Some((cmd, arg)) => (cmd, arg.trim()),
        None => (line, ""),
    };

    let input = match cmd {
        "/quit" | "/logout" | "/q" => UserInput::Logout,
        "/sound" => UserInput::ToggleSound,
        "/notify" => UserInput::ToggleNotifications,
        "/theme" if arg.is_empty() => UserInput::CycleTheme,
        "/theme" => UserInput::SetTheme(arg.parse::<Theme>().map_err(|_| format!("unknown theme: {arg}"))?),
        "/upload" if arg.is_empty() => return Err("usage: /upload <path>".into()),
        "/upload" => UserInput::UploadFile(PathBuf::from(arg)),
        "/emoji" => {
            let emoji = arg
                .parse::<usize>()
                .ok()
                .and_then(|n| EMOJI_PALETTE.get(n))
                .ok_or_else(|| format!("usage: /emoji <0-{}>", EMOJI_PALETTE.len() - 1))?;
            UserInput::InsertEmoji(emoji.to_string())
        }
        "/away" => UserInput::VisibilityChanged(false),
        "/back" => UserInput::VisibilityChanged(true),
        _ => return Err(HELP.to_string()),
    };
    Ok(vec![input])
}

/// Read stdin until EOF, forwarding parsed input. Dropping the sender on
/// EOF ends the session.
pub fn spawn_stdin_reader(input: mpsc::Sender<UserInput>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "Failed to read stdin");
                    break;
                }
            };
            match parse_line(&line) {
                Ok(inputs) => {
                    for item in inputs {
                        if input.send(item).await.is_err() {
                            return;
                        }
                    }
                }
                Err(msg) => eprintln!("{msg}"),
            }
        }
        debug!("Stdin closed");
    })
}
