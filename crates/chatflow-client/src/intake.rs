//! Message intake: inbound payload -> renderable record.
//!
//! [`render`] is a pure function of the message, the identity snapshot and
//! the render options. [`MessageIntake`] wraps it with the identity state so
//! the session can feed messages in delivery order.

use serde::Serialize;
use tracing::warn;

use chatflow_shared::constants::UPLOADS_PATH;
use chatflow_shared::{InboundMessage, MessageKind};

use crate::identity::Identity;
use crate::markup::{escape_html, initials, process_text};
use crate::timefmt::format_time;

#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    pub highlight_mentions: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            highlight_mentions: true,
        }
    }
}

/// Download affordance for a shared file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSummary {
    pub icon: &'static str,
    /// Built from the server-assigned name only.
    pub download_url: String,
    /// Escaped user-supplied name, used as the save-as label.
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedRecord {
    pub is_system: bool,
    pub is_own: bool,
    pub kind: MessageKind,
    /// Escaped author name. `None` for system messages.
    pub author: Option<String>,
    pub avatar_initials: Option<String>,
    pub sanitized_html: String,
    pub display_time: String,
    pub file: Option<FileSummary>,
}

pub fn file_icon(extension: &str) -> &'static str {
    match extension.to_lowercase().as_str() {
        "pdf" | "txt" => "📄",
        "doc" | "docx" => "📝",
        "jpg" | "jpeg" | "png" | "gif" | "webp" => "🖼️",
        "mp4" => "🎥",
        "mp3" | "wav" => "🎵",
        "zip" | "rar" => "📦",
        "xlsx" => "📊",
        "pptx" => "📽️",
        _ => "📎",
    }
}

fn extension(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or("")
}

pub fn file_summary(filename: &str, original_name: &str) -> FileSummary {
    FileSummary {
        icon: file_icon(extension(original_name)),
        download_url: format!("{UPLOADS_PATH}{}", urlencoding::encode(filename)),
        label: escape_html(original_name),
    }
}

fn file_html(summary: &FileSummary) -> String {
    format!(
        concat!(
            r#"<a class="file-message" href="{url}" download="{label}" target="_blank" rel="noopener noreferrer">"#,
            r#"<span class="file-icon">{icon}</span>"#,
            r#"<span class="file-name">{label}</span>"#,
            r#"<span class="file-size">Click to download</span>"#,
            "</a>"
        ),
        url = summary.download_url,
        label = summary.label,
        icon = summary.icon,
    )
}

/// Turn a message into a record. Ownership is judged against `identity` as given.
pub fn render(msg: &InboundMessage, identity: &Identity, options: RenderOptions) -> RenderedRecord {
    let display_time = format_time(&msg.time);

    if msg.is_system() {
        return RenderedRecord {
            is_system: true,
            is_own: false,
            kind: MessageKind::System,
            author: None,
            avatar_initials: None,
            sanitized_html: escape_html(&msg.text),
            display_time,
            file: None,
        };
    }

    let file = match (msg.kind, &msg.filename, &msg.original_name) {
        (MessageKind::File, Some(filename), Some(original)) => Some(file_summary(filename, original)),
        (MessageKind::File, _, _) => {
            warn!(user = %msg.user, "File message without file fields, rendering as text");
            None
        }
        _ => None,
    };

    let sanitized_html = match &file {
        Some(summary) => file_html(summary),
        None => process_text(&msg.text, options.highlight_mentions),
    };

    RenderedRecord {
        is_system: false,
        is_own: identity.is(&msg.user),
        kind: if file.is_some() {
            MessageKind::File
        } else {
            MessageKind::Text
        },
        author: Some(escape_html(&msg.user)),
        avatar_initials: Some(escape_html(&initials(&msg.user))),
        sanitized_html,
        display_time,
        file,
    }
}

/// Stateful intake: renders, then lets the identity learn from the message.
#[derive(Debug, Default)]
pub struct MessageIntake {
    identity: Identity,
    options: RenderOptions,
}

impl MessageIntake {
    pub fn new(identity: Identity, options: RenderOptions) -> Self {
        Self { identity, options }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Ownership uses the identity as it stood before this message; the
    /// message that teaches the name is therefore not classified as own.
    pub fn intake(&mut self, msg: &InboundMessage) -> RenderedRecord {
        let record = render(msg, &self.identity, self.options);
        self.identity.observe(msg);
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known(name: &str) -> Identity {
        Identity::Known(name.into())
    }

    #[test]
    fn test_system_message_has_no_chrome() {
        let msg = InboundMessage::system("<b>bob</b> has joined the chat.", "10:00:00");
        let rec = render(&msg, &known("bob"), RenderOptions::default());
        assert!(rec.is_system);
        assert!(!rec.is_own);
        assert_eq!(rec.author, None);
        assert_eq!(rec.avatar_initials, None);
        assert_eq!(rec.sanitized_html, "&lt;b&gt;bob&lt;/b&gt; has joined the chat.");
    }

    #[test]
    fn test_system_by_author_name() {
        let msg = InboundMessage::text("System", "maintenance at 5", "10:00");
        assert!(render(&msg, &Identity::Unknown, RenderOptions::default()).is_system);
    }

    #[test]
    fn test_own_and_peer_classification() {
        let opts = RenderOptions::default();
        let me = known("alice");
        assert!(render(&InboundMessage::text("alice", "hi", "10:00"), &me, opts).is_own);
        assert!(!render(&InboundMessage::text("bob", "hi", "10:00"), &me, opts).is_own);
    }

    #[test]
    fn test_text_message_fields() {
        let msg = InboundMessage::text("Ann <Lee>", "go to https://example.test/x\nok", "09:30");
        let rec = render(&msg, &Identity::Unknown, RenderOptions::default());
        assert_eq!(rec.author.as_deref(), Some("Ann &lt;Lee&gt;"));
        assert_eq!(rec.avatar_initials.as_deref(), Some("A&lt;"));
        assert_eq!(rec.display_time, "09:30");
        assert_eq!(rec.kind, MessageKind::Text);
        assert_eq!(rec.sanitized_html.matches("<a ").count(), 1);
        assert!(rec.sanitized_html.contains("<br>ok"));
    }

    #[test]
    fn test_file_message_keeps_names_apart() {
        let msg = InboundMessage::file(
            "bob",
            "a1b2 c3.PDF",
            r#"report"><script>.PDF"#,
            "11:11",
        );
        let rec = render(&msg, &known("alice"), RenderOptions::default());
        let file = rec.file.expect("file summary");

        assert_eq!(rec.kind, MessageKind::File);
        assert_eq!(file.icon, "📄");
        assert_eq!(file.download_url, "/uploads/a1b2%20c3.PDF");
        assert!(!file.download_url.contains("report"));
        assert_eq!(file.label, "report&quot;&gt;&lt;script&gt;.PDF");
        assert!(rec.sanitized_html.contains(r#"href="/uploads/a1b2%20c3.PDF""#));
        assert!(rec
            .sanitized_html
            .contains(r#"download="report&quot;&gt;&lt;script&gt;.PDF""#));
        assert!(!rec.sanitized_html.contains("<script>"));
    }

    #[test]
    fn test_file_icons() {
        assert_eq!(file_icon("JPG"), "🖼️");
        assert_eq!(file_icon("docx"), "📝");
        assert_eq!(file_icon("mp3"), "🎵");
        assert_eq!(file_icon("exe"), "📎");
        assert_eq!(file_summary("x", "README").icon, "📎");
    }

    #[test]
    fn test_file_message_missing_fields_degrades_to_text() {
        let mut msg = InboundMessage::file("bob", "f", "a.pdf", "11:11");
        msg.filename = None;
        let rec = render(&msg, &Identity::Unknown, RenderOptions::default());
        assert_eq!(rec.kind, MessageKind::Text);
        assert_eq!(rec.file, None);
        assert_eq!(rec.sanitized_html, "Shared a file: a.pdf");
    }

    #[test]
    fn test_intake_learns_identity_after_classifying() {
        let mut intake = MessageIntake::default();

        let first = intake.intake(&InboundMessage::system("carol has joined the chat.", "10:00"));
        assert!(first.is_system);
        assert_eq!(intake.identity(), &Identity::Unknown);

        let second = intake.intake(&InboundMessage::text("carol", "hello", "10:01"));
        assert!(!second.is_own);
        assert!(intake.identity().is("carol"));

        let third = intake.intake(&InboundMessage::text("carol", "again", "10:02"));
        assert!(third.is_own);
        let peer = intake.intake(&InboundMessage::text("dave", "yo", "10:03"));
        assert!(!peer.is_own);
    }
}
