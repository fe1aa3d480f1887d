use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};

use crate::constants::SYSTEM_USER;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Text,
    File,
    System,
}

/// Message time as the server sent it.
///
/// Older servers send a pre-formatted clock string (`"14:05:09"`), newer
/// ones an epoch-millisecond number. Both are accepted; fractional millis
/// are truncated, and anything else (`null`, objects) reads as an empty
/// time so the message itself is kept.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum MessageTime {
    Millis(i64),
    Text(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireTime {
    Int(i64),
    Float(f64),
    Text(String),
    Other(IgnoredAny),
}

impl<'de> Deserialize<'de> for MessageTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match WireTime::deserialize(deserializer)? {
            WireTime::Int(ms) => Self::Millis(ms),
            WireTime::Float(ms) if ms.is_finite() => Self::Millis(ms.trunc() as i64),
            WireTime::Text(s) => Self::Text(s),
            WireTime::Float(_) | WireTime::Other(_) => Self::default(),
        })
    }
}

impl Default for MessageTime {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl From<&str> for MessageTime {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<i64> for MessageTime {
    fn from(ms: i64) -> Self {
        Self::Millis(ms)
    }
}

/// A chat message as delivered by the real-time channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InboundMessage {
    pub user: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub time: MessageTime,
    #[serde(rename = "type", default)]
    pub kind: MessageKind,
    /// Server-assigned storage name. Opaque, only used to build the download URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Name the uploader gave the file. User-supplied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_name: Option<String>,
}

impl InboundMessage {
    pub fn text(user: &str, text: &str, time: impl Into<MessageTime>) -> Self {
        Self {
            user: user.to_string(),
            text: text.to_string(),
            time: time.into(),
            kind: MessageKind::Text,
            filename: None,
            original_name: None,
        }
    }

    pub fn system(text: &str, time: impl Into<MessageTime>) -> Self {
        Self {
            user: SYSTEM_USER.to_string(),
            text: text.to_string(),
            time: time.into(),
            kind: MessageKind::System,
            filename: None,
            original_name: None,
        }
    }

    pub fn file(
        user: &str,
        filename: &str,
        original_name: &str,
        time: impl Into<MessageTime>,
    ) -> Self {
        Self {
            user: user.to_string(),
            text: format!("Shared a file: {original_name}"),
            time: time.into(),
            kind: MessageKind::File,
            filename: Some(filename.to_string()),
            original_name: Some(original_name.to_string()),
        }
    }

    /// System announcements are flagged either by type or by the reserved author.
    pub fn is_system(&self) -> bool {
        self.kind == MessageKind::System || self.user == SYSTEM_USER
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_legacy_message() {
        let json = r#"{"user":"System","text":"bob has joined the chat.","time":"14:05:09"}"#;
        let msg: InboundMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.kind, MessageKind::Text);
        assert_eq!(msg.time, MessageTime::Text("14:05:09".into()));
        assert!(msg.is_system());
    }

    #[test]
    fn test_deserialize_file_message_with_millis() {
        let json = r#"{"user":"alice","text":"Shared a file: a.pdf","time":1700000000000,
            "type":"file","filename":"3f2a.pdf","original_name":"a.pdf"}"#;
        let msg: InboundMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.kind, MessageKind::File);
        assert_eq!(msg.time, MessageTime::Millis(1_700_000_000_000));
        assert_eq!(msg.filename.as_deref(), Some("3f2a.pdf"));
        assert!(!msg.is_system());
    }

    #[test]
    fn test_float_time_is_truncated() {
        let json = r#"{"user":"bob","text":"hi","time":1700000000000.5}"#;
        let msg: InboundMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.time, MessageTime::Millis(1_700_000_000_000));
        assert_eq!(msg.text, "hi");
    }

    #[test]
    fn test_unreadable_time_keeps_message() {
        for time in ["null", "{}", "[1,2]", "true"] {
            let json = format!(r#"{{"user":"bob","text":"hi","time":{time}}}"#);
            let msg: InboundMessage = serde_json::from_str(&json).unwrap();
            assert_eq!(msg.time, MessageTime::Text(String::new()), "time = {time}");
            assert_eq!(msg.user, "bob");
        }
    }

    #[test]
    fn test_missing_time_defaults_to_empty_text() {
        let msg: InboundMessage = serde_json::from_str(r#"{"user":"a","text":"hi"}"#).unwrap();
        assert_eq!(msg.time, MessageTime::Text(String::new()));
    }
}
