//! Client configuration loaded from environment variables.
//!
//! Every setting has a default that targets a chat server on localhost, so
//! the client starts with zero configuration during development.

use std::path::PathBuf;
use std::time::Duration;

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Real-time channel endpoint.
    /// Env: `CHATFLOW_SERVER_URL`
    /// Default: `ws://127.0.0.1:5000/ws`
    pub server_url: String,

    /// Base URL for HTTP endpoints (uploads, downloads).
    /// Env: `CHATFLOW_HTTP_URL`
    /// Default: `http://127.0.0.1:5000`
    pub http_url: String,

    /// Name of the local user, when known up front. Otherwise it is learned
    /// from the first message the server echoes back.
    /// Env: `CHATFLOW_USERNAME`
    pub username: Option<String>,

    /// Preference database location. `None` uses the platform data dir.
    /// Env: `CHATFLOW_DB_PATH`
    pub db_path: Option<PathBuf>,

    /// Accept `.zip` uploads.
    /// Env: `CHATFLOW_ALLOW_ZIP` (true/false)
    /// Default: `false`
    pub allow_zip: bool,

    /// Fixed delay between reconnection attempts.
    /// Env: `CHATFLOW_RECONNECT_SECS`
    /// Default: `3`
    pub reconnect_delay: Duration,

    /// Wrap `@name` mentions in a highlight span.
    /// Env: `CHATFLOW_HIGHLIGHT_MENTIONS` (true/false)
    /// Default: `true`
    pub highlight_mentions: bool,

    /// Platform dark-mode preference used to resolve the `auto` theme.
    /// Env: `CHATFLOW_PREFERS_DARK` (true/false)
    /// Default: `false`
    pub prefers_dark: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "ws://127.0.0.1:5000/ws".to_string(),
            http_url: "http://127.0.0.1:5000".to_string(),
            username: None,
            db_path: None,
            allow_zip: false,
            reconnect_delay: Duration::from_secs(3),
            highlight_mentions: true,
            prefers_dark: false,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = var("CHATFLOW_SERVER_URL") {
            if url.starts_with("ws://") || url.starts_with("wss://") {
                config.server_url = url;
            } else {
                tracing::warn!(value = %url, "Invalid CHATFLOW_SERVER_URL, using default");
            }
        }

        if let Some(url) = var("CHATFLOW_HTTP_URL") {
            if url.starts_with("http://") || url.starts_with("https://") {
                config.http_url = url;
            } else {
                tracing::warn!(value = %url, "Invalid CHATFLOW_HTTP_URL, using default");
            }
        }

        if let Some(name) = var("CHATFLOW_USERNAME") {
            let name = name.trim();
            if !name.is_empty() {
                config.username = Some(name.to_string());
            }
        }

        if let Some(path) = var("CHATFLOW_DB_PATH") {
            if !path.is_empty() {
                config.db_path = Some(PathBuf::from(path));
            }
        }

        if let Some(val) = var("CHATFLOW_ALLOW_ZIP") {
            config.allow_zip = val == "true" || val == "1";
        }

        if let Some(val) = var("CHATFLOW_RECONNECT_SECS") {
            match val.parse::<u64>() {
                Ok(secs) if secs > 0 => config.reconnect_delay = Duration::from_secs(secs),
                _ => {
                    tracing::warn!(value = %val, "Invalid CHATFLOW_RECONNECT_SECS, using default");
                }
            }
        }

        if let Some(val) = var("CHATFLOW_HIGHLIGHT_MENTIONS") {
            config.highlight_mentions = val != "false" && val != "0";
        }

        if let Some(val) = var("CHATFLOW_PREFERS_DARK") {
            config.prefers_dark = val == "true" || val == "1";
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> ClientConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ClientConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = load(&[]);
        assert_eq!(config.server_url, "ws://127.0.0.1:5000/ws");
        assert_eq!(config.http_url, "http://127.0.0.1:5000");
        assert_eq!(config.reconnect_delay, Duration::from_secs(3));
        assert!(config.highlight_mentions);
        assert!(!config.allow_zip);
        assert!(config.username.is_none());
        assert!(!config.prefers_dark);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("CHATFLOW_SERVER_URL", "wss://chat.example.test/ws"),
            ("CHATFLOW_USERNAME", "  alice "),
            ("CHATFLOW_ALLOW_ZIP", "1"),
            ("CHATFLOW_RECONNECT_SECS", "10"),
            ("CHATFLOW_HIGHLIGHT_MENTIONS", "false"),
            ("CHATFLOW_DB_PATH", "/tmp/chatflow.db"),
            ("CHATFLOW_PREFERS_DARK", "true"),
        ]);
        assert_eq!(config.server_url, "wss://chat.example.test/ws");
        assert_eq!(config.username.as_deref(), Some("alice"));
        assert!(config.allow_zip);
        assert_eq!(config.reconnect_delay, Duration::from_secs(10));
        assert!(!config.highlight_mentions);
        assert_eq!(config.db_path, Some(PathBuf::from("/tmp/chatflow.db")));
        assert!(config.prefers_dark);
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let config = load(&[
            ("CHATFLOW_SERVER_URL", "http://wrong-scheme"),
            ("CHATFLOW_HTTP_URL", "ftp://nope"),
            ("CHATFLOW_RECONNECT_SECS", "soon"),
            ("CHATFLOW_USERNAME", "   "),
        ]);
        assert_eq!(config.server_url, "ws://127.0.0.1:5000/ws");
        assert_eq!(config.http_url, "http://127.0.0.1:5000");
        assert_eq!(config.reconnect_delay, Duration::from_secs(3));
        assert!(config.username.is_none());
    }
}
