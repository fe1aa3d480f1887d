//! User preferences: theme, sound and desktop notifications.
//!
//! Every mutation is read-modify-persist: the new value is written back to
//! the key-value store before the call returns. A failed write is logged and
//! the in-memory value still applies for the rest of the session.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::kv::KeyValueStore;

pub const KEY_THEME: &str = "theme";
pub const KEY_SOUND: &str = "soundEnabled";
/// Key written by older clients. Read only when `soundEnabled` is absent.
pub const KEY_SOUND_LEGACY: &str = "sound";
pub const KEY_NOTIFICATIONS: &str = "notifications";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    Auto,
}

impl Theme {
    /// light -> dark -> auto -> light
    pub fn next(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Auto,
            Self::Auto => Self::Light,
        }
    }

    /// Resolve `auto` against the platform's colour-scheme preference.
    pub fn resolve(self, prefers_dark: bool) -> ResolvedTheme {
        match self {
            Self::Light => ResolvedTheme::Light,
            Self::Dark => ResolvedTheme::Dark,
            Self::Auto if prefers_dark => ResolvedTheme::Dark,
            Self::Auto => ResolvedTheme::Light,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
            Self::Auto => "auto",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            "auto" => Ok(Self::Auto),
            other => Err(format!("unknown theme: {other}")),
        }
    }
}

/// Theme actually applied to the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolvedTheme {
    Light,
    Dark,
}

impl ResolvedTheme {
    pub fn css_class(self) -> &'static str {
        match self {
            Self::Light => "theme-light",
            Self::Dark => "theme-dark",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub theme: Theme,
    pub sound_enabled: bool,
    pub notifications_enabled: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: Theme::Auto,
            sound_enabled: true,
            notifications_enabled: true,
        }
    }
}

/// Preferences cached in memory and mirrored to a [`KeyValueStore`].
pub struct PreferenceStore {
    backend: Box<dyn KeyValueStore>,
    current: Preferences,
}

impl PreferenceStore {
    /// Load preferences from `backend`. Missing or unreadable keys fall back
    /// to defaults.
    pub fn load(backend: Box<dyn KeyValueStore>) -> Self {
        let theme = read(backend.as_ref(), KEY_THEME)
            .and_then(|v| match v.parse::<Theme>() {
                Ok(t) => Some(t),
                Err(e) => {
                    warn!(error = %e, "Ignoring stored theme");
                    None
                }
            })
            .unwrap_or_default();

        let sound = read(backend.as_ref(), KEY_SOUND)
            .or_else(|| read(backend.as_ref(), KEY_SOUND_LEGACY));

        let notifications = read(backend.as_ref(), KEY_NOTIFICATIONS);

        let current = Preferences {
            theme,
            sound_enabled: flag(sound.as_deref()),
            notifications_enabled: flag(notifications.as_deref()),
        };

        debug!(?current, "Preferences loaded");

        Self { backend, current }
    }

    pub fn preferences(&self) -> Preferences {
        self.current
    }

    pub fn toggle_sound(&mut self) -> bool {
        self.current.sound_enabled = !self.current.sound_enabled;
        self.persist(KEY_SOUND, bool_str(self.current.sound_enabled));
        self.current.sound_enabled
    }

    pub fn toggle_notifications(&mut self) -> bool {
        self.current.notifications_enabled = !self.current.notifications_enabled;
        self.persist(KEY_NOTIFICATIONS, bool_str(self.current.notifications_enabled));
        self.current.notifications_enabled
    }

    pub fn set_theme(&mut self, theme: Theme) -> Theme {
        self.current.theme = theme;
        self.persist(KEY_THEME, theme.as_str());
        theme
    }

    pub fn cycle_theme(&mut self) -> Theme {
        self.set_theme(self.current.theme.next())
    }

    fn persist(&self, key: &str, value: &str) {
        if let Err(e) = self.backend.set(key, value) {
            warn!(key, error = %e, "Failed to persist preference, keeping in-memory value");
        }
    }
}

fn read(backend: &dyn KeyValueStore, key: &str) -> Option<String> {
    match backend.get(key) {
        Ok(v) => v,
        Err(e) => {
            warn!(key, error = %e, "Failed to read preference");
            None
        }
    }
}

/// Anything but an explicit `"false"` counts as enabled.
fn flag(value: Option<&str>) -> bool {
    value != Some("false")
}

fn bool_str(b: bool) -> &'static str {
    if b {
        "true"
    } else {
        "false"
    }
}
