//! Presence: who is online, whether we are idle, and whether we are typing.
//!
//! Nothing here sends on the channel. Each operation returns the
//! [`ClientEvent`] to emit, if any, and the session forwards it.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info};

use chatflow_shared::constants::{IDLE_THRESHOLD_SECS, TYPING_STOP_MS};
use chatflow_shared::ClientEvent;

use crate::identity::Identity;
use crate::markup::{escape_html, initials};
use crate::timers::{ScheduledTask, TimerEvent};

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

/// Connected usernames in server order, without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresenceSet {
    users: Vec<String>,
}

impl PresenceSet {
    pub fn replace(&mut self, users: Vec<String>) {
        self.users.clear();
        for user in users {
            if !self.users.contains(&user) {
                self.users.push(user);
            }
        }
    }

    pub fn users(&self) -> &[String] {
        &self.users
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    /// Escaped
    pub name: String,
    pub initials: String,
    pub is_current: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUserBadge {
    pub name: String,
    pub initials: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterView {
    pub entries: Vec<RosterEntry>,
    pub online_label: String,
    pub current: Option<CurrentUserBadge>,
}

pub fn online_label(count: usize) -> String {
    if count == 1 {
        "1 user online".to_string()
    } else {
        format!("{count} users online")
    }
}

pub fn roster_view(set: &PresenceSet, identity: &Identity) -> RosterView {
    let entries = set
        .users()
        .iter()
        .map(|user| RosterEntry {
            name: escape_html(user),
            initials: escape_html(&initials(user)),
            is_current: identity.is(user),
        })
        .collect();

    let current = identity.name().map(|name| CurrentUserBadge {
        name: escape_html(name),
        initials: escape_html(&initials(name)),
    });

    RosterView {
        entries,
        online_label: online_label(set.len()),
        current,
    }
}

// ---------------------------------------------------------------------------
// Idle detection
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct ActivityMonitor {
    last_activity: Instant,
    threshold: Duration,
    away: bool,
}

impl Default for ActivityMonitor {
    fn default() -> Self {
        Self::new(Duration::from_secs(IDLE_THRESHOLD_SECS))
    }
}

impl ActivityMonitor {
    pub fn new(threshold: Duration) -> Self {
        Self {
            last_activity: Instant::now(),
            threshold,
            away: false,
        }
    }

    /// Pointer, key, scroll, touch or the surface becoming visible again.
    /// Emits `user_active` only on the first activity after going away.
    pub fn record_activity(&mut self) -> Option<ClientEvent> {
        self.last_activity = Instant::now();
        if self.away {
            self.away = false;
            info!("User active again");
            return Some(ClientEvent::UserActive);
        }
        None
    }

    /// Periodic check. Emits `user_away` on every check while idle.
    pub fn check_idle(&mut self) -> Option<ClientEvent> {
        let idle = self.last_activity.elapsed();
        if idle > self.threshold {
            if !self.away {
                info!(idle_secs = idle.as_secs(), "User away");
            }
            self.away = true;
            Some(ClientEvent::UserAway)
        } else {
            None
        }
    }

    pub fn is_away(&self) -> bool {
        self.away
    }
}

// ---------------------------------------------------------------------------
// Typing
// ---------------------------------------------------------------------------

pub struct TypingTracker {
    is_typing: bool,
    generation: u64,
    pending: Option<ScheduledTask>,
    quiet: Duration,
    timer_tx: mpsc::UnboundedSender<TimerEvent>,
}

impl TypingTracker {
    pub fn new(timer_tx: mpsc::UnboundedSender<TimerEvent>) -> Self {
        Self {
            is_typing: false,
            generation: 0,
            pending: None,
            quiet: Duration::from_millis(TYPING_STOP_MS),
            timer_tx,
        }
    }

    pub fn is_typing(&self) -> bool {
        self.is_typing
    }

    /// Keystroke in the composer.
    pub fn on_input(&mut self) -> Option<ClientEvent> {
        let start = if self.is_typing {
            None
        } else {
            self.is_typing = true;
            Some(ClientEvent::Typing)
        };

        self.cancel_pending();
        self.pending = Some(ScheduledTask::once(
            self.quiet,
            self.timer_tx.clone(),
            TimerEvent::TypingIdle {
                generation: self.generation,
            },
        ));
        start
    }

    pub fn on_timer(&mut self, generation: u64) -> Option<ClientEvent> {
        if generation != self.generation {
            debug!(generation, current = self.generation, "Stale typing timer ignored");
            return None;
        }
        self.pending = None;
        self.stop()
    }

    /// A message was sent: stop now instead of waiting for the timer.
    pub fn on_send(&mut self) -> Option<ClientEvent> {
        self.cancel_pending();
        self.stop()
    }

    fn stop(&mut self) -> Option<ClientEvent> {
        if !self.is_typing {
            return None;
        }
        self.is_typing = false;
        Some(ClientEvent::StopTyping)
    }

    fn cancel_pending(&mut self) {
        if let Some(task) = self.pending.take() {
            task.cancel();
        }
        // invalidates a firing that was already queued before the abort
        self.generation += 1;
    }
}

/// Peer typing indicator.
#[derive(Debug, Default)]
pub struct PeerTyping {
    shown: Option<String>,
}

impl PeerTyping {
    /// Returns the indicator text.
    pub fn show(&mut self, username: &str) -> String {
        self.shown = Some(username.to_string());
        format!("{} is typing...", escape_html(username))
    }

    /// True when an indicator was visible.
    pub fn hide(&mut self) -> bool {
        self.shown.take().is_some()
    }

    pub fn current(&self) -> Option<&str> {
        self.shown.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_online_label() {
        assert_eq!(online_label(0), "0 users online");
        assert_eq!(online_label(1), "1 user online");
        assert_eq!(online_label(2), "2 users online");
    }

    #[test]
    fn test_roster_marks_current_user() {
        let mut set = PresenceSet::default();
        set.replace(vec!["Alice".into(), "Bob".into(), "Alice".into()]);
        assert_eq!(set.len(), 2);

        let view = roster_view(&set, &Identity::Known("Bob".into()));
        assert_eq!(view.online_label, "2 users online");
        assert!(!view.entries[0].is_current);
        assert!(view.entries[1].is_current);
        let badge = view.current.unwrap();
        assert_eq!(badge.name, "Bob");
        assert_eq!(badge.initials, "B");

        set.replace(vec!["Alice".into()]);
        assert_eq!(roster_view(&set, &Identity::Unknown).online_label, "1 user online");
    }

    #[test]
    fn test_roster_escapes_names() {
        let mut set = PresenceSet::default();
        set.replace(vec!["<i>x</i>".into()]);
        let view = roster_view(&set, &Identity::Unknown);
        assert_eq!(view.entries[0].name, "&lt;i&gt;x&lt;/i&gt;");
        assert!(view.current.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_emits_one_away_per_check() {
        let mut monitor = ActivityMonitor::default();

        tokio::time::advance(Duration::from_secs(240)).await;
        assert_eq!(monitor.check_idle(), None);

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(monitor.check_idle(), Some(ClientEvent::UserAway));
        assert!(monitor.is_away());

        assert_eq!(monitor.record_activity(), Some(ClientEvent::UserActive));
        assert_eq!(monitor.record_activity(), None);
        assert_eq!(monitor.check_idle(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_activity_before_check_suppresses_away() {
        let mut monitor = ActivityMonitor::default();
        tokio::time::advance(Duration::from_secs(299)).await;
        assert_eq!(monitor.record_activity(), None);
        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(monitor.check_idle(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_typing_burst_emits_start_then_one_stop() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut typing = TypingTracker::new(tx);

        assert_eq!(typing.on_input(), Some(ClientEvent::Typing));
        for _ in 0..5 {
            tokio::time::advance(Duration::from_millis(300)).await;
            assert_eq!(typing.on_input(), None);
        }

        let start = Instant::now();
        let TimerEvent::TypingIdle { generation } = rx.recv().await.unwrap() else {
            panic!("expected typing timer");
        };
        assert!(start.elapsed() >= Duration::from_millis(1000));
        assert_eq!(typing.on_timer(generation), Some(ClientEvent::StopTyping));
        assert!(!typing.is_typing());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_stops_immediately_and_cancels_timer() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut typing = TypingTracker::new(tx);

        assert_eq!(typing.on_input(), Some(ClientEvent::Typing));
        assert_eq!(typing.on_send(), Some(ClientEvent::StopTyping));
        assert_eq!(typing.on_send(), None);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_stale_generation_is_ignored() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut typing = TypingTracker::new(tx);

        typing.on_input();
        let old = typing.generation;
        typing.on_input();
        assert_eq!(typing.on_timer(old), None);
        assert!(typing.is_typing());
    }

    #[test]
    fn test_peer_typing_indicator() {
        let mut peer = PeerTyping::default();
        assert_eq!(peer.show("bob"), "bob is typing...");
        assert_eq!(peer.current(), Some("bob"));
        assert!(peer.hide());
        assert!(!peer.hide());
    }
}
