//! Cancellable scheduled tasks.
//!
//! A timer never touches session state itself: when it fires it posts a
//! [`TimerEvent`] into the session queue, and the session reacts in order
//! with every other event. Superseding a timer is an explicit
//! [`ScheduledTask::cancel`]; dropping the handle leaves the task running.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep_until, Instant, MissedTickBehavior};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// Typing stop timer expired. Stale generations are ignored.
    TypingIdle { generation: u64 },
    /// Periodic idle check.
    IdleCheck,
    /// Hand-off to the login surface after the auth notice was shown.
    AuthRedirect,
}

#[derive(Debug)]
pub struct ScheduledTask {
    handle: JoinHandle<()>,
}

impl ScheduledTask {
    /// Post `event` once after `delay`.
    pub fn once(delay: Duration, tx: mpsc::UnboundedSender<TimerEvent>, event: TimerEvent) -> Self {
        let deadline = Instant::now() + delay;
        let handle = tokio::spawn(async move {
            sleep_until(deadline).await;
            let _ = tx.send(event);
        });
        Self { handle }
    }

    /// Post `event` every `period`, first after one full period. Stops when
    /// the receiving side is gone.
    pub fn every(period: Duration, tx: mpsc::UnboundedSender<TimerEvent>, event: TimerEvent) -> Self {
        let start = Instant::now() + period;
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(start, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if tx.send(event).is_err() {
                    break;
                }
            }
        });
        Self { handle }
    }

    pub fn cancel(self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_once_fires_after_delay() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let start = Instant::now();
        let _task = ScheduledTask::once(Duration::from_secs(1), tx, TimerEvent::AuthRedirect);

        assert_eq!(rx.recv().await, Some(TimerEvent::AuthRedirect));
        assert!(start.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_firing() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let task = ScheduledTask::once(
            Duration::from_secs(1),
            tx,
            TimerEvent::TypingIdle { generation: 1 },
        );
        task.cancel();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_ticks_each_period() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let start = Instant::now();
        let _task = ScheduledTask::every(Duration::from_secs(60), tx, TimerEvent::IdleCheck);

        for n in 1..=3u64 {
            assert_eq!(rx.recv().await, Some(TimerEvent::IdleCheck));
            assert!(start.elapsed() >= Duration::from_secs(60 * n));
        }
    }
}
