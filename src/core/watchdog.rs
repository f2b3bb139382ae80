//! # External callback watchdog.
//!
//! The external callback process proves it is alive by calling
//! [`Watchdog::reset`]; each reset moves the deadline to `now + window`
//! (last write wins, so N rapid resets leave exactly one deadline).
//!
//! ## Lifecycle
//! ```text
//!            arm()                       reset()                     disarm()
//! Disarmed ────────► Armed{deadline?} ──────────► Armed{now+window} ─────────► Disarmed
//!                      │
//!                      ├─ deadline set, now <= deadline          → Alive
//!                      ├─ no reset yet, now <= armed_at + window → Pending
//!                      └─ otherwise                              → Expired
//! ```
//!
//! A reset received while disarmed is kept, so a heartbeat that arrives just
//! before a plan starts counts. `disarm()` forgets it.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;

/// Result of a watchdog check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogStatus {
    /// Not armed; nothing to check.
    Disarmed,
    /// Armed, no reset received yet, still inside the initial window.
    Pending,
    /// A reset was received and its deadline has not passed.
    Alive,
    /// The window elapsed without a (fresh) reset.
    Expired,
}

#[derive(Debug, Default)]
struct State {
    deadline: Option<Instant>,
    armed_at: Option<Instant>,
}

/// Deadline-based liveness guard, cheap to clone and safe to reset from any thread.
#[derive(Clone, Debug)]
pub struct Watchdog {
    window: Duration,
    state: Arc<Mutex<State>>,
}

impl Watchdog {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Liveness signal: the deadline becomes `now + window`.
    pub fn reset(&self) {
        self.lock().deadline = Some(Instant::now() + self.window);
    }

    /// Starts guarding a plan.
    pub(crate) fn arm(&self) {
        self.lock().armed_at = Some(Instant::now());
    }

    /// Stops guarding and forgets the last reset.
    pub(crate) fn disarm(&self) {
        let mut state = self.lock();
        state.armed_at = None;
        state.deadline = None;
    }

    /// Current status at `Instant::now()`.
    pub fn status(&self) -> WatchdogStatus {
        self.status_at(Instant::now())
    }

    pub(crate) fn status_at(&self, now: Instant) -> WatchdogStatus {
        let state = self.lock();
        let Some(armed_at) = state.armed_at else {
            return WatchdogStatus::Disarmed;
        };
        match state.deadline {
            Some(deadline) if now <= deadline => WatchdogStatus::Alive,
            Some(_) => WatchdogStatus::Expired,
            None if now <= armed_at + self.window => WatchdogStatus::Pending,
            None => WatchdogStatus::Expired,
        }
    }

    /// The deadline set by the most recent reset, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.lock().deadline
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn pending_until_first_reset_then_alive() {
        let wd = Watchdog::new(Duration::from_millis(100));
        assert_eq!(wd.status(), WatchdogStatus::Disarmed);

        wd.arm();
        assert_eq!(wd.status(), WatchdogStatus::Pending);

        wd.reset();
        assert_eq!(wd.status(), WatchdogStatus::Alive);

        tokio::time::advance(Duration::from_millis(101)).await;
        assert_eq!(wd.status(), WatchdogStatus::Expired);
    }

    #[tokio::test(start_paused = true)]
    async fn silent_window_expires() {
        let wd = Watchdog::new(Duration::from_millis(100));
        wd.arm();
        tokio::time::advance(Duration::from_millis(150)).await;
        assert_eq!(wd.status(), WatchdogStatus::Expired);
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_resets_leave_one_deadline() {
        let wd = Watchdog::new(Duration::from_millis(100));
        wd.arm();
        for _ in 0..50 {
            wd.reset();
            tokio::time::advance(Duration::from_millis(1)).await;
        }
        let last = Instant::now() - Duration::from_millis(1);
        assert_eq!(wd.deadline(), Some(last + Duration::from_millis(100)));

        tokio::time::advance(Duration::from_millis(99)).await;
        assert_eq!(wd.status(), WatchdogStatus::Alive);
        tokio::time::advance(Duration::from_millis(1)).await;
        assert_eq!(wd.status(), WatchdogStatus::Expired);
    }

    #[tokio::test(start_paused = true)]
    async fn disarm_forgets_reset() {
        let wd = Watchdog::new(Duration::from_millis(100));
        wd.reset();
        wd.arm();
        assert_eq!(wd.status(), WatchdogStatus::Alive);
        wd.disarm();
        assert_eq!(wd.status(), WatchdogStatus::Disarmed);
        assert_eq!(wd.deadline(), None);
    }
}
