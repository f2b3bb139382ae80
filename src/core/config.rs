//! # Global supervision configuration.
//!
//! [`Config`] centralizes the timer settings shared by the
//! [`ExecutionSupervisor`](crate::ExecutionSupervisor) and the
//! [`RemoteTaskMonitor`](crate::RemoteTaskMonitor).
//!
//! ## Sentinel values
//! - `watchdog_poll_interval = 0s` → clamped to 1ms
//! - `escalation_timeout = 0s` → clamped to 1ms
//! - `bus_capacity = 0` → clamped to 1

use std::time::Duration;

const MIN_TICK: Duration = Duration::from_millis(1);

/// Global configuration for the supervision layer.
///
/// ## Field semantics
/// - `watchdog_window`: how long the external callback process may stay silent
/// - `watchdog_poll_interval`: how often the running plan's watchdog is checked
/// - `escalation_timeout`: remote-task escalation timer duration
/// - `beam_status_name`: display name of the progress status meaning "waiting for beam"
/// - `bus_capacity`: supervision event ring buffer size
/// - `shutdown_grace`: how long `shutdown()` waits for the running plan to unwind
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum silence from the external callback process before a plan is aborted.
    pub watchdog_window: Duration,

    /// Interval between watchdog checks while a plan runs.
    pub watchdog_poll_interval: Duration,

    /// Time without a state change after which a delegated task is escalated.
    pub escalation_timeout: Duration,

    /// Display name of the remote progress status tracking the beam wait.
    pub beam_status_name: String,

    /// Capacity of the supervision event bus.
    pub bus_capacity: usize,

    /// Maximum wait for the running plan during shutdown.
    pub shutdown_grace: Duration,
}

impl Config {
    /// Poll interval clamped to a minimum of 1ms.
    #[inline]
    pub fn poll_interval(&self) -> Duration {
        self.watchdog_poll_interval.max(MIN_TICK)
    }

    /// Escalation timeout clamped to a minimum of 1ms.
    #[inline]
    pub fn escalation_timeout(&self) -> Duration {
        self.escalation_timeout.max(MIN_TICK)
    }

    /// Bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// - `watchdog_window = 30s`
    /// - `watchdog_poll_interval = 1s`
    /// - `escalation_timeout = 600s`
    /// - `beam_status_name = "wait_for_beam"`
    /// - `bus_capacity = 1024`
    /// - `shutdown_grace = 10s`
    fn default() -> Self {
        Self {
            watchdog_window: Duration::from_secs(30),
            watchdog_poll_interval: Duration::from_secs(1),
            escalation_timeout: Duration::from_secs(600),
            beam_status_name: "wait_for_beam".to_string(),
            bus_capacity: 1024,
            shutdown_grace: Duration::from_secs(10),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_values_are_clamped() {
        let cfg = Config {
            watchdog_poll_interval: Duration::ZERO,
            escalation_timeout: Duration::ZERO,
            bus_capacity: 0,
            ..Config::default()
        };
        assert_eq!(cfg.poll_interval(), Duration::from_millis(1));
        assert_eq!(cfg.escalation_timeout(), Duration::from_millis(1));
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }
}
