//! # Termination signals.
//!
//! [`termination_signal`] resolves with the first termination signal the host
//! process receives. It backs
//! [`ExecutionSupervisor::shutdown_on_signal`](crate::ExecutionSupervisor::shutdown_on_signal),
//! which records the signal name as the reason of its `ShutdownRequested` event.
//!
//! Unix listens for `SIGINT`, `SIGTERM` and `SIGQUIT`; other platforms for Ctrl-C.

use std::fmt;

/// Signal that asked the process to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TerminationSignal {
    Interrupt,
    #[cfg_attr(not(unix), allow(dead_code))]
    Terminate,
    #[cfg_attr(not(unix), allow(dead_code))]
    Quit,
}

impl TerminationSignal {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            TerminationSignal::Interrupt => "SIGINT",
            TerminationSignal::Terminate => "SIGTERM",
            TerminationSignal::Quit => "SIGQUIT",
        }
    }
}

impl fmt::Display for TerminationSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Waits for the next termination signal.
///
/// Listeners are registered on every call; registration failure is returned.
#[cfg(unix)]
pub(crate) async fn termination_signal() -> std::io::Result<TerminationSignal> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    let received = tokio::select! {
        _ = sigint.recv() => TerminationSignal::Interrupt,
        _ = sigterm.recv() => TerminationSignal::Terminate,
        _ = sigquit.recv() => TerminationSignal::Quit,
    };
    Ok(received)
}

#[cfg(not(unix))]
pub(crate) async fn termination_signal() -> std::io::Result<TerminationSignal> {
    tokio::signal::ctrl_c().await?;
    Ok(TerminationSignal::Interrupt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_names_are_stable() {
        assert_eq!(TerminationSignal::Interrupt.to_string(), "SIGINT");
        assert_eq!(TerminationSignal::Terminate.as_str(), "SIGTERM");
        assert_eq!(TerminationSignal::Quit.as_str(), "SIGQUIT");
    }
}
