//! # Run a single plan under the external callback watchdog.
//!
//! ## Flow
//! ```text
//! arm watchdog
//!   │
//!   ├─► check once: already expired (stale reset) ──► WatchdogExpired, plan not started
//!   ├─► select!
//!   │     ├─ plan.run(ctx) finishes         ──► Ok / plan's error
//!   │     ├─ watchdog check (every poll)    ──► WatchdogExpired (cancel ctx)
//!   │     └─ execution token cancelled      ──► Aborted
//!   │
//!   ├─► on error: close runs left open (abort / failure)
//!   └─► disarm watchdog, publish PlanFinished / PlanFailed
//! ```
//!
//! ## Rules
//! - The plan starts immediately; until the first reset the poll measures the
//!   window from arming, afterwards from the last reset.
//! - Publishes **exactly one** terminal event: `PlanFinished` or `PlanFailed`.
//! - `WatchdogExpired` is published at most once, before `PlanFailed`.
//! - Watchdog expiry drops the plan future at its current suspension point and
//!   cancels its token; device cleanup is left to the plan's own drop/cleanup code.

use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::core::watchdog::{Watchdog, WatchdogStatus};
use crate::documents::ExitStatus;
use crate::error::PlanError;
use crate::events::{Bus, Event, EventKind};
use crate::plans::{Plan, PlanContext};

/// Executes `plan` once, guarded by `watchdog`.
pub(crate) async fn run_plan(
    plan: &dyn Plan,
    ctx: PlanContext,
    token: &CancellationToken,
    watchdog: &Watchdog,
    poll: Duration,
    bus: &Bus,
) -> Result<(), PlanError> {
    let name = plan.name().to_string();
    watchdog.arm();
    bus.publish(Event::new(EventKind::PlanStarting).with_plan(name.as_str()));

    let res = if watchdog.status() == WatchdogStatus::Expired {
        Err(PlanError::WatchdogExpired {
            window: watchdog.window(),
        })
    } else {
        debug!(plan = %name, "starting plan under watchdog");
        tokio::select! {
            res = plan.run(ctx.clone()) => res,
            err = watch(watchdog, poll) => Err(err),
            _ = token.cancelled() => Err(PlanError::Aborted { reason: "shutdown requested".into() }),
        }
    };
    watchdog.disarm();

    match &res {
        Ok(()) => {
            info!(plan = %name, "plan finished");
            bus.publish(Event::new(EventKind::PlanFinished).with_plan(name.as_str()));
        }
        Err(e) => {
            if matches!(e, PlanError::WatchdogExpired { .. }) {
                token.cancel();
                publish_expired(bus, &name, watchdog.window());
            }
            let status = if e.is_infrastructure() {
                ExitStatus::Abort
            } else {
                ExitStatus::Failure
            };
            ctx.close_open_runs(status, &e.to_string());
            bus.publish(
                Event::new(EventKind::PlanFailed)
                    .with_plan(name.as_str())
                    .with_reason(e.to_string()),
            );
        }
    }
    res
}

/// Resolves with `WatchdogExpired` the first time a poll finds the deadline passed.
async fn watch(watchdog: &Watchdog, poll: Duration) -> PlanError {
    let mut ticker = time::interval(poll);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        if watchdog.status() == WatchdogStatus::Expired {
            return PlanError::WatchdogExpired {
                window: watchdog.window(),
            };
        }
    }
}

fn publish_expired(bus: &Bus, plan: &str, window: Duration) {
    bus.publish(
        Event::new(EventKind::WatchdogExpired)
            .with_plan(plan)
            .with_timeout(window),
    );
}
