//! # Plan abstraction.
//!
//! A [`Plan`] is one experiment procedure. Each call to [`Plan::run`] produces a
//! fresh future that owns its [`PlanContext`]; every `.await` inside it is a
//! suspension point at which the supervisor may abort the plan.
//!
//! ```rust
//! use runvisor::{Plan, PlanContext, PlanError, BoxPlanFuture};
//!
//! struct Snapshot;
//!
//! impl Plan for Snapshot {
//!     fn name(&self) -> &str { "snapshot" }
//!
//!     fn run(&self, ctx: PlanContext) -> BoxPlanFuture {
//!         Box::pin(async move {
//!             ctx.checkpoint().await?;
//!             Ok::<(), PlanError>(())
//!         })
//!     }
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::PlanError;
use crate::plans::PlanContext;

/// Boxed future returned by [`Plan::run`].
pub type BoxPlanFuture = Pin<Box<dyn Future<Output = Result<(), PlanError>> + Send + 'static>>;

/// Shared handle to a plan.
pub type PlanRef = Arc<dyn Plan>;

/// Asynchronous, abortable experiment procedure.
pub trait Plan: Send + Sync + 'static {
    /// Stable, human-readable plan name.
    fn name(&self) -> &str;

    /// Creates the future that executes the plan once.
    ///
    /// Implementations should call [`PlanContext::checkpoint`] between hardware
    /// operations so shutdown is honoured promptly.
    fn run(&self, ctx: PlanContext) -> BoxPlanFuture;
}
