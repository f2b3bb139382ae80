//! # Function-backed plan (`PlanFn`)
//!
//! [`PlanFn`] wraps a closure `F: Fn(PlanContext) -> Fut`, producing a fresh
//! future per execution. Shared state between executions must be made explicit
//! with `Arc<...>` inside the closure.
//!
//! ```rust
//! use runvisor::{PlanContext, PlanError, PlanFn, PlanRef, RunStart, ExitStatus};
//!
//! let plan: PlanRef = PlanFn::arc("count", |ctx: PlanContext| async move {
//!     let run = ctx.open_run(RunStart::generate())?;
//!     ctx.checkpoint().await?;
//!     ctx.close_run(&run, ExitStatus::Success)?;
//!     Ok::<_, PlanError>(())
//! });
//!
//! assert_eq!(plan.name(), "count");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use crate::error::PlanError;
use crate::plans::plan::{BoxPlanFuture, Plan};
use crate::plans::PlanContext;

/// Function-backed plan implementation.
#[derive(Debug)]
pub struct PlanFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> PlanFn<F> {
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the plan and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

impl<F, Fut> Plan for PlanFn<F>
where
    F: Fn(PlanContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), PlanError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, ctx: PlanContext) -> BoxPlanFuture {
        Box::pin((self.f)(ctx))
    }
}
