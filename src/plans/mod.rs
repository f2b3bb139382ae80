//! # Plan abstractions.
//!
//! - [`Plan`] trait for abortable experiment procedures
//! - [`PlanFn`] closure-backed plan
//! - [`PlanRef`] shared handle (`Arc<dyn Plan>`)
//! - [`PlanContext`] document emission, run tracking and cancellation points

mod context;
mod plan;
mod plan_fn;

pub use context::PlanContext;
pub use plan::{BoxPlanFuture, Plan, PlanRef};
pub use plan_fn::PlanFn;
