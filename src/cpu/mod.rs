//! # CPU Resource Control
//!
//! Two complementary mechanisms bound a session's CPU use:
//!
//! - [`planner`]: clamps the parallel-worker count of every gather node in a
//!   planned statement to `cpu_core_limit - 1`, so the host never launches
//!   more workers than the limit allows.
//! - [`affinity`]: pins the session's process to a stable set of cores per
//!   (database, role), selected least-busy-first with a round-robin
//!   fallback.
//!
//! On platforms without process affinity the planner clamp is the only CPU
//! control; the affinity path degrades to a no-op.

pub mod affinity;
pub mod planner;

pub use planner::{rewrite_plan, Plan, PlanNode, PlanNodeTag};
