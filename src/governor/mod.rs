//! # Governor and Session Handles
//!
//! This module is the public face of the crate, split one file per concern
//! the way the hook points carve the work up:
//!
//! - `governor`: the process-lifetime [`Governor`] handle owning the shared
//!   region, the enabled flag, and the operator surface
//! - `session`: the per-backend [`Session`] handle with its identity,
//!   tracked flags, and limit cache
//! - `cache`: lazy effective-limit refresh keyed by (role, database, epoch)
//! - `admission`: scan-and-register concurrency admission
//! - `utility`: the utility-statement hook (`SET`, `ALTER ... SET`,
//!   `EXPLAIN`, `PREPARE`)
//! - `hooks`: planner, executor, and transaction-event hook entry points
//!
//! ## Hook Flow
//!
//! ```text
//! utility hook ──► SET / ALTER enforcement, suppression flags
//!      │
//! planner hook ──► cache refresh ──► admit tx + stmt ──► clamp workers
//!      │
//! executor start ──► pin CPU affinity ──► admit (idempotent safety net)
//!      │
//! executor end ──► end statement ──► end transaction
//!      │
//! transaction abort ──► end statement ──► end transaction (recovery path)
//! ```

#[allow(clippy::module_inception)]
mod governor;

mod admission;
mod cache;
mod hooks;
mod session;
mod utility;

pub use governor::{Governor, GovernorBuilder};
pub use hooks::TransactionEvent;
pub use session::Session;
pub use utility::{SetValue, UtilityOutcome, UtilityStmt};
