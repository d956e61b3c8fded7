//! # qosgov - Per-Tenant QoS Resource Governor
//!
//! qosgov embeds in a relational database host and enforces, for every
//! session, the most restrictive combination of limits configured against
//! the session's authenticated role and its current database: working-memory
//! bounds, CPU bounds (parallel-worker capping plus process affinity
//! pinning), and concurrency bounds on transactions and on each DML
//! statement kind. Limits live in the host's settings catalog under the
//! `qos.*` namespace, may be altered online, and every live session observes
//! new limits at its next statement without reconnecting.
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use qosgov::{Governor, MemoryCatalog, BackendId, DatabaseId, RoleId};
//!
//! let governor = Governor::builder().max_backends(64).build();
//! let catalog = Arc::new(MemoryCatalog::new());
//!
//! let mut session = governor.session(
//!     BackendId(0), 4242, RoleId(10), DatabaseId(1), catalog,
//! )?;
//!
//! // Host hook points call into the session at statement boundaries:
//! session.on_planner(&mut plan)?;          // admit + clamp workers
//! session.on_executor_start(&plan)?;       // pin affinity, safety-net admit
//! session.on_executor_end();               // release tracking
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │        Host hook points (utility/planner/executor)   │
//! ├──────────────────────────────────────────────────────┤
//! │  governor: Session handles, admission, limit cache   │
//! ├───────────────────────────┬──────────────────────────┤
//! │  limits: model + parser   │  catalog: settings rows  │
//! ├───────────────────────────┴──────────────────────────┤
//! │  shared: stats, epoch, backend slots, affinity table │
//! │           (one region, one exclusive lock)           │
//! ├──────────────────────────────────────────────────────┤
//! │  cpu: worker clamping + least-busy affinity pinning  │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency Model
//!
//! One host process per session; the [`Governor`] is the process-wide
//! singleton owning the shared region, and each [`Session`] is the
//! per-backend handle. Admission is check-then-register inside a single
//! critical section, so a limit of `L` admits at most `L` concurrent
//! holders per (role, database, kind). Nothing in the admission or cache
//! paths blocks; rejection is immediate, never queued.
//!
//! ## Module Overview
//!
//! - [`limits`]: limit aggregate, most-restrictive fold, `qos.*` parser
//! - [`catalog`]: settings-catalog trait and in-memory implementation
//! - [`shared`]: the shared region (stats, epoch, slots, affinity table)
//! - [`governor`]: [`Governor`]/[`Session`] handles and the hook surface
//! - [`cpu`]: plan-tree worker clamping and CPU affinity assignment
//! - [`error`]: client-facing errors with host error codes

pub mod catalog;
pub mod config;
pub mod cpu;
pub mod error;
pub mod governor;
pub mod limits;
pub mod shared;
pub mod types;

pub use catalog::{
    limits_for_database, limits_for_role, limits_for_role_in_database, AlterAction, MemoryCatalog,
    SettingRow, SettingScope, SettingsCatalog,
};
pub use cpu::{rewrite_plan, Plan, PlanNode, PlanNodeTag};
pub use error::{ErrorCode, LimitExceeded, LimitKind, WorkMemExceeded};
pub use governor::{
    Governor, GovernorBuilder, Session, SetValue, TransactionEvent, UtilityOutcome, UtilityStmt,
};
pub use limits::{ErrorLevel, Limits, ParseError, StatementKind};
pub use shared::Stats;
pub use types::{BackendId, DatabaseId, RoleId};
