//! # Cluster-Wide Shared State
//!
//! The single shared region every backend sees: monotone statistics
//! counters, the settings-change epoch, the round-robin core cursor, the
//! bounded affinity table, and the per-backend status array. The
//! [`Governor`](crate::governor::Governor) owns the region behind one
//! exclusive lock for the life of the process.
//!
//! ## Concurrency Contract
//!
//! Every mutation of any field happens while holding the region lock
//! exclusively. Critical sections are short: a backend-array scan bounded by
//! `max_backends`, an affinity-table scan bounded by
//! [`MAX_AFFINITY_ENTRIES`](crate::config::MAX_AFFINITY_ENTRIES), or a
//! single counter bump. Readers copy what they need and never retain
//! references past unlock. Anything slow (catalog reads, CPU sampling) runs
//! outside the lock.

pub mod state;
pub mod stats;

pub use state::{AffinityEntry, BackendStatus, CoreList, PeerFilter, SharedState};
pub use stats::Stats;
