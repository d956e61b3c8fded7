//! # Governor Configuration Constants
//!
//! All sizing and timing constants for the governor in one place. When
//! changing a constant, check the notes on the ones that depend on it.
//!
//! ```text
//! MAX_AFFINITY_ENTRIES (128)
//!       │
//!       └─> Upper bound on distinct (database, role) pairs with stable
//!           core assignments. Overflow evicts the oldest entry.
//!
//! MAX_CORES_PER_ENTRY (64)
//!       │
//!       └─> Inline capacity of every affinity entry's core list. Requested
//!           core counts are clamped here before assignment, so the list
//!           never spills to the heap.
//!
//! DEFAULT_MAX_BACKENDS (128)
//!       │
//!       └─> Sizes the shared backend-status array when the embedder does
//!           not supply the host's own MaxBackends.
//! ```

use std::time::Duration;

/// Maximum number of (database, role) pairs with a cached core assignment.
/// When the table is full, the oldest entry is evicted by left-shift.
pub const MAX_AFFINITY_ENTRIES: usize = 128;

/// Maximum cores recorded per affinity entry. Core-limit values above this
/// are clamped before assignment.
pub const MAX_CORES_PER_ENTRY: usize = 64;

/// Default size of the per-backend status array when the embedder does not
/// provide the host's MaxBackends.
pub const DEFAULT_MAX_BACKENDS: usize = 128;

/// Sampling window for the per-CPU busyness measurement used by the
/// least-busy core selector. Kept short: the sample runs at first pin per
/// (database, role) on the session's own thread, outside the shared lock.
pub const CPU_SAMPLE_WINDOW: Duration = Duration::from_millis(1);

/// Namespace prefix of every setting the governor interprets. Entries in the
/// host catalog that do not start with this prefix are ignored.
pub const QOS_SETTING_PREFIX: &str = "qos.";
