//! # Shared Region Layout and Primitives
//!
//! The region is built once at governor construction, after the embedder
//! publishes its backend count, and is torn down only with the process. All
//! methods here assume the caller holds the region lock; none of them block
//! or perform I/O.
//!
//! ## Slot Ownership
//!
//! Each backend exclusively mutates the [`BackendStatus`] slot at its own
//! index and scans every slot when counting peers. A slot with `pid == 0` is
//! empty. Pid recycling by the host is safe: a new session's first admission
//! overwrites the slot's identity fields before any peer can match them.
//!
//! ## Affinity Table
//!
//! Entries are unique by `(database, role)` and bounded by
//! [`MAX_AFFINITY_ENTRIES`]. On overflow the oldest-inserted entry is
//! evicted by shifting the table left one position and placing the new entry
//! last, so table order is insertion order.

use smallvec::SmallVec;

use crate::config::{MAX_AFFINITY_ENTRIES, MAX_CORES_PER_ENTRY};
use crate::limits::StatementKind;
use crate::shared::Stats;
use crate::types::{BackendId, DatabaseId, RoleId};

/// Core indices assigned to one (database, role) pair. Bounded by
/// [`MAX_CORES_PER_ENTRY`], so the list never allocates.
pub type CoreList = SmallVec<[u16; MAX_CORES_PER_ENTRY]>;

/// One slot of the per-backend status array.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendStatus {
    /// Non-zero while the slot is occupied.
    pub pid: u32,
    pub role: RoleId,
    pub database: DatabaseId,
    pub current_cmd: Option<StatementKind>,
    pub in_transaction: bool,
}

impl BackendStatus {
    pub fn is_empty(&self) -> bool {
        self.pid == 0
    }

    pub fn clear(&mut self) {
        *self = BackendStatus::default();
    }
}

/// Stable core assignment for one (database, role) pair. `key == None`
/// marks an empty table slot.
#[derive(Debug, Clone, Default)]
pub struct AffinityEntry {
    pub key: Option<(DatabaseId, RoleId)>,
    pub cores: CoreList,
}

/// What an admission scan counts peers against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerFilter {
    Transaction,
    Statement(StatementKind),
}

/// The shared region. One exclusive lock in the governor guards all of it.
#[derive(Debug)]
pub struct SharedState {
    settings_epoch: u32,
    next_cpu_core: u32,
    stats: Stats,
    affinity: Vec<AffinityEntry>,
    backends: Vec<BackendStatus>,
}

impl SharedState {
    pub fn new(max_backends: usize) -> Self {
        Self {
            settings_epoch: 0,
            next_cpu_core: 0,
            stats: Stats::default(),
            affinity: vec![AffinityEntry::default(); MAX_AFFINITY_ENTRIES],
            backends: vec![BackendStatus::default(); max_backends],
        }
    }

    pub fn max_backends(&self) -> usize {
        self.backends.len()
    }

    pub fn settings_epoch(&self) -> u32 {
        self.settings_epoch
    }

    /// Monotone bump, visible to every session's next refresh.
    pub fn bump_settings_epoch(&mut self) -> u32 {
        self.settings_epoch = self.settings_epoch.wrapping_add(1);
        self.settings_epoch
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn stats_mut(&mut self) -> &mut Stats {
        &mut self.stats
    }

    pub fn backend(&self, id: BackendId) -> &BackendStatus {
        &self.backends[id.0]
    }

    pub fn backend_mut(&mut self, id: BackendId) -> &mut BackendStatus {
        &mut self.backends[id.0]
    }

    /// Counts occupied slots other than `me` registered for the same
    /// (role, database) and matching `filter`.
    pub fn count_peers(
        &self,
        me: BackendId,
        role: RoleId,
        database: DatabaseId,
        filter: PeerFilter,
    ) -> u32 {
        self.backends
            .iter()
            .enumerate()
            .filter(|&(index, slot)| {
                index != me.0
                    && !slot.is_empty()
                    && slot.role == role
                    && slot.database == database
                    && match filter {
                        PeerFilter::Transaction => slot.in_transaction,
                        PeerFilter::Statement(kind) => slot.current_cmd == Some(kind),
                    }
            })
            .count() as u32
    }

    /// Copies the cached core assignment for `key`, if present.
    pub fn affinity_lookup(&self, key: (DatabaseId, RoleId)) -> Option<CoreList> {
        self.affinity
            .iter()
            .find(|entry| entry.key == Some(key))
            .map(|entry| entry.cores.clone())
    }

    /// Inserts an assignment for `key`, preferring the first empty slot.
    /// When the table is full, evicts the oldest entry by left-shift and
    /// places the new entry last.
    pub fn affinity_insert(&mut self, key: (DatabaseId, RoleId), cores: CoreList) {
        if let Some(slot) = self.affinity.iter_mut().find(|entry| entry.key.is_none()) {
            slot.key = Some(key);
            slot.cores = cores;
            return;
        }
        let last = self.affinity.len() - 1;
        for i in 0..last {
            self.affinity[i] = self.affinity[i + 1].clone();
        }
        self.affinity[last] = AffinityEntry {
            key: Some(key),
            cores,
        };
    }

    /// Round-robin fallback for core selection: takes `requested`
    /// consecutive cores starting at the shared cursor, advancing it.
    pub fn round_robin_cores(&mut self, requested: usize, total: usize) -> CoreList {
        let start = self.next_cpu_core as usize % total;
        self.next_cpu_core = ((start + requested) % total) as u32;
        (0..requested).map(|i| ((start + i) % total) as u16).collect()
    }
}
