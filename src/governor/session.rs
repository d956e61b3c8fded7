//! # Per-Backend Session Handle
//!
//! One [`Session`] exists per backend process; the host guarantees a single
//! session per process, so the handle is `!Sync` state owned by that
//! process's thread. It carries the session identity, the effective-limit
//! cache, and the tracked flags that make admission idempotent. Dropping
//! the handle zeroes the backend's shared slot, which is the in-crate
//! analog of process exit.

use std::sync::Arc;

use tracing::debug;

use crate::catalog::SettingsCatalog;
use crate::governor::cache::LimitCache;
use crate::governor::Governor;
use crate::limits::StatementKind;
use crate::types::{BackendId, DatabaseId, RoleId};

/// Per-session governor handle, one per backend.
pub struct Session {
    pub(crate) governor: Arc<Governor>,
    pub(crate) catalog: Arc<dyn SettingsCatalog>,
    pub(crate) backend: BackendId,
    pub(crate) pid: u32,
    pub(crate) role: RoleId,
    pub(crate) database: DatabaseId,
    pub(crate) cache: LimitCache,
    pub(crate) transaction_tracked: bool,
    pub(crate) tracked_statement: Option<StatementKind>,
    pub(crate) suppress_admission: bool,
    pub(crate) cpu_affinity_set: bool,
}

impl Session {
    pub(crate) fn new(
        governor: Arc<Governor>,
        catalog: Arc<dyn SettingsCatalog>,
        backend: BackendId,
        pid: u32,
        role: RoleId,
        database: DatabaseId,
    ) -> Self {
        debug!(
            "qos: session opened (backend: {}, pid: {}, role: {}, database: {})",
            backend, pid, role, database
        );
        Self {
            governor,
            catalog,
            backend,
            pid,
            role,
            database,
            cache: LimitCache::default(),
            transaction_tracked: false,
            tracked_statement: None,
            suppress_admission: false,
            cpu_affinity_set: false,
        }
    }

    pub fn backend(&self) -> BackendId {
        self.backend
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn role(&self) -> RoleId {
        self.role
    }

    pub fn database(&self) -> DatabaseId {
        self.database
    }

    pub fn governor(&self) -> &Arc<Governor> {
        &self.governor
    }

    /// Updates the session identity after `SET ROLE` or a database switch.
    /// The limit cache notices the change at the next refresh.
    pub fn set_identity(&mut self, role: RoleId, database: DatabaseId) {
        self.role = role;
        self.database = database;
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // Process exit is the only point where pid is zeroed.
        self.governor.clear_backend(self.backend);
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("backend", &self.backend)
            .field("pid", &self.pid)
            .field("role", &self.role)
            .field("database", &self.database)
            .field("transaction_tracked", &self.transaction_tracked)
            .field("tracked_statement", &self.tracked_statement)
            .finish()
    }
}
