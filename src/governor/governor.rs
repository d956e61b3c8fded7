//! # Process-Lifetime Governor Handle
//!
//! One [`Governor`] exists per host process tree, built during the host's
//! shared-memory startup hook and never torn down. It owns the shared
//! region behind the single exclusive lock and carries the reloadable
//! `qos.enabled` flag. Operator-facing functions (version, stats, reset)
//! live here.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use eyre::{ensure, Result};
use parking_lot::{Mutex, MutexGuard};
use tracing::info;

use crate::catalog::SettingsCatalog;
use crate::config::DEFAULT_MAX_BACKENDS;
use crate::governor::Session;
use crate::shared::{SharedState, Stats};
use crate::types::{BackendId, DatabaseId, RoleId};

/// Fluent configuration for [`Governor`] construction.
#[derive(Debug, Clone)]
pub struct GovernorBuilder {
    max_backends: usize,
    enabled: bool,
}

impl Default for GovernorBuilder {
    fn default() -> Self {
        Self {
            max_backends: DEFAULT_MAX_BACKENDS,
            enabled: true,
        }
    }
}

impl GovernorBuilder {
    /// Sizes the shared backend-status array. Pass the host's MaxBackends.
    pub fn max_backends(mut self, max_backends: usize) -> Self {
        self.max_backends = max_backends;
        self
    }

    /// Initial state of the reloadable `qos.enabled` flag.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn build(self) -> Arc<Governor> {
        info!(
            "qos: governor initialized (max_backends: {}, enabled: {})",
            self.max_backends, self.enabled
        );
        Arc::new(Governor {
            shared: Mutex::new(SharedState::new(self.max_backends)),
            enabled: AtomicBool::new(self.enabled),
            max_backends: self.max_backends,
        })
    }
}

/// The cluster-wide governor. All shared mutable state lives behind its
/// region lock; sessions hold an `Arc` to it for the process lifetime.
#[derive(Debug)]
pub struct Governor {
    shared: Mutex<SharedState>,
    enabled: AtomicBool,
    max_backends: usize,
}

impl Governor {
    pub fn builder() -> GovernorBuilder {
        GovernorBuilder::default()
    }

    /// Version banner for the operator `qos_version()` function.
    pub fn version() -> String {
        format!(
            "qosgov {} (admission + worker clamping + cpu pinning)",
            env!("CARGO_PKG_VERSION")
        )
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Reloadable `qos.enabled`. When false, every hook and admission
    /// operation returns immediately without effect.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    pub fn max_backends(&self) -> usize {
        self.max_backends
    }

    pub(crate) fn shared(&self) -> MutexGuard<'_, SharedState> {
        self.shared.lock()
    }

    /// Opens the per-backend handle for slot `backend`.
    ///
    /// The host guarantees `backend` is stable for the session's lifetime
    /// and unique among live sessions.
    pub fn session(
        self: &Arc<Self>,
        backend: BackendId,
        pid: u32,
        role: RoleId,
        database: DatabaseId,
        catalog: Arc<dyn SettingsCatalog>,
    ) -> Result<Session> {
        ensure!(
            backend.0 < self.max_backends,
            "backend index {} out of range (max_backends: {})",
            backend,
            self.max_backends
        );
        ensure!(pid != 0, "backend pid must be non-zero");
        Ok(Session::new(Arc::clone(self), catalog, backend, pid, role, database))
    }

    /// Snapshot of the cluster-wide counters.
    pub fn stats(&self) -> Stats {
        *self.shared().stats()
    }

    /// Operator `qos_get_stats()` rendering.
    pub fn stats_text(&self) -> String {
        self.stats().to_string()
    }

    /// Operator `qos_reset_stats()`: zeros the entire stats struct under
    /// the region lock.
    pub fn reset_stats(&self) {
        self.shared().stats_mut().reset();
    }

    pub fn settings_epoch(&self) -> u32 {
        self.shared().settings_epoch()
    }

    /// Bumps the settings-change epoch. Called by the utility hook after
    /// the host successfully persists an `ALTER ... SET qos.*`.
    pub fn bump_settings_epoch(&self) -> u32 {
        self.shared().bump_settings_epoch()
    }

    /// Host process-exit path: zeroes the backend's slot so peer scans stop
    /// matching it. Sessions also do this on drop.
    pub fn clear_backend(&self, backend: BackendId) {
        if backend.0 < self.max_backends {
            self.shared().backend_mut(backend).clear();
        }
    }
}
