//! # Effective-Limit Cache
//!
//! Each session caches the most-restrictive fold of its role-scoped and
//! database-scoped limits so admission never touches the catalog. The cache
//! is invalidated by three signals: the shared settings epoch moving (an
//! `ALTER ... SET qos.*` anywhere in the cluster), a host catalog
//! invalidation for roles or databases, or the session's own identity
//! changing. Refresh performs catalog reads and must only run where the
//! host permits catalog access: statement boundaries, never inside the
//! region lock.

use eyre::Result;
use tracing::debug;

use crate::catalog::{limits_for_database, limits_for_role};
use crate::limits::Limits;
use crate::types::{DatabaseId, RoleId};

use super::Session;

/// Session-private cache of the effective limits.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct LimitCache {
    pub(crate) limits: Limits,
    pub(crate) role: RoleId,
    pub(crate) database: DatabaseId,
    pub(crate) last_seen_epoch: u32,
    pub(crate) valid: bool,
}

impl Session {
    /// Returns the effective limits, refreshing the cache if the epoch
    /// moved, an invalidation arrived, or the session identity changed.
    ///
    /// Caller contract: statement boundary only (refresh reads the
    /// catalog).
    pub fn effective_limits(&mut self) -> Result<Limits> {
        let epoch = self.governor.settings_epoch();
        if epoch != self.cache.last_seen_epoch {
            self.cache.valid = false;
            self.cache.last_seen_epoch = epoch;
        }

        if self.cache.valid && self.cache.role == self.role && self.cache.database == self.database
        {
            return Ok(self.cache.limits);
        }

        let role_limits = limits_for_role(self.catalog.as_ref(), self.role)?;
        let database_limits = limits_for_database(self.catalog.as_ref(), self.database)?;

        self.cache.limits = Limits::most_restrictive(&role_limits, &database_limits);
        self.cache.role = self.role;
        self.cache.database = self.database;
        self.cache.valid = true;

        debug!(
            "qos: cached limits refreshed (role: {}, database: {}, epoch: {}): {:?}",
            self.role, self.database, epoch, self.cache.limits
        );
        Ok(self.cache.limits)
    }

    /// Drops the cached limits; the next statement refreshes.
    pub fn invalidate_cache(&mut self) {
        self.cache.valid = false;
    }

    /// Host invalidation callback: the role catalog changed.
    pub fn on_role_catalog_invalidation(&mut self) {
        debug!("qos: cache invalidated by role catalog change");
        self.invalidate_cache();
    }

    /// Host invalidation callback: the database catalog changed.
    pub fn on_database_catalog_invalidation(&mut self) {
        debug!("qos: cache invalidated by database catalog change");
        self.invalidate_cache();
    }

    /// Host relcache callback for the settings catalog itself.
    pub fn on_settings_relcache_invalidation(&mut self) {
        debug!("qos: cache invalidated by settings catalog change");
        self.invalidate_cache();
    }
}
