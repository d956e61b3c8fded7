//! # Statement and Transaction Admission
//!
//! Admission is check-then-register in a single critical section: scan the
//! shared backend array for peers of the same (role, database) holding the
//! same resource, refuse if the count reaches the effective limit, else
//! register this backend's slot. Because the scan and the write share one
//! lock hold, two racing admissions cannot both observe `count < limit` and
//! both register, so at most `limit` backends hold a resource at any
//! instant.
//!
//! Limits are read from the session cache before the lock is taken; the
//! refresh path reads the catalog and must never run under the region lock.
//!
//! Release clears only the field being released and leaves `pid` set; the
//! slot empties when the session ends. The transaction-event hook is the
//! sole recovery path for counters after an aborted statement.

use eyre::Result;
use tracing::debug;

use crate::error::{LimitExceeded, LimitKind};
use crate::limits::StatementKind;
use crate::shared::PeerFilter;

use super::Session;

impl Session {
    /// Admits and registers an open transaction. Idempotent per backend
    /// until [`Session::end_transaction`].
    pub fn admit_transaction(&mut self) -> Result<()> {
        if !self.governor.is_enabled() || self.transaction_tracked {
            return Ok(());
        }

        let limit = self.effective_limits()?.max_concurrent_tx;

        let mut shared = self.governor.shared();
        if let Some(max) = limit.filter(|&max| max > 0) {
            let current =
                shared.count_peers(self.backend, self.role, self.database, PeerFilter::Transaction);
            if current >= max as u32 {
                let stats = shared.stats_mut();
                stats.concurrent_tx_violations += 1;
                stats.rejected_queries += 1;
                drop(shared);
                return Err(LimitExceeded {
                    kind: LimitKind::Transactions,
                    current,
                    max,
                }
                .into());
            }
        }

        let slot = shared.backend_mut(self.backend);
        slot.pid = self.pid;
        slot.role = self.role;
        slot.database = self.database;
        slot.in_transaction = true;
        drop(shared);

        self.transaction_tracked = true;
        Ok(())
    }

    /// Admits and registers one statement of `kind`. Idempotent per backend
    /// until [`Session::end_statement`]: a second admission before the end,
    /// even of a different kind, is a no-op: one statement at a time per
    /// backend.
    pub fn admit_statement(&mut self, kind: StatementKind) -> Result<()> {
        if !self.governor.is_enabled() || self.tracked_statement.is_some() {
            return Ok(());
        }

        let limit = self.effective_limits()?.statement_limit(kind);

        let mut shared = self.governor.shared();
        if let Some(max) = limit.filter(|&max| max > 0) {
            let current = shared.count_peers(
                self.backend,
                self.role,
                self.database,
                PeerFilter::Statement(kind),
            );
            if current >= max as u32 {
                let stats = shared.stats_mut();
                *stats.statement_violations_mut(kind) += 1;
                stats.rejected_queries += 1;
                drop(shared);
                return Err(LimitExceeded {
                    kind: LimitKind::Statements(kind),
                    current,
                    max,
                }
                .into());
            }
        }

        let slot = shared.backend_mut(self.backend);
        slot.pid = self.pid;
        slot.role = self.role;
        slot.database = self.database;
        slot.current_cmd = Some(kind);
        shared.stats_mut().total_queries += 1;
        drop(shared);

        self.tracked_statement = Some(kind);
        Ok(())
    }

    /// Clears this backend's statement registration. `pid` stays set; the
    /// slot empties only when the session ends.
    pub fn end_statement(&mut self) {
        if !self.governor.is_enabled() || self.tracked_statement.is_none() {
            return;
        }

        let mut shared = self.governor.shared();
        let slot = shared.backend_mut(self.backend);
        // The slot may have been cleared by an exit path already.
        if slot.pid == self.pid {
            slot.current_cmd = None;
        }
        drop(shared);

        self.tracked_statement = None;
    }

    /// Clears this backend's transaction registration.
    pub fn end_transaction(&mut self) {
        if !self.governor.is_enabled() || !self.transaction_tracked {
            return;
        }

        let mut shared = self.governor.shared();
        let slot = shared.backend_mut(self.backend);
        if slot.pid == self.pid {
            slot.in_transaction = false;
        }
        drop(shared);

        self.transaction_tracked = false;
    }

    /// Abort recovery: releases whatever this backend had registered.
    pub(crate) fn release_on_abort(&mut self) {
        if self.tracked_statement.is_some() || self.transaction_tracked {
            debug!(
                "qos: releasing tracked state on abort (backend: {}, statement: {:?}, transaction: {})",
                self.backend, self.tracked_statement, self.transaction_tracked
            );
        }
        self.end_statement();
        self.end_transaction();
    }
}
