//! # Planner, Executor, and Transaction-Event Hooks
//!
//! The thin dispatchers the host's hook points call into. Each one checks
//! the enabled flag, then drives the cache, admission, rewriter, and
//! affinity components in the order the statement lifecycle demands. Logic
//! lives behind the component APIs so tests can drive the same paths
//! without a host.

use eyre::Result;
use tracing::{debug, warn};

use crate::cpu::affinity::{apply_affinity, get_or_assign_cores, online_cpu_count, AffinityApply};
use crate::cpu::{rewrite_plan, Plan};

use super::Session;

/// Host transaction-bus events the governor subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionEvent {
    Commit,
    Abort,
    /// Abort propagated from a parallel worker; must release tracking like
    /// a regular abort or counters leak.
    ParallelAbort,
}

impl Session {
    /// Planner hook: refresh limits, admit (unless suppressed for
    /// `EXPLAIN`/`PREPARE`), and clamp the plan's parallel workers.
    pub fn on_planner(&mut self, plan: &mut Plan) -> Result<()> {
        if !self.governor.is_enabled() {
            return Ok(());
        }

        let limits = self.effective_limits()?;

        if self.suppress_admission {
            // Consumed by the planning pass inside this utility call.
            self.suppress_admission = false;
        } else {
            self.admit_transaction()?;
            if let Some(kind) = plan.command {
                self.admit_statement(kind)?;
            }
        }

        if rewrite_plan(plan, &limits) {
            let mut shared = self.governor.shared();
            let stats = shared.stats_mut();
            stats.cpu_violations += 1;
            stats.throttled_queries += 1;
        }
        Ok(())
    }

    /// Executor-start hook: pin CPU affinity on first use, then admit as an
    /// idempotent safety net for paths that skip the planner hook
    /// (`EXECUTE` of a prepared statement).
    pub fn on_executor_start(&mut self, plan: &Plan) -> Result<()> {
        if !self.governor.is_enabled() {
            return Ok(());
        }

        self.pin_affinity_if_needed()?;

        self.admit_transaction()?;
        if let Some(kind) = plan.command {
            self.admit_statement(kind)?;
        }
        Ok(())
    }

    /// Executor-end hook.
    pub fn on_executor_end(&mut self) {
        if !self.governor.is_enabled() {
            return;
        }
        self.suppress_admission = false;
        self.end_statement();
        self.end_transaction();
    }

    /// Transaction-event hook: aborts are the recovery path for counters.
    pub fn on_transaction_event(&mut self, event: TransactionEvent) {
        if !self.governor.is_enabled() {
            return;
        }
        match event {
            TransactionEvent::Abort | TransactionEvent::ParallelAbort => {
                self.suppress_admission = false;
                self.release_on_abort();
            }
            TransactionEvent::Commit => {}
        }
    }

    /// Session-start `work_mem` enforcement site: given the session's
    /// current `work_mem` in kilobytes, returns the capped value the host
    /// should install, or `None` to leave it unchanged.
    pub fn enforce_session_work_mem(&mut self, current_kb: i64) -> Result<Option<i64>> {
        if !self.governor.is_enabled() {
            return Ok(None);
        }
        let Some(max_bytes) = self.effective_limits()?.work_mem_bytes else {
            return Ok(None);
        };
        let max_kb = max_bytes / 1024;
        if current_kb <= max_kb {
            return Ok(None);
        }
        debug!(
            "qos: applied work_mem limit of {} KB to session (was {} KB)",
            max_kb, current_kb
        );
        Ok(Some(max_kb))
    }

    /// Pins this process to the stable core set of its (database, role) at
    /// first execution with a positive core limit. Pin-once: the flag never
    /// resets, so later affinity-table eviction cannot repin a live
    /// session.
    pub fn pin_affinity_if_needed(&mut self) -> Result<()> {
        if !self.governor.is_enabled() || self.cpu_affinity_set {
            return Ok(());
        }

        let Some(core_limit) = self
            .effective_limits()?
            .cpu_core_limit
            .filter(|&limit| limit > 0)
        else {
            return Ok(());
        };

        let total = online_cpu_count();
        if total == 0 {
            return Ok(());
        }

        let mut requested = core_limit as usize;
        if requested > total {
            warn!(
                "qos: cpu_core_limit {} exceeds {} online cores, clamping",
                core_limit, total
            );
            requested = total;
        }

        let cores = get_or_assign_cores(&self.governor, self.database, self.role, requested, total);

        match apply_affinity(&cores) {
            Ok(AffinityApply::Applied) => {
                self.cpu_affinity_set = true;
                debug!(
                    "qos: cpu affinity set to {:?} (role: {}, database: {})",
                    cores.as_slice(),
                    self.role,
                    self.database
                );
            }
            Ok(AffinityApply::Unsupported) => {
                self.cpu_affinity_set = true;
                debug!(
                    "qos: cpu affinity not supported on this platform, \
                     parallel workers limited via planner only"
                );
            }
            Err(err) => {
                // Leave the flag unset so the next statement retries.
                warn!("qos: failed to set cpu affinity: {}", err);
            }
        }
        Ok(())
    }
}
