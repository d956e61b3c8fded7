//! # Governor Statistics
//!
//! Cluster-wide monotone counters. Mutated only under the shared region
//! lock; readers may observe intermediate increments but never decreases,
//! except through the explicit operator reset.

use crate::limits::StatementKind;

/// Monotone counters over admissions, refusals, and per-resource violations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    /// Statements successfully admitted.
    pub total_queries: u64,
    /// Statements that ran with a capped resource (work_mem or workers).
    pub throttled_queries: u64,
    /// Statements refused by admission.
    pub rejected_queries: u64,
    pub work_mem_violations: u64,
    pub cpu_violations: u64,
    pub concurrent_tx_violations: u64,
    pub concurrent_select_violations: u64,
    pub concurrent_update_violations: u64,
    pub concurrent_delete_violations: u64,
    pub concurrent_insert_violations: u64,
}

impl Stats {
    pub fn statement_violations_mut(&mut self, kind: StatementKind) -> &mut u64 {
        match kind {
            StatementKind::Select => &mut self.concurrent_select_violations,
            StatementKind::Update => &mut self.concurrent_update_violations,
            StatementKind::Delete => &mut self.concurrent_delete_violations,
            StatementKind::Insert => &mut self.concurrent_insert_violations,
        }
    }

    pub fn statement_violations(&self, kind: StatementKind) -> u64 {
        match kind {
            StatementKind::Select => self.concurrent_select_violations,
            StatementKind::Update => self.concurrent_update_violations,
            StatementKind::Delete => self.concurrent_delete_violations,
            StatementKind::Insert => self.concurrent_insert_violations,
        }
    }

    pub fn reset(&mut self) {
        *self = Stats::default();
    }
}

impl std::fmt::Display for Stats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "total: {}, throttled: {}, rejected: {}, violations: \
             work_mem {}, cpu {}, tx {}, select {}, update {}, delete {}, insert {}",
            self.total_queries,
            self.throttled_queries,
            self.rejected_queries,
            self.work_mem_violations,
            self.cpu_violations,
            self.concurrent_tx_violations,
            self.concurrent_select_violations,
            self.concurrent_update_violations,
            self.concurrent_delete_violations,
            self.concurrent_insert_violations,
        )
    }
}
