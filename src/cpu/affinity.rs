//! # CPU Affinity Assignment
//!
//! Resolves a stable core set per (database, role) and pins the session's
//! process to it. Resolution goes through the shared affinity table so that
//! every session of the same pair lands on the same cores; selection
//! prefers the least-busy cores from a short busyness sample and falls back
//! to round-robin from the shared cursor when sampling is unavailable.
//!
//! ## Lock Discipline
//!
//! The busyness sample blocks for about a millisecond, so
//! [`get_or_assign_cores`] never holds the region lock across it: scan under
//! the lock, release, sample, re-acquire, re-check for a concurrent insert,
//! then insert. Losing the race means adopting the winner's cores, which is
//! exactly the stability the table exists to provide.
//!
//! ## Platform Gating
//!
//! Applying the mask uses `sched_setaffinity` and exists only on Linux.
//! Elsewhere [`apply_affinity`] reports [`AffinityApply::Unsupported`] and
//! CPU control is reduced to the planner's worker clamp.

use std::sync::OnceLock;

use eyre::Result;
use sysinfo::System;

use crate::config::{CPU_SAMPLE_WINDOW, MAX_CORES_PER_ENTRY};
use crate::governor::Governor;
use crate::shared::CoreList;
use crate::types::{DatabaseId, RoleId};

static ONLINE_CPUS: OnceLock<usize> = OnceLock::new();

/// Number of online CPUs, discovered once per process.
pub fn online_cpu_count() -> usize {
    *ONLINE_CPUS.get_or_init(|| {
        let mut sys = System::new();
        sys.refresh_cpu_usage();
        sys.cpus().len()
    })
}

/// Samples per-CPU busyness over [`CPU_SAMPLE_WINDOW`] and returns the
/// `requested` least-busy core indices, ties resolved by index. `None` when
/// the platform yields no usable readings.
pub fn least_busy_cores(requested: usize) -> Option<CoreList> {
    let mut sys = System::new();
    sys.refresh_cpu_usage();
    std::thread::sleep(CPU_SAMPLE_WINDOW);
    sys.refresh_cpu_usage();

    let cpus = sys.cpus();
    if cpus.is_empty() {
        return None;
    }

    let mut usage: Vec<(u16, f32)> = cpus
        .iter()
        .enumerate()
        .map(|(index, cpu)| (index as u16, cpu.cpu_usage()))
        .collect();
    if usage.iter().any(|&(_, load)| !load.is_finite()) {
        return None;
    }

    usage.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
    Some(usage.iter().take(requested).map(|&(index, _)| index).collect())
}

/// Resolves the stable core set for `(database, role)`, assigning one if
/// the shared table has none yet.
pub fn get_or_assign_cores(
    governor: &Governor,
    database: DatabaseId,
    role: RoleId,
    requested: usize,
    total: usize,
) -> CoreList {
    let requested = requested.min(total).min(MAX_CORES_PER_ENTRY).max(1);
    let key = (database, role);

    if let Some(cores) = governor.shared().affinity_lookup(key) {
        return cores;
    }

    // Sampling is slow; run it with the lock released.
    let sampled = least_busy_cores(requested);

    let mut shared = governor.shared();
    if let Some(cores) = shared.affinity_lookup(key) {
        // Another backend assigned the pair while we sampled.
        return cores;
    }
    let cores = match sampled {
        Some(cores) => cores,
        None => shared.round_robin_cores(requested, total),
    };
    shared.affinity_insert(key, cores.clone());
    cores
}

/// Outcome of applying an affinity mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AffinityApply {
    Applied,
    Unsupported,
}

/// Pins the current process to `cores`.
#[cfg(target_os = "linux")]
pub fn apply_affinity(cores: &[u16]) -> Result<AffinityApply> {
    use nix::sched::{sched_setaffinity, CpuSet};
    use nix::unistd::Pid;

    let mut set = CpuSet::new();
    for &core in cores {
        set.set(core as usize)?;
    }
    sched_setaffinity(Pid::from_raw(0), &set)?;
    Ok(AffinityApply::Applied)
}

#[cfg(not(target_os = "linux"))]
pub fn apply_affinity(_cores: &[u16]) -> Result<AffinityApply> {
    Ok(AffinityApply::Unsupported)
}
