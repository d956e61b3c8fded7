//! # Parallel-Worker Rewriter
//!
//! The host planner hands its finished plan to the governor before
//! execution. This module models the slice of that plan the governor
//! touches: a tree of tagged nodes where gather and gather-merge nodes
//! carry a worker count, plus the plan's flat list of subplans. The rewrite
//! clamps every worker count to the session's core budget minus one (the
//! main backend consumes a core itself) and is idempotent.

use tracing::debug;

use crate::limits::{Limits, StatementKind};

/// Host-provided node tag. Only gather nodes are rewrite targets; every
/// other node participates solely as tree structure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlanNodeTag {
    Gather,
    GatherMerge,
    #[default]
    Other,
}

/// One node of the planned statement's tree.
#[derive(Debug, Clone, Default)]
pub struct PlanNode {
    pub tag: PlanNodeTag,
    pub num_workers: u32,
    pub left: Option<Box<PlanNode>>,
    pub right: Option<Box<PlanNode>>,
}

impl PlanNode {
    pub fn new(tag: PlanNodeTag, num_workers: u32) -> Self {
        PlanNode {
            tag,
            num_workers,
            ..PlanNode::default()
        }
    }
}

/// The planned statement as seen at the hook boundary.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    /// Command kind, for statement admission. `None` for utility plans.
    pub command: Option<StatementKind>,
    /// Whether the host planner chose any parallel path.
    pub parallel_mode_needed: bool,
    pub root: PlanNode,
    /// Initplans and subplans hanging off the main tree.
    pub subplans: Vec<PlanNode>,
}

impl Plan {
    pub fn new(command: StatementKind, root: PlanNode) -> Self {
        Plan {
            command: Some(command),
            parallel_mode_needed: true,
            root,
            subplans: Vec::new(),
        }
    }
}

/// Clamps every gather node's worker count to `max(0, cpu_core_limit - 1)`.
/// Returns whether any node was clamped.
pub fn rewrite_plan(plan: &mut Plan, limits: &Limits) -> bool {
    let Some(core_limit) = limits.cpu_core_limit.filter(|&limit| limit > 0) else {
        return false;
    };
    let max_workers = (core_limit - 1).max(0) as u32;

    let mut clamped = false;
    if plan.parallel_mode_needed {
        clamp_node(&mut plan.root, max_workers, &mut clamped);
    }
    for subplan in &mut plan.subplans {
        clamp_node(subplan, max_workers, &mut clamped);
    }
    clamped
}

fn clamp_node(node: &mut PlanNode, max_workers: u32, clamped: &mut bool) {
    if matches!(node.tag, PlanNodeTag::Gather | PlanNodeTag::GatherMerge)
        && node.num_workers > max_workers
    {
        debug!(
            "qos: limiting {:?} workers from {} to {}",
            node.tag, node.num_workers, max_workers
        );
        node.num_workers = max_workers;
        *clamped = true;
    }
    if let Some(left) = node.left.as_deref_mut() {
        clamp_node(left, max_workers, clamped);
    }
    if let Some(right) = node.right.as_deref_mut() {
        clamp_node(right, max_workers, clamped);
    }
}
