//! # Limit Aggregate
//!
//! The [`Limits`] struct is the unit the catalog reader produces per scope
//! and the effective-limit cache hands to admission, the planner rewriter,
//! and the affinity assigner. Role-scoped and database-scoped instances are
//! combined field-by-field by the most-restrictive rule: when both scopes
//! configure a bound, the smaller wins.

/// The four data-manipulation statement kinds with concurrency bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Select,
    Update,
    Delete,
    Insert,
}

impl StatementKind {
    /// SQL keyword, for error messages and log lines.
    pub fn keyword(&self) -> &'static str {
        match self {
            StatementKind::Select => "SELECT",
            StatementKind::Update => "UPDATE",
            StatementKind::Delete => "DELETE",
            StatementKind::Insert => "INSERT",
        }
    }

    /// Suffix of the `qos.max_concurrent_*` setting that bounds this kind.
    pub fn setting_suffix(&self) -> &'static str {
        match self {
            StatementKind::Select => "select",
            StatementKind::Update => "update",
            StatementKind::Delete => "delete",
            StatementKind::Insert => "insert",
        }
    }

    pub const ALL: [StatementKind; 4] = [
        StatementKind::Select,
        StatementKind::Update,
        StatementKind::Delete,
        StatementKind::Insert,
    ];
}

/// Policy for over-limit `work_mem` requests: reject the statement, or cap
/// the value and log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorLevel {
    Warning,
    Error,
}

impl ErrorLevel {
    pub fn name(&self) -> &'static str {
        match self {
            ErrorLevel::Warning => "warning",
            ErrorLevel::Error => "error",
        }
    }
}

/// Aggregate of optional per-scope bounds. `None` means the scope does not
/// configure the bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Limits {
    /// Maximum effective working-memory budget per session, in bytes.
    pub work_mem_bytes: Option<i64>,
    /// Maximum CPU cores the session may use (including the main backend).
    pub cpu_core_limit: Option<i32>,
    /// Maximum concurrently open transactions per (role, database).
    pub max_concurrent_tx: Option<i32>,
    pub max_concurrent_select: Option<i32>,
    pub max_concurrent_update: Option<i32>,
    pub max_concurrent_delete: Option<i32>,
    pub max_concurrent_insert: Option<i32>,
    /// Whether an over-limit `SET work_mem` is rejected or capped.
    pub work_mem_error_level: Option<ErrorLevel>,
}

fn min_present<T: Ord + Copy>(a: Option<T>, b: Option<T>) -> Option<T> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.min(y)),
        (Some(x), None) => Some(x),
        (None, y) => y,
    }
}

impl Limits {
    /// Fold two scopes field-by-field: both present takes the smaller,
    /// one present takes it, neither leaves the field unset. For the
    /// error-level policy, `Error` is the more restrictive variant.
    pub fn most_restrictive(role: &Limits, database: &Limits) -> Limits {
        Limits {
            work_mem_bytes: min_present(role.work_mem_bytes, database.work_mem_bytes),
            cpu_core_limit: min_present(role.cpu_core_limit, database.cpu_core_limit),
            max_concurrent_tx: min_present(role.max_concurrent_tx, database.max_concurrent_tx),
            max_concurrent_select: min_present(
                role.max_concurrent_select,
                database.max_concurrent_select,
            ),
            max_concurrent_update: min_present(
                role.max_concurrent_update,
                database.max_concurrent_update,
            ),
            max_concurrent_delete: min_present(
                role.max_concurrent_delete,
                database.max_concurrent_delete,
            ),
            max_concurrent_insert: min_present(
                role.max_concurrent_insert,
                database.max_concurrent_insert,
            ),
            work_mem_error_level: max_error_level(
                role.work_mem_error_level,
                database.work_mem_error_level,
            ),
        }
    }

    /// Concurrency bound for one statement kind.
    pub fn statement_limit(&self, kind: StatementKind) -> Option<i32> {
        match kind {
            StatementKind::Select => self.max_concurrent_select,
            StatementKind::Update => self.max_concurrent_update,
            StatementKind::Delete => self.max_concurrent_delete,
            StatementKind::Insert => self.max_concurrent_insert,
        }
    }

    pub fn set_statement_limit(&mut self, kind: StatementKind, value: Option<i32>) {
        match kind {
            StatementKind::Select => self.max_concurrent_select = value,
            StatementKind::Update => self.max_concurrent_update = value,
            StatementKind::Delete => self.max_concurrent_delete = value,
            StatementKind::Insert => self.max_concurrent_insert = value,
        }
    }

    /// Effective policy when the scopes configure none.
    pub fn error_level(&self) -> ErrorLevel {
        self.work_mem_error_level.unwrap_or(ErrorLevel::Error)
    }

    pub fn is_unset(&self) -> bool {
        *self == Limits::default()
    }
}

fn max_error_level(a: Option<ErrorLevel>, b: Option<ErrorLevel>) -> Option<ErrorLevel> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.max(y)),
        (Some(x), None) => Some(x),
        (None, y) => y,
    }
}
