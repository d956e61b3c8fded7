//! # Utility-Statement Hook
//!
//! Runs before the host's utility dispatch. Four statement shapes matter:
//!
//! - `SET work_mem = V`: enforce the cached limit, rejecting or capping
//!   per the `work_mem_error_level` policy.
//! - `SET qos.* = V`: strict name/value validation.
//! - `ALTER ROLE ... SET` / `ALTER DATABASE ... SET`: validate, delegate
//!   persistence to the catalog, then bump the settings epoch so every live
//!   session refreshes at its next statement.
//! - `EXPLAIN` without `ANALYZE`, and `PREPARE`: set the suppress-admission
//!   flag so analysis-only planning does not consume concurrency budget.
//!
//! Everything else passes through untouched.

use eyre::Result;
use tracing::{debug, warn};

use crate::catalog::{AlterAction, SettingScope};
use crate::config::QOS_SETTING_PREFIX;
use crate::error::WorkMemExceeded;
use crate::limits::model::ErrorLevel;
use crate::limits::parse::{apply_value, parse_boolean_setting, parse_memory};
use crate::limits::Limits;
use crate::types::{DatabaseId, RoleId};

use super::Session;

/// The value of a `SET` statement as the host parser delivers it: a bare
/// integer (kilobytes for `work_mem`) or a string literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetValue<'a> {
    Kilobytes(i64),
    Text(&'a str),
}

/// The utility statements the governor inspects, borrowed from the host's
/// parse tree. Everything else arrives as [`UtilityStmt::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UtilityStmt<'a> {
    Set {
        name: &'a str,
        value: SetValue<'a>,
    },
    AlterRoleSet {
        role: RoleId,
        /// `ALTER ROLE ... IN DATABASE ...` targets the combined scope.
        database: Option<DatabaseId>,
        action: AlterAction<'a>,
    },
    AlterDatabaseSet {
        database: DatabaseId,
        action: AlterAction<'a>,
    },
    Explain {
        analyze: bool,
    },
    Prepare,
    Other,
}

/// What the host should do after the hook returns successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UtilityOutcome {
    /// Dispatch the statement unchanged.
    Proceed,
    /// Dispatch `SET work_mem`, but with the value capped to this many
    /// kilobytes (`work_mem_error_level = warning` policy).
    WorkMemCapped { kilobytes: i64 },
}

impl Session {
    /// Utility-dispatch interception. Returns how the host should proceed;
    /// errors abort the statement.
    pub fn on_utility(&mut self, stmt: &UtilityStmt<'_>) -> Result<UtilityOutcome> {
        if !self.governor.is_enabled() {
            return Ok(UtilityOutcome::Proceed);
        }

        match *stmt {
            UtilityStmt::Set { name: "work_mem", value } => self.enforce_work_mem(value),
            UtilityStmt::Set { name, value } if name.starts_with(QOS_SETTING_PREFIX) => {
                self.set_qos_setting(name, value)?;
                Ok(UtilityOutcome::Proceed)
            }
            UtilityStmt::Set { .. } => Ok(UtilityOutcome::Proceed),
            UtilityStmt::AlterRoleSet {
                role,
                database,
                action,
            } => {
                let scope = match database {
                    Some(database) => SettingScope::RoleInDatabase(role, database),
                    None => SettingScope::Role(role),
                };
                self.handle_alter(scope, &action)?;
                Ok(UtilityOutcome::Proceed)
            }
            UtilityStmt::AlterDatabaseSet { database, action } => {
                self.handle_alter(SettingScope::Database(database), &action)?;
                Ok(UtilityOutcome::Proceed)
            }
            UtilityStmt::Explain { analyze: false } | UtilityStmt::Prepare => {
                debug!("qos: suppressing admission for analysis-only statement");
                self.suppress_admission = true;
                Ok(UtilityOutcome::Proceed)
            }
            UtilityStmt::Explain { analyze: true } | UtilityStmt::Other => {
                Ok(UtilityOutcome::Proceed)
            }
        }
    }

    /// `SET work_mem` enforcement site. Rejects under the `error` policy,
    /// caps with a warning under `warning`.
    fn enforce_work_mem(&mut self, value: SetValue<'_>) -> Result<UtilityOutcome> {
        let limits = self.effective_limits()?;
        let Some(max_bytes) = limits.work_mem_bytes else {
            return Ok(UtilityOutcome::Proceed);
        };

        let requested_bytes = match value {
            SetValue::Kilobytes(kb) => match kb.checked_mul(1024) {
                Some(bytes) => bytes,
                None => i64::MAX,
            },
            SetValue::Text(text) => match parse_memory(text) {
                Ok(bytes) if bytes >= 0 => bytes,
                // Malformed or sentinel values are the host's to reject.
                _ => return Ok(UtilityOutcome::Proceed),
            },
        };

        if requested_bytes <= max_bytes {
            return Ok(UtilityOutcome::Proceed);
        }

        match limits.error_level() {
            ErrorLevel::Error => {
                self.governor.shared().stats_mut().work_mem_violations += 1;
                Err(WorkMemExceeded {
                    requested_kb: requested_bytes / 1024,
                    max_kb: max_bytes / 1024,
                }
                .into())
            }
            ErrorLevel::Warning => {
                {
                    let mut shared = self.governor.shared();
                    let stats = shared.stats_mut();
                    stats.work_mem_violations += 1;
                    stats.throttled_queries += 1;
                }
                warn!(
                    "qos: work_mem request of {} KB capped to limit of {} KB",
                    requested_bytes / 1024,
                    max_bytes / 1024
                );
                Ok(UtilityOutcome::WorkMemCapped {
                    kilobytes: max_bytes / 1024,
                })
            }
        }
    }

    /// Strict validation of a direct `SET qos.* = V`. Also applies the
    /// reloadable `qos.enabled` flag.
    fn set_qos_setting(&mut self, name: &str, value: SetValue<'_>) -> Result<()> {
        let rendered;
        let text = match value {
            SetValue::Text(text) => text,
            SetValue::Kilobytes(number) => {
                rendered = number.to_string();
                &rendered
            }
        };

        if name == "qos.enabled" {
            let enabled = parse_boolean_setting(name, text)?;
            self.governor.set_enabled(enabled);
            return Ok(());
        }

        let mut scratch = Limits::default();
        apply_value(&mut scratch, name, text, true)?;
        Ok(())
    }

    /// `ALTER ROLE/DATABASE ... SET` handling: validate `qos.*` payloads in
    /// strict mode, persist through the catalog, and bump the settings
    /// epoch on success so peers refresh.
    fn handle_alter(&mut self, scope: SettingScope, action: &AlterAction<'_>) -> Result<()> {
        let touches_qos = match *action {
            AlterAction::Set { name, value } => {
                if name.starts_with(QOS_SETTING_PREFIX) {
                    let mut scratch = Limits::default();
                    apply_value(&mut scratch, name, value, true)?;
                    true
                } else {
                    false
                }
            }
            AlterAction::ResetAll => true,
        };

        self.catalog.apply_alter(scope, action)?;

        if touches_qos {
            let epoch = self.governor.bump_settings_epoch();
            debug!("qos: settings epoch bumped to {} by {:?}", epoch, scope);
            self.invalidate_cache();
        }
        Ok(())
    }
}
