//! # Settings Catalog Access
//!
//! The host stores per-role and per-database settings as rows of
//! `"name=value"` text entries keyed by `(setdatabase, setrole)`. This module
//! defines the trait the governor reads that catalog through, the three
//! scope queries that fold a row into a [`Limits`], and an in-process
//! implementation used by embedders without a catalog of their own and by
//! the test suite.
//!
//! ## Scopes
//!
//! | Query | setdatabase | setrole |
//! |-------|-------------|---------|
//! | [`limits_for_role`] | none | role |
//! | [`limits_for_database`] | database | none |
//! | [`limits_for_role_in_database`] | database | role |
//!
//! Each query reads at most one row. Non-`qos.*` entries in a row are
//! ignored; malformed `qos.*` entries are dropped with a debug log
//! (non-strict parsing), so a stray row never breaks limit resolution.
//!
//! ## Persistence
//!
//! The governor never writes the catalog itself. `ALTER ... SET` handling in
//! the utility hook validates the payload, then delegates persistence
//! through [`SettingsCatalog::apply_alter`]; the host's implementation
//! writes its own catalog, and the hook bumps the settings epoch only after
//! that returns success.

use eyre::Result;
use hashbrown::HashMap;
use parking_lot::RwLock;

use crate::config::QOS_SETTING_PREFIX;
use crate::limits::parse::{format_memory, limits_from_entries, parse_entry, parse_memory};
use crate::limits::Limits;
use crate::types::{DatabaseId, RoleId};

/// Which `(setdatabase, setrole)` row a query or alteration targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingScope {
    Role(RoleId),
    Database(DatabaseId),
    RoleInDatabase(RoleId, DatabaseId),
}

impl SettingScope {
    fn key(&self) -> (Option<DatabaseId>, Option<RoleId>) {
        match *self {
            SettingScope::Role(role) => (None, Some(role)),
            SettingScope::Database(db) => (Some(db), None),
            SettingScope::RoleInDatabase(role, db) => (Some(db), Some(role)),
        }
    }
}

/// One alteration of a settings row, as produced by the utility hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlterAction<'a> {
    Set { name: &'a str, value: &'a str },
    ResetAll,
}

/// Read/alter access to the host's per-role/per-database settings catalog.
///
/// Readers must acquire only the minimum host lock needed to traverse the
/// catalog and must not retain references into host memory past the call.
pub trait SettingsCatalog: Send + Sync {
    /// The `"name=value"` entries of the row matching `scope`, or empty.
    fn settings_for(&self, scope: SettingScope) -> Result<Vec<String>>;

    /// Persists one alteration of the row matching `scope`.
    fn apply_alter(&self, scope: SettingScope, action: &AlterAction<'_>) -> Result<()>;
}

/// Limits configured against the role alone (`setdatabase` unset).
pub fn limits_for_role(catalog: &dyn SettingsCatalog, role: RoleId) -> Result<Limits> {
    let entries = catalog.settings_for(SettingScope::Role(role))?;
    Ok(limits_from_entries(&entries))
}

/// Limits configured against the database alone (`setrole` unset).
pub fn limits_for_database(catalog: &dyn SettingsCatalog, database: DatabaseId) -> Result<Limits> {
    let entries = catalog.settings_for(SettingScope::Database(database))?;
    Ok(limits_from_entries(&entries))
}

/// Limits configured against the role within one database.
pub fn limits_for_role_in_database(
    catalog: &dyn SettingsCatalog,
    role: RoleId,
    database: DatabaseId,
) -> Result<Limits> {
    let entries = catalog.settings_for(SettingScope::RoleInDatabase(role, database))?;
    Ok(limits_from_entries(&entries))
}

/// One row of the operator-facing settings projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingRow {
    pub database: Option<DatabaseId>,
    pub role: Option<RoleId>,
    pub name: String,
    pub value: String,
}

/// In-process settings catalog.
///
/// Embedders without a host catalog configure limits through this; the test
/// suite drives `ALTER`-shaped flows against it. Rows live behind one RwLock
/// since alterations are rare and reads are per-statement-refresh only.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    rows: RwLock<HashMap<(Option<DatabaseId>, Option<RoleId>), Vec<String>>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Operator projection: every `qos.*` entry across all rows, with
    /// memory literals normalized to canonical form ("64MB", "1GB").
    pub fn qos_rows(&self) -> Vec<SettingRow> {
        let rows = self.rows.read();
        let mut out = Vec::new();
        for (&(database, role), entries) in rows.iter() {
            for entry in entries {
                let Ok((name, value)) = parse_entry(entry) else {
                    continue;
                };
                if !name.starts_with(QOS_SETTING_PREFIX) {
                    continue;
                }
                let value = if name == "qos.work_mem_limit" {
                    parse_memory(value)
                        .map(format_memory)
                        .unwrap_or_else(|_| value.to_string())
                } else {
                    value.to_string()
                };
                out.push(SettingRow {
                    database,
                    role,
                    name: name.to_string(),
                    value,
                });
            }
        }
        out.sort_by(|a, b| (a.database, a.role, &a.name).cmp(&(b.database, b.role, &b.name)));
        out
    }
}

impl SettingsCatalog for MemoryCatalog {
    fn settings_for(&self, scope: SettingScope) -> Result<Vec<String>> {
        Ok(self
            .rows
            .read()
            .get(&scope.key())
            .cloned()
            .unwrap_or_default())
    }

    fn apply_alter(&self, scope: SettingScope, action: &AlterAction<'_>) -> Result<()> {
        let mut rows = self.rows.write();
        match *action {
            AlterAction::Set { name, value } => {
                let entries = rows.entry(scope.key()).or_default();
                let rendered = format!("{}={}", name, value);
                match entries.iter_mut().find(|entry| {
                    parse_entry(entry).is_ok_and(|(existing, _)| existing == name)
                }) {
                    Some(slot) => *slot = rendered,
                    None => entries.push(rendered),
                }
            }
            AlterAction::ResetAll => {
                rows.remove(&scope.key());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_queries_read_distinct_rows() {
        let catalog = MemoryCatalog::new();
        let role = RoleId(10);
        let db = DatabaseId(20);

        catalog
            .apply_alter(
                SettingScope::Role(role),
                &AlterAction::Set {
                    name: "qos.max_concurrent_tx",
                    value: "10",
                },
            )
            .unwrap();
        catalog
            .apply_alter(
                SettingScope::Database(db),
                &AlterAction::Set {
                    name: "qos.max_concurrent_tx",
                    value: "3",
                },
            )
            .unwrap();

        assert_eq!(
            limits_for_role(&catalog, role).unwrap().max_concurrent_tx,
            Some(10)
        );
        assert_eq!(
            limits_for_database(&catalog, db).unwrap().max_concurrent_tx,
            Some(3)
        );
        assert!(limits_for_role_in_database(&catalog, role, db)
            .unwrap()
            .is_unset());
    }

    #[test]
    fn test_alter_replaces_existing_entry() {
        let catalog = MemoryCatalog::new();
        let scope = SettingScope::Role(RoleId(1));

        for value in ["2", "5"] {
            catalog
                .apply_alter(
                    scope,
                    &AlterAction::Set {
                        name: "qos.max_concurrent_select",
                        value,
                    },
                )
                .unwrap();
        }

        let entries = catalog.settings_for(scope).unwrap();
        assert_eq!(entries, vec!["qos.max_concurrent_select=5".to_string()]);

        catalog.apply_alter(scope, &AlterAction::ResetAll).unwrap();
        assert!(catalog.settings_for(scope).unwrap().is_empty());
    }

    #[test]
    fn test_qos_rows_normalizes_memory() {
        let catalog = MemoryCatalog::new();
        catalog
            .apply_alter(
                SettingScope::Role(RoleId(1)),
                &AlterAction::Set {
                    name: "qos.work_mem_limit",
                    value: "65536",
                },
            )
            .unwrap();
        catalog
            .apply_alter(
                SettingScope::Role(RoleId(1)),
                &AlterAction::Set {
                    name: "application_name",
                    value: "ignored",
                },
            )
            .unwrap();

        let rows = catalog.qos_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "qos.work_mem_limit");
        assert_eq!(rows[0].value, "64MB");
    }
}
