//! # Hook Glue Integration Tests
//!
//! Drives the utility/executor hook surface the way the host would:
//!
//! 1. `SET work_mem` enforcement: rejection under the `error` policy,
//!    capping under `warning`, both with stats accounting
//! 2. Online reconfiguration: `ALTER ... SET qos.*` bumps the epoch and
//!    every session sees the new limits at its next statement
//! 3. Strict validation of direct `SET qos.*`
//! 4. Session-start `work_mem` capping
//! 5. Executor start/end lifecycle and the disabled-governor short circuit
//! 6. Operator surface: version, stats text, reset, settings projection

use std::sync::Arc;

use qosgov::{
    AlterAction, BackendId, DatabaseId, Governor, MemoryCatalog, ParseError, RoleId, Session,
    SetValue, SettingsCatalog, StatementKind, UtilityOutcome, UtilityStmt, WorkMemExceeded,
};

const ROLE: RoleId = RoleId(10);
const DB: DatabaseId = DatabaseId(1);

fn setup() -> (Arc<Governor>, Arc<MemoryCatalog>) {
    (
        Governor::builder().max_backends(8).build(),
        Arc::new(MemoryCatalog::new()),
    )
}

fn open_session(governor: &Arc<Governor>, catalog: &Arc<MemoryCatalog>, backend: usize) -> Session {
    governor
        .session(
            BackendId(backend),
            3000 + backend as u32,
            ROLE,
            DB,
            Arc::clone(catalog) as Arc<dyn SettingsCatalog>,
        )
        .unwrap()
}

fn alter_role(session: &mut Session, name: &'static str, value: &'static str) {
    session
        .on_utility(&UtilityStmt::AlterRoleSet {
            role: ROLE,
            database: None,
            action: AlterAction::Set { name, value },
        })
        .unwrap();
}

// ============================================================================
// SET work_mem Enforcement
// ============================================================================

#[test]
fn test_set_work_mem_over_limit_is_rejected() {
    let (governor, catalog) = setup();
    let mut admin = open_session(&governor, &catalog, 0);
    let mut session = open_session(&governor, &catalog, 1);

    // Session is idle with no limits; the admin alters the role online.
    assert!(session.effective_limits().unwrap().is_unset());
    alter_role(&mut admin, "qos.work_mem_limit", "32MB");

    let err = session
        .on_utility(&UtilityStmt::Set {
            name: "work_mem",
            value: SetValue::Text("64MB"),
        })
        .unwrap_err();
    let refusal = err.downcast_ref::<WorkMemExceeded>().unwrap();
    assert_eq!(refusal.detail(), "Requested 65536 KB, maximum allowed is 32768 KB");
    assert_eq!(refusal.code().sqlstate(), "53000");
    assert_eq!(governor.stats().work_mem_violations, 1);
}

#[test]
fn test_set_work_mem_under_limit_proceeds() {
    let (governor, catalog) = setup();
    let mut admin = open_session(&governor, &catalog, 0);
    let mut session = open_session(&governor, &catalog, 1);
    alter_role(&mut admin, "qos.work_mem_limit", "32MB");

    // Both the string-literal and bare-kilobytes forms are recognized.
    for value in [SetValue::Text("16MB"), SetValue::Kilobytes(16384)] {
        let outcome = session
            .on_utility(&UtilityStmt::Set {
                name: "work_mem",
                value,
            })
            .unwrap();
        assert_eq!(outcome, UtilityOutcome::Proceed);
    }
    assert_eq!(governor.stats().work_mem_violations, 0);
}

#[test]
fn test_warning_level_caps_instead_of_rejecting() {
    let (governor, catalog) = setup();
    let mut admin = open_session(&governor, &catalog, 0);
    let mut session = open_session(&governor, &catalog, 1);
    alter_role(&mut admin, "qos.work_mem_limit", "32MB");
    alter_role(&mut admin, "qos.work_mem_error_level", "warning");

    let outcome = session
        .on_utility(&UtilityStmt::Set {
            name: "work_mem",
            value: SetValue::Kilobytes(65536),
        })
        .unwrap();
    assert_eq!(outcome, UtilityOutcome::WorkMemCapped { kilobytes: 32768 });

    let stats = governor.stats();
    assert_eq!(stats.work_mem_violations, 1);
    assert_eq!(stats.throttled_queries, 1);
}

#[test]
fn test_session_start_work_mem_capping() {
    let (governor, catalog) = setup();
    let mut admin = open_session(&governor, &catalog, 0);
    let mut session = open_session(&governor, &catalog, 1);
    alter_role(&mut admin, "qos.work_mem_limit", "32MB");

    // The session came up with 64MB; the governor lowers it to the limit.
    assert_eq!(session.enforce_session_work_mem(65536).unwrap(), Some(32768));
    assert_eq!(session.enforce_session_work_mem(1024).unwrap(), None);
}

// ============================================================================
// Online Reconfiguration via ALTER
// ============================================================================

#[test]
fn test_alter_role_set_is_visible_without_reconnect() {
    let (governor, catalog) = setup();
    let mut admin = open_session(&governor, &catalog, 0);
    let mut session = open_session(&governor, &catalog, 1);

    // Prime the cache before the alteration.
    assert!(session.effective_limits().unwrap().is_unset());

    alter_role(&mut admin, "qos.max_concurrent_select", "2");

    let limits = session.effective_limits().unwrap();
    assert_eq!(limits.max_concurrent_select, Some(2));
}

#[test]
fn test_alter_database_set_and_reset_all() {
    let (governor, catalog) = setup();
    let mut admin = open_session(&governor, &catalog, 0);
    let mut session = open_session(&governor, &catalog, 1);

    admin
        .on_utility(&UtilityStmt::AlterDatabaseSet {
            database: DB,
            action: AlterAction::Set {
                name: "qos.max_concurrent_tx",
                value: "3",
            },
        })
        .unwrap();
    assert_eq!(session.effective_limits().unwrap().max_concurrent_tx, Some(3));

    admin
        .on_utility(&UtilityStmt::AlterDatabaseSet {
            database: DB,
            action: AlterAction::ResetAll,
        })
        .unwrap();
    assert_eq!(session.effective_limits().unwrap().max_concurrent_tx, None);
}

#[test]
fn test_alter_with_invalid_qos_payload_is_rejected_and_not_persisted() {
    let (governor, catalog) = setup();
    let mut admin = open_session(&governor, &catalog, 0);
    let epoch_before = governor.settings_epoch();

    let err = admin
        .on_utility(&UtilityStmt::AlterRoleSet {
            role: ROLE,
            database: None,
            action: AlterAction::Set {
                name: "qos.max_concurrent_select",
                value: "-5",
            },
        })
        .unwrap_err();
    assert!(err.downcast_ref::<ParseError>().is_some());
    assert_eq!(governor.settings_epoch(), epoch_before);
    assert!(catalog.qos_rows().is_empty());
}

#[test]
fn test_non_qos_alter_does_not_bump_epoch() {
    let (governor, catalog) = setup();
    let mut admin = open_session(&governor, &catalog, 0);
    let epoch_before = governor.settings_epoch();

    admin
        .on_utility(&UtilityStmt::AlterRoleSet {
            role: ROLE,
            database: None,
            action: AlterAction::Set {
                name: "search_path",
                value: "public",
            },
        })
        .unwrap();
    assert_eq!(governor.settings_epoch(), epoch_before);
}

// ============================================================================
// Direct SET qos.*
// ============================================================================

#[test]
fn test_set_qos_is_strictly_validated() {
    let (governor, catalog) = setup();
    let mut session = open_session(&governor, &catalog, 0);

    session
        .on_utility(&UtilityStmt::Set {
            name: "qos.max_concurrent_select",
            value: SetValue::Text("4"),
        })
        .unwrap();

    let err = session
        .on_utility(&UtilityStmt::Set {
            name: "qos.not_a_setting",
            value: SetValue::Text("4"),
        })
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ParseError>(),
        Some(ParseError::InvalidName { .. })
    ));

    let err = session
        .on_utility(&UtilityStmt::Set {
            name: "qos.work_mem_limit",
            value: SetValue::Text("12XB"),
        })
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ParseError>(),
        Some(ParseError::InvalidValue { .. })
    ));
}

#[test]
fn test_set_qos_enabled_toggles_the_governor() {
    let (governor, catalog) = setup();
    let mut session = open_session(&governor, &catalog, 0);

    session
        .on_utility(&UtilityStmt::Set {
            name: "qos.enabled",
            value: SetValue::Text("off"),
        })
        .unwrap();
    assert!(!governor.is_enabled());

    // Hooks short-circuit while disabled; re-enabling needs the governor
    // handle, as the host's reloadable flag would.
    governor.set_enabled(true);
    assert!(governor.is_enabled());
}

// ============================================================================
// Executor Lifecycle and Disabled Short Circuit
// ============================================================================

#[test]
fn test_executor_lifecycle_registers_and_releases() {
    let (governor, catalog) = setup();
    let mut session = open_session(&governor, &catalog, 0);
    let plan = qosgov::Plan::new(StatementKind::Select, qosgov::PlanNode::default());

    session.on_executor_start(&plan).unwrap();
    assert_eq!(governor.stats().total_queries, 1);

    session.on_executor_end();
    session.on_executor_start(&plan).unwrap();
    assert_eq!(governor.stats().total_queries, 2);
    session.on_executor_end();
}

#[test]
fn test_disabled_governor_short_circuits_hooks() {
    let (governor, catalog) = setup();
    let mut admin = open_session(&governor, &catalog, 0);
    alter_role(&mut admin, "qos.work_mem_limit", "1MB");
    governor.set_enabled(false);

    let mut session = open_session(&governor, &catalog, 1);
    let outcome = session
        .on_utility(&UtilityStmt::Set {
            name: "work_mem",
            value: SetValue::Kilobytes(1 << 20),
        })
        .unwrap();
    assert_eq!(outcome, UtilityOutcome::Proceed);

    let mut plan = qosgov::Plan::new(
        StatementKind::Select,
        qosgov::PlanNode::new(qosgov::PlanNodeTag::Gather, 8),
    );
    session.on_planner(&mut plan).unwrap();
    assert_eq!(plan.root.num_workers, 8);
    assert_eq!(governor.stats().total_queries, 0);
}

// ============================================================================
// Operator Surface
// ============================================================================

#[test]
fn test_version_banner() {
    let banner = Governor::version();
    assert!(banner.starts_with("qosgov "));
}

#[test]
fn test_stats_text_and_reset() {
    let (governor, catalog) = setup();
    let mut session = open_session(&governor, &catalog, 0);
    session.admit_statement(StatementKind::Select).unwrap();

    let text = governor.stats_text();
    assert!(text.contains("total: 1"));

    governor.reset_stats();
    assert_eq!(governor.stats(), qosgov::Stats::default());
}

#[test]
fn test_settings_projection_lists_qos_rows() {
    let (governor, catalog) = setup();
    let mut admin = open_session(&governor, &catalog, 0);
    alter_role(&mut admin, "qos.work_mem_limit", "65536");
    alter_role(&mut admin, "qos.max_concurrent_select", "2");

    let rows = catalog.qos_rows();
    assert_eq!(rows.len(), 2);
    assert!(rows
        .iter()
        .any(|row| row.name == "qos.work_mem_limit" && row.value == "64MB"));
    assert!(rows
        .iter()
        .any(|row| row.name == "qos.max_concurrent_select" && row.value == "2"));
}
