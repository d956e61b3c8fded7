//! # Admission Hot-Path Benchmarks
//!
//! Measures the cost a governed statement pays at its boundaries: the
//! effective-limit cache hit, the peer scan over the backend-status array,
//! and the slot registration/release writes.
//!
//! ## Benchmark Parameters
//!
//! - Backend array sized to 128 slots (the default MaxBackends)
//! - 32 peer sessions holding SELECT registrations during the scan
//! - Limits configured so admission always succeeds (the rejection path is
//!   a strict subset of the work)
//!
//! ## Running Benchmarks
//!
//! ```bash
//! cargo bench --bench admission
//! ```

use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};
use qosgov::{
    AlterAction, BackendId, DatabaseId, Governor, MemoryCatalog, RoleId, Session, SettingScope,
    SettingsCatalog, StatementKind,
};

const ROLE: RoleId = RoleId(10);
const DB: DatabaseId = DatabaseId(1);
const PEERS: usize = 32;

fn governed_sessions() -> (Arc<Governor>, Vec<Session>, Session) {
    let governor = Governor::builder().max_backends(128).build();
    let catalog = Arc::new(MemoryCatalog::new());
    catalog
        .apply_alter(
            SettingScope::Role(ROLE),
            &AlterAction::Set {
                name: "qos.max_concurrent_select",
                value: "64",
            },
        )
        .unwrap();

    let mut peers = Vec::with_capacity(PEERS);
    for backend in 0..PEERS {
        let mut peer = governor
            .session(
                BackendId(backend),
                1000 + backend as u32,
                ROLE,
                DB,
                Arc::clone(&catalog) as Arc<dyn SettingsCatalog>,
            )
            .unwrap();
        peer.admit_statement(StatementKind::Select).unwrap();
        peers.push(peer);
    }

    let subject = governor
        .session(
            BackendId(127),
            9999,
            ROLE,
            DB,
            catalog as Arc<dyn SettingsCatalog>,
        )
        .unwrap();
    (governor, peers, subject)
}

fn bench_statement_admission(c: &mut Criterion) {
    let (_governor, _peers, mut session) = governed_sessions();
    c.bench_function("admit_end_statement_with_32_peers", |b| {
        b.iter(|| {
            session.admit_statement(StatementKind::Select).unwrap();
            session.end_statement();
        })
    });
}

fn bench_transaction_admission(c: &mut Criterion) {
    let (_governor, _peers, mut session) = governed_sessions();
    c.bench_function("admit_end_transaction_with_32_peers", |b| {
        b.iter(|| {
            session.admit_transaction().unwrap();
            session.end_transaction();
        })
    });
}

fn bench_limit_cache_hit(c: &mut Criterion) {
    let (_governor, _peers, mut session) = governed_sessions();
    c.bench_function("effective_limits_cache_hit", |b| {
        b.iter(|| session.effective_limits().unwrap())
    });
}

criterion_group!(
    benches,
    bench_statement_admission,
    bench_transaction_admission,
    bench_limit_cache_hit
);
criterion_main!(benches);
