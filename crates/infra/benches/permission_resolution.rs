use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use transitgate_core::{Clock, FixedClock, RoleId};
use transitgate_fares::{PassKind, TicketKind};
use transitgate_infra::services::ensure_admin_account;
use transitgate_infra::store::Store;
use transitgate_infra::{EngineConfig, InMemoryEngine};

fn engine() -> (InMemoryEngine, Arc<dyn Clock>) {
    let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2026, 3, 10, 8, 0, 0).unwrap(),
    ));
    let engine = InMemoryEngine::in_memory(EngineConfig::default(), clock.clone());
    engine.bootstrap().unwrap();
    (engine, clock)
}

fn role_id(engine: &InMemoryEngine, name: &str) -> RoleId {
    engine
        .store
        .read(|s| Ok(s.role_by_name(name).map(|r| r.id)))
        .unwrap()
        .unwrap()
}

/// Effective-route resolution as the actor population grows.
fn bench_effective_routes(c: &mut Criterion) {
    let mut group = c.benchmark_group("effective_routes");

    for actor_count in [10usize, 100, 1_000] {
        let (engine, _) = engine();
        let mut last = None;
        for i in 0..actor_count {
            let actor = engine
                .identity
                .signup(&format!("rider{i}"), "bench password", None)
                .unwrap();
            engine
                .access
                .set_custom_permissions(actor.id, &["notifications.view", "tickets.verify"])
                .unwrap();
            last = Some(actor.id);
        }
        let actor_id = last.unwrap();

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(
            BenchmarkId::new("resolve", actor_count),
            &actor_id,
            |b, actor_id| {
                b.iter(|| black_box(engine.access.effective_routes(*actor_id).unwrap()));
            },
        );
    }

    group.finish();
}

/// Single path checks, including normalization of the requested path.
fn bench_has_access(c: &mut Criterion) {
    let mut group = c.benchmark_group("has_access");
    let (engine, clock) = engine();
    let admin = ensure_admin_account(&engine.store, &clock, "admin", "bench password").unwrap();
    let rider = engine.identity.signup("rider", "bench password", None).unwrap();

    group.bench_function("rider_granted", |b| {
        b.iter(|| black_box(engine.access.has_access(rider.id, "/Passes/?tab=1").unwrap()));
    });
    group.bench_function("admin_denied_rider_only", |b| {
        b.iter(|| black_box(engine.access.has_access(admin.id, "/tickets/buy").unwrap()));
    });

    group.finish();
}

/// Scan verification with a rider holding many tickets and one active pass.
fn bench_scan_verification(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan_verification");
    group.sample_size(200);

    let (engine, _) = engine();
    let conductor = engine.identity.signup("conductor", "bench password", None).unwrap();
    engine
        .access
        .set_actor_role(conductor.id, role_id(&engine, "CONDUCTOR"))
        .unwrap();
    let rider = engine.identity.signup("rider", "bench password", None).unwrap();
    let scan_id = rider.scan_id().unwrap().to_string();

    for i in 0..50 {
        let route = engine.routes.register_route(&format!("Line {i}")).unwrap();
        engine
            .lifecycle
            .purchase_ticket(rider.id, route.id, TicketKind::Monthly)
            .unwrap();
    }
    let (_, payment) = engine.lifecycle.create_pass(rider.id, PassKind::Monthly).unwrap();
    engine.lifecycle.decide_payment(payment.id, true).unwrap();

    group.bench_function("without_route", |b| {
        b.iter(|| {
            black_box(
                engine
                    .validation
                    .verify(conductor.id, &scan_id, None)
                    .unwrap(),
            )
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_effective_routes,
    bench_has_access,
    bench_scan_verification
);

criterion_main!(benches);
