//! Benchmarks the composite-key protocol lookup against a 500-protocol catalog.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use workflow_engine::model::protocol::Protocol;
use workflow_engine::protocol_repo::ProtocolRepository;

fn sample_repository(count: usize) -> ProtocolRepository {
    let protocols: Vec<Protocol> = (0..count)
        .map(|i| {
            let mut p = Protocol::new(
                format!("P{i}"),
                "CHEST",
                format!("PROJ{i}"),
                "DeviceX",
            );
            p.procedure_codes = vec![format!("RPID{i}")];
            p
        })
        .collect();
    ProtocolRepository::load(protocols, false)
}

fn bench_lookup(c: &mut Criterion) {
    let repo = sample_repository(500);
    c.bench_function("lookup_500_protocols", |b| {
        b.iter(|| {
            black_box(repo.lookup(black_box("CHEST"), black_box("PROJ499"), black_box("DeviceX")))
        })
    });
}

fn bench_procedure_code_resolution(c: &mut Criterion) {
    let repo = sample_repository(500);
    c.bench_function("resolve_procedure_code_500_protocols", |b| {
        b.iter(|| black_box(repo.resolve_procedure_code(black_box("RPID499"))))
    });
}

criterion_group!(benches, bench_lookup, bench_procedure_code_resolution);
criterion_main!(benches);
