//! # Cipher-Gateway Lifecycle Benchmarks
//!
//! | Path | Work per iteration |
//! |------|--------------------|
//! | submit | escrow pull + record + event |
//! | submit → callback | full success path |
//! | submit → timeout → refund | full refund path (CEI transfer) |
//! | submit, payload size sweep | payload copy into record and event |

use cg_01_request_lifecycle::{CallContext, GatewayRequestApi};
use cg_tests::fixtures::{TestContract, ALICE, GATEWAY};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::Rng;
use shared_types::{units, Ciphertext, U256};
use std::time::Duration;

fn funded_contract() -> TestContract {
    let c = TestContract::new();
    c.ledger.credit(ALICE, units(1_000_000));
    c
}

fn bench_submit(c: &mut Criterion) {
    let mut group = c.benchmark_group("cg-01-submit");
    group.measurement_time(Duration::from_secs(5));

    let contract = funded_contract();
    group.bench_function("submit_small_payload", |b| {
        b.iter(|| {
            black_box(
                contract
                    .submit(ALICE, U256::one(), b"ciphertext", None)
                    .is_ok(),
            )
        })
    });

    let mut rng = rand::thread_rng();
    for size in [64usize, 1024, 16 * 1024, 128 * 1024] {
        let payload: Vec<u8> = (0..size).map(|_| rng.gen()).collect();
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("submit_payload", size), &payload, |b, p| {
            b.iter(|| black_box(contract.submit(ALICE, U256::one(), p, None).is_ok()))
        });
    }
    group.finish();
}

fn bench_resolution_paths(c: &mut Criterion) {
    let mut group = c.benchmark_group("cg-01-resolution");
    group.measurement_time(Duration::from_secs(5));

    let contract = funded_contract();
    let gateway = CallContext::new(GATEWAY);
    group.bench_function("submit_then_callback", |b| {
        b.iter(|| {
            let id = contract
                .submit(ALICE, U256::one(), b"ciphertext", Some(3600))
                .unwrap_or_default();
            black_box(
                contract
                    .engine
                    .callback(gateway, id, Ciphertext::from(b"result"))
                    .is_ok(),
            )
        })
    });

    let contract = funded_contract();
    group.bench_function("submit_then_timeout_refund", |b| {
        b.iter(|| {
            let id = contract
                .submit(ALICE, U256::one(), b"ciphertext", Some(1))
                .unwrap_or_default();
            contract.clock.advance(1);
            black_box(contract.refund(ALICE, id).is_ok())
        })
    });
    group.finish();
}

criterion_group!(benches, bench_submit, bench_resolution_paths);
criterion_main!(benches);
