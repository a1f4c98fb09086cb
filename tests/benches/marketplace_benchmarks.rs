//! # Task Market Benchmarks
//!
//! Hot paths of the transactional core over the in-memory store:
//!
//! | Component | Operation |
//! |-----------|-----------|
//! | tm-02 Wallet Ledger | fresh charge, idempotent replay |
//! | tm-03 Task Lifecycle | gated publish |
//! | tm-04 Offer Negotiation | accept with fee |
//! | tm-05 Category Eligibility | recompute |

use std::sync::Arc;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use market_runtime::{MarketConfig, MarketContainer};
use shared_types::{LedgerKind, MockTimeSource, ProofStatus};
use tm_01_document_store::InMemoryDocumentStore;
use tm_03_task_lifecycle::TaskPayload;

fn container() -> MarketContainer {
    MarketContainer::with_backend(
        MarketConfig::default(),
        Arc::new(InMemoryDocumentStore::new()),
        Arc::new(MockTimeSource::new(1_700_000_000_000)),
    )
}

fn payload() -> TaskPayload {
    TaskPayload {
        title: "Fix sink".into(),
        description: String::new(),
        category_id: "plumbing".into(),
        budget: Some(1500),
    }
}

// ============================================================================
// TM-02: Wallet Ledger
// ============================================================================

fn bench_ledger(c: &mut Criterion) {
    let mut group = c.benchmark_group("tm-02-wallet-ledger");
    group.measurement_time(Duration::from_secs(5));

    let market = container();
    market.ledger.open_account("u1").unwrap();
    market.ledger.top_up("u1", 1_000_000_000_000, Some("seed")).unwrap();

    let mut n = 0u64;
    group.bench_function("charge_fresh_key", |b| {
        b.iter(|| {
            n += 1;
            black_box(
                market
                    .ledger
                    .charge("u1", 1, LedgerKind::PostFee, &format!("k{n}"))
                    .unwrap(),
            )
        })
    });

    market
        .ledger
        .charge("u1", 1, LedgerKind::PostFee, "replayed")
        .unwrap();
    group.bench_function("charge_replay", |b| {
        b.iter(|| {
            black_box(
                market
                    .ledger
                    .charge("u1", 1, LedgerKind::PostFee, "replayed")
                    .unwrap(),
            )
        })
    });

    group.finish();
}

// ============================================================================
// TM-03 / TM-04: Publish and Accept
// ============================================================================

fn bench_publish_and_accept(c: &mut Criterion) {
    let mut group = c.benchmark_group("tm-03-04-publish-accept");
    group.measurement_time(Duration::from_secs(5));

    let market = container();
    market.ledger.open_account("P").unwrap();
    market.ledger.top_up("P", 1_000_000_000_000, Some("seed")).unwrap();
    market.ledger.open_account("H").unwrap();
    market.ledger.top_up("H", 1_000_000_000_000, Some("seed")).unwrap();
    market
        .eligibility
        .submit_proof("H", "plumbing", Default::default(), None)
        .unwrap();
    market
        .eligibility
        .review_proof("ops", "H", "plumbing", ProofStatus::Approved, None)
        .unwrap();
    market.eligibility.recompute("H").unwrap();

    let mut n = 0u64;
    group.bench_function("publish", |b| {
        b.iter(|| {
            n += 1;
            black_box(market.tasks.publish("P", &format!("T{n}"), &payload()).unwrap())
        })
    });

    group.bench_function("submit_and_accept", |b| {
        b.iter(|| {
            n += 1;
            let task_id = format!("T{n}");
            let offer_id = format!("O{n}");
            market.tasks.publish("P", &task_id, &payload()).unwrap();
            market
                .offers
                .submit_offer("H", &task_id, &offer_id, 1500)
                .unwrap();
            black_box(market.offers.accept_offer("P", &offer_id).unwrap())
        })
    });

    group.finish();
}

// ============================================================================
// TM-05: Eligibility recompute by proof count
// ============================================================================

fn bench_recompute(c: &mut Criterion) {
    let mut group = c.benchmark_group("tm-05-category-eligibility");

    for proofs in [1usize, 10, 50] {
        let market = container();
        let uid = "H";
        market.ledger.open_account(uid).unwrap();
        for i in 0..proofs {
            let category = format!("category {i}");
            market
                .eligibility
                .submit_proof(uid, &category, Default::default(), None)
                .unwrap();
            market
                .eligibility
                .review_proof("ops", uid, &category, ProofStatus::Approved, None)
                .unwrap();
        }

        group.throughput(Throughput::Elements(proofs as u64));
        group.bench_with_input(BenchmarkId::new("recompute", proofs), &proofs, |b, _| {
            b.iter(|| black_box(market.eligibility.recompute(uid).unwrap()))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_ledger, bench_publish_and_accept, bench_recompute);

criterion_main!(benches);
