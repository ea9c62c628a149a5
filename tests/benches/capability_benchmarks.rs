//! # OCR3 Capability Benchmarks
//!
//! | Path | Expectation |
//! |------|-------------|
//! | `RequestStore::first_n` | linear in batch size plus evicted slots walked |
//! | `RequestStore::get_n` | O(1) per id |
//! | `outcome` with identical aggregation | linear in observers × batch |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ocr3_capability::domain::{AttributedObservation, OutcomeContext, Request, RequestStore};
use ocr3_capability::{
    CapabilityConfig, Ocr3Capability, ReportingPlugin, ReportingPluginConfig, ResponsePromise,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn make_request(i: usize) -> Request {
    let (callback, _future) = ResponsePromise::new();
    Request {
        workflow_id: "w1".into(),
        workflow_execution_id: format!("e{}", i),
        workflow_owner: "owner".into(),
        observations: vec![json!({ "value": i })],
        expires_at: u64::MAX,
        request_ctx: CancellationToken::new(),
        callback,
    }
}

// ============================================================================
// Request store
// ============================================================================

fn bench_store(c: &mut Criterion) {
    let mut group = c.benchmark_group("request-store");
    group.measurement_time(Duration::from_secs(5));

    for size in [100usize, 1_000, 10_000] {
        let store = RequestStore::new();
        for i in 0..size {
            store.add(make_request(i)).unwrap();
        }
        // Half the ids are stale; those a batch walks past are pruned.
        for i in (0..size).step_by(2) {
            store.evict(&format!("e{}", i));
        }
        let ids: Vec<String> = (1..size).step_by(2).map(|i| format!("e{}", i)).collect();

        group.throughput(Throughput::Elements(100));
        group.bench_with_input(BenchmarkId::new("first_n_100", size), &store, |b, store| {
            b.iter(|| black_box(store.first_n(100).unwrap().len()))
        });
        group.bench_with_input(BenchmarkId::new("get_n", size), &ids, |b, ids| {
            b.iter(|| black_box(store.get_n(ids).unwrap().len()))
        });
    }

    group.finish();
}

// ============================================================================
// Reporting plugin
// ============================================================================

fn bench_outcome(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("reporting-plugin");

    for batch in [10usize, 100] {
        let capability = Arc::new(Ocr3Capability::new(
            CapabilityConfig::default().with_batch_size(batch),
        ));
        let config = serde_json::from_value(json!({ "aggregation_method": "identical" })).unwrap();
        capability.registry().register("w1", &config).unwrap();
        for i in 0..batch {
            capability.store().add(make_request(i)).unwrap();
        }
        let (plugin, _) = capability
            .reporting_plugin_factory()
            .new_reporting_plugin(ReportingPluginConfig::new(4, 1))
            .unwrap();

        let outctx = OutcomeContext::default();
        let (query, aos) = runtime.block_on(async {
            let query = plugin.query(&outctx).await.unwrap();
            let observation = plugin.observation(&outctx, &query).await.unwrap();
            let aos: Vec<_> = (0..4u8)
                .map(|observer| AttributedObservation {
                    observation: observation.clone(),
                    observer,
                })
                .collect();
            (query, aos)
        });

        group.throughput(Throughput::Elements(batch as u64));
        group.bench_function(BenchmarkId::new("outcome_identical", batch), |b| {
            b.iter(|| {
                runtime.block_on(async {
                    black_box(plugin.outcome(&outctx, &query, &aos).await.unwrap())
                })
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_store, bench_outcome);
criterion_main!(benches);
