//! Performance benchmarks for balena-event-log
//!
//! Run with: cargo bench

use async_trait::async_trait;
use balena_event_log::{
    taxonomy, Adaptor, AdaptorRegistry, AnalyticsClientConfig, Context, EventLog, EventLogConfig,
    Result,
};
use criterion::{criterion_group, criterion_main, Criterion};

#[derive(Clone)]
struct Discard;

#[async_trait]
impl Adaptor for Discard {
    fn name(&self) -> &str {
        "discard"
    }

    async fn track(&self, _prefix: &str, _event_type: &str, _data: &Context) -> Result<()> {
        Ok(())
    }
}

fn event_log(adaptors: usize) -> EventLog {
    let registry = (0..adaptors).fold(AdaptorRegistry::empty(), |registry, _| {
        registry.with_adaptor(Discard)
    });
    EventLog::builder(EventLogConfig::new(
        "BENCH",
        AnalyticsClientConfig::new("balena-bench"),
    ))
    .registry(registry)
    .build()
    .unwrap()
}

fn bench_labels(c: &mut Criterion) {
    c.bench_function("taxonomy::label", |b| {
        b.iter(|| taxonomy::label("deviceEnvironmentVariable", "create"));
    });

    c.bench_function("taxonomy::lookup (alias)", |b| {
        b.iter(|| taxonomy::lookup("fleet", "pinToRelease").unwrap());
    });
}

fn bench_create_fan_out(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    let mut group = c.benchmark_group("create_fan_out");
    for adaptors in [1, 3, 10] {
        let log = event_log(adaptors);
        group.bench_function(format!("{} adaptors", adaptors), |b| {
            b.to_async(&rt).iter(|| async {
                log.create("x", Some(serde_json::json!({"i": 1})), None)
                    .await
                    .unwrap()
            });
        });
    }
    group.finish();
}

fn bench_typed_method(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let log = event_log(3);

    c.bench_function("device().rename", |b| {
        b.to_async(&rt)
            .iter(|| async { log.device().rename(None, None).await.unwrap() });
    });
}

criterion_group!(benches, bench_labels, bench_create_fan_out, bench_typed_method);
criterion_main!(benches);
