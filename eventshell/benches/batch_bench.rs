//! Benchmarks for chunking, settlement and pipeline invocation.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use eventshell::batch::{chunk, ChunkQueue, KeyQueue, Settlement};
use eventshell::middleware::{FnStage, Pipeline};
use serde_json::{json, Value};

fn chunk_benchmark(c: &mut Criterion) {
    c.bench_function("chunk_10k_by_25", |b| {
        b.iter(|| chunk(black_box((0..10_000).collect::<Vec<u32>>()), 25));
    });

    c.bench_function("drain_lifo_queue", |b| {
        b.iter(|| {
            let mut queue = ChunkQueue::new((0..10_000).collect::<Vec<u32>>(), 100);
            let mut seen = 0usize;
            while let Some(next) = queue.next_chunk() {
                seen += next.len();
            }
            black_box(seen)
        });
    });

    c.bench_function("drain_key_queue_with_retries", |b| {
        b.iter(|| {
            let mut queue = KeyQueue::new((0..10_000).collect::<Vec<u32>>(), 100);
            let mut seen = 0usize;
            while let Some(mut next) = queue.next_chunk() {
                let retry = next.split_off(next.len() - next.len() / 10);
                seen += next.len();
                if retry.len() < 10 {
                    seen += retry.len();
                } else {
                    queue.push_retry(retry);
                }
            }
            black_box(seen)
        });
    });
}

fn settlement_benchmark(c: &mut Criterion) {
    c.bench_function("settle_1k_results", |b| {
        b.iter(|| {
            let results = (0..1_000).map(|i| if i % 7 == 0 { Err(format!("bad {i}")) } else { Ok(i) });
            black_box(Settlement::from_results(results).summary())
        });
    });
}

fn pipeline_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap_or_else(|err| panic!("failed to build runtime: {err}"));

    let pipeline = (0..5).fold(
        Pipeline::wrap(|event: Value, _context: Value| async move { Ok::<_, anyhow::Error>(event) }),
        |pipeline, i| {
            pipeline.with(FnStage::new(format!("stage-{i}")).on_before(|request| {
                request.event_mut()["seen"] = json!(true);
                Ok(())
            }))
        },
    );

    c.bench_function("invoke_five_stages", |b| {
        b.iter(|| runtime.block_on(pipeline.invoke(json!({ "id": 1 }), json!({}))));
    });
}

criterion_group!(benches, chunk_benchmark, settlement_benchmark, pipeline_benchmark);
criterion_main!(benches);
