use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use basket::{
  CartEngine,
  CartIntent,
  InMemoryCartStore,
  InMemoryQueue,
  IntentConsumer,
  IntentPublisher,
  RetryPolicy,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime; // To run async code within Criterion

// --- Helper: an engine whose cart for user 1 already holds `lines` products ---
fn seeded_engine(rt: &Runtime, lines: i64) -> CartEngine {
  let engine = CartEngine::new(Arc::new(InMemoryCartStore::new()));
  rt.block_on(async {
    for product_id in 1..=lines {
      engine.add(1, product_id, 1).await.unwrap();
    }
  });
  engine
}

// --- Benchmark Functions ---

fn bench_engine_add(c: &mut Criterion) {
  let mut group = c.benchmark_group("EngineAdd");
  let rt = Runtime::new().unwrap();

  // Cost of merging into the last line grows with the cart's line count.
  for lines in [1i64, 10, 100].iter() {
    let engine = seeded_engine(&rt, *lines);
    group.throughput(Throughput::Elements(1));
    group.bench_with_input(BenchmarkId::from_parameter(lines), lines, |b, &lines| {
      b.to_async(&rt).iter(|| {
        let engine = engine.clone();
        async move { engine.add(1, lines, 1).await.unwrap() }
      });
    });
  }
  group.finish();
}

fn bench_engine_add_remove_cycle(c: &mut Criterion) {
  let mut group = c.benchmark_group("EngineAddRemoveCycle");
  let rt = Runtime::new().unwrap();
  let engine = seeded_engine(&rt, 10);

  group.throughput(Throughput::Elements(2));
  group.bench_function("append_then_drop_line", |b| {
    b.to_async(&rt).iter(|| {
      let engine = engine.clone();
      async move {
        engine.add(1, 999, 3).await.unwrap();
        engine.remove(1, 999, 3).await.unwrap()
      }
    });
  });
  group.finish();
}

fn bench_intent_decode(c: &mut Criterion) {
  let mut group = c.benchmark_group("IntentDecode");
  let payload = br#"{"action":"add","user_id":42,"product_id":1234,"amount":3}"#;
  group.throughput(Throughput::Bytes(payload.len() as u64));
  group.bench_function("add", |b| b.iter(|| CartIntent::decode(payload).unwrap()));
  group.finish();
}

fn bench_consumer_drain(c: &mut Criterion) {
  let mut group = c.benchmark_group("ConsumerDrain");
  let rt = Runtime::new().unwrap();

  for batch in [10u64, 100].iter() {
    group.throughput(Throughput::Elements(*batch));
    group.bench_with_input(BenchmarkId::from_parameter(batch), batch, |b, &batch| {
      b.to_async(&rt).iter_batched(
        || {
          let queue = InMemoryQueue::new();
          let engine = CartEngine::new(Arc::new(InMemoryCartStore::new()));
          (queue, engine)
        },
        |(queue, engine)| async move {
          for i in 0..batch as i64 {
            queue.publish(&CartIntent::add(i % 8, i % 5 + 1, 1).unwrap()).await.unwrap();
          }
          queue.close();
          let mut consumer = IntentConsumer::new(
            queue.source(),
            engine,
            Arc::new(queue.clone()),
            RetryPolicy::fixed(3, Duration::from_millis(1)),
          );
          consumer.run().await
        },
        criterion::BatchSize::SmallInput,
      );
    });
  }
  group.finish();
}

criterion_group!(
  benches,
  bench_engine_add,
  bench_engine_add_remove_cycle,
  bench_intent_decode,
  bench_consumer_drain
);
criterion_main!(benches);
