//! Dispatch Performance Benchmarks
//!
//! Measures the per-call overhead of the bus on in-memory handlers:
//! - Single dispatch with and without validation
//! - Aggregation across a growing number of handlers
//! - Event fan-out
//! - The asynchronous call family on a tokio runtime
//!
//! Run with: `cargo bench`

#![allow(missing_docs)] // Benchmarks don't need extensive docs
#![allow(clippy::expect_used)] // Benchmarks can use expect for setup

use courier_core::{
    BoxError, Context, EventHandler, ExecutionPriority, Handler, HandlerResult, Immediate, Response,
    ResponseError, Validator,
};
use courier_runtime::{Bus, Registry};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;

#[derive(Clone, Debug)]
struct Quote {
    quantity: u32,
}

struct Price {
    priority: ExecutionPriority,
}

impl Handler<Quote, u64> for Price {
    fn execution_priority(&self) -> ExecutionPriority {
        self.priority
    }

    fn handle(&self, _: &Context, quote: &Quote) -> HandlerResult<u64> {
        Ok(Some(Response::success(u64::from(quote.quantity) * 125)))
    }
}

struct PositiveQuantity;

impl Validator<Quote> for PositiveQuantity {
    fn validate(&self, _: &Context, quote: &Quote) -> Result<Vec<ResponseError>, BoxError> {
        Ok(if quote.quantity == 0 {
            vec![ResponseError::for_property("Quantity", "Quantity must be positive.")]
        } else {
            Vec::new()
        })
    }
}

struct Quoted;

impl EventHandler<Quote> for Quoted {
    fn handle(&self, _: &Context, quote: &Quote) -> Result<(), BoxError> {
        black_box(quote.quantity);
        Ok(())
    }
}

fn main_handler() -> Price {
    Price {
        priority: ExecutionPriority::Main,
    }
}

fn bench_send(c: &mut Criterion) {
    let mut group = c.benchmark_group("send");
    group.throughput(Throughput::Elements(1));
    let quote = Quote { quantity: 4 };

    let bare = Bus::new(Arc::new(Registry::new().with_handler(main_handler())));
    group.bench_function("bare", |b| {
        b.iter(|| bare.send::<Quote, u64>(black_box(&quote)).expect("dispatch"));
    });

    let validated = Bus::new(Arc::new(
        Registry::new()
            .with_validator(PositiveQuantity)
            .with_handler(main_handler()),
    ));
    group.bench_function("validated", |b| {
        b.iter(|| validated.send::<Quote, u64>(black_box(&quote)).expect("dispatch"));
    });

    let rejected = Quote { quantity: 0 };
    group.bench_function("rejected", |b| {
        b.iter(|| validated.send::<Quote, u64>(black_box(&rejected)).expect("dispatch"));
    });

    group.finish();
}

fn bench_responses(c: &mut Criterion) {
    let mut group = c.benchmark_group("responses");
    let quote = Quote { quantity: 4 };

    for handlers in [1_usize, 4, 16] {
        let mut registry = Registry::new().with_handler(main_handler());
        for index in 1..handlers {
            let priority = if index % 2 == 0 {
                ExecutionPriority::Independent
            } else {
                ExecutionPriority::None
            };
            registry = registry.with_handler(Price { priority });
        }
        let bus = Bus::new(Arc::new(registry));

        group.throughput(Throughput::Elements(handlers as u64));
        group.bench_with_input(BenchmarkId::from_parameter(handlers), &handlers, |b, _| {
            b.iter(|| bus.responses::<Quote, u64>(black_box(&quote)).expect("aggregate"));
        });
    }

    group.finish();
}

fn bench_publish(c: &mut Criterion) {
    let mut group = c.benchmark_group("publish");
    let quote = Quote { quantity: 4 };

    for subscribers in [1_usize, 8] {
        let registry = (0..subscribers).fold(Registry::new(), |registry, _| registry.with_event_handler(Quoted));
        let bus = Bus::new(Arc::new(registry));

        group.bench_with_input(BenchmarkId::from_parameter(subscribers), &subscribers, |b, _| {
            b.iter(|| bus.publish(black_box(&quote)).expect("publish"));
        });
    }

    group.finish();
}

fn bench_async(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime");
    let mut group = c.benchmark_group("async");
    let quote = Quote { quantity: 4 };

    let bus = Bus::new(Arc::new(
        Registry::new()
            .with_async_validator(Immediate(PositiveQuantity))
            .with_async_handler(Immediate(main_handler()))
            .with_async_handler(Immediate(Price {
                priority: ExecutionPriority::Independent,
            }))
            .with_async_handler(Immediate(Price {
                priority: ExecutionPriority::None,
            })),
    ));

    group.bench_function("send_async", |b| {
        b.to_async(&runtime)
            .iter(|| async { bus.send_async::<Quote, u64>(black_box(&quote)).await.expect("dispatch") });
    });

    group.bench_function("responses_async", |b| {
        b.to_async(&runtime).iter(|| async {
            bus.responses_async::<Quote, u64>(black_box(&quote))
                .await
                .expect("aggregate")
        });
    });

    group.finish();
}

criterion_group!(benches, bench_send, bench_responses, bench_publish, bench_async);
criterion_main!(benches);
