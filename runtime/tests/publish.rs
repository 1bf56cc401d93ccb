//! Integration tests for event fan-out
//!
//! Tests subscriber ordering, applicability, error propagation and the
//! isolation switch in both call families.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use courier_core::{AsyncEventHandler, BoxError, BoxFuture, Context};
use courier_runtime::{Bus, BusConfig, BusError, Registry};
use courier_testing::{FnSubscriber, Spy, init_test_tracing};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Test Fixtures
// ============================================================================

#[derive(Debug, Clone)]
struct OrderPlaced {
    order_id: u64,
    express: bool,
}

fn placed() -> OrderPlaced {
    OrderPlaced {
        order_id: 42,
        express: false,
    }
}

fn recorder(spy: &Spy, name: &'static str) -> FnSubscriber<OrderPlaced> {
    let spy = spy.clone();
    FnSubscriber::new(move |_, event: &OrderPlaced| {
        spy.record(format!("{name}:{}", event.order_id));
        Ok(())
    })
    .named(name)
}

fn failing(spy: &Spy, name: &'static str) -> FnSubscriber<OrderPlaced> {
    let spy = spy.clone();
    FnSubscriber::new(move |_, _: &OrderPlaced| {
        spy.record(name);
        Err(BoxError::from("mailbox unavailable"))
    })
    .named(name)
}

fn bus(registry: Registry) -> Bus {
    init_test_tracing();
    Bus::new(Arc::new(registry))
}

fn isolated(registry: Registry) -> Bus {
    init_test_tracing();
    Bus::with_config(
        Arc::new(registry),
        BusConfig::new().with_isolated_subscriber_errors(true),
    )
}

// ============================================================================
// Synchronous publish
// ============================================================================

#[test]
fn applicable_subscribers_run_in_registration_order() {
    let spy = Spy::new();
    let registry = Registry::new()
        .with_event_handler(recorder(&spy, "email"))
        .with_event_handler(recorder(&spy, "ledger"))
        .with_event_handler(recorder(&spy, "courier").when(|_, event| event.express));

    bus(registry).publish(&placed()).unwrap();

    assert_eq!(spy.calls(), vec!["email:42", "ledger:42"]);
}

#[test]
fn publishing_without_subscribers_is_a_no_op() {
    bus(Registry::new()).publish(&placed()).unwrap();
}

#[test]
fn subscriber_errors_stop_the_fan_out_by_default() {
    let spy = Spy::new();
    let registry = Registry::new()
        .with_event_handler(failing(&spy, "email"))
        .with_event_handler(recorder(&spy, "ledger"));

    let error = bus(registry).publish(&placed()).unwrap_err();

    assert!(matches!(error, BusError::Subscriber { subscriber: "email", .. }));
    assert_eq!(spy.calls(), vec!["email"]);
}

#[test]
fn isolated_subscriber_errors_let_the_fan_out_continue() {
    let spy = Spy::new();
    let registry = Registry::new()
        .with_event_handler(failing(&spy, "email"))
        .with_event_handler(recorder(&spy, "ledger"));

    isolated(registry).publish(&placed()).unwrap();

    assert_eq!(spy.calls(), vec!["email", "ledger:42"]);
}

#[test]
fn subscribers_share_the_bus_context() {
    let registry = Registry::new()
        .with_event_handler(FnSubscriber::new(|context: &Context, event: &OrderPlaced| {
            context.set("last_order", event.order_id);
            Ok(())
        }))
        .with_event_handler(FnSubscriber::new(|context: &Context, _: &OrderPlaced| {
            assert_eq!(context.get::<u64>("last_order"), Some(42));
            Ok(())
        }));
    let bus = bus(registry);

    bus.publish(&placed()).unwrap();
    assert_eq!(bus.context().get::<u64>("last_order"), Some(42));
}

// ============================================================================
// Asynchronous publish
// ============================================================================

/// Subscriber that completes after a delay.
struct Slow {
    spy: Spy,
    delay: Duration,
}

impl AsyncEventHandler<OrderPlaced> for Slow {
    fn handle<'a>(&'a self, _: &'a Context, _: &'a OrderPlaced) -> BoxFuture<'a, Result<(), BoxError>> {
        Box::pin(async move {
            tokio::time::sleep(self.delay).await;
            self.spy.record("slow:done");
            Ok(())
        })
    }
}

#[tokio::test]
async fn async_publish_runs_every_applicable_subscriber() {
    let spy = Spy::new();
    let registry = Registry::new()
        .with_async_event_handler(recorder(&spy, "email"))
        .with_async_event_handler(recorder(&spy, "ledger"))
        .with_async_event_handler(recorder(&spy, "courier").when(|_, event| event.express));

    bus(registry).publish_async(&placed()).await.unwrap();

    assert_eq!(spy.calls(), vec!["email:42", "ledger:42"]);
}

#[tokio::test]
async fn async_publish_reports_errors_after_every_subscriber_completes() {
    let spy = Spy::new();
    let registry = Registry::new()
        .with_async_event_handler(failing(&spy, "email"))
        .with_async_event_handler(Slow {
            spy: spy.clone(),
            delay: Duration::from_millis(10),
        });

    let error = bus(registry).publish_async(&placed()).await.unwrap_err();

    assert_eq!(error.failed_capability(), Some("email"));
    assert!(spy.was_called("slow:done"));
}

#[tokio::test]
async fn async_publish_can_isolate_errors() {
    let spy = Spy::new();
    let registry = Registry::new()
        .with_async_event_handler(failing(&spy, "email"))
        .with_async_event_handler(failing(&spy, "sms"))
        .with_async_event_handler(recorder(&spy, "ledger"));

    isolated(registry).publish_async(&placed()).await.unwrap();

    assert_eq!(spy.calls(), vec!["email", "sms", "ledger:42"]);
}

#[tokio::test]
async fn sync_subscribers_are_not_async_subscribers() {
    let spy = Spy::new();
    let registry = Registry::new().with_event_handler(recorder(&spy, "email"));

    bus(registry).publish_async(&placed()).await.unwrap();

    assert_eq!(spy.count(), 0);
}
