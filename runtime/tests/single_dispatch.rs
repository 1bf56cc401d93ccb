//! Integration tests for single dispatch and validation
//!
//! Covers `send`/`try_send` in both call families: validator ordering and
//! short-circuiting, missing handlers, handler errors and context reuse.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use courier_core::{
    BoxError, Context, ContextWriter, ExecutionPriority, Handler, HandlerResult, Immediate, Response,
    ResponseError, Validator,
};
use courier_runtime::{Bus, BusError, Registry};
use courier_testing::{FnHandler, FnValidator, Spy, init_test_tracing};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

// ============================================================================
// Test Fixtures
// ============================================================================

#[derive(Debug, Clone)]
struct CreateUser {
    name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct UserId(u32);

struct NameRequired;

impl Validator<CreateUser> for NameRequired {
    fn validate(&self, _: &Context, request: &CreateUser) -> Result<Vec<ResponseError>, BoxError> {
        if request.name.is_empty() {
            Ok(vec![ResponseError::for_property("Name", "Name is required.")])
        } else {
            Ok(Vec::new())
        }
    }
}

struct CreateUserHandler {
    spy: Spy,
}

impl Handler<CreateUser, UserId> for CreateUserHandler {
    fn handle(&self, context: &Context, request: &CreateUser) -> HandlerResult<UserId> {
        self.spy.record(format!("create:{}", request.name));
        let next = context.get_or_default::<u32>("next_id");
        Ok(Some(Response::success(UserId(next))))
    }
}

struct SeedIds {
    runs: Arc<AtomicUsize>,
}

impl ContextWriter for SeedIds {
    fn write(&self, context: &Context) {
        self.runs.fetch_add(1, Ordering::SeqCst);
        context.set("next_id", 7_u32);
    }
}

fn user_registry(spy: &Spy) -> Registry {
    Registry::new()
        .with_validator(NameRequired)
        .with_handler(CreateUserHandler { spy: spy.clone() })
}

fn bus(registry: Registry) -> Bus {
    init_test_tracing();
    Bus::new(Arc::new(registry))
}

fn recording_validator(spy: &Spy, name: &'static str, priority: i32, fails: bool) -> FnValidator<CreateUser> {
    let spy = spy.clone();
    FnValidator::new(move |_, _: &CreateUser| {
        spy.record(name);
        Ok(if fails {
            vec![ResponseError::new(format!("{name} rejected"))]
        } else {
            Vec::new()
        })
    })
    .named(name)
    .with_priority(priority)
}

fn alice() -> CreateUser {
    CreateUser {
        name: "alice".to_string(),
    }
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn empty_name_is_rejected_without_invoking_the_handler() {
    let spy = Spy::new();
    let bus = bus(user_registry(&spy));

    let response = bus
        .send::<CreateUser, UserId>(&CreateUser {
            name: String::new(),
        })
        .unwrap();

    assert!(!response.is_succeed());
    assert_eq!(
        response.errors(),
        &[ResponseError {
            code: None,
            message: "Name is required.".to_string(),
            property_name: Some("Name".to_string()),
        }]
    );
    assert_eq!(response.value(), None);
    assert_eq!(spy.count(), 0);
}

#[test]
fn highest_priority_rejection_wins_and_stops_validation() {
    let spy = Spy::new();
    let registry = Registry::new()
        .with_validator(recording_validator(&spy, "v2", 5, false))
        .with_validator(recording_validator(&spy, "v1", 10, true))
        .with_handler(CreateUserHandler { spy: spy.clone() });
    let bus = bus(registry);

    let response = bus.send::<CreateUser, UserId>(&alice()).unwrap();

    assert_eq!(response.errors(), &[ResponseError::new("v1 rejected")]);
    assert_eq!(spy.calls(), vec!["v1"]);
}

#[test]
fn passing_validators_all_run_before_the_handler() {
    let spy = Spy::new();
    let registry = Registry::new()
        .with_validator(recording_validator(&spy, "low", -1, false))
        .with_validator(recording_validator(&spy, "high", 3, false))
        .with_handler(CreateUserHandler { spy: spy.clone() });
    let bus = bus(registry);

    let response = bus.send::<CreateUser, UserId>(&alice()).unwrap();

    assert!(response.is_succeed());
    assert_eq!(spy.calls(), vec!["high", "low", "create:alice"]);
}

#[test]
fn inapplicable_validators_are_skipped() {
    let spy = Spy::new();
    let registry = Registry::new()
        .with_validator(recording_validator(&spy, "never", 100, true).when(|_, _| false))
        .with_handler(CreateUserHandler { spy: spy.clone() });
    let bus = bus(registry);

    assert!(bus.send::<CreateUser, UserId>(&alice()).unwrap().is_succeed());
    assert!(!spy.was_called("never"));
}

#[test]
fn validator_errors_propagate() {
    let registry = Registry::new()
        .with_validator(FnValidator::new(|_, _: &CreateUser| Err(BoxError::from("lookup failed"))).named("unique_name"))
        .with_handler(CreateUserHandler { spy: Spy::new() });
    let bus = bus(registry);

    let error = bus.send::<CreateUser, UserId>(&alice()).unwrap_err();
    assert!(matches!(error, BusError::Validator { validator: "unique_name", .. }));
}

// ============================================================================
// Handler resolution
// ============================================================================

#[test]
fn missing_handler_is_an_error_for_send_and_a_failure_for_try_send() {
    let bus = bus(Registry::new());

    let error = bus.send::<CreateUser, UserId>(&alice()).unwrap_err();
    assert!(error.is_no_handler());
    assert!(error.to_string().contains("CreateUser"));

    let response = bus.try_send::<CreateUser, UserId>(&alice()).unwrap();
    assert!(!response.is_succeed());
    assert!(response.value().is_none());

    let responses = bus.responses::<CreateUser, UserId>(&alice()).unwrap();
    assert!(responses.is_empty());
}

#[test]
fn first_applicable_handler_wins() {
    let registry = Registry::new()
        .with_handler(FnHandler::new(|_, _: &CreateUser| Ok(Some(Response::success(UserId(1))))).when(|_, r| r.name == "bob"))
        .with_handler(FnHandler::new(|_, _: &CreateUser| Ok(Some(Response::success(UserId(2))))))
        .with_handler(FnHandler::new(|_, _: &CreateUser| Ok(Some(Response::success(UserId(3))))));
    let bus = bus(registry);

    let response = bus.send::<CreateUser, UserId>(&alice()).unwrap();
    assert_eq!(response.into_value(), Some(UserId(2)));
}

#[test]
fn handlers_are_resolved_by_result_type() {
    let registry = Registry::new()
        .with_handler(FnHandler::new(|_, r: &CreateUser| Ok(Some(Response::success(r.name.len())))))
        .with_handler(FnHandler::new(|_, r: &CreateUser| Ok(Some(Response::success(r.name.clone())))));
    let bus = bus(registry);

    assert_eq!(bus.send::<CreateUser, usize>(&alice()).unwrap().into_value(), Some(5));
    assert_eq!(
        bus.send::<CreateUser, String>(&alice()).unwrap().into_value().as_deref(),
        Some("alice")
    );
}

#[test]
fn handler_errors_propagate() {
    let registry = Registry::new().with_handler(
        FnHandler::new(|_, _: &CreateUser| -> HandlerResult<UserId> { Err("disk full".into()) }).named("store_user"),
    );
    let bus = bus(registry);

    let error = bus.try_send::<CreateUser, UserId>(&alice()).unwrap_err();
    assert_eq!(error.failed_capability(), Some("store_user"));
    assert!(error.to_string().contains("store_user"));
}

#[test]
fn handler_without_a_response_yields_a_generic_failure() {
    let registry = Registry::new().with_handler(FnHandler::new(|_, _: &CreateUser| -> HandlerResult<UserId> { Ok(None) }));
    let bus = bus(registry);

    let response = bus.send::<CreateUser, UserId>(&alice()).unwrap();
    assert!(!response.is_succeed());
    assert!(response.errors().is_empty());
}

#[test]
fn execution_priority_is_ignored_by_single_dispatch() {
    let registry = Registry::new()
        .with_handler(FnHandler::new(|_, _: &CreateUser| Ok(Some(Response::success(UserId(1))))))
        .with_handler(
            FnHandler::new(|_, _: &CreateUser| Ok(Some(Response::success(UserId(2)))))
                .with_priority(ExecutionPriority::Main),
        );
    let bus = bus(registry);

    assert_eq!(bus.send::<CreateUser, UserId>(&alice()).unwrap().into_value(), Some(UserId(1)));
}

// ============================================================================
// Context
// ============================================================================

#[test]
fn context_is_built_once_per_bus() {
    let runs = Arc::new(AtomicUsize::new(0));
    let registry = Arc::new(
        user_registry(&Spy::new()).with_context_writer(SeedIds {
            runs: Arc::clone(&runs),
        }),
    );

    let bus = Bus::new(Arc::clone(&registry));
    assert_eq!(bus.send::<CreateUser, UserId>(&alice()).unwrap().into_value(), Some(UserId(7)));
    assert_eq!(bus.send::<CreateUser, UserId>(&alice()).unwrap().into_value(), Some(UserId(7)));
    assert_eq!(runs.load(Ordering::SeqCst), 1);

    let other = Bus::new(registry);
    other.context();
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

#[test]
fn handler_writes_are_visible_to_later_calls() {
    let registry = Registry::new().with_handler(FnHandler::new(|context: &Context, _: &CreateUser| {
        let calls = context.get_or_default::<u32>("calls") + 1;
        context.set("calls", calls);
        Ok(Some(Response::success(UserId(calls))))
    }));
    let bus = bus(registry);

    bus.send::<CreateUser, UserId>(&alice()).unwrap();
    let second = bus.send::<CreateUser, UserId>(&alice()).unwrap();
    assert_eq!(second.into_value(), Some(UserId(2)));
}

#[test]
fn repeated_dispatch_is_idempotent_for_pure_handlers() {
    let spy = Spy::new();
    let bus = bus(user_registry(&spy));

    let first = bus.send::<CreateUser, UserId>(&alice()).unwrap();
    let second = bus.send::<CreateUser, UserId>(&alice()).unwrap();
    assert_eq!(first, second);
}

// ============================================================================
// Async family
// ============================================================================

#[tokio::test]
async fn async_send_validates_then_dispatches() {
    let spy = Spy::new();
    let registry = Registry::new()
        .with_async_validator(Immediate(NameRequired))
        .with_async_handler(Immediate(CreateUserHandler { spy: spy.clone() }));
    let bus = bus(registry);

    let rejected = bus
        .send_async::<CreateUser, UserId>(&CreateUser {
            name: String::new(),
        })
        .await
        .unwrap();
    assert_eq!(rejected.errors()[0].property_name.as_deref(), Some("Name"));
    assert_eq!(spy.count(), 0);

    let accepted = bus.send_async::<CreateUser, UserId>(&alice()).await.unwrap();
    assert!(accepted.is_succeed());
    assert_eq!(spy.calls(), vec!["create:alice"]);
}

#[tokio::test]
async fn async_family_does_not_see_sync_registrations() {
    let bus = bus(user_registry(&Spy::new()));

    let error = bus.send_async::<CreateUser, UserId>(&alice()).await.unwrap_err();
    assert!(error.is_no_handler());

    let response = bus.try_send_async::<CreateUser, UserId>(&alice()).await.unwrap();
    assert!(!response.is_succeed());
}

#[tokio::test]
async fn async_handler_errors_propagate() {
    let registry = Registry::new().with_async_handler(
        FnHandler::new(|_, _: &CreateUser| -> HandlerResult<UserId> { Err("timeout".into()) }).named("remote"),
    );
    let bus = bus(registry);

    let error = bus.send_async::<CreateUser, UserId>(&alice()).await.unwrap_err();
    assert!(matches!(error, BusError::Handler { handler: "remote", .. }));
}

#[tokio::test]
async fn bus_futures_can_be_spawned() {
    let bus = Arc::new(bus(Registry::new().with_async_handler(FnHandler::new(|_, n: &u64| Ok(Some(Response::success(n * 2)))))));

    let task = tokio::spawn({
        let bus = Arc::clone(&bus);
        async move { bus.send_async::<u64, u64>(&21).await }
    });

    assert_eq!(task.await.unwrap().unwrap().into_value(), Some(42));
}
