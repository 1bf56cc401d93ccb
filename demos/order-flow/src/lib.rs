//! Order placement wired onto the Courier bus.
//!
//! - `PlaceOrder` is validated, then aggregated: stock reservation is the
//!   `Main` handler, payment runs independently and loyalty points are
//!   best-effort. A filter appends a summary receipt.
//! - `GetPrice` is a single-dispatch query.
//! - `OrderPlaced` fans out to email, ledger and (for express orders) courier
//!   subscribers.

use courier_core::{
    AsyncEventHandler, AsyncHandler, BoxError, BoxFuture, Context, ContextWriter, EventHandler,
    ExecutionPriority, Filter, Handler, HandlerResult, HttpError, Immediate, Response,
    ResponseError, Responses, Validator,
};
use courier_runtime::Registry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Context key holding the tenant name
pub const TENANT: &str = "tenant";

/// Context key holding the order sequence counter
pub const NEXT_ORDER_ID: &str = "next_order_id";

/// Request to place an order
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    /// Customer placing the order
    pub customer: String,
    /// Stock keeping unit
    pub sku: String,
    /// Units ordered
    pub quantity: u32,
    /// Whether courier delivery was requested
    pub express: bool,
}

/// Query for the unit price of a SKU, in cents
#[derive(Debug, Clone)]
pub struct GetPrice {
    /// Stock keeping unit
    pub sku: String,
}

/// One step's contribution to an order placement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    /// Step that produced the receipt
    pub step: &'static str,
    /// Human-readable detail
    pub detail: String,
}

impl Receipt {
    fn new(step: &'static str, detail: impl Into<String>) -> Self {
        Self {
            step,
            detail: detail.into(),
        }
    }
}

/// Event published once an order is accepted
#[derive(Debug, Clone)]
pub struct OrderPlaced {
    /// Assigned order identifier
    pub order_id: u64,
    /// Customer that placed the order
    pub customer: String,
    /// Whether courier delivery was requested
    pub express: bool,
}

/// In-memory stock and price catalog shared by the handlers.
#[derive(Debug, Default)]
pub struct Catalog {
    items: Mutex<HashMap<String, (u32, u64)>>,
}

impl Catalog {
    /// Catalog with `(sku, stock, unit price in cents)` entries
    #[must_use]
    pub fn with_items<'a>(items: impl IntoIterator<Item = (&'a str, u32, u64)>) -> Self {
        let items = items
            .into_iter()
            .map(|(sku, stock, price)| (sku.to_string(), (stock, price)))
            .collect();
        Self {
            items: Mutex::new(items),
        }
    }

    /// Unit price of `sku`
    #[must_use]
    pub fn price(&self, sku: &str) -> Option<u64> {
        self.items().get(sku).map(|&(_, price)| price)
    }

    /// Units of `sku` left in stock
    #[must_use]
    pub fn stock(&self, sku: &str) -> u32 {
        self.items().get(sku).map_or(0, |&(stock, _)| stock)
    }

    /// Take `quantity` units of `sku` out of stock, returning the line total
    fn reserve(&self, sku: &str, quantity: u32) -> Option<u64> {
        let mut items = self.items();
        let (stock, price) = items.get_mut(sku)?;
        if *stock < quantity {
            return None;
        }
        *stock -= quantity;
        Some(*price * u64::from(quantity))
    }

    fn items(&self) -> std::sync::MutexGuard<'_, HashMap<String, (u32, u64)>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ============================================================================
// Context
// ============================================================================

/// Seeds the per-operation context with the tenant and the order sequence.
pub struct RequestMetadata {
    /// Tenant the operation runs for
    pub tenant: String,
}

impl ContextWriter for RequestMetadata {
    fn write(&self, context: &Context) {
        context.set(TENANT, self.tenant.clone());
        context.set(NEXT_ORDER_ID, 1000_u64);
    }
}

// ============================================================================
// Validators
// ============================================================================

/// Rejects orders without a customer
pub struct CustomerRequired;

impl Validator<PlaceOrder> for CustomerRequired {
    fn priority(&self) -> i32 {
        10
    }

    fn validate(&self, _: &Context, order: &PlaceOrder) -> Result<Vec<ResponseError>, BoxError> {
        if order.customer.trim().is_empty() {
            return Ok(vec![ResponseError::for_property("Customer", "Customer is required.")]);
        }
        Ok(Vec::new())
    }
}

/// Rejects empty SKUs and zero quantities
pub struct LineItemValid;

impl Validator<PlaceOrder> for LineItemValid {
    fn priority(&self) -> i32 {
        5
    }

    fn validate(&self, _: &Context, order: &PlaceOrder) -> Result<Vec<ResponseError>, BoxError> {
        let mut errors = Vec::new();
        if order.sku.is_empty() {
            errors.push(ResponseError::for_property("Sku", "Sku is required."));
        }
        if order.quantity == 0 {
            errors.push(
                ResponseError::for_property("Quantity", "Quantity must be positive.")
                    .with_code("quantity_range"),
            );
        }
        Ok(errors)
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Reserves stock; gates the whole placement
pub struct ReserveStock {
    catalog: Arc<Catalog>,
}

impl Handler<PlaceOrder, Receipt> for ReserveStock {
    fn execution_priority(&self) -> ExecutionPriority {
        ExecutionPriority::Main
    }

    fn handle(&self, context: &Context, order: &PlaceOrder) -> HandlerResult<Receipt> {
        let Some(total) = self.catalog.reserve(&order.sku, order.quantity) else {
            return Ok(Some(HttpError::conflict(format!("{} is out of stock", order.sku))));
        };

        let order_id = context.get_or_default::<u64>(NEXT_ORDER_ID);
        context.set(NEXT_ORDER_ID, order_id + 1);
        context.set("order_total", total);
        tracing::info!(order_id, sku = %order.sku, total, "Stock reserved");

        Ok(Some(Response::success(Receipt::new(
            "stock",
            format!("order {order_id}: {} x {}", order.quantity, order.sku),
        ))))
    }

    fn name(&self) -> &'static str {
        "reserve_stock"
    }
}

/// Charges the customer for the reserved total
pub struct ChargePayment;

impl AsyncHandler<PlaceOrder, Receipt> for ChargePayment {
    fn execution_priority(&self) -> ExecutionPriority {
        ExecutionPriority::Independent
    }

    fn handle<'a>(
        &'a self,
        context: &'a Context,
        order: &'a PlaceOrder,
    ) -> BoxFuture<'a, HandlerResult<Receipt>> {
        Box::pin(async move {
            // Simulated gateway round trip
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            let total = context.get::<u64>("order_total").unwrap_or_default();
            Ok(Some(Response::success(Receipt::new(
                "payment",
                format!("charged {} cents to {}", total, order.customer),
            ))))
        })
    }

    fn name(&self) -> &'static str {
        "charge_payment"
    }
}

/// Awards loyalty points; the loyalty service is known to be flaky
pub struct LoyaltyPoints;

impl Handler<PlaceOrder, Receipt> for LoyaltyPoints {
    fn handle(&self, _: &Context, order: &PlaceOrder) -> HandlerResult<Receipt> {
        if order.customer.starts_with("guest") {
            return Err("loyalty service does not know guest customers".into());
        }
        Ok(Some(Response::success(Receipt::new(
            "loyalty",
            format!("{} points", order.quantity * 10),
        ))))
    }

    fn name(&self) -> &'static str {
        "loyalty_points"
    }
}

/// Looks up unit prices
pub struct PriceLookup {
    catalog: Arc<Catalog>,
}

impl Handler<GetPrice, u64> for PriceLookup {
    fn handle(&self, _: &Context, query: &GetPrice) -> HandlerResult<u64> {
        Ok(Some(self.catalog.price(&query.sku).map_or_else(
            || HttpError::not_found(format!("unknown sku {}", query.sku)),
            Response::success,
        )))
    }
}

// ============================================================================
// Filters
// ============================================================================

/// Appends a summary of the other receipts
pub struct Summary;

impl Filter<PlaceOrder, Receipt> for Summary {
    fn apply(
        &self,
        context: &Context,
        _: &PlaceOrder,
        responses: &mut Responses<Receipt>,
    ) -> Result<(), BoxError> {
        let steps = responses
            .iter()
            .filter_map(Response::value)
            .map(|receipt| receipt.step)
            .collect::<Vec<_>>()
            .join(", ");
        let tenant = context.get_or_default::<String>(TENANT);
        responses.push(Response::success(Receipt::new(
            "summary",
            format!("[{tenant}] {steps}"),
        )));
        Ok(())
    }
}

// ============================================================================
// Subscribers
// ============================================================================

/// Emails the customer
pub struct SendConfirmationEmail;

impl EventHandler<OrderPlaced> for SendConfirmationEmail {
    fn handle(&self, _: &Context, event: &OrderPlaced) -> Result<(), BoxError> {
        tracing::info!(order_id = event.order_id, customer = %event.customer, "Confirmation email sent");
        Ok(())
    }
}

/// Records the order in the ledger
pub struct UpdateLedger;

impl EventHandler<OrderPlaced> for UpdateLedger {
    fn handle(&self, context: &Context, event: &OrderPlaced) -> Result<(), BoxError> {
        let total = context.get::<u64>("order_total").unwrap_or_default();
        tracing::info!(order_id = event.order_id, total, "Ledger updated");
        Ok(())
    }
}

/// Books a courier for express orders
pub struct BookCourier;

impl AsyncEventHandler<OrderPlaced> for BookCourier {
    fn is_applicable(&self, _: &Context, event: &OrderPlaced) -> bool {
        event.express
    }

    fn handle<'a>(&'a self, _: &'a Context, event: &'a OrderPlaced) -> BoxFuture<'a, Result<(), BoxError>> {
        Box::pin(async move {
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
            tracing::info!(order_id = event.order_id, "Courier booked");
            Ok(())
        })
    }
}

/// Registry wiring every capability of the order flow.
///
/// Synchronous capabilities are lifted into the asynchronous family with
/// [`Immediate`], so both call families see the same flow.
#[must_use]
pub fn registry(tenant: &str, catalog: &Arc<Catalog>) -> Registry {
    Registry::new()
        .with_context_writer(RequestMetadata {
            tenant: tenant.to_string(),
        })
        .with_validator(CustomerRequired)
        .with_validator(LineItemValid)
        .with_async_validator(Immediate(CustomerRequired))
        .with_async_validator(Immediate(LineItemValid))
        .with_handler(ReserveStock {
            catalog: Arc::clone(catalog),
        })
        .with_handler(LoyaltyPoints)
        .with_async_handler(Immediate(ReserveStock {
            catalog: Arc::clone(catalog),
        }))
        .with_async_handler(ChargePayment)
        .with_async_handler(Immediate(LoyaltyPoints))
        .with_handler(PriceLookup {
            catalog: Arc::clone(catalog),
        })
        .with_filter(Summary)
        .with_async_filter(Immediate(Summary))
        .with_event_handler(SendConfirmationEmail)
        .with_event_handler(UpdateLedger)
        .with_async_event_handler(Immediate(SendConfirmationEmail))
        .with_async_event_handler(Immediate(UpdateLedger))
        .with_async_event_handler(BookCourier)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use courier_runtime::{Bus, BusConfig, MainExecution};
    use courier_testing::assertions::{assert_failed_with, assert_property_error};

    fn catalog() -> Arc<Catalog> {
        Arc::new(Catalog::with_items([("widget", 5, 250)]))
    }

    fn order(customer: &str, quantity: u32) -> PlaceOrder {
        PlaceOrder {
            customer: customer.to_string(),
            sku: "widget".to_string(),
            quantity,
            express: false,
        }
    }

    fn steps(responses: &Responses<Receipt>) -> Vec<&'static str> {
        responses
            .iter()
            .filter_map(Response::value)
            .map(|receipt| receipt.step)
            .collect()
    }

    #[test]
    fn placement_reserves_stock_and_summarizes() {
        let catalog = catalog();
        let bus = Bus::new(Arc::new(registry("acme", &catalog)));

        let responses = bus.responses::<PlaceOrder, Receipt>(&order("ada", 2)).unwrap();

        assert_eq!(steps(&responses), vec!["stock", "loyalty", "summary"]);
        assert_eq!(catalog.stock("widget"), 3);
        assert_eq!(
            responses.other.last().and_then(Response::value).map(|r| r.detail.as_str()),
            Some("[acme] stock, loyalty")
        );
    }

    #[test]
    fn out_of_stock_aborts_with_a_conflict() {
        let catalog = catalog();
        let bus = Bus::new(Arc::new(registry("acme", &catalog)));

        let responses = bus.responses::<PlaceOrder, Receipt>(&order("ada", 9)).unwrap();

        let main = responses.main.unwrap();
        assert_eq!(main.status_code(), 409);
        assert!(responses.other.is_empty());
        assert_eq!(catalog.stock("widget"), 5);
    }

    #[test]
    fn invalid_orders_report_property_errors() {
        let bus = Bus::new(Arc::new(registry("acme", &catalog())));

        let response = bus.send::<PlaceOrder, Receipt>(&order("", 0)).unwrap();
        assert_failed_with(&response, &["Customer is required."]);

        let response = bus.send::<PlaceOrder, Receipt>(&order("ada", 0)).unwrap();
        assert_property_error(&response, "Quantity");
        assert_eq!(response.errors()[0].code.as_deref(), Some("quantity_range"));
    }

    #[test]
    fn loyalty_failures_do_not_fail_the_order() {
        let bus = Bus::new(Arc::new(registry("acme", &catalog())));

        let responses = bus.responses::<PlaceOrder, Receipt>(&order("guest-17", 1)).unwrap();

        assert!(responses.all_succeeded());
        assert_eq!(steps(&responses), vec!["stock", "summary"]);
    }

    #[test]
    fn unknown_skus_are_not_found() {
        let bus = Bus::new(Arc::new(registry("acme", &catalog())));

        let response = bus
            .send::<GetPrice, u64>(&GetPrice {
                sku: "gadget".to_string(),
            })
            .unwrap();
        assert_eq!(response.status_code(), 404);
        assert_eq!(response.status_reason(), Some("Not Found"));
    }

    #[tokio::test]
    async fn async_placement_charges_payment() {
        let bus = Bus::with_config(
            Arc::new(registry("acme", &catalog())),
            BusConfig::new().with_main_execution(MainExecution::Exclusive),
        );

        let responses = bus
            .responses_async::<PlaceOrder, Receipt>(&order("ada", 1))
            .await
            .unwrap();

        assert_eq!(steps(&responses), vec!["stock", "payment", "loyalty", "summary"]);
        let payment = responses.other[0].value().unwrap();
        assert_eq!(payment.detail, "charged 250 cents to ada");
    }
}
