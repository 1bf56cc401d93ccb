//! Order flow demo binary
//!
//! Places a few orders through the Courier bus and prints what each
//! capability contributed.

use courier_core::{Response, Responses};
use courier_runtime::{Bus, BusConfig, metrics::describe_metrics};
use order_flow::{Catalog, GetPrice, OrderPlaced, PlaceOrder, Receipt, registry};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn print_receipts(responses: &Responses<Receipt>) {
    for response in responses.iter() {
        match response.value() {
            Some(receipt) => println!("  ✓ {:<8} {}", receipt.step, receipt.detail),
            None => {
                for error in response.errors() {
                    println!("  ✗ {} {error}", response.status_code());
                }
            },
        }
    }
}

fn order(customer: &str, sku: &str, quantity: u32, express: bool) -> PlaceOrder {
    PlaceOrder {
        customer: customer.to_string(),
        sku: sku.to_string(),
        quantity,
        express,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "order_flow=info,courier_runtime=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
    describe_metrics();

    println!("=== Order Flow: Courier dispatch bus ===\n");

    let catalog = Arc::new(Catalog::with_items([("widget", 5, 250), ("gizmo", 1, 1_200)]));
    let registry = Arc::new(registry("acme", &catalog));

    // Single dispatch
    let bus = Bus::new(Arc::clone(&registry));
    let price = bus.send::<GetPrice, u64>(&GetPrice {
        sku: "widget".to_string(),
    })?;
    println!(">>> GetPrice(widget): {:?} cents", price.value());

    // Synchronous aggregation
    println!("\n>>> PlaceOrder(ada, widget x 2)");
    let responses = bus.responses::<PlaceOrder, Receipt>(&order("ada", "widget", 2, false))?;
    print_receipts(&responses);

    println!("\n>>> PlaceOrder(bob, gizmo x 3): out of stock");
    let responses = bus.responses::<PlaceOrder, Receipt>(&order("bob", "gizmo", 3, false))?;
    print_receipts(&responses);

    println!("\n>>> PlaceOrder(<blank>, widget x 0): invalid");
    let response = bus.send::<PlaceOrder, Receipt>(&order("", "widget", 0, false))?;
    for error in response.errors() {
        println!("  ✗ {error}");
    }

    // Asynchronous aggregation on a fresh operation scope
    let bus = Bus::with_config(Arc::clone(&registry), BusConfig::new().with_isolated_subscriber_errors(true));
    println!("\n>>> PlaceOrder(cy, gizmo x 1, express) [async]");
    let express = order("cy", "gizmo", 1, true);
    let responses = bus.responses_async::<PlaceOrder, Receipt>(&express).await?;
    print_receipts(&responses);

    if responses.all_succeeded() {
        let order_id = bus.context().get_or_default::<u64>(order_flow::NEXT_ORDER_ID) - 1;
        bus.publish_async(&OrderPlaced {
            order_id,
            customer: express.customer.clone(),
            express: express.express,
        })
        .await?;
    }

    // Lenient dispatch for a request nobody handles
    let unhandled: Response<String> = bus.try_send(&express)?;
    println!("\n>>> try_send(PlaceOrder -> String): succeeded = {}", unhandled.is_succeed());

    println!("\nRemaining stock: widget = {}, gizmo = {}", catalog.stock("widget"), catalog.stock("gizmo"));
    Ok(())
}
