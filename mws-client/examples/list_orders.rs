//! Lists recent orders and follows pagination.
//!
//! # Running this example
//!
//! ```bash
//! export MWS_MERCHANT_ID=A1EXAMPLE
//! export MWS_MARKETPLACE=US
//! RUST_LOG=mws_client=debug cargo run --example list_orders
//! ```
//!
//! Requests are sent unsigned; a real deployment installs a `RequestSigner`.

#![allow(
    clippy::print_stdout,
    clippy::use_debug,
    reason = "examples are allowed to use println and simple formatting"
)]

use std::env;

use chrono::{Duration, Utc};
use mws_client::{
    MwsClient,
    catalog::ApiSection,
    config::ClientConfig,
    params::{ParamKey, Parameters},
    response::MwsHeaders,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let merchant_id = env::var("MWS_MERCHANT_ID").map_err(|_| "MWS_MERCHANT_ID not set")?;
    let marketplace = env::var("MWS_MARKETPLACE").unwrap_or_else(|_| "US".to_owned());

    let config = ClientConfig::new(marketplace).merchant_id(merchant_id);
    let mut client = MwsClient::new(config, ApiSection::orders())?;
    println!("Endpoint: {}", client.endpoint());

    let params = Parameters::new()
        .with(ParamKey::symbol("created_after"), Utc::now() - Duration::days(7))
        .with(ParamKey::symbol("order_status"), vec!["Unshipped", "PartiallyShipped"]);

    let mut response = client.call("list_orders", params).await?;
    let mut page = 1;

    loop {
        if let Some(xml) = response.as_xml() {
            let orders = xml.dig(&["Orders"]).map_or(0, |o| o.children_named("Order").count());
            println!("Page {page}: {orders} orders");
        }
        if let Some(quota) = response.quota() {
            println!("  quota {}/{} resets {}", quota.remaining, quota.max, quota.resets_on);
        }

        let Some(token) = response.next_token().map(str::to_owned) else { break };
        response = client.call_by_next_token("list_orders", &token).await?;
        page += 1;
    }

    Ok(())
}
