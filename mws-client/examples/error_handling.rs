//! Error handling: registered handlers, unclassified failures and retries.
//!
//! # Running this example
//!
//! ```bash
//! export MWS_MERCHANT_ID=A1EXAMPLE
//! cargo run --example error_handling
//! ```

#![allow(
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::use_debug,
    reason = "examples are allowed to use println and simple formatting"
)]

use std::{env, sync::Arc};

use mws_client::{
    MwsClient, MwsError,
    catalog::ApiSection,
    client::ClientDefaults,
    config::ClientConfig,
    params::{ParamKey, Parameters},
    reliability::{RetryPolicy, is_retryable, retry_with_backoff},
    response::ParsedResponse,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().init();

    let merchant_id = env::var("MWS_MERCHANT_ID").map_err(|_| "MWS_MERCHANT_ID not set")?;
    let config = ClientConfig::new("DE").merchant_id(merchant_id);

    // Shared by every Products client; unknown ASINs become empty responses.
    let defaults = Arc::new(ClientDefaults::new().on_error(|error| {
        if error.code == "InvalidParameterValue" {
            Ok(ParsedResponse::Raw(*error.response))
        } else {
            Err(MwsError::Domain(error))
        }
    }));

    let mut client = MwsClient::new(config.clone(), ApiSection::products())?.with_defaults(defaults);

    println!("Example 1: lookup that the handler may recover from");
    let params = Parameters::new().with(ParamKey::name("ASINList"), vec!["B00INVALID"]);
    match client.call("get_matching_product", params).await {
        Ok(response) => println!("   status {} ({:?})", response.status(), response.kind()),
        Err(e) => eprintln!("   failed: {e}"),
    }

    println!("\nExample 2: unknown operation");
    match client.call("get_everything", Parameters::new()).await {
        Err(MwsError::UnknownOperation(op)) => println!("   rejected: {op}"),
        other => println!("   unexpected: {other:?}"),
    }

    println!("\nExample 3: retrying throttled calls");
    let policy = RetryPolicy::default();
    let result = retry_with_backoff(&policy, is_retryable, || {
        let config = config.clone();
        async move {
            let mut sellers = MwsClient::new(config, ApiSection::sellers())?;
            sellers.call("get_service_status", Parameters::new()).await
        }
    })
    .await;

    match result {
        Ok(response) => println!("   service status: {:?}", response.as_xml().map(|x| x.to_value())),
        Err(MwsError::Domain(e)) => eprintln!("   service error {}: {}", e.code, e.message),
        Err(MwsError::UnexpectedStatus { status, .. }) => eprintln!("   HTTP {status}"),
        Err(e) => eprintln!("   {e}"),
    }

    Ok(())
}
