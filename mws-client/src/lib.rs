//! MWS Client: request pipeline for Amazon Marketplace Web Service
//!
//! A Rust library that turns caller parameters into MWS wire requests and MWS responses into
//! navigable values. One client type serves every API section; sections are data, not types.
//!
//! # What does it do?
//!
//! - **Parameter pipeline**: timestamps rendered as ISO-8601, repeated parameters expanded into
//!   positional `List.Member.N` keys, snake-case keys camelized
//! - **Marketplace registry**: marketplace id or country code to host and flat-file encoding
//! - **Dispatcher**: default parameters, seller credentials, body content-type negotiation,
//!   one-shot upload bodies, streaming callbacks
//! - **Response decoding**: XML payload extraction with pagination tokens, tab-separated flat
//!   files with summary blocks and MD5 verification
//! - **Error classification**: `ErrorResponse` documents become typed errors handed to a
//!   registered handler
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │  Caller params   │  ParamKey / ParamValue tree
//! └────────┬─────────┘
//!          │ params::Parameters::finalize
//! ┌────────▼──────────────────────────────────────┐
//! │           MwsClient (client::MwsClient)         │
//! │  ┌────────────────┐     ┌───────────────────┐ │
//! │  │ ApiSection     │     │ Marketplace       │ │
//! │  │ (catalog)      │     │ (host, encoding)  │ │
//! │  └────────────────┘     └───────────────────┘ │
//! └────────┬──────────────────────────────────────┘
//!          │ Transport::post (reqwest by default)
//! ┌────────▼─────────┐
//! │ ResponseEnvelope │──failure──▶ classify ──▶ ErrorHandler
//! └────────┬─────────┘
//!          │ response::route
//! ┌────────▼──────────────────────────────┐
//! │ ParsedResponse: Xml | FlatFile | Raw  │
//! └───────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ## 1. List orders
//!
//! ```rust,no_run
//! use mws_client::{
//!     MwsClient,
//!     catalog::ApiSection,
//!     config::ClientConfig,
//!     params::{ParamKey, ParamValue, Parameters},
//! };
//!
//! # async fn example() -> mws_client::Result<()> {
//! let config = ClientConfig::new("ATVPDKIKX0DER").merchant_id("SELLER123");
//! let mut client = MwsClient::new(config, ApiSection::orders())?;
//!
//! let params = Parameters::new()
//!     .with(ParamKey::symbol("created_after"), ParamValue::time_text("2015-01-01"))
//!     .with(ParamKey::symbol("order_status"), vec!["Pending", "Unshipped"]);
//!
//! let response = client.call("list_orders", params).await?;
//! if let Some(xml) = response.as_xml() {
//!     println!("{:?}", xml.parse());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## 2. Download a report
//!
//! ```rust,no_run
//! use mws_client::{
//!     MwsClient,
//!     catalog::ApiSection,
//!     config::ClientConfig,
//!     params::{ParamKey, Parameters},
//! };
//!
//! # async fn example() -> mws_client::Result<()> {
//! let mut client = MwsClient::new(ClientConfig::new("JP"), ApiSection::reports())?;
//!
//! let params = Parameters::new().with(ParamKey::symbol("report_id"), "12345");
//! let response = client.call("get_report", params).await?;
//!
//! if let Some(report) = response.as_flat_file() {
//!     assert!(report.valid(), "Content-MD5 mismatch");
//!     report.parse_each(|row| println!("{row:?}"))?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## 3. Handle service errors
//!
//! ```rust,no_run
//! use mws_client::{MwsClient, MwsError, catalog::ApiSection, config::ClientConfig, response::ParsedResponse};
//!
//! # fn example() -> mws_client::Result<()> {
//! let client = MwsClient::new(ClientConfig::new("DE"), ApiSection::products())?
//!     .on_error(|error| match error.code.as_str() {
//!         "InvalidParameterValue" => Ok(ParsedResponse::Raw(*error.response)),
//!         _ => Err(MwsError::Domain(error)),
//!     });
//! # let _ = client;
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`params`]: parameter model and pipeline
//! - [`marketplace`]: marketplace registry and text encodings
//! - [`catalog`]: API sections and operations
//! - [`config`]: client configuration
//! - [`client`]: request dispatcher
//! - [`transport`]: transport seam and the `reqwest` implementation
//! - [`response`]: routing and the XML / flat-file decoders
//! - [`classify`]: error classification and handler resolution
//! - [`reliability`]: opt-in retry with exponential backoff
//! - [`error`]: error types
//!
//! # Logging
//!
//! The crate emits [`tracing`] spans and events and never installs a subscriber. Auth tokens
//! are never recorded.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![allow(
    clippy::multiple_crate_versions,
    reason = "transitive dependencies from reqwest"
)]

pub mod catalog;
pub mod classify;
pub mod client;
pub mod config;
pub mod error;
pub mod marketplace;
pub mod params;
pub mod reliability;
pub mod response;
pub mod transport;

pub use client::MwsClient;
pub use error::{MwsError, Result};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let _ = std::marker::PhantomData::<MwsError>;
        let _ = std::marker::PhantomData::<MwsClient>;
    }
}
