//! Operation catalog.
//!
//! An [`ApiSection`] describes one MWS API section: its path, version, which parameter
//! carries the primary marketplace, extra structured-list registrations and the operations it
//! offers. One client type serves every section; the section value is all that differs.
//!
//! Sections ship for Orders, Reports, Feeds, Products and Sellers. Other sections can be
//! described in TOML:
//!
//! ```
//! use mws_client::catalog::ApiSection;
//!
//! let section = ApiSection::from_toml(r#"
//!     name = "Recommendations"
//!     path = "/Recommendations/2013-04-01"
//!     version = "2013-04-01"
//!     marketplace_param = "MarketplaceId"
//!
//!     [structured_lists]
//!     category_query_list = ["CategoryQueryList", "CategoryQuery"]
//!
//!     [operations.list_recommendations]
//!     action = "ListRecommendations"
//!
//!     [operations.list_recommendations_by_next_token]
//!     action = "ListRecommendationsByNextToken"
//!     with_marketplace = false
//! "#)?;
//!
//! assert_eq!(section.operation("list_recommendations")?.action, "ListRecommendations");
//! # Ok::<(), mws_client::MwsError>(())
//! ```

use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::{
    error::{MwsError, Result},
    params::{ParamKey, StructuredList, StructuredListRegistry, camelize},
};

/// One operation of an API section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OperationSpec {
    /// Wire action name, e.g. `ListOrders`.
    pub action: String,

    /// Parameter that carries the primary marketplace; overrides the section's.
    #[serde(default)]
    pub marketplace_param: Option<String>,

    /// Whether the primary marketplace is injected at all.
    #[serde(default = "default_true")]
    pub with_marketplace: bool,

    /// Keys excluded from structured-list expansion for this operation.
    #[serde(default)]
    pub skip_structured: Vec<String>,

    /// Structured lists used only by this operation.
    #[serde(default)]
    pub structured_lists: StructuredListRegistry,

    /// Expected success status.
    #[serde(default = "default_expects")]
    pub expects: u16,
}

impl OperationSpec {
    /// Creates an operation that injects the section's marketplace parameter.
    #[must_use]
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            marketplace_param: None,
            with_marketplace: true,
            skip_structured: Vec::new(),
            structured_lists: StructuredListRegistry::new(),
            expects: default_expects(),
        }
    }

    /// Disables marketplace injection.
    #[must_use]
    pub fn without_marketplace(mut self) -> Self {
        self.with_marketplace = false;
        self
    }

    /// Injects the marketplace under a specific parameter.
    #[must_use]
    pub fn marketplace_param(mut self, key: impl Into<String>) -> Self {
        self.marketplace_param = Some(key.into());
        self.with_marketplace = true;
        self
    }

    /// Excludes keys from structured-list expansion.
    #[must_use]
    pub fn skip_structured(mut self, keys: &[&str]) -> Self {
        self.skip_structured.extend(keys.iter().map(|k| (*k).to_owned()));
        self
    }

    /// Registers a structured list for this operation only.
    #[must_use]
    pub fn list(mut self, key: &str, segments: &[&str]) -> Self {
        self.structured_lists.register(key, StructuredList::new(segments.iter().copied()));
        self
    }
}

/// An MWS API section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiSection {
    /// Section name, e.g. `Orders`.
    pub name: String,

    /// HTTP path of the section, e.g. `/Orders/2013-09-01`.
    pub path: String,

    /// API version sent as the `Version` parameter.
    #[serde(default)]
    pub version: Option<String>,

    /// Default parameter that carries the primary marketplace.
    #[serde(default)]
    pub marketplace_param: Option<String>,

    /// Structured lists shared by the section's operations.
    #[serde(default)]
    pub structured_lists: StructuredListRegistry,

    /// Operations keyed by snake-case name.
    #[serde(default)]
    pub operations: IndexMap<String, OperationSpec>,
}

impl ApiSection {
    /// Creates an empty section.
    #[must_use]
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            version: None,
            marketplace_param: None,
            structured_lists: StructuredListRegistry::new(),
            operations: IndexMap::new(),
        }
    }

    /// Sets the API version.
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Sets the default marketplace parameter.
    #[must_use]
    pub fn marketplace_param(mut self, key: impl Into<String>) -> Self {
        self.marketplace_param = Some(key.into());
        self
    }

    /// Registers a structured list for every operation of the section.
    #[must_use]
    pub fn list(mut self, key: &str, segments: &[&str]) -> Self {
        self.structured_lists.register(key, StructuredList::new(segments.iter().copied()));
        self
    }

    /// Adds an operation.
    #[must_use]
    pub fn operation_spec(mut self, name: impl Into<String>, spec: OperationSpec) -> Self {
        self.operations.insert(name.into(), spec);
        self
    }

    /// Parses and validates a section from TOML.
    ///
    /// # Errors
    ///
    /// Returns [`MwsError::ConfigError`] if parsing or validation fails.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let section: Self = toml::from_str(toml_str)
            .map_err(|e| MwsError::ConfigError(format!("invalid section TOML: {e}")))?;
        section.validate()?;
        Ok(section)
    }

    /// Reads a section from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`MwsError::ConfigError`] if the file cannot be read or is invalid.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| MwsError::ConfigError(format!("cannot read section file: {e}")))?;
        Self::from_toml(&content)
    }

    /// Checks the path and every operation.
    ///
    /// # Errors
    ///
    /// Returns [`MwsError::ConfigError`] if the path is unsafe, an action is blank, or an
    /// operation expects a status outside 100-599.
    pub fn validate(&self) -> Result<()> {
        validate_api_path(&self.name, &self.path)?;
        for (name, spec) in &self.operations {
            if spec.action.trim().is_empty() {
                return Err(MwsError::ConfigError(format!(
                    "operation '{name}' in section '{}' has no action",
                    self.name
                )));
            }
            if !(100..600).contains(&spec.expects) {
                return Err(MwsError::ConfigError(format!(
                    "operation '{name}' expects invalid status {}",
                    spec.expects
                )));
            }
        }
        Ok(())
    }

    /// Looks up an operation by name.
    ///
    /// # Errors
    ///
    /// Returns [`MwsError::UnknownOperation`] if the section has no such operation.
    pub fn operation(&self, name: &str) -> Result<&OperationSpec> {
        self.operations
            .get(name)
            .ok_or_else(|| MwsError::UnknownOperation(format!("{}::{name}", self.name)))
    }

    /// Registry for an operation: library defaults, then section entries, then the
    /// operation's own entries.
    #[must_use]
    pub fn registry_for(&self, spec: &OperationSpec) -> StructuredListRegistry {
        StructuredListRegistry::with_defaults()
            .merged(&self.structured_lists)
            .merged(&spec.structured_lists)
    }

    /// Parameter key that receives the primary marketplace for an operation, if any.
    #[must_use]
    pub fn marketplace_key(&self, spec: &OperationSpec) -> Option<ParamKey> {
        if !spec.with_marketplace {
            return None;
        }
        spec.marketplace_param.as_deref().or(self.marketplace_param.as_deref()).map(param_key)
    }

    /// Built-in section by name, matched case-insensitively.
    #[must_use]
    pub fn builtin(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "orders" => Some(Self::orders()),
            "reports" => Some(Self::reports()),
            "feeds" => Some(Self::feeds()),
            "products" => Some(Self::products()),
            "sellers" => Some(Self::sellers()),
            _ => None,
        }
    }

    /// Orders API, version 2013-09-01.
    #[must_use]
    pub fn orders() -> Self {
        Self::new("Orders", "/Orders/2013-09-01")
            .version("2013-09-01")
            .marketplace_param("marketplace_id")
            .operation_spec("list_orders", OperationSpec::new("ListOrders"))
            .operation_spec(
                "list_orders_by_next_token",
                OperationSpec::new("ListOrdersByNextToken").without_marketplace(),
            )
            .operation_spec("get_order", OperationSpec::new("GetOrder").without_marketplace())
            .operation_spec(
                "list_order_items",
                OperationSpec::new("ListOrderItems")
                    .without_marketplace()
                    .skip_structured(&["amazon_order_id"]),
            )
            .operation_spec(
                "list_order_items_by_next_token",
                OperationSpec::new("ListOrderItemsByNextToken").without_marketplace(),
            )
            .operation_spec(
                "get_service_status",
                OperationSpec::new("GetServiceStatus").without_marketplace(),
            )
    }

    /// Reports API, version 2009-01-01.
    #[must_use]
    pub fn reports() -> Self {
        Self::new("Reports", "/")
            .version("2009-01-01")
            .operation_spec("request_report", OperationSpec::new("RequestReport"))
            .operation_spec("get_report_request_list", OperationSpec::new("GetReportRequestList"))
            .operation_spec(
                "get_report_request_list_by_next_token",
                OperationSpec::new("GetReportRequestListByNextToken"),
            )
            .operation_spec("get_report_request_count", OperationSpec::new("GetReportRequestCount"))
            .operation_spec("cancel_report_requests", OperationSpec::new("CancelReportRequests"))
            .operation_spec("get_report_list", OperationSpec::new("GetReportList"))
            .operation_spec(
                "get_report_list_by_next_token",
                OperationSpec::new("GetReportListByNextToken"),
            )
            .operation_spec("get_report_count", OperationSpec::new("GetReportCount"))
            .operation_spec("get_report", OperationSpec::new("GetReport"))
            .operation_spec("manage_report_schedule", OperationSpec::new("ManageReportSchedule"))
            .operation_spec("get_report_schedule_list", OperationSpec::new("GetReportScheduleList"))
            .operation_spec("update_report_acknowledgements", OperationSpec::new("UpdateReportAcknowledgements"))
    }

    /// Feeds API, version 2009-01-01.
    #[must_use]
    pub fn feeds() -> Self {
        Self::new("Feeds", "/")
            .version("2009-01-01")
            .operation_spec("submit_feed", OperationSpec::new("SubmitFeed"))
            .operation_spec(
                "get_feed_submission_list",
                OperationSpec::new("GetFeedSubmissionList"),
            )
            .operation_spec(
                "get_feed_submission_list_by_next_token",
                OperationSpec::new("GetFeedSubmissionListByNextToken"),
            )
            .operation_spec(
                "get_feed_submission_count",
                OperationSpec::new("GetFeedSubmissionCount"),
            )
            .operation_spec(
                "cancel_feed_submissions",
                OperationSpec::new("CancelFeedSubmissions"),
            )
            .operation_spec(
                "get_feed_submission_result",
                OperationSpec::new("GetFeedSubmissionResult"),
            )
    }

    /// Products API, version 2011-10-01.
    #[must_use]
    pub fn products() -> Self {
        let with_marketplace = [
            ("list_matching_products", "ListMatchingProducts"),
            ("get_matching_product", "GetMatchingProduct"),
            ("get_matching_product_for_id", "GetMatchingProductForId"),
            ("get_competitive_pricing_for_sku", "GetCompetitivePricingForSKU"),
            ("get_competitive_pricing_for_asin", "GetCompetitivePricingForASIN"),
            ("get_lowest_offer_listings_for_sku", "GetLowestOfferListingsForSKU"),
            ("get_lowest_offer_listings_for_asin", "GetLowestOfferListingsForASIN"),
            ("get_lowest_priced_offers_for_sku", "GetLowestPricedOffersForSKU"),
            ("get_lowest_priced_offers_for_asin", "GetLowestPricedOffersForASIN"),
            ("get_my_price_for_sku", "GetMyPriceForSKU"),
            ("get_my_price_for_asin", "GetMyPriceForASIN"),
            ("get_product_categories_for_sku", "GetProductCategoriesForSKU"),
            ("get_product_categories_for_asin", "GetProductCategoriesForASIN"),
        ];

        let section = Self::new("Products", "/Products/2011-10-01")
            .version("2011-10-01")
            .marketplace_param("MarketplaceId")
            .list("ASINList", &["ASINList", "ASIN"])
            .list("SellerSKUList", &["SellerSKUList", "SellerSKU"])
            .list("IdList", &["IdList", "Id"]);

        with_marketplace
            .into_iter()
            .fold(section, |section, (name, action)| section.operation_spec(name, OperationSpec::new(action)))
            .operation_spec(
                "get_my_fees_estimate",
                OperationSpec::new("GetMyFeesEstimate").without_marketplace(),
            )
            .operation_spec(
                "get_service_status",
                OperationSpec::new("GetServiceStatus").without_marketplace(),
            )
    }

    /// Sellers API, version 2011-07-01.
    #[must_use]
    pub fn sellers() -> Self {
        Self::new("Sellers", "/Sellers/2011-07-01")
            .version("2011-07-01")
            .operation_spec(
                "list_marketplace_participations",
                OperationSpec::new("ListMarketplaceParticipations"),
            )
            .operation_spec(
                "list_marketplace_participations_by_next_token",
                OperationSpec::new("ListMarketplaceParticipationsByNextToken"),
            )
            .operation_spec("get_service_status", OperationSpec::new("GetServiceStatus"))
    }
}

/// Keys starting with a lower-case letter are symbolic; anything else is a wire name.
fn param_key(text: &str) -> ParamKey {
    if text.chars().next().is_some_and(char::is_lowercase) {
        ParamKey::symbol(text)
    } else {
        ParamKey::name(text)
    }
}

/// Every spelling a caller may have used for a key: as given, camelized and snake-cased.
pub(crate) fn key_spellings(key: &ParamKey) -> [String; 3] {
    let text = key.as_str();
    [text.to_owned(), camelize(text), underscore(text)]
}

/// `MarketplaceId` becomes `marketplace_id`; acronyms stay one word (`SellerSKUList` becomes
/// `seller_sku_list`).
fn underscore(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_lower) {
                out.push('_');
            }
        }
        out.extend(c.to_lowercase());
    }
    out
}

/// Rejects paths that could escape the API root.
pub(crate) fn validate_api_path(context: &str, path: &str) -> Result<()> {
    if !path.starts_with('/') {
        return Err(MwsError::ConfigError(format!("'{context}' path must start with '/': {path}")));
    }
    if path.contains("..") {
        return Err(MwsError::ConfigError(format!(
            "'{context}' path contains traversal sequence '..': {path}"
        )));
    }
    if path.contains("//") {
        return Err(MwsError::ConfigError(format!(
            "'{context}' path contains double slash '//': {path}"
        )));
    }
    Ok(())
}

fn default_true() -> bool {
    true
}

fn default_expects() -> u16 {
    200
}
