//! Structured-list encoding.
//!
//! MWS expresses repeated parameters as dotted, one-based positional keys:
//! `OrderStatus.Status.1=Pending&OrderStatus.Status.2=Shipped`. A [`StructuredList`] knows the
//! path segments of one such parameter; a [`StructuredListRegistry`] maps logical parameter
//! keys to their lists. Whether a key is expanded is decided by the registry alone, never by
//! the shape of its value.

use indexmap::IndexMap;
use serde::Deserialize;

use super::{FlatParams, ParamValue, camelize, render_scalar};
use crate::error::{MwsError, Result};

/// Path segments describing how one repeated parameter is numbered.
///
/// # Examples
///
/// ```
/// use mws_client::params::{ParamValue, StructuredList};
///
/// let list = StructuredList::new(["OrderStatus", "Status"]);
/// let flat = list.build(&ParamValue::from(vec!["Pending", "Shipped"]))?;
///
/// assert_eq!(flat["OrderStatus.Status.1"], "Pending");
/// assert_eq!(flat["OrderStatus.Status.2"], "Shipped");
/// # Ok::<(), mws_client::MwsError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct StructuredList {
    segments: Vec<String>,
}

impl StructuredList {
    /// Creates a list from one or more path segments.
    #[must_use]
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { segments: segments.into_iter().map(Into::into).collect() }
    }

    /// Path segments of the list.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Key prefix shared by every element, e.g. `QueryList.Query.1.FilterOptions.FilterOption`.
    #[must_use]
    pub fn prefix(&self) -> String {
        self.segments.join(".")
    }

    /// Expands a value into positional keys.
    ///
    /// A scalar counts as a one-element list. A list of lists is flattened one level, with
    /// one counter running across the inner lists, so numbering is always 1-based and
    /// contiguous. Map elements expand their entries below the element's position
    /// (`List.Member.1.Field`).
    ///
    /// # Errors
    ///
    /// Returns [`MwsError::InvalidParameter`] for lists nested deeper than one level or for
    /// lists inside map elements, and [`MwsError::ParameterConversion`] for unparseable time
    /// values.
    pub fn build(&self, value: &ParamValue) -> Result<FlatParams> {
        if self.segments.is_empty() {
            return Err(MwsError::InvalidParameter(
                "structured list needs at least one path segment".to_owned(),
            ));
        }

        let prefix = self.prefix();
        let mut flat = FlatParams::new();
        for (index, element) in flatten_one_level(value).into_iter().enumerate() {
            let key = format!("{prefix}.{}", index + 1);
            flatten_element(&mut flat, key, element)?;
        }

        Ok(flat)
    }
}

fn flatten_one_level(value: &ParamValue) -> Vec<&ParamValue> {
    match value {
        ParamValue::List(items) => items
            .iter()
            .flat_map(|item| match item {
                ParamValue::List(inner) => inner.iter().collect::<Vec<_>>(),
                other => vec![other],
            })
            .collect(),
        other => vec![other],
    }
}

fn flatten_element(flat: &mut FlatParams, key: String, value: &ParamValue) -> Result<()> {
    match value {
        ParamValue::Map(entries) => {
            for (child_key, child) in entries {
                let name = if child_key.is_symbol() {
                    camelize(child_key.as_str())
                } else {
                    child_key.as_str().to_owned()
                };
                flatten_element(flat, format!("{key}.{name}"), child)?;
            }
            Ok(())
        }
        ParamValue::List(_) => Err(MwsError::InvalidParameter(format!(
            "'{key}' holds a nested list with no structured-list registration"
        ))),
        scalar => {
            let rendered = render_scalar(&key, scalar)?;
            flat.insert(key, rendered);
            Ok(())
        }
    }
}

/// Registry of parameter keys that must be expanded as structured lists.
///
/// Keys are matched against parameter keys before key-name normalization, so symbolic keys
/// are registered in snake case (`order_status`). Literal names such as `ASINList` can be
/// registered as well.
///
/// The registry deserializes from a TOML table of key to segment array:
///
/// ```
/// use mws_client::params::StructuredListRegistry;
///
/// let registry: StructuredListRegistry = toml::from_str(r#"
///     "IdList" = ["IdList", "Id"]
///     query_list = ["QueryList", "Query", "1", "FilterOptions", "FilterOption"]
/// "#).unwrap();
///
/// assert!(registry.handles("IdList"));
/// assert_eq!(registry.get("query_list").unwrap().segments().len(), 5);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct StructuredListRegistry {
    lists: IndexMap<String, StructuredList>,
}

impl StructuredListRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry of the repeated parameters used across the MWS sections.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for (key, segments) in DEFAULT_LISTS {
            registry.register(*key, StructuredList::new(segments.iter().copied()));
        }
        registry
    }

    /// Registers (or replaces) the list for a key.
    pub fn register(&mut self, key: impl Into<String>, list: StructuredList) -> &mut Self {
        self.lists.insert(key.into(), list);
        self
    }

    /// Returns the list registered for a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&StructuredList> {
        self.lists.get(key)
    }

    /// Returns true if the key must be expanded.
    #[must_use]
    pub fn handles(&self, key: &str) -> bool {
        self.lists.contains_key(key)
    }

    /// Number of registered keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lists.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    /// Returns a registry holding this registry's entries overridden by `other`'s.
    #[must_use]
    pub fn merged(&self, other: &Self) -> Self {
        let mut lists = self.lists.clone();
        lists.extend(other.lists.iter().map(|(k, v)| (k.clone(), v.clone())));
        Self { lists }
    }
}

const DEFAULT_LISTS: &[(&str, &[&str])] = &[
    ("marketplace_id", &["MarketplaceId", "Id"]),
    ("marketplace_id_list", &["MarketplaceIdList", "Id"]),
    ("order_status", &["OrderStatus", "Status"]),
    ("fulfillment_channel", &["FulfillmentChannel", "Channel"]),
    ("payment_method", &["PaymentMethod", "Method"]),
    ("tfm_shipment_status", &["TFMShipmentStatus", "Status"]),
    ("amazon_order_id", &["AmazonOrderId", "Id"]),
    ("report_type_list", &["ReportTypeList", "Type"]),
    ("report_request_id_list", &["ReportRequestIdList", "Id"]),
    ("report_processing_status_list", &["ReportProcessingStatusList", "Status"]),
    ("report_id_list", &["ReportIdList", "Id"]),
    ("feed_submission_id_list", &["FeedSubmissionIdList", "Id"]),
    ("feed_type_list", &["FeedTypeList", "Type"]),
    ("feed_processing_status_list", &["FeedProcessingStatusList", "Status"]),
    ("asin_list", &["ASINList", "ASIN"]),
    ("seller_sku_list", &["SellerSKUList", "SellerSKU"]),
    ("id_list", &["IdList", "Id"]),
    ("fees_estimate_request_list", &["FeesEstimateRequestList", "FeesEstimateRequest"]),
];
