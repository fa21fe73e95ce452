//! Parameter model and marshaling pipeline.
//!
//! Callers describe an operation's parameters as a [`Parameters`] map whose keys are either
//! symbolic (`order_status`) or literal wire names (`OrderStatus.Status.1`) and whose values
//! may be scalars, points in time, lists or nested maps. Before transmission the map is
//! reduced to [`FlatParams`] in a fixed order:
//!
//! 1. [`Parameters::normalize_timestamps`] renders time values as ISO-8601 text
//! 2. [`Parameters::expand_structured_lists`] replaces registered keys with positional keys
//! 3. [`Parameters::camelize_keys`] turns symbolic keys into wire names
//! 4. [`Parameters::into_flat`] flattens nested maps and stringifies every value
//!
//! Structured-list expansion must run before camelization: the registry is keyed by the
//! caller's original key names.
//!
//! # Examples
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use mws_client::params::{ParamKey, Parameters, StructuredListRegistry};
//!
//! let registry = StructuredListRegistry::with_defaults();
//! let flat = Parameters::new()
//!     .with(ParamKey::symbol("created_after"), Utc.with_ymd_and_hms(2015, 1, 1, 0, 0, 0).unwrap())
//!     .with(ParamKey::symbol("order_status"), vec!["Pending", "Shipped"])
//!     .finalize(&registry, &[])?;
//!
//! assert_eq!(flat["CreatedAfter"], "2015-01-01T00:00:00Z");
//! assert_eq!(flat["OrderStatus.Status.1"], "Pending");
//! assert_eq!(flat["OrderStatus.Status.2"], "Shipped");
//! # Ok::<(), mws_client::MwsError>(())
//! ```

mod structured_list;

#[cfg(test)]
#[path = "tests/proptest_pipeline.rs"]
mod proptest_pipeline;

use std::fmt;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use indexmap::IndexMap;
use tracing::trace;

pub use structured_list::{StructuredList, StructuredListRegistry};

use crate::error::{MwsError, Result};

/// Finalized wire parameters: flat string keys to string values, in insertion order.
pub type FlatParams = IndexMap<String, String>;

/// Ordered map of parameter keys to values.
pub type ParameterMap = IndexMap<ParamKey, ParamValue>;

/// A parameter key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamKey {
    /// Underscore-delimited lower-case key, camelized before transmission.
    Symbol(String),
    /// Literal wire name, transmitted unchanged.
    Name(String),
}

impl ParamKey {
    /// Creates a symbolic key.
    #[must_use]
    pub fn symbol(key: impl Into<String>) -> Self {
        Self::Symbol(key.into())
    }

    /// Creates a literal wire-name key.
    #[must_use]
    pub fn name(key: impl Into<String>) -> Self {
        Self::Name(key.into())
    }

    /// The key text as supplied.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Symbol(s) | Self::Name(s) => s,
        }
    }

    /// Returns true for symbolic keys.
    #[must_use]
    pub fn is_symbol(&self) -> bool {
        matches!(self, Self::Symbol(_))
    }

    /// Converts the key to its wire name.
    #[must_use]
    pub fn into_wire_name(self) -> String {
        match self {
            Self::Symbol(s) => camelize(&s),
            Self::Name(s) => s,
        }
    }
}

impl fmt::Display for ParamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for ParamKey {
    fn from(key: &str) -> Self {
        Self::Name(key.to_owned())
    }
}

impl From<String> for ParamKey {
    fn from(key: String) -> Self {
        Self::Name(key)
    }
}

/// A parameter value before marshaling.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// Plain text.
    Text(String),
    /// Integer, rendered in decimal.
    Integer(i64),
    /// Floating point number.
    Float(f64),
    /// Boolean, rendered as `true` or `false`.
    Bool(bool),
    /// Point in time.
    Time(DateTime<Utc>),
    /// Text claiming to be a point in time: RFC 3339 or `YYYY-MM-DD`.
    TimeText(String),
    /// Repeated value. Only valid under structured-list keys.
    List(Vec<ParamValue>),
    /// Nested group, flattened to `Parent.Child` keys.
    Map(ParameterMap),
}

impl ParamValue {
    /// Creates a value that must be converted to a timestamp before transmission.
    #[must_use]
    pub fn time_text(text: impl Into<String>) -> Self {
        Self::TimeText(text.into())
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<DateTime<Utc>> for ParamValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Time(value)
    }
}

impl<T: Into<ParamValue>> From<Vec<T>> for ParamValue {
    fn from(values: Vec<T>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

impl From<ParameterMap> for ParamValue {
    fn from(map: ParameterMap) -> Self {
        Self::Map(map)
    }
}

/// Converts an underscore-delimited key into capitalized-word form.
///
/// Each word keeps only its first letter upper-cased: `order_status` becomes `OrderStatus`,
/// `asin_list` becomes `AsinList`.
#[must_use]
pub fn camelize(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for word in key.split('_') {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.extend(chars.flat_map(char::to_lowercase));
        }
    }
    out
}

/// Renders a point in time the way MWS expects it.
#[must_use]
pub fn format_timestamp(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_time_text(key: &str, text: &str) -> Result<DateTime<Utc>> {
    let trimmed = text.trim();
    match DateTime::parse_from_rfc3339(trimmed) {
        Ok(time) => Ok(time.with_timezone(&Utc)),
        Err(rfc_err) => NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
            .ok_or_else(|| MwsError::ParameterConversion {
                key: key.to_owned(),
                message: rfc_err.to_string(),
            }),
    }
}

pub(crate) fn render_scalar(key: &str, value: &ParamValue) -> Result<String> {
    match value {
        ParamValue::Text(s) => Ok(s.clone()),
        ParamValue::Integer(i) => Ok(i.to_string()),
        ParamValue::Float(f) => Ok(f.to_string()),
        ParamValue::Bool(b) => Ok(b.to_string()),
        ParamValue::Time(t) => Ok(format_timestamp(t)),
        ParamValue::TimeText(s) => parse_time_text(key, s).map(|t| format_timestamp(&t)),
        ParamValue::List(_) => Err(MwsError::InvalidParameter(format!(
            "'{key}' holds a list but has no structured-list registration"
        ))),
        ParamValue::Map(_) => Err(MwsError::InvalidParameter(format!(
            "'{key}' holds a nested map where a scalar is required"
        ))),
    }
}

fn normalize_value(key: &str, value: ParamValue) -> Result<ParamValue> {
    match value {
        ParamValue::Time(t) => Ok(ParamValue::Text(format_timestamp(&t))),
        ParamValue::TimeText(s) => {
            parse_time_text(key, &s).map(|t| ParamValue::Text(format_timestamp(&t)))
        }
        ParamValue::List(items) => items
            .into_iter()
            .map(|item| normalize_value(key, item))
            .collect::<Result<Vec<_>>>()
            .map(ParamValue::List),
        ParamValue::Map(entries) => entries
            .into_iter()
            .map(|(k, v)| {
                let normalized = normalize_value(k.as_str(), v)?;
                Ok((k, normalized))
            })
            .collect::<Result<ParameterMap>>()
            .map(ParamValue::Map),
        other => Ok(other),
    }
}

fn camelize_value(value: ParamValue) -> ParamValue {
    match value {
        ParamValue::Map(entries) => ParamValue::Map(
            entries
                .into_iter()
                .map(|(k, v)| (ParamKey::Name(k.into_wire_name()), camelize_value(v)))
                .collect(),
        ),
        ParamValue::List(items) => ParamValue::List(items.into_iter().map(camelize_value).collect()),
        other => other,
    }
}

fn flatten_into(flat: &mut FlatParams, key: String, value: &ParamValue) -> Result<()> {
    if let ParamValue::Map(entries) = value {
        for (child_key, child) in entries {
            flatten_into(flat, format!("{key}.{}", child_key.as_str()), child)?;
        }
        return Ok(());
    }
    let rendered = render_scalar(&key, value)?;
    flat.insert(key, rendered);
    Ok(())
}

/// An operation's parameters on their way to the wire.
///
/// Each pipeline stage consumes the map and returns the transformed map, so a map can be
/// inspected between stages. [`Parameters::finalize`] runs all of them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameters {
    entries: ParameterMap,
}

impl Parameters {
    /// Creates an empty parameter map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps already-finalized wire parameters.
    #[must_use]
    pub fn from_flat(flat: FlatParams) -> Self {
        Self {
            entries: flat.into_iter().map(|(k, v)| (ParamKey::Name(k), ParamValue::Text(v))).collect(),
        }
    }

    /// Inserts a value, replacing any previous value under the same key.
    pub fn insert(&mut self, key: impl Into<ParamKey>, value: impl Into<ParamValue>) -> &mut Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    /// Builder form of [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, key: impl Into<ParamKey>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Returns the value stored under a key.
    #[must_use]
    pub fn get(&self, key: &ParamKey) -> Option<&ParamValue> {
        self.entries.get(key)
    }

    /// Returns true if any key, symbolic or literal, has the given text.
    #[must_use]
    pub fn contains_text_key(&self, key: &str) -> bool {
        self.entries.keys().any(|k| k.as_str() == key)
    }

    /// Number of top-level entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&ParamKey, &ParamValue)> {
        self.entries.iter()
    }

    /// Renders every point-in-time value, at any depth, as ISO-8601 text.
    ///
    /// # Errors
    ///
    /// Returns [`MwsError::ParameterConversion`] when a [`ParamValue::TimeText`] cannot be
    /// parsed. Nothing is coerced silently.
    pub fn normalize_timestamps(self) -> Result<Self> {
        let entries = self
            .entries
            .into_iter()
            .map(|(k, v)| {
                let normalized = normalize_value(k.as_str(), v)?;
                Ok((k, normalized))
            })
            .collect::<Result<ParameterMap>>()?;
        Ok(Self { entries })
    }

    /// Replaces every key registered in `registry` with its positional keys.
    ///
    /// # Errors
    ///
    /// Propagates [`StructuredList::build`] failures.
    pub fn expand_structured_lists(self, registry: &StructuredListRegistry) -> Result<Self> {
        self.expand_structured_lists_except(registry, &[])
    }

    /// Like [`expand_structured_lists`](Self::expand_structured_lists), leaving the keys in
    /// `skip` untouched.
    ///
    /// # Errors
    ///
    /// Propagates [`StructuredList::build`] failures.
    pub fn expand_structured_lists_except(
        self,
        registry: &StructuredListRegistry,
        skip: &[&str],
    ) -> Result<Self> {
        let mut entries = ParameterMap::with_capacity(self.entries.len());
        for (key, value) in self.entries {
            let list = registry.get(key.as_str()).filter(|_| !skip.contains(&key.as_str()));
            match list {
                Some(list) => {
                    trace!(key = %key, prefix = %list.prefix(), "expanding structured list");
                    for (name, text) in list.build(&value)? {
                        entries.insert(ParamKey::Name(name), ParamValue::Text(text));
                    }
                }
                None => {
                    entries.insert(key, value);
                }
            }
        }
        Ok(Self { entries })
    }

    /// Converts every symbolic key, including keys inside nested maps, to its wire name.
    ///
    /// Literal keys pass through unchanged.
    #[must_use]
    pub fn camelize_keys(self) -> Self {
        let entries = self
            .entries
            .into_iter()
            .map(|(k, v)| (ParamKey::Name(k.into_wire_name()), camelize_value(v)))
            .collect();
        Self { entries }
    }

    /// Flattens nested maps to `Parent.Child` keys and stringifies every value.
    ///
    /// # Errors
    ///
    /// Returns [`MwsError::InvalidParameter`] for list values left over after structured-list
    /// expansion, and [`MwsError::ParameterConversion`] for unconverted time text.
    pub fn into_flat(self) -> Result<FlatParams> {
        let mut flat = FlatParams::with_capacity(self.entries.len());
        for (key, value) in self.entries {
            flatten_into(&mut flat, key.into_wire_name(), &value)?;
        }
        Ok(flat)
    }

    /// Runs the whole pipeline.
    ///
    /// # Errors
    ///
    /// Returns the first failure of any stage.
    pub fn finalize(self, registry: &StructuredListRegistry, skip: &[&str]) -> Result<FlatParams> {
        self.normalize_timestamps()?
            .expand_structured_lists_except(registry, skip)?
            .camelize_keys()
            .into_flat()
    }
}

impl<K: Into<ParamKey>, V: Into<ParamValue>> FromIterator<(K, V)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self { entries: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect() }
    }
}

impl<K: Into<ParamKey>, V: Into<ParamValue>> Extend<(K, V)> for Parameters {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.entries.extend(iter.into_iter().map(|(k, v)| (k.into(), v.into())));
    }
}
