//! Feature records and attribute values.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::Geometry;

/// Attribute value carried by a feature.
///
/// JSON booleans become integers and nested arrays or objects are kept as
/// their JSON text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Missing or JSON `null`.
    Null,
    /// Whole number.
    Integer(i64),
    /// Any other number.
    Float(f64),
    /// Text.
    Text(String),
    /// Calendar date.
    Date(NaiveDate),
}

impl Value {
    /// Whether this value is [`Value::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Convert a decoded JSON value.
    #[must_use]
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(flag) => Self::Integer(i64::from(flag)),
            serde_json::Value::Number(number) => number
                .as_i64()
                .map(Self::Integer)
                .or_else(|| number.as_f64().map(Self::Float))
                .unwrap_or_else(|| Self::Text(number.to_string())),
            serde_json::Value::String(text) => Self::Text(text),
            nested @ (serde_json::Value::Array(_) | serde_json::Value::Object(_)) => {
                Self::Text(nested.to_string())
            }
        }
    }

    /// Reinterpret text holding an ISO date (optionally with a time or `Z`
    /// suffix) as a [`Value::Date`]. Anything else is returned unchanged.
    #[must_use]
    pub fn into_date(self) -> Self {
        match self {
            Self::Text(text) => parse_date(&text).map_or(Self::Text(text), Self::Date),
            other => other,
        }
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let head = raw.trim().get(..10)?;
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        Self::from_json(value)
    }
}

/// Ordered attribute list of a feature.
///
/// Names are unique; order follows the service response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attributes(Vec<(String, Value)>);

impl Attributes {
    /// Create an empty attribute list.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Insert or replace an attribute.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        if let Some(slot) = self.0.iter_mut().find(|(existing, _)| *existing == name) {
            slot.1 = value;
        } else {
            self.0.push((name, value));
        }
    }

    /// Look up an attribute by exact name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Look up an attribute ignoring ASCII case.
    #[must_use]
    pub fn get_ignore_case(&self, name: &str) -> Option<&Value> {
        self.0
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    /// Attribute names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(n, _)| n.as_str())
    }

    /// Name and value pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no attributes are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Lower-case every attribute name.
    #[must_use]
    pub fn into_lowercase(self) -> Self {
        self.0
            .into_iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), value))
            .collect()
    }

    /// Values for `columns` in that order; absent columns yield
    /// [`Value::Null`]. Matching ignores ASCII case.
    #[must_use]
    pub fn project(&self, columns: &[String]) -> Vec<Value> {
        columns
            .iter()
            .map(|column| self.get_ignore_case(column).cloned().unwrap_or(Value::Null))
            .collect()
    }
}

impl FromIterator<(String, Value)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut attributes = Self::new();
        for (name, value) in iter {
            attributes.insert(name, value);
        }
        attributes
    }
}

/// A single feature: optional identifier, optional geometry and attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    /// Service-assigned feature identifier.
    pub id: Option<String>,
    /// Geometry, absent for features without one.
    pub geometry: Option<Geometry>,
    /// Ordered attributes.
    pub attributes: Attributes,
}

impl FeatureRecord {
    /// Build a record from its parts.
    #[must_use]
    pub const fn new(id: Option<String>, geometry: Option<Geometry>, attributes: Attributes) -> Self {
        Self {
            id,
            geometry,
            attributes,
        }
    }

    /// Lower-case every attribute name in place.
    pub fn lowercase_attributes(&mut self) {
        self.attributes = std::mem::take(&mut self.attributes).into_lowercase();
    }
}

/// Features returned by a materialised read, with the CRS they are in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    /// Features in request order.
    pub features: Vec<FeatureRecord>,
    /// OGC CRS URN, absent for EPSG:4326.
    pub crs: Option<String>,
}

impl FeatureCollection {
    /// Build a collection annotated for the requested SRS.
    #[must_use]
    pub fn new(features: Vec<FeatureRecord>, srs: &str) -> Self {
        Self {
            features,
            crs: crs_name_for(srs),
        }
    }

    /// Number of features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether the collection is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// CRS URN recorded on collections requested in a non-default SRS.
///
/// # Examples
///
/// ```
/// use wfs_replica_core::crs_name_for;
///
/// assert_eq!(crs_name_for("EPSG:4326"), None);
/// assert_eq!(
///     crs_name_for("epsg:3005").as_deref(),
///     Some("urn:ogc:def:crs:EPSG::3005"),
/// );
/// ```
#[must_use]
pub fn crs_name_for(srs: &str) -> Option<String> {
    let trimmed = srs.trim();
    if trimmed.eq_ignore_ascii_case("EPSG:4326") {
        return None;
    }
    let code = trimmed
        .split_once(':')
        .map_or(trimmed, |(_, code)| code);
    Some(format!("urn:ogc:def:crs:EPSG::{code}"))
}
