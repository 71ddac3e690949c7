use serde::Deserialize;
use wfs_replica_core::{Attributes, FeatureRecord, Geometry, Value};

use super::ParseError;

#[derive(Debug, Deserialize)]
struct WirePage {
    #[serde(default)]
    features: Vec<WireFeature>,
}

#[derive(Debug, Deserialize)]
struct WireFeature {
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(default)]
    geometry: Option<Geometry>,
    #[serde(default)]
    properties: Option<serde_json::Map<String, serde_json::Value>>,
}

impl From<WireFeature> for FeatureRecord {
    fn from(feature: WireFeature) -> Self {
        let id = feature.id.and_then(|id| match id {
            serde_json::Value::String(text) => Some(text),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        });
        let attributes: Attributes = feature
            .properties
            .unwrap_or_default()
            .into_iter()
            .map(|(name, value)| (name, Value::from(value)))
            .collect();
        Self::new(id, feature.geometry, attributes)
    }
}

/// Decode one GeoJSON feature page.
///
/// The buffer is parsed in place and left in an unspecified state.
/// Attribute order follows the document.
pub fn parse_feature_page(body: &mut [u8]) -> Result<Vec<FeatureRecord>, ParseError> {
    let page: WirePage =
        simd_json::serde::from_slice(body).map_err(|source| ParseError::FeaturePage { source })?;
    Ok(page.features.into_iter().map(FeatureRecord::from).collect())
}
