use serde::Deserialize;
use wfs_replica_core::{ColumnDescriptor, SchemaDescriptor, TableIdentifier, UpstreamType};

use super::ParseError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescribeResponse {
    #[serde(default)]
    feature_types: Vec<FeatureTypeSchema>,
}

#[derive(Debug, Deserialize)]
struct FeatureTypeSchema {
    #[serde(default)]
    properties: Vec<PropertySchema>,
}

#[derive(Debug, Deserialize)]
struct PropertySchema {
    name: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default = "default_nillable")]
    nillable: bool,
}

const fn default_nillable() -> bool {
    true
}

/// Decode a JSON `DescribeFeatureType` response for `table`.
///
/// Properties typed `gml:*` name the geometry column and are excluded from
/// the column list.
pub fn parse_describe(table: &TableIdentifier, json: &str) -> Result<SchemaDescriptor, ParseError> {
    let response: DescribeResponse =
        serde_json::from_str(json).map_err(|source| ParseError::Json {
            document: "DescribeFeatureType",
            source,
        })?;
    let feature_type =
        response
            .feature_types
            .into_iter()
            .next()
            .ok_or_else(|| ParseError::Missing {
                document: "DescribeFeatureType",
                what: format!("a feature type for {table}"),
            })?;
    let mut geometry_column = None;
    let mut columns = Vec::with_capacity(feature_type.properties.len());
    for property in feature_type.properties {
        let name = property.name.to_ascii_uppercase();
        match UpstreamType::parse(&property.kind) {
            UpstreamType::Geometry(_) => {
                geometry_column.get_or_insert(name);
            }
            upstream_type => {
                let mut column = ColumnDescriptor::new(name, upstream_type);
                column.nullable = property.nillable;
                columns.push(column);
            }
        }
    }
    Ok(SchemaDescriptor {
        table: table.clone(),
        columns,
        geometry_column,
        comments: None,
    })
}
