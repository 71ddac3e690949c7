//! Builders for schemas and features shared by unit and behaviour tests.

use crate::{
    Attributes, ColumnDescriptor, FeatureRecord, Geometry, SchemaDescriptor, TableIdentifier,
    UpstreamType, ValidationError, Value,
};

/// Canonical airports table used across tests.
pub const AIRPORTS: &str = "WHSE_IMAGERY_AND_BASE_MAPS.GSR_AIRPORTS_SVW";

/// Canonical UTM zones table used across tests.
pub const UTM_ZONES: &str = "WHSE_BASEMAPPING.UTMG_UTM_ZONES_SP";

/// Parse a table identifier known to be valid.
pub fn table(name: &str) -> Result<TableIdentifier, ValidationError> {
    TableIdentifier::parse(name)
}

/// Schema resembling the airports table: a registered key, a conventional
/// identifier, a redundant area column and a point geometry.
pub fn airports_schema() -> Result<SchemaDescriptor, ValidationError> {
    let mut name = ColumnDescriptor::new("AIRPORT_NAME", UpstreamType::Varchar);
    name.precision = Some(100);
    name.comments = Some("Name of the airport".to_owned());
    let mut seq = ColumnDescriptor::new("SEQ_ID", UpstreamType::Number);
    seq.nullable = false;
    Ok(SchemaDescriptor {
        table: table(AIRPORTS)?,
        columns: vec![
            seq,
            name,
            ColumnDescriptor::new("LOCALITY", UpstreamType::Varchar),
            ColumnDescriptor::new("OPEN_DATE", UpstreamType::Date),
            ColumnDescriptor::new("FEATURE_AREA_SQM", UpstreamType::Number),
            ColumnDescriptor::new("OBJECTID", UpstreamType::Number),
        ],
        geometry_column: Some("SHAPE".to_owned()),
        comments: Some("Airports in British Columbia".to_owned()),
    })
}

/// Point feature with a sequence number and a name.
#[must_use]
pub fn point_feature(seq: i64, x: f64, y: f64, name: &str) -> FeatureRecord {
    let attributes: Attributes = [
        ("SEQ_ID".to_owned(), Value::Integer(seq)),
        ("AIRPORT_NAME".to_owned(), Value::Text(name.to_owned())),
        ("OBJECTID".to_owned(), Value::Integer(seq)),
    ]
    .into_iter()
    .collect();
    FeatureRecord::new(
        Some(format!("{AIRPORTS}.{seq}")),
        Some(Geometry::Point(vec![x, y])),
        attributes,
    )
}
