//! Table schema descriptors and upstream type mapping.

use serde::{Deserialize, Serialize};

use crate::TableIdentifier;

/// Upstream columns dropped during replication because the destination can
/// derive them from the geometry.
pub const REDUNDANT_COLUMNS: [&str; 2] = ["FEATURE_AREA_SQM", "FEATURE_LENGTH_M"];

/// Column type as reported by the service.
///
/// Both XML schema names (`xsd:decimal`) and database names (`VARCHAR2`) are
/// recognised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpstreamType {
    /// Any numeric type.
    Number,
    /// Character data.
    Varchar,
    /// Date or timestamp.
    Date,
    /// Geometry property, with the raw type name.
    Geometry(String),
    /// Anything else, kept verbatim.
    Other(String),
}

impl UpstreamType {
    /// Classify a raw type name.
    ///
    /// # Examples
    ///
    /// ```
    /// use wfs_replica_core::UpstreamType;
    ///
    /// assert_eq!(UpstreamType::parse("xsd:decimal"), UpstreamType::Number);
    /// assert_eq!(UpstreamType::parse("VARCHAR2"), UpstreamType::Varchar);
    /// assert!(matches!(UpstreamType::parse("gml:PointPropertyType"), UpstreamType::Geometry(_)));
    /// ```
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let (prefix, local) = trimmed.split_once(':').unwrap_or(("", trimmed));
        if prefix.eq_ignore_ascii_case("gml") {
            return Self::Geometry(trimmed.to_owned());
        }
        match local.to_ascii_lowercase().as_str() {
            "number" | "decimal" | "double" | "float" | "int" | "integer" | "long" | "short" => {
                Self::Number
            }
            "varchar2" | "varchar" | "string" | "char" => Self::Varchar,
            "date" | "datetime" | "timestamp" => Self::Date,
            _ => Self::Other(trimmed.to_owned()),
        }
    }

    /// Whether columns of this type are replicated.
    #[must_use]
    pub const fn is_supported(&self) -> bool {
        matches!(self, Self::Number | Self::Varchar | Self::Date)
    }

    /// Destination column type, `None` for unsupported types.
    #[must_use]
    pub fn destination_type(&self, precision: Option<u32>) -> Option<String> {
        match (self, precision) {
            (Self::Number, _) => Some("NUMERIC".to_owned()),
            (Self::Varchar, Some(length)) => Some(format!("VARCHAR({length})")),
            (Self::Varchar, None) => Some("VARCHAR".to_owned()),
            (Self::Date, _) => Some("DATE".to_owned()),
            (Self::Geometry(_) | Self::Other(_), _) => None,
        }
    }
}

/// One column of an upstream table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Upper-case column name.
    pub name: String,
    /// Upstream type.
    pub upstream_type: UpstreamType,
    /// Character length for text columns.
    pub precision: Option<u32>,
    /// Whether the column may be null.
    pub nullable: bool,
    /// Free-text description.
    pub comments: Option<String>,
}

impl ColumnDescriptor {
    /// Describe a nullable column without precision or comments.
    #[must_use]
    pub fn new(name: impl Into<String>, upstream_type: UpstreamType) -> Self {
        Self {
            name: name.into(),
            upstream_type,
            precision: None,
            nullable: true,
            comments: None,
        }
    }

    /// Whether the column is one of [`REDUNDANT_COLUMNS`].
    #[must_use]
    pub fn is_redundant(&self) -> bool {
        REDUNDANT_COLUMNS
            .iter()
            .any(|redundant| self.name.eq_ignore_ascii_case(redundant))
    }

    /// Whether the column survives into a replicated relation.
    #[must_use]
    pub fn is_retained(&self) -> bool {
        self.upstream_type.is_supported() && !self.is_redundant()
    }

    /// Destination type for this column.
    #[must_use]
    pub fn destination_type(&self) -> Option<String> {
        self.upstream_type.destination_type(self.precision)
    }
}

/// Schema of an upstream table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDescriptor {
    /// Table described.
    pub table: TableIdentifier,
    /// Non-geometry columns in service order.
    pub columns: Vec<ColumnDescriptor>,
    /// Name of the geometry column, if the table has one.
    pub geometry_column: Option<String>,
    /// Table description.
    pub comments: Option<String>,
}

impl SchemaDescriptor {
    /// Non-geometry column names in service order.
    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Look up a column ignoring ASCII case.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Whether a non-geometry column called `name` exists.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Columns kept by replication, in service order.
    pub fn retained_columns(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.iter().filter(|c| c.is_retained())
    }
}
