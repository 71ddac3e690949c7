//! Canonical table identifiers and destination relation names.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Canonical `SCHEMA.TABLE` identifier of a catalogue table.
///
/// Both halves are stored upper-case, which is the form the service expects
/// on the wire.
///
/// # Examples
///
/// ```
/// use wfs_replica_core::TableIdentifier;
///
/// # fn main() -> Result<(), wfs_replica_core::ValidationError> {
/// let table = TableIdentifier::parse("whse_imagery_and_base_maps.gsr_airports_svw")?;
/// assert_eq!(table.wire_name(), "WHSE_IMAGERY_AND_BASE_MAPS.GSR_AIRPORTS_SVW");
/// assert_eq!(table.schema(), "WHSE_IMAGERY_AND_BASE_MAPS");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TableIdentifier {
    schema: String,
    table: String,
}

impl TableIdentifier {
    /// Parse a `schema.table` pair, normalising case and surrounding space.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let malformed = || ValidationError::MalformedTable {
            input: input.to_owned(),
        };
        let (schema, table) = input.trim().split_once('.').ok_or_else(malformed)?;
        let valid = |part: &str| !part.is_empty() && !part.contains(['.', ' ', '\'', '"']);
        if !valid(schema) || !valid(table) {
            return Err(malformed());
        }
        Ok(Self {
            schema: schema.to_ascii_uppercase(),
            table: table.to_ascii_uppercase(),
        })
    }

    /// Upper-case schema half.
    #[must_use]
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Upper-case table half.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// `SCHEMA.TABLE` as sent in `typeName` parameters.
    #[must_use]
    pub fn wire_name(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }

    /// Default destination relation for this table.
    #[must_use]
    pub fn relation_name(&self) -> RelationName {
        RelationName::new(&self.schema, &self.table)
    }
}

impl fmt::Display for TableIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

impl FromStr for TableIdentifier {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TableIdentifier {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TableIdentifier> for String {
    fn from(value: TableIdentifier) -> Self {
        value.wire_name()
    }
}

/// Lower-case `schema.table` name of a destination relation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelationName {
    schema: String,
    table: String,
}

impl RelationName {
    /// Build a relation name; both halves are lower-cased.
    #[must_use]
    pub fn new(schema: &str, table: &str) -> Self {
        Self {
            schema: schema.trim().to_ascii_lowercase(),
            table: table.trim().to_ascii_lowercase(),
        }
    }

    /// Lower-case schema half.
    #[must_use]
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Lower-case table half.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Replace the schema half.
    #[must_use]
    pub fn with_schema(self, schema: &str) -> Self {
        Self::new(schema, &self.table)
    }

    /// Replace the table half.
    #[must_use]
    pub fn with_table(self, table: &str) -> Self {
        Self::new(&self.schema, table)
    }
}

impl fmt::Display for RelationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}
