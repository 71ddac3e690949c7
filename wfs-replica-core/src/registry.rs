//! Registry of known primary keys.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::TableIdentifier;

/// Primary-key column per table, keyed by lower-case `schema.table`.
///
/// The registry is published as a flat JSON object:
///
/// ```
/// use wfs_replica_core::{PrimaryKeyRegistry, TableIdentifier};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let registry = PrimaryKeyRegistry::from_json(
///     r#"{"WHSE_IMAGERY_AND_BASE_MAPS.GSR_AIRPORTS_SVW": "CUSTODIAN_ORG_DESCRIPTION"}"#,
/// )?;
/// let table = TableIdentifier::parse("whse_imagery_and_base_maps.gsr_airports_svw")?;
/// assert_eq!(registry.get(&table), Some("custodian_org_description"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrimaryKeyRegistry {
    keys: BTreeMap<String, String>,
}

impl PrimaryKeyRegistry {
    /// Create an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            keys: BTreeMap::new(),
        }
    }

    /// Decode a registry, normalising keys and values to lower case.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let raw: BTreeMap<String, String> = serde_json::from_str(json)?;
        Ok(raw
            .into_iter()
            .map(|(table, column)| (table.to_ascii_lowercase(), column.to_ascii_lowercase()))
            .collect())
    }

    /// Register `column` as the primary key of `table`.
    pub fn insert(&mut self, table: &TableIdentifier, column: &str) {
        self.keys.insert(
            table.wire_name().to_ascii_lowercase(),
            column.to_ascii_lowercase(),
        );
    }

    /// Lower-case primary key registered for `table`.
    #[must_use]
    pub fn get(&self, table: &TableIdentifier) -> Option<&str> {
        self.keys
            .get(&table.wire_name().to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Number of registered tables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl FromIterator<(String, String)> for PrimaryKeyRegistry {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            keys: iter.into_iter().collect(),
        }
    }
}
