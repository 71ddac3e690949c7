//! Parsed service capabilities.

use std::collections::BTreeSet;
use std::num::NonZeroU64;

use serde::{Deserialize, Serialize};

use crate::TableIdentifier;

/// The subset of a capabilities response the client relies on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitiesDocument {
    /// Tables published by the service, namespace prefixes stripped.
    pub tables: BTreeSet<TableIdentifier>,
    /// Service default for the number of features per response.
    pub page_size: NonZeroU64,
}

impl CapabilitiesDocument {
    /// Whether the service publishes `table`.
    #[must_use]
    pub fn contains(&self, table: &TableIdentifier) -> bool {
        self.tables.contains(table)
    }
}
