//! Sort-key selection for paged reads.
//!
//! Paged requests need a stable ordering column. Candidates are tried in a
//! fixed order: a registered primary key, then a conventional identifier
//! column, then the lexicographically first property name.

use log::warn;

use crate::{PrimaryKeyRegistry, SchemaDescriptor, TableIdentifier};

/// Identifier columns commonly present on catalogue tables, in preference
/// order.
pub const CONVENTIONAL_IDENTIFIERS: [&str; 2] = ["OBJECTID", "SEQUENCE_ID"];

/// Inputs available to a strategy.
#[derive(Debug, Clone, Copy)]
pub struct SortKeyContext<'a> {
    /// Table being paged.
    pub table: &'a TableIdentifier,
    /// Its schema.
    pub schema: &'a SchemaDescriptor,
    /// Known primary keys.
    pub registry: &'a PrimaryKeyRegistry,
}

/// One way of picking a sort key.
pub trait SortKeyStrategy {
    /// Short name recorded alongside the selection.
    fn name(&self) -> &'static str;

    /// Upper-case column to sort by, or `None` to defer to the next strategy.
    fn select(&self, context: &SortKeyContext<'_>) -> Option<String>;
}

/// Uses the primary key registered for the table.
#[derive(Debug, Default, Clone, Copy)]
pub struct RegisteredPrimaryKey;

impl SortKeyStrategy for RegisteredPrimaryKey {
    fn name(&self) -> &'static str {
        "registered-primary-key"
    }

    fn select(&self, context: &SortKeyContext<'_>) -> Option<String> {
        context
            .registry
            .get(context.table)
            .map(str::to_ascii_uppercase)
    }
}

/// Uses the first of [`CONVENTIONAL_IDENTIFIERS`] present in the schema.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConventionalIdentifier;

impl SortKeyStrategy for ConventionalIdentifier {
    fn name(&self) -> &'static str {
        "conventional-identifier"
    }

    fn select(&self, context: &SortKeyContext<'_>) -> Option<String> {
        CONVENTIONAL_IDENTIFIERS
            .iter()
            .find(|candidate| context.schema.has_column(candidate))
            .map(|candidate| (*candidate).to_owned())
    }
}

/// Falls back to the lexicographically first non-geometry property. The
/// column may not be unique, so the choice is logged.
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstProperty;

impl SortKeyStrategy for FirstProperty {
    fn name(&self) -> &'static str {
        "first-property"
    }

    fn select(&self, context: &SortKeyContext<'_>) -> Option<String> {
        let column = context
            .schema
            .property_names()
            .map(str::to_ascii_uppercase)
            .min()?;
        warn!(
            "no primary key or identifier column for {}; ordering pages by {column}, which may not be unique",
            context.table
        );
        Some(column)
    }
}

/// The strategies used when no explicit key is supplied, in order.
#[must_use]
pub fn default_strategies() -> [&'static dyn SortKeyStrategy; 3] {
    [&RegisteredPrimaryKey, &ConventionalIdentifier, &FirstProperty]
}

/// Column chosen for ordering and the strategy that chose it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKeySelection {
    /// Upper-case column name.
    pub column: String,
    /// [`SortKeyStrategy::name`] of the deciding strategy.
    pub strategy: &'static str,
}

/// Run `strategies` in order and return the first answer.
///
/// # Examples
///
/// ```
/// use wfs_replica_core::{
///     ColumnDescriptor, PrimaryKeyRegistry, SchemaDescriptor, SortKeyContext, TableIdentifier,
///     UpstreamType, default_strategies, select_sort_key,
/// };
///
/// # fn main() -> Result<(), wfs_replica_core::ValidationError> {
/// let table = TableIdentifier::parse("WHSE_BASEMAPPING.UTMG_UTM_ZONES_SP")?;
/// let schema = SchemaDescriptor {
///     table: table.clone(),
///     columns: vec![
///         ColumnDescriptor::new("UTM_ZONE", UpstreamType::Number),
///         ColumnDescriptor::new("OBJECTID", UpstreamType::Number),
///     ],
///     geometry_column: Some("GEOMETRY".into()),
///     comments: None,
/// };
/// let registry = PrimaryKeyRegistry::new();
/// let context = SortKeyContext { table: &table, schema: &schema, registry: &registry };
/// let selection = select_sort_key(&context, &default_strategies()).expect("a key");
/// assert_eq!(selection.column, "OBJECTID");
/// # Ok(())
/// # }
/// ```
#[must_use]
pub fn select_sort_key(
    context: &SortKeyContext<'_>,
    strategies: &[&dyn SortKeyStrategy],
) -> Option<SortKeySelection> {
    strategies.iter().find_map(|strategy| {
        strategy.select(context).map(|column| SortKeySelection {
            column,
            strategy: strategy.name(),
        })
    })
}
