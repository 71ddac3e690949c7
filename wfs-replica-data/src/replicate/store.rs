use chrono::{DateTime, Utc};
use wfs_replica_core::{Geometry, GeometryType, RelationName, Value};

use super::{DestinationError, NormalisedPage};

/// Name of the geometry column in every replicated relation.
pub const GEOMETRY_COLUMN: &str = "geom";

/// One non-geometry column of a destination relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationColumn {
    /// Lower-case column name.
    pub name: String,
    /// SQL type, e.g. `NUMERIC` or `VARCHAR(100)`.
    pub sql_type: String,
    /// Column description, if the store keeps one.
    pub comments: Option<String>,
}

impl DestinationColumn {
    /// Whether values should be stored as calendar dates.
    #[must_use]
    pub fn is_date(&self) -> bool {
        self.sql_type.eq_ignore_ascii_case("DATE")
    }
}

/// Geometry column of a relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryColumn {
    /// The relation has no geometry column.
    Absent,
    /// A geometry column accepting any kind.
    Untyped,
    /// A geometry column restricted to one multipart type.
    Typed(GeometryType),
}

/// Everything needed to create a relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationDefinition {
    /// Target relation.
    pub relation: RelationName,
    /// Non-geometry columns in order.
    pub columns: Vec<DestinationColumn>,
    /// Geometry column, named [`GEOMETRY_COLUMN`].
    pub geometry: GeometryColumn,
    /// Spatial reference of stored geometries.
    pub srs: String,
    /// Lower-case primary key column.
    pub primary_key: Option<String>,
    /// Relation description.
    pub comments: Option<String>,
}

/// Row destined for a relation with a geometry column.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialRow {
    /// Values in column order.
    pub values: Vec<Value>,
    /// Multipart geometry.
    pub geometry: Geometry,
}

/// Minimal DDL and DML surface the replication pipeline needs.
///
/// Relations are addressed by their full `schema.table` name.
pub trait DestinationStore {
    /// Make sure `schema` exists.
    fn ensure_schema(&mut self, schema: &str) -> Result<(), DestinationError>;

    /// Whether `relation` exists.
    fn relation_exists(&self, relation: &RelationName) -> Result<bool, DestinationError>;

    /// Drop `relation` if it exists.
    fn drop_relation(&mut self, relation: &RelationName) -> Result<(), DestinationError>;

    /// Create a relation; it must not already exist.
    fn create_relation(&mut self, definition: &RelationDefinition) -> Result<(), DestinationError>;

    /// Non-geometry columns of an existing relation, in order.
    fn columns(&self, relation: &RelationName) -> Result<Vec<DestinationColumn>, DestinationError>;

    /// Geometry column of an existing relation.
    fn geometry_column(&self, relation: &RelationName) -> Result<GeometryColumn, DestinationError>;

    /// Insert every row of `page` atomically. Returns the number inserted.
    ///
    /// On error none of the page's rows remain in `relation`.
    fn append_page(
        &mut self,
        relation: &RelationName,
        columns: &[String],
        page: &NormalisedPage,
    ) -> Result<usize, DestinationError>;

    /// Upsert the completion time of a load into the bookkeeping relation.
    fn record_completion(
        &mut self,
        relation: &RelationName,
        completed_at: DateTime<Utc>,
    ) -> Result<(), DestinationError>;
}
