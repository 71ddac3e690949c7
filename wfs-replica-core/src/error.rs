//! Validation errors shared by every layer.

use thiserror::Error;

use crate::GeometryType;

/// Errors raised when caller input or service metadata cannot be used.
///
/// These are never retried: re-issuing the same request would fail the same
/// way.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ValidationError {
    /// The input was not a `SCHEMA.TABLE` pair.
    #[error("{input:?} is not a SCHEMA.TABLE identifier")]
    MalformedTable {
        /// Raw text supplied by the caller.
        input: String,
    },
    /// The geometry type name is unknown or outside the supported set.
    #[error("geometry type {raw:?} is not supported")]
    UnsupportedGeometryType {
        /// Raw geometry type name.
        raw: String,
    },
    /// Sampled features disagree with the declared geometry type.
    #[error("sampled geometry type {found} does not match the declared {expected}")]
    GeometryMismatch {
        /// Type requested by the caller.
        expected: GeometryType,
        /// Type found in the sampled features.
        found: GeometryType,
    },
    /// No geometry type was supplied and none could be sampled.
    #[error("geometry type could not be determined for {table}")]
    UndeterminedGeometryType {
        /// Table being replicated.
        table: String,
    },
    /// The sort key is not one of the retained columns.
    #[error("sort key {column:?} is not a column of {relation}")]
    UnknownSortKey {
        /// Requested sort key.
        column: String,
        /// Relation the key was checked against.
        relation: String,
    },
    /// The primary key is not a column of the upstream schema.
    #[error("primary key {column:?} is not a column of {table}")]
    UnknownPrimaryKey {
        /// Requested primary key.
        column: String,
        /// Table the key was checked against.
        table: String,
    },
    /// Count verification was disabled without supplying a count.
    #[error("a record count is required when count verification is disabled")]
    MissingCount,
    /// Several pages are needed but the table has no usable ordering column.
    #[error("no sort key could be determined for paged requests against {table}")]
    NoSortKey {
        /// Table being paged.
        table: String,
    },
    /// A bounding box was supplied for a table without geometry.
    #[error("a bounding box filter requires a geometry column but {table} has none")]
    MissingGeometryColumn {
        /// Table being filtered.
        table: String,
    },
    /// Two options that exclude each other were both set.
    #[error("options {first} and {second} cannot be combined")]
    IncompatibleOptions {
        /// First option name.
        first: &'static str,
        /// Second option name.
        second: &'static str,
    },
    /// No upstream column survived type filtering.
    #[error("no supported columns remain in the schema of {table}")]
    EmptySchema {
        /// Table being replicated.
        table: String,
    },
}
