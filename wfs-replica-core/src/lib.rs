//! Core domain types for replicating Web Feature Service tables.
//!
//! The crate holds everything that does not touch the network or a database:
//! canonical table identifiers, schema descriptors, GeoJSON geometries and
//! feature records, filter expressions, page planning, sort-key selection and
//! the retry backoff policy. Transport, caching and persistence live in
//! `wfs-replica-data`.
//!
//! # Invariants
//!
//! - [`TableIdentifier`] values are always upper-case `SCHEMA.TABLE` pairs.
//! - [`plan_pages`] partitions a record count into contiguous, disjoint,
//!   ordered ranges that never exceed the page size.
//! - [`Geometry::into_multi`] is idempotent.

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod capabilities;
mod error;
mod feature;
mod filter;
mod geometry;
mod planner;
mod registry;
mod retry;
mod schema;
mod sort_key;
mod table;

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(all(docsrs, not(test)), doc(cfg(feature = "test-support")))]
pub mod test_support;

pub use capabilities::CapabilitiesDocument;
pub use error::ValidationError;
pub use feature::{Attributes, FeatureCollection, FeatureRecord, Value, crs_name_for};
pub use filter::{BoundingBox, DEFAULT_BOUNDS_CRS, FilterExpression};
pub use geometry::{Geometry, GeometryKind, GeometryType, Position};
pub use planner::{
    DEFAULT_PAGE_SIZE, PageDescriptor, PageRange, PageTemplate, chunk_count, page_ranges,
    plan_pages, resolve_count,
};
pub use registry::PrimaryKeyRegistry;
pub use retry::{DEFAULT_RETRY_DEADLINE, RetryPolicy};
pub use schema::{ColumnDescriptor, REDUNDANT_COLUMNS, SchemaDescriptor, UpstreamType};
pub use sort_key::{
    CONVENTIONAL_IDENTIFIERS, ConventionalIdentifier, FirstProperty, RegisteredPrimaryKey,
    SortKeyContext, SortKeySelection, SortKeyStrategy, default_strategies, select_sort_key,
};
pub use table::{RelationName, TableIdentifier};
