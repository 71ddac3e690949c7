//! Facade crate for WFS replication.
//!
//! This crate re-exports the core domain types and, behind the `data`
//! feature, the HTTP client and replication pipeline.

#![forbid(unsafe_code)]

pub use wfs_replica_core::{
    BoundingBox, ColumnDescriptor, FeatureCollection, FeatureRecord, FilterExpression, Geometry,
    GeometryKind, GeometryType, PageDescriptor, RelationName, RetryPolicy, SchemaDescriptor,
    SortKeySelection, TableIdentifier, UpstreamType, ValidationError, Value,
};

#[cfg(feature = "data")]
pub use wfs_replica_data::{
    CacheLocation, DestinationError, DestinationStore, FeatureIter, ReplicationError,
    ReplicationMode, ReplicationOptions, RequestOptions, SqliteDestination, WfsClient, WfsConfig,
    WfsError, replicate,
};

#[cfg(feature = "test-support")]
pub use wfs_replica_core::test_support;
