//! I/O layer for replicating Web Feature Service tables.
//!
//! Responsibilities:
//! - Talk to the service over HTTP with retries and backoff.
//! - Decode capabilities, schema, hit-count and feature documents.
//! - Cache service metadata on disk.
//! - Plan, fetch and replicate paged feature reads.
//!
//! Boundaries:
//! - Domain rules such as page planning and sort-key selection live in
//!   `wfs-replica-core`.
//! - The public API is blocking; async work runs on a runtime owned by the
//!   client.
//!
//! Invariants:
//! - Permanent service errors are never retried.
//! - Lazy iteration yields pages strictly in plan order.
//! - Replication loads one page at a time and never rolls back committed
//!   pages.

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod cache;
pub mod catalogue;
pub mod client;
pub mod replicate;
pub mod transport;
pub mod wfs;

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(all(docsrs, not(test)), doc(cfg(feature = "test-support")))]
pub mod test_support;

pub use cache::{CacheError, CacheStore, FsCacheStore, MemoryCacheStore};
pub use client::{CacheLocation, FeatureIter, RequestOptions, WfsClient, WfsConfig, WfsError};
pub use replicate::{
    DestinationError, DestinationStore, ReplicationError, ReplicationMode, ReplicationOptions,
    SqliteDestination, replicate,
};
pub use transport::{HttpReply, HttpSource, ReqwestSource, RetryingTransport, TransportError};
pub use wfs::ParseError;
