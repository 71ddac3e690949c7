use thiserror::Error;
use wfs_replica_core::ValidationError;

use crate::client::WfsError;

/// Failures raised by a [`DestinationStore`](super::DestinationStore).
#[derive(Debug, Error)]
pub enum DestinationError {
    /// The connection string cannot name a destination.
    #[error("invalid destination connection string {connection:?}: {reason}")]
    Configuration {
        /// Connection string as supplied.
        connection: String,
        /// What is wrong with it.
        reason: &'static str,
    },
    /// The database could not be opened.
    #[error("failed to open destination {location}")]
    Open {
        /// Resolved database location.
        location: String,
        /// Error reported by SQLite.
        #[source]
        source: rusqlite::Error,
    },
    /// A statement failed.
    #[error("destination operation {operation:?} failed")]
    Sql {
        /// What was being attempted.
        operation: &'static str,
        /// Error reported by SQLite.
        #[source]
        source: rusqlite::Error,
    },
}

/// Failures raised while replicating a table.
#[derive(Debug, Error)]
pub enum ReplicationError {
    /// Resolving, planning or fetching failed.
    #[error(transparent)]
    Wfs(#[from] WfsError),
    /// The destination rejected an operation.
    #[error(transparent)]
    Destination(#[from] DestinationError),
    /// Options or sampled data were unusable.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Append mode was requested for a relation that does not exist.
    #[error("destination relation {relation} does not exist")]
    DestinationNotFound {
        /// Relation that was expected.
        relation: String,
    },
    /// A page failed after earlier pages were committed.
    ///
    /// Committed pages are not rolled back; the relation holds the rows of
    /// the first `pages_loaded` pages.
    #[error("loading page {page} failed after {pages_loaded} pages were committed")]
    PageLoad {
        /// One-based number of the failing page.
        page: usize,
        /// Pages committed before the failure.
        pages_loaded: usize,
        /// Underlying failure.
        #[source]
        source: Box<ReplicationError>,
    },
}
