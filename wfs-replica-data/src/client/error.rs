use thiserror::Error;
use wfs_replica_core::ValidationError;

use crate::cache::CacheError;
use crate::transport::TransportError;
use crate::wfs::ParseError;

/// Errors raised by [`WfsClient`](super::WfsClient) operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WfsError {
    /// The label matches neither a table nor a catalogue package.
    #[error("{input} is not a known table or catalogue package")]
    NotFound {
        /// Label as supplied.
        input: String,
    },
    /// A catalogue package publishes several layers.
    #[error("package {label} publishes several layers; choose one of: {}", candidates.join(", "))]
    AmbiguousPackage {
        /// Package label.
        label: String,
        /// Layer names found in the package.
        candidates: Vec<String>,
    },
    /// A request failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The metadata cache could not be used.
    #[error(transparent)]
    Cache(#[from] CacheError),
    /// A response could not be decoded.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// Request parameters were rejected before contacting the service.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// A configured endpoint is not a valid URL.
    #[error("invalid {what} URL {url:?}")]
    InvalidUrl {
        /// Which endpoint.
        what: &'static str,
        /// Configured value.
        url: String,
        /// Parser error.
        #[source]
        source: url::ParseError,
    },
    /// The blocking runtime could not be built.
    #[error("failed to build Tokio runtime")]
    Runtime(#[source] std::io::Error),
    /// The HTTP client could not be built.
    #[error("failed to build HTTP client")]
    HttpClient(#[source] reqwest::Error),
}
