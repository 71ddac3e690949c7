//! Transport-level errors.

use std::io;

use thiserror::Error;

/// Errors encountered while issuing HTTP requests.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// The service rejected the request; retrying will not help.
    #[error("request to {url} was rejected with status {status}: {body}")]
    ServiceRequest {
        /// Fully qualified request URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Response body, usually an exception report.
        body: String,
    },
    /// The service kept failing transiently until the retry deadline passed.
    #[error("request to {url} still failing after {attempts} attempts: {message}")]
    TransientService {
        /// Fully qualified request URL.
        url: String,
        /// Last status seen, absent when the last failure was a network error.
        status: Option<u16>,
        /// Number of attempts made.
        attempts: u32,
        /// Description of the last failure.
        message: String,
    },
    /// A single round trip failed below the HTTP layer.
    #[error("network error contacting {url}: {source}")]
    Network {
        /// Fully qualified request URL.
        url: String,
        /// I/O error reported by the transport.
        #[source]
        source: io::Error,
    },
}

impl TransportError {
    /// HTTP status associated with the failure, if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::ServiceRequest { status, .. } => Some(*status),
            Self::TransientService { status, .. } => *status,
            Self::Network { .. } => None,
        }
    }

    /// Whether the service answered `404 Not Found`.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::ServiceRequest { status: 404, .. })
    }
}
