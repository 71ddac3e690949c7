use std::io;

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors raised by cache stores.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CacheError {
    /// The cache location cannot be used as a directory.
    #[error("cache location {path} is unusable: {reason}")]
    Configuration {
        /// Configured cache directory.
        path: Utf8PathBuf,
        /// What is wrong with it.
        reason: String,
    },
    /// Preparing the cache directory failed.
    #[error("failed to prepare cache directory {path}")]
    Prepare {
        /// Configured cache directory.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// Reading an entry failed.
    #[error("failed to read cache entry {path}")]
    Read {
        /// Entry path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// Writing an entry failed.
    #[error("failed to write cache entry {path}")]
    Write {
        /// Entry path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}
