use std::num::{NonZeroU64, NonZeroUsize};
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use wfs_replica_core::RetryPolicy;

use crate::cache::DISPOSABLE_CACHE_FILE;
use crate::transport::DEFAULT_USER_AGENT;

/// Feature query endpoint.
pub const DEFAULT_WFS_URL: &str = "https://openmaps.gov.bc.ca/geo/pub/wfs";

/// Endpoint answering capabilities and schema requests.
pub const DEFAULT_OWS_URL: &str = "https://openmaps.gov.bc.ca/geo/pub/ows";

/// Catalogue action API used to resolve package labels.
pub const DEFAULT_CATALOGUE_URL: &str = "https://catalogue.data.gov.bc.ca/api/3/action/";

/// Default per-request timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// How long the capabilities document stays fresh.
pub const DEFAULT_CAPABILITIES_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// How long a table schema stays fresh.
pub const DEFAULT_SCHEMA_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

const DEFAULT_MAX_WORKERS: NonZeroUsize = match NonZeroUsize::new(4) {
    Some(workers) => workers,
    None => NonZeroUsize::MIN,
};

/// Configuration for [`WfsClient`](super::WfsClient).
#[derive(Debug, Clone)]
pub struct WfsConfig {
    /// Feature query endpoint.
    pub wfs_url: String,
    /// Capabilities and schema endpoint.
    pub ows_url: String,
    /// Catalogue API base; a trailing slash is added when missing.
    pub catalogue_url: String,
    /// JSON `{table: column}` document of known primary keys.
    pub primary_keys_url: Option<String>,
    /// User agent sent with every request.
    pub user_agent: String,
    /// Timeout for a single round trip.
    pub timeout: Duration,
    /// Backoff applied to transient failures.
    pub retry: RetryPolicy,
    /// Freshness window for the capabilities document.
    pub capabilities_ttl: Duration,
    /// Freshness window for schemas and the primary-key registry.
    pub schema_ttl: Duration,
    /// Concurrent page requests during materialised retrieval.
    pub max_workers: NonZeroUsize,
    /// Ignore cached metadata and fetch it again.
    pub refresh: bool,
    /// Upper bound on page size; the server's default applies when larger.
    pub page_size: Option<NonZeroU64>,
}

impl Default for WfsConfig {
    fn default() -> Self {
        Self {
            wfs_url: DEFAULT_WFS_URL.to_owned(),
            ows_url: DEFAULT_OWS_URL.to_owned(),
            catalogue_url: DEFAULT_CATALOGUE_URL.to_owned(),
            primary_keys_url: None,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retry: RetryPolicy::default(),
            capabilities_ttl: DEFAULT_CAPABILITIES_TTL,
            schema_ttl: DEFAULT_SCHEMA_TTL,
            max_workers: DEFAULT_MAX_WORKERS,
            refresh: false,
            page_size: None,
        }
    }
}

impl WfsConfig {
    /// Configuration pointing at a different WFS endpoint pair.
    #[must_use]
    pub fn new(wfs_url: impl Into<String>, ows_url: impl Into<String>) -> Self {
        Self {
            wfs_url: wfs_url.into(),
            ows_url: ows_url.into(),
            ..Self::default()
        }
    }

    /// Set the catalogue API base.
    #[must_use]
    pub fn with_catalogue_url(mut self, url: impl Into<String>) -> Self {
        self.catalogue_url = url.into();
        self
    }

    /// Load known primary keys from `url`.
    #[must_use]
    pub fn with_primary_keys_url(mut self, url: impl Into<String>) -> Self {
        self.primary_keys_url = Some(url.into());
        self
    }

    /// Set the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the per-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry policy.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the capabilities freshness window.
    #[must_use]
    pub const fn with_capabilities_ttl(mut self, ttl: Duration) -> Self {
        self.capabilities_ttl = ttl;
        self
    }

    /// Set the schema freshness window.
    #[must_use]
    pub const fn with_schema_ttl(mut self, ttl: Duration) -> Self {
        self.schema_ttl = ttl;
        self
    }

    /// Set the number of concurrent page requests.
    #[must_use]
    pub const fn with_max_workers(mut self, workers: NonZeroUsize) -> Self {
        self.max_workers = workers;
        self
    }

    /// Force cached metadata to be fetched again.
    #[must_use]
    pub const fn with_refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    /// Cap the page size below the server default.
    #[must_use]
    pub const fn with_page_size(mut self, page_size: NonZeroU64) -> Self {
        self.page_size = Some(page_size);
        self
    }
}

/// Directory holding cached metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheLocation {
    path: Utf8PathBuf,
}

impl CacheLocation {
    /// Use an explicit directory.
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The conventional `.wfs-replica` directory under `home`.
    #[must_use]
    pub fn in_home(home: &Utf8Path) -> Self {
        Self::new(home.join(DISPOSABLE_CACHE_FILE))
    }

    /// Directory path.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn defaults_target_the_public_service() {
        let config = WfsConfig::default();
        assert_eq!(config.wfs_url, DEFAULT_WFS_URL);
        assert_eq!(config.ows_url, DEFAULT_OWS_URL);
        assert_eq!(config.max_workers.get(), 4);
        assert_eq!(config.capabilities_ttl, Duration::from_secs(86_400));
        assert_eq!(config.schema_ttl, Duration::from_secs(2_592_000));
        assert!(config.primary_keys_url.is_none());
        assert!(!config.refresh);
    }

    #[rstest]
    fn builders_override_fields() {
        let page_size = NonZeroU64::new(250).expect("non-zero");
        let config = WfsConfig::new("http://localhost/wfs", "http://localhost/ows")
            .with_page_size(page_size)
            .with_refresh(true)
            .with_primary_keys_url("http://localhost/keys.json");
        assert_eq!(config.wfs_url, "http://localhost/wfs");
        assert_eq!(config.page_size, Some(page_size));
        assert!(config.refresh);
        assert_eq!(
            config.primary_keys_url.as_deref(),
            Some("http://localhost/keys.json")
        );
    }

    #[rstest]
    fn home_cache_uses_dot_directory() {
        let location = CacheLocation::in_home(Utf8Path::new("/home/user"));
        assert_eq!(location.path(), Utf8Path::new("/home/user/.wfs-replica"));
    }
}
