//! Blocking client for a paginated WFS.
//!
//! [`WfsClient`] resolves dataset labels, caches capabilities and schemas,
//! counts matches, plans page requests and fetches features either all at
//! once through a bounded worker pool or lazily page by page.

mod config;
mod error;
mod iter;
mod options;
mod runtime;

#[cfg(test)]
mod tests;

use std::collections::BTreeSet;
use std::future::Future;
use std::num::NonZeroU64;
use std::time::Duration;

use futures_util::{StreamExt, TryStreamExt, stream};
use log::{debug, info, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;
use wfs_replica_core::{
    CapabilitiesDocument, FeatureCollection, FeatureRecord, GeometryType, PageDescriptor,
    PageTemplate, PrimaryKeyRegistry, SchemaDescriptor, SortKeyContext, SortKeySelection,
    TableIdentifier, ValidationError, chunk_count, default_strategies, plan_pages, resolve_count,
    select_sort_key,
};

pub use config::{
    CacheLocation, DEFAULT_CAPABILITIES_TTL, DEFAULT_CATALOGUE_URL, DEFAULT_OWS_URL,
    DEFAULT_SCHEMA_TTL, DEFAULT_WFS_URL, WfsConfig,
};
pub use error::WfsError;
pub use iter::FeatureIter;
pub use options::{DEFAULT_SRS, RequestOptions};

use crate::cache::{CacheStore, FsCacheStore};
use crate::catalogue::{layer_names, package_show_url};
use crate::transport::{HttpReply, HttpSource, ReqwestSource, RetryingTransport};
use crate::wfs::request::{capabilities_url, describe_url, features_url, hits_url};
use crate::wfs::{ParseError, parse_capabilities, parse_describe, parse_feature_page, parse_hits};
use runtime::BlockingRuntime;

const CAPABILITIES_KEY: &str = "capabilities.json";
const PRIMARY_KEYS_KEY: &str = "primary_keys.json";

#[derive(Debug)]
struct Endpoints {
    wfs: Url,
    ows: Url,
    catalogue: Url,
    primary_keys: Option<Url>,
}

impl Endpoints {
    fn from_config(config: &WfsConfig) -> Result<Self, WfsError> {
        let parse = |what: &'static str, raw: &str| {
            Url::parse(raw).map_err(|source| WfsError::InvalidUrl {
                what,
                url: raw.to_owned(),
                source,
            })
        };
        let mut catalogue = config.catalogue_url.clone();
        if !catalogue.ends_with('/') {
            catalogue.push('/');
        }
        Ok(Self {
            wfs: parse("WFS", &config.wfs_url)?,
            ows: parse("OWS", &config.ows_url)?,
            catalogue: parse("catalogue", &catalogue)?,
            primary_keys: config
                .primary_keys_url
                .as_deref()
                .map(|raw| parse("primary key registry", raw))
                .transpose()?,
        })
    }
}

/// Client for the catalogue's WFS.
///
/// Every public method blocks. Inside a multi-threaded Tokio runtime the
/// caller's runtime drives the requests through
/// [`tokio::task::block_in_place`]; elsewhere the client's own
/// current-thread runtime does.
///
/// # Example
///
/// ```no_run
/// use wfs_replica_data::client::{CacheLocation, RequestOptions, WfsClient, WfsConfig};
///
/// let client = WfsClient::new(WfsConfig::default(), &CacheLocation::new("/tmp/wfs-cache"))?;
/// let options = RequestOptions::new().with_count(10);
/// let airports = client.get_data("bc-airports", &options)?;
/// assert!(airports.len() <= 10);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct WfsClient<S = ReqwestSource, C = FsCacheStore> {
    transport: RetryingTransport<S>,
    cache: C,
    config: WfsConfig,
    endpoints: Endpoints,
    runtime: BlockingRuntime,
}

impl WfsClient {
    /// Build a client talking HTTP through `reqwest` and caching under
    /// `cache`.
    ///
    /// # Errors
    ///
    /// Fails when an endpoint URL is invalid, the cache location is unusable,
    /// or the HTTP client or runtime cannot be built.
    pub fn new(config: WfsConfig, cache: &CacheLocation) -> Result<Self, WfsError> {
        let source =
            ReqwestSource::new(&config.user_agent, config.timeout).map_err(WfsError::HttpClient)?;
        let cache = FsCacheStore::open(cache.path())?;
        Self::with_parts(config, source, cache)
    }
}

impl<S: HttpSource, C: CacheStore> WfsClient<S, C> {
    /// Assemble a client from an explicit source and cache.
    pub fn with_parts(config: WfsConfig, source: S, cache: C) -> Result<Self, WfsError> {
        let endpoints = Endpoints::from_config(&config)?;
        let runtime = BlockingRuntime::new().map_err(WfsError::Runtime)?;
        Ok(Self {
            transport: RetryingTransport::new(source, config.retry),
            cache,
            config,
            endpoints,
            runtime,
        })
    }

    /// Configuration in use.
    pub const fn config(&self) -> &WfsConfig {
        &self.config
    }

    /// HTTP source behind the retrying transport.
    pub const fn source(&self) -> &S {
        self.transport.source()
    }

    /// Metadata cache.
    pub const fn cache(&self) -> &C {
        &self.cache
    }

    /// Tables published by the service.
    ///
    /// `refresh` bypasses the cached capabilities document.
    pub fn list_tables(&self, refresh: bool) -> Result<BTreeSet<TableIdentifier>, WfsError> {
        self.block_on(self.load_capabilities(refresh))
            .map(|capabilities| capabilities.tables)
    }

    /// Cached capabilities document.
    pub fn capabilities(&self) -> Result<CapabilitiesDocument, WfsError> {
        self.block_on(self.load_capabilities(false))
    }

    /// Records per page: the server default, lowered by any configured cap.
    pub fn page_size(&self) -> Result<NonZeroU64, WfsError> {
        self.block_on(self.effective_page_size())
    }

    /// Turn a table name or catalogue package label into a published table.
    ///
    /// # Errors
    ///
    /// [`WfsError::NotFound`] when neither interpretation names a published
    /// table; [`WfsError::AmbiguousPackage`] when the package lists several
    /// layers.
    pub fn resolve_name(&self, dataset: &str) -> Result<TableIdentifier, WfsError> {
        self.block_on(self.resolve(dataset))
    }

    /// Schema of a dataset, served from the cache while fresh.
    pub fn get_schema(&self, dataset: &str) -> Result<SchemaDescriptor, WfsError> {
        self.block_on(async {
            let table = self.resolve(dataset).await?;
            self.schema_for(&table).await
        })
    }

    /// Known primary keys; empty when no registry URL is configured.
    pub fn primary_keys(&self) -> Result<PrimaryKeyRegistry, WfsError> {
        self.block_on(self.registry())
    }

    /// Column that paged requests for `dataset` would be ordered by.
    pub fn get_sort_key(&self, dataset: &str) -> Result<Option<SortKeySelection>, WfsError> {
        self.block_on(async {
            let table = self.resolve(dataset).await?;
            let schema = self.schema_for(&table).await?;
            self.sort_key_for(&table, &schema).await
        })
    }

    /// Number of records matching `options.filter`.
    pub fn get_count(&self, dataset: &str, options: &RequestOptions) -> Result<u64, WfsError> {
        self.block_on(async {
            let table = self.resolve(dataset).await?;
            let geometry_column = if options.filter.bbox().is_some() {
                self.schema_for(&table).await?.geometry_column
            } else {
                None
            };
            let filter = options.filter.to_cql(&table, geometry_column.as_deref())?;
            self.count_matching(&table, filter.as_deref()).await
        })
    }

    /// Page requests covering the records selected by `options`.
    ///
    /// # Errors
    ///
    /// Besides resolution and transport failures, fails with
    /// [`ValidationError::MissingCount`] when verification is disabled and no
    /// count is given, and [`ValidationError::NoSortKey`] when several pages
    /// are needed and no ordering column can be found.
    pub fn define_requests(
        &self,
        dataset: &str,
        options: &RequestOptions,
    ) -> Result<Vec<PageDescriptor>, WfsError> {
        self.block_on(self.requests_for(dataset, options))
    }

    /// Fetch every planned page and merge them.
    ///
    /// Pages are requested concurrently, up to
    /// [`WfsConfig::max_workers`] at a time, so record order across pages is
    /// unspecified.
    pub fn get_data(
        &self,
        dataset: &str,
        options: &RequestOptions,
    ) -> Result<FeatureCollection, WfsError> {
        self.block_on(async {
            let pages = self.requests_for(dataset, options).await?;
            let features = self.fetch_all(&pages).await?;
            Ok(finish_collection(features, options))
        })
    }

    /// Lazily yield records page by page in plan order.
    ///
    /// Planning happens up front; each page is fetched when the previous one
    /// has been consumed.
    pub fn get_features(
        &self,
        dataset: &str,
        options: &RequestOptions,
    ) -> Result<FeatureIter<'_, S, C>, WfsError> {
        let pages = self.define_requests(dataset, options)?;
        Ok(FeatureIter::new(self, pages, options.lowercase))
    }

    /// Distinct geometry types among the first `count` records, sorted.
    pub fn spatial_types(&self, dataset: &str, count: u64) -> Result<Vec<GeometryType>, WfsError> {
        let options = RequestOptions::new().with_count(count);
        let collection = self.get_data(dataset, &options)?;
        let types: BTreeSet<GeometryType> = collection
            .features
            .iter()
            .filter_map(|feature| feature.geometry.as_ref())
            .map(|geometry| geometry.geometry_type())
            .collect();
        Ok(types.into_iter().collect())
    }

    pub(crate) fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    pub(crate) async fn resolve(&self, dataset: &str) -> Result<TableIdentifier, WfsError> {
        let capabilities = self.load_capabilities(false).await?;
        if let Ok(table) = TableIdentifier::parse(dataset) {
            if capabilities.contains(&table) {
                return Ok(table);
            }
        }
        let not_found = || WfsError::NotFound {
            input: dataset.to_owned(),
        };
        let layer = self.catalogue_layer(dataset).await?;
        let table = TableIdentifier::parse(&layer).map_err(|_| not_found())?;
        if capabilities.contains(&table) {
            debug!("resolved {dataset} to {table} through the catalogue");
            Ok(table)
        } else {
            Err(not_found())
        }
    }

    pub(crate) async fn schema_for(
        &self,
        table: &TableIdentifier,
    ) -> Result<SchemaDescriptor, WfsError> {
        let key = format!("{}.json", table.wire_name());
        let url = describe_url(&self.endpoints.ows, table);
        self.cached(&key, self.config.schema_ttl, self.config.refresh, async {
            let reply = self.fetch(&url).await?;
            Ok(parse_describe(table, &reply.body)?)
        })
        .await
    }

    pub(crate) async fn registry(&self) -> Result<PrimaryKeyRegistry, WfsError> {
        let Some(url) = &self.endpoints.primary_keys else {
            return Ok(PrimaryKeyRegistry::new());
        };
        self.cached(
            PRIMARY_KEYS_KEY,
            self.config.schema_ttl,
            self.config.refresh,
            async {
                let reply = self.fetch(url).await?;
                PrimaryKeyRegistry::from_json(&reply.body).map_err(|source| {
                    WfsError::Parse(ParseError::Json {
                        document: "primary key registry",
                        source,
                    })
                })
            },
        )
        .await
    }

    pub(crate) async fn plan(
        &self,
        table: &TableIdentifier,
        schema: &SchemaDescriptor,
        options: &RequestOptions,
    ) -> Result<Vec<PageDescriptor>, WfsError> {
        let filter = options
            .filter
            .to_cql(table, schema.geometry_column.as_deref())?;
        let verified = if options.verify_count {
            Some(self.count_matching(table, filter.as_deref()).await?)
        } else {
            None
        };
        let count = resolve_count(options.count, verified)?;
        info!("Total features requested: {count}");
        let page_size = self.effective_page_size().await?;
        let sort_key = match &options.sort_key {
            Some(column) => Some(column.clone()),
            None if chunk_count(count, page_size) > 1 => {
                let selection = self.sort_key_for(table, schema).await?.ok_or_else(|| {
                    ValidationError::NoSortKey {
                        table: table.to_string(),
                    }
                })?;
                debug!(
                    "ordering {table} by {} ({})",
                    selection.column, selection.strategy
                );
                Some(selection.column)
            }
            None => None,
        };
        let template = PageTemplate {
            table: table.clone(),
            filter,
            sort_key,
            srs: options.srs.clone(),
        };
        Ok(plan_pages(&template, count, page_size))
    }

    /// Fetch one page. `quiet` demotes the URL log line to `debug`.
    pub(crate) async fn fetch_page(
        &self,
        page: &PageDescriptor,
        quiet: bool,
    ) -> Result<Vec<FeatureRecord>, WfsError> {
        if page.is_empty() {
            return Ok(Vec::new());
        }
        let url = features_url(&self.endpoints.wfs, page);
        if quiet {
            debug!("{url}");
        } else {
            info!("{url}");
        }
        let reply = self.fetch(&url).await?;
        let mut body = reply.body.into_bytes();
        Ok(parse_feature_page(&mut body)?)
    }

    async fn fetch_all(&self, pages: &[PageDescriptor]) -> Result<Vec<FeatureRecord>, WfsError> {
        let batches: Vec<Vec<FeatureRecord>> =
            stream::iter(pages.iter().map(|page| self.fetch_page(page, false)))
                .buffer_unordered(self.config.max_workers.get())
                .try_collect()
                .await?;
        Ok(batches.into_iter().flatten().collect())
    }

    async fn requests_for(
        &self,
        dataset: &str,
        options: &RequestOptions,
    ) -> Result<Vec<PageDescriptor>, WfsError> {
        let table = self.resolve(dataset).await?;
        let schema = self.schema_for(&table).await?;
        self.plan(&table, &schema, options).await
    }

    async fn sort_key_for(
        &self,
        table: &TableIdentifier,
        schema: &SchemaDescriptor,
    ) -> Result<Option<SortKeySelection>, WfsError> {
        let registry = self.registry().await?;
        let context = SortKeyContext {
            table,
            schema,
            registry: &registry,
        };
        Ok(select_sort_key(&context, &default_strategies()))
    }

    async fn count_matching(
        &self,
        table: &TableIdentifier,
        filter: Option<&str>,
    ) -> Result<u64, WfsError> {
        let url = hits_url(&self.endpoints.wfs, table, filter);
        let reply = self.fetch(&url).await?;
        Ok(parse_hits(&reply.body)?)
    }

    async fn load_capabilities(&self, refresh: bool) -> Result<CapabilitiesDocument, WfsError> {
        let url = capabilities_url(&self.endpoints.ows);
        self.cached(
            CAPABILITIES_KEY,
            self.config.capabilities_ttl,
            refresh || self.config.refresh,
            async {
                let reply = self.fetch(&url).await?;
                Ok(parse_capabilities(&reply.body)?)
            },
        )
        .await
    }

    async fn effective_page_size(&self) -> Result<NonZeroU64, WfsError> {
        let server = self.load_capabilities(false).await?.page_size;
        Ok(self
            .config
            .page_size
            .map_or(server, |limit| limit.min(server)))
    }

    async fn catalogue_layer(&self, label: &str) -> Result<String, WfsError> {
        let not_found = || WfsError::NotFound {
            input: label.to_owned(),
        };
        let url = package_show_url(&self.endpoints.catalogue, label).map_err(|source| {
            WfsError::InvalidUrl {
                what: "catalogue",
                url: self.endpoints.catalogue.to_string(),
                source,
            }
        })?;
        let reply = match self.transport.get(&url).await {
            Ok(reply) => reply,
            Err(err) if err.is_not_found() => return Err(not_found()),
            Err(err) => return Err(err.into()),
        };
        let mut layers = layer_names(&reply.body)?;
        match layers.len() {
            0 => Err(not_found()),
            1 => Ok(layers.remove(0)),
            _ => Err(WfsError::AmbiguousPackage {
                label: label.to_owned(),
                candidates: layers,
            }),
        }
    }

    async fn fetch(&self, url: &Url) -> Result<HttpReply, WfsError> {
        Ok(self.transport.get(url).await?)
    }

    /// Serve `key` from the cache while fresh, otherwise run `fetch` and
    /// store its result. Unreadable entries are treated as missing.
    async fn cached<T, F>(
        &self,
        key: &str,
        ttl: Duration,
        refresh: bool,
        fetch: F,
    ) -> Result<T, WfsError>
    where
        T: Serialize + DeserializeOwned,
        F: Future<Output = Result<T, WfsError>>,
    {
        if !refresh && !self.cache.is_stale(key, ttl)? {
            if let Some(contents) = self.cache.get(key)? {
                match serde_json::from_str(&contents) {
                    Ok(value) => return Ok(value),
                    Err(err) => warn!("discarding unreadable cache entry {key}: {err}"),
                }
            }
        }
        let value = fetch.await?;
        let contents = serde_json::to_string(&value).map_err(|source| ParseError::Json {
            document: "cache entry",
            source,
        })?;
        self.cache.put(key, &contents)?;
        Ok(value)
    }
}

fn finish_collection(mut features: Vec<FeatureRecord>, options: &RequestOptions) -> FeatureCollection {
    if options.lowercase {
        features
            .iter_mut()
            .for_each(FeatureRecord::lowercase_attributes);
    }
    FeatureCollection::new(features, &options.srs)
}
