//! Bulk replication of a WFS table into a relational destination.
//!
//! [`replicate`] resolves the table, builds or inspects the destination
//! relation, plans the page requests and then loads the pages one at a
//! time. Each page commits independently; a failure part way through leaves
//! the earlier pages in place and is reported as
//! [`ReplicationError::PageLoad`].

mod error;
mod normalise;
mod options;
mod sqlite;
mod store;


use chrono::Utc;
use log::{debug, info, warn};
use wfs_replica_core::{
    FeatureRecord, GeometryType, RelationName, SchemaDescriptor, TableIdentifier, ValidationError,
};

pub use error::{DestinationError, ReplicationError};
pub use normalise::{NormalisedPage, normalise_page, sampled_geometry_type};
pub use options::{REPLICATION_SRS, ReplicationMode, ReplicationOptions};
pub use sqlite::{MEMORY_CONNECTION, SqliteDestination};
pub use store::{
    DestinationColumn, DestinationStore, GEOMETRY_COLUMN, GeometryColumn, RelationDefinition,
    SpatialRow,
};

use crate::cache::CacheStore;
use crate::client::WfsClient;
use crate::transport::HttpSource;

/// Copy `dataset` into `destination` and return the relation written.
///
/// In [`ReplicationMode::Create`] any existing relation is dropped and
/// recreated from the upstream schema. In [`ReplicationMode::Append`] the
/// relation must already exist and its columns decide what is loaded.
///
/// # Errors
///
/// Validation failures are raised before the destination is touched. A
/// failure while loading pages is wrapped in [`ReplicationError::PageLoad`]
/// and leaves the already committed pages in place.
///
/// # Examples
///
/// ```no_run
/// use wfs_replica_data::client::{CacheLocation, WfsClient, WfsConfig};
/// use wfs_replica_data::replicate::{ReplicationOptions, SqliteDestination, replicate};
///
/// let client = WfsClient::new(WfsConfig::default(), &CacheLocation::new("/tmp/wfs-cache"))?;
/// let mut destination = SqliteDestination::connect("sqlite://replica.sqlite")?;
/// let relation = replicate(
///     &client,
///     &mut destination,
///     "WHSE_IMAGERY_AND_BASE_MAPS.GSR_AIRPORTS_SVW",
///     &ReplicationOptions::new(),
/// )?;
/// println!("loaded {relation}");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn replicate<S, C, D>(
    client: &WfsClient<S, C>,
    destination: &mut D,
    dataset: &str,
    options: &ReplicationOptions,
) -> Result<RelationName, ReplicationError>
where
    S: HttpSource,
    C: CacheStore,
    D: DestinationStore + ?Sized,
{
    client.block_on(run(client, destination, dataset, options))
}

async fn run<S, C, D>(
    client: &WfsClient<S, C>,
    destination: &mut D,
    dataset: &str,
    options: &ReplicationOptions,
) -> Result<RelationName, ReplicationError>
where
    S: HttpSource,
    C: CacheStore,
    D: DestinationStore + ?Sized,
{
    if options.schema_only && options.mode == ReplicationMode::Append {
        return Err(ValidationError::IncompatibleOptions {
            first: "schema_only",
            second: "append",
        }
        .into());
    }
    let declared = options
        .geometry_type
        .as_deref()
        .map(GeometryType::parse_supported)
        .transpose()?;

    let table = client.resolve(dataset).await?;
    let relation = destination_relation(&table, options);
    let schema = client.schema_for(&table).await?;
    let columns = match options.mode {
        ReplicationMode::Create => destination_columns(&schema)?,
        ReplicationMode::Append => {
            if !destination.relation_exists(&relation)? {
                return Err(ReplicationError::DestinationNotFound {
                    relation: relation.to_string(),
                });
            }
            destination.columns(&relation)?
        }
    };
    let names: Vec<String> = columns.iter().map(|column| column.name.clone()).collect();
    let primary_key =
        resolve_primary_key(client, &table, &names, options.primary_key.as_deref()).await?;
    check_sort_key(&relation, &names, options.request.sort_key.as_deref())?;

    let pages = client.plan(&table, &schema, &options.request).await?;
    let mut first_page = match pages.first() {
        Some(page) if declared.is_none() || !options.schema_only => {
            client.fetch_page(page, true).await?
        }
        _ => Vec::new(),
    };
    let geometry = match options.mode {
        ReplicationMode::Create => {
            let mut sampled = sampled_geometry_type(&first_page);
            if sampled.is_none() && declared.is_none() && schema.geometry_column.is_some() {
                if let Some(last) = pages.last().filter(|_| pages.len() > 1) {
                    debug!("first page of {table} has no geometry; sampling the last page");
                    sampled = sampled_geometry_type(&client.fetch_page(last, true).await?);
                }
            }
            let matched: u64 = pages.iter().map(|page| page.count).sum();
            created_geometry(&schema, declared, sampled, matched)?
        }
        ReplicationMode::Append => {
            appended_geometry(destination.geometry_column(&relation)?, declared)?
        }
    };

    if options.mode == ReplicationMode::Create {
        destination.ensure_schema(relation.schema())?;
        if destination.relation_exists(&relation)? {
            destination.drop_relation(&relation)?;
        }
        destination.create_relation(&RelationDefinition {
            relation: relation.clone(),
            columns: columns.clone(),
            geometry,
            srs: options.request.srs.clone(),
            primary_key,
            comments: schema.comments.clone(),
        })?;
        if options.schema_only {
            info!("created {relation} without loading rows");
            return Ok(relation);
        }
    }

    let mut rows = 0;
    for (index, page) in pages.iter().enumerate() {
        let features = if index == 0 {
            std::mem::take(&mut first_page)
        } else {
            client
                .fetch_page(page, false)
                .await
                .map_err(|err| page_load(index, err.into()))?
        };
        rows += load_page(destination, &relation, &columns, &names, geometry, features)
            .map_err(|err| page_load(index, err))?;
    }
    info!("loaded {rows} rows from {table} into {relation}");

    if options.timestamp {
        destination.record_completion(&relation, Utc::now())?;
    }
    Ok(relation)
}

fn destination_relation(table: &TableIdentifier, options: &ReplicationOptions) -> RelationName {
    let mut relation = table.relation_name();
    if let Some(schema) = &options.schema {
        relation = relation.with_schema(schema);
    }
    if let Some(name) = &options.table {
        relation = relation.with_table(name);
    }
    relation
}

fn destination_columns(schema: &SchemaDescriptor) -> Result<Vec<DestinationColumn>, ValidationError> {
    let columns: Vec<DestinationColumn> = schema
        .retained_columns()
        .filter_map(|column| {
            column.destination_type().map(|sql_type| DestinationColumn {
                name: column.name.to_ascii_lowercase(),
                sql_type,
                comments: column.comments.clone(),
            })
        })
        .collect();
    if columns.is_empty() && schema.geometry_column.is_none() {
        return Err(ValidationError::EmptySchema {
            table: schema.table.to_string(),
        });
    }
    Ok(columns)
}

async fn resolve_primary_key<S: HttpSource, C: CacheStore>(
    client: &WfsClient<S, C>,
    table: &TableIdentifier,
    names: &[String],
    explicit: Option<&str>,
) -> Result<Option<String>, ReplicationError> {
    if let Some(column) = explicit {
        let lowered = column.trim().to_ascii_lowercase();
        if names.contains(&lowered) {
            return Ok(Some(lowered));
        }
        return Err(ValidationError::UnknownPrimaryKey {
            column: column.to_owned(),
            table: table.to_string(),
        }
        .into());
    }
    let registry = client.registry().await?;
    let Some(registered) = registry.get(table).map(str::to_ascii_lowercase) else {
        return Ok(None);
    };
    if names.contains(&registered) {
        debug!("using registered primary key {registered} for {table}");
        Ok(Some(registered))
    } else {
        warn!("registered primary key {registered} is not a retained column of {table}");
        Ok(None)
    }
}

fn check_sort_key(
    relation: &RelationName,
    names: &[String],
    sort_key: Option<&str>,
) -> Result<(), ValidationError> {
    match sort_key {
        Some(column) if !names.iter().any(|name| name.eq_ignore_ascii_case(column)) => {
            Err(ValidationError::UnknownSortKey {
                column: column.to_owned(),
                relation: relation.to_string(),
            })
        }
        _ => Ok(()),
    }
}

fn created_geometry(
    schema: &SchemaDescriptor,
    declared: Option<GeometryType>,
    sampled: Option<GeometryType>,
    matched: u64,
) -> Result<GeometryColumn, ValidationError> {
    if schema.geometry_column.is_none() {
        if let Some(declared) = declared {
            warn!("{} has no geometry column; ignoring {declared}", schema.table);
        }
        return Ok(GeometryColumn::Absent);
    }
    match (declared, sampled) {
        (Some(expected), Some(found)) if expected.to_multi() != found.to_multi() => {
            Err(ValidationError::GeometryMismatch { expected, found })
        }
        (Some(declared), _) => Ok(GeometryColumn::Typed(declared.to_multi())),
        (None, Some(found)) if found.is_supported() => Ok(GeometryColumn::Typed(found.to_multi())),
        (None, Some(found)) => Err(ValidationError::UnsupportedGeometryType {
            raw: found.to_string(),
        }),
        (None, None) if matched == 0 => {
            warn!(
                "no features match for {}; creating an untyped geometry column",
                schema.table
            );
            Ok(GeometryColumn::Untyped)
        }
        (None, None) => Err(ValidationError::UndeterminedGeometryType {
            table: schema.table.to_string(),
        }),
    }
}

fn appended_geometry(
    existing: GeometryColumn,
    declared: Option<GeometryType>,
) -> Result<GeometryColumn, ValidationError> {
    match (existing, declared) {
        (GeometryColumn::Typed(found), Some(expected)) if found != expected.to_multi() => {
            Err(ValidationError::GeometryMismatch { expected, found })
        }
        _ => Ok(existing),
    }
}

fn load_page<D: DestinationStore + ?Sized>(
    destination: &mut D,
    relation: &RelationName,
    columns: &[DestinationColumn],
    names: &[String],
    geometry: GeometryColumn,
    features: Vec<FeatureRecord>,
) -> Result<usize, ReplicationError> {
    let page = normalise_page(features, columns, geometry)?;
    if page.is_empty() {
        return Ok(0);
    }
    Ok(destination.append_page(relation, names, &page)?)
}

fn page_load(index: usize, source: ReplicationError) -> ReplicationError {
    ReplicationError::PageLoad {
        page: index + 1,
        pages_loaded: index,
        source: Box::new(source),
    }
}
