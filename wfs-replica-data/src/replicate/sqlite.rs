//! SQLite-backed [`DestinationStore`].
//!
//! SQLite has no schemas, so a relation `schema.table` is stored as a single
//! table whose quoted name contains the dot. Geometries are stored as WKT
//! text and their declared type is kept in a metadata table.

use camino::Utf8Path;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, OptionalExtension, Transaction, params, params_from_iter};
use wfs_replica_core::{GeometryType, RelationName, Value};

use super::{
    DestinationColumn, DestinationError, DestinationStore, GEOMETRY_COLUMN, GeometryColumn,
    NormalisedPage, RelationDefinition,
};

/// Connection string selecting a private in-memory database.
pub const MEMORY_CONNECTION: &str = "sqlite::memory:";

const URL_PREFIX: &str = "sqlite://";
const GEOMETRY_METADATA: &str = "wfs_replica.geometry_columns";
const COMPLETION_LOG: &str = "wfs_replica.log";

/// Replication destination stored in a SQLite database.
#[derive(Debug)]
pub struct SqliteDestination {
    connection: Connection,
    location: String,
}

impl SqliteDestination {
    /// Open the database named by `connection`.
    ///
    /// Accepts `sqlite://<path>`, [`MEMORY_CONNECTION`] or a bare path. The
    /// metadata tables are created on first use.
    ///
    /// # Examples
    ///
    /// ```
    /// use wfs_replica_data::replicate::{DestinationStore, SqliteDestination};
    /// use wfs_replica_core::RelationName;
    ///
    /// let store = SqliteDestination::connect("sqlite::memory:").expect("open");
    /// let relation = RelationName::new("whse_basemapping", "utmg_utm_zones_sp");
    /// assert!(!store.relation_exists(&relation).expect("query"));
    /// ```
    pub fn connect(connection: &str) -> Result<Self, DestinationError> {
        let trimmed = connection.trim();
        let configuration = |reason| DestinationError::Configuration {
            connection: connection.to_owned(),
            reason,
        };
        if trimmed.is_empty() {
            return Err(configuration("no destination was given"));
        }
        let (opened, location) = if trimmed == MEMORY_CONNECTION {
            (Connection::open_in_memory(), ":memory:".to_owned())
        } else {
            let path = trimmed.strip_prefix(URL_PREFIX).unwrap_or(trimmed);
            if path.is_empty() {
                return Err(configuration("the database path is empty"));
            }
            (Connection::open(Utf8Path::new(path)), path.to_owned())
        };
        let connection = opened.map_err(|source| DestinationError::Open {
            location: location.clone(),
            source,
        })?;
        let mut store = Self {
            connection,
            location,
        };
        store.initialise()?;
        Ok(store)
    }

    /// Database location, `:memory:` for in-memory stores.
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Underlying connection, for ad-hoc queries.
    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Number of rows in `relation`.
    pub fn row_count(&self, relation: &RelationName) -> Result<u64, DestinationError> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote(&relation.to_string()));
        let count: i64 = self
            .connection
            .query_row(&sql, [], |row| row.get(0))
            .map_err(sql_error("count rows"))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    /// Completion time recorded for `relation`, as RFC 3339 text.
    pub fn completed_at(&self, relation: &RelationName) -> Result<Option<String>, DestinationError> {
        let sql = format!(
            "SELECT date_downloaded FROM {} WHERE table_name = ?1",
            quote(COMPLETION_LOG)
        );
        self.connection
            .query_row(&sql, params![relation.to_string()], |row| row.get(0))
            .optional()
            .map_err(sql_error("read completion time"))
    }

    fn initialise(&mut self) -> Result<(), DestinationError> {
        let transaction = self
            .connection
            .transaction()
            .map_err(sql_error("begin metadata transaction"))?;
        run(
            &transaction,
            "create geometry metadata",
            &format!(
                "CREATE TABLE IF NOT EXISTS {} (
                    relation TEXT PRIMARY KEY,
                    column_name TEXT NOT NULL,
                    geometry_type TEXT,
                    srs TEXT NOT NULL
                )",
                quote(GEOMETRY_METADATA)
            ),
        )?;
        run(
            &transaction,
            "create completion log",
            &format!(
                "CREATE TABLE IF NOT EXISTS {} (
                    table_name TEXT PRIMARY KEY,
                    date_downloaded TEXT NOT NULL
                )",
                quote(COMPLETION_LOG)
            ),
        )?;
        transaction
            .commit()
            .map_err(sql_error("commit metadata transaction"))
    }
}

impl DestinationStore for SqliteDestination {
    fn ensure_schema(&mut self, schema: &str) -> Result<(), DestinationError> {
        debug!("schema {schema} is carried in relation names");
        Ok(())
    }

    fn relation_exists(&self, relation: &RelationName) -> Result<bool, DestinationError> {
        self.connection
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![relation.to_string()],
                |_| Ok(()),
            )
            .optional()
            .map(|found| found.is_some())
            .map_err(sql_error("look up relation"))
    }

    fn drop_relation(&mut self, relation: &RelationName) -> Result<(), DestinationError> {
        let name = relation.to_string();
        let transaction = self
            .connection
            .transaction()
            .map_err(sql_error("begin drop transaction"))?;
        run(
            &transaction,
            "drop relation",
            &format!("DROP TABLE IF EXISTS {}", quote(&name)),
        )?;
        transaction
            .execute(
                &format!(
                    "DELETE FROM {} WHERE relation = ?1",
                    quote(GEOMETRY_METADATA)
                ),
                params![name],
            )
            .map_err(sql_error("clear geometry metadata"))?;
        transaction
            .commit()
            .map_err(sql_error("commit drop transaction"))?;
        info!("dropped {relation}");
        Ok(())
    }

    fn create_relation(&mut self, definition: &RelationDefinition) -> Result<(), DestinationError> {
        let name = definition.relation.to_string();
        let mut columns: Vec<String> = definition
            .columns
            .iter()
            .map(|column| {
                let mut ddl = format!("{} {}", quote(&column.name), column.sql_type);
                if definition.primary_key.as_deref() == Some(column.name.as_str()) {
                    ddl.push_str(" PRIMARY KEY");
                }
                ddl
            })
            .collect();
        if definition.geometry != GeometryColumn::Absent {
            columns.push(format!("{} TEXT", quote(GEOMETRY_COLUMN)));
        }
        let transaction = self
            .connection
            .transaction()
            .map_err(sql_error("begin create transaction"))?;
        run(
            &transaction,
            "create relation",
            &format!("CREATE TABLE {} ({})", quote(&name), columns.join(", ")),
        )?;
        let geometry_type = match definition.geometry {
            GeometryColumn::Absent => None,
            GeometryColumn::Untyped => Some(None),
            GeometryColumn::Typed(kind) => Some(Some(kind.to_string())),
        };
        if let Some(geometry_type) = geometry_type {
            transaction
                .execute(
                    &format!(
                        "INSERT INTO {} (relation, column_name, geometry_type, srs)
                         VALUES (?1, ?2, ?3, ?4)",
                        quote(GEOMETRY_METADATA)
                    ),
                    params![name, GEOMETRY_COLUMN, geometry_type, definition.srs],
                )
                .map_err(sql_error("record geometry metadata"))?;
        }
        transaction
            .commit()
            .map_err(sql_error("commit create transaction"))?;
        info!(
            "created {} with {} columns and geometry {:?}",
            definition.relation,
            definition.columns.len(),
            definition.geometry
        );
        Ok(())
    }

    fn columns(&self, relation: &RelationName) -> Result<Vec<DestinationColumn>, DestinationError> {
        let mut statement = self
            .connection
            .prepare_cached("SELECT name, type FROM pragma_table_info(?1) ORDER BY cid")
            .map_err(sql_error("prepare column listing"))?;
        let rows = statement
            .query_map(params![relation.to_string()], |row| {
                Ok(DestinationColumn {
                    name: row.get(0)?,
                    sql_type: row.get(1)?,
                    comments: None,
                })
            })
            .map_err(sql_error("list columns"))?;
        let mut columns = Vec::new();
        for column in rows {
            let column = column.map_err(sql_error("read column"))?;
            if column.name != GEOMETRY_COLUMN {
                columns.push(column);
            }
        }
        Ok(columns)
    }

    fn geometry_column(&self, relation: &RelationName) -> Result<GeometryColumn, DestinationError> {
        let recorded: Option<Option<String>> = self
            .connection
            .query_row(
                &format!(
                    "SELECT geometry_type FROM {} WHERE relation = ?1",
                    quote(GEOMETRY_METADATA)
                ),
                params![relation.to_string()],
                |row| row.get(0),
            )
            .optional()
            .map_err(sql_error("read geometry metadata"))?;
        match recorded {
            Some(Some(raw)) => match raw.parse::<GeometryType>() {
                Ok(kind) => Ok(GeometryColumn::Typed(kind)),
                Err(err) => {
                    warn!("ignoring geometry type recorded for {relation}: {err}");
                    Ok(GeometryColumn::Untyped)
                }
            },
            Some(None) => Ok(GeometryColumn::Untyped),
            None => {
                let has_column = self
                    .connection
                    .query_row(
                        "SELECT 1 FROM pragma_table_info(?1) WHERE name = ?2",
                        params![relation.to_string(), GEOMETRY_COLUMN],
                        |_| Ok(()),
                    )
                    .optional()
                    .map_err(sql_error("look up geometry column"))?
                    .is_some();
                Ok(if has_column {
                    GeometryColumn::Untyped
                } else {
                    GeometryColumn::Absent
                })
            }
        }
    }

    fn append_page(
        &mut self,
        relation: &RelationName,
        columns: &[String],
        page: &NormalisedPage,
    ) -> Result<usize, DestinationError> {
        let mut with_geometry = columns.to_vec();
        with_geometry.push(GEOMETRY_COLUMN.to_owned());
        let transaction = self
            .connection
            .transaction()
            .map_err(sql_error("begin append transaction"))?;
        let spatial = insert_rows(
            &transaction,
            relation,
            &with_geometry,
            page.spatial.iter().map(|row| {
                let mut values: Vec<SqlValue> = row.values.iter().map(to_sql).collect();
                values.push(SqlValue::Text(row.geometry.to_wkt()));
                values
            }),
        )?;
        let plain = insert_rows(
            &transaction,
            relation,
            columns,
            page.plain.iter().map(|row| row.iter().map(to_sql).collect()),
        )?;
        transaction
            .commit()
            .map_err(sql_error("commit append transaction"))?;
        debug!("appended {spatial} spatial and {plain} plain rows to {relation}");
        Ok(spatial + plain)
    }

    fn record_completion(
        &mut self,
        relation: &RelationName,
        completed_at: DateTime<Utc>,
    ) -> Result<(), DestinationError> {
        self.connection
            .execute(
                &format!(
                    "INSERT INTO {} (table_name, date_downloaded) VALUES (?1, ?2)
                     ON CONFLICT (table_name) DO UPDATE SET date_downloaded = excluded.date_downloaded",
                    quote(COMPLETION_LOG)
                ),
                params![relation.to_string(), completed_at.to_rfc3339()],
            )
            .map_err(sql_error("record completion"))?;
        debug!("recorded completion of {relation} at {completed_at}");
        Ok(())
    }
}

fn insert_rows(
    transaction: &Transaction<'_>,
    relation: &RelationName,
    columns: &[String],
    rows: impl ExactSizeIterator<Item = Vec<SqlValue>>,
) -> Result<usize, DestinationError> {
    let inserted = rows.len();
    if inserted == 0 {
        return Ok(0);
    }
    let column_list = columns
        .iter()
        .map(|column| quote(column))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = (1..=columns.len())
        .map(|index| format!("?{index}"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "INSERT INTO {} ({column_list}) VALUES ({placeholders})",
        quote(&relation.to_string())
    );
    let mut statement = transaction
        .prepare_cached(&sql)
        .map_err(sql_error("prepare append"))?;
    for row in rows {
        statement
            .execute(params_from_iter(row))
            .map_err(sql_error("append row"))?;
    }
    Ok(inserted)
}

fn run(
    transaction: &Transaction<'_>,
    operation: &'static str,
    sql: &str,
) -> Result<(), DestinationError> {
    transaction
        .execute(sql, [])
        .map(|_| ())
        .map_err(sql_error(operation))
}

fn sql_error(operation: &'static str) -> impl Fn(rusqlite::Error) -> DestinationError {
    move |source| DestinationError::Sql { operation, source }
}

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Integer(number) => SqlValue::Integer(*number),
        Value::Float(number) => SqlValue::Real(*number),
        Value::Text(text) => SqlValue::Text(text.clone()),
        Value::Date(date) => SqlValue::Text(date.format("%Y-%m-%d").to_string()),
    }
}
