use crate::client::RequestOptions;

/// Spatial reference replicated geometries are requested in.
pub const REPLICATION_SRS: &str = "EPSG:3005";

/// Whether the destination relation is rebuilt or extended.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ReplicationMode {
    /// Drop any existing relation and create it afresh.
    #[default]
    Create,
    /// Add rows to an existing relation.
    Append,
}

/// Parameters for [`replicate`](super::replicate).
#[derive(Debug, Clone, PartialEq)]
pub struct ReplicationOptions {
    /// Filter, count and ordering for the upstream reads.
    pub request: RequestOptions,
    /// Destination schema; defaults to the upstream schema.
    pub schema: Option<String>,
    /// Destination table; defaults to the upstream table.
    pub table: Option<String>,
    /// Declared geometry type such as `POINT` or `MULTILINESTRINGZ`.
    pub geometry_type: Option<String>,
    /// Explicit primary key column.
    pub primary_key: Option<String>,
    /// Create or append.
    pub mode: ReplicationMode,
    /// Create the relation without loading any rows.
    pub schema_only: bool,
    /// Record the completion time in the bookkeeping relation.
    pub timestamp: bool,
}

impl Default for ReplicationOptions {
    fn default() -> Self {
        Self {
            request: RequestOptions::new().with_srs(REPLICATION_SRS),
            schema: None,
            table: None,
            geometry_type: None,
            primary_key: None,
            mode: ReplicationMode::Create,
            schema_only: false,
            timestamp: true,
        }
    }
}

impl ReplicationOptions {
    /// Options with every default.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the upstream request options.
    #[must_use]
    pub fn with_request(mut self, request: RequestOptions) -> Self {
        self.request = request;
        self
    }

    /// Write into `schema` instead of the upstream schema.
    #[must_use]
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Write into `table` instead of the upstream table.
    #[must_use]
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Declare the geometry type rather than sampling it.
    #[must_use]
    pub fn with_geometry_type(mut self, geometry_type: impl Into<String>) -> Self {
        self.geometry_type = Some(geometry_type.into());
        self
    }

    /// Mark `column` as the primary key.
    #[must_use]
    pub fn with_primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = Some(column.into());
        self
    }

    /// Choose create or append.
    #[must_use]
    pub const fn with_mode(mut self, mode: ReplicationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Only create the relation.
    #[must_use]
    pub const fn with_schema_only(mut self, schema_only: bool) -> Self {
        self.schema_only = schema_only;
        self
    }

    /// Enable or skip the completion timestamp.
    #[must_use]
    pub const fn with_timestamp(mut self, timestamp: bool) -> Self {
        self.timestamp = timestamp;
        self
    }
}
