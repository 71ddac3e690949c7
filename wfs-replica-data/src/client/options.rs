use wfs_replica_core::FilterExpression;

/// Output spatial reference used unless a request names another.
pub const DEFAULT_SRS: &str = "EPSG:4326";

/// Per-call parameters for counting, planning and fetching features.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOptions {
    /// CQL query and bounding box.
    pub filter: FilterExpression,
    /// Output spatial reference, such as `EPSG:3005`.
    pub srs: String,
    /// Maximum number of records to return.
    pub count: Option<u64>,
    /// Ask the service for the true count before planning.
    pub verify_count: bool,
    /// Explicit ordering column.
    pub sort_key: Option<String>,
    /// Lowercase attribute names in returned records.
    pub lowercase: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            filter: FilterExpression::new(),
            srs: DEFAULT_SRS.to_owned(),
            count: None,
            verify_count: true,
            sort_key: None,
            lowercase: false,
        }
    }
}

impl RequestOptions {
    /// Options with every default.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the filter.
    #[must_use]
    pub fn with_filter(mut self, filter: FilterExpression) -> Self {
        self.filter = filter;
        self
    }

    /// Set the output spatial reference.
    #[must_use]
    pub fn with_srs(mut self, srs: impl Into<String>) -> Self {
        self.srs = srs.into();
        self
    }

    /// Limit the number of records.
    #[must_use]
    pub const fn with_count(mut self, count: u64) -> Self {
        self.count = Some(count);
        self
    }

    /// Enable or skip count verification.
    #[must_use]
    pub const fn with_verify_count(mut self, verify: bool) -> Self {
        self.verify_count = verify;
        self
    }

    /// Order pages by `column`.
    #[must_use]
    pub fn with_sort_key(mut self, column: impl Into<String>) -> Self {
        self.sort_key = Some(column.into());
        self
    }

    /// Lowercase attribute names.
    #[must_use]
    pub const fn with_lowercase(mut self, lowercase: bool) -> Self {
        self.lowercase = lowercase;
        self
    }
}
