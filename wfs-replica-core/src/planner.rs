//! Page planning.
//!
//! Planning is pure: given a record count and a page size it yields the
//! ordered list of page descriptors needed to read every record once.

use std::num::NonZeroU64;

use serde::{Deserialize, Serialize};

use crate::{TableIdentifier, ValidationError};

/// Page size used when the service does not advertise one.
pub const DEFAULT_PAGE_SIZE: NonZeroU64 = match NonZeroU64::new(10_000) {
    Some(size) => size,
    None => NonZeroU64::MIN,
};

/// Half-open record range `[start, start + count)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    /// Zero-based index of the first record.
    pub start: u64,
    /// Number of records.
    pub count: u64,
}

/// Everything a page request carries apart from its range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTemplate {
    /// Table to read.
    pub table: TableIdentifier,
    /// Rendered `CQL_FILTER`.
    pub filter: Option<String>,
    /// Ordering column; required when more than one page is planned.
    pub sort_key: Option<String>,
    /// Output spatial reference, e.g. `EPSG:4326`.
    pub srs: String,
}

/// A single planned feature request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageDescriptor {
    /// Table to read.
    pub table: TableIdentifier,
    /// Rendered `CQL_FILTER`.
    pub filter: Option<String>,
    /// Upper-case ordering column.
    pub sort_key: Option<String>,
    /// Output spatial reference.
    pub srs: String,
    /// Zero-based index of the first record.
    pub start_index: u64,
    /// Maximum number of records returned.
    pub count: u64,
}

impl PageDescriptor {
    /// Whether the page can be satisfied without contacting the service.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Number of records to plan for.
///
/// A verified count caps any explicit request; without verification the
/// explicit count is trusted and must be present.
///
/// # Examples
///
/// ```
/// use wfs_replica_core::resolve_count;
///
/// assert_eq!(resolve_count(Some(10), Some(455)), Ok(10));
/// assert_eq!(resolve_count(Some(1_000), Some(455)), Ok(455));
/// assert_eq!(resolve_count(None, Some(455)), Ok(455));
/// assert_eq!(resolve_count(Some(7), None), Ok(7));
/// assert!(resolve_count(None, None).is_err());
/// ```
pub fn resolve_count(explicit: Option<u64>, verified: Option<u64>) -> Result<u64, ValidationError> {
    match (explicit, verified) {
        (Some(requested), Some(available)) => Ok(requested.min(available)),
        (None, Some(available)) => Ok(available),
        (Some(requested), None) => Ok(requested),
        (None, None) => Err(ValidationError::MissingCount),
    }
}

/// Number of pages needed for `count` records.
#[must_use]
pub const fn chunk_count(count: u64, page_size: NonZeroU64) -> u64 {
    count.div_ceil(page_size.get())
}

/// Partition `count` records into contiguous ranges of at most `page_size`.
///
/// A count of zero yields a single empty range so callers always receive one
/// descriptor.
#[must_use]
pub fn page_ranges(count: u64, page_size: NonZeroU64) -> Vec<PageRange> {
    if count == 0 {
        return vec![PageRange { start: 0, count: 0 }];
    }
    let size = page_size.get();
    (0..chunk_count(count, page_size))
        .map(|chunk| {
            let start = chunk * size;
            PageRange {
                start,
                count: size.min(count - start),
            }
        })
        .collect()
}

/// Expand a template into one descriptor per page.
///
/// # Examples
///
/// ```
/// use std::num::NonZeroU64;
/// use wfs_replica_core::{PageTemplate, TableIdentifier, plan_pages};
///
/// # fn main() -> Result<(), wfs_replica_core::ValidationError> {
/// let template = PageTemplate {
///     table: TableIdentifier::parse("WHSE_IMAGERY_AND_BASE_MAPS.GSR_AIRPORTS_SVW")?,
///     filter: None,
///     sort_key: Some("seq_id".into()),
///     srs: "EPSG:4326".into(),
/// };
/// let page_size = NonZeroU64::new(250).expect("non-zero");
/// let pages = plan_pages(&template, 455, page_size);
/// let counts: Vec<_> = pages.iter().map(|p| (p.start_index, p.count)).collect();
/// assert_eq!(counts, [(0, 250), (250, 205)]);
/// assert_eq!(pages[0].sort_key.as_deref(), Some("SEQ_ID"));
/// # Ok(())
/// # }
/// ```
#[must_use]
pub fn plan_pages(template: &PageTemplate, count: u64, page_size: NonZeroU64) -> Vec<PageDescriptor> {
    let sort_key = template
        .sort_key
        .as_deref()
        .map(str::to_ascii_uppercase);
    page_ranges(count, page_size)
        .into_iter()
        .map(|range| PageDescriptor {
            table: template.table.clone(),
            filter: template.filter.clone(),
            sort_key: sort_key.clone(),
            srs: template.srs.clone(),
            start_index: range.start,
            count: range.count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn size(n: u64) -> NonZeroU64 {
        NonZeroU64::new(n).expect("non-zero page size")
    }

    #[rstest]
    #[case(6, 10_000, vec![(0, 6)])]
    #[case(455, 250, vec![(0, 250), (250, 205)])]
    #[case(500, 250, vec![(0, 250), (250, 250)])]
    #[case(0, 250, vec![(0, 0)])]
    #[case(1, 1, vec![(0, 1)])]
    fn partitions_counts(#[case] count: u64, #[case] page: u64, #[case] expected: Vec<(u64, u64)>) {
        let ranges: Vec<_> = page_ranges(count, size(page))
            .into_iter()
            .map(|r| (r.start, r.count))
            .collect();
        assert_eq!(ranges, expected);
    }

    #[rstest]
    fn empty_plan_yields_one_empty_descriptor() {
        let template = PageTemplate {
            table: TableIdentifier::parse("WHSE_A.B").expect("valid identifier"),
            filter: Some("NAME='none'".into()),
            sort_key: None,
            srs: "EPSG:3005".into(),
        };
        let pages = plan_pages(&template, 0, DEFAULT_PAGE_SIZE);
        assert_eq!(pages.len(), 1);
        assert!(pages.iter().all(PageDescriptor::is_empty));
    }
}
