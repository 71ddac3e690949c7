//! Property-based tests for page planning and multipart promotion.
//!
//! # Invariants tested
//!
//! - **Exact partition:** planned ranges are contiguous, start at zero and
//!   sum to the record count.
//! - **Page bound:** no range exceeds the page size.
//! - **Chunk count:** the number of ranges is `ceil(count / page_size)`, or
//!   one empty range for an empty table.
//! - **Idempotent promotion:** promoting a geometry twice equals promoting it
//!   once, and the result is always multipart.

mod proptest_support;

use proptest::prelude::*;
use wfs_replica_core::{PageTemplate, TableIdentifier, chunk_count, page_ranges, plan_pages};

use proptest_support::{geometry_strategy, page_size_strategy, record_count_strategy};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn ranges_partition_the_record_count(
        count in record_count_strategy(),
        page_size in page_size_strategy(),
    ) {
        let ranges = page_ranges(count, page_size);
        let mut next_start = 0_u64;
        for range in &ranges {
            prop_assert_eq!(range.start, next_start);
            prop_assert!(range.count <= page_size.get());
            next_start += range.count;
        }
        prop_assert_eq!(next_start, count);
        if count == 0 {
            prop_assert_eq!(ranges.len(), 1);
        } else {
            prop_assert_eq!(ranges.len() as u64, chunk_count(count, page_size));
            prop_assert!(ranges.iter().all(|r| r.count > 0));
        }
    }

    #[test]
    fn descriptors_share_the_template(
        count in record_count_strategy(),
        page_size in page_size_strategy(),
    ) {
        let template = PageTemplate {
            table: TableIdentifier::parse("WHSE_A.B").expect("valid identifier"),
            filter: Some("LOCALITY='Sidney'".into()),
            sort_key: Some("objectid".into()),
            srs: "EPSG:3005".into(),
        };
        let pages = plan_pages(&template, count, page_size);
        prop_assert!(!pages.is_empty());
        for page in &pages {
            prop_assert_eq!(&page.table, &template.table);
            prop_assert_eq!(page.filter.as_deref(), Some("LOCALITY='Sidney'"));
            prop_assert_eq!(page.sort_key.as_deref(), Some("OBJECTID"));
        }
    }

    #[test]
    fn promotion_is_idempotent(geometry in geometry_strategy()) {
        let once = geometry.clone().into_multi();
        prop_assert!(once.kind().is_multi());
        prop_assert_eq!(once.has_z(), geometry.has_z());
        prop_assert_eq!(once.clone().into_multi(), once);
    }
}
