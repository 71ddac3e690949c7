//! Proptest strategies for page-planning and geometry property tests.

use std::num::NonZeroU64;

use proptest::prelude::*;
use wfs_replica_core::{Geometry, Position};

/// Record counts from empty tables up to a few hundred thousand rows.
pub fn record_count_strategy() -> impl Strategy<Value = u64> {
    prop_oneof![Just(0_u64), 1_u64..=50, 1_u64..=400_000]
}

/// Page sizes spanning single-record pages to the service default.
pub fn page_size_strategy() -> impl Strategy<Value = NonZeroU64> {
    (1_u64..=10_000).prop_filter_map("page size must be non-zero", NonZeroU64::new)
}

fn position_strategy(with_z: bool) -> impl Strategy<Value = Position> {
    let dims = if with_z { 3 } else { 2 };
    proptest::collection::vec(-1.0e6_f64..1.0e6, dims)
}

fn positions_strategy(with_z: bool) -> impl Strategy<Value = Vec<Position>> {
    proptest::collection::vec(position_strategy(with_z), 1..5)
}

/// Any supported geometry, single or multipart, with or without Z.
pub fn geometry_strategy() -> impl Strategy<Value = Geometry> {
    any::<bool>().prop_flat_map(|with_z| {
        prop_oneof![
            position_strategy(with_z).prop_map(Geometry::Point),
            positions_strategy(with_z).prop_map(Geometry::MultiPoint),
            positions_strategy(with_z).prop_map(Geometry::LineString),
            proptest::collection::vec(positions_strategy(with_z), 1..3)
                .prop_map(Geometry::MultiLineString),
            proptest::collection::vec(positions_strategy(false), 1..3).prop_map(Geometry::Polygon),
            proptest::collection::vec(proptest::collection::vec(positions_strategy(false), 1..3), 1..3)
                .prop_map(Geometry::MultiPolygon),
        ]
    })
}
