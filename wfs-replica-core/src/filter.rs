//! CQL filter expressions and bounding boxes.

use geo::{Coord, Rect};

use crate::{TableIdentifier, ValidationError};

/// CRS assumed for bounding boxes when the caller names none.
pub const DEFAULT_BOUNDS_CRS: &str = "EPSG:3005";

/// Axis-aligned bounding box with the CRS its ordinates are expressed in.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundingBox {
    rect: Rect<f64>,
    crs: String,
}

impl BoundingBox {
    /// Wrap a rectangle in the given CRS.
    #[must_use]
    pub fn new(rect: Rect<f64>, crs: impl Into<String>) -> Self {
        Self {
            rect,
            crs: crs.into(),
        }
    }

    /// Build from corner ordinates. Corners are normalised so the minimum is
    /// always first.
    #[must_use]
    pub fn from_bounds(min_x: f64, min_y: f64, max_x: f64, max_y: f64, crs: impl Into<String>) -> Self {
        Self::new(
            Rect::new(Coord { x: min_x, y: min_y }, Coord { x: max_x, y: max_y }),
            crs,
        )
    }

    /// Rectangle in [`Self::crs`] units.
    #[must_use]
    pub const fn rect(&self) -> &Rect<f64> {
        &self.rect
    }

    /// CRS of the ordinates.
    #[must_use]
    pub fn crs(&self) -> &str {
        &self.crs
    }

    /// CQL `bbox` clause against `geometry_column`.
    ///
    /// # Examples
    ///
    /// ```
    /// use wfs_replica_core::BoundingBox;
    ///
    /// let bounds = BoundingBox::from_bounds(1_188_000.0, 377_051.0, 1_207_437.0, 390_361.0, "EPSG:3005");
    /// assert_eq!(
    ///     bounds.to_cql("SHAPE"),
    ///     "bbox(SHAPE, 1188000, 377051, 1207437, 390361, 'EPSG:3005')",
    /// );
    /// ```
    #[must_use]
    pub fn to_cql(&self, geometry_column: &str) -> String {
        let min = self.rect.min();
        let max = self.rect.max();
        format!(
            "bbox({geometry_column}, {}, {}, {}, {}, '{}')",
            min.x, min.y, max.x, max.y, self.crs
        )
    }
}

/// Caller-supplied CQL query and bounding box, combined on demand.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterExpression {
    query: Option<String>,
    bbox: Option<BoundingBox>,
}

impl FilterExpression {
    /// Filter matching every record.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            query: None,
            bbox: None,
        }
    }

    /// Restrict records with a CQL expression. Blank text is ignored.
    #[must_use]
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        let query = query.into();
        self.query = (!query.trim().is_empty()).then_some(query);
        self
    }

    /// Restrict records to those intersecting `bbox`.
    #[must_use]
    pub fn with_bbox(mut self, bbox: BoundingBox) -> Self {
        self.bbox = Some(bbox);
        self
    }

    /// CQL query, if any.
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Bounding box, if any.
    #[must_use]
    pub const fn bbox(&self) -> Option<&BoundingBox> {
        self.bbox.as_ref()
    }

    /// Whether neither a query nor a bounding box is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.query.is_none() && self.bbox.is_none()
    }

    /// Render the combined `CQL_FILTER` text. The query and the bounding box
    /// clause are joined with `AND`.
    pub fn to_cql(
        &self,
        table: &TableIdentifier,
        geometry_column: Option<&str>,
    ) -> Result<Option<String>, ValidationError> {
        let bbox_clause = match (&self.bbox, geometry_column) {
            (Some(bbox), Some(column)) => Some(bbox.to_cql(column)),
            (Some(_), None) => {
                return Err(ValidationError::MissingGeometryColumn {
                    table: table.to_string(),
                });
            }
            (None, _) => None,
        };
        Ok(match (self.query.as_deref(), bbox_clause) {
            (Some(query), Some(clause)) => Some(format!("({query}) AND {clause}")),
            (Some(query), None) => Some(query.to_owned()),
            (None, clause) => clause,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn table() -> TableIdentifier {
        TableIdentifier::parse("WHSE_A.B").expect("valid identifier")
    }

    #[fixture]
    fn bounds() -> BoundingBox {
        BoundingBox::from_bounds(10.0, 20.0, 30.0, 40.5, DEFAULT_BOUNDS_CRS)
    }

    #[rstest]
    fn empty_filter_renders_nothing(table: TableIdentifier) {
        assert_eq!(FilterExpression::new().to_cql(&table, Some("SHAPE")), Ok(None));
    }

    #[rstest]
    #[case(
        "AIRPORT_NAME='Victoria Harbour'",
        "(AIRPORT_NAME='Victoria Harbour') AND bbox(SHAPE, 10, 20, 30, 40.5, 'EPSG:3005')"
    )]
    #[case(
        "A=1 OR B=2",
        "(A=1 OR B=2) AND bbox(SHAPE, 10, 20, 30, 40.5, 'EPSG:3005')"
    )]
    fn query_and_bbox_are_conjoined(
        table: TableIdentifier,
        bounds: BoundingBox,
        #[case] query: &str,
        #[case] expected: &str,
    ) {
        let filter = FilterExpression::new().with_query(query).with_bbox(bounds);
        let cql = filter.to_cql(&table, Some("SHAPE")).expect("renders");
        assert_eq!(cql.as_deref(), Some(expected));
    }

    #[rstest]
    fn swapped_corners_are_normalised() {
        let swapped = BoundingBox::from_bounds(30.0, 40.0, 10.0, 20.0, "EPSG:4326");
        assert_eq!(swapped.to_cql("GEOM"), "bbox(GEOM, 10, 20, 30, 40, 'EPSG:4326')");
    }

    #[rstest]
    fn bbox_without_geometry_column_is_rejected(table: TableIdentifier, bounds: BoundingBox) {
        let filter = FilterExpression::new().with_bbox(bounds);
        assert!(matches!(
            filter.to_cql(&table, None),
            Err(ValidationError::MissingGeometryColumn { .. })
        ));
    }

    #[rstest]
    fn blank_query_is_ignored() {
        assert!(FilterExpression::new().with_query("   ").is_empty());
    }
}
