//! Reshape fetched features into destination rows.

use wfs_replica_core::{FeatureRecord, GeometryType, ValidationError, Value};

use super::{DestinationColumn, GeometryColumn, SpatialRow};

/// Rows of one page, split by whether they carry a geometry.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct NormalisedPage {
    /// Rows with a multipart geometry.
    pub spatial: Vec<SpatialRow>,
    /// Rows without a geometry.
    pub plain: Vec<Vec<Value>>,
}

impl NormalisedPage {
    /// Total rows on the page.
    #[must_use]
    pub fn len(&self) -> usize {
        self.spatial.len() + self.plain.len()
    }

    /// Whether the page holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Project `features` onto `columns`, coerce date columns and promote
/// geometries to their multipart form.
///
/// Attribute names are matched case-insensitively. Geometries are dropped
/// when the relation has no geometry column.
///
/// # Errors
///
/// Fails with [`ValidationError::GeometryMismatch`] when a geometry does not
/// match a typed geometry column.
pub fn normalise_page(
    features: Vec<FeatureRecord>,
    columns: &[DestinationColumn],
    geometry: GeometryColumn,
) -> Result<NormalisedPage, ValidationError> {
    let names: Vec<String> = columns.iter().map(|column| column.name.clone()).collect();
    let mut page = NormalisedPage::default();
    for mut feature in features {
        feature.lowercase_attributes();
        let values: Vec<Value> = feature
            .attributes
            .project(&names)
            .into_iter()
            .zip(columns)
            .map(|(value, column)| {
                if column.is_date() {
                    value.into_date()
                } else {
                    value
                }
            })
            .collect();
        match (feature.geometry, geometry) {
            (Some(shape), GeometryColumn::Typed(expected)) => {
                let shape = shape.into_multi();
                let found = shape.geometry_type();
                if found != expected {
                    return Err(ValidationError::GeometryMismatch { expected, found });
                }
                page.spatial.push(SpatialRow {
                    values,
                    geometry: shape,
                });
            }
            (Some(shape), GeometryColumn::Untyped) => page.spatial.push(SpatialRow {
                values,
                geometry: shape.into_multi(),
            }),
            (None, _) | (Some(_), GeometryColumn::Absent) => page.plain.push(values),
        }
    }
    Ok(page)
}

/// Type of the first geometry among `features`.
#[must_use]
pub fn sampled_geometry_type(features: &[FeatureRecord]) -> Option<GeometryType> {
    features
        .iter()
        .find_map(|feature| feature.geometry.as_ref())
        .map(|geometry| geometry.geometry_type())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rstest::{fixture, rstest};
    use wfs_replica_core::{Attributes, Geometry, GeometryKind};

    #[fixture]
    fn columns() -> Vec<DestinationColumn> {
        vec![
            DestinationColumn {
                name: "seq_id".into(),
                sql_type: "NUMERIC".into(),
                comments: None,
            },
            DestinationColumn {
                name: "open_date".into(),
                sql_type: "DATE".into(),
                comments: None,
            },
        ]
    }

    fn feature(seq: i64, geometry: Option<Geometry>) -> FeatureRecord {
        let attributes: Attributes = [
            ("SEQ_ID".to_owned(), Value::Integer(seq)),
            ("OPEN_DATE".to_owned(), Value::Text("2001-02-03Z".into())),
            ("FEATURE_AREA_SQM".to_owned(), Value::Float(12.5)),
        ]
        .into_iter()
        .collect();
        FeatureRecord::new(None, geometry, attributes)
    }

    fn multipoint() -> GeometryType {
        GeometryType::new(GeometryKind::MultiPoint, false)
    }

    #[rstest]
    fn splits_projects_and_promotes(columns: Vec<DestinationColumn>) {
        let features = vec![
            feature(1, Some(Geometry::Point(vec![1.0, 2.0]))),
            feature(2, None),
            feature(3, Some(Geometry::MultiPoint(vec![vec![3.0, 4.0]]))),
        ];
        let page = normalise_page(features, &columns, GeometryColumn::Typed(multipoint()))
            .expect("consistent page");
        assert_eq!(page.len(), 3);
        assert_eq!(page.plain.len(), 1);
        let date = NaiveDate::from_ymd_opt(2001, 2, 3).expect("valid date");
        assert_eq!(page.spatial[0].values, [Value::Integer(1), Value::Date(date)]);
        assert_eq!(
            page.spatial[0].geometry,
            Geometry::MultiPoint(vec![vec![1.0, 2.0]])
        );
        assert_eq!(page.plain[0], [Value::Integer(2), Value::Date(date)]);
    }

    #[rstest]
    fn rejects_geometries_of_another_kind(columns: Vec<DestinationColumn>) {
        let features = vec![feature(
            1,
            Some(Geometry::LineString(vec![vec![0.0, 0.0], vec![1.0, 1.0]])),
        )];
        let err = normalise_page(features, &columns, GeometryColumn::Typed(multipoint()))
            .expect_err("kind mismatch");
        assert_eq!(
            err,
            ValidationError::GeometryMismatch {
                expected: multipoint(),
                found: GeometryType::new(GeometryKind::MultiLineString, false),
            }
        );
    }

    #[rstest]
    fn drops_geometry_without_a_column(columns: Vec<DestinationColumn>) {
        let features = vec![feature(1, Some(Geometry::Point(vec![1.0, 2.0])))];
        let page = normalise_page(features, &columns, GeometryColumn::Absent).expect("page");
        assert!(page.spatial.is_empty());
        assert_eq!(page.plain.len(), 1);
    }

    #[rstest]
    fn samples_the_first_present_geometry() {
        let features = vec![
            feature(1, None),
            feature(2, Some(Geometry::Point(vec![1.0, 2.0, 3.0]))),
        ];
        assert_eq!(
            sampled_geometry_type(&features),
            Some(GeometryType::new(GeometryKind::Point, true))
        );
        assert_eq!(sampled_geometry_type(&features[..1]), None);
    }
}
