//! GeoJSON geometries, geometry type names and multipart promotion.

use std::fmt;
use std::fmt::Write as _;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Coordinate tuple as decoded from GeoJSON: `[x, y]` or `[x, y, z]`.
pub type Position = Vec<f64>;

/// Geometry decoded from a GeoJSON feature.
///
/// `GeometryCollection` is deliberately absent; pages containing one fail to
/// decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    /// Single position.
    Point(Position),
    /// Several positions.
    MultiPoint(Vec<Position>),
    /// Ordered positions forming a line.
    LineString(Vec<Position>),
    /// Several lines.
    MultiLineString(Vec<Vec<Position>>),
    /// Exterior ring followed by interior rings.
    Polygon(Vec<Vec<Position>>),
    /// Several polygons.
    MultiPolygon(Vec<Vec<Vec<Position>>>),
}

impl Geometry {
    /// Kind of this geometry, ignoring dimensionality.
    #[must_use]
    pub const fn kind(&self) -> GeometryKind {
        match self {
            Self::Point(_) => GeometryKind::Point,
            Self::MultiPoint(_) => GeometryKind::MultiPoint,
            Self::LineString(_) => GeometryKind::LineString,
            Self::MultiLineString(_) => GeometryKind::MultiLineString,
            Self::Polygon(_) => GeometryKind::Polygon,
            Self::MultiPolygon(_) => GeometryKind::MultiPolygon,
        }
    }

    /// Whether any position carries a third ordinate.
    #[must_use]
    pub fn has_z(&self) -> bool {
        match self {
            Self::Point(p) => is_3d(p),
            Self::MultiPoint(ps) | Self::LineString(ps) => ps.iter().any(|p| is_3d(p)),
            Self::MultiLineString(lines) | Self::Polygon(lines) => {
                lines.iter().flatten().any(|p| is_3d(p))
            }
            Self::MultiPolygon(polygons) => polygons.iter().flatten().flatten().any(|p| is_3d(p)),
        }
    }

    /// Kind and dimensionality together, e.g. `POINTZ`.
    #[must_use]
    pub fn geometry_type(&self) -> GeometryType {
        GeometryType::new(self.kind(), self.has_z())
    }

    /// Promote single-part geometries to their multipart equivalent.
    ///
    /// Multipart inputs are returned unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// use wfs_replica_core::Geometry;
    ///
    /// let point = Geometry::Point(vec![1.0, 2.0]);
    /// let multi = point.into_multi();
    /// assert_eq!(multi, Geometry::MultiPoint(vec![vec![1.0, 2.0]]));
    /// assert_eq!(multi.clone().into_multi(), multi);
    /// ```
    #[must_use]
    pub fn into_multi(self) -> Self {
        match self {
            Self::Point(p) => Self::MultiPoint(vec![p]),
            Self::LineString(line) => Self::MultiLineString(vec![line]),
            Self::Polygon(rings) => Self::MultiPolygon(vec![rings]),
            multi @ (Self::MultiPoint(_) | Self::MultiLineString(_) | Self::MultiPolygon(_)) => {
                multi
            }
        }
    }

    /// Well-known text rendering used when persisting geometries.
    #[must_use]
    pub fn to_wkt(&self) -> String {
        let dims = if self.has_z() { 3 } else { 2 };
        let mut out = String::from(self.kind().as_str());
        if dims == 3 {
            out.push_str(" Z");
        }
        out.push(' ');
        match self {
            Self::Point(p) => {
                out.push('(');
                write_position(&mut out, p, dims);
                out.push(')');
            }
            Self::MultiPoint(points) => write_list(&mut out, points, |o, p| {
                o.push('(');
                write_position(o, p, dims);
                o.push(')');
            }),
            Self::LineString(line) => write_sequence(&mut out, line, dims),
            Self::MultiLineString(lines) | Self::Polygon(lines) => {
                write_list(&mut out, lines, |o, l| write_sequence(o, l, dims));
            }
            Self::MultiPolygon(polygons) => write_list(&mut out, polygons, |o, rings| {
                write_list(o, rings, |inner, ring| write_sequence(inner, ring, dims));
            }),
        }
        out
    }
}

fn is_3d(position: &[f64]) -> bool {
    position.len() >= 3
}

fn write_list<T>(out: &mut String, items: &[T], mut each: impl FnMut(&mut String, &T)) {
    if items.is_empty() {
        out.push_str("EMPTY");
        return;
    }
    out.push('(');
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        each(out, item);
    }
    out.push(')');
}

fn write_sequence(out: &mut String, positions: &[Position], dims: usize) {
    write_list(out, positions, |o, p| write_position(o, p, dims));
}

fn write_position(out: &mut String, position: &[f64], dims: usize) {
    let ordinates = position.iter().chain(std::iter::repeat(&0.0)).take(dims);
    for (i, ordinate) in ordinates.enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&ordinate.to_string());
    }
}

/// Geometry kind without dimensionality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GeometryKind {
    /// `POINT`
    Point,
    /// `MULTIPOINT`
    MultiPoint,
    /// `LINESTRING`
    LineString,
    /// `MULTILINESTRING`
    MultiLineString,
    /// `POLYGON`
    Polygon,
    /// `MULTIPOLYGON`
    MultiPolygon,
}

impl GeometryKind {
    /// Upper-case name as used in type declarations.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Point => "POINT",
            Self::MultiPoint => "MULTIPOINT",
            Self::LineString => "LINESTRING",
            Self::MultiLineString => "MULTILINESTRING",
            Self::Polygon => "POLYGON",
            Self::MultiPolygon => "MULTIPOLYGON",
        }
    }

    /// Whether this is already a multipart kind.
    #[must_use]
    pub const fn is_multi(self) -> bool {
        matches!(
            self,
            Self::MultiPoint | Self::MultiLineString | Self::MultiPolygon
        )
    }

    /// Multipart equivalent of this kind.
    #[must_use]
    pub const fn to_multi(self) -> Self {
        match self {
            Self::Point | Self::MultiPoint => Self::MultiPoint,
            Self::LineString | Self::MultiLineString => Self::MultiLineString,
            Self::Polygon | Self::MultiPolygon => Self::MultiPolygon,
        }
    }

    fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "POINT" => Some(Self::Point),
            "MULTIPOINT" => Some(Self::MultiPoint),
            "LINESTRING" => Some(Self::LineString),
            "MULTILINESTRING" => Some(Self::MultiLineString),
            "POLYGON" => Some(Self::Polygon),
            "MULTIPOLYGON" => Some(Self::MultiPolygon),
            _ => None,
        }
    }
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Geometry kind plus the presence of a Z ordinate, e.g. `MULTILINESTRINGZ`.
///
/// Parsing accepts any case and an optional space before the `Z` suffix.
/// Polygonal types with Z are recognised but not supported.
///
/// # Examples
///
/// ```
/// use wfs_replica_core::{GeometryKind, GeometryType};
///
/// let parsed: GeometryType = "point z".parse().expect("known type");
/// assert_eq!(parsed.kind(), GeometryKind::Point);
/// assert!(parsed.has_z());
/// assert_eq!(parsed.to_multi().to_string(), "MULTIPOINTZ");
/// assert!(GeometryType::parse_supported("MULTIPOLYGONZ").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GeometryType {
    kind: GeometryKind,
    has_z: bool,
}

impl GeometryType {
    /// Combine a kind and a dimensionality flag.
    #[must_use]
    pub const fn new(kind: GeometryKind, has_z: bool) -> Self {
        Self { kind, has_z }
    }

    /// Parse a type name and reject members outside the supported set.
    pub fn parse_supported(raw: &str) -> Result<Self, ValidationError> {
        let parsed: Self = raw.parse()?;
        if parsed.is_supported() {
            Ok(parsed)
        } else {
            Err(ValidationError::UnsupportedGeometryType {
                raw: raw.to_owned(),
            })
        }
    }

    /// Geometry kind.
    #[must_use]
    pub const fn kind(self) -> GeometryKind {
        self.kind
    }

    /// Whether positions carry a Z ordinate.
    #[must_use]
    pub const fn has_z(self) -> bool {
        self.has_z
    }

    /// Whether the destination can store this type.
    #[must_use]
    pub const fn is_supported(self) -> bool {
        !(self.has_z && matches!(self.kind, GeometryKind::Polygon | GeometryKind::MultiPolygon))
    }

    /// Multipart equivalent, keeping dimensionality.
    #[must_use]
    pub const fn to_multi(self) -> Self {
        Self::new(self.kind.to_multi(), self.has_z)
    }
}

impl fmt::Display for GeometryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind.as_str())?;
        if self.has_z {
            f.write_char('Z')?;
        }
        Ok(())
    }
}

impl FromStr for GeometryType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s
            .split_whitespace()
            .collect::<String>()
            .to_ascii_uppercase();
        if let Some(kind) = GeometryKind::from_keyword(&compact) {
            return Ok(Self::new(kind, false));
        }
        compact
            .strip_suffix('Z')
            .and_then(GeometryKind::from_keyword)
            .map(|kind| Self::new(kind, true))
            .ok_or_else(|| ValidationError::UnsupportedGeometryType { raw: s.to_owned() })
    }
}
