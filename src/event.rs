//! The typed events and feature metadata the upstream parser hands to the encoder.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The event currently travelling through the writer chain.
///
/// Exactly one event is current at any time. It is set by the
/// [`FeatureEncoder`][crate::FeatureEncoder] right before the chain is invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    Start,
    End,
    FeatureStart,
    FeatureEnd,
    Property,
    Coordinates,
    GeometryEnd,
}

/// The geometry types that can be encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeometryKind {
    Point,
    MultiPoint,
    LineString,
    MultiLineString,
    Polygon,
    MultiPolygon,
    /// Any source geometry type without a GeoJSON counterpart. Geometries of this kind are
    /// skipped.
    Unknown,
}

impl GeometryKind {
    /// The value of the GeoJSON `type` member, or `None` for [`GeometryKind::Unknown`].
    pub fn geojson_type(&self) -> Option<&'static str> {
        use GeometryKind::*;
        match self {
            Point => Some("Point"),
            MultiPoint => Some("MultiPoint"),
            LineString => Some("LineString"),
            MultiLineString => Some("MultiLineString"),
            Polygon => Some("Polygon"),
            MultiPolygon => Some("MultiPolygon"),
            Unknown => None,
        }
    }

    /// Number of array levels between the `coordinates` member and a single coordinate tuple.
    ///
    /// A `Point` has no enclosing array, a `Polygon` has the polygon and the ring array.
    pub fn coordinate_depth(&self) -> usize {
        use GeometryKind::*;
        match self {
            Point | Unknown => 0,
            MultiPoint | LineString => 1,
            MultiLineString | Polygon => 2,
            MultiPolygon => 3,
        }
    }

    pub fn is_polygonal(&self) -> bool {
        matches!(self, GeometryKind::Polygon | GeometryKind::MultiPolygon)
    }

    pub fn is_lineal(&self) -> bool {
        matches!(self, GeometryKind::LineString | GeometryKind::MultiLineString)
    }

    /// Parses a source geometry type name, case-insensitively. Unknown names map to
    /// [`GeometryKind::Unknown`].
    pub fn from_name(name: &str) -> Self {
        use GeometryKind::*;
        match name.to_ascii_lowercase().as_str() {
            "point" => Point,
            "multipoint" => MultiPoint,
            "linestring" | "curve" => LineString,
            "multilinestring" | "multicurve" => MultiLineString,
            "polygon" | "surface" => Polygon,
            "multipolygon" | "multisurface" => MultiPolygon,
            _ => Unknown,
        }
    }
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.geojson_type().unwrap_or("Unknown"))
    }
}

/// A feature type, i.e. the collection the encoded features belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureType {
    pub name: String,
}

impl FeatureType {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// The declared type of a property value, used to decide how its text is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ValueType {
    #[default]
    String,
    Integer,
    Float,
    Boolean,
    /// The text is a complete JSON document and is embedded as-is.
    Json,
}

/// Where a property ends up in the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetMapping {
    /// The feature `id`.
    Id,
    /// A member of the `properties` object.
    Value(ValueType),
    /// The primary instant of the feature, written as JSON-FG `time`.
    Instant,
    /// The feature geometry.
    Geometry,
}

/// One element of a property path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    pub name: String,
    /// Whether this element can occur more than once. Every multiple segment consumes one entry
    /// of the multiplicities passed with the property.
    pub multiple: bool,
}

impl PathSegment {
    pub fn single(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            multiple: false,
        }
    }

    pub fn multiple(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            multiple: true,
        }
    }
}

/// A property as announced by the upstream parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureProperty {
    pub name: String,
    /// Path from the feature root to the value. The last segment names the value itself.
    pub path: Vec<PathSegment>,
    /// `None` when the property has no target in the output; such properties are skipped.
    pub mapping: Option<TargetMapping>,
}

impl FeatureProperty {
    /// A top-level property with a single path segment equal to its name.
    pub fn new(name: impl Into<String>, mapping: Option<TargetMapping>) -> Self {
        let name = name.into();
        Self {
            path: vec![PathSegment::single(name.clone())],
            name,
            mapping,
        }
    }

    pub fn id(name: impl Into<String>) -> Self {
        Self::new(name, Some(TargetMapping::Id))
    }

    pub fn value(name: impl Into<String>, value_type: ValueType) -> Self {
        Self::new(name, Some(TargetMapping::Value(value_type)))
    }

    pub fn geometry(name: impl Into<String>) -> Self {
        Self::new(name, Some(TargetMapping::Geometry))
    }

    pub fn with_path(self, path: Vec<PathSegment>) -> Self {
        Self { path, ..self }
    }

    pub fn is_id(&self) -> bool {
        matches!(self.mapping, Some(TargetMapping::Id))
    }
}
