//! The in-memory feature model: points, polylines and polygons keyed by feature id.

mod collection;
mod convert;

pub use collection::{FeatureCollection, FeatureCounts};
pub use convert::{feature_to_geo, multi_part_to_line_strings};

use geo::{Contains, Coord, EuclideanDistance, Line, LineString, Point, Rect};
use itertools::Itertools;

use crate::error::{Result, ShapefileError};

/// The geometry kind of a [`Feature`], used to choose which features go into a shapefile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeatureKind {
    Point,
    Line,
    Polygon,
}

impl FeatureKind {
    /// Suffix appended to the base file name when a collection holding several kinds is split
    /// into one shapefile per kind.
    pub fn file_suffix(&self) -> &'static str {
        match self {
            FeatureKind::Point => "P",
            FeatureKind::Line => "L",
            FeatureKind::Polygon => "A",
        }
    }
}

/// Tolerances for [`Feature::contains`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ContainsOptions {
    /// A location within this distance of a point feature matches it.
    pub point_tolerance: f64,

    /// A location within this distance of any segment of a line feature matches it.
    pub line_tolerance: f64,
}

impl ContainsOptions {
    pub fn with_point_tolerance(self, point_tolerance: f64) -> Self {
        Self {
            point_tolerance,
            ..self
        }
    }

    pub fn with_line_tolerance(self, line_tolerance: f64) -> Self {
        Self {
            line_tolerance,
            ..self
        }
    }
}

/// Coordinates of a multi-part shape stored in one flat buffer, with the index of the first
/// vertex of each part.
///
/// Every part holds at least one vertex: `part_starts` begins at 0 and is strictly increasing
/// and below the number of vertices.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiPart {
    coords: Vec<Coord>,
    part_starts: Vec<usize>,
}

impl MultiPart {
    pub fn new(coords: Vec<Coord>, part_starts: Vec<usize>) -> Result<Self> {
        if coords.is_empty() {
            return Err(ShapefileError::Format(
                "a multi-part shape needs at least one vertex".to_string(),
            ));
        }
        if part_starts.first() != Some(&0) {
            return Err(ShapefileError::Format(
                "the first part must start at vertex 0".to_string(),
            ));
        }
        let ordered = part_starts.iter().tuple_windows().all(|(a, b)| a < b);
        if !ordered || part_starts.last().is_some_and(|&last| last >= coords.len()) {
            return Err(ShapefileError::Format(format!(
                "part starts {part_starts:?} do not fit {} vertices",
                coords.len()
            )));
        }
        Ok(Self {
            coords,
            part_starts,
        })
    }

    /// A shape with a single part.
    pub fn single(coords: Vec<Coord>) -> Result<Self> {
        Self::new(coords, vec![0])
    }

    /// Flatten a list of parts.
    pub fn from_parts(parts: impl IntoIterator<Item = Vec<Coord>>) -> Result<Self> {
        let mut coords = Vec::new();
        let mut part_starts = Vec::new();
        for part in parts {
            part_starts.push(coords.len());
            coords.extend(part);
        }
        Self::new(coords, part_starts)
    }

    pub fn coords(&self) -> &[Coord] {
        &self.coords
    }

    pub fn part_starts(&self) -> &[usize] {
        &self.part_starts
    }

    pub fn num_vertices(&self) -> usize {
        self.coords.len()
    }

    pub fn num_parts(&self) -> usize {
        self.part_starts.len()
    }

    /// The vertices of part `i`, if it exists.
    pub fn part(&self, i: usize) -> Option<&[Coord]> {
        let start = *self.part_starts.get(i)?;
        let end = self
            .part_starts
            .get(i + 1)
            .copied()
            .unwrap_or(self.coords.len());
        Some(&self.coords[start..end])
    }

    pub fn parts(&self) -> impl Iterator<Item = &[Coord]> + '_ {
        self.part_starts
            .iter()
            .copied()
            .chain(std::iter::once(self.coords.len()))
            .tuple_windows()
            .map(move |(start, end)| &self.coords[start..end])
    }

    /// Number of vertices in each part.
    pub fn part_lengths(&self) -> Vec<usize> {
        self.parts().map(|part| part.len()).collect()
    }

    pub fn bounding_rect(&self) -> Rect {
        // `new` guarantees at least one vertex
        let first = self.coords[0];
        self.coords[1..].iter().fold(Rect::new(first, first), |rect, c| {
            Rect::new(
                Coord {
                    x: rect.min().x.min(c.x),
                    y: rect.min().y.min(c.y),
                },
                Coord {
                    x: rect.max().x.max(c.x),
                    y: rect.max().y.max(c.y),
                },
            )
        })
    }
}

/// A single geographic feature.
#[derive(Debug, Clone, PartialEq)]
pub enum Feature {
    /// One location, with an elevation when read from a point-Z record.
    Point { coord: Coord, z: Option<f64> },

    /// One or more connected lines.
    Polyline(MultiPart),

    /// One or more rings. Outer rings and holes are not told apart.
    Polygon(MultiPart),
}

impl Feature {
    pub fn point(x: f64, y: f64) -> Self {
        Feature::Point {
            coord: Coord { x, y },
            z: None,
        }
    }

    pub fn kind(&self) -> FeatureKind {
        match self {
            Feature::Point { .. } => FeatureKind::Point,
            Feature::Polyline(_) => FeatureKind::Line,
            Feature::Polygon(_) => FeatureKind::Polygon,
        }
    }

    pub fn num_vertices(&self) -> usize {
        match self {
            Feature::Point { .. } => 1,
            Feature::Polyline(shape) | Feature::Polygon(shape) => shape.num_vertices(),
        }
    }

    pub fn num_parts(&self) -> usize {
        match self {
            Feature::Point { .. } => 1,
            Feature::Polyline(shape) | Feature::Polygon(shape) => shape.num_parts(),
        }
    }

    /// The flattened coordinates, with part boundaries, of a polyline or polygon.
    pub fn multi_part(&self) -> Option<&MultiPart> {
        match self {
            Feature::Point { .. } => None,
            Feature::Polyline(shape) | Feature::Polygon(shape) => Some(shape),
        }
    }

    pub fn bounding_rect(&self) -> Rect {
        match self {
            Feature::Point { coord, .. } => Rect::new(*coord, *coord),
            Feature::Polyline(shape) | Feature::Polygon(shape) => shape.bounding_rect(),
        }
    }

    /// Whether the location `(x, y)` falls on this feature.
    ///
    /// Points and lines match within the tolerances of `options`. Polygons use the even-odd
    /// rule over all of their rings, so a location inside a ring nested in another ring is
    /// outside the polygon.
    pub fn contains(&self, x: f64, y: f64, options: &ContainsOptions) -> bool {
        let location = Point::new(x, y);
        match self {
            Feature::Point { coord, .. } => {
                location.euclidean_distance(&Point::from(*coord)) <= options.point_tolerance
            }
            Feature::Polyline(shape) => shape.parts().any(|part| {
                part.iter().tuple_windows().any(|(start, end)| {
                    location.euclidean_distance(&Line::new(*start, *end)) <= options.line_tolerance
                })
            }),
            Feature::Polygon(shape) => {
                if !shape.bounding_rect().contains(&location) {
                    return false;
                }
                let rings_containing = shape
                    .parts()
                    .filter(|ring| {
                        let ring = geo::Polygon::new(LineString::from(ring.to_vec()), vec![]);
                        ring.contains(&location)
                    })
                    .count();
                rings_containing % 2 == 1
            }
        }
    }
}
