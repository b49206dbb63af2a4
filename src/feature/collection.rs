use geo::Rect;
use indexmap::IndexMap;

use crate::feature::{ContainsOptions, Feature, FeatureKind};

/// Aggregate counts over a [`FeatureCollection`], kept up to date as features are inserted and
/// removed. The shapefile writer sizes its output from these without walking the geometry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeatureCounts {
    pub points: usize,
    pub lines: usize,
    pub line_vertices: usize,
    pub line_parts: usize,
    pub polygons: usize,
    pub polygon_vertices: usize,
    pub polygon_parts: usize,
}

impl FeatureCounts {
    fn add(&mut self, feature: &Feature) {
        match feature {
            Feature::Point { .. } => self.points += 1,
            Feature::Polyline(shape) => {
                self.lines += 1;
                self.line_vertices += shape.num_vertices();
                self.line_parts += shape.num_parts();
            }
            Feature::Polygon(shape) => {
                self.polygons += 1;
                self.polygon_vertices += shape.num_vertices();
                self.polygon_parts += shape.num_parts();
            }
        }
    }

    fn subtract(&mut self, feature: &Feature) {
        match feature {
            Feature::Point { .. } => self.points -= 1,
            Feature::Polyline(shape) => {
                self.lines -= 1;
                self.line_vertices -= shape.num_vertices();
                self.line_parts -= shape.num_parts();
            }
            Feature::Polygon(shape) => {
                self.polygons -= 1;
                self.polygon_vertices -= shape.num_vertices();
                self.polygon_parts -= shape.num_parts();
            }
        }
    }

    /// Number of features of the given kind.
    pub fn of_kind(&self, kind: FeatureKind) -> usize {
        match kind {
            FeatureKind::Point => self.points,
            FeatureKind::Line => self.lines,
            FeatureKind::Polygon => self.polygons,
        }
    }

    /// `(parts, vertices)` summed over the features of the given kind.
    pub fn parts_and_vertices(&self, kind: FeatureKind) -> (usize, usize) {
        match kind {
            FeatureKind::Point => (self.points, self.points),
            FeatureKind::Line => (self.line_parts, self.line_vertices),
            FeatureKind::Polygon => (self.polygon_parts, self.polygon_vertices),
        }
    }
}

/// Features keyed by feature id, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureCollection {
    features: IndexMap<u32, Feature>,
    counts: FeatureCounts,
}

impl FeatureCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a feature, returning the feature previously stored under `id`.
    ///
    /// A replaced feature keeps its position in the iteration order.
    pub fn insert(&mut self, id: u32, feature: Feature) -> Option<Feature> {
        self.counts.add(&feature);
        let previous = self.features.insert(id, feature);
        if let Some(previous) = &previous {
            self.counts.subtract(previous);
        }
        previous
    }

    /// Remove a feature, preserving the order of the others.
    pub fn remove(&mut self, id: u32) -> Option<Feature> {
        let removed = self.features.shift_remove(&id);
        if let Some(removed) = &removed {
            self.counts.subtract(removed);
        }
        removed
    }

    pub fn get(&self, id: u32) -> Option<&Feature> {
        self.features.get(&id)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn counts(&self) -> &FeatureCounts {
        &self.counts
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &Feature)> + '_ {
        self.features.iter().map(|(id, feature)| (*id, feature))
    }

    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.features.keys().copied()
    }

    /// Features of one kind, in insertion order.
    pub fn of_kind(&self, kind: FeatureKind) -> impl Iterator<Item = (u32, &Feature)> + '_ {
        self.iter().filter(move |(_, feature)| feature.kind() == kind)
    }

    /// The kinds with at least one feature, in the order points, lines, polygons.
    pub fn kinds_present(&self) -> Vec<FeatureKind> {
        [FeatureKind::Point, FeatureKind::Line, FeatureKind::Polygon]
            .into_iter()
            .filter(|kind| self.counts.of_kind(*kind) > 0)
            .collect()
    }

    /// The rectangle enclosing every feature, or `None` for an empty collection.
    pub fn bounds(&self) -> Option<Rect> {
        self.features
            .values()
            .map(Feature::bounding_rect)
            .reduce(|a, b| {
                Rect::new(
                    geo::coord! { x: a.min().x.min(b.min().x), y: a.min().y.min(b.min().y) },
                    geo::coord! { x: a.max().x.max(b.max().x), y: a.max().y.max(b.max().y) },
                )
            })
    }

    /// Ids of the features that contain the location `(x, y)`.
    pub fn ids_at(&self, x: f64, y: f64, options: &ContainsOptions) -> Vec<u32> {
        self.iter()
            .filter(|(_, feature)| feature.contains(x, y, options))
            .map(|(id, _)| id)
            .collect()
    }
}

impl FromIterator<(u32, Feature)> for FeatureCollection {
    fn from_iter<T: IntoIterator<Item = (u32, Feature)>>(iter: T) -> Self {
        let mut collection = FeatureCollection::new();
        for (id, feature) in iter {
            collection.insert(id, feature);
        }
        collection
    }
}
