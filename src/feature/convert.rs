use geo::{Contains, Geometry, LineString, MultiLineString, MultiPolygon, Point, Polygon, Winding};

use crate::feature::{Feature, MultiPart};

/// Convert each part of a [`MultiPart`] to a [`geo::LineString`].
pub fn multi_part_to_line_strings(shape: &MultiPart) -> Vec<LineString> {
    shape
        .parts()
        .map(|part| LineString::from(part.to_vec()))
        .collect()
}

/// Convert any [`Feature`] to a [`geo::Geometry`].
///
/// Polygon rings are assembled the way shapefiles orient them: clockwise rings are outer
/// boundaries and counter-clockwise rings are holes of the outer ring that contains them. A hole
/// that no outer ring contains becomes a polygon of its own.
pub fn feature_to_geo(feature: &Feature) -> Geometry {
    match feature {
        Feature::Point { coord, .. } => Geometry::Point(Point::from(*coord)),
        Feature::Polyline(shape) => {
            let mut lines = multi_part_to_line_strings(shape);
            if lines.len() == 1 {
                Geometry::LineString(lines.remove(0))
            } else {
                Geometry::MultiLineString(MultiLineString::new(lines))
            }
        }
        Feature::Polygon(shape) => {
            let mut polygons = rings_to_polygons(multi_part_to_line_strings(shape));
            if polygons.len() == 1 {
                Geometry::Polygon(polygons.remove(0))
            } else {
                Geometry::MultiPolygon(MultiPolygon::new(polygons))
            }
        }
    }
}

fn rings_to_polygons(rings: Vec<LineString>) -> Vec<Polygon> {
    let (outers, holes): (Vec<_>, Vec<_>) = rings
        .into_iter()
        .map(|mut ring| {
            ring.close();
            ring
        })
        .partition(|ring| !ring.is_ccw());

    let mut interiors: Vec<Vec<LineString>> = vec![Vec::new(); outers.len()];
    let mut orphans = Vec::new();
    for hole in holes {
        let shell = outers.iter().position(|outer| {
            let outer = Polygon::new(outer.clone(), vec![]);
            hole.points().all(|p| outer.contains(&p) || outer.exterior().contains(&p))
        });
        match shell {
            Some(index) => interiors[index].push(hole),
            None => orphans.push(hole),
        }
    }

    outers
        .into_iter()
        .zip(interiors)
        .map(|(exterior, interiors)| Polygon::new(exterior, interiors))
        .chain(orphans.into_iter().map(|ring| Polygon::new(ring, vec![])))
        .collect()
}

impl From<&Feature> for Geometry {
    fn from(value: &Feature) -> Self {
        feature_to_geo(value)
    }
}
