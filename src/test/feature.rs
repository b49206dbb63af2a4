use geo::coord;

use crate::feature::{Feature, FeatureCollection, MultiPart};

/// Two parts: an L of three vertices and a separate segment.
pub(crate) fn two_part_line() -> Feature {
    Feature::Polyline(
        MultiPart::from_parts(vec![
            vec![
                coord! { x: 0., y: 0. },
                coord! { x: 4., y: 0. },
                coord! { x: 4., y: 1. },
            ],
            vec![coord! { x: 10., y: 10. }, coord! { x: 12., y: 10. }],
        ])
        .unwrap(),
    )
}

pub(crate) fn simple_line() -> Feature {
    Feature::Polyline(
        MultiPart::single(vec![
            coord! { x: -1.5, y: 2.25 },
            coord! { x: 3.0, y: -4.0 },
        ])
        .unwrap(),
    )
}

/// Clockwise unit square, closed.
pub(crate) fn unit_square() -> Feature {
    Feature::Polygon(
        MultiPart::single(vec![
            coord! { x: 0., y: 0. },
            coord! { x: 0., y: 1. },
            coord! { x: 1., y: 1. },
            coord! { x: 1., y: 0. },
            coord! { x: 0., y: 0. },
        ])
        .unwrap(),
    )
}

/// A clockwise 10x10 shell with a counter-clockwise 2x2 hole in the middle.
pub(crate) fn holed_square() -> Feature {
    Feature::Polygon(
        MultiPart::from_parts(vec![
            vec![
                coord! { x: 0., y: 0. },
                coord! { x: 0., y: 10. },
                coord! { x: 10., y: 10. },
                coord! { x: 10., y: 0. },
                coord! { x: 0., y: 0. },
            ],
            vec![
                coord! { x: 4., y: 4. },
                coord! { x: 6., y: 4. },
                coord! { x: 6., y: 6. },
                coord! { x: 4., y: 6. },
                coord! { x: 4., y: 4. },
            ],
        ])
        .unwrap(),
    )
}

/// Ids 1 to 5: point, line, polygon, point, polygon.
pub(crate) fn mixed_collection() -> FeatureCollection {
    vec![
        (1, Feature::point(0., 1.)),
        (2, two_part_line()),
        (3, unit_square()),
        (4, Feature::point(2., 3.)),
        (5, holed_square()),
    ]
    .into_iter()
    .collect()
}

pub(crate) fn points() -> FeatureCollection {
    vec![
        (1, Feature::point(0., 1.)),
        (2, Feature::point(1., 2.)),
        (3, Feature::point(-2.5, 3.75)),
    ]
    .into_iter()
    .collect()
}

pub(crate) fn lines() -> FeatureCollection {
    vec![(1, two_part_line()), (2, simple_line())]
        .into_iter()
        .collect()
}

pub(crate) fn polygons() -> FeatureCollection {
    vec![(1, unit_square()), (2, holed_square())]
        .into_iter()
        .collect()
}
