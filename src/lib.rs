//! Read and write ESRI shapefiles with their dBase III attribute tables.
//!
//! Geometry is decoded into a [`FeatureCollection`] of points, polylines and polygons keyed by
//! record number. Attributes are decoded into an [`AttributeTable`] of text cells, with numeric
//! views computed by a correctly-rounded decimal converter.
//!
//! ```no_run
//! use geoshape::io::shapefile::{read_shapefile, write_shapefile};
//!
//! let shapefile = read_shapefile("data/roads.shp")?;
//! for warning in &shapefile.warnings {
//!     eprintln!("{warning}");
//! }
//! write_shapefile("out/roads", &shapefile.features, &shapefile.attributes)?;
//! # Ok::<(), geoshape::error::ShapefileError>(())
//! ```

#![cfg_attr(not(test), deny(unused_crate_dependencies))]

pub use attributes::AttributeTable;
pub use error::{Result, ShapefileError};
pub use feature::{ContainsOptions, Feature, FeatureCollection, FeatureKind, MultiPart};
pub use warning::DecodeWarning;

pub mod attributes;
pub mod error;
pub mod feature;
pub mod io;
pub mod number;
#[cfg(test)]
pub(crate) mod test;
pub mod warning;
