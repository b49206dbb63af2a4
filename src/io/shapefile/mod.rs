//! Read and write ESRI shapefiles: the `.shp` geometry file, its `.shx` index and the `.dbf`
//! attribute table beside them.
//!
//! The stream functions work on one file at a time; [`read_shapefile`] and [`write_shapefile`]
//! handle a whole set of files by base name.

mod common;
mod file;
mod reader;
mod writer;

pub use common::{normalize_measure, IndexEntry, ShapeType, ShapefileHeader, HEADER_BYTES, NO_DATA};
pub use file::{
    read_shapefile, write_shapefile, write_shapefile_with_options, Shapefile,
    ShapefileWriterOptions,
};
pub use reader::{decode_geometry, decode_index, read_geometry, DecodedGeometry, DecodedIndex};
pub use writer::{
    encode_geometry, multi_part_content_words, shp_file_words, shx_file_words, write_geometry,
    EncodedShapefile, POINT_CONTENT_WORDS,
};
