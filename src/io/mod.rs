//! Readers and writers for the files of a shapefile, and tab-separated attribute text.

pub mod dbase;
pub mod shapefile;
pub mod tsv;
