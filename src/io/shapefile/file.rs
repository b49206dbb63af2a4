use std::collections::HashMap;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use geo::{coord, Rect};

use crate::attributes::AttributeTable;
use crate::error::{Result, ShapefileError};
use crate::feature::{FeatureCollection, FeatureKind};
use crate::io::dbase::{decode_table, encode_table_with_options, DbaseWriterOptions};
use crate::io::shapefile::common::ShapefileHeader;
use crate::io::shapefile::reader::decode_geometry;
use crate::io::shapefile::writer::encode_geometry;
use crate::warning::DecodeWarning;

const EXTENSIONS: [&str; 3] = ["shp", "shx", "dbf"];

/// Features and attributes read from a `.shp` and `.dbf` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Shapefile {
    pub header: ShapefileHeader,
    pub features: FeatureCollection,
    /// Extent declared in the geometry file header.
    pub bounds: Rect,
    /// Row `i` describes the feature with id `i + 1`.
    pub attributes: AttributeTable,
    /// Geometry warnings first, then attribute warnings.
    pub warnings: Vec<DecodeWarning>,
}

/// Options for [`write_shapefile_with_options`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShapefileWriterOptions {
    pub dbase: DbaseWriterOptions,
}

impl ShapefileWriterOptions {
    pub fn with_dbase(self, dbase: DbaseWriterOptions) -> Self {
        Self { dbase }
    }
}

/// Read `<base>.shp` and `<base>.dbf`.
///
/// `path` may name either file or the base name without an extension. A missing `.dbf` is not
/// an error: the attributes then hold only the id of each feature, and a
/// [`DecodeWarning::MissingAttributes`] is recorded.
pub fn read_shapefile(path: impl AsRef<Path>) -> Result<Shapefile> {
    let base = base_name(path.as_ref());
    let shp_path = sibling(&base, "", "shp");
    let dbf_path = sibling(&base, "", "dbf");

    let shp = fs::read(&shp_path).map_err(|err| ShapefileError::file(&shp_path, err))?;
    let geometry = decode_geometry(&shp)?;
    let mut warnings = geometry.warnings;

    let attributes = match fs::read(&dbf_path) {
        Ok(dbf) => {
            let decoded = decode_table(&dbf)?;
            warnings.extend(decoded.warnings);
            decoded.table
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            let warning = DecodeWarning::MissingAttributes { path: dbf_path };
            log::warn!("{warning}");
            warnings.push(warning);
            AttributeTable::from_ids(geometry.features.ids())
        }
        Err(err) => return Err(ShapefileError::file(&dbf_path, err)),
    };

    log::debug!(
        "{}: {} features, {} attribute rows",
        shp_path.display(),
        geometry.features.len(),
        attributes.row_count()
    );
    Ok(Shapefile {
        header: geometry.header,
        features: geometry.features,
        bounds: geometry.bounds,
        attributes,
        warnings,
    })
}

/// Write features and their attributes with default options. See
/// [`write_shapefile_with_options`].
pub fn write_shapefile(
    base: impl AsRef<Path>,
    features: &FeatureCollection,
    attributes: &AttributeTable,
) -> Result<Vec<PathBuf>> {
    write_shapefile_with_options(base, features, attributes, &ShapefileWriterOptions::default())
}

/// Write `<base>.shp`, `<base>.shx` and `<base>.dbf`, returning the paths written.
///
/// A shapefile holds one kind of geometry. When `features` holds more than one kind, one set of
/// files is written per kind, with `P`, `L` or `A` appended to the base name for points, lines
/// and areas. The attribute rows of each set are looked up by feature id in column 0 of
/// `attributes`.
///
/// Files are written one at a time; a failure leaves the files already written in place.
pub fn write_shapefile_with_options(
    base: impl AsRef<Path>,
    features: &FeatureCollection,
    attributes: &AttributeTable,
    options: &ShapefileWriterOptions,
) -> Result<Vec<PathBuf>> {
    let base = base_name(base.as_ref());
    let kinds = features.kinds_present();
    if kinds.is_empty() {
        log::debug!("{}: no features to write", base.display());
        return Ok(Vec::new());
    }
    let bounds = features
        .bounds()
        .unwrap_or_else(|| Rect::new(coord! { x: 0., y: 0. }, coord! { x: 0., y: 0. }));

    let mut written = Vec::with_capacity(3 * kinds.len());
    for &kind in &kinds {
        let suffix = if kinds.len() > 1 { kind.file_suffix() } else { "" };
        let encoded = encode_geometry(features, &bounds, kind)?;
        let table = table_for_kind(attributes, features, kind)?;
        let dbf = encode_table_with_options(&table, &options.dbase)?;

        for (extension, bytes) in EXTENSIONS.iter().zip([encoded.shp, encoded.shx, dbf]) {
            let path = sibling(&base, suffix, extension);
            fs::write(&path, bytes).map_err(|err| ShapefileError::file(&path, err))?;
            log::debug!("wrote {}", path.display());
            written.push(path);
        }
    }
    Ok(written)
}

/// The attribute rows of the features of `kind`, in the order their records are written.
fn table_for_kind(
    attributes: &AttributeTable,
    features: &FeatureCollection,
    kind: FeatureKind,
) -> Result<AttributeTable> {
    let ids: Vec<u32> = features.of_kind(kind).map(|(id, _)| id).collect();
    if attributes.column_count() == 0 {
        return Ok(AttributeTable::from_ids(ids));
    }

    let mut rows_by_id = HashMap::with_capacity(attributes.row_count());
    for (row, cells) in attributes.rows().enumerate() {
        if let Some(id) = cells.first() {
            rows_by_id.entry(id.as_str()).or_insert(row);
        }
    }

    let mut selected = attributes.select_rows(&[]);
    for id in ids {
        match rows_by_id.get(id.to_string().as_str()) {
            Some(&row) => selected.push_row(attributes.row(row).unwrap_or_default().to_vec())?,
            None => {
                log::warn!("feature {id} has no attribute row; writing its id only");
                selected.push_row(vec![id.to_string()])?;
            }
        }
    }
    Ok(selected)
}

/// The path without a shapefile extension.
fn base_name(path: &Path) -> PathBuf {
    let known = path
        .extension()
        .is_some_and(|ext| EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e)));
    if known {
        path.with_extension("")
    } else {
        path.to_path_buf()
    }
}

/// `<base><suffix>.<extension>`, keeping any dots already in `base`.
fn sibling(base: &Path, suffix: &str, extension: &str) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    name.push(suffix);
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}
