use std::io::{self, Cursor, Read};

use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use geo::{Coord, Rect};

use crate::error::{Result, ShapefileError};
use crate::feature::{Feature, FeatureCollection, FeatureKind, MultiPart};
use crate::io::shapefile::common::{IndexEntry, ShapeType, ShapefileHeader, HEADER_BYTES};
use crate::warning::{DecodeWarning, Warnings};

/// Bounding box stored at the start of multipoint, polyline and polygon content.
const RECORD_BBOX_BYTES: u64 = 32;

/// Min and max of a Z or M block.
const RANGE_BYTES: u64 = 16;

/// Features read from a `.shp` file.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedGeometry {
    pub header: ShapefileHeader,
    /// Features keyed by record number. A record whose number is not positive or is already
    /// taken is stored under the next free id.
    pub features: FeatureCollection,
    /// Extent declared in the file header.
    pub bounds: Rect,
    pub warnings: Vec<DecodeWarning>,
}

/// Read a whole `.shp` stream. See [`decode_geometry`].
pub fn read_geometry<R: Read>(mut reader: R) -> Result<DecodedGeometry> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf)?;
    decode_geometry(&buf)
}

/// Decode the records of a `.shp` file up to the length declared in its header.
///
/// Multipatch records, unknown shape types and a stream that ends early abort the read. Damaged
/// part tables, records whose declared length disagrees with their content, and other
/// recoverable problems are repaired and reported in [`DecodedGeometry::warnings`].
///
/// Z values of point records are kept; other Z values and all measures are read past.
pub fn decode_geometry(bytes: &[u8]) -> Result<DecodedGeometry> {
    let mut reader = Cursor::new(bytes);
    let header = ShapefileHeader::read(&mut reader)?;
    let end = header.file_bytes() as u64;
    if end > bytes.len() as u64 {
        log::debug!(
            "header declares {end} bytes but the stream holds {}",
            bytes.len()
        );
    }

    let mut features = FeatureCollection::new();
    let mut warnings = Warnings::default();
    let mut last_id = 0;
    let mut num_records = 0;
    while reader.position() < end {
        num_records += 1;
        let (id, feature) = read_record(&mut reader, last_id, &mut warnings).map_err(|err| {
            match err {
                ShapefileError::IOError(err) => {
                    ShapefileError::from_decode(err, &format!("record {num_records}"))
                }
                err => err,
            }
        })?;
        let id = match feature {
            Some(feature) => {
                let id = if features.get(id).is_some() {
                    let assigned = last_id.max(id) + 1;
                    warnings.push(DecodeWarning::DuplicateRecordNumber {
                        number: id,
                        assigned,
                    });
                    assigned
                } else {
                    id
                };
                features.insert(id, feature);
                id
            }
            None => id,
        };
        last_id = last_id.max(id);
    }

    log::debug!(
        "read {} features from {num_records} records ({} points, {} lines, {} polygons)",
        features.len(),
        features.counts().points,
        features.counts().lines,
        features.counts().polygons,
    );
    Ok(DecodedGeometry {
        bounds: header.bbox,
        header,
        features,
        warnings: warnings.into_vec(),
    })
}

/// Read one record, leaving the reader at the start of the next one.
fn read_record(
    reader: &mut Cursor<&[u8]>,
    last_id: u32,
    warnings: &mut Warnings,
) -> Result<(u32, Option<Feature>)> {
    let number = reader.read_i32::<BigEndian>()?;
    let content_words = reader.read_i32::<BigEndian>()?;
    let declared = u64::try_from(content_words).map_err(|_| {
        ShapefileError::Format(format!(
            "record {number} has negative content length {content_words}"
        ))
    })? * 2;

    let id = match u32::try_from(number) {
        Ok(id) if id > 0 => id,
        _ => {
            let assigned = last_id + 1;
            warnings.push(DecodeWarning::InvalidRecordNumber { number, assigned });
            assigned
        }
    };

    let content_start = reader.position();
    let content_end = content_start + declared;
    let shape_type = ShapeType::from_code(reader.read_i32::<LittleEndian>()?)?;
    log::trace!("record {id}: {shape_type:?}, {declared} bytes");

    let feature = match shape_type {
        ShapeType::Null => None,
        ShapeType::Point | ShapeType::PointZ | ShapeType::PointM => {
            Some(read_point(reader, shape_type, content_end)?)
        }
        ShapeType::MultiPoint | ShapeType::MultiPointZ | ShapeType::MultiPointM => {
            read_multi_point(reader, shape_type, content_end, id, warnings)?
        }
        ShapeType::PolyLine
        | ShapeType::PolyLineZ
        | ShapeType::PolyLineM
        | ShapeType::Polygon
        | ShapeType::PolygonZ
        | ShapeType::PolygonM => read_multi_part(reader, shape_type, content_end, id, warnings)?,
        ShapeType::MultiPatch => return Err(ShapefileError::UnsupportedShapeType(31)),
    };

    let consumed = reader.position() - content_start;
    if consumed != declared {
        warnings.push(DecodeWarning::RecordLengthMismatch {
            record: id,
            declared: declared as usize,
            consumed: consumed as usize,
        });
        if consumed < declared {
            skip(reader, declared - consumed)?;
        }
    }
    Ok((id, feature))
}

fn read_point(
    reader: &mut Cursor<&[u8]>,
    shape_type: ShapeType,
    content_end: u64,
) -> Result<Feature> {
    let coord = read_coord(reader)?;
    let z = if shape_type.has_z() {
        Some(reader.read_f64::<LittleEndian>()?)
    } else {
        None
    };
    // Z points carry a measure only when the record is long enough for one.
    if shape_type.has_m() && reader.position() + 8 <= content_end {
        skip(reader, 8)?;
    }
    Ok(Feature::Point { coord, z })
}

/// Only the last point of a multipoint is kept.
fn read_multi_point(
    reader: &mut Cursor<&[u8]>,
    shape_type: ShapeType,
    content_end: u64,
    id: u32,
    warnings: &mut Warnings,
) -> Result<Option<Feature>> {
    skip(reader, RECORD_BBOX_BYTES)?;
    let num_points = read_count(reader, "points")?;
    ensure_remaining(reader, 16 * num_points as u64)?;

    let mut last = None;
    for _ in 0..num_points {
        last = Some(read_coord(reader)?);
    }

    let mut z = None;
    if shape_type.has_z() {
        skip(reader, RANGE_BYTES)?;
        for _ in 0..num_points {
            z = Some(reader.read_f64::<LittleEndian>()?);
        }
    }
    skip_measures(reader, shape_type, num_points, content_end)?;

    let Some(coord) = last else {
        warnings.push(DecodeWarning::EmptyShape { record: id });
        return Ok(None);
    };
    if num_points > 1 {
        warnings.push(DecodeWarning::MultiPointCollapsed {
            record: id,
            num_points,
        });
    }
    Ok(Some(Feature::Point { coord, z }))
}

fn read_multi_part(
    reader: &mut Cursor<&[u8]>,
    shape_type: ShapeType,
    content_end: u64,
    id: u32,
    warnings: &mut Warnings,
) -> Result<Option<Feature>> {
    skip(reader, RECORD_BBOX_BYTES)?;
    let num_parts = read_count(reader, "parts")?;
    let num_points = read_count(reader, "points")?;
    ensure_remaining(reader, 4 * num_parts as u64 + 16 * num_points as u64)?;

    // All indices are read so the coordinates that follow are found at the right offset.
    let mut indices = Vec::with_capacity(num_parts);
    for _ in 0..num_parts {
        indices.push(reader.read_i32::<LittleEndian>()?);
    }
    let mut coords = Vec::with_capacity(num_points);
    for _ in 0..num_points {
        coords.push(read_coord(reader)?);
    }
    if shape_type.has_z() {
        skip(reader, RANGE_BYTES + 8 * num_points as u64)?;
    }
    skip_measures(reader, shape_type, num_points, content_end)?;

    if coords.is_empty() {
        warnings.push(DecodeWarning::EmptyShape { record: id });
        return Ok(None);
    }

    let part_starts = part_starts(&indices, num_points, id, warnings);
    let shape = MultiPart::new(coords, part_starts)?;
    let feature = match shape_type.kind() {
        Some(FeatureKind::Polygon) => Feature::Polygon(shape),
        _ => Feature::Polyline(shape),
    };
    Ok(Some(feature))
}

/// Turn the stored part indices into strictly increasing part starts.
///
/// The first part always starts at vertex 0. The list is cut at the first index that lies past
/// the last vertex or before the previous part; the last kept part then runs to the end. Parts
/// without vertices are dropped.
fn part_starts(
    indices: &[i32],
    num_points: usize,
    id: u32,
    warnings: &mut Warnings,
) -> Vec<usize> {
    let mut starts = vec![0];
    if indices.is_empty() {
        log::debug!("record {id}: no part indices; reading as one part");
    }
    for (part, &index) in indices.iter().enumerate().skip(1) {
        let previous = starts[starts.len() - 1];
        let start = match usize::try_from(index) {
            Ok(start) if start < num_points && start >= previous => start,
            _ => {
                warnings.push(DecodeWarning::PartIndexCorruption {
                    record: id,
                    part,
                    index: i64::from(index),
                    num_points,
                });
                break;
            }
        };
        if start == previous {
            log::debug!("record {id}: part {part} has no vertices; dropped");
            continue;
        }
        starts.push(start);
    }
    starts
}

fn skip_measures(
    reader: &mut Cursor<&[u8]>,
    shape_type: ShapeType,
    num_points: usize,
    content_end: u64,
) -> io::Result<()> {
    let len = RANGE_BYTES + 8 * num_points as u64;
    if shape_type.has_m() && reader.position() + len <= content_end {
        skip(reader, len)?;
    }
    Ok(())
}

fn read_coord(reader: &mut Cursor<&[u8]>) -> io::Result<Coord> {
    let x = reader.read_f64::<LittleEndian>()?;
    let y = reader.read_f64::<LittleEndian>()?;
    Ok(Coord { x, y })
}

fn read_count(reader: &mut Cursor<&[u8]>, what: &str) -> Result<usize> {
    let count = reader.read_i32::<LittleEndian>()?;
    usize::try_from(count)
        .map_err(|_| ShapefileError::Format(format!("negative number of {what}: {count}")))
}

fn remaining(reader: &Cursor<&[u8]>) -> u64 {
    (reader.get_ref().len() as u64).saturating_sub(reader.position())
}

/// Fail before allocating for counts the stream cannot hold.
fn ensure_remaining(reader: &Cursor<&[u8]>, len: u64) -> io::Result<()> {
    if len > remaining(reader) {
        return Err(io::ErrorKind::UnexpectedEof.into());
    }
    Ok(())
}

fn skip(reader: &mut Cursor<&[u8]>, len: u64) -> io::Result<()> {
    ensure_remaining(reader, len)?;
    reader.set_position(reader.position() + len);
    Ok(())
}

/// The header and entries of a `.shx` file.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedIndex {
    pub header: ShapefileHeader,
    pub entries: Vec<IndexEntry>,
}

/// Decode a `.shx` file.
pub fn decode_index(bytes: &[u8]) -> Result<DecodedIndex> {
    let mut reader = Cursor::new(bytes);
    let header = ShapefileHeader::read(&mut reader)?;
    let num_entries = header.file_bytes().saturating_sub(HEADER_BYTES) / 8;
    let mut entries = Vec::with_capacity(num_entries.min(bytes.len() / 8));
    for i in 0..num_entries {
        let entry = read_index_entry(&mut reader)
            .map_err(|err| ShapefileError::from_decode(err, &format!("index entry {}", i + 1)))?;
        entries.push(entry);
    }
    Ok(DecodedIndex { header, entries })
}

fn read_index_entry(reader: &mut Cursor<&[u8]>) -> io::Result<IndexEntry> {
    Ok(IndexEntry {
        offset: reader.read_u32::<BigEndian>()?,
        content_length: reader.read_u32::<BigEndian>()?,
    })
}
