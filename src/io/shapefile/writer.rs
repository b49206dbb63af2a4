use std::io::Write;

use byteorder::{BigEndian, LittleEndian, WriteBytesExt};
use geo::Rect;

use crate::error::{Result, ShapefileError};
use crate::feature::{Feature, FeatureCollection, FeatureCounts, FeatureKind, MultiPart};
use crate::io::shapefile::common::{
    write_rect, IndexEntry, ShapeType, ShapefileHeader, HEADER_WORDS,
};

/// Record header length in words.
const RECORD_HEADER_WORDS: u64 = 4;

/// Content length of a point record in words: shape type and one coordinate.
pub const POINT_CONTENT_WORDS: u32 = 10;

/// Content length of a polyline or polygon record, in words.
///
/// - 2: shape type
/// - 16: bounding box
/// - 4: number of parts and number of points
/// - 2 per part index
/// - 8 per vertex
pub fn multi_part_content_words(num_parts: usize, num_vertices: usize) -> u64 {
    2 + 16 + 4 + 2 * num_parts as u64 + 8 * num_vertices as u64
}

/// Length in words of the `.shp` file holding every feature of `kind`, computed from the
/// aggregate counts alone.
pub fn shp_file_words(counts: &FeatureCounts, kind: FeatureKind) -> u64 {
    let records = counts.of_kind(kind) as u64;
    match kind {
        FeatureKind::Point => {
            HEADER_WORDS as u64 + records * (RECORD_HEADER_WORDS + POINT_CONTENT_WORDS as u64)
        }
        FeatureKind::Line | FeatureKind::Polygon => {
            let (parts, vertices) = counts.parts_and_vertices(kind);
            HEADER_WORDS as u64
                + records * (RECORD_HEADER_WORDS + multi_part_content_words(0, 0))
                + 2 * parts as u64
                + 8 * vertices as u64
        }
    }
}

/// Length in words of a `.shx` file with `num_records` entries.
pub fn shx_file_words(num_records: usize) -> u64 {
    HEADER_WORDS as u64 + 4 * num_records as u64
}

/// The geometry and index files of one shapefile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedShapefile {
    pub shp: Vec<u8>,
    pub shx: Vec<u8>,
}

/// Encode the features of one kind. See [`write_geometry`].
pub fn encode_geometry(
    features: &FeatureCollection,
    bounds: &Rect,
    kind: FeatureKind,
) -> Result<EncodedShapefile> {
    let counts = features.counts();
    let mut shp = Vec::with_capacity(shp_file_words(counts, kind) as usize * 2);
    let mut shx = Vec::with_capacity(shx_file_words(counts.of_kind(kind)) as usize * 2);
    write_geometry(features, bounds, kind, &mut shp, &mut shx)?;
    Ok(EncodedShapefile { shp, shx })
}

/// Write every feature of `kind` as a plain 2D record, with one index entry per record.
///
/// Features of other kinds are left out, and Z values are not written. Records are numbered
/// from 1 in collection order.
pub fn write_geometry<W1: Write, W2: Write>(
    features: &FeatureCollection,
    bounds: &Rect,
    kind: FeatureKind,
    mut shp: W1,
    mut shx: W2,
) -> Result<()> {
    let counts = features.counts();
    let shape_type = ShapeType::for_kind(kind);
    let num_records = counts.of_kind(kind);

    let shp_words = to_words(shp_file_words(counts, kind))?;
    let shx_words = to_words(shx_file_words(num_records))?;
    ShapefileHeader::new(shp_words, shape_type, *bounds).write(&mut shp)?;
    ShapefileHeader::new(shx_words, shape_type, *bounds).write(&mut shx)?;

    let mut offset = HEADER_WORDS;
    for (number, (id, feature)) in features.of_kind(kind).enumerate() {
        let number = i32::try_from(number + 1)
            .map_err(|_| ShapefileError::Format(format!("too many records at feature {id}")))?;
        let content_length = match feature {
            Feature::Point { coord, .. } => {
                write_record_header(&mut shp, number, POINT_CONTENT_WORDS)?;
                shp.write_i32::<LittleEndian>(shape_type.into())?;
                shp.write_f64::<LittleEndian>(coord.x)?;
                shp.write_f64::<LittleEndian>(coord.y)?;
                POINT_CONTENT_WORDS
            }
            Feature::Polyline(shape) | Feature::Polygon(shape) => {
                let words = to_words(multi_part_content_words(
                    shape.num_parts(),
                    shape.num_vertices(),
                ))?;
                write_record_header(&mut shp, number, words)?;
                write_multi_part(&mut shp, shape_type, shape)?;
                words
            }
        };
        IndexEntry {
            offset,
            content_length,
        }
        .write(&mut shx)?;
        offset += RECORD_HEADER_WORDS as u32 + content_length;
        log::trace!("feature {id} written as record {number}");
    }
    debug_assert_eq!(offset, shp_words);

    log::debug!("wrote {num_records} {kind:?} records, {shp_words} words");
    Ok(())
}

fn write_record_header<W: Write>(mut writer: W, number: i32, content_words: u32) -> Result<()> {
    writer.write_i32::<BigEndian>(number)?;
    writer.write_u32::<BigEndian>(content_words)?;
    Ok(())
}

/// Write polyline or polygon content, bounding box first.
fn write_multi_part<W: Write>(
    mut writer: W,
    shape_type: ShapeType,
    shape: &MultiPart,
) -> Result<()> {
    writer.write_i32::<LittleEndian>(shape_type.into())?;
    write_rect(&mut writer, &shape.bounding_rect())?;
    writer.write_i32::<LittleEndian>(to_i32(shape.num_parts())?)?;
    writer.write_i32::<LittleEndian>(to_i32(shape.num_vertices())?)?;
    for &start in shape.part_starts() {
        writer.write_i32::<LittleEndian>(to_i32(start)?)?;
    }
    for coord in shape.coords() {
        writer.write_f64::<LittleEndian>(coord.x)?;
        writer.write_f64::<LittleEndian>(coord.y)?;
    }
    Ok(())
}

/// Lengths are stored as signed 32-bit words.
fn to_words(words: u64) -> Result<u32> {
    i32::try_from(words)
        .map(|words| words as u32)
        .map_err(|_| ShapefileError::Format(format!("{words} words is too long for a shapefile")))
}

fn to_i32(count: usize) -> Result<i32> {
    i32::try_from(count)
        .map_err(|_| ShapefileError::Format(format!("{count} is too large for a shapefile")))
}

#[cfg(test)]
mod test {
    use geo::coord;

    use super::*;
    use crate::io::shapefile::{decode_geometry, decode_index};
    use crate::test::feature::{lines, mixed_collection, points, polygons, two_part_line};

    fn bounds() -> Rect {
        Rect::new(coord! { x: 0., y: 0. }, coord! { x: 12., y: 10. })
    }

    #[test]
    fn point_file_layout() {
        let collection = points();
        let encoded = encode_geometry(&collection, &bounds(), FeatureKind::Point).unwrap();
        let n = collection.len();
        assert_eq!(encoded.shp.len(), 100 + 28 * n);
        assert_eq!(encoded.shx.len(), 100 + 8 * n);

        let first = &encoded.shp[100..128];
        assert_eq!(&first[..4], &1i32.to_be_bytes());
        assert_eq!(&first[4..8], &10i32.to_be_bytes());
        assert_eq!(&first[8..12], &1i32.to_le_bytes());
        let (_, feature) = collection.iter().next().unwrap();
        let Feature::Point { coord, .. } = feature else {
            panic!("expected a point");
        };
        assert_eq!(&first[12..20], &coord.x.to_le_bytes());
        assert_eq!(&first[20..28], &coord.y.to_le_bytes());
    }

    #[test]
    fn sizes_come_from_counts() {
        let collection = lines();
        let encoded = encode_geometry(&collection, &bounds(), FeatureKind::Line).unwrap();
        let words = shp_file_words(collection.counts(), FeatureKind::Line);
        assert_eq!(encoded.shp.len() as u64, words * 2);
        let declared = i32::from_be_bytes(encoded.shp[24..28].try_into().unwrap());
        assert_eq!(declared as u64, words);
    }

    #[test]
    fn index_points_at_records() {
        let collection = polygons();
        let encoded = encode_geometry(&collection, &bounds(), FeatureKind::Polygon).unwrap();
        let index = decode_index(&encoded.shx).unwrap();
        assert_eq!(index.entries.len(), collection.len());
        assert_eq!(index.entries[0].offset, 50);
        for (entry, (_, feature)) in index.entries.iter().zip(collection.iter()) {
            let start = entry.offset as usize * 2;
            let number = i32::from_be_bytes(encoded.shp[start..start + 4].try_into().unwrap());
            let length = i32::from_be_bytes(encoded.shp[start + 4..start + 8].try_into().unwrap());
            assert!(number > 0);
            assert_eq!(length as u32, entry.content_length);
            let shape = feature.multi_part().unwrap();
            assert_eq!(
                entry.content_length as u64,
                multi_part_content_words(shape.num_parts(), shape.num_vertices())
            );
        }
    }

    #[test]
    fn record_bbox_is_the_feature_extent() {
        let mut collection = FeatureCollection::new();
        collection.insert(9, two_part_line());
        let encoded = encode_geometry(&collection, &bounds(), FeatureKind::Line).unwrap();
        let bbox: Vec<f64> = encoded.shp[112..144]
            .chunks_exact(8)
            .map(|b| f64::from_le_bytes(b.try_into().unwrap()))
            .collect();
        assert_eq!(bbox, vec![0., 0., 12., 10.]);
    }

    #[test]
    fn only_the_requested_kind_is_written() {
        let collection = mixed_collection();
        let encoded = encode_geometry(&collection, &bounds(), FeatureKind::Polygon).unwrap();
        let decoded = decode_geometry(&encoded.shp).unwrap();
        assert!(decoded.warnings.is_empty());
        assert_eq!(decoded.features.len(), 2);
        assert_eq!(decoded.header.shape_type, ShapeType::Polygon);
        // renumbered from 1
        assert_eq!(decoded.features.ids().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(decoded.features.get(2), collection.get(5));
    }

    #[test]
    fn part_spans_survive() {
        for kind in [FeatureKind::Point, FeatureKind::Line, FeatureKind::Polygon] {
            let collection = mixed_collection();
            let encoded = encode_geometry(&collection, &bounds(), kind).unwrap();
            let decoded = decode_geometry(&encoded.shp).unwrap();
            assert!(decoded.warnings.is_empty());
            let written: Vec<_> = collection.of_kind(kind).map(|(_, f)| f.clone()).collect();
            let read: Vec<_> = decoded.features.iter().map(|(_, f)| f.clone()).collect();
            assert_eq!(read, written);
            assert_eq!(
                decoded.features.counts().parts_and_vertices(kind),
                collection.counts().parts_and_vertices(kind)
            );
            assert_eq!(decoded.bounds, bounds());
        }
    }

    /// One shape per part count from 1 to 8 and per length pattern, single-vertex parts included.
    fn part_grid(kind: FeatureKind) -> FeatureCollection {
        let patterns: [fn(usize) -> usize; 3] =
            [|_| 1, |part| part + 1, |part| (part * 7 + 3) % 5 + 1];
        let mut collection = FeatureCollection::new();
        let mut id = 0;
        for num_parts in 1..=8 {
            for pattern in patterns {
                let parts = (0..num_parts).map(|part| {
                    (0..pattern(part))
                        .map(|i| coord! { x: (id * 10 + part) as f64, y: i as f64 })
                        .collect::<Vec<_>>()
                });
                let shape = MultiPart::from_parts(parts).unwrap();
                id += 1;
                let feature = match kind {
                    FeatureKind::Polygon => Feature::Polygon(shape),
                    _ => Feature::Polyline(shape),
                };
                collection.insert(id as u32, feature);
            }
        }
        collection
    }

    #[test]
    fn part_grid_survives() {
        for kind in [FeatureKind::Line, FeatureKind::Polygon] {
            let collection = part_grid(kind);
            let bounds = collection.bounds().unwrap();
            let encoded = encode_geometry(&collection, &bounds, kind).unwrap();
            let decoded = decode_geometry(&encoded.shp).unwrap();
            let index = decode_index(&encoded.shx).unwrap();
            assert!(decoded.warnings.is_empty(), "{:?}", decoded.warnings);
            assert_eq!(decoded.features.len(), collection.len());
            assert_eq!(index.entries.len(), collection.len());

            let written = collection.iter().zip(decoded.features.iter()).zip(&index.entries);
            for (((id, feature), (_, read)), entry) in written {
                let expected = feature.multi_part().unwrap();
                let shape = read.multi_part().unwrap();
                assert_eq!(read.kind(), kind);
                assert_eq!(shape.part_starts(), expected.part_starts(), "feature {id}");
                assert_eq!(shape.part_lengths(), expected.part_lengths(), "feature {id}");
                assert_eq!(shape.coords(), expected.coords(), "feature {id}");
                assert_eq!(
                    entry.content_length as u64,
                    multi_part_content_words(expected.num_parts(), expected.num_vertices())
                );
            }
            assert_eq!(
                decoded.features.counts().parts_and_vertices(kind),
                collection.counts().parts_and_vertices(kind)
            );
        }
    }

    #[test]
    fn empty_family() {
        let encoded = encode_geometry(&points(), &bounds(), FeatureKind::Polygon).unwrap();
        assert_eq!(encoded.shp.len(), 100);
        assert_eq!(encoded.shx.len(), 100);
        assert!(decode_geometry(&encoded.shp).unwrap().features.is_empty());
    }
}
