use std::io::{Read, Write};

use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};
use geo::{coord, Rect};
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::error::{Result, ShapefileError};
use crate::feature::FeatureKind;

/// Bytes in the header shared by `.shp` and `.shx` files.
pub const HEADER_BYTES: usize = 100;

/// Header length in 16-bit words.
pub(crate) const HEADER_WORDS: u32 = 50;

pub(crate) const FILE_CODE: i32 = 9994;
pub(crate) const VERSION: i32 = 1000;

/// Measures below this are "no data".
const MEASURE_THRESHOLD: f64 = -1e38;

/// The value a missing measure is reported as.
pub const NO_DATA: f64 = f32::MAX as f64;

/// Map measures below the no-data threshold to [`NO_DATA`].
pub fn normalize_measure(measure: f64) -> f64 {
    if measure < MEASURE_THRESHOLD {
        NO_DATA
    } else {
        measure
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(i32)]
pub enum ShapeType {
    Null = 0,
    Point = 1,
    PolyLine = 3,
    Polygon = 5,
    MultiPoint = 8,
    PointZ = 11,
    PolyLineZ = 13,
    PolygonZ = 15,
    MultiPointZ = 18,
    PointM = 21,
    PolyLineM = 23,
    PolygonM = 25,
    MultiPointM = 28,
    MultiPatch = 31,
}

impl ShapeType {
    /// Interpret a shape type code. Multipatch is recognized but not supported.
    pub fn from_code(code: i32) -> Result<Self> {
        match ShapeType::try_from(code) {
            Ok(ShapeType::MultiPatch) => Err(ShapefileError::UnsupportedShapeType(code)),
            Ok(shape_type) => Ok(shape_type),
            Err(_) => Err(ShapefileError::Format(format!("unknown shape type {code}"))),
        }
    }

    /// The plain 2D type used to write features of the given kind.
    pub fn for_kind(kind: FeatureKind) -> Self {
        match kind {
            FeatureKind::Point => ShapeType::Point,
            FeatureKind::Line => ShapeType::PolyLine,
            FeatureKind::Polygon => ShapeType::Polygon,
        }
    }

    /// Whether records carry a Z block.
    pub fn has_z(&self) -> bool {
        matches!(
            self,
            ShapeType::PointZ
                | ShapeType::PolyLineZ
                | ShapeType::PolygonZ
                | ShapeType::MultiPointZ
                | ShapeType::MultiPatch
        )
    }

    /// Whether records may carry an M block. Z types carry one optionally.
    pub fn has_m(&self) -> bool {
        self.has_z()
            || matches!(
                self,
                ShapeType::PointM
                    | ShapeType::PolyLineM
                    | ShapeType::PolygonM
                    | ShapeType::MultiPointM
            )
    }

    /// The feature kind records of this type decode to.
    pub fn kind(&self) -> Option<FeatureKind> {
        match self {
            ShapeType::Point
            | ShapeType::PointZ
            | ShapeType::PointM
            | ShapeType::MultiPoint
            | ShapeType::MultiPointZ
            | ShapeType::MultiPointM => Some(FeatureKind::Point),
            ShapeType::PolyLine | ShapeType::PolyLineZ | ShapeType::PolyLineM => {
                Some(FeatureKind::Line)
            }
            ShapeType::Polygon | ShapeType::PolygonZ | ShapeType::PolygonM => {
                Some(FeatureKind::Polygon)
            }
            ShapeType::Null | ShapeType::MultiPatch => None,
        }
    }
}

/// The 100-byte header at the start of both `.shp` and `.shx` files.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapefileHeader {
    /// Length of the whole file in 16-bit words, header included.
    pub file_length: u32,
    pub version: i32,
    pub shape_type: ShapeType,
    pub bbox: Rect,
    pub z_range: (f64, f64),
    /// Normalized with [`normalize_measure`].
    pub m_range: (f64, f64),
}

impl ShapefileHeader {
    /// A header for a 2D file.
    pub fn new(file_length: u32, shape_type: ShapeType, bbox: Rect) -> Self {
        Self {
            file_length,
            version: VERSION,
            shape_type,
            bbox,
            z_range: (0., 0.),
            m_range: (0., 0.),
        }
    }

    /// File length in bytes.
    pub fn file_bytes(&self) -> usize {
        self.file_length as usize * 2
    }

    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        Self::read_inner(reader).map_err(|err| match err {
            ShapefileError::IOError(err) => ShapefileError::from_decode(err, "shapefile header"),
            err => err,
        })
    }

    fn read_inner<R: Read>(reader: &mut R) -> Result<Self> {
        let file_code = reader.read_i32::<BigEndian>()?;
        if file_code != FILE_CODE {
            return Err(ShapefileError::Format(format!(
                "file code {file_code} is not {FILE_CODE}"
            )));
        }
        // five unused words
        let mut unused = [0; 20];
        reader.read_exact(&mut unused)?;

        let file_length = reader.read_i32::<BigEndian>()?;
        let file_length = u32::try_from(file_length).map_err(|_| {
            ShapefileError::Format(format!("negative file length {file_length}"))
        })?;
        if file_length < HEADER_WORDS {
            return Err(ShapefileError::Format(format!(
                "file length of {file_length} words is shorter than the header"
            )));
        }

        let version = reader.read_i32::<LittleEndian>()?;
        if version != VERSION {
            log::debug!("unexpected shapefile version {version}");
        }
        let shape_type = ShapeType::from_code(reader.read_i32::<LittleEndian>()?)?;

        let min_x = reader.read_f64::<LittleEndian>()?;
        let min_y = reader.read_f64::<LittleEndian>()?;
        let max_x = reader.read_f64::<LittleEndian>()?;
        let max_y = reader.read_f64::<LittleEndian>()?;
        let z_range = (
            reader.read_f64::<LittleEndian>()?,
            reader.read_f64::<LittleEndian>()?,
        );
        let m_range = (
            normalize_measure(reader.read_f64::<LittleEndian>()?),
            normalize_measure(reader.read_f64::<LittleEndian>()?),
        );

        Ok(Self {
            file_length,
            version,
            shape_type,
            bbox: Rect::new(coord! { x: min_x, y: min_y }, coord! { x: max_x, y: max_y }),
            z_range,
            m_range,
        })
    }

    pub fn write<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_i32::<BigEndian>(FILE_CODE)?;
        writer.write_all(&[0; 20])?;
        let file_length = i32::try_from(self.file_length).map_err(|_| {
            ShapefileError::Format(format!(
                "{} words is too long for a shapefile",
                self.file_length
            ))
        })?;
        writer.write_i32::<BigEndian>(file_length)?;
        writer.write_i32::<LittleEndian>(self.version)?;
        writer.write_i32::<LittleEndian>(self.shape_type.into())?;
        write_rect(&mut writer, &self.bbox)?;
        writer.write_f64::<LittleEndian>(self.z_range.0)?;
        writer.write_f64::<LittleEndian>(self.z_range.1)?;
        writer.write_f64::<LittleEndian>(self.m_range.0)?;
        writer.write_f64::<LittleEndian>(self.m_range.1)?;
        Ok(())
    }
}

/// Min x, min y, max x, max y.
pub(crate) fn write_rect<W: Write>(mut writer: W, rect: &Rect) -> Result<()> {
    writer.write_f64::<LittleEndian>(rect.min().x)?;
    writer.write_f64::<LittleEndian>(rect.min().y)?;
    writer.write_f64::<LittleEndian>(rect.max().x)?;
    writer.write_f64::<LittleEndian>(rect.max().y)?;
    Ok(())
}

/// One `.shx` entry: where a record starts in the `.shp` file and how long its content is, both
/// in 16-bit words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    pub offset: u32,
    pub content_length: u32,
}

impl IndexEntry {
    pub(crate) fn write<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_u32::<BigEndian>(self.offset)?;
        writer.write_u32::<BigEndian>(self.content_length)?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use super::*;

    fn header() -> ShapefileHeader {
        ShapefileHeader::new(
            76,
            ShapeType::Polygon,
            Rect::new(coord! { x: -1., y: -2. }, coord! { x: 3., y: 4. }),
        )
    }

    #[test]
    fn layout() {
        let mut buf = Vec::new();
        header().write(&mut buf).unwrap();
        assert_eq!(buf.len(), HEADER_BYTES);
        assert_eq!(&buf[..4], &9994i32.to_be_bytes());
        assert_eq!(&buf[4..24], &[0; 20]);
        assert_eq!(&buf[24..28], &76i32.to_be_bytes());
        assert_eq!(&buf[28..32], &1000i32.to_le_bytes());
        assert_eq!(&buf[32..36], &5i32.to_le_bytes());
        assert_eq!(&buf[36..44], &(-1f64).to_le_bytes());
        assert_eq!(&buf[60..68], &4f64.to_le_bytes());
    }

    #[test]
    fn read_back() {
        let mut buf = Vec::new();
        header().write(&mut buf).unwrap();
        let read = ShapefileHeader::read(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(read, header());
        assert_eq!(read.file_bytes(), 152);
    }

    #[test]
    fn bad_file_code() {
        let mut buf = Vec::new();
        header().write(&mut buf).unwrap();
        buf[3] = 0;
        assert!(matches!(
            ShapefileHeader::read(&mut Cursor::new(&buf)),
            Err(ShapefileError::Format(_))
        ));
    }

    #[test]
    fn short_header() {
        let mut buf = Vec::new();
        header().write(&mut buf).unwrap();
        buf.truncate(60);
        assert!(matches!(
            ShapefileHeader::read(&mut Cursor::new(&buf)),
            Err(ShapefileError::Format(_))
        ));
    }

    #[test]
    fn missing_measures_are_normalized() {
        let mut header = header();
        header.m_range = (-1e39, 12.5);
        let mut buf = Vec::new();
        header.write(&mut buf).unwrap();
        let read = ShapefileHeader::read(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(read.m_range, (NO_DATA, 12.5));
    }

    #[test]
    fn shape_types() {
        assert_eq!(ShapeType::from_code(13).unwrap(), ShapeType::PolyLineZ);
        assert!(matches!(
            ShapeType::from_code(31),
            Err(ShapefileError::UnsupportedShapeType(31))
        ));
        assert!(matches!(
            ShapeType::from_code(2),
            Err(ShapefileError::Format(_))
        ));
        assert!(ShapeType::PointZ.has_z());
        assert!(ShapeType::PointZ.has_m());
        assert!(ShapeType::PolygonM.has_m());
        assert!(!ShapeType::PolygonM.has_z());
        assert!(!ShapeType::MultiPoint.has_m());
        assert_eq!(ShapeType::MultiPointM.kind(), Some(FeatureKind::Point));
        assert_eq!(ShapeType::Null.kind(), None);
        assert_eq!(i32::from(ShapeType::for_kind(FeatureKind::Line)), 3);
    }
}
