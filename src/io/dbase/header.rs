use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use chrono::{Datelike, NaiveDate};
use num_enum::FromPrimitive;

use crate::error::{Result, ShapefileError};
use crate::io::dbase::{latin1_to_string, string_to_latin1};

pub(crate) const VERSION: u8 = 0x03;
pub(crate) const HEADER_TERMINATOR: u8 = 0x0D;
pub(crate) const END_OF_FILE: u8 = 0x1A;
pub(crate) const DELETED: u8 = b'*';
pub(crate) const NOT_DELETED: u8 = b' ';

const FILE_HEADER_BYTES: usize = 32;
const FIELD_DESCRIPTOR_BYTES: usize = 32;
const FIELD_NAME_BYTES: usize = 11;

/// Longest field name the format can hold.
pub const MAX_FIELD_NAME_LEN: usize = 10;

/// Field type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
#[repr(u8)]
pub enum FieldType {
    /// `C`
    Character = 0x43,
    /// `N`
    Numeric = 0x4e,
    /// `F`
    Float = 0x46,
    /// `L`
    Logical = 0x4c,
    /// `D`
    Date = 0x44,
    #[num_enum(catch_all)]
    Other(u8),
}

impl FieldType {
    /// Parse a type code, accepting lower case.
    pub fn from_code(code: u8) -> Self {
        FieldType::from_primitive(code.to_ascii_uppercase())
    }

    pub fn code(&self) -> u8 {
        match self {
            FieldType::Character => b'C',
            FieldType::Numeric => b'N',
            FieldType::Float => b'F',
            FieldType::Logical => b'L',
            FieldType::Date => b'D',
            FieldType::Other(code) => *code,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub field_type: FieldType,
    /// Width of the field in each record, in bytes.
    pub length: u8,
    pub decimal_count: u8,
}

impl FieldDescriptor {
    pub fn new(
        name: impl Into<String>,
        field_type: FieldType,
        length: u8,
        decimal_count: u8,
    ) -> Self {
        Self {
            name: name.into(),
            field_type,
            length,
            decimal_count,
        }
    }

    fn read(buf: &[u8]) -> Self {
        let name_bytes = &buf[..FIELD_NAME_BYTES];
        let name_end = name_bytes
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(FIELD_NAME_BYTES);
        Self {
            name: latin1_to_string(&name_bytes[..name_end]).trim().to_string(),
            field_type: FieldType::from_code(buf[11]),
            length: buf[16],
            decimal_count: buf[17],
        }
    }

    fn write<W: Write>(&self, mut writer: W) -> Result<()> {
        let mut name = string_to_latin1(&self.name);
        name.truncate(MAX_FIELD_NAME_LEN);
        name.resize(FIELD_NAME_BYTES, 0);
        writer.write_all(&name)?;
        writer.write_u8(self.field_type.code())?;
        // field data address, unused
        writer.write_all(&[0; 4])?;
        writer.write_u8(self.length)?;
        writer.write_u8(self.decimal_count)?;
        writer.write_all(&[0; 14])?;
        Ok(())
    }
}

/// The header of a dBase III file: file summary followed by the field descriptors.
#[derive(Debug, Clone, PartialEq)]
pub struct DbaseHeader {
    pub version: u8,
    /// `None` when the stored date is not a calendar date.
    pub last_update: Option<NaiveDate>,
    pub num_records: u32,
    /// Bytes before the first record.
    pub header_length: u16,
    /// Bytes per record, including the deletion flag.
    pub record_length: u16,
    pub fields: Vec<FieldDescriptor>,
}

impl DbaseHeader {
    /// A header describing `num_records` records of the given fields, with lengths computed.
    pub fn new(
        fields: Vec<FieldDescriptor>,
        num_records: u32,
        last_update: NaiveDate,
    ) -> Result<Self> {
        let header_length = FILE_HEADER_BYTES + FIELD_DESCRIPTOR_BYTES * fields.len() + 1;
        let record_length = 1 + fields.iter().map(|f| f.length as usize).sum::<usize>();
        let header_length = u16::try_from(header_length).map_err(|_| {
            ShapefileError::InvalidTable(format!("{} fields do not fit a header", fields.len()))
        })?;
        let record_length = u16::try_from(record_length).map_err(|_| {
            ShapefileError::InvalidTable(format!("records of {record_length} bytes are too long"))
        })?;
        Ok(Self {
            version: VERSION,
            last_update: Some(last_update),
            num_records,
            header_length,
            record_length,
            fields,
        })
    }

    /// Read a header, leaving `reader` at the first record.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        Self::read_inner(reader).map_err(|err| match err {
            ShapefileError::IOError(err) => ShapefileError::from_decode(err, "attribute header"),
            err => err,
        })
    }

    fn read_inner<R: Read>(reader: &mut R) -> Result<Self> {
        let version = reader.read_u8()?;
        let year = reader.read_u8()?;
        let month = reader.read_u8()?;
        let day = reader.read_u8()?;
        let last_update =
            NaiveDate::from_ymd_opt(1900 + i32::from(year), u32::from(month), u32::from(day));
        let num_records = reader.read_u32::<LittleEndian>()?;
        let header_length = reader.read_u16::<LittleEndian>()?;
        let record_length = reader.read_u16::<LittleEndian>()?;
        let mut reserved = [0; FILE_HEADER_BYTES - 12];
        reader.read_exact(&mut reserved)?;

        if (header_length as usize) < FILE_HEADER_BYTES + 1 {
            return Err(ShapefileError::Format(format!(
                "attribute header length {header_length} is too short"
            )));
        }
        let mut descriptors = vec![0; header_length as usize - FILE_HEADER_BYTES];
        reader.read_exact(&mut descriptors)?;

        let fields: Vec<_> = descriptors
            .chunks_exact(FIELD_DESCRIPTOR_BYTES)
            .take_while(|chunk| chunk[0] != HEADER_TERMINATOR)
            .map(FieldDescriptor::read)
            .collect();

        let used = 1 + fields.iter().map(|f| f.length as usize).sum::<usize>();
        if record_length == 0 || used > record_length as usize {
            return Err(ShapefileError::Format(format!(
                "fields need {used} bytes per record but records hold {record_length}"
            )));
        }
        log::debug!(
            "attribute header: {} fields, {num_records} records of {record_length} bytes",
            fields.len()
        );

        Ok(Self {
            version,
            last_update,
            num_records,
            header_length,
            record_length,
            fields,
        })
    }

    pub fn write<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_u8(self.version)?;
        let (year, month, day) = match self.last_update {
            Some(date) => (
                (date.year() - 1900).clamp(0, 255) as u8,
                date.month() as u8,
                date.day() as u8,
            ),
            None => (0, 1, 1),
        };
        writer.write_all(&[year, month, day])?;
        writer.write_u32::<LittleEndian>(self.num_records)?;
        writer.write_u16::<LittleEndian>(self.header_length)?;
        writer.write_u16::<LittleEndian>(self.record_length)?;
        writer.write_all(&[0; FILE_HEADER_BYTES - 12])?;
        for field in &self.fields {
            field.write(&mut writer)?;
        }
        writer.write_u8(HEADER_TERMINATOR)?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use super::*;

    fn header() -> DbaseHeader {
        DbaseHeader::new(
            vec![
                FieldDescriptor::new("NAME", FieldType::Character, 12, 0),
                FieldDescriptor::new("POP", FieldType::Numeric, 9, 0),
                FieldDescriptor::new("AREA", FieldType::Numeric, 10, 3),
            ],
            42,
            NaiveDate::from_ymd_opt(2017, 3, 4).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn lengths_follow_fields() {
        let header = header();
        assert_eq!(header.header_length, 32 + 3 * 32 + 1);
        assert_eq!(header.record_length, 1 + 12 + 9 + 10);
    }

    #[test]
    fn layout() {
        let mut buf = Vec::new();
        header().write(&mut buf).unwrap();
        assert_eq!(buf.len(), 129);
        assert_eq!(&buf[..4], &[0x03, 117, 3, 4]);
        assert_eq!(&buf[4..8], &42u32.to_le_bytes());
        assert_eq!(&buf[8..10], &129u16.to_le_bytes());
        assert_eq!(&buf[32..43], b"NAME\0\0\0\0\0\0\0");
        assert_eq!(buf[43], b'C');
        assert_eq!(buf[48], 12);
        assert_eq!(buf[64 + 11], b'N');
        assert_eq!(buf[96 + 17], 3);
        assert_eq!(buf[128], HEADER_TERMINATOR);
    }

    #[test]
    fn read_back() {
        let mut buf = Vec::new();
        header().write(&mut buf).unwrap();
        let read = DbaseHeader::read(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(read, header());
    }

    #[test]
    fn long_names_are_cut() {
        let mut buf = Vec::new();
        FieldDescriptor::new("POPULATION_2020", FieldType::Numeric, 9, 0)
            .write(&mut buf)
            .unwrap();
        assert_eq!(FieldDescriptor::read(&buf).name, "POPULATION");
    }

    #[test]
    fn type_codes() {
        assert_eq!(FieldType::from_code(b'c'), FieldType::Character);
        assert_eq!(FieldType::from_code(b'M'), FieldType::Other(b'M'));
        assert_eq!(FieldType::Other(b'M').code(), b'M');
        assert_eq!(FieldType::Date.code(), b'D');
    }

    #[test]
    fn truncated_header_is_a_format_error() {
        let mut buf = Vec::new();
        header().write(&mut buf).unwrap();
        buf.truncate(70);
        assert!(matches!(
            DbaseHeader::read(&mut Cursor::new(&buf)),
            Err(ShapefileError::Format(_))
        ));
    }

    #[test]
    fn fields_wider_than_records_are_rejected() {
        let mut header = header();
        header.record_length = 10;
        let mut buf = Vec::new();
        header.write(&mut buf).unwrap();
        assert!(matches!(
            DbaseHeader::read(&mut Cursor::new(&buf)),
            Err(ShapefileError::Format(_))
        ));
    }
}
