use std::io::{Cursor, ErrorKind, Read};

use chrono::NaiveDate;

use crate::attributes::AttributeTable;
use crate::error::{Result, ShapefileError};
use crate::io::dbase::header::{DbaseHeader, FieldDescriptor, FieldType, DELETED, END_OF_FILE};
use crate::io::dbase::latin1_to_string;
use crate::number::{format_f64, is_padding, parse_f64, parse_i32, parse_i64};
use crate::warning::{DecodeWarning, Warnings};

/// An attribute table read from a dBase file.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedTable {
    pub header: DbaseHeader,
    /// Column 0 is the 1-based row number; the file's fields follow in order.
    pub table: AttributeTable,
    pub warnings: Vec<DecodeWarning>,
}

/// Decode a dBase file held in memory.
pub fn decode_table(bytes: &[u8]) -> Result<DecodedTable> {
    read_table(Cursor::new(bytes))
}

/// Read a dBase file into an [`AttributeTable`].
///
/// Records flagged as deleted are skipped. Cells that cannot be interpreted are replaced and
/// reported as warnings; only a malformed header or an I/O failure is an error.
pub fn read_table<R: Read>(mut reader: R) -> Result<DecodedTable> {
    let header = DbaseHeader::read(&mut reader)?;
    let mut warnings = Warnings::default();

    for field in &header.fields {
        if let FieldType::Other(code) = field.field_type {
            warnings.push(DecodeWarning::UnknownFieldType {
                field: field.name.clone(),
                code: char::from(code),
            });
        }
    }

    let mut headings = Vec::with_capacity(header.fields.len() + 1);
    headings.push("id".to_string());
    headings.extend(header.fields.iter().map(|field| field.name.clone()));
    let mut table = AttributeTable::with_headings(headings);

    let mut record = vec![0; header.record_length as usize];
    for physical in 0..header.num_records as usize {
        match reader.read_exact(&mut record) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::UnexpectedEof => {
                warnings.push(DecodeWarning::TruncatedTable {
                    expected: header.num_records as usize,
                    read: physical,
                });
                break;
            }
            Err(err) => return Err(ShapefileError::IOError(err)),
        }
        if record[0] == END_OF_FILE {
            warnings.push(DecodeWarning::TruncatedTable {
                expected: header.num_records as usize,
                read: physical,
            });
            break;
        }
        if record[0] == DELETED {
            log::trace!("skipping deleted record {}", physical + 1);
            continue;
        }

        let row = table.row_count() + 1;
        let mut cells = Vec::with_capacity(header.fields.len() + 1);
        cells.push(row.to_string());
        let mut offset = 1;
        for field in &header.fields {
            let raw = &record[offset..offset + field.length as usize];
            cells.push(decode_field(field, raw, row, &mut warnings));
            offset += field.length as usize;
        }
        table.push_row(cells)?;
    }

    log::debug!(
        "read {} attribute rows from {} records",
        table.row_count(),
        header.num_records
    );
    Ok(DecodedTable {
        header,
        table,
        warnings: warnings.into_vec(),
    })
}

fn decode_field(
    field: &FieldDescriptor,
    raw: &[u8],
    row: usize,
    warnings: &mut Warnings,
) -> String {
    let text = latin1_to_string(raw);
    let text = text.trim_matches(|c: char| c.is_whitespace() || is_padding(c));

    match field.field_type {
        FieldType::Character | FieldType::Other(_) => text.to_string(),
        FieldType::Logical => match text.chars().next() {
            Some('T' | 't' | 'Y' | 'y') => "true".to_string(),
            Some('F' | 'f' | 'N' | 'n') => "false".to_string(),
            // uninitialized
            None | Some('?') => String::new(),
            Some(_) => {
                warnings.push(DecodeWarning::InvalidLogical {
                    row,
                    field: field.name.clone(),
                    text: text.to_string(),
                });
                String::new()
            }
        },
        FieldType::Date => {
            if text.is_empty() {
                return String::new();
            }
            match parse_date(text) {
                Some(date) => date.format("%Y-%m-%d").to_string(),
                None => {
                    warnings.push(DecodeWarning::InvalidDate {
                        row,
                        field: field.name.clone(),
                        text: text.to_string(),
                    });
                    String::new()
                }
            }
        }
        FieldType::Numeric | FieldType::Float => {
            if text.is_empty() {
                return format_f64(0.0);
            }
            match decode_number(text, field.field_type, field.decimal_count) {
                Some(value) => value,
                None => {
                    warnings.push(DecodeWarning::InvalidNumber {
                        row,
                        field: field.name.clone(),
                        text: text.to_string(),
                    });
                    format_f64(0.0)
                }
            }
        }
    }
}

/// Whole numbers keep their integer text; anything else goes through the double converter.
fn decode_number(text: &str, field_type: FieldType, decimal_count: u8) -> Option<String> {
    if field_type == FieldType::Numeric && decimal_count == 0 {
        if let Ok(value) = parse_i32(text) {
            return Some(value.to_string());
        }
        if let Ok(value) = parse_i64(text) {
            return Some(value.to_string());
        }
    }
    parse_f64(text).ok().map(format_f64)
}

/// `YYYYMMDD`
fn parse_date(text: &str) -> Option<NaiveDate> {
    if text.len() != 8 || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year = parse_i32(&text[..4]).ok()?;
    let month = parse_i32(&text[4..6]).ok()?;
    let day = parse_i32(&text[6..]).ok()?;
    NaiveDate::from_ymd_opt(year, u32::try_from(month).ok()?, u32::try_from(day).ok()?)
}
