use std::io::Write;

use byteorder::WriteBytesExt;
use chrono::{NaiveDate, Utc};

use crate::attributes::AttributeTable;
use crate::error::{Result, ShapefileError};
use crate::io::dbase::header::{
    DbaseHeader, FieldDescriptor, FieldType, END_OF_FILE, MAX_FIELD_NAME_LEN, NOT_DELETED,
};
use crate::io::dbase::string_to_latin1;

/// Widest character field dBase III can store.
const MAX_CHARACTER_WIDTH: usize = 254;

/// Options for writing attribute tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbaseWriterOptions {
    /// Cells wider than this, in characters, are cut. At most 254.
    pub max_field_width: usize,

    /// Date stored in the header. Today's date when `None`.
    pub last_update: Option<NaiveDate>,
}

impl Default for DbaseWriterOptions {
    fn default() -> Self {
        Self {
            max_field_width: MAX_CHARACTER_WIDTH,
            last_update: None,
        }
    }
}

impl DbaseWriterOptions {
    pub fn with_max_field_width(self, max_field_width: usize) -> Self {
        Self {
            max_field_width,
            ..self
        }
    }

    pub fn with_last_update(self, last_update: NaiveDate) -> Self {
        Self {
            last_update: Some(last_update),
            ..self
        }
    }
}

/// Encode a table as a dBase file with default options.
pub fn encode_table(table: &AttributeTable) -> Result<Vec<u8>> {
    encode_table_with_options(table, &DbaseWriterOptions::default())
}

pub fn encode_table_with_options(
    table: &AttributeTable,
    options: &DbaseWriterOptions,
) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_table_with_options(&mut buf, table, options)?;
    Ok(buf)
}

pub fn write_table<W: Write>(writer: W, table: &AttributeTable) -> Result<()> {
    write_table_with_options(writer, table, &DbaseWriterOptions::default())
}

/// Write every column but the id column as a character field, one record per row.
///
/// Field names come from the table headings, or are `FIELD1`, `FIELD2`, ... for a table without
/// headings, cut to ten characters and kept unique. Each field is as wide as its widest cell or
/// its written name.
pub fn write_table_with_options<W: Write>(
    mut writer: W,
    table: &AttributeTable,
    options: &DbaseWriterOptions,
) -> Result<()> {
    let max_width = options.max_field_width.clamp(1, MAX_CHARACTER_WIDTH);
    let widths = table.max_cell_widths();

    let mut fields = Vec::with_capacity(table.column_count().saturating_sub(1));
    for (column, name) in (1..table.column_count()).zip(field_names(table)) {
        let mut width = widths[column].max(name.chars().count()).max(1);
        if width > max_width {
            log::warn!("field {name}: cells of {width} characters cut to {max_width}");
            width = max_width;
        }
        // `max_width` is at most 254
        let length = u8::try_from(width).unwrap_or(u8::MAX);
        fields.push(FieldDescriptor::new(name, FieldType::Character, length, 0));
    }

    let num_records = u32::try_from(table.row_count()).map_err(|_| {
        ShapefileError::InvalidTable(format!("{} rows is too many", table.row_count()))
    })?;
    let last_update = options
        .last_update
        .unwrap_or_else(|| Utc::now().date_naive());
    let header = DbaseHeader::new(fields, num_records, last_update)?;
    header.write(&mut writer)?;

    let mut record = Vec::with_capacity(header.record_length as usize);
    for row in table.rows() {
        record.clear();
        record.push(NOT_DELETED);
        for (field, cell) in header.fields.iter().zip(row.iter().skip(1)) {
            let mut bytes = string_to_latin1(cell);
            bytes.resize(field.length as usize, b' ');
            record.extend_from_slice(&bytes);
        }
        writer.write_all(&record)?;
    }
    writer.write_u8(END_OF_FILE)?;

    log::debug!(
        "wrote {} attribute records of {} fields",
        num_records,
        header.fields.len()
    );
    Ok(())
}

/// Names of the written fields, cut to the dBase limit and made unique.
///
/// A name that clashes with an earlier one once cut ends in `_1`, `_2`, ... instead.
fn field_names(table: &AttributeTable) -> Vec<String> {
    let mut names: Vec<String> = Vec::with_capacity(table.column_count().saturating_sub(1));
    for column in 1..table.column_count() {
        let heading = match table.headings() {
            Some(headings) => headings[column].clone(),
            None => format!("FIELD{column}"),
        };
        let mut name: String = heading.chars().take(MAX_FIELD_NAME_LEN).collect();
        let mut n = 1;
        while names.iter().any(|used| used.eq_ignore_ascii_case(&name)) {
            let suffix = format!("_{n}");
            let stem_len = MAX_FIELD_NAME_LEN.saturating_sub(suffix.len());
            name = heading.chars().take(stem_len).chain(suffix.chars()).collect();
            n += 1;
        }
        if name != heading {
            log::debug!("field {heading:?} written as {name:?}");
        }
        names.push(name);
    }
    names
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::io::dbase::decode_table;
    use crate::test::table::cities;

    fn options() -> DbaseWriterOptions {
        let date = NaiveDate::from_ymd_opt(2020, 6, 1).unwrap();
        DbaseWriterOptions::default().with_last_update(date)
    }

    #[test]
    fn layout() {
        let bytes = encode_table_with_options(&cities(), &options()).unwrap();
        let header_length = 32 + 3 * 32 + 1;
        let record_length = 1 + 6 + 10 + 8;
        assert_eq!(bytes.len(), header_length + 3 * record_length + 1);
        assert_eq!(&bytes[..4], &[0x03, 120, 6, 1]);
        assert_eq!(*bytes.last().unwrap(), 0x1A);

        let first = &bytes[header_length..header_length + record_length];
        assert_eq!(first, b" London8982000   51.5074 ");
    }

    #[test]
    fn round_trip() {
        let table = cities();
        let bytes = encode_table_with_options(&table, &options()).unwrap();
        let decoded = decode_table(&bytes).unwrap();
        assert!(decoded.warnings.is_empty());
        assert_eq!(decoded.header.last_update, options().last_update);
        assert_eq!(
            decoded.table.headings().unwrap(),
            ["id", "name", "population", "latitude"]
        );
        assert_eq!(decoded.table.rows().collect::<Vec<_>>(), table.rows().collect::<Vec<_>>());
    }

    #[test]
    fn wide_cells_are_cut() {
        let mut table = AttributeTable::new(2);
        table.push_row(vec!["1".into(), "x".repeat(300)]).unwrap();
        let bytes = encode_table_with_options(&table, &options()).unwrap();
        let decoded = decode_table(&bytes).unwrap();
        assert_eq!(decoded.header.fields[0].length, 254);
        assert_eq!(decoded.header.fields[0].name, "FIELD1");
        assert_eq!(decoded.table.get_string(0, 1), Some("x".repeat(254).as_str()));

        let narrow = options().with_max_field_width(3);
        let bytes = encode_table_with_options(&table, &narrow).unwrap();
        assert_eq!(decode_table(&bytes).unwrap().table.get_string(0, 1), Some("xxx"));
    }

    #[test]
    fn empty_columns_are_one_byte_wide() {
        let mut table = AttributeTable::new(2);
        table.push_row(vec!["1".into()]).unwrap();
        let bytes = encode_table_with_options(&table, &options()).unwrap();
        let decoded = decode_table(&bytes).unwrap();
        // as wide as the name FIELD1
        assert_eq!(decoded.header.fields[0].length, 6);
        assert_eq!(decoded.table.get_string(0, 1), Some(""));
    }

    #[test]
    fn ids_only_table_has_no_fields() {
        let table = AttributeTable::from_ids([1, 2]);
        let bytes = encode_table_with_options(&table, &options()).unwrap();
        let decoded = decode_table(&bytes).unwrap();
        assert!(decoded.header.fields.is_empty());
        assert_eq!(decoded.table.row_count(), 2);
    }

    #[test]
    fn long_names_are_cut_and_kept_unique() {
        let mut table = AttributeTable::with_headings(vec![
            "id".into(),
            "POPULATION_2020".into(),
            "POPULATION_2021".into(),
            "POPULATION_2022".into(),
            "x".into(),
        ]);
        table
            .push_row(vec!["1".into(), "1".into(), "2".into(), "3".into(), "abc".into()])
            .unwrap();
        let bytes = encode_table_with_options(&table, &options()).unwrap();
        let decoded = decode_table(&bytes).unwrap();
        let fields = &decoded.header.fields;
        let names: Vec<_> = fields.iter().map(|field| field.name.as_str()).collect();
        assert_eq!(names, ["POPULATION", "POPULATI_1", "POPULATI_2", "x"]);
        // sized from the written name, not the full heading
        assert_eq!(fields[0].length, 10);
        assert_eq!(fields[3].length, 3);
        assert_eq!(decoded.table.get_string(0, 3), Some("3"));
    }
}
