//! Attribute tables as tab-separated text.
//!
//! One row per line, cells separated by tabs. The first line starting with `#` holds the
//! headings; later `#` lines are comments. Blank lines are ignored.

use std::io::{BufRead, BufReader, Read, Write};

use crate::attributes::AttributeTable;
use crate::error::{Result, ShapefileError};

const HEADING_MARKER: char = '#';
const SEPARATOR: char = '\t';

/// Read a tab-separated table.
///
/// Each line is trimmed of surrounding whitespace before it is split. Rows may have different
/// lengths; the table is as wide as the longest row or the headings, and short rows are padded
/// with empty cells.
pub fn read_tsv<R: Read>(reader: R) -> Result<AttributeTable> {
    let mut headings: Option<Vec<String>> = None;
    let mut rows = Vec::new();
    for line in BufReader::new(reader).lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(heading_line) = line.strip_prefix(HEADING_MARKER) {
            if headings.is_none() {
                headings = Some(split(heading_line));
            } else {
                log::trace!("skipping comment {line:?}");
            }
            continue;
        }
        rows.push(split(line));
    }

    let num_columns = rows
        .iter()
        .map(Vec::len)
        .chain(headings.as_ref().map(Vec::len))
        .max()
        .unwrap_or(0);
    let mut table = match headings {
        Some(mut headings) => {
            headings.resize(num_columns, String::new());
            AttributeTable::with_headings(headings)
        }
        None => AttributeTable::new(num_columns),
    };
    for row in rows {
        table.push_row(row)?;
    }
    log::debug!(
        "read {} rows of {} columns from tab-separated text",
        table.row_count(),
        num_columns
    );
    Ok(table)
}

/// Write a table as tab-separated text, headings first behind a `#`.
///
/// Cells holding a tab or a line break cannot be written and are rejected.
pub fn write_tsv<W: Write>(mut writer: W, table: &AttributeTable) -> Result<()> {
    if let Some(headings) = table.headings() {
        write!(writer, "{HEADING_MARKER}")?;
        write_line(&mut writer, headings)?;
    }
    for row in table.rows() {
        write_line(&mut writer, row)?;
    }
    writer.flush()?;
    Ok(())
}

fn split(line: &str) -> Vec<String> {
    line.split(SEPARATOR).map(str::to_string).collect()
}

fn write_line<W: Write>(mut writer: W, cells: &[String]) -> Result<()> {
    for (i, cell) in cells.iter().enumerate() {
        if cell.contains([SEPARATOR, '\n', '\r']) {
            return Err(ShapefileError::InvalidTable(format!(
                "cell {cell:?} cannot be written as tab-separated text"
            )));
        }
        if i > 0 {
            write!(writer, "{SEPARATOR}")?;
        }
        writer.write_all(cell.as_bytes())?;
    }
    writeln!(writer)?;
    Ok(())
}
