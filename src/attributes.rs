//! Attribute tables: rectangular grids of text cells, one row per feature.
//!
//! Column 0 holds the feature id of the row. Cells are always stored as text; the numeric
//! accessors parse on demand with the correctly-rounded converter in [`crate::number`].

use std::io::{Read, Write};

use crate::error::{Result, ShapefileError};
use crate::io::tsv;
use crate::number::{format_f64, parse_f64, parse_i32, parse_i64};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeTable {
    headings: Option<Vec<String>>,
    rows: Vec<Vec<String>>,
    num_columns: usize,
}

impl AttributeTable {
    /// An empty table with `num_columns` columns and no headings.
    pub fn new(num_columns: usize) -> Self {
        Self {
            headings: None,
            rows: Vec::new(),
            num_columns,
        }
    }

    /// An empty table with one column per heading.
    pub fn with_headings(headings: Vec<String>) -> Self {
        Self {
            num_columns: headings.len(),
            headings: Some(headings),
            rows: Vec::new(),
        }
    }

    /// A table with a single `id` column listing `ids`.
    pub fn from_ids(ids: impl IntoIterator<Item = u32>) -> Self {
        let mut table = Self::with_headings(vec!["id".to_string()]);
        table.rows = ids.into_iter().map(|id| vec![id.to_string()]).collect();
        table
    }

    /// Read a table from tab-separated text. See [`tsv::read_tsv`].
    pub fn read_tsv<R: Read>(reader: R) -> Result<Self> {
        tsv::read_tsv(reader)
    }

    /// Write the table as tab-separated text. See [`tsv::write_tsv`].
    pub fn write_tsv<W: Write>(&self, writer: W) -> Result<()> {
        tsv::write_tsv(writer, self)
    }

    pub fn headings(&self) -> Option<&[String]> {
        self.headings.as_deref()
    }

    pub fn set_headings(&mut self, headings: Vec<String>) -> Result<()> {
        if headings.len() != self.num_columns {
            return Err(ShapefileError::InvalidTable(format!(
                "{} headings for {} columns",
                headings.len(),
                self.num_columns
            )));
        }
        self.headings = Some(headings);
        Ok(())
    }

    /// Index of the first column with the given heading.
    pub fn column_index(&self, heading: &str) -> Option<usize> {
        self.headings.as_ref()?.iter().position(|h| h == heading)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.num_columns
    }

    /// Append a row. Short rows are padded with empty cells; rows wider than the table are
    /// rejected.
    pub fn push_row(&mut self, mut row: Vec<String>) -> Result<()> {
        if row.len() > self.num_columns {
            return Err(ShapefileError::InvalidTable(format!(
                "row of {} cells in a table of {} columns",
                row.len(),
                self.num_columns
            )));
        }
        row.resize(self.num_columns, String::new());
        self.rows.push(row);
        Ok(())
    }

    pub fn row(&self, row: usize) -> Option<&[String]> {
        self.rows.get(row).map(Vec::as_slice)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[String]> + '_ {
        self.rows.iter().map(Vec::as_slice)
    }

    /// The first row whose column 0 is `name`.
    pub fn row_index(&self, name: &str) -> Option<usize> {
        self.rows
            .iter()
            .position(|row| row.first().is_some_and(|cell| cell == name))
    }

    /// The row of the feature with the given id.
    pub fn row_for_id(&self, id: u32) -> Option<usize> {
        self.row_index(&id.to_string())
    }

    /// The column 0 value of a row.
    pub fn row_name(&self, row: usize) -> Option<&str> {
        self.get_string(row, 0)
    }

    pub fn set_row_name(&mut self, row: usize, name: impl Into<String>) -> Result<()> {
        self.set_string(row, 0, name)
    }

    fn named_row(&self, name: &str) -> Result<usize> {
        self.row_index(name)
            .ok_or_else(|| ShapefileError::InvalidTable(format!("no row named {name:?}")))
    }

    /// Ids (column 0) of the rows whose `column` equals `text`.
    pub fn matching_ids(&self, text: &str, column: usize) -> Vec<u32> {
        self.rows
            .iter()
            .filter(|row| row.get(column).is_some_and(|cell| cell == text))
            .filter_map(|row| parse_i64(row.first()?).ok())
            .filter_map(|id| u32::try_from(id).ok())
            .collect()
    }

    pub fn get_string(&self, row: usize, column: usize) -> Option<&str> {
        self.rows.get(row)?.get(column).map(String::as_str)
    }

    fn cell(&self, row: usize, column: usize) -> Result<&str> {
        self.get_string(row, column).ok_or_else(|| {
            ShapefileError::InvalidTable(format!("no cell at row {row}, column {column}"))
        })
    }

    fn cell_mut(&mut self, row: usize, column: usize) -> Result<&mut String> {
        self.rows
            .get_mut(row)
            .and_then(|cells| cells.get_mut(column))
            .ok_or_else(|| {
                ShapefileError::InvalidTable(format!("no cell at row {row}, column {column}"))
            })
    }

    pub fn get_i32(&self, row: usize, column: usize) -> Result<i32> {
        parse_i32(self.cell(row, column)?)
    }

    pub fn get_i64(&self, row: usize, column: usize) -> Result<i64> {
        parse_i64(self.cell(row, column)?)
    }

    pub fn get_f64(&self, row: usize, column: usize) -> Result<f64> {
        parse_f64(self.cell(row, column)?)
    }

    pub fn set_string(
        &mut self,
        row: usize,
        column: usize,
        value: impl Into<String>,
    ) -> Result<()> {
        *self.cell_mut(row, column)? = value.into();
        Ok(())
    }

    pub fn set_i32(&mut self, row: usize, column: usize, value: i32) -> Result<()> {
        self.set_string(row, column, value.to_string())
    }

    pub fn set_i64(&mut self, row: usize, column: usize, value: i64) -> Result<()> {
        self.set_string(row, column, value.to_string())
    }

    pub fn set_f64(&mut self, row: usize, column: usize, value: f64) -> Result<()> {
        self.set_string(row, column, format_f64(value))
    }

    /// The cell in `column` of the first row named `name`. See [`Self::row_index`].
    pub fn get_string_by_name(&self, name: &str, column: usize) -> Option<&str> {
        self.get_string(self.row_index(name)?, column)
    }

    pub fn get_i32_by_name(&self, name: &str, column: usize) -> Result<i32> {
        self.get_i32(self.named_row(name)?, column)
    }

    pub fn get_i64_by_name(&self, name: &str, column: usize) -> Result<i64> {
        self.get_i64(self.named_row(name)?, column)
    }

    pub fn get_f64_by_name(&self, name: &str, column: usize) -> Result<f64> {
        self.get_f64(self.named_row(name)?, column)
    }

    pub fn set_string_by_name(
        &mut self,
        name: &str,
        column: usize,
        value: impl Into<String>,
    ) -> Result<()> {
        let row = self.named_row(name)?;
        self.set_string(row, column, value)
    }

    pub fn set_i32_by_name(&mut self, name: &str, column: usize, value: i32) -> Result<()> {
        let row = self.named_row(name)?;
        self.set_i32(row, column, value)
    }

    pub fn set_i64_by_name(&mut self, name: &str, column: usize, value: i64) -> Result<()> {
        let row = self.named_row(name)?;
        self.set_i64(row, column, value)
    }

    pub fn set_f64_by_name(&mut self, name: &str, column: usize, value: f64) -> Result<()> {
        let row = self.named_row(name)?;
        self.set_f64(row, column, value)
    }

    /// The widest cell of each column, in characters, headings included.
    pub fn max_widths(&self) -> Vec<usize> {
        let headings = self.headings.iter().map(Vec::as_slice);
        widths(self.num_columns, headings.chain(self.rows()))
    }

    /// The widest cell of each column, in characters, headings left out.
    pub fn max_cell_widths(&self) -> Vec<usize> {
        widths(self.num_columns, self.rows())
    }

    /// A new table with the given rows, in the given order, and the same headings.
    pub fn select_rows(&self, rows: &[usize]) -> Self {
        Self {
            headings: self.headings.clone(),
            rows: rows
                .iter()
                .filter_map(|&row| self.rows.get(row).cloned())
                .collect(),
            num_columns: self.num_columns,
        }
    }
}

fn widths<'a>(num_columns: usize, rows: impl Iterator<Item = &'a [String]>) -> Vec<usize> {
    let mut widths = vec![0; num_columns];
    for cells in rows {
        for (width, cell) in widths.iter_mut().zip(cells) {
            *width = (*width).max(cell.chars().count());
        }
    }
    widths
}
