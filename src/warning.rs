//! Recoverable problems found while decoding.
//!
//! Decoding does not stop for these. Each one is logged at `warn` level when it is found and
//! returned with the decoded data, so that callers can tell a clean read from a repaired one.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum DecodeWarning {
    /// A part start index lies beyond the vertex count or before the previous part. The record
    /// keeps the parts before it.
    #[error("record {record}: part {part} starts at vertex {index} of {num_points}; later parts dropped")]
    PartIndexCorruption {
        record: u32,
        part: usize,
        index: i64,
        num_points: usize,
    },

    /// A record header claims a content length that differs from what its shape type used.
    #[error("record {record}: declared {declared} bytes of content but {consumed} were used")]
    RecordLengthMismatch {
        record: u32,
        declared: usize,
        consumed: usize,
    },

    /// A record number that is not a positive integer. The record is stored under `assigned`.
    #[error("record number {number} is not positive; using {assigned}")]
    InvalidRecordNumber { number: i32, assigned: u32 },

    /// A record number already used by an earlier feature. The record is stored under
    /// `assigned`.
    #[error("record number {number} is already taken; using {assigned}")]
    DuplicateRecordNumber { number: u32, assigned: u32 },

    /// A multipoint record was reduced to its last point.
    #[error("record {record}: multipoint of {num_points} points kept only the last one")]
    MultiPointCollapsed { record: u32, num_points: usize },

    /// A multi-part record without any vertices.
    #[error("record {record}: no vertices; record skipped")]
    EmptyShape { record: u32 },

    /// A numeric attribute that could not be parsed. The cell holds `0.0` instead.
    #[error("row {row}, field {field}: {text:?} is not a number")]
    InvalidNumber {
        row: usize,
        field: String,
        text: String,
    },

    /// A date attribute that is not a valid `YYYYMMDD` date. The cell is left empty.
    #[error("row {row}, field {field}: {text:?} is not a date")]
    InvalidDate {
        row: usize,
        field: String,
        text: String,
    },

    /// A logical attribute that is neither true nor false. The cell is left empty.
    #[error("row {row}, field {field}: {text:?} is not a logical value")]
    InvalidLogical {
        row: usize,
        field: String,
        text: String,
    },

    /// A field type the table codec does not know. Its contents are read as text.
    #[error("field {field}: unknown type {code:?}; reading as text")]
    UnknownFieldType { field: String, code: char },

    /// The attribute file ended before its declared number of records.
    #[error("attribute file declares {expected} records but only {read} could be read")]
    TruncatedTable { expected: usize, read: usize },

    /// No attribute file was found beside a geometry file.
    #[error("{}: no attribute file; using feature ids only", path.display())]
    MissingAttributes { path: PathBuf },
}

/// Collects warnings, logging each one as it arrives.
#[derive(Debug, Default)]
pub(crate) struct Warnings(Vec<DecodeWarning>);

impl Warnings {
    pub(crate) fn push(&mut self, warning: DecodeWarning) {
        log::warn!("{warning}");
        self.0.push(warning);
    }

    pub(crate) fn into_vec(self) -> Vec<DecodeWarning> {
        self.0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn messages_name_the_record() {
        let warning = DecodeWarning::PartIndexCorruption {
            record: 7,
            part: 1,
            index: 1000,
            num_points: 10,
        };
        assert_eq!(
            warning.to_string(),
            "record 7: part 1 starts at vertex 1000 of 10; later parts dropped"
        );
    }

    #[test]
    fn collects_in_order() {
        let mut warnings = Warnings::default();
        warnings.push(DecodeWarning::EmptyShape { record: 1 });
        warnings.push(DecodeWarning::EmptyShape { record: 2 });
        assert_eq!(
            warnings.into_vec(),
            vec![
                DecodeWarning::EmptyShape { record: 1 },
                DecodeWarning::EmptyShape { record: 2 }
            ]
        );
    }
}
