//! Read and write dBase III attribute files (`.dbf`).
//!
//! Text is stored as ISO-8859-1. Reading maps every field type to text in an
//! [`AttributeTable`](crate::attributes::AttributeTable); writing stores every column as a
//! character field.

mod header;
mod reader;
mod writer;

pub use header::{DbaseHeader, FieldDescriptor, FieldType, MAX_FIELD_NAME_LEN};
pub use reader::{decode_table, read_table, DecodedTable};
pub use writer::{
    encode_table, encode_table_with_options, write_table, write_table_with_options,
    DbaseWriterOptions,
};

/// Each byte is the code point of its character.
pub(crate) fn latin1_to_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Characters outside ISO-8859-1 become `?`.
pub(crate) fn string_to_latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}
