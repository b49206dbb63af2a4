//! Defines [`ShapefileError`], representing all errors returned by this crate.

use std::fmt::Debug;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Enum with all errors in this crate.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ShapefileError {
    /// The input does not follow the binary layout: bad magic, unknown shape type, malformed
    /// header or a stream that ends early.
    #[error("Format error: {0}")]
    Format(String),

    /// A shape type that is recognized but not supported (multipatch).
    #[error("Unsupported shape type: {0}")]
    UnsupportedShapeType(i32),

    /// Text that could not be interpreted as a number.
    #[error("Invalid number: {0}")]
    NumberFormat(String),

    /// An attribute table operation that would break the rectangular shape of the table.
    #[error("Invalid attribute table: {0}")]
    InvalidTable(String),

    /// An I/O failure on a named file.
    #[error("{}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// [std::io::Error]
    #[error(transparent)]
    IOError(#[from] io::Error),
}

impl ShapefileError {
    /// Attach the path of the file being read or written to an I/O error.
    pub(crate) fn file(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ShapefileError::File {
            path: path.into(),
            source,
        }
    }

    /// Convert an I/O error raised while decoding an in-memory buffer. A buffer that ends early
    /// is a format error rather than an I/O failure.
    pub(crate) fn from_decode(err: io::Error, context: &str) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            ShapefileError::Format(format!("truncated {context}"))
        } else {
            ShapefileError::IOError(err)
        }
    }
}

/// Crate-specific result type.
pub type Result<T> = std::result::Result<T, ShapefileError>;
