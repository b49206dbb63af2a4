//! Conversion between decimal text and numbers.
//!
//! [`parse_f64`] is correctly rounded: it returns the double nearest to the decimal value of its
//! input, breaking ties towards an even mantissa. Numerals too long for a fast floating-point
//! path are resolved with exact big-integer arithmetic. [`format_f64`] is its inverse, producing
//! the shortest text that parses back to the same double.

mod bigint;
mod format;
mod parse;

pub use format::format_f64;
pub use parse::{parse_f64, parse_i32, parse_i64};

pub(crate) use parse::is_padding;
