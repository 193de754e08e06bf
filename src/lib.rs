//! Zero-copy streaming reader and writer for delimited and fixed-width
//! text records.
//!
//! # Architecture
//!
//! Reading is split into three layers. The [tokenizer](tokenizer) turns a
//! contiguous buffer of bytes or UTF-16 code units into one row's column
//! spans without copying any field content, skipping plain content with
//! SIMD compares where the hardware allows. The [reader](reader) drives
//! the tokenizer across the buffer, maintaining record and source-line
//! counters and yielding borrowed [`RowView`]s through a pull interface.
//! The [fixed-width splitter](fixed) frames records by line or by fixed
//! byte length and extracts pad-trimmed field slices.
//!
//! Writing is the inverse: [`RowWriter`] serializes field values with
//! RFC-4180 quoting, optional formula-injection protection, and hard
//! output ceilings, flushing its pooled buffer to an [`std::io::Write`]
//! sink.
//!
//! The crate performs no I/O of its own and assumes no async runtime;
//! buffer refill and record binding belong to the caller through the
//! [`collab`] traits.
//!
//! # Example
//!
//! ```
//! use rowscan::{ParserOptions, RowReader};
//!
//! let mut reader = RowReader::new(b"a,b\n1,2\n".as_slice(), &ParserOptions::default())?;
//! while let Some(row) = reader.next_row()? {
//!     let first = row.field_str(0).unwrap().unwrap();
//!     println!("record {} starts with {first}", row.record_number());
//! }
//! # Ok::<(), rowscan::Error>(())
//! ```

pub mod collab;
pub mod error;
pub mod fixed;
pub mod options;
mod pool;
pub mod reader;
pub mod row;
pub mod tokenizer;
pub mod unit;
pub mod writer;

#[cfg(test)]
mod tests;

pub use error::{Error, ParseErrorKind, Result};
pub use fixed::{extract_field, FieldSpec, FixedRecord, FixedWidthReader};
pub use options::{
    Alignment, FixedWidthOptions, InjectionProtection, ParserOptions, QuoteStyle, WriterOptions,
};
pub use reader::RowReader;
pub use row::{OwnedRow, RowView};
pub use tokenizer::{tokenize_row, unquote, ColumnSpan, RowParseResult};
pub use unit::BufferUnit;
pub use writer::{FieldValue, RowWriter};
