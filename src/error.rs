//! Error taxonomy for readers, the tokenizer, and the writer.
//!
//! Every variant carries enough coordinates (record number, source line,
//! field position) to locate the problem in the original input. Field value
//! samples are truncated to [`SAMPLE_LIMIT`] characters so a log line never
//! carries megabytes of payload.

use std::fmt;

use thiserror::Error;

/// Maximum number of characters kept from an offending field value.
pub const SAMPLE_LIMIT: usize = 100;

/// Truncate `value` to [`SAMPLE_LIMIT`] characters, appending an ellipsis
/// when anything was cut.
pub(crate) fn truncate_sample(value: &str) -> String {
    let mut chars = value.char_indices();
    match chars.nth(SAMPLE_LIMIT) {
        None => value.to_owned(),
        Some((cut, _)) => {
            let mut sample = value[..cut].to_owned();
            sample.push('…');
            sample
        }
    }
}

/// What went wrong while tokenizing a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// A quote was opened but the input ended before it was closed. The
    /// reported position is the opening quote.
    UnterminatedQuote,
    /// A CR or LF occurred inside a quoted field while
    /// `allow_newlines_in_quotes` is disabled.
    NewlineInQuotedField,
    /// A field grew past `max_field_length`.
    FieldTooLong,
    /// Position arithmetic overflowed the 32-bit column offset space.
    Overflow,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ParseErrorKind::UnterminatedQuote => "unterminated quote",
            ParseErrorKind::NewlineInQuotedField => "newline in quoted field",
            ParseErrorKind::FieldTooLong => "field too long",
            ParseErrorKind::Overflow => "position arithmetic overflow",
        };
        f.write_str(text)
    }
}

/// All failures surfaced by this crate.
///
/// Reader-side variants come first, writer-side variants after. Comment
/// lines and skipped empty lines are not errors and never appear here.
#[derive(Error, Debug)]
pub enum Error {
    /// An option combination was rejected before any input was read.
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// The delimiter itself is unusable (non-ASCII or colliding with
    /// another special character).
    #[error("invalid delimiter: {0}")]
    InvalidDelimiter(String),

    /// The configured `max_rows` ceiling was reached.
    #[error("record {record_number} exceeds the configured limit of {max_rows} rows")]
    TooManyRecords { record_number: u64, max_rows: u64 },

    /// A row produced more columns than `max_columns`.
    #[error("row at record {record_number:?} has more than {max_columns} columns")]
    TooManyColumns {
        max_columns: usize,
        record_number: Option<u64>,
        source_line_number: Option<u64>,
    },

    /// Malformed row content. `position` is relative to the start of the
    /// buffer handed to the tokenizer.
    #[error("{kind} at position {position} (record {record_number:?}, line {source_line_number:?})")]
    Parse {
        kind: ParseErrorKind,
        position: usize,
        record_number: Option<u64>,
        source_line_number: Option<u64>,
        /// Truncated copy of the offending field, when one is identifiable.
        sample: Option<String>,
    },

    /// A fixed-length record was cut short at the end of the input.
    #[error(
        "fixed-width record {record_number} at offset {offset} is shorter than record_length {record_length}"
    )]
    InvalidRecordLength {
        record_number: u64,
        offset: usize,
        record_length: usize,
    },

    /// Fixed-width field coordinates that cannot address any record byte.
    #[error("field coordinates out of bounds: start {start}, length {length}")]
    FieldOutOfBounds { start: usize, length: usize },

    /// The writer's cumulative output would exceed `max_output_size`.
    #[error("output size {written} exceeds the configured limit of {limit} bytes")]
    OutputSizeExceeded { written: u64, limit: u64 },

    /// A single written field exceeded `max_field_size`.
    #[error("field of {length} units exceeds the configured limit of {limit}")]
    FieldSizeExceeded {
        length: usize,
        limit: usize,
        sample: Option<String>,
    },

    /// More fields were written into one row than `max_column_count`.
    #[error("column {column} exceeds the configured limit of {limit} columns")]
    TooManyColumnsWritten { column: usize, limit: usize },

    /// More rows were terminated than `max_row_count`.
    #[error("row {row} exceeds the configured limit of {limit} rows")]
    TooManyRowsWritten { row: u64, limit: u64 },

    /// A field would be interpreted as a formula by spreadsheet software
    /// and `injection_protection` is set to `Reject`.
    #[error("formula injection detected in record {record_number}, column {column}: {sample}")]
    InjectionDetected {
        record_number: u64,
        column: usize,
        sample: String,
    },

    /// A record failed validation in a binding collaborator.
    #[error("validation failed for record {record_number:?}: {message}")]
    Validation {
        record_number: Option<u64>,
        message: String,
    },

    /// The writer's output sink failed.
    #[error("write to output sink failed")]
    Io(#[from] std::io::Error),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;
