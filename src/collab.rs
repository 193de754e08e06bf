//! Contracts for external collaborators.
//!
//! The core never performs I/O, binds records, or recovers from errors on
//! its own; those concerns live behind the traits here. The core only
//! consumes these interfaces; record binding, buffer refill, and error
//! policy are driven by the caller's layer.

use crate::error::Error;
use crate::row::RowView;
use crate::unit::BufferUnit;
use crate::writer::FieldValue;

/// Refills an input buffer with more units.
///
/// `fill` writes into `buf` and reports how many units were produced plus
/// whether the source is exhausted. Implementations should check their
/// cancellation signal before each read; cancellation is cooperative.
pub trait BufferSource<U: BufferUnit> {
    /// Fill `buf`, returning the count written and an end-of-stream flag.
    fn fill(&mut self, buf: &mut [U]) -> std::io::Result<(usize, bool)>;
}

/// Binds one row view to a typed record, or skips it.
pub trait RecordBinder<U: BufferUnit> {
    /// The bound record type.
    type Record;

    /// Consume the header row before any data row is bound.
    fn bind_header(&mut self, header: &RowView<'_, '_, U>) -> Result<(), Error>;

    /// Bind one data row, or return `None` to skip it.
    fn bind(&mut self, row: &RowView<'_, '_, U>) -> Result<Option<Self::Record>, Error>;
}

/// Yields the ordered field sequence for one record (the writing inverse
/// of [`RecordBinder`]).
pub trait RecordFields {
    /// Visit each field value left to right.
    fn for_each_field(&self, emit: &mut dyn FnMut(FieldValue<'_>));
}

/// What the error-handling layer decides to do with a failed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
    /// Drop the record and keep parsing.
    SkipRecord,
    /// Drop the whole row and keep parsing.
    SkipRow,
    /// Bind a null value in place of the failing field.
    WriteNull,
    /// Surface the original error.
    Throw,
}

/// Everything the recovery callback needs to locate a failure.
#[derive(Debug)]
pub struct ErrorContext<'a> {
    /// 1-based record number, when known.
    pub record_number: Option<u64>,
    /// 1-based source line, when tracking is enabled.
    pub source_line_number: Option<u64>,
    /// Name of the field being bound, when known.
    pub field_name: Option<&'a str>,
    /// Raw value of the field, truncated by the caller.
    pub raw_value: Option<&'a str>,
    /// The error being recovered from.
    pub error: &'a Error,
}

/// Decides how binding failures are handled. Consulted by the binding
/// layer only; the tokenizer and readers always propagate.
pub trait ErrorRecovery {
    /// Pick an action for the given failure.
    fn on_error(&mut self, context: &ErrorContext<'_>) -> ErrorAction;
}

/// Receives periodic progress callbacks from a driving layer.
pub trait ProgressSink {
    /// Called every `progress_interval_rows` with cumulative counts.
    fn on_progress(&mut self, rows_processed: u64, bytes_processed: u64, total_bytes: Option<u64>);
}
