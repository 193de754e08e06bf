//! Streaming row reader for delimiter-separated values.
//!
//! The reader drives the tokenizer across an in-memory buffer, yielding
//! successive [`RowView`]s through a pull interface. It performs no I/O:
//! callers that stream from a file or socket refill the buffer themselves
//! (see [`crate::collab::BufferSource`]) and construct a reader per
//! buffer generation, suspending only at the refill boundary.

use log::{debug, trace};

use crate::error::{Error, Result};
use crate::options::ParserOptions;
use crate::row::RowView;
use crate::tokenizer::{tokenize_row, ColumnSpan};
use crate::unit::BufferUnit;

/// Initial scratch capacity when `max_columns` is effectively unbounded.
const INITIAL_COLUMN_CAPACITY: usize = 256;

/// Pull-based reader over a contiguous buffer of bytes or 16-bit code
/// units.
///
/// Holds no heap buffers beyond one column-span scratch vector; row views
/// borrow the caller's buffer. Not shareable across threads: the cursor
/// and scratch mutate on every [`RowReader::next_row`] call.
pub struct RowReader<'a, U: BufferUnit> {
    buf: &'a [U],
    pos: usize,
    opts: ParserOptions,
    columns: Vec<ColumnSpan>,
    record_number: u64,
    line_number: u64,
}

impl<'a, U: BufferUnit> RowReader<'a, U> {
    /// Validate `opts`, strip a leading byte-order mark, and discard the
    /// configured `skip_rows` count.
    pub fn new(buf: &'a [U], opts: &ParserOptions) -> Result<Self> {
        opts.validate()?;

        let stripped = U::strip_bom(buf);
        if stripped.len() != buf.len() {
            debug!("stripped byte-order mark ({} units)", buf.len() - stripped.len());
        }
        trace!(
            "reader over {} units, simd={}, escape={:?}",
            stripped.len(),
            opts.use_simd && opts.escape.is_none(),
            opts.escape,
        );

        let capacity = opts.max_columns.saturating_add(1).min(INITIAL_COLUMN_CAPACITY);
        let mut reader = RowReader {
            buf: stripped,
            pos: 0,
            opts: opts.clone(),
            columns: Vec::with_capacity(capacity),
            record_number: 0,
            line_number: 1,
        };

        for _ in 0..reader.opts.skip_rows {
            if !reader.discard_row()? {
                break;
            }
        }
        Ok(reader)
    }

    /// Current cursor position in units, relative to the buffer after BOM
    /// stripping.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of rows yielded so far.
    #[inline]
    pub fn record_number(&self) -> u64 {
        self.record_number
    }

    /// Advance to the next row.
    ///
    /// Returns `Ok(None)` at end of input. Comment lines are always
    /// skipped; empty physical lines are skipped when `skip_empty_lines`
    /// is set, otherwise they surface as a row with one empty column.
    pub fn next_row(&mut self) -> Result<Option<RowView<'a, '_, U>>> {
        loop {
            if self.pos >= self.buf.len() {
                return Ok(None);
            }
            if self.record_number + 1 > self.opts.max_rows {
                return Err(Error::TooManyRecords {
                    record_number: self.record_number + 1,
                    max_rows: self.opts.max_rows,
                });
            }

            let rest = &self.buf[self.pos..];
            let result = tokenize_row(rest, &self.opts, &mut self.columns)
                .map_err(|err| self.locate(err))?;
            if result.units_consumed == 0 {
                return Ok(None);
            }

            let row_start_line = self.line_number;
            if result.is_comment || (result.row_length == 0 && self.opts.skip_empty_lines) {
                self.pos += result.units_consumed;
                if self.opts.track_source_lines {
                    self.line_number += result.newline_count as u64;
                }
                continue;
            }

            let row = &self.buf[self.pos..self.pos + result.row_length];
            self.pos += result.units_consumed;
            self.record_number += 1;
            if self.opts.track_source_lines {
                self.line_number += result.newline_count as u64;
            }

            return Ok(Some(RowView::new(
                row,
                &self.columns,
                self.opts.quote,
                self.record_number,
                row_start_line,
            )));
        }
    }

    /// Tokenize and throw away one row (used for `skip_rows`). Returns
    /// false at end of input.
    fn discard_row(&mut self) -> Result<bool> {
        if self.pos >= self.buf.len() {
            return Ok(false);
        }
        let rest = &self.buf[self.pos..];
        let result =
            tokenize_row(rest, &self.opts, &mut self.columns).map_err(|err| self.locate(err))?;
        if result.units_consumed == 0 {
            return Ok(false);
        }
        self.pos += result.units_consumed;
        if self.opts.track_source_lines {
            self.line_number += result.newline_count as u64;
        }
        Ok(true)
    }

    /// Stamp a tokenizer error with the reader's coordinates: absolute
    /// position, 1-based record number of the failing row, and the source
    /// line when tracking is on.
    fn locate(&self, err: Error) -> Error {
        let record = Some(self.record_number + 1);
        let line = self.opts.track_source_lines.then_some(self.line_number);
        match err {
            Error::Parse {
                kind,
                position,
                sample,
                ..
            } => Error::Parse {
                kind,
                position: self.pos + position,
                record_number: record,
                source_line_number: line,
                sample,
            },
            Error::TooManyColumns { max_columns, .. } => Error::TooManyColumns {
                max_columns,
                record_number: record,
                source_line_number: line,
            },
            other => other,
        }
    }
}
