//! Row writer for delimiter-separated values.
//!
//! The writer serializes field sequences into an output buffer with
//! RFC-4180 quoting, optional formula-injection protection, and hard
//! ceilings on output size, field size, column count, and row count. The
//! buffer is rented from the shared pool and flushed to the sink whenever
//! it would grow past the pool capacity.
//!
//! # Injection protection
//!
//! A field whose first character would make a spreadsheet evaluate it as a
//! formula (`=`, `@`, TAB, CR, and conditionally `-`/`+`) can be escaped,
//! sanitized, or rejected. The escaped forms are no longer strict RFC 4180
//! but are safe to open in common spreadsheet applications.

#[cfg(test)]
mod security_tests;

use std::fmt;
use std::fmt::Write as _;
use std::io;

use log::trace;
use memchr::memchr;

use crate::error::{truncate_sample, Error, Result};
use crate::options::{InjectionProtection, QuoteStyle, WriterOptions};
use crate::pool::{self, POOL_BUFFER_CAPACITY};

/// One value to serialize into a field.
///
/// The writer sees only an ordered sequence of values; how a record maps
/// to them is the binding layer's business. Locale-sensitive rendering of
/// temporal or decimal values happens in the caller's [`fmt::Display`]
/// implementation passed as [`FieldValue::Display`].
#[derive(Clone, Copy)]
pub enum FieldValue<'a> {
    /// Text, written under the configured quoting rules.
    Str(&'a str),
    /// Signed integer, formatted in place.
    Int(i64),
    /// Unsigned integer, formatted in place.
    UInt(u64),
    /// Floating point, formatted in place via the shortest round-trip
    /// representation.
    Float(f64),
    /// Boolean, emitted as `True`/`False` without quoting.
    Bool(bool),
    /// Null; emits the configured `null_value` under normal quoting rules.
    Null,
    /// An opaque formattable value (date/time, decimal, …), rendered into
    /// the encoding scratch buffer.
    Display(&'a dyn fmt::Display),
}

impl<'a> From<&'a str> for FieldValue<'a> {
    fn from(value: &'a str) -> Self {
        FieldValue::Str(value)
    }
}

impl From<i64> for FieldValue<'_> {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<u64> for FieldValue<'_> {
    fn from(value: u64) -> Self {
        FieldValue::UInt(value)
    }
}

impl From<f64> for FieldValue<'_> {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<bool> for FieldValue<'_> {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

/// Streaming DSV writer over an [`io::Write`] sink.
///
/// Not shareable: the output buffer, the first-field flag, and the
/// counters mutate on every operation. Both rented buffers are returned
/// to the pool on drop regardless of the exit path.
///
/// # Example
///
/// ```
/// use rowscan::{FieldValue, RowWriter, WriterOptions};
///
/// let mut writer = RowWriter::new(Vec::new(), &WriterOptions::default())?;
/// writer.write_field(FieldValue::Str("name"))?;
/// writer.write_field(FieldValue::Int(42))?;
/// writer.end_row()?;
/// let bytes = writer.finish()?;
/// assert_eq!(bytes, b"name,42\r\n");
/// # Ok::<(), rowscan::Error>(())
/// ```
pub struct RowWriter<W: io::Write> {
    sink: Option<W>,
    opts: WriterOptions,
    buf: Vec<u8>,
    scratch: String,
    first_field: bool,
    columns_in_row: usize,
    rows_written: u64,
    total_written: u64,
}

impl<W: io::Write> RowWriter<W> {
    /// Validate `opts` and rent the output and scratch buffers.
    pub fn new(sink: W, opts: &WriterOptions) -> Result<Self> {
        opts.validate()?;
        let scratch = String::from_utf8(pool::acquire()).unwrap_or_default();
        Ok(RowWriter {
            sink: Some(sink),
            opts: opts.clone(),
            buf: pool::acquire(),
            scratch,
            first_field: true,
            columns_in_row: 0,
            rows_written: 0,
            total_written: 0,
        })
    }

    /// Number of rows terminated so far.
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Cumulative output size in bytes, buffered bytes included.
    pub fn bytes_written(&self) -> u64 {
        self.total_written
    }

    /// Append one field to the current row.
    pub fn write_field(&mut self, value: FieldValue<'_>) -> Result<()> {
        self.begin_field()?;
        match value {
            FieldValue::Str(text) => self.write_text(text),
            FieldValue::Int(value) => {
                let mut format = itoa::Buffer::new();
                self.write_text(format.format(value))
            }
            FieldValue::UInt(value) => {
                let mut format = itoa::Buffer::new();
                self.write_text(format.format(value))
            }
            FieldValue::Float(value) => {
                let mut format = ryu::Buffer::new();
                self.write_text(format.format(value))
            }
            FieldValue::Bool(value) => {
                // Booleans bypass quoting entirely.
                self.push_bytes(if value { b"True" } else { b"False" })
            }
            FieldValue::Null => {
                let null_value = std::mem::take(&mut self.opts.null_value);
                let outcome = self.write_text(&null_value);
                self.opts.null_value = null_value;
                outcome
            }
            FieldValue::Display(value) => {
                let mut scratch = std::mem::take(&mut self.scratch);
                scratch.clear();
                let formatted = write!(scratch, "{value}");
                let outcome = match formatted {
                    Ok(()) => self.write_text(&scratch),
                    Err(_) => Err(Error::Validation {
                        record_number: Some(self.rows_written + 1),
                        message: "value formatting failed".into(),
                    }),
                };
                self.scratch = scratch;
                outcome
            }
        }
    }

    /// Append one field rendered from a caller-chosen format specifier,
    /// e.g. `write_field_fmt(format_args!("{:.2}", price))`.
    pub fn write_field_fmt(&mut self, args: fmt::Arguments<'_>) -> Result<()> {
        self.begin_field()?;
        let mut scratch = std::mem::take(&mut self.scratch);
        scratch.clear();
        let formatted = scratch.write_fmt(args);
        let outcome = match formatted {
            Ok(()) => self.write_text(&scratch),
            Err(_) => Err(Error::Validation {
                record_number: Some(self.rows_written + 1),
                message: "value formatting failed".into(),
            }),
        };
        self.scratch = scratch;
        outcome
    }

    /// Write a whole row of text fields and terminate it.
    pub fn write_row<'v, I>(&mut self, fields: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Into<FieldValue<'v>>,
    {
        for field in fields {
            self.write_field(field.into())?;
        }
        self.end_row()
    }

    /// Terminate the current row: append the configured newline and reset
    /// the per-row state.
    pub fn end_row(&mut self) -> Result<()> {
        let row = self.rows_written + 1;
        if self.opts.max_row_count.is_some_and(|limit| row > limit) {
            return Err(Error::TooManyRowsWritten {
                row,
                limit: self.opts.max_row_count.unwrap_or_default(),
            });
        }
        let newline = std::mem::take(&mut self.opts.newline);
        let outcome = self.push_bytes(newline.as_bytes());
        self.opts.newline = newline;
        outcome?;

        self.rows_written = row;
        self.first_field = true;
        self.columns_in_row = 0;
        Ok(())
    }

    /// Flush buffered output to the sink.
    pub fn flush(&mut self) -> Result<()> {
        self.flush_buf()?;
        if let Some(sink) = self.sink.as_mut() {
            sink.flush()?;
        }
        Ok(())
    }

    /// Flush and return the sink.
    pub fn finish(mut self) -> Result<W> {
        self.flush()?;
        match self.sink.take() {
            Some(sink) => Ok(sink),
            None => Err(Error::Io(io::Error::other("writer already finished"))),
        }
    }

    fn begin_field(&mut self) -> Result<()> {
        self.columns_in_row += 1;
        if self
            .opts
            .max_column_count
            .is_some_and(|limit| self.columns_in_row > limit)
        {
            return Err(Error::TooManyColumnsWritten {
                column: self.columns_in_row,
                limit: self.opts.max_column_count.unwrap_or_default(),
            });
        }
        if self.first_field {
            self.first_field = false;
            Ok(())
        } else {
            self.push_bytes(&[self.opts.delimiter])
        }
    }

    fn write_text(&mut self, text: &str) -> Result<()> {
        if self
            .opts
            .max_field_size
            .is_some_and(|limit| text.len() > limit)
        {
            return Err(Error::FieldSizeExceeded {
                length: text.len(),
                limit: self.opts.max_field_size.unwrap_or_default(),
                sample: Some(truncate_sample(text)),
            });
        }

        if self.opts.injection_protection != InjectionProtection::None
            && is_dangerous(text, &self.opts.additional_dangerous_chars)
        {
            return self.write_dangerous(text);
        }

        let (needs_quotes, quote_count) = self.analyze(text);
        if needs_quotes {
            self.write_quoted(text, quote_count, None)
        } else {
            self.push_bytes(text.as_bytes())
        }
    }

    /// Single pass producing both the quoting decision and the number of
    /// embedded quote characters.
    fn analyze(&self, text: &str) -> (bool, usize) {
        let mut quote_count = 0usize;
        let mut contains_special = false;
        for &byte in text.as_bytes() {
            if byte == self.opts.quote {
                quote_count += 1;
                contains_special = true;
            } else if byte == self.opts.delimiter || byte == b'\r' || byte == b'\n' {
                contains_special = true;
            }
        }
        let needs_quotes = match self.opts.quote_style {
            QuoteStyle::Always => true,
            QuoteStyle::Never => false,
            QuoteStyle::WhenNeeded => contains_special,
        };
        (needs_quotes, quote_count)
    }

    /// Apply the configured injection transform to a dangerous field.
    fn write_dangerous(&mut self, text: &str) -> Result<()> {
        match self.opts.injection_protection {
            InjectionProtection::None => unreachable!("checked by caller"),
            InjectionProtection::EscapeWithQuote => {
                let (_, quote_count) = self.analyze(text);
                self.write_quoted(text, quote_count, Some(b'\''))
            }
            InjectionProtection::EscapeWithTab => {
                let (_, quote_count) = self.analyze(text);
                self.write_quoted(text, quote_count, Some(b'\t'))
            }
            InjectionProtection::Sanitize => {
                let mut rest = text;
                while is_dangerous(rest, &self.opts.additional_dangerous_chars) {
                    let mut chars = rest.chars();
                    chars.next();
                    rest = chars.as_str();
                }
                trace!(
                    "sanitized {} leading characters from field",
                    text.len() - rest.len()
                );
                let (needs_quotes, quote_count) = self.analyze(rest);
                if needs_quotes {
                    self.write_quoted(rest, quote_count, None)
                } else {
                    self.push_bytes(rest.as_bytes())
                }
            }
            InjectionProtection::Reject => Err(Error::InjectionDetected {
                record_number: self.rows_written + 1,
                column: self.columns_in_row,
                sample: truncate_sample(text),
            }),
        }
    }

    /// Emit `quote body quote`, doubling embedded quotes, with an optional
    /// defusing prefix directly after the opening quote.
    fn write_quoted(&mut self, text: &str, quote_count: usize, prefix: Option<u8>) -> Result<()> {
        let quote = self.opts.quote;
        self.push_bytes(&[quote])?;
        if let Some(prefix) = prefix {
            self.push_bytes(&[prefix])?;
        }
        if quote_count == 0 {
            self.push_bytes(text.as_bytes())?;
        } else {
            let mut rest = text.as_bytes();
            while let Some(hit) = memchr(quote, rest) {
                self.push_bytes(&rest[..=hit])?;
                self.push_bytes(&[quote])?;
                rest = &rest[hit + 1..];
            }
            self.push_bytes(rest)?;
        }
        self.push_bytes(&[quote])
    }

    /// Append raw bytes, charging the output cap and flushing before the
    /// buffer would outgrow its pooled capacity.
    fn push_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let total = self.total_written + bytes.len() as u64;
        if self.opts.max_output_size.is_some_and(|limit| total > limit) {
            return Err(Error::OutputSizeExceeded {
                written: total,
                limit: self.opts.max_output_size.unwrap_or_default(),
            });
        }
        self.total_written = total;

        if self.buf.len() + bytes.len() > POOL_BUFFER_CAPACITY && !self.buf.is_empty() {
            self.flush_buf()?;
        }
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    fn flush_buf(&mut self) -> Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        if let Some(sink) = self.sink.as_mut() {
            sink.write_all(&self.buf)?;
            trace!("flushed {} bytes", self.buf.len());
        }
        self.buf.clear();
        Ok(())
    }
}

impl<W: io::Write> Drop for RowWriter<W> {
    fn drop(&mut self) {
        // Best-effort flush; the buffers go back to the pool on every exit
        // path.
        let _ = self.flush_buf();
        pool::release(std::mem::take(&mut self.buf));
        pool::release(std::mem::take(&mut self.scratch).into_bytes());
    }
}

/// Is `text` a field whose first character triggers formula evaluation?
///
/// `=`, `@`, TAB, and CR always are. A leading `-` or `+` is safe only
/// when the field is exactly one character long or the next character is
/// an ASCII digit or `.` (numbers and phone-number patterns).
fn is_dangerous(text: &str, additional: &[char]) -> bool {
    let mut chars = text.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    match first {
        '=' | '@' | '\t' | '\r' => true,
        '-' | '+' => match chars.next() {
            None => false,
            Some(next) => !(next.is_ascii_digit() || next == '.'),
        },
        other => additional.contains(&other),
    }
}
