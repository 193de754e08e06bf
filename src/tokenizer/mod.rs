//! Row tokenizer for delimiter-separated values.
//!
//! The tokenizer works on one row at a time: given a buffer starting at an
//! arbitrary position it produces the row's column spans and the number of
//! units consumed, without copying any field content. Fields come back
//! verbatim from the source buffer, surrounding quotes and doubled-quote
//! sequences included; [`unquote`] materializes the logical value on
//! demand.
//!
//! # Architecture
//!
//! The parse is a four-state machine (field start, unquoted, quoted,
//! quote closed). Between state-changing units the scan skips plain
//! content in bulk via [`simd`], which locates the next delimiter, quote,
//! CR, or LF with vector compares; every hit is then handled by the same
//! scalar logic the fallback path uses, so both paths are semantically
//! identical.

pub mod simd;

use std::borrow::Cow;
use std::ops::Range;

use crate::error::{Error, ParseErrorKind, Result};
use crate::options::ParserOptions;
use crate::unit::BufferUnit;
use simd::Specials;

/// Half-open `(start, len)` pair locating one column inside a row view.
///
/// Offsets are 32-bit: column arithmetic past 4 GiB in a single row fails
/// with [`ParseErrorKind::Overflow`] instead of silently wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpan {
    /// Offset of the first unit of the column, relative to the row start.
    pub start: u32,
    /// Number of units in the column.
    pub len: u32,
}

impl ColumnSpan {
    /// The column as an index range into the row slice.
    #[inline]
    pub fn range(&self) -> Range<usize> {
        let start = self.start as usize;
        start..start + self.len as usize
    }
}

/// Outcome of tokenizing one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowParseResult {
    /// Number of columns emitted into the scratch vector.
    pub column_count: usize,
    /// Length of the row content, terminator excluded.
    pub row_length: usize,
    /// Total units consumed, terminator included. The difference from
    /// `row_length` is 0 (end of buffer), 1 (LF or CR), or 2 (CRLF).
    pub units_consumed: usize,
    /// Number of LF units inside `units_consumed`. The LF of a CRLF counts
    /// once; a lone CR terminator counts zero.
    pub newline_count: usize,
    /// The consumed region was a comment line; no columns were emitted.
    pub is_comment: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    FieldStart,
    Unquoted,
    Quoted,
    QuotedClosed,
}

/// Tokenize one row starting at `buf[0]`.
///
/// `columns` is caller-provided scratch, cleared on entry and filled with
/// one span per column; size it for `max_columns + 1` to avoid regrowth.
/// The returned spans index into `buf` and include surrounding quotes.
pub fn tokenize_row<U: BufferUnit>(
    buf: &[U],
    opts: &ParserOptions,
    columns: &mut Vec<ColumnSpan>,
) -> Result<RowParseResult> {
    columns.clear();

    if buf.is_empty() {
        return Ok(RowParseResult {
            column_count: 0,
            row_length: 0,
            units_consumed: 0,
            newline_count: 0,
            is_comment: false,
        });
    }

    if let Some(result) = consume_comment(buf, opts) {
        return Ok(result);
    }

    let specials = Specials {
        delimiter: opts.delimiter,
        quote: opts.quote,
        escape: opts.escape,
    };
    let use_simd = opts.use_simd && opts.escape.is_none();
    let len = buf.len();

    let mut pos = 0usize;
    let mut field_start = 0usize;
    let mut state = State::FieldStart;
    let mut quote_open = 0usize;
    let mut newline_count = 0usize;
    let row_length;
    let units_consumed;

    loop {
        // Plain content cannot change the state; jump straight to the next
        // unit that can.
        if matches!(state, State::Unquoted | State::Quoted) {
            pos = U::next_special(buf, pos, &specials, use_simd);
        }

        if pos >= len {
            if state == State::Quoted {
                return Err(unterminated_quote(buf, quote_open));
            }
            emit_column(columns, buf, field_start, len, opts)?;
            row_length = len;
            units_consumed = len;
            break;
        }

        let unit = buf[pos];
        match state {
            State::FieldStart => {
                if opts.enable_quoted_fields && unit.eq_ascii(opts.quote) {
                    quote_open = pos;
                    state = State::Quoted;
                    pos += 1;
                } else if unit.eq_ascii(opts.delimiter) {
                    emit_column(columns, buf, field_start, pos, opts)?;
                    field_start = pos + 1;
                    pos += 1;
                } else if unit.eq_ascii(b'\r') || unit.eq_ascii(b'\n') {
                    emit_column(columns, buf, field_start, pos, opts)?;
                    let (consumed, lf) = consume_terminator(buf, pos);
                    row_length = pos;
                    units_consumed = consumed;
                    newline_count += lf;
                    break;
                } else if opts.escape.is_some_and(|e| unit.eq_ascii(e)) {
                    // The unit after the escape is field content no matter
                    // what it is.
                    pos = (pos + 2).min(len);
                    state = State::Unquoted;
                } else {
                    pos += 1;
                    state = State::Unquoted;
                }
            }
            State::Unquoted => {
                if unit.eq_ascii(opts.delimiter) {
                    emit_column(columns, buf, field_start, pos, opts)?;
                    field_start = pos + 1;
                    pos += 1;
                    state = State::FieldStart;
                } else if unit.eq_ascii(b'\r') || unit.eq_ascii(b'\n') {
                    emit_column(columns, buf, field_start, pos, opts)?;
                    let (consumed, lf) = consume_terminator(buf, pos);
                    row_length = pos;
                    units_consumed = consumed;
                    newline_count += lf;
                    break;
                } else if opts.escape.is_some_and(|e| unit.eq_ascii(e)) {
                    pos = (pos + 2).min(len);
                } else {
                    // A quote here is a literal; it only has meaning at
                    // field start.
                    pos += 1;
                }
            }
            State::Quoted => {
                if opts.escape.is_some_and(|e| unit.eq_ascii(e)) {
                    pos = (pos + 2).min(len);
                } else if unit.eq_ascii(opts.quote) {
                    if pos + 1 < len && buf[pos + 1].eq_ascii(opts.quote) {
                        // Doubled quote: both units stay in the raw field;
                        // unquote() collapses them later.
                        pos += 2;
                    } else {
                        state = State::QuotedClosed;
                        pos += 1;
                    }
                } else if unit.eq_ascii(b'\n') || unit.eq_ascii(b'\r') {
                    if !opts.allow_newlines_in_quotes {
                        return Err(newline_in_quote(buf, quote_open, pos, opts.quote));
                    }
                    if unit.eq_ascii(b'\n') {
                        newline_count += 1;
                    }
                    pos += 1;
                } else {
                    pos += 1;
                }
            }
            State::QuotedClosed => {
                if unit.eq_ascii(opts.delimiter) {
                    emit_column(columns, buf, field_start, pos, opts)?;
                    field_start = pos + 1;
                    pos += 1;
                    state = State::FieldStart;
                } else if unit.eq_ascii(b'\r') || unit.eq_ascii(b'\n') {
                    emit_column(columns, buf, field_start, pos, opts)?;
                    let (consumed, lf) = consume_terminator(buf, pos);
                    row_length = pos;
                    units_consumed = consumed;
                    newline_count += lf;
                    break;
                } else if opts.escape.is_some_and(|e| unit.eq_ascii(e)) {
                    pos = (pos + 2).min(len);
                    state = State::Unquoted;
                } else {
                    // Lenient: trailing garbage after a closing quote stays
                    // part of the field.
                    pos += 1;
                    state = State::Unquoted;
                }
            }
        }
    }

    if opts.trim_unquoted_fields {
        trim_columns(buf, columns, opts);
    }

    Ok(RowParseResult {
        column_count: columns.len(),
        row_length,
        units_consumed,
        newline_count,
        is_comment: false,
    })
}

/// Skip leading ASCII space/tab and, if the first meaningful unit is the
/// comment character, consume the whole line.
fn consume_comment<U: BufferUnit>(buf: &[U], opts: &ParserOptions) -> Option<RowParseResult> {
    let comment = opts.comment?;
    let mut i = 0;
    while i < buf.len() && (buf[i].eq_ascii(b' ') || buf[i].eq_ascii(b'\t')) {
        i += 1;
    }
    if i >= buf.len() || !buf[i].eq_ascii(comment) {
        return None;
    }

    let mut end = i;
    while end < buf.len() && !buf[end].eq_ascii(b'\r') && !buf[end].eq_ascii(b'\n') {
        end += 1;
    }
    let (units_consumed, newline_count) = if end < buf.len() {
        consume_terminator(buf, end)
    } else {
        (end, 0)
    };
    Some(RowParseResult {
        column_count: 0,
        row_length: end,
        units_consumed,
        newline_count,
        is_comment: true,
    })
}

/// Consume the row terminator at `pos` (a CR or LF). Returns the total
/// units consumed including the terminator, and the LF count (0 or 1).
#[inline]
fn consume_terminator<U: BufferUnit>(buf: &[U], pos: usize) -> (usize, usize) {
    if buf[pos].eq_ascii(b'\r') {
        if pos + 1 < buf.len() && buf[pos + 1].eq_ascii(b'\n') {
            (pos + 2, 1)
        } else {
            (pos + 1, 0)
        }
    } else {
        (pos + 1, 1)
    }
}

#[inline]
fn emit_column<U: BufferUnit>(
    columns: &mut Vec<ColumnSpan>,
    buf: &[U],
    start: usize,
    end: usize,
    opts: &ParserOptions,
) -> Result<()> {
    if columns.len() >= opts.max_columns {
        return Err(Error::TooManyColumns {
            max_columns: opts.max_columns,
            record_number: None,
            source_line_number: None,
        });
    }
    let field_len = end - start;
    if opts
        .max_field_length
        .is_some_and(|limit| field_len > limit)
    {
        return Err(Error::Parse {
            kind: ParseErrorKind::FieldTooLong,
            position: start,
            record_number: None,
            source_line_number: None,
            sample: Some(crate::error::truncate_sample(&U::sample(&buf[start..end]))),
        });
    }
    let (Ok(start), Ok(len)) = (u32::try_from(start), u32::try_from(field_len)) else {
        return Err(Error::Parse {
            kind: ParseErrorKind::Overflow,
            position: start,
            record_number: None,
            source_line_number: None,
            sample: None,
        });
    };
    columns.push(ColumnSpan { start, len });
    Ok(())
}

fn unterminated_quote<U: BufferUnit>(buf: &[U], quote_open: usize) -> Error {
    Error::Parse {
        kind: ParseErrorKind::UnterminatedQuote,
        position: quote_open,
        record_number: None,
        source_line_number: None,
        sample: Some(crate::error::truncate_sample(&U::sample(&buf[quote_open..]))),
    }
}

/// Classify a CR/LF hit inside a quoted field. When no closing quote
/// exists anywhere downstream the quote can never terminate, which is the
/// more precise report.
fn newline_in_quote<U: BufferUnit>(
    buf: &[U],
    quote_open: usize,
    newline_pos: usize,
    quote: u8,
) -> Error {
    let closes_later = buf[newline_pos..].iter().any(|u| u.eq_ascii(quote));
    if closes_later {
        Error::Parse {
            kind: ParseErrorKind::NewlineInQuotedField,
            position: newline_pos,
            record_number: None,
            source_line_number: None,
            sample: Some(crate::error::truncate_sample(&U::sample(
                &buf[quote_open..newline_pos],
            ))),
        }
    } else {
        unterminated_quote(buf, quote_open)
    }
}

/// Shrink every column that is not quote-surrounded past leading and
/// trailing ASCII space/tab. Unicode whitespace is deliberately left
/// alone.
fn trim_columns<U: BufferUnit>(buf: &[U], columns: &mut [ColumnSpan], opts: &ParserOptions) {
    for span in columns.iter_mut() {
        let field = &buf[span.range()];
        if opts.enable_quoted_fields
            && field.len() >= 2
            && field[0].eq_ascii(opts.quote)
            && field[field.len() - 1].eq_ascii(opts.quote)
        {
            continue;
        }

        let mut start = 0usize;
        let mut end = field.len();
        while start < end && (field[start].eq_ascii(b' ') || field[start].eq_ascii(b'\t')) {
            start += 1;
        }
        while end > start && (field[end - 1].eq_ascii(b' ') || field[end - 1].eq_ascii(b'\t')) {
            end -= 1;
        }
        span.start += start as u32;
        span.len = (end - start) as u32;
    }
}

/// Materialize the logical value of a raw field view.
///
/// Returns the inner slice when both ends are the quote character, and
/// collapses doubled quotes only when any are present; otherwise the
/// single-pass scan borrows without allocating.
pub fn unquote<U: BufferUnit>(field: &[U], quote: u8) -> Cow<'_, [U]> {
    if field.len() < 2
        || !field[0].eq_ascii(quote)
        || !field[field.len() - 1].eq_ascii(quote)
    {
        return Cow::Borrowed(field);
    }

    let inner = &field[1..field.len() - 1];
    if !inner.iter().any(|u| u.eq_ascii(quote)) {
        return Cow::Borrowed(inner);
    }

    let mut out = Vec::with_capacity(inner.len());
    let mut i = 0;
    while i < inner.len() {
        out.push(inner[i]);
        if inner[i].eq_ascii(quote) && i + 1 < inner.len() && inner[i + 1].eq_ascii(quote) {
            i += 2;
        } else {
            i += 1;
        }
    }
    Cow::Owned(out)
}
