//! Fixed-width record reader and field splitter.
//!
//! Framing is separate from the DSV tokenizer because the decision is
//! data-independent: a record is either everything up to the next line
//! terminator, or exactly `record_length` bytes when that option is set.
//! Field extraction is a pure function of the record slice and a
//! caller-supplied `(start, length, pad, alignment)` tuple, and never
//! copies.

use log::debug;
use memchr::memchr2;

use crate::error::{Error, Result};
use crate::options::{Alignment, FixedWidthOptions};
use crate::unit::BufferUnit;

/// Caller-supplied coordinates of one fixed-width field. `pad` and
/// `alignment` fall back to the reader defaults when unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Byte offset of the field within the record.
    pub start: usize,
    /// Declared width of the field in bytes.
    pub len: usize,
    /// Pad byte override.
    pub pad: Option<u8>,
    /// Alignment override.
    pub alignment: Option<Alignment>,
}

impl FieldSpec {
    /// A field at `start` spanning `len` bytes, using the reader defaults
    /// for pad and alignment.
    pub fn new(start: usize, len: usize) -> Self {
        FieldSpec {
            start,
            len,
            pad: None,
            alignment: None,
        }
    }

    /// Override the pad byte.
    pub fn with_pad(mut self, pad: u8) -> Self {
        self.pad = Some(pad);
        self
    }

    /// Override the alignment.
    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = Some(alignment);
        self
    }
}

/// Extract one field from a record slice.
///
/// Out-of-range coordinates degrade softly: a `start` at or past the end
/// of the record yields the empty slice, and `length` is clamped to the
/// record tail. Only coordinates whose sum cannot be represented are
/// rejected. Trimming strips the pad byte from the side(s) the alignment
/// padded, preserving the zero-copy invariant.
pub fn extract_field(
    record: &[u8],
    start: usize,
    length: usize,
    pad: u8,
    alignment: Alignment,
) -> Result<&[u8]> {
    if start.checked_add(length).is_none() {
        return Err(Error::FieldOutOfBounds { start, length });
    }
    if start >= record.len() {
        return Ok(&record[record.len()..]);
    }

    let length = length.min(record.len() - start);
    let mut lo = start;
    let mut hi = start + length;

    match alignment {
        Alignment::Left => {
            while hi > lo && record[hi - 1] == pad {
                hi -= 1;
            }
        }
        Alignment::Right => {
            while lo < hi && record[lo] == pad {
                lo += 1;
            }
        }
        Alignment::Center => {
            while lo < hi && record[lo] == pad {
                lo += 1;
            }
            while hi > lo && record[hi - 1] == pad {
                hi -= 1;
            }
        }
        Alignment::None => {}
    }

    Ok(&record[lo..hi])
}

/// One framed fixed-width record.
#[derive(Debug, Clone, Copy)]
pub struct FixedRecord<'a> {
    bytes: &'a [u8],
    default_pad: u8,
    default_alignment: Alignment,
    record_number: u64,
    source_line_number: u64,
}

impl<'a> FixedRecord<'a> {
    /// The raw record bytes, terminator excluded.
    #[inline]
    pub fn raw(&self) -> &'a [u8] {
        self.bytes
    }

    /// 1-based count of records yielded so far, this one included.
    #[inline]
    pub fn record_number(&self) -> u64 {
        self.record_number
    }

    /// 1-based source line this record began on. Meaningful only when
    /// `track_source_lines` is enabled.
    #[inline]
    pub fn source_line_number(&self) -> u64 {
        self.source_line_number
    }

    /// Extract and trim one field, resolving unset pad/alignment from the
    /// reader defaults.
    pub fn field(&self, spec: &FieldSpec) -> Result<&'a [u8]> {
        extract_field(
            self.bytes,
            spec.start,
            spec.len,
            spec.pad.unwrap_or(self.default_pad),
            spec.alignment.unwrap_or(self.default_alignment),
        )
    }
}

/// Pull-based reader over fixed-width records in a byte buffer.
pub struct FixedWidthReader<'a> {
    buf: &'a [u8],
    pos: usize,
    opts: FixedWidthOptions,
    record_number: u64,
    line_number: u64,
}

impl<'a> FixedWidthReader<'a> {
    /// Validate `opts`, strip a UTF-8 byte-order mark, and discard the
    /// configured `skip_rows` count.
    pub fn new(buf: &'a [u8], opts: &FixedWidthOptions) -> Result<Self> {
        opts.validate()?;
        let stripped = <u8 as BufferUnit>::strip_bom(buf);
        if stripped.len() != buf.len() {
            debug!("stripped byte-order mark (3 bytes)");
        }

        let mut reader = FixedWidthReader {
            buf: stripped,
            pos: 0,
            opts: opts.clone(),
            record_number: 0,
            line_number: 1,
        };
        for _ in 0..reader.opts.skip_rows {
            if reader.frame_record()?.is_none() {
                break;
            }
        }
        Ok(reader)
    }

    /// Current cursor position in bytes.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Advance to the next record.
    pub fn next_record(&mut self) -> Result<Option<FixedRecord<'a>>> {
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

            let line = self.line_number;
            let Some(bytes) = self.frame_record()? else {
                return Ok(None);
            };
            if bytes.is_empty() && self.opts.record_length.is_none() && self.opts.skip_empty_lines
            {
                continue;
            }

            self.record_number += 1;
            return Ok(Some(FixedRecord {
                bytes,
                default_pad: self.opts.default_pad,
                default_alignment: self.opts.default_alignment,
                record_number: self.record_number,
                source_line_number: line,
            }));
        }
    }

    /// Carve the next record off the buffer and advance the cursor,
    /// without bumping the record counter.
    fn frame_record(&mut self) -> Result<Option<&'a [u8]>> {
        if self.pos >= self.buf.len() {
            return Ok(None);
        }

        match self.opts.record_length {
            Some(record_length) => {
                if self.pos + record_length > self.buf.len() {
                    return Err(Error::InvalidRecordLength {
                        record_number: self.record_number + 1,
                        offset: self.pos,
                        record_length,
                    });
                }
                let bytes = &self.buf[self.pos..self.pos + record_length];
                self.pos += record_length;
                if self.opts.track_source_lines {
                    self.line_number += bytes.iter().filter(|&&b| b == b'\n').count() as u64;
                }
                Ok(Some(bytes))
            }
            None => {
                let rest = &self.buf[self.pos..];
                let (bytes, consumed, newlines) = match memchr2(b'\r', b'\n', rest) {
                    None => (rest, rest.len(), 0),
                    Some(end) => {
                        let crlf = rest[end] == b'\r'
                            && rest.get(end + 1).is_some_and(|&b| b == b'\n');
                        let terminator = 1 + crlf as usize;
                        let lf = (rest[end] == b'\n' || crlf) as u64;
                        (&rest[..end], end + terminator, lf)
                    }
                };
                self.pos += consumed;
                if self.opts.track_source_lines {
                    self.line_number += newlines;
                }
                Ok(Some(bytes))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_field_alignments() {
        let record = b"ACME      0042 ";
        assert_eq!(
            extract_field(record, 0, 10, b' ', Alignment::Left).unwrap(),
            b"ACME"
        );
        assert_eq!(
            extract_field(record, 10, 4, b'0', Alignment::Right).unwrap(),
            b"42"
        );
        assert_eq!(
            extract_field(record, 0, 10, b' ', Alignment::None).unwrap(),
            b"ACME      "
        );
    }

    #[test]
    fn test_extract_field_center_trims_both_sides() {
        assert_eq!(
            extract_field(b"**mid**", 0, 7, b'*', Alignment::Center).unwrap(),
            b"mid"
        );
    }

    #[test]
    fn test_extract_field_all_pad_collapses_to_empty() {
        assert_eq!(
            extract_field(b"    ", 0, 4, b' ', Alignment::Center).unwrap(),
            b""
        );
        assert_eq!(
            extract_field(b"    ", 0, 4, b' ', Alignment::Left).unwrap(),
            b""
        );
    }

    #[test]
    fn test_extract_field_start_past_end_is_empty() {
        assert_eq!(
            extract_field(b"abc", 10, 4, b' ', Alignment::Left).unwrap(),
            b""
        );
    }

    #[test]
    fn test_extract_field_length_clamped() {
        assert_eq!(
            extract_field(b"abc", 1, 99, b' ', Alignment::Left).unwrap(),
            b"bc"
        );
    }

    #[test]
    fn test_extract_field_overflowing_coordinates_rejected() {
        let err = extract_field(b"abc", usize::MAX, 2, b' ', Alignment::Left).unwrap_err();
        assert!(matches!(err, Error::FieldOutOfBounds { .. }));
    }

    #[test]
    fn test_line_delimited_records() {
        let opts = FixedWidthOptions::default();
        let mut reader = FixedWidthReader::new(b"AAA1\r\nBBB2\nCCC3", &opts).unwrap();
        assert_eq!(reader.next_record().unwrap().unwrap().raw(), b"AAA1");
        assert_eq!(reader.next_record().unwrap().unwrap().raw(), b"BBB2");
        assert_eq!(reader.next_record().unwrap().unwrap().raw(), b"CCC3");
        assert!(reader.next_record().unwrap().is_none());
    }

    #[test]
    fn test_fixed_length_records() {
        let opts = FixedWidthOptions {
            record_length: Some(4),
            ..Default::default()
        };
        let mut reader = FixedWidthReader::new(b"AAAABBBBCCCC", &opts).unwrap();
        let first = reader.next_record().unwrap().unwrap();
        assert_eq!(first.raw(), b"AAAA");
        assert_eq!(first.raw().len(), 4);
        assert_eq!(reader.next_record().unwrap().unwrap().raw(), b"BBBB");
        assert_eq!(reader.next_record().unwrap().unwrap().raw(), b"CCCC");
        assert!(reader.next_record().unwrap().is_none());
    }

    #[test]
    fn test_trailing_partial_record_is_fatal() {
        let opts = FixedWidthOptions {
            record_length: Some(4),
            ..Default::default()
        };
        let mut reader = FixedWidthReader::new(b"AAAABB", &opts).unwrap();
        assert!(reader.next_record().unwrap().is_some());
        let err = reader.next_record().unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidRecordLength {
                record_number: 2,
                offset: 4,
                record_length: 4,
            }
        ));
    }

    #[test]
    fn test_record_field_uses_defaults_and_overrides() {
        let opts = FixedWidthOptions::default();
        let mut reader = FixedWidthReader::new(b"ACME      0042 \n", &opts).unwrap();
        let record = reader.next_record().unwrap().unwrap();
        assert_eq!(record.field(&FieldSpec::new(0, 10)).unwrap(), b"ACME");
        assert_eq!(
            record
                .field(
                    &FieldSpec::new(10, 4)
                        .with_pad(b'0')
                        .with_alignment(Alignment::Right)
                )
                .unwrap(),
            b"42"
        );
    }

    #[test]
    fn test_skip_rows_and_empty_lines() {
        let opts = FixedWidthOptions {
            skip_rows: 1,
            skip_empty_lines: true,
            ..Default::default()
        };
        let mut reader = FixedWidthReader::new(b"header\n\nDATA1\n\nDATA2\n", &opts).unwrap();
        assert_eq!(reader.next_record().unwrap().unwrap().raw(), b"DATA1");
        assert_eq!(reader.next_record().unwrap().unwrap().raw(), b"DATA2");
        assert!(reader.next_record().unwrap().is_none());
    }

    #[test]
    fn test_max_rows_enforced() {
        let opts = FixedWidthOptions {
            max_rows: 1,
            ..Default::default()
        };
        let mut reader = FixedWidthReader::new(b"a\nb\n", &opts).unwrap();
        assert!(reader.next_record().unwrap().is_some());
        assert!(matches!(
            reader.next_record().unwrap_err(),
            Error::TooManyRecords { .. }
        ));
    }

    #[test]
    fn test_source_lines_tracked() {
        let opts = FixedWidthOptions {
            track_source_lines: true,
            skip_empty_lines: true,
            ..Default::default()
        };
        let mut reader = FixedWidthReader::new(b"one\n\nthree\n", &opts).unwrap();
        assert_eq!(reader.next_record().unwrap().unwrap().source_line_number(), 1);
        assert_eq!(reader.next_record().unwrap().unwrap().source_line_number(), 3);
    }
}
