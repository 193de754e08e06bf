//! Zero-copy row views.
//!
//! A [`RowView`] borrows the parser's input buffer and must not outlive
//! it; every column span satisfies `start + len <= row.len()`. For values
//! that must escape the call stack, [`RowView::to_owned_row`] produces an
//! [`OwnedRow`] by copying the row's units.

use std::borrow::Cow;
use std::str::Utf8Error;

use crate::tokenizer::{unquote, ColumnSpan};
use crate::unit::BufferUnit;

/// A read-only slice of the input buffer representing one logical record.
///
/// `'a` is the input buffer's lifetime; `'r` is the reader borrow that
/// owns the column spans. Field slices live for the full `'a`.
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a, 'r, U: BufferUnit> {
    row: &'a [U],
    columns: &'r [ColumnSpan],
    quote: u8,
    record_number: u64,
    source_line_number: u64,
}

impl<'a, 'r, U: BufferUnit> RowView<'a, 'r, U> {
    pub(crate) fn new(
        row: &'a [U],
        columns: &'r [ColumnSpan],
        quote: u8,
        record_number: u64,
        source_line_number: u64,
    ) -> Self {
        RowView {
            row,
            columns,
            quote,
            record_number,
            source_line_number,
        }
    }

    /// The raw row content, terminator excluded.
    #[inline]
    pub fn raw(&self) -> &'a [U] {
        self.row
    }

    /// Number of columns in this row.
    #[inline]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// The `(start, len)` spans of every column.
    #[inline]
    pub fn column_spans(&self) -> &'r [ColumnSpan] {
        self.columns
    }

    /// 1-based count of rows yielded so far, this one included.
    #[inline]
    pub fn record_number(&self) -> u64 {
        self.record_number
    }

    /// 1-based source line this row began on. Meaningful only when
    /// `track_source_lines` is enabled; otherwise stays at 1.
    #[inline]
    pub fn source_line_number(&self) -> u64 {
        self.source_line_number
    }

    /// The raw field at `index`, quotes included. `None` past the last
    /// column.
    #[inline]
    pub fn field(&self, index: usize) -> Option<&'a [U]> {
        self.columns.get(index).map(|span| &self.row[span.range()])
    }

    /// The logical field value at `index`: surrounding quotes stripped and
    /// doubled quotes collapsed, borrowing when nothing needs rewriting.
    pub fn unquote_field(&self, index: usize) -> Option<Cow<'a, [U]>> {
        self.field(index).map(|raw| unquote(raw, self.quote))
    }

    /// Iterate the raw fields left to right.
    pub fn fields(&self) -> impl Iterator<Item = &'a [U]> + '_ {
        self.columns.iter().map(|span| &self.row[span.range()])
    }

    /// Copy this view into storage that may outlive the input buffer.
    pub fn to_owned_row(&self) -> OwnedRow<U> {
        OwnedRow {
            row: self.row.to_vec(),
            columns: self.columns.to_vec(),
            quote: self.quote,
            record_number: self.record_number,
            source_line_number: self.source_line_number,
        }
    }
}

impl<'a, 'r> RowView<'a, 'r, u8> {
    /// The logical field value at `index` as UTF-8 text.
    pub fn field_str(&self, index: usize) -> Option<Result<Cow<'a, str>, Utf8Error>> {
        self.unquote_field(index).map(cow_into_str)
    }
}

fn cow_into_str(units: Cow<'_, [u8]>) -> Result<Cow<'_, str>, Utf8Error> {
    match units {
        Cow::Borrowed(bytes) => std::str::from_utf8(bytes).map(Cow::Borrowed),
        Cow::Owned(bytes) => match String::from_utf8(bytes) {
            Ok(text) => Ok(Cow::Owned(text)),
            Err(err) => Err(err.utf8_error()),
        },
    }
}

/// An owned copy of a [`RowView`], detached from the input buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedRow<U: BufferUnit> {
    row: Vec<U>,
    columns: Vec<ColumnSpan>,
    quote: u8,
    record_number: u64,
    source_line_number: u64,
}

impl<U: BufferUnit> OwnedRow<U> {
    /// The raw row content, terminator excluded.
    #[inline]
    pub fn raw(&self) -> &[U] {
        &self.row
    }

    /// Number of columns in this row.
    #[inline]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// 1-based record number carried over from the view.
    #[inline]
    pub fn record_number(&self) -> u64 {
        self.record_number
    }

    /// 1-based source line carried over from the view.
    #[inline]
    pub fn source_line_number(&self) -> u64 {
        self.source_line_number
    }

    /// The raw field at `index`, quotes included.
    #[inline]
    pub fn field(&self, index: usize) -> Option<&[U]> {
        self.columns.get(index).map(|span| &self.row[span.range()])
    }

    /// The logical field value at `index`.
    pub fn unquote_field(&self, index: usize) -> Option<Cow<'_, [U]>> {
        self.field(index).map(|raw| unquote(raw, self.quote))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view<'a, 'r>(
        row: &'a [u8],
        columns: &'r [ColumnSpan],
    ) -> RowView<'a, 'r, u8> {
        RowView::new(row, columns, b'"', 1, 1)
    }

    #[test]
    fn test_field_access_and_bounds() {
        let row = b"a,\"b,b\"";
        let columns = [
            ColumnSpan { start: 0, len: 1 },
            ColumnSpan { start: 2, len: 5 },
        ];
        let view = view(row, &columns);
        assert_eq!(view.column_count(), 2);
        assert_eq!(view.field(0), Some(b"a".as_slice()));
        assert_eq!(view.field(1), Some(b"\"b,b\"".as_slice()));
        assert_eq!(view.field(2), None);
    }

    #[test]
    fn test_unquote_field_and_str() {
        let row = b"\"he said \"\"hi\"\"\",x";
        let columns = [
            ColumnSpan { start: 0, len: 16 },
            ColumnSpan { start: 17, len: 1 },
        ];
        let view = view(row, &columns);
        assert_eq!(&*view.unquote_field(0).unwrap(), b"he said \"hi\"");
        assert_eq!(view.field_str(0).unwrap().unwrap(), "he said \"hi\"");
        assert_eq!(view.field_str(1).unwrap().unwrap(), "x");
    }

    #[test]
    fn test_owned_row_survives_buffer() {
        let owned = {
            let row = b"a,b".to_vec();
            let columns = [
                ColumnSpan { start: 0, len: 1 },
                ColumnSpan { start: 2, len: 1 },
            ];
            view(&row, &columns).to_owned_row()
        };
        assert_eq!(owned.column_count(), 2);
        assert_eq!(owned.field(1), Some(b"b".as_slice()));
    }
}
