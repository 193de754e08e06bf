//! Tests for CR, LF, and CRLF handling.
//!
//! These tests ensure that:
//! 1. CRLF is treated as a single line ending (not two)
//! 2. Mixed line endings (LF, CR, CRLF) are handled correctly
//! 3. Line counters advance on LF units only

use super::common::parse_all;
use crate::{ParserOptions, RowReader};

#[test]
fn test_crlf_rows() {
    let rows = parse_all("name,age\r\nAlice,30\r\nBob,25", &ParserOptions::default());
    assert_eq!(
        rows,
        vec![
            vec!["name", "age"],
            vec!["Alice", "30"],
            vec!["Bob", "25"]
        ]
    );
}

#[test]
fn test_crlf_with_trailing_terminator() {
    let rows = parse_all("a,b\r\n", &ParserOptions::default());
    assert_eq!(rows, vec![vec!["a", "b"]]);
}

#[test]
fn test_mixed_line_endings() {
    let rows = parse_all("a\r\nb\nc\rd", &ParserOptions::default());
    assert_eq!(rows, vec![vec!["a"], vec!["b"], vec!["c"], vec!["d"]]);
}

#[test]
fn test_lone_cr_terminates_row() {
    let rows = parse_all("a,b\rc,d", &ParserOptions::default());
    assert_eq!(rows, vec![vec!["a", "b"], vec!["c", "d"]]);
}

#[test]
fn test_source_lines_count_lf_only() {
    let opts = ParserOptions {
        track_source_lines: true,
        ..Default::default()
    };
    // CRLF and LF advance the counter; the lone CR after "two" does not.
    let input = "one\r\ntwo\rthree\nfour";
    let mut reader = RowReader::new(input.as_bytes(), &opts).unwrap();
    let lines: Vec<u64> = std::iter::from_fn(|| {
        reader
            .next_row()
            .unwrap()
            .map(|row| row.source_line_number())
    })
    .collect();
    assert_eq!(lines, vec![1, 2, 2, 3]);
}

#[test]
fn test_crlf_inside_quotes_counts_one_line() {
    let opts = ParserOptions {
        allow_newlines_in_quotes: true,
        track_source_lines: true,
        ..Default::default()
    };
    let input = "\"a\r\nb\"\nsecond\n";
    let mut reader = RowReader::new(input.as_bytes(), &opts).unwrap();
    assert_eq!(reader.next_row().unwrap().unwrap().source_line_number(), 1);
    assert_eq!(reader.next_row().unwrap().unwrap().source_line_number(), 3);
}

#[test]
fn test_consecutive_crlf_yields_empty_rows() {
    let rows = parse_all("a\r\n\r\nb\r\n", &ParserOptions::default());
    assert_eq!(rows, vec![vec!["a"], vec![""], vec!["b"]]);
}
