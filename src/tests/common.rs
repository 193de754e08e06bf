use crate::{ParserOptions, RowReader};

/// Helper function to escape a DSV field with quotes when needed.
#[allow(dead_code)]
pub(crate) fn escape_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Helper function to build a DSV document from rows of fields.
#[allow(dead_code)]
pub(crate) fn create_dsv(rows: &[Vec<String>]) -> String {
    let mut dsv = String::new();
    for row in rows {
        dsv.push_str(
            &row.iter()
                .map(|f| escape_field(f))
                .collect::<Vec<_>>()
                .join(","),
        );
        dsv.push('\n');
    }
    dsv
}

/// Parse a full document into unquoted field strings, one vector per row.
pub(crate) fn parse_all(input: &str, opts: &ParserOptions) -> Vec<Vec<String>> {
    let mut reader = RowReader::new(input.as_bytes(), opts).expect("valid options");
    let mut rows = Vec::new();
    while let Some(row) = reader.next_row().expect("parse succeeds") {
        rows.push(
            (0..row.column_count())
                .map(|i| row.field_str(i).unwrap().unwrap().into_owned())
                .collect(),
        );
    }
    rows
}
