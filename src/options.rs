//! Parser and writer configuration.
//!
//! Options are constructed once, validated once, then treated as immutable.
//! [`ParserOptions::validate`], [`FixedWidthOptions::validate`] and
//! [`WriterOptions::validate`] are the single authority for rejecting bad
//! combinations; every other component assumes its options are already
//! valid.

use crate::error::{Error, Result};

/// Default ceiling for the number of columns per row.
pub const DEFAULT_MAX_COLUMNS: usize = 100_000;

/// Which side of a fixed-width field is padded, and therefore which side
/// gets trimmed on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Alignment {
    /// Data on the left, padding on the right; trailing pad is trimmed.
    #[default]
    Left,
    /// Data on the right, padding on the left; leading pad is trimmed.
    Right,
    /// Padding on both sides; both are trimmed.
    Center,
    /// No trimming at all.
    None,
}

/// When the writer wraps a field in quotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum QuoteStyle {
    /// Quote only fields containing the delimiter, the quote, CR, or LF.
    #[default]
    WhenNeeded,
    /// Quote every field.
    Always,
    /// Never quote; the caller is responsible for the consequences.
    Never,
}

/// How the writer defuses fields that a spreadsheet would execute as a
/// formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InjectionProtection {
    /// Pass fields through untouched.
    #[default]
    None,
    /// Quote the field and prefix the body with a single-quote character.
    EscapeWithQuote,
    /// Quote the field and prefix the body with a TAB character.
    EscapeWithTab,
    /// Strip leading dangerous characters and write the remainder.
    Sanitize,
    /// Fail with `InjectionDetected`.
    Reject,
}

/// Immutable configuration for the DSV tokenizer and streaming reader.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParserOptions {
    /// Field delimiter; must be ASCII (0–127).
    pub delimiter: u8,
    /// Quote character; must be ASCII and differ from `delimiter`.
    pub quote: u8,
    /// Optional escape character. The unit following it is consumed as
    /// literal field content. Configuring an escape disables the SIMD path.
    pub escape: Option<u8>,
    /// Optional comment character. Lines whose first non-whitespace unit
    /// equals this are skipped entirely.
    pub comment: Option<u8>,
    /// Hard ceiling on columns per row.
    pub max_columns: usize,
    /// Hard ceiling on yielded records.
    pub max_rows: u64,
    /// Optional ceiling on a single field's length in units.
    pub max_field_length: Option<usize>,
    /// Permit CR/LF inside quoted fields. Requires `enable_quoted_fields`.
    pub allow_newlines_in_quotes: bool,
    /// When false, the quote character has no special meaning.
    pub enable_quoted_fields: bool,
    /// Trim ASCII space and tab from unquoted fields only. Unicode
    /// whitespace is deliberately not recognized.
    pub trim_unquoted_fields: bool,
    /// Diagnostic switch for the vectorized scan path.
    pub use_simd: bool,
    /// Count source lines so row views can report where they began.
    pub track_source_lines: bool,
    /// Number of leading rows to tokenize and discard.
    pub skip_rows: usize,
    /// Silently skip rows with no content.
    pub skip_empty_lines: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        ParserOptions {
            delimiter: b',',
            quote: b'"',
            escape: None,
            comment: None,
            max_columns: DEFAULT_MAX_COLUMNS,
            max_rows: u64::MAX,
            max_field_length: None,
            allow_newlines_in_quotes: false,
            enable_quoted_fields: true,
            trim_unquoted_fields: false,
            use_simd: true,
            track_source_lines: false,
            skip_rows: 0,
            skip_empty_lines: false,
        }
    }
}

fn require_ascii(name: &str, value: u8) -> Result<()> {
    if value > 0x7F {
        return Err(Error::InvalidOptions(format!(
            "{name} must be ASCII (0–127), got 0x{value:02X}"
        )));
    }
    Ok(())
}

impl ParserOptions {
    /// Check every rejection rule. Called once by reader constructors.
    pub fn validate(&self) -> Result<()> {
        require_ascii("delimiter", self.delimiter)?;
        require_ascii("quote", self.quote)?;
        if let Some(escape) = self.escape {
            require_ascii("escape", escape)?;
        }
        if let Some(comment) = self.comment {
            require_ascii("comment", comment)?;
        }

        if self.delimiter == self.quote {
            return Err(Error::InvalidDelimiter(
                "delimiter and quote must differ".into(),
            ));
        }
        if Some(self.delimiter) == self.comment {
            return Err(Error::InvalidDelimiter(
                "delimiter and comment must differ".into(),
            ));
        }
        if Some(self.delimiter) == self.escape {
            return Err(Error::InvalidDelimiter(
                "delimiter and escape must differ".into(),
            ));
        }
        if Some(self.quote) == self.comment {
            return Err(Error::InvalidOptions(
                "quote and comment must differ".into(),
            ));
        }
        if Some(self.quote) == self.escape {
            return Err(Error::InvalidOptions("quote and escape must differ".into()));
        }
        if self.comment.is_some() && self.comment == self.escape {
            return Err(Error::InvalidOptions(
                "comment and escape must differ".into(),
            ));
        }

        if self.max_columns == 0 {
            return Err(Error::InvalidOptions("max_columns must be positive".into()));
        }
        if self.max_rows == 0 {
            return Err(Error::InvalidOptions("max_rows must be positive".into()));
        }
        if self.max_field_length == Some(0) {
            return Err(Error::InvalidOptions(
                "max_field_length must be positive".into(),
            ));
        }
        if self.allow_newlines_in_quotes && !self.enable_quoted_fields {
            return Err(Error::InvalidOptions(
                "allow_newlines_in_quotes requires enable_quoted_fields".into(),
            ));
        }
        Ok(())
    }
}

/// Immutable configuration for the fixed-width reader.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FixedWidthOptions {
    /// When set, records are consecutive blocks of exactly this many bytes
    /// with no terminators. When unset, records are line-delimited.
    pub record_length: Option<usize>,
    /// Pad byte assumed for fields that do not override it.
    pub default_pad: u8,
    /// Alignment assumed for fields that do not override it.
    pub default_alignment: Alignment,
    /// Number of leading records to discard.
    pub skip_rows: usize,
    /// Skip zero-length records (line-delimited framing only).
    pub skip_empty_lines: bool,
    /// Hard ceiling on yielded records.
    pub max_rows: u64,
    /// Count source lines for record views.
    pub track_source_lines: bool,
}

impl Default for FixedWidthOptions {
    fn default() -> Self {
        FixedWidthOptions {
            record_length: None,
            default_pad: b' ',
            default_alignment: Alignment::Left,
            skip_rows: 0,
            skip_empty_lines: false,
            max_rows: u64::MAX,
            track_source_lines: false,
        }
    }
}

impl FixedWidthOptions {
    /// Check every rejection rule. Called once by reader constructors.
    pub fn validate(&self) -> Result<()> {
        if self.record_length == Some(0) {
            return Err(Error::InvalidOptions(
                "record_length must be positive".into(),
            ));
        }
        if self.max_rows == 0 {
            return Err(Error::InvalidOptions("max_rows must be positive".into()));
        }
        Ok(())
    }
}

/// Immutable configuration for the row writer.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WriterOptions {
    /// Field delimiter; must be ASCII.
    pub delimiter: u8,
    /// Quote character; must be ASCII and differ from `delimiter`.
    pub quote: u8,
    /// Record terminator. Non-empty, CR and LF bytes only.
    pub newline: String,
    /// When fields are wrapped in quotes.
    pub quote_style: QuoteStyle,
    /// Text written for null fields.
    pub null_value: String,
    /// Formula-injection countermeasure.
    pub injection_protection: InjectionProtection,
    /// Extra characters treated as dangerous leading characters.
    pub additional_dangerous_chars: Vec<char>,
    /// Cumulative ceiling on emitted bytes.
    pub max_output_size: Option<u64>,
    /// Ceiling on a single field's formatted length.
    pub max_field_size: Option<usize>,
    /// Ceiling on fields per row.
    pub max_column_count: Option<usize>,
    /// Ceiling on terminated rows.
    pub max_row_count: Option<u64>,
}

impl Default for WriterOptions {
    fn default() -> Self {
        WriterOptions {
            delimiter: b',',
            quote: b'"',
            newline: "\r\n".to_owned(),
            quote_style: QuoteStyle::WhenNeeded,
            null_value: String::new(),
            injection_protection: InjectionProtection::None,
            additional_dangerous_chars: Vec::new(),
            max_output_size: None,
            max_field_size: None,
            max_column_count: None,
            max_row_count: None,
        }
    }
}

impl WriterOptions {
    /// Check every rejection rule. Called once by writer constructors.
    pub fn validate(&self) -> Result<()> {
        require_ascii("delimiter", self.delimiter)?;
        require_ascii("quote", self.quote)?;
        if self.delimiter == self.quote {
            return Err(Error::InvalidDelimiter(
                "delimiter and quote must differ".into(),
            ));
        }

        if self.newline.is_empty() {
            return Err(Error::InvalidOptions("newline must not be empty".into()));
        }
        if self.newline.bytes().any(|b| b != b'\r' && b != b'\n') {
            return Err(Error::InvalidOptions(
                "newline may contain only CR and LF".into(),
            ));
        }

        if self.max_output_size == Some(0) {
            return Err(Error::InvalidOptions(
                "max_output_size must be positive".into(),
            ));
        }
        if self.max_field_size == Some(0) {
            return Err(Error::InvalidOptions(
                "max_field_size must be positive".into(),
            ));
        }
        if self.max_column_count == Some(0) {
            return Err(Error::InvalidOptions(
                "max_column_count must be positive".into(),
            ));
        }
        if self.max_row_count == Some(0) {
            return Err(Error::InvalidOptions(
                "max_row_count must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_parser_options_are_valid() {
        assert!(ParserOptions::default().validate().is_ok());
    }

    #[test]
    fn test_non_ascii_delimiter_rejected() {
        let opts = ParserOptions {
            delimiter: 0x80,
            ..Default::default()
        };
        assert!(matches!(opts.validate(), Err(Error::InvalidOptions(_))));
    }

    #[test]
    fn test_delimiter_equal_quote_rejected() {
        let opts = ParserOptions {
            delimiter: b'"',
            ..Default::default()
        };
        assert!(matches!(opts.validate(), Err(Error::InvalidDelimiter(_))));
    }

    #[test]
    fn test_quote_equal_comment_rejected() {
        let opts = ParserOptions {
            comment: Some(b'"'),
            ..Default::default()
        };
        assert!(matches!(opts.validate(), Err(Error::InvalidOptions(_))));
    }

    #[test]
    fn test_escape_collisions_rejected() {
        let with_escape = |escape| ParserOptions {
            escape: Some(escape),
            comment: Some(b'#'),
            ..Default::default()
        };
        assert!(with_escape(b',').validate().is_err());
        assert!(with_escape(b'"').validate().is_err());
        assert!(with_escape(b'#').validate().is_err());
        assert!(with_escape(b'\\').validate().is_ok());
    }

    #[test]
    fn test_zero_ceilings_rejected() {
        let opts = ParserOptions {
            max_columns: 0,
            ..Default::default()
        };
        assert!(opts.validate().is_err());

        let opts = ParserOptions {
            max_rows: 0,
            ..Default::default()
        };
        assert!(opts.validate().is_err());

        let opts = ParserOptions {
            max_field_length: Some(0),
            ..Default::default()
        };
        assert!(opts.validate().is_err());
    }

    #[test]
    fn test_newlines_in_quotes_requires_quoted_fields() {
        let opts = ParserOptions {
            allow_newlines_in_quotes: true,
            enable_quoted_fields: false,
            ..Default::default()
        };
        assert!(opts.validate().is_err());
    }

    #[test]
    fn test_fixed_width_zero_record_length_rejected() {
        let opts = FixedWidthOptions {
            record_length: Some(0),
            ..Default::default()
        };
        assert!(opts.validate().is_err());
    }

    #[test]
    fn test_writer_newline_rules() {
        let mut opts = WriterOptions::default();
        assert!(opts.validate().is_ok());

        opts.newline = String::new();
        assert!(opts.validate().is_err());

        opts.newline = "\n".into();
        assert!(opts.validate().is_ok());

        opts.newline = ";\n".into();
        assert!(opts.validate().is_err());
    }

    #[test]
    fn test_writer_zero_caps_rejected() {
        let opts = WriterOptions {
            max_output_size: Some(0),
            ..Default::default()
        };
        assert!(opts.validate().is_err());

        let opts = WriterOptions {
            max_field_size: Some(0),
            ..Default::default()
        };
        assert!(opts.validate().is_err());

        let opts = WriterOptions {
            max_column_count: Some(0),
            ..Default::default()
        };
        assert!(opts.validate().is_err());

        let opts = WriterOptions {
            max_row_count: Some(0),
            ..Default::default()
        };
        assert!(opts.validate().is_err());
    }
}
