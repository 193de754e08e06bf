//! Security tests for formula-injection protection.
//!
//! Tests for:
//! - the always-dangerous leading characters
//! - the conditional `-`/`+` rule (numbers and phone patterns are safe)
//! - every transform (EscapeWithQuote, EscapeWithTab, Sanitize, Reject)
//! - caller-configured additional dangerous characters

mod tests {
    use crate::error::Error;
    use crate::options::{InjectionProtection, WriterOptions};
    use crate::writer::{is_dangerous, FieldValue, RowWriter};

    fn opts(protection: InjectionProtection) -> WriterOptions {
        WriterOptions {
            injection_protection: protection,
            ..Default::default()
        }
    }

    fn write_one(opts: &WriterOptions, field: &str) -> Result<String, Error> {
        let mut writer = RowWriter::new(Vec::new(), opts)?;
        writer.write_field(FieldValue::Str(field))?;
        writer.end_row()?;
        let sink = writer.finish()?;
        Ok(String::from_utf8(sink).expect("writer output is UTF-8"))
    }

    // =========================================================================
    // Dangerousness classification
    // =========================================================================

    #[test]
    fn test_always_dangerous_characters() {
        for field in ["=SUM(A1)", "@cmd", "\tpayload", "\rpayload"] {
            assert!(is_dangerous(field, &[]), "{field:?} must be dangerous");
        }
    }

    #[test]
    fn test_plain_text_is_safe() {
        for field in ["hello", "1234", "a=b", "x@y.com", ""] {
            assert!(!is_dangerous(field, &[]), "{field:?} must be safe");
        }
    }

    #[test]
    fn test_minus_plus_number_patterns_are_safe() {
        for field in ["-", "+", "-1", "+42", "-.5", "+.5", "-123-456"] {
            assert!(!is_dangerous(field, &[]), "{field:?} must be safe");
        }
    }

    #[test]
    fn test_minus_plus_formula_patterns_are_dangerous() {
        for field in ["-SUM(A1)", "+cmd|' /C calc'!A0", "-=1", "+ 1"] {
            assert!(is_dangerous(field, &[]), "{field:?} must be dangerous");
        }
    }

    #[test]
    fn test_additional_dangerous_chars() {
        assert!(!is_dangerous("%test", &[]));
        assert!(is_dangerous("%test", &['%']));
    }

    // =========================================================================
    // Transforms
    // =========================================================================

    #[test]
    fn test_escape_with_quote() {
        let out = write_one(&opts(InjectionProtection::EscapeWithQuote), "=SUM(A1)").unwrap();
        assert_eq!(out, "\"'=SUM(A1)\"\r\n");
    }

    #[test]
    fn test_escape_with_quote_doubles_embedded_quotes() {
        let out = write_one(&opts(InjectionProtection::EscapeWithQuote), "=A1&\"x\"").unwrap();
        assert_eq!(out, "\"'=A1&\"\"x\"\"\"\r\n");
    }

    #[test]
    fn test_escape_with_tab() {
        let out = write_one(&opts(InjectionProtection::EscapeWithTab), "=SUM(A1)").unwrap();
        assert_eq!(out, "\"\t=SUM(A1)\"\r\n");
    }

    #[test]
    fn test_sanitize_strips_leading_dangerous_run() {
        let out = write_one(&opts(InjectionProtection::Sanitize), "==@=1").unwrap();
        assert_eq!(out, "1\r\n");
    }

    #[test]
    fn test_sanitize_keeps_number_after_sign() {
        // Stripping '=' exposes "-1", which the smart rule keeps intact.
        let out = write_one(&opts(InjectionProtection::Sanitize), "=-1").unwrap();
        assert_eq!(out, "-1\r\n");
    }

    #[test]
    fn test_sanitize_can_empty_the_field() {
        let out = write_one(&opts(InjectionProtection::Sanitize), "===").unwrap();
        assert_eq!(out, "\r\n");
    }

    #[test]
    fn test_reject_fails_with_coordinates() {
        let err = write_one(&opts(InjectionProtection::Reject), "=SUM(A1)").unwrap_err();
        match err {
            Error::InjectionDetected {
                record_number,
                column,
                sample,
            } => {
                assert_eq!(record_number, 1);
                assert_eq!(column, 1);
                assert_eq!(sample, "=SUM(A1)");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_protection_off_passes_formulas_through() {
        let out = write_one(&opts(InjectionProtection::None), "=SUM(A1)").unwrap();
        assert_eq!(out, "=SUM(A1)\r\n");
    }

    #[test]
    fn test_safe_fields_unaffected_by_protection() {
        let out = write_one(&opts(InjectionProtection::EscapeWithQuote), "plain").unwrap();
        assert_eq!(out, "plain\r\n");
    }

    // =========================================================================
    // End-to-end scenario: protected row opens safely
    // =========================================================================

    #[test]
    fn test_protected_row_matches_expected_shape() {
        let mut writer =
            RowWriter::new(Vec::new(), &opts(InjectionProtection::EscapeWithQuote)).unwrap();
        writer.write_row(["=SUM(A1)", "ok"]).unwrap();
        let out = String::from_utf8(writer.finish().unwrap()).unwrap();
        assert!(out.starts_with("\"'=SUM(A1)\",ok\r\n"));
    }
}
