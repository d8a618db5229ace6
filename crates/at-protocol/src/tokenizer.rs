//! Field tokenization for response data lines.
//!
//! Data lines such as `+COPS: 0,2,"26201",7` carry comma separated fields.
//! [`split`] breaks such a string into [`FieldValue`]s, stripping symmetric
//! quotes and optionally coercing whole-integer tokens.
//!
//! The splitter is deliberately naive: a delimiter inside a quoted token is
//! still a delimiter, so `"a,b"` yields the two fragments `"a` and `b"`.

use std::fmt;

/// Default field delimiter.
pub const DEFAULT_DELIMITER: &str = ",";

/// A single field of a data line, or a single argument of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// The whole token parsed as an integer.
    Int(i64),
    /// Anything else, with outer quotes removed.
    Text(String),
}

impl FieldValue {
    /// Get the integer if this is an `Int` field.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            FieldValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the text if this is a `Text` field.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Render the value as a command argument.
    ///
    /// Integers are written bare and text is double quoted, which is what
    /// AT command parsers expect for string parameters.
    pub fn to_argument(&self) -> String {
        match self {
            FieldValue::Int(v) => v.to_string(),
            FieldValue::Text(s) => format!("\"{}\"", s),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Int(v) => write!(f, "{}", v),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

/// Split `text` on `delimiter` into typed fields.
///
/// Empty fragments are dropped. A fragment of at least two characters that
/// starts and ends with the same quote character (`"` or `'`) loses both
/// quotes. With `convert_numeric`, a fragment whose entire content parses as
/// an integer becomes [`FieldValue::Int`]; otherwise it stays text.
pub fn split(text: &str, delimiter: &str, convert_numeric: bool) -> Vec<FieldValue> {
    let delimiter = if delimiter.is_empty() {
        DEFAULT_DELIMITER
    } else {
        delimiter
    };

    text.split(delimiter)
        .filter(|fragment| !fragment.is_empty())
        .map(|fragment| {
            let token = strip_quotes(fragment);
            if convert_numeric {
                if let Ok(v) = token.trim().parse::<i64>() {
                    return FieldValue::Int(v);
                }
            }
            FieldValue::Text(token.to_string())
        })
        .collect()
}

/// Strip one pair of matching outer quotes.
fn strip_quotes(token: &str) -> &str {
    let bytes = token.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'"' || first == b'\'') {
            return &token[1..token.len() - 1];
        }
    }
    token
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_mixed_fields() {
        let fields = split("1,\"abc\",2", ",", true);
        assert_eq!(
            fields,
            vec![
                FieldValue::Int(1),
                FieldValue::Text("abc".to_string()),
                FieldValue::Int(2),
            ]
        );
    }

    #[test]
    fn test_split_ignores_quoted_delimiter() {
        let fields = split("\"a,b\"", ",", true);
        assert_eq!(
            fields,
            vec![
                FieldValue::Text("\"a".to_string()),
                FieldValue::Text("b\"".to_string()),
            ]
        );
    }

    #[test]
    fn test_split_drops_empty_fragments() {
        let fields = split(",,7,,", ",", true);
        assert_eq!(fields, vec![FieldValue::Int(7)]);
    }

    #[test]
    fn test_split_without_conversion() {
        let fields = split("0,2,'26201'", ",", false);
        assert_eq!(
            fields,
            vec![
                FieldValue::Text("0".to_string()),
                FieldValue::Text("2".to_string()),
                FieldValue::Text("26201".to_string()),
            ]
        );
    }

    #[test]
    fn test_quoted_number_is_coerced() {
        // Quotes are stripped first, then the whole token is tried as an integer.
        assert_eq!(split("\"42\"", ",", true), vec![FieldValue::Int(42)]);
    }

    #[test]
    fn test_partial_number_stays_text() {
        assert_eq!(
            split("12ab;-3", ";", true),
            vec![FieldValue::Text("12ab".to_string()), FieldValue::Int(-3)]
        );
    }

    #[test]
    fn test_unmatched_quote_left_alone() {
        assert_eq!(
            split("\"abc,'x\"", ",", true),
            vec![
                FieldValue::Text("\"abc".to_string()),
                FieldValue::Text("'x\"".to_string()),
            ]
        );
    }

    #[test]
    fn test_single_quote_char_not_stripped() {
        assert_eq!(split("\"", ",", true), vec![FieldValue::Text("\"".to_string())]);
    }

    #[test]
    fn test_field_accessors() {
        let fields = split("21,\"LTE\"", ",", true);
        assert_eq!(fields[0].as_int(), Some(21));
        assert_eq!(fields[0].as_text(), None);
        assert_eq!(fields[1].as_text(), Some("LTE"));
        assert_eq!(fields[1].as_int(), None);
    }

    #[test]
    fn test_to_argument() {
        assert_eq!(FieldValue::Int(5).to_argument(), "5");
        assert_eq!(FieldValue::from("IP").to_argument(), "\"IP\"");
    }
}
