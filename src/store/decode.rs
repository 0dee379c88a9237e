//! Type-specific decoding of raw values.
//!
//! Decoding never fails: a missing key yields the default silently, a value
//! that does not parse yields the default with a warning.

use crate::observability::metrics;
use crate::schema::{FieldKind, Value};
use crate::store::parser::unquote;

/// Decode a boolean. `true`, `t`, `1`, `yes` and `y` (any case) are true,
/// anything else is false.
pub fn decode_bool(raw: &str) -> bool {
    matches!(
        raw.trim().to_lowercase().as_str(),
        "true" | "t" | "1" | "yes" | "y"
    )
}

/// Decode a string list: `["a", "b"]`, or a bare value as a single item.
/// Commas inside quoted items do not split.
pub fn decode_list(raw: &str) -> Vec<String> {
    let raw = raw.trim();
    if raw.len() >= 2 && raw.starts_with('[') && raw.ends_with(']') {
        let inner = raw[1..raw.len() - 1].trim();
        if inner.is_empty() {
            return Vec::new();
        }
        return split_items(inner).iter().map(|item| unquote(item.trim())).collect();
    }
    vec![raw.to_string()]
}

fn split_items(inner: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escaped = false;

    for c in inner.chars() {
        if in_quotes {
            current.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_quotes = false;
            }
        } else if c == ',' {
            items.push(std::mem::take(&mut current));
        } else {
            in_quotes = c == '"';
            current.push(c);
        }
    }
    items.push(current);
    items
}

/// Match `raw` against enum variants, case-insensitively.
pub fn decode_enum<'a>(raw: &str, variants: &'a [String]) -> Option<&'a String> {
    let wanted = raw.trim().to_uppercase();
    variants.iter().find(|v| v.to_uppercase() == wanted)
}

/// Decode the raw value stored under `key` as `kind`.
pub fn decode(key: &str, kind: &FieldKind, raw: Option<&str>, default: &Value) -> Value {
    let Some(raw) = raw else {
        return default.clone();
    };

    let decoded = match kind {
        FieldKind::Bool => Some(Value::Bool(decode_bool(raw))),
        FieldKind::Int => raw.trim().parse().ok().map(Value::Int),
        FieldKind::Long => raw.trim().parse().ok().map(Value::Long),
        FieldKind::Double => raw.trim().parse().ok().map(Value::Double),
        FieldKind::String => Some(Value::String(raw.to_string())),
        FieldKind::Enum(variants) => decode_enum(raw, variants).cloned().map(Value::Enum),
        FieldKind::StringList => Some(Value::List(decode_list(raw))),
    };

    decoded.unwrap_or_else(|| {
        tracing::warn!(
            key,
            value = raw,
            default = %default,
            "Invalid {} value, using default",
            kind.name()
        );
        metrics::record_decode_fallback();
        default.clone()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_truthy_set() {
        for raw in ["true", "T", "1", "Yes", "y", " TRUE "] {
            assert!(decode_bool(raw), "{raw} should be true");
        }
        for raw in ["false", "0", "no", "on", ""] {
            assert!(!decode_bool(raw), "{raw} should be false");
        }
    }

    #[test]
    fn test_numeric_fallback() {
        assert_eq!(decode("k", &FieldKind::Int, Some(" 12 "), &Value::Int(1)), Value::Int(12));
        assert_eq!(decode("k", &FieldKind::Int, Some("abc"), &Value::Int(1)), Value::Int(1));
        assert_eq!(
            decode("k", &FieldKind::Int, Some("9999999999"), &Value::Int(1)),
            Value::Int(1)
        );
        assert_eq!(
            decode("k", &FieldKind::Long, Some("9999999999"), &Value::Long(1)),
            Value::Long(9_999_999_999)
        );
        assert_eq!(
            decode("k", &FieldKind::Double, Some("0.25"), &Value::Double(1.0)),
            Value::Double(0.25)
        );
    }

    #[test]
    fn test_missing_key_uses_default() {
        assert_eq!(
            decode("k", &FieldKind::String, None, &Value::String("d".into())),
            Value::String("d".into())
        );
    }

    #[test]
    fn test_enum_matching() {
        let kind = FieldKind::Enum(vec!["SIMPLE".into(), "VANILLA".into()]);
        let default = Value::Enum("SIMPLE".into());
        assert_eq!(
            decode("k", &kind, Some("vanilla"), &default),
            Value::Enum("VANILLA".into())
        );
        assert_eq!(decode("k", &kind, Some("fancy"), &default), default);
    }

    #[test]
    fn test_list_forms() {
        assert_eq!(decode_list("[\"a\", \"b\"]"), vec!["a", "b"]);
        assert_eq!(decode_list("[a, b ]"), vec!["a", "b"]);
        assert_eq!(decode_list("[]"), Vec::<String>::new());
        assert_eq!(decode_list("single"), vec!["single"]);
    }

    #[test]
    fn test_list_items_keep_commas_and_escapes() {
        assert_eq!(decode_list("[\"a,b\", \"c\"]"), vec!["a,b", "c"]);
        assert_eq!(decode_list("[\"say \\\"x, y\\\"\"]"), vec!["say \"x, y\""]);
        assert_eq!(decode_list("[\" padded \"]"), vec![" padded "]);
    }

    #[test]
    fn test_strings_keep_inner_whitespace() {
        assert_eq!(
            decode("k", &FieldKind::String, Some("  padded  "), &Value::String("d".into())),
            Value::String("  padded  ".into())
        );
    }
}
