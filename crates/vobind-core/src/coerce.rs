//! Coercion of raw request input into declared field types.
//!
//! Every supported type is a [`FieldType`] variant and [`coerce`] dispatches on
//! it exhaustively. Numeric targets are range-checked against their declared
//! width: a value of the right shape that does not fit is reported as
//! [`FieldErrorKind::Overflow`], never as a parse error.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::fmt;
use std::num::IntErrorKind;

use crate::error::FieldErrorKind;
use crate::value::Value;

/// Declared type of a schema field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    String,
    Timestamp,
    /// Sequence of the element type; binds JSON arrays and multi-valued parameters.
    List(Box<FieldType>),
}

impl FieldType {
    pub fn list(element: FieldType) -> Self {
        FieldType::List(Box::new(element))
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Bool => f.write_str("bool"),
            FieldType::I8 => f.write_str("i8"),
            FieldType::I16 => f.write_str("i16"),
            FieldType::I32 => f.write_str("i32"),
            FieldType::I64 => f.write_str("i64"),
            FieldType::U8 => f.write_str("u8"),
            FieldType::U16 => f.write_str("u16"),
            FieldType::U32 => f.write_str("u32"),
            FieldType::U64 => f.write_str("u64"),
            FieldType::F32 => f.write_str("f32"),
            FieldType::F64 => f.write_str("f64"),
            FieldType::String => f.write_str("string"),
            FieldType::Timestamp => f.write_str("timestamp"),
            FieldType::List(el) => write!(f, "list<{el}>"),
        }
    }
}

/// A raw, not yet coerced field value.
#[derive(Debug, Clone, Copy)]
pub enum Raw<'a> {
    /// Taken from the decoded JSON body.
    Json(&'a serde_json::Value),
    /// Single-valued path or query parameter.
    Text(&'a str),
    /// Multi-valued query parameter.
    Texts(&'a [String]),
}

/// Timestamp layouts, tried in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampLayout {
    Rfc3339Nano,
    Rfc3339,
    /// `2006-01-02T15:04:05`, interpreted as UTC.
    IsoSeconds,
    /// `2006-01-02`, midnight UTC.
    DateOnly,
}

pub const TIMESTAMP_LAYOUTS: [TimestampLayout; 4] = [
    TimestampLayout::Rfc3339Nano,
    TimestampLayout::Rfc3339,
    TimestampLayout::IsoSeconds,
    TimestampLayout::DateOnly,
];

impl TimestampLayout {
    pub fn parse(self, s: &str) -> Option<DateTime<Utc>> {
        match self {
            TimestampLayout::Rfc3339Nano => {
                if !s.contains('.') {
                    return None;
                }
                DateTime::parse_from_rfc3339(s).ok().map(|t| t.with_timezone(&Utc))
            }
            TimestampLayout::Rfc3339 => {
                DateTime::parse_from_rfc3339(s).ok().map(|t| t.with_timezone(&Utc))
            }
            TimestampLayout::IsoSeconds => NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|t| t.and_utc()),
            TimestampLayout::DateOnly => NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|t| t.and_utc()),
        }
    }
}

/// Coerces `raw` into `ty`.
///
/// A JSON `null` is treated as absent by the caller and never reaches here.
pub fn coerce(raw: Raw<'_>, ty: &FieldType) -> Result<Value, FieldErrorKind> {
    match (raw, ty) {
        (Raw::Texts(items), FieldType::List(el)) => items
            .iter()
            .map(|s| coerce_text(s, el))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        (Raw::Text(s), FieldType::List(el)) => Ok(Value::List(vec![coerce_text(s, el)?])),
        (Raw::Texts(items), _) => Err(FieldErrorKind::TypeMismatch {
            expected: ty.to_string(),
            found: format!("{} values", items.len()),
        }),
        (Raw::Text(s), _) => coerce_text(s, ty),
        (Raw::Json(v), _) => coerce_json(v, ty),
    }
}

fn coerce_json(v: &serde_json::Value, ty: &FieldType) -> Result<Value, FieldErrorKind> {
    use serde_json::Value as Json;

    match (v, ty) {
        (Json::String(s), FieldType::List(el)) => Ok(Value::List(vec![coerce_text(s, el)?])),
        (Json::String(s), _) => coerce_text(s, ty),
        (Json::Array(items), FieldType::List(el)) => items
            .iter()
            .map(|item| coerce_json(item, el))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        (Json::Bool(b), FieldType::Bool) => Ok(Value::Bool(*b)),
        (Json::Number(n), _) if is_numeric(ty) => coerce_number(n, ty),
        (other, _) => Err(FieldErrorKind::TypeMismatch {
            expected: ty.to_string(),
            found: json_kind(other).to_string(),
        }),
    }
}

fn is_numeric(ty: &FieldType) -> bool {
    !matches!(
        ty,
        FieldType::Bool | FieldType::String | FieldType::Timestamp | FieldType::List(_)
    )
}

fn json_kind(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "list",
        serde_json::Value::Object(_) => "object",
    }
}

/// JSON numbers skip the text path and are range-checked directly.
fn coerce_number(n: &serde_json::Number, ty: &FieldType) -> Result<Value, FieldErrorKind> {
    let text = n.to_string();
    if let Some(i) = n.as_i64() {
        return fit_signed(i as i128, ty, &text);
    }
    if let Some(u) = n.as_u64() {
        return fit_signed(u as i128, ty, &text);
    }
    let f = n.as_f64().ok_or_else(|| parse_error(ty, &text))?;
    match ty {
        FieldType::F32 | FieldType::F64 => fit_float(f, ty, &text),
        _ if f.fract() != 0.0 => Err(parse_error(ty, &text)),
        _ if f.abs() < i128::MAX as f64 => fit_signed(f as i128, ty, &text),
        _ => Err(overflow(ty, &text)),
    }
}

fn coerce_text(s: &str, ty: &FieldType) -> Result<Value, FieldErrorKind> {
    match ty {
        FieldType::String => Ok(Value::from(s)),
        FieldType::Bool => parse_bool(s)
            .map(Value::Bool)
            .ok_or_else(|| parse_error(ty, s)),
        FieldType::I8 | FieldType::I16 | FieldType::I32 | FieldType::I64 => {
            match s.parse::<i64>() {
                Ok(n) => fit_signed(n as i128, ty, s),
                Err(e) => Err(int_error(e.kind(), ty, s)),
            }
        }
        FieldType::U8 | FieldType::U16 | FieldType::U32 | FieldType::U64 => {
            match s.parse::<u64>() {
                Ok(n) => fit_signed(n as i128, ty, s),
                Err(e) => Err(int_error(e.kind(), ty, s)),
            }
        }
        FieldType::F32 | FieldType::F64 => match s.parse::<f64>() {
            Ok(f) if !f.is_finite() && is_literal_special(s) => Err(parse_error(ty, s)),
            Ok(f) => fit_float(f, ty, s),
            Err(_) => Err(parse_error(ty, s)),
        },
        FieldType::Timestamp => TIMESTAMP_LAYOUTS
            .iter()
            .find_map(|layout| layout.parse(s))
            .map(Value::Timestamp)
            .ok_or_else(|| FieldErrorKind::BadDateFormat {
                value: s.to_string(),
            }),
        FieldType::List(el) => Ok(Value::List(vec![coerce_text(s, el)?])),
    }
}

/// Strict boolean parse, same spellings as the usual `strconv` rules.
fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

/// `inf`, `NaN` and friends are spelled out, not overflowed into.
fn is_literal_special(s: &str) -> bool {
    let t = s.trim_start_matches(['+', '-']).to_ascii_lowercase();
    matches!(t.as_str(), "inf" | "infinity" | "nan")
}

fn int_error(kind: &IntErrorKind, ty: &FieldType, s: &str) -> FieldErrorKind {
    match kind {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => overflow(ty, s),
        _ => parse_error(ty, s),
    }
}

/// Narrows an integer to the declared width.
fn fit_signed(n: i128, ty: &FieldType, text: &str) -> Result<Value, FieldErrorKind> {
    let (min, max): (i128, i128) = match ty {
        FieldType::I8 => (i8::MIN as i128, i8::MAX as i128),
        FieldType::I16 => (i16::MIN as i128, i16::MAX as i128),
        FieldType::I32 => (i32::MIN as i128, i32::MAX as i128),
        FieldType::I64 => (i64::MIN as i128, i64::MAX as i128),
        FieldType::U8 => (0, u8::MAX as i128),
        FieldType::U16 => (0, u16::MAX as i128),
        FieldType::U32 => (0, u32::MAX as i128),
        FieldType::U64 => (0, u64::MAX as i128),
        FieldType::F32 | FieldType::F64 => return fit_float(n as f64, ty, text),
        _ => {
            return Err(FieldErrorKind::TypeMismatch {
                expected: ty.to_string(),
                found: "number".to_string(),
            })
        }
    };
    if n < min || n > max {
        return Err(overflow(ty, text));
    }
    Ok(match ty {
        FieldType::U8 | FieldType::U16 | FieldType::U32 | FieldType::U64 => Value::UInt(n as u64),
        _ => Value::Int(n as i64),
    })
}

fn fit_float(f: f64, ty: &FieldType, text: &str) -> Result<Value, FieldErrorKind> {
    let max = match ty {
        FieldType::F32 => f32::MAX as f64,
        _ => f64::MAX,
    };
    if !f.is_finite() || f.abs() > max {
        return Err(overflow(ty, text));
    }
    Ok(Value::Float(f))
}

fn parse_error(ty: &FieldType, value: &str) -> FieldErrorKind {
    FieldErrorKind::Parse {
        expected: ty.to_string(),
        value: value.to_string(),
    }
}

fn overflow(ty: &FieldType, value: &str) -> FieldErrorKind {
    FieldErrorKind::Overflow {
        target: ty.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn text(s: &str, ty: FieldType) -> Result<Value, FieldErrorKind> {
        coerce(Raw::Text(s), &ty)
    }

    #[test]
    fn test_int_overflow_is_tagged() {
        let err = text("9223372036854775808", FieldType::I64).unwrap_err();
        assert!(err.is_overflow(), "{err:?}");

        let err = text("128", FieldType::I8).unwrap_err();
        assert!(err.is_overflow());
        assert_eq!(text("-128", FieldType::I8), Ok(Value::Int(-128)));

        let err = text("abc", FieldType::I64).unwrap_err();
        assert_eq!(err.code(), "parse");
    }

    #[test]
    fn test_unsigned() {
        assert_eq!(
            text("18446744073709551615", FieldType::U64),
            Ok(Value::UInt(u64::MAX))
        );
        assert!(text("18446744073709551616", FieldType::U64)
            .unwrap_err()
            .is_overflow());
        assert!(text("256", FieldType::U8).unwrap_err().is_overflow());
        assert_eq!(text("-1", FieldType::U32).unwrap_err().code(), "parse");
    }

    #[test]
    fn test_floats() {
        assert_eq!(text("12.5", FieldType::F64), Ok(Value::Float(12.5)));
        assert!(text("1e39", FieldType::F32).unwrap_err().is_overflow());
        assert!(text("1e400", FieldType::F64).unwrap_err().is_overflow());
        assert_eq!(text("NaN", FieldType::F64).unwrap_err().code(), "parse");
        assert_eq!(text("1,5", FieldType::F64).unwrap_err().code(), "parse");
    }

    #[test]
    fn test_bool_is_strict() {
        assert_eq!(text("true", FieldType::Bool), Ok(Value::Bool(true)));
        assert_eq!(text("0", FieldType::Bool), Ok(Value::Bool(false)));
        assert!(text("yes", FieldType::Bool).is_err());
        assert_eq!(coerce(Raw::Json(&json!(true)), &FieldType::Bool), Ok(Value::Bool(true)));
    }

    #[test]
    fn test_timestamp_layouts() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
        assert_eq!(
            text("2024-01-15T10:00:00Z", FieldType::Timestamp),
            Ok(Value::Timestamp(expected))
        );
        assert_eq!(
            text("2024-01-15T10:00:00", FieldType::Timestamp),
            Ok(Value::Timestamp(expected))
        );
        assert_eq!(
            text("2024-01-15T10:00:00.5", FieldType::Timestamp),
            Ok(Value::Timestamp(expected + chrono::Duration::milliseconds(500)))
        );
        assert_eq!(
            text("2024-01-15", FieldType::Timestamp),
            Ok(Value::Timestamp(Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap()))
        );

        let nanos = text("2024-01-15T10:00:00.123456789+02:00", FieldType::Timestamp).unwrap();
        assert_eq!(
            nanos.as_timestamp().map(|t| t.timestamp_subsec_nanos()),
            Some(123_456_789)
        );

        assert_eq!(
            text("01/15/2024", FieldType::Timestamp),
            Err(FieldErrorKind::BadDateFormat {
                value: "01/15/2024".into()
            })
        );
    }

    #[test]
    fn test_layout_priority() {
        assert_eq!(TimestampLayout::Rfc3339Nano.parse("2024-01-15T10:00:00Z"), None);
        assert!(TimestampLayout::Rfc3339.parse("2024-01-15T10:00:00Z").is_some());
        assert_eq!(TimestampLayout::Rfc3339.parse("2024-01-15"), None);
    }

    #[test]
    fn test_json_numbers_are_range_checked() {
        let ty = FieldType::I8;
        assert_eq!(coerce(Raw::Json(&json!(12)), &ty), Ok(Value::Int(12)));
        assert!(coerce(Raw::Json(&json!(300)), &ty).unwrap_err().is_overflow());
        assert_eq!(coerce(Raw::Json(&json!(1.5)), &ty).unwrap_err().code(), "parse");
        assert!(coerce(Raw::Json(&json!(-1)), &FieldType::U16)
            .unwrap_err()
            .is_overflow());
        assert_eq!(coerce(Raw::Json(&json!(12.5)), &FieldType::F64), Ok(Value::Float(12.5)));
        assert_eq!(coerce(Raw::Json(&json!(3)), &FieldType::F32), Ok(Value::Float(3.0)));
        assert!(coerce(Raw::Json(&json!(1e300)), &FieldType::F32)
            .unwrap_err()
            .is_overflow());

        // whole numbers decoded as floats still fit integer targets
        assert_eq!(coerce(Raw::Json(&json!(3.0)), &FieldType::I32), Ok(Value::Int(3)));
        assert_eq!(coerce(Raw::Json(&json!(1e2)), &FieldType::I64), Ok(Value::Int(100)));
        assert_eq!(coerce(Raw::Json(&json!(2.0)), &FieldType::U8), Ok(Value::UInt(2)));
        assert!(coerce(Raw::Json(&json!(1e20)), &FieldType::I64)
            .unwrap_err()
            .is_overflow());
        assert!(coerce(Raw::Json(&json!(-4.0)), &FieldType::U32)
            .unwrap_err()
            .is_overflow());
    }

    #[test]
    fn test_json_strings_take_text_path() {
        assert_eq!(coerce(Raw::Json(&json!("42")), &FieldType::I32), Ok(Value::Int(42)));
        assert_eq!(
            coerce(Raw::Json(&json!({"a": 1})), &FieldType::String).unwrap_err().code(),
            "type_mismatch"
        );
        assert_eq!(
            coerce(Raw::Json(&json!(5)), &FieldType::String).unwrap_err().code(),
            "type_mismatch"
        );
    }

    #[test]
    fn test_lists() {
        let ty = FieldType::list(FieldType::U32);
        let values = vec!["1".to_string(), "2".to_string()];
        assert_eq!(
            coerce(Raw::Texts(&values), &ty),
            Ok(Value::List(vec![Value::UInt(1), Value::UInt(2)]))
        );
        assert_eq!(
            coerce(Raw::Json(&json!([3, "4"])), &ty),
            Ok(Value::List(vec![Value::UInt(3), Value::UInt(4)]))
        );
        assert_eq!(coerce(Raw::Text("5"), &ty), Ok(Value::List(vec![Value::UInt(5)])));

        let err = coerce(Raw::Texts(&values), &FieldType::U32).unwrap_err();
        assert_eq!(err.code(), "type_mismatch");
        assert_eq!(FieldType::list(FieldType::I8).to_string(), "list<i8>");
    }
}
