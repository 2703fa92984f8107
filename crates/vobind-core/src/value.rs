//! Typed values produced by coercion.
//!
//! `Value` is the closed set of shapes a bound field can take once it has been
//! coerced to its declared type. It is also the argument type handed out by the
//! query builder, so a validated value can be passed straight into a predicate.
//! Numbers compare across representations (`Int(1) == UInt(1) == Float(1.0)`).

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

/// Coarse classification of values.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
#[non_exhaustive]
pub enum ValueKind {
    Null,
    Bool,
    Number,
    String,
    Timestamp,
    List,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::Number => "number",
            ValueKind::String => "string",
            ValueKind::Timestamp => "timestamp",
            ValueKind::List => "list",
        })
    }
}

#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(Arc<str>),
    Timestamp(DateTime<Utc>),
    List(Vec<Value>),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) | Value::UInt(_) | Value::Float(_) => ValueKind::Number,
            Value::String(_) => ValueKind::String,
            Value::Timestamp(_) => ValueKind::Timestamp,
            Value::List(_) => ValueKind::List,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::UInt(_) | Value::Float(_))
    }

    // --- borrowed views / scalar copies ---
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::UInt(n) => i64::try_from(*n).ok(),
            _ => None,
        }
    }
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::UInt(n) => Some(*n),
            Value::Int(n) => u64::try_from(*n).ok(),
            _ => None,
        }
    }
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(n) => Some(*n as f64),
            Value::UInt(n) => Some(*n as f64),
            _ => None,
        }
    }
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Timestamp(t) => Some(*t),
            _ => None,
        }
    }
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Character count for strings, element count for lists.
    pub fn len(&self) -> Option<usize> {
        match self {
            Value::String(s) => Some(s.chars().count()),
            Value::List(items) => Some(items.len()),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(v) => fmt::Debug::fmt(v, f),
            Value::Int(v) => fmt::Debug::fmt(v, f),
            Value::UInt(v) => fmt::Debug::fmt(v, f),
            Value::Float(v) => fmt::Debug::fmt(v, f),
            Value::String(s) => fmt::Debug::fmt(s, f),
            Value::Timestamp(t) => write!(f, "{}", t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Value::List(items) => f.debug_list().entries(items.iter()).finish(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(v) => fmt::Display::fmt(v, f),
            Value::Int(v) => fmt::Display::fmt(v, f),
            Value::UInt(v) => fmt::Display::fmt(v, f),
            Value::Float(v) => {
                if v.is_nan() {
                    f.write_str("NaN")
                } else if v.is_infinite() {
                    write!(f, "{}inf", if v.is_sign_negative() { "-" } else { "" })
                } else {
                    let mut s = v.to_string();
                    if !s.contains('.') {
                        s.push_str(".0");
                    }
                    f.write_str(&s)
                }
            }
            Value::String(s) => f.write_str(s),
            Value::Timestamp(t) => f.write_str(&t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(n) => serializer.serialize_i64(*n),
            Value::UInt(n) => serializer.serialize_u64(*n),
            Value::Float(x) => serializer.serialize_f64(*x),
            Value::String(s) => serializer.serialize_str(s),
            Value::Timestamp(t) => {
                serializer.serialize_str(&t.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            Value::List(items) => serializer.collect_seq(items.iter()),
        }
    }
}

/* ----------------------- Equality across kinds ----------------------- */

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        #[derive(Copy, Clone, Debug)]
        enum Num {
            I(i128),
            F(f64),
        }

        fn to_num(v: &Value) -> Option<Num> {
            match v {
                Value::Int(n) => Some(Num::I(*n as i128)),
                Value::UInt(n) => Some(Num::I(*n as i128)),
                Value::Float(f) => Some(Num::F(*f)),
                _ => None,
            }
        }
        fn num_eq(a: Num, b: Num) -> bool {
            match (a, b) {
                (Num::I(x), Num::I(y)) => x == y,
                (Num::F(x), Num::F(y)) => x == y, // f64 semantics (NaN != NaN)
                (Num::I(x), Num::F(y)) | (Num::F(y), Num::I(x)) => {
                    if !y.is_finite() || y.fract() != 0.0 {
                        return false;
                    }
                    (y as i128) == x
                }
            }
        }

        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Timestamp(a), Value::Timestamp(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (a, b) => match (to_num(a), to_num(b)) {
                (Some(na), Some(nb)) => num_eq(na, nb),
                _ => false,
            },
        }
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}
impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}
impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}
impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}
impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::Int(v as i64)
    }
}
impl From<i8> for Value {
    fn from(v: i8) -> Self {
        Value::Int(v as i64)
    }
}
impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UInt(v)
    }
}
impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::UInt(v as u64)
    }
}
impl From<u16> for Value {
    fn from(v: u16) -> Self {
        Value::UInt(v as u64)
    }
}
impl From<u8> for Value {
    fn from(v: u8) -> Self {
        Value::UInt(v as u64)
    }
}
impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}
impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v as f64)
    }
}
impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Arc::from(s))
    }
}
impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Arc::from(s))
    }
}
impl From<DateTime<Utc>> for Value {
    fn from(t: DateTime<Utc>) -> Self {
        Value::Timestamp(t)
    }
}
impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}
impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Error returned by the `TryFrom<&Value>` conversions.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("cannot convert {found} value to {target}")]
pub struct ConversionError {
    pub target: &'static str,
    pub found: ValueKind,
}

macro_rules! try_from_value {
    ($t:ty, $name:literal, $conv:expr) => {
        impl TryFrom<&Value> for $t {
            type Error = ConversionError;
            fn try_from(v: &Value) -> Result<Self, Self::Error> {
                let conv: fn(&Value) -> Option<$t> = $conv;
                conv(v).ok_or(ConversionError {
                    target: $name,
                    found: v.kind(),
                })
            }
        }

        impl TryFrom<Value> for $t {
            type Error = ConversionError;
            fn try_from(v: Value) -> Result<Self, Self::Error> {
                <$t>::try_from(&v)
            }
        }
    };
}

try_from_value!(i64, "i64", |v| v.as_i64());
try_from_value!(u64, "u64", |v| v.as_u64());
try_from_value!(i32, "i32", |v| v.as_i64().and_then(|n| i32::try_from(n).ok()));
try_from_value!(u32, "u32", |v| v.as_u64().and_then(|n| u32::try_from(n).ok()));
try_from_value!(f64, "f64", |v| v.as_f64());
try_from_value!(bool, "bool", |v| v.as_bool());
try_from_value!(String, "string", |v| v.as_str().map(str::to_string));
try_from_value!(DateTime<Utc>, "timestamp", |v| v.as_timestamp());
