//! Constraint validators attached to schema fields.
//!
//! A validator is a named predicate over an already coerced [`Value`]. All
//! validators of all fields run on every pass; each failure becomes one
//! [`FieldErrorKind::Constraint`](crate::FieldErrorKind::Constraint).

use regex::Regex;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::value::Value;

type Check = dyn Fn(&Value) -> Result<(), String> + Send + Sync;

#[derive(Clone)]
pub struct Validator {
    name: Arc<str>,
    check: Arc<Check>,
}

impl Validator {
    /// Custom predicate; `Err(message)` rejects the value.
    pub fn new<F>(name: &str, check: F) -> Self
    where
        F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name),
            check: Arc::new(check),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn check(&self, value: &Value) -> Result<(), String> {
        (self.check)(value)
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validator({})", self.name)
    }
}

fn numeric(value: &Value) -> Result<f64, String> {
    value
        .as_f64()
        .ok_or_else(|| format!("expected a number, found {}", value.kind()))
}

fn length(value: &Value) -> Result<usize, String> {
    value
        .len()
        .ok_or_else(|| format!("expected a string or list, found {}", value.kind()))
}

pub fn gt(bound: f64) -> Validator {
    Validator::new("gt", move |v| {
        let n = numeric(v)?;
        if n > bound {
            Ok(())
        } else {
            Err(format!("must be greater than {bound}"))
        }
    })
}

pub fn gte(bound: f64) -> Validator {
    Validator::new("gte", move |v| {
        let n = numeric(v)?;
        if n >= bound {
            Ok(())
        } else {
            Err(format!("must be greater than or equal to {bound}"))
        }
    })
}

pub fn lt(bound: f64) -> Validator {
    Validator::new("lt", move |v| {
        let n = numeric(v)?;
        if n < bound {
            Ok(())
        } else {
            Err(format!("must be less than {bound}"))
        }
    })
}

pub fn lte(bound: f64) -> Validator {
    Validator::new("lte", move |v| {
        let n = numeric(v)?;
        if n <= bound {
            Ok(())
        } else {
            Err(format!("must be less than or equal to {bound}"))
        }
    })
}

pub fn min_len(min: usize) -> Validator {
    Validator::new("min_len", move |v| {
        if length(v)? >= min {
            Ok(())
        } else {
            Err(format!("length must be at least {min}"))
        }
    })
}

pub fn max_len(max: usize) -> Validator {
    Validator::new("max_len", move |v| {
        if length(v)? <= max {
            Ok(())
        } else {
            Err(format!("length must be at most {max}"))
        }
    })
}

/// String must match `re`.
pub fn pattern(re: Regex) -> Validator {
    Validator::new("pattern", move |v| match v.as_str() {
        Some(s) if re.is_match(s) => Ok(()),
        Some(_) => Err(format!("must match pattern {}", re.as_str())),
        None => Err(format!("expected a string, found {}", v.kind())),
    })
}

/// Every character of the string must belong to `allowed`.
pub fn charset(allowed: &str) -> Validator {
    let set: BTreeSet<char> = allowed.chars().collect();
    Validator::new("charset", move |v| {
        let s = v
            .as_str()
            .ok_or_else(|| format!("expected a string, found {}", v.kind()))?;
        match s.chars().find(|c| !set.contains(c)) {
            None => Ok(()),
            Some(c) => Err(format!("character {c:?} is not allowed")),
        }
    })
}

/// Value must equal one of `allowed`.
pub fn one_of<I, V>(allowed: I) -> Validator
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    let allowed: Vec<Value> = allowed.into_iter().map(Into::into).collect();
    Validator::new("one_of", move |v| {
        if allowed.contains(v) {
            Ok(())
        } else {
            let list = allowed
                .iter()
                .map(|a| a.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            Err(format!("must be one of [{list}]"))
        }
    })
}

pub fn must_be_true() -> Validator {
    Validator::new("must_be_true", |v| match v.as_bool() {
        Some(true) => Ok(()),
        _ => Err("must be true".to_string()),
    })
}
