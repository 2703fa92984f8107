//! Binding rendered arguments onto a `sqlx` MySQL query.

use sqlx::mysql::{MySql, MySqlArguments};
use sqlx::query::Query;

use crate::value::Value;

pub type MySqlQuery<'q> = Query<'q, MySql, MySqlArguments>;

/// Binds `args` in order onto `q`.
///
/// Lists have no MySQL counterpart and bind as their JSON text.
pub fn bind_args<'q, I>(mut q: MySqlQuery<'q>, args: I) -> Result<MySqlQuery<'q>, serde_json::Error>
where
    I: IntoIterator<Item = Value>,
{
    for v in args {
        q = bind_value(q, v)?;
    }
    Ok(q)
}

/// `sqlx::query(sql)` with `args` already bound.
pub fn prepare<'q>(sql: &'q str, args: Vec<Value>) -> Result<MySqlQuery<'q>, serde_json::Error> {
    bind_args(sqlx::query(sql), args)
}

fn bind_value(q: MySqlQuery<'_>, v: Value) -> Result<MySqlQuery<'_>, serde_json::Error> {
    Ok(match v {
        // no type info for NULL
        Value::Null => q.bind(Option::<i32>::None),
        Value::Bool(b) => q.bind(b),
        Value::Int(i) => q.bind(i),
        Value::UInt(u) => q.bind(u),
        Value::Float(f) => q.bind(f),
        Value::String(s) => q.bind(s.to_string()),
        Value::Timestamp(ts) => q.bind(ts),
        Value::List(_) => q.bind(serde_json::to_string(&v)?),
    })
}
