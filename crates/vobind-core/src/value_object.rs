//! The validated record handed back to the caller.

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::value::Value;

/// View-name to typed value, produced once per successful validation.
///
/// Stable iteration via `BTreeMap`, cheap clone via `Arc`; mutation clones the
/// map only when it is shared.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValueObject(Arc<BTreeMap<String, Value>>);

impl ValueObject {
    pub fn new() -> Self {
        Self(Arc::new(BTreeMap::new()))
    }

    pub fn with_map(map: BTreeMap<String, Value>) -> Self {
        Self(Arc::new(map))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Typed read, `None` when absent or of another kind.
    pub fn get_as<'a, T>(&'a self, key: &str) -> Option<T>
    where
        T: TryFrom<&'a Value>,
    {
        self.0.get(key).and_then(|v| T::try_from(v).ok())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Inserts only when `key` is not present yet. Returns whether it did.
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<Value>) -> bool {
        let map = Arc::make_mut(&mut self.0);
        let key = key.into();
        if map.contains_key(&key) {
            return false;
        }
        map.insert(key, value.into());
        true
    }

    /// Inserts or overwrites, returning the previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        Arc::make_mut(&mut self.0).insert(key.into(), value.into())
    }

    /// Merges `other` into `self`; keys of `other` win.
    pub fn merge<I, K>(&mut self, other: I) -> &Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let map = Arc::make_mut(&mut self.0);
        for (k, v) in other {
            map.insert(k.into(), v);
        }
        self
    }

    pub fn into_map(self) -> BTreeMap<String, Value> {
        Arc::try_unwrap(self.0).unwrap_or_else(|shared| (*shared).clone())
    }
}

impl Serialize for ValueObject {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter())
    }
}

impl FromIterator<(String, Value)> for ValueObject {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self::with_map(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_keeps_existing() {
        let mut vo = ValueObject::new();
        assert!(vo.add("OrderID", "o1"));
        assert!(!vo.add("OrderID", "o2"));
        assert_eq!(vo.get("OrderID"), Some(&Value::from("o1")));
    }

    #[test]
    fn test_set_overwrites() {
        let mut vo = ValueObject::new();
        vo.set("Amount", 12.5);
        assert_eq!(vo.set("Amount", 3.0), Some(Value::Float(12.5)));
        assert_eq!(vo.get_as::<f64>("Amount"), Some(3.0));
        assert_eq!(vo.get_as::<String>("Amount"), None);
    }

    #[test]
    fn test_copy_on_write() {
        let mut a = ValueObject::new();
        a.set("k", 1i64);
        let b = a.clone();
        a.set("k", 2i64);

        assert_eq!(b.get_as::<i64>("k"), Some(1));
        assert_eq!(a.get_as::<i64>("k"), Some(2));
    }

    #[test]
    fn test_merge_and_serialize() {
        let mut vo = ValueObject::new();
        vo.set("OrderID", "o1");
        vo.merge([("traceId", Value::from("t1")), ("OrderID", Value::from("o9"))]);

        assert_eq!(vo.keys().collect::<Vec<_>>(), ["OrderID", "traceId"]);
        assert_eq!(
            serde_json::to_value(&vo).unwrap(),
            serde_json::json!({"OrderID": "o9", "traceId": "t1"})
        );
    }
}
