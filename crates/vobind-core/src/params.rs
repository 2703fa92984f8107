//! Path and query parameter unification.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

use crate::error::{DefinitionError, Result};

/// One unified parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Single(String),
    Multi(Vec<String>),
}

/// Flat parameter map consumed by [`Schema::validate`](crate::Schema::validate).
pub type Params = BTreeMap<String, ParamValue>;

/// What to do with a query key supplied more than once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MultiValuePolicy {
    /// Treat it as a usage defect.
    #[default]
    Reject,
    /// Hand it to the validator as a sequence.
    Sequence,
}

/// Merges path and query parameters into one map.
///
/// A key present in both sources is a route/schema design defect and fails
/// with [`DefinitionError::ParamConflict`]. Query keys with no values are
/// dropped; keys with several values follow `policy`.
pub fn unify(
    path: &HashMap<String, String>,
    query: &HashMap<String, Vec<String>>,
    policy: MultiValuePolicy,
) -> Result<Params> {
    let mut params: Params = path
        .iter()
        .map(|(k, v)| (k.clone(), ParamValue::Single(v.clone())))
        .collect();

    // Sorted so the reported defect is deterministic.
    let mut keys: Vec<_> = query.keys().collect();
    keys.sort_unstable();

    for key in keys {
        let values = &query[key];
        if path.contains_key(key) {
            warn!(key = %key, "parameter defined both in path and query");
            return Err(DefinitionError::ParamConflict { key: key.clone() });
        }
        let value = match values.as_slice() {
            [] => continue,
            [single] => ParamValue::Single(single.clone()),
            many => match policy {
                MultiValuePolicy::Sequence => ParamValue::Multi(many.to_vec()),
                MultiValuePolicy::Reject => {
                    warn!(key = %key, count = many.len(), "multi-valued query parameter rejected");
                    return Err(DefinitionError::MultiValue {
                        key: key.clone(),
                        count: many.len(),
                    });
                }
            },
        };
        params.insert(key.clone(), value);
    }

    Ok(params)
}
