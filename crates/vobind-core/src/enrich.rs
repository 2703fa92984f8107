//! Post-validation enrichment.

use once_cell::sync::OnceCell;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::value::Value;
use crate::value_object::ValueObject;

type EnrichFn<C> = dyn Fn(&C) -> BTreeMap<String, Value> + Send + Sync;

/// Set-once callback deriving extra values (trace ids, tenant, ...) from a
/// request context `C`.
///
/// The first [`set`](Self::set) wins; later calls are silently ignored. Reads
/// after the first set observe the same callback without further locking.
pub struct EnrichmentHook<C> {
    cell: OnceCell<Arc<EnrichFn<C>>>,
}

impl<C> EnrichmentHook<C> {
    pub fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// Installs `f` unless a callback is already configured. Returns whether
    /// this call took effect.
    pub fn set<F>(&self, f: F) -> bool
    where
        F: Fn(&C) -> BTreeMap<String, Value> + Send + Sync + 'static,
    {
        let installed = self.cell.set(Arc::new(f)).is_ok();
        if !installed {
            debug!("enrichment hook already configured, ignoring");
        }
        installed
    }

    pub fn is_set(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Merges the callback's output into `record`, overwriting on collision.
    /// Returns the number of keys written.
    pub fn apply(&self, ctx: &C, record: &mut ValueObject) -> usize {
        let Some(f) = self.cell.get() else {
            return 0;
        };
        let extra = f(ctx);
        let written = extra.len();
        record.merge(extra);
        written
    }
}

impl<C> Default for EnrichmentHook<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for EnrichmentHook<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnrichmentHook")
            .field("configured", &self.is_set())
            .finish()
    }
}
