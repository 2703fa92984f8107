//! `vobind`: convenience façade that re-exports `vobind-core` and
//! `vobind-shared`, plus the framework-agnostic [`Binder`].

#![deny(missing_docs)]

pub mod binder;

/// Re-export **everything** from vobind-core at the crate root, so users can `use vobind::*;`.
#[doc(inline)]
pub use vobind_core::*;

/// Also expose vobind-core as a nested module if you like `vobind::core::...` paths.
pub use vobind_core as core;

/// Configuration and observability.
pub use vobind_shared as shared;

pub use binder::{BindError, Binder, RequestParts};
pub use vobind_shared::{BindingConfig, VobindConfig};
