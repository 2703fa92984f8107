//! Configuration and observability shared by vobind components

pub mod config;
pub mod observability;

pub use config::*;
pub use observability::*;
