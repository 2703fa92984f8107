//! Entity-typed SQL fragments: predicates, joins and a minimal `SELECT`.
//!
//! Everything renders `?` placeholders with positional arguments; identifiers
//! were validated when their [`Field`](crate::Field) was declared.

pub(crate) mod helpers;
mod join;
mod predicate;
mod select;

pub use join::{joint, left_joint, Join, JoinKind};
pub use predicate::Where;
pub use select::Select;
