//! Core types for vobind: entity-typed fields, value-object schemas,
//! request coercion and validation, and entity-typed SQL fragments.

pub mod coerce;
pub mod entity;
pub mod enrich;
pub mod error;
pub mod params;
pub mod schema;
pub mod sql;
#[cfg(feature = "mysql")]
pub mod sqlx_mysql;
pub mod validator;
pub mod value;
pub mod value_object;

pub use coerce::{coerce, FieldType, Raw, TimestampLayout, TIMESTAMP_LAYOUTS};
pub use entity::{Column, ColumnRef, Entity, EntityMeta, Field, FieldMeta};
pub use enrich::EnrichmentHook;
pub use error::*;
pub use params::{unify, MultiValuePolicy, ParamValue, Params};
pub use schema::{Schema, SchemaBuilder, SchemaField};
pub use sql::{joint, left_joint, Join, JoinKind, Select, Where};
pub use validator::Validator;
pub use value::{ConversionError, Value, ValueKind};
pub use value_object::ValueObject;
