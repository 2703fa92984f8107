//! Entity and field metadata.
//!
//! An [`Entity`] is a purely nominal type contributing a table name. A
//! [`Field<E>`] is bound to exactly one entity at compile time and is the only
//! way to refer to a column, both when declaring a [`Schema`](crate::Schema)
//! and when building predicates or joins. Fields are normally declared once at
//! start-up, for example in a `once_cell::sync::Lazy`:
//!
//! ```
//! use once_cell::sync::Lazy;
//! use vobind_core::{Entity, Field};
//!
//! struct Order;
//! impl Entity for Order {
//!     const TABLE: &'static str = "orders";
//! }
//!
//! static ORDER_ID: Lazy<Field<Order>> =
//!     Lazy::new(|| Field::new("OrderID", "order_id", "OrderID").expect("order id field"));
//!
//! assert_eq!(ORDER_ID.qualified_name(), "orders.order_id");
//! ```

use heck::ToSnakeCase;
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::{DefinitionError, Result};
use crate::sql::helpers::validate_ident;

/// A type identity owning one table.
pub trait Entity: 'static {
    /// Table the entity's fields live in.
    const TABLE: &'static str;
}

mod sealed {
    pub trait Sealed {}
}

/// Read-only view of a column descriptor.
///
/// Sealed: only [`Field`] and [`ColumnRef`] implement it, so every column seen
/// by a schema or a query was created through an entity-bound constructor.
pub trait Column: sealed::Sealed {
    /// Declared (provider-facing) field name.
    fn name(&self) -> &str;
    /// Table the column belongs to.
    fn table(&self) -> &str;
    /// Bare column name.
    fn column(&self) -> &str;
    /// `table.column`.
    fn qualified_name(&self) -> &str;
    /// Key used in request bodies, parameters and value objects.
    fn view_name(&self) -> &str;
}

#[derive(Debug, PartialEq, Eq)]
struct FieldInner {
    table: &'static str,
    name: Box<str>,
    column: Box<str>,
    view: Box<str>,
    qualified: Box<str>,
}

/// Column descriptor tagged with its owning entity.
pub struct Field<E: Entity> {
    inner: Arc<FieldInner>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Field<E> {
    /// Declares a field of `E`.
    ///
    /// Fails when any identifier is empty, or when the table or column is not
    /// a plain SQL identifier.
    pub fn new(name: &str, column: &str, view: &str) -> Result<Self> {
        validate_ident("table", E::TABLE)?;
        if name.is_empty() {
            return Err(DefinitionError::EmptyIdentifier { what: "name" });
        }
        validate_ident("column", column)?;
        if view.is_empty() {
            return Err(DefinitionError::EmptyIdentifier { what: "view" });
        }

        Ok(Self {
            inner: Arc::new(FieldInner {
                table: E::TABLE,
                name: name.into(),
                column: column.into(),
                view: view.into(),
                qualified: format!("{}.{}", E::TABLE, column).into(),
            }),
            _entity: PhantomData,
        })
    }

    /// Drops the entity tag, keeping the descriptor.
    pub fn erase(&self) -> ColumnRef {
        ColumnRef(self.inner.clone())
    }
}

impl<E: Entity> Clone for Field<E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> PartialEq for Field<E> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<E: Entity> fmt::Debug for Field<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.inner.name)
            .field("qualified", &self.inner.qualified)
            .field("view", &self.inner.view)
            .finish()
    }
}

impl<E: Entity> fmt::Display for Field<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.qualified)
    }
}

/// Type-erased column descriptor, as stored in a schema.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnRef(Arc<FieldInner>);

impl<E: Entity> From<&Field<E>> for ColumnRef {
    fn from(field: &Field<E>) -> Self {
        field.erase()
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.qualified)
    }
}

impl ColumnRef {
    pub fn name(&self) -> &str {
        &self.0.name
    }
    pub fn table(&self) -> &str {
        self.0.table
    }
    pub fn column(&self) -> &str {
        &self.0.column
    }
    pub fn qualified_name(&self) -> &str {
        &self.0.qualified
    }
    pub fn view_name(&self) -> &str {
        &self.0.view
    }
}

impl<E: Entity> Field<E> {
    pub fn name(&self) -> &str {
        &self.inner.name
    }
    pub fn table(&self) -> &str {
        self.inner.table
    }
    pub fn column(&self) -> &str {
        &self.inner.column
    }
    pub fn qualified_name(&self) -> &str {
        &self.inner.qualified
    }
    pub fn view_name(&self) -> &str {
        &self.inner.view
    }
}

impl<E: Entity> sealed::Sealed for Field<E> {}
impl sealed::Sealed for ColumnRef {}

impl<E: Entity> Column for Field<E> {
    fn name(&self) -> &str {
        Field::name(self)
    }
    fn table(&self) -> &str {
        Field::table(self)
    }
    fn column(&self) -> &str {
        Field::column(self)
    }
    fn qualified_name(&self) -> &str {
        Field::qualified_name(self)
    }
    fn view_name(&self) -> &str {
        Field::view_name(self)
    }
}

impl Column for ColumnRef {
    fn name(&self) -> &str {
        ColumnRef::name(self)
    }
    fn table(&self) -> &str {
        ColumnRef::table(self)
    }
    fn column(&self) -> &str {
        ColumnRef::column(self)
    }
    fn qualified_name(&self) -> &str {
        ColumnRef::qualified_name(self)
    }
    fn view_name(&self) -> &str {
        ColumnRef::view_name(self)
    }
}

/// Field metadata as discovered from a declared entity struct.
///
/// Richer than [`Field`]: it keeps everything a code generator needs to emit
/// field and schema declarations. Nothing on the request path reads it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMeta {
    /// Declared field ident.
    pub name: String,
    /// Declared type, e.g. `"i64"` or `"Option<String>"`.
    pub ty_name: String,
    /// Explicit SQL column type, if any.
    pub sql_type: Option<String>,
    pub primary_key: bool,
    /// Emission order in the generated output.
    pub order: usize,
    /// Raw tags (`db`, `json`, `validate`, ...).
    pub tags: BTreeMap<String, String>,
    pub exported: bool,
    pub embedded: bool,
}

impl FieldMeta {
    pub fn new(name: impl Into<String>, ty_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty_name: ty_name.into(),
            exported: true,
            ..Default::default()
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_order(mut self, order: usize) -> Self {
        self.order = order;
        self
    }

    pub fn with_sql_type(mut self, sql_type: impl Into<String>) -> Self {
        self.sql_type = Some(sql_type.into());
        self
    }

    pub fn as_primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(|v| tag_head(v))
    }

    /// `db` tag, else the snake_cased name.
    pub fn column_name(&self) -> String {
        match self.tag("db") {
            Some(col) if !col.is_empty() && col != "-" => col.to_string(),
            _ => self.name.to_snake_case(),
        }
    }

    /// `json` tag, else the declared name.
    pub fn view_name(&self) -> String {
        match self.tag("json") {
            Some(view) if !view.is_empty() && view != "-" => view.to_string(),
            _ => self.name.clone(),
        }
    }

    /// Whether a [`Field`] should be emitted for this metadata.
    pub fn is_bindable(&self) -> bool {
        self.exported && !self.embedded && self.tag("db") != Some("-")
    }
}

/// Tag values may carry options after a comma (`"order_id,omitempty"`).
fn tag_head(value: &str) -> &str {
    value.split(',').next().unwrap_or_default().trim()
}

impl fmt::Display for FieldMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.ty_name)?;
        if self.primary_key {
            write!(f, " [PK]")?;
        }
        write!(f, " @{}", self.column_name())?;
        if let Some(t) = &self.sql_type {
            write!(f, " {{sql: {}}}", t)?;
        }
        Ok(())
    }
}

/// Entity metadata as discovered from a declared entity struct.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityMeta {
    /// DB table (e.g., "orders")
    pub table: String,
    /// Declared type name (e.g., "Order")
    pub type_name: String,
    pub fields: Vec<FieldMeta>,
}

impl EntityMeta {
    pub fn new(table: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            type_name: type_name.into(),
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, field: FieldMeta) -> Self {
        self.fields.push(field);
        self
    }

    /// Lookup a field by declared name.
    pub fn field(&self, name: &str) -> Option<&FieldMeta> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn primary_key(&self) -> Option<&FieldMeta> {
        self.fields.iter().find(|f| f.primary_key)
    }

    /// Fields in emission order.
    pub fn ordered(&self) -> Vec<&FieldMeta> {
        let mut fields: Vec<_> = self.fields.iter().collect();
        fields.sort_by_key(|f| f.order);
        fields
    }

    /// Turns the bindable fields into [`Field`]s of `E`, in emission order.
    pub fn declare<E: Entity>(&self) -> Result<Vec<Field<E>>> {
        if self.table != E::TABLE {
            return Err(DefinitionError::TableMismatch {
                expected: E::TABLE.to_string(),
                found: self.table.clone(),
            });
        }
        self.ordered()
            .into_iter()
            .filter(|meta| meta.is_bindable())
            .map(|meta| Field::new(&meta.name, &meta.column_name(), &meta.view_name()))
            .collect()
    }
}
