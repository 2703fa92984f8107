use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use super::join::Join;
use super::predicate::Where;
use crate::entity::{ColumnRef, Entity, Field};
use crate::schema::Schema;
use crate::value::Value;

/// A copy-on-write object that holds an assembled `SELECT` over `E`.
///
/// Each builder call returns a new query, leaving the receiver untouched.
pub struct Select<E: Entity> {
    columns: Arc<Vec<ColumnRef>>,
    joins: Arc<Vec<String>>,
    filters: Arc<Vec<(String, Vec<Value>)>>,
    order_by: Option<(Arc<str>, bool)>, // (column, asc)
    limit: Option<u64>,
    offset: Option<u64>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Select<E> {
    /// Creates an empty query selecting `E::TABLE.*`.
    pub fn new() -> Self {
        Select {
            columns: Default::default(),
            joins: Default::default(),
            filters: Default::default(),
            order_by: None,
            limit: None,
            offset: None,
            _entity: PhantomData,
        }
    }

    /// Selects the given columns, possibly from joined entities.
    pub fn columns<I, C>(&self, cols: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<ColumnRef>,
    {
        let mut rv = self.clone();
        rv.columns = Arc::new(cols.into_iter().map(Into::into).collect());
        rv
    }

    /// Selects the columns of every schema field, in schema order.
    pub fn schema_columns(&self, schema: &Schema) -> Self {
        self.columns(schema.fields().iter().map(|f| f.column().clone()))
    }

    pub fn join<L: Entity, R: Entity>(&self, join: &Join<L, R>) -> Self {
        let mut rv = self.clone();
        Arc::make_mut(&mut rv.joins).push(join.clause());
        rv
    }

    /// Adds a predicate on `E`; all filters are AND-ed.
    pub fn filter(&self, predicate: &Where<E>) -> Self {
        self.filter_on(predicate)
    }

    /// Adds a predicate on a joined entity.
    pub fn filter_on<R: Entity>(&self, predicate: &Where<R>) -> Self {
        let mut rv = self.clone();
        let (sql, args) = predicate.build();
        if !sql.is_empty() {
            Arc::make_mut(&mut rv.filters).push((sql, args));
        }
        rv
    }

    pub fn order_by<R: Entity>(&self, field: &Field<R>, asc: bool) -> Self {
        let mut rv = self.clone();
        rv.order_by = Some((Arc::from(field.qualified_name()), asc));
        rv
    }

    /// Limits the query to `count` rows.
    pub fn limit(&self, count: u64) -> Self {
        let mut rv = self.clone();
        rv.limit = Some(count);
        rv
    }

    /// Offsets the query by `count` rows.
    pub fn offset(&self, count: u64) -> Self {
        let mut rv = self.clone();
        rv.offset = Some(count);
        rv
    }

    pub fn to_sql(&self) -> (String, Vec<Value>) {
        let table = E::TABLE;

        // SELECT
        let select = if self.columns.is_empty() {
            format!("{table}.*")
        } else {
            self.columns
                .iter()
                .map(|c| c.qualified_name())
                .collect::<Vec<_>>()
                .join(", ")
        };

        let mut sql = format!("SELECT {select} FROM {table}");
        let mut binds = Vec::<Value>::new();

        // JOINs (must come before WHERE)
        for clause in self.joins.iter() {
            sql.push(' ');
            sql.push_str(clause);
        }

        // WHERE
        if !self.filters.is_empty() {
            sql.push_str(" WHERE ");
            for (i, (fragment, args)) in self.filters.iter().enumerate() {
                if i > 0 {
                    sql.push_str(" AND ");
                }
                sql.push_str(fragment);
                binds.extend(args.iter().cloned());
            }
        }

        // ORDER BY
        if let Some((col, asc)) = &self.order_by {
            sql.push_str(&format!(
                " ORDER BY {} {}",
                col,
                if *asc { "ASC" } else { "DESC" }
            ));
        }

        // LIMIT/OFFSET
        if let Some(l) = self.limit {
            sql.push_str(" LIMIT ?");
            binds.push(Value::UInt(l));
        }
        if let Some(o) = self.offset {
            sql.push_str(" OFFSET ?");
            binds.push(Value::UInt(o));
        }

        (sql, binds)
    }
}

impl<E: Entity> Clone for Select<E> {
    fn clone(&self) -> Self {
        Select {
            columns: self.columns.clone(),
            joins: self.joins.clone(),
            filters: self.filters.clone(),
            order_by: self.order_by.clone(),
            limit: self.limit,
            offset: self.offset,
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> Default for Select<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> fmt::Debug for Select<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Select table={:?}>", E::TABLE)
    }
}

impl<E: Entity> fmt::Display for Select<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_sql().0)
    }
}
