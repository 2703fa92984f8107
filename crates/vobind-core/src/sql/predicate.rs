//! Entity-typed WHERE predicates.
//!
//! Leaves render `<table.column> <op> ?` and carry their arguments in order.
//! `and`/`or` skip empty children; with nothing left they render an empty
//! fragment, which callers read as "no filter". `in_list` over zero values
//! renders `1=0` instead of the invalid `IN ()`.

use std::fmt;
use std::marker::PhantomData;

use super::helpers::placeholders;
use crate::entity::{Entity, Field};
use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Empty,
    Leaf { fragment: String, args: Vec<Value> },
    And(Vec<Node>),
    Or(Vec<Node>),
}

impl Node {
    fn is_empty(&self) -> bool {
        match self {
            Node::Empty => true,
            Node::Leaf { fragment, .. } => fragment.is_empty(),
            Node::And(children) | Node::Or(children) => children.iter().all(Node::is_empty),
        }
    }

    fn render(&self, sql: &mut String, args: &mut Vec<Value>) {
        match self {
            Node::Empty => {}
            Node::Leaf { fragment, args: a } => {
                sql.push_str(fragment);
                args.extend(a.iter().cloned());
            }
            Node::And(children) => render_group(children, " AND ", sql, args),
            Node::Or(children) => render_group(children, " OR ", sql, args),
        }
    }
}

fn render_group(children: &[Node], op: &str, sql: &mut String, args: &mut Vec<Value>) {
    let live: Vec<&Node> = children.iter().filter(|c| !c.is_empty()).collect();
    if live.is_empty() {
        return;
    }
    sql.push('(');
    for (i, child) in live.into_iter().enumerate() {
        if i > 0 {
            sql.push_str(op);
        }
        child.render(sql, args);
    }
    sql.push(')');
}

/// A composable predicate over the columns of `E`.
pub struct Where<E: Entity> {
    node: Node,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Where<E> {
    fn from_node(node: Node) -> Self {
        Self {
            node,
            _entity: PhantomData,
        }
    }

    fn leaf(fragment: String, args: Vec<Value>) -> Self {
        Self::from_node(Node::Leaf { fragment, args })
    }

    fn compare(field: &Field<E>, op: &str, value: impl Into<Value>) -> Self {
        Self::leaf(
            format!("{} {} ?", field.qualified_name(), op),
            vec![value.into()],
        )
    }

    /// Matches everything; skipped by `and`/`or`.
    pub fn empty() -> Self {
        Self::from_node(Node::Empty)
    }

    pub fn eq(field: &Field<E>, value: impl Into<Value>) -> Self {
        Self::compare(field, "=", value)
    }

    pub fn ne(field: &Field<E>, value: impl Into<Value>) -> Self {
        Self::compare(field, "<>", value)
    }

    pub fn gt(field: &Field<E>, value: impl Into<Value>) -> Self {
        Self::compare(field, ">", value)
    }

    pub fn gte(field: &Field<E>, value: impl Into<Value>) -> Self {
        Self::compare(field, ">=", value)
    }

    pub fn lt(field: &Field<E>, value: impl Into<Value>) -> Self {
        Self::compare(field, "<", value)
    }

    pub fn lte(field: &Field<E>, value: impl Into<Value>) -> Self {
        Self::compare(field, "<=", value)
    }

    pub fn like(field: &Field<E>, pattern: impl Into<Value>) -> Self {
        Self::compare(field, "LIKE", pattern)
    }

    /// `IN (?, ...)`, or the always-false `1=0` when `values` is empty.
    pub fn in_list<I, V>(field: &Field<E>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let args: Vec<Value> = values.into_iter().map(Into::into).collect();
        if args.is_empty() {
            return Self::leaf("1=0".to_string(), Vec::new());
        }
        Self::leaf(
            format!("{} IN ({})", field.qualified_name(), placeholders(args.len())),
            args,
        )
    }

    pub fn is_null(field: &Field<E>) -> Self {
        Self::leaf(format!("{} IS NULL", field.qualified_name()), Vec::new())
    }

    pub fn is_not_null(field: &Field<E>) -> Self {
        Self::leaf(format!("{} IS NOT NULL", field.qualified_name()), Vec::new())
    }

    /// Conjunction of the non-empty children.
    pub fn and<I, W>(children: I) -> Self
    where
        I: IntoIterator<Item = W>,
        W: Into<Where<E>>,
    {
        Self::from_node(Node::And(
            children.into_iter().map(|c| c.into().node).collect(),
        ))
    }

    /// Disjunction of the non-empty children.
    pub fn or<I, W>(children: I) -> Self
    where
        I: IntoIterator<Item = W>,
        W: Into<Where<E>>,
    {
        Self::from_node(Node::Or(
            children.into_iter().map(|c| c.into().node).collect(),
        ))
    }

    /// `self AND other`.
    pub fn and_also(self, other: Where<E>) -> Self {
        Self::and([self, other])
    }

    /// `self OR other`.
    pub fn or_else(self, other: Where<E>) -> Self {
        Self::or([self, other])
    }

    pub fn is_empty(&self) -> bool {
        self.node.is_empty()
    }

    /// Renders the fragment and its positional arguments.
    pub fn build(&self) -> (String, Vec<Value>) {
        let mut sql = String::new();
        let mut args = Vec::new();
        self.node.render(&mut sql, &mut args);
        (sql, args)
    }
}

impl<E: Entity> Clone for Where<E> {
    fn clone(&self) -> Self {
        Self::from_node(self.node.clone())
    }
}

impl<E: Entity> Default for Where<E> {
    fn default() -> Self {
        Self::empty()
    }
}

/// `None` stands for a nil child and is skipped by `and`/`or`.
impl<E: Entity> From<Option<Where<E>>> for Where<E> {
    fn from(w: Option<Where<E>>) -> Self {
        w.unwrap_or_default()
    }
}

impl<E: Entity> fmt::Debug for Where<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (sql, args) = self.build();
        f.debug_struct("Where")
            .field("table", &E::TABLE)
            .field("sql", &sql)
            .field("args", &args)
            .finish()
    }
}

impl<E: Entity> fmt::Display for Where<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.build().0)
    }
}
