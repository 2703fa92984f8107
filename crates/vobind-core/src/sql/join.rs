use std::fmt;

use crate::entity::{Entity, Field};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

impl JoinKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER",
            JoinKind::Left => "LEFT",
        }
    }
}

/// `<kind> JOIN <right table> ON <left> = <right>`, with each side's column
/// checked at compile time to belong to its declared entity.
pub struct Join<L: Entity, R: Entity> {
    kind: JoinKind,
    left: Field<L>,
    right: Field<R>,
}

impl<L: Entity, R: Entity> Join<L, R> {
    pub fn new(kind: JoinKind, left: &Field<L>, right: &Field<R>) -> Self {
        Self {
            kind,
            left: left.clone(),
            right: right.clone(),
        }
    }

    pub fn inner(left: &Field<L>, right: &Field<R>) -> Self {
        Self::new(JoinKind::Inner, left, right)
    }

    pub fn left(left: &Field<L>, right: &Field<R>) -> Self {
        Self::new(JoinKind::Left, left, right)
    }

    pub fn kind(&self) -> JoinKind {
        self.kind
    }

    /// Table being joined in.
    pub fn table(&self) -> &str {
        R::TABLE
    }

    pub fn clause(&self) -> String {
        format!(
            "{} JOIN {} ON {} = {}",
            self.kind.as_str(),
            R::TABLE,
            self.left.qualified_name(),
            self.right.qualified_name()
        )
    }
}

/// Inner join of `R` onto `L`.
pub fn joint<L: Entity, R: Entity>(left: &Field<L>, right: &Field<R>) -> Join<L, R> {
    Join::inner(left, right)
}

/// Left join of `R` onto `L`.
pub fn left_joint<L: Entity, R: Entity>(left: &Field<L>, right: &Field<R>) -> Join<L, R> {
    Join::left(left, right)
}

impl<L: Entity, R: Entity> Clone for Join<L, R> {
    fn clone(&self) -> Self {
        Self::new(self.kind, &self.left, &self.right)
    }
}

impl<L: Entity, R: Entity> fmt::Debug for Join<L, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Join").field(&self.clause()).finish()
    }
}

impl<L: Entity, R: Entity> fmt::Display for Join<L, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.clause())
    }
}
