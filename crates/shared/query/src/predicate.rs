//! Typed predicates and their AND/OR combinators.
//!
//! A [`Predicate<T>`] is an immutable value: combining two predicates builds a
//! new tree and leaves both inputs usable, so a caller can keep an earlier
//! intermediate filter around after narrowing or widening it.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::document::Document;
use crate::error::{QueryError, QueryResult};
use crate::eval::Evaluator;
use crate::expr::{Expr, Param};

/// An untyped boolean expression over one entity placeholder.
///
/// This is what stores receive; [`Predicate<T>`] wraps it with the entity type.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    param: Param,
    body: Arc<Expr>,
}

impl Filter {
    /// Build a filter from a closure receiving the entity placeholder.
    pub fn new(build: impl FnOnce(&Param) -> Expr) -> Self {
        let param = Param::fresh();
        let body = build(&param);
        Self::from_parts(param, body)
    }

    pub fn from_parts(param: Param, body: Expr) -> Self {
        Self {
            param,
            body: Arc::new(body),
        }
    }

    pub fn constant(value: bool) -> Self {
        Self::from_parts(Param::fresh(), Expr::Literal(Value::Bool(value)))
    }

    /// Filter matching every document.
    pub fn all() -> Self {
        Self::constant(true)
    }

    pub fn param(&self) -> Param {
        self.param
    }

    pub fn body(&self) -> &Expr {
        &self.body
    }

    /// Whether the body is the literal `true`.
    pub fn is_match_all(&self) -> bool {
        matches!(self.body.as_ref(), Expr::Literal(Value::Bool(true)))
    }

    pub fn and(&self, other: &Filter) -> Filter {
        self.combine(other, Expr::And)
    }

    pub fn or(&self, other: &Filter) -> Filter {
        self.combine(other, Expr::Or)
    }

    fn combine(&self, other: &Filter, join: fn(Box<Expr>, Box<Expr>) -> Expr) -> Filter {
        let shared = Param::fresh();
        let left = self.body.rebind(self.param, shared);
        let right = other.body.rebind(other.param, shared);
        Filter::from_parts(shared, join(Box::new(left), Box::new(right)))
    }

    /// Evaluate against a stored document.
    pub fn evaluate(&self, doc: &Document) -> QueryResult<bool> {
        Evaluator::new(self.param).test(&self.body, doc)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} => {}", self.param, self.body)
    }
}

/// A boolean expression over entities of type `T`.
pub struct Predicate<T> {
    filter: Filter,
    _entity: PhantomData<fn(&T) -> bool>,
}

impl<T> Predicate<T> {
    /// Build a predicate from a closure receiving the entity placeholder.
    ///
    /// ```
    /// use query::Predicate;
    ///
    /// #[derive(serde::Serialize)]
    /// struct Account {
    ///     owner: String,
    ///     balance: i64,
    /// }
    ///
    /// let rich = Predicate::<Account>::new(|it| it.field("balance").gt(1_000));
    /// let acct = Account { owner: "ann".into(), balance: 5_000 };
    /// assert!(rich.matches(&acct).unwrap());
    /// ```
    pub fn new(build: impl FnOnce(&Param) -> Expr) -> Self {
        Self::from_filter(Filter::new(build))
    }

    pub fn from_filter(filter: Filter) -> Self {
        Self {
            filter,
            _entity: PhantomData,
        }
    }

    pub fn constant(value: bool) -> Self {
        Self::from_filter(Filter::constant(value))
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn into_filter(self) -> Filter {
        self.filter
    }

    /// True only when both predicates hold for the same entity.
    pub fn and(&self, other: &Predicate<T>) -> Predicate<T> {
        Self::from_filter(self.filter.and(&other.filter))
    }

    /// True when either predicate holds for the same entity.
    pub fn or(&self, other: &Predicate<T>) -> Predicate<T> {
        Self::from_filter(self.filter.or(&other.filter))
    }

    pub fn evaluate(&self, doc: &Document) -> QueryResult<bool> {
        self.filter.evaluate(doc)
    }
}

impl<T: Serialize> Predicate<T> {
    /// Evaluate against an in-memory entity through its serialized form.
    pub fn matches(&self, entity: &T) -> QueryResult<bool> {
        match serde_json::to_value(entity)? {
            Value::Object(doc) => self.evaluate(&doc),
            _ => Err(QueryError::NotADocument),
        }
    }
}

impl<T> Clone for Predicate<T> {
    fn clone(&self) -> Self {
        Self::from_filter(self.filter.clone())
    }
}

impl<T> fmt::Debug for Predicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Predicate").field(&self.filter).finish()
    }
}

impl<T> fmt::Display for Predicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.filter, f)
    }
}

impl<T> From<bool> for Predicate<T> {
    fn from(value: bool) -> Self {
        Self::constant(value)
    }
}

/// Start a query from a predicate (returned unchanged) or a boolean seed.
pub fn new_query<T>(predicate: impl Into<Predicate<T>>) -> Predicate<T> {
    predicate.into()
}

/// AND two optional predicates. An absent side yields the other one unchanged.
pub fn and<T>(left: Option<&Predicate<T>>, right: Option<&Predicate<T>>) -> Option<Predicate<T>> {
    match (left, right) {
        (Some(l), Some(r)) => Some(l.and(r)),
        (l, r) => l.or(r).cloned(),
    }
}

/// OR two optional predicates. An absent side yields the other one unchanged.
pub fn or<T>(left: Option<&Predicate<T>>, right: Option<&Predicate<T>>) -> Option<Predicate<T>> {
    match (left, right) {
        (Some(l), Some(r)) => Some(l.or(r)),
        (l, r) => l.or(r).cloned(),
    }
}
