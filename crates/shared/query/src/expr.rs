//! Expression tree for entity predicates.
//!
//! An expression refers to "the current entity" through a [`Param`]
//! placeholder. Every predicate is built around its own placeholder, which is
//! why combining two predicates first rebinds both trees to a shared one.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;

use crate::document::ID_FIELD;

static NEXT_PARAM: AtomicU64 = AtomicU64::new(1);

/// Placeholder for the entity an expression is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Param(u64);

impl Param {
    /// Allocate a placeholder distinct from every other one in the process.
    pub fn fresh() -> Self {
        Param(NEXT_PARAM.fetch_add(1, Ordering::Relaxed))
    }

    pub fn id(&self) -> u64 {
        self.0
    }

    /// Access a field of the entity. Dots address nested fields.
    pub fn field(&self, path: &str) -> Expr {
        path.split('.').fold(Expr::Param(*self), |base, segment| {
            Expr::Member(Box::new(base), segment.to_string())
        })
    }

    /// Access the store-assigned identifier.
    pub fn id_field(&self) -> Expr {
        self.field(ID_FIELD)
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "it_{}", self.0)
    }
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl CmpOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Lte => "<=",
            CmpOp::Gt => ">",
            CmpOp::Gte => ">=",
        }
    }
}

/// Methods callable on a value inside an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Substring for strings, element membership for arrays
    Contains,
    StartsWith,
    EndsWith,
    ToLowercase,
    ToUppercase,
    /// Character count for strings, element count for arrays
    Length,
    /// Target equals one of the arguments
    In,
}

impl Method {
    pub fn name(&self) -> &'static str {
        match self {
            Method::Contains => "contains",
            Method::StartsWith => "starts_with",
            Method::EndsWith => "ends_with",
            Method::ToLowercase => "to_lowercase",
            Method::ToUppercase => "to_uppercase",
            Method::Length => "len",
            Method::In => "in",
        }
    }
}

/// A node of the expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// The entity placeholder
    Param(Param),
    /// Field access on the entity or on a nested field
    Member(Box<Expr>, String),
    /// Constant value
    Literal(Value),
    Compare(CmpOp, Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Call(Method, Box<Expr>, Vec<Expr>),
    /// The member is present on the entity (even when null)
    Exists(Box<Expr>),
}

impl Expr {
    pub fn literal(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    fn compare_literal(self, op: CmpOp, value: impl Into<Value>) -> Self {
        Expr::Compare(op, Box::new(self), Box::new(Expr::literal(value)))
    }

    pub fn eq(self, value: impl Into<Value>) -> Self {
        self.compare_literal(CmpOp::Eq, value)
    }

    pub fn ne(self, value: impl Into<Value>) -> Self {
        self.compare_literal(CmpOp::Ne, value)
    }

    pub fn lt(self, value: impl Into<Value>) -> Self {
        self.compare_literal(CmpOp::Lt, value)
    }

    pub fn lte(self, value: impl Into<Value>) -> Self {
        self.compare_literal(CmpOp::Lte, value)
    }

    pub fn gt(self, value: impl Into<Value>) -> Self {
        self.compare_literal(CmpOp::Gt, value)
    }

    pub fn gte(self, value: impl Into<Value>) -> Self {
        self.compare_literal(CmpOp::Gte, value)
    }

    /// Compare against another expression, e.g. a second field.
    pub fn compare(self, op: CmpOp, other: Expr) -> Self {
        Expr::Compare(op, Box::new(self), Box::new(other))
    }

    pub fn and(self, other: Expr) -> Self {
        Expr::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Expr) -> Self {
        Expr::Or(Box::new(self), Box::new(other))
    }

    fn call(self, method: Method, args: Vec<Expr>) -> Self {
        Expr::Call(method, Box::new(self), args)
    }

    pub fn contains(self, value: impl Into<Value>) -> Self {
        self.call(Method::Contains, vec![Expr::literal(value)])
    }

    pub fn starts_with(self, prefix: impl Into<String>) -> Self {
        self.call(Method::StartsWith, vec![Expr::literal(prefix.into())])
    }

    pub fn ends_with(self, suffix: impl Into<String>) -> Self {
        self.call(Method::EndsWith, vec![Expr::literal(suffix.into())])
    }

    pub fn to_lowercase(self) -> Self {
        self.call(Method::ToLowercase, Vec::new())
    }

    pub fn to_uppercase(self) -> Self {
        self.call(Method::ToUppercase, Vec::new())
    }

    pub fn length(self) -> Self {
        self.call(Method::Length, Vec::new())
    }

    pub fn is_in<I, V>(self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let args = values.into_iter().map(Expr::literal).collect();
        self.call(Method::In, args)
    }

    pub fn exists(self) -> Self {
        Expr::Exists(Box::new(self))
    }

    /// Copy of this tree with every reference to `from` replaced by `to`.
    ///
    /// All other structure is preserved as-is.
    pub fn rebind(&self, from: Param, to: Param) -> Expr {
        let rebind = |e: &Box<Expr>| Box::new(e.rebind(from, to));
        match self {
            Expr::Param(p) if *p == from => Expr::Param(to),
            Expr::Param(p) => Expr::Param(*p),
            Expr::Member(base, name) => Expr::Member(rebind(base), name.clone()),
            Expr::Literal(value) => Expr::Literal(value.clone()),
            Expr::Compare(op, l, r) => Expr::Compare(*op, rebind(l), rebind(r)),
            Expr::Not(inner) => Expr::Not(rebind(inner)),
            Expr::And(l, r) => Expr::And(rebind(l), rebind(r)),
            Expr::Or(l, r) => Expr::Or(rebind(l), rebind(r)),
            Expr::Call(method, target, args) => Expr::Call(
                *method,
                rebind(target),
                args.iter().map(|a| a.rebind(from, to)).collect(),
            ),
            Expr::Exists(inner) => Expr::Exists(rebind(inner)),
        }
    }

    /// Every placeholder referenced in this tree.
    pub fn params(&self) -> BTreeSet<Param> {
        let mut out = BTreeSet::new();
        self.collect_params(&mut out);
        out
    }

    fn collect_params(&self, out: &mut BTreeSet<Param>) {
        match self {
            Expr::Param(p) => {
                out.insert(*p);
            }
            Expr::Literal(_) => {}
            Expr::Member(inner, _) | Expr::Not(inner) | Expr::Exists(inner) => {
                inner.collect_params(out)
            }
            Expr::Compare(_, l, r) | Expr::And(l, r) | Expr::Or(l, r) => {
                l.collect_params(out);
                r.collect_params(out);
            }
            Expr::Call(_, target, args) => {
                target.collect_params(out);
                for arg in args {
                    arg.collect_params(out);
                }
            }
        }
    }
}

impl std::ops::Not for Expr {
    type Output = Expr;

    fn not(self) -> Expr {
        Expr::Not(Box::new(self))
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Param(p) => write!(f, "{}", p),
            Expr::Member(base, name) => write!(f, "{}.{}", base, name),
            Expr::Literal(value) => write!(f, "{}", value),
            Expr::Compare(op, l, r) => write!(f, "({} {} {})", l, op.symbol(), r),
            Expr::Not(inner) => write!(f, "!{}", inner),
            Expr::And(l, r) => write!(f, "({} && {})", l, r),
            Expr::Or(l, r) => write!(f, "({} || {})", l, r),
            Expr::Call(method, target, args) => {
                write!(f, "{}.{}(", target, method.name())?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Expr::Exists(inner) => write!(f, "exists({})", inner),
        }
    }
}
