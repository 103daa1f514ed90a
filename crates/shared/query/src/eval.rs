//! Tree-walking evaluator binding one placeholder to one document.

use std::borrow::Cow;
use std::cmp::Ordering;

use serde_json::Value;

use crate::document::Document;
use crate::error::{QueryError, QueryResult};
use crate::expr::{CmpOp, Expr, Method, Param};
use crate::value::{compare_values, same_kind, values_equal};

/// Where a member chain currently points.
enum Scope<'a> {
    Root(&'a Document),
    Field(&'a Value),
    Missing,
}

pub(crate) struct Evaluator {
    param: Param,
}

impl Evaluator {
    pub(crate) fn new(param: Param) -> Self {
        Self { param }
    }

    /// Evaluate `expr` as a condition.
    pub(crate) fn test(&self, expr: &Expr, doc: &Document) -> QueryResult<bool> {
        match expr {
            Expr::And(l, r) => Ok(self.test(l, doc)? && self.test(r, doc)?),
            Expr::Or(l, r) => Ok(self.test(l, doc)? || self.test(r, doc)?),
            Expr::Not(inner) => Ok(!self.test(inner, doc)?),
            _ => match self.value(expr, doc)?.as_ref() {
                Value::Bool(b) => Ok(*b),
                other => Err(QueryError::NotBoolean(other.to_string())),
            },
        }
    }

    fn check(&self, param: Param) -> QueryResult<()> {
        if param == self.param {
            Ok(())
        } else {
            Err(QueryError::UnboundParameter {
                expected: self.param.id(),
                found: param.id(),
            })
        }
    }

    fn scope<'a>(&self, expr: &Expr, doc: &'a Document) -> QueryResult<Scope<'a>> {
        match expr {
            Expr::Param(p) => {
                self.check(*p)?;
                Ok(Scope::Root(doc))
            }
            Expr::Member(base, name) => Ok(match self.scope(base, doc)? {
                Scope::Root(d) => d.get(name).map_or(Scope::Missing, Scope::Field),
                Scope::Field(Value::Object(fields)) => {
                    fields.get(name).map_or(Scope::Missing, Scope::Field)
                }
                _ => Scope::Missing,
            }),
            other => Err(QueryError::InvalidMemberBase(other.to_string())),
        }
    }

    fn value<'a>(&self, expr: &'a Expr, doc: &'a Document) -> QueryResult<Cow<'a, Value>> {
        match expr {
            Expr::Literal(value) => Ok(Cow::Borrowed(value)),
            Expr::Param(_) | Expr::Member(..) => Ok(match self.scope(expr, doc)? {
                Scope::Root(d) => Cow::Owned(Value::Object(d.clone())),
                Scope::Field(value) => Cow::Borrowed(value),
                Scope::Missing => Cow::Owned(Value::Null),
            }),
            Expr::Exists(inner) => {
                let present = !matches!(self.scope(inner, doc)?, Scope::Missing);
                Ok(Cow::Owned(Value::Bool(present)))
            }
            Expr::And(..) | Expr::Or(..) | Expr::Not(_) => {
                Ok(Cow::Owned(Value::Bool(self.test(expr, doc)?)))
            }
            Expr::Compare(op, l, r) => {
                let left = self.value(l, doc)?;
                let right = self.value(r, doc)?;
                Ok(Cow::Owned(Value::Bool(compare(*op, &left, &right))))
            }
            Expr::Call(method, target, args) => {
                let target = self.value(target, doc)?;
                let args = args
                    .iter()
                    .map(|arg| self.value(arg, doc))
                    .collect::<QueryResult<Vec<_>>>()?;
                call(*method, &target, &args).map(Cow::Owned)
            }
        }
    }
}

fn compare(op: CmpOp, left: &Value, right: &Value) -> bool {
    match op {
        CmpOp::Eq => values_equal(left, right),
        CmpOp::Ne => !values_equal(left, right),
        // range comparisons only hold between values of the same kind
        _ if !same_kind(left, right) => false,
        CmpOp::Lt => compare_values(left, right) == Ordering::Less,
        CmpOp::Lte => compare_values(left, right) != Ordering::Greater,
        CmpOp::Gt => compare_values(left, right) == Ordering::Greater,
        CmpOp::Gte => compare_values(left, right) != Ordering::Less,
    }
}

fn arity(method: Method, args: &[Cow<'_, Value>], expected: usize) -> QueryResult<()> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(QueryError::Arity {
            method: method.name(),
            expected,
            found: args.len(),
        })
    }
}

fn call(method: Method, target: &Value, args: &[Cow<'_, Value>]) -> QueryResult<Value> {
    let result = match method {
        Method::Contains => {
            arity(method, args, 1)?;
            let needle = args[0].as_ref();
            match (target, needle) {
                (Value::String(s), Value::String(n)) => Value::Bool(s.contains(n.as_str())),
                (Value::Array(items), _) => {
                    Value::Bool(items.iter().any(|item| values_equal(item, needle)))
                }
                _ => Value::Bool(false),
            }
        }
        Method::StartsWith | Method::EndsWith => {
            arity(method, args, 1)?;
            match (target, args[0].as_ref()) {
                (Value::String(s), Value::String(affix)) if method == Method::StartsWith => {
                    Value::Bool(s.starts_with(affix.as_str()))
                }
                (Value::String(s), Value::String(affix)) => Value::Bool(s.ends_with(affix.as_str())),
                _ => Value::Bool(false),
            }
        }
        Method::ToLowercase => {
            arity(method, args, 0)?;
            target
                .as_str()
                .map_or(Value::Null, |s| Value::String(s.to_lowercase()))
        }
        Method::ToUppercase => {
            arity(method, args, 0)?;
            target
                .as_str()
                .map_or(Value::Null, |s| Value::String(s.to_uppercase()))
        }
        Method::Length => {
            arity(method, args, 0)?;
            match target {
                Value::String(s) => Value::from(s.chars().count()),
                Value::Array(items) => Value::from(items.len()),
                _ => Value::Null,
            }
        }
        Method::In => {
            let hit = |candidate: &Value| args.iter().any(|arg| values_equal(candidate, arg));
            match target {
                Value::Array(items) => Value::Bool(items.iter().any(hit)),
                other => Value::Bool(hit(other)),
            }
        }
    };
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn eval(param: Param, expr: &Expr, value: Value) -> QueryResult<bool> {
        Evaluator::new(param).test(expr, &doc(value))
    }

    #[test]
    fn test_comparisons() {
        let it = Param::fresh();
        let d = json!({"age": 30, "name": "Ann"});
        assert!(eval(it, &it.field("age").eq(30), d.clone()).unwrap());
        assert!(eval(it, &it.field("age").gte(30.0), d.clone()).unwrap());
        assert!(!eval(it, &it.field("age").lt(30), d.clone()).unwrap());
        assert!(eval(it, &it.field("name").ne("Bob"), d.clone()).unwrap());
        // mixed kinds never satisfy a range comparison
        assert!(!eval(it, &it.field("name").gt(1), d).unwrap());
    }

    #[test]
    fn test_missing_field_behaves_as_null() {
        let it = Param::fresh();
        let d = json!({"a": 1});
        assert!(eval(it, &it.field("b").eq(Value::Null), d.clone()).unwrap());
        assert!(!eval(it, &it.field("b").exists(), d.clone()).unwrap());
        assert!(eval(it, &it.field("a").exists(), d).unwrap());
    }

    #[test]
    fn test_string_calls() {
        let it = Param::fresh();
        let d = json!({"email": "Jane@Example.com"});
        let lowered = it.field("email").to_lowercase();
        assert!(eval(it, &lowered.clone().ends_with("example.com"), d.clone()).unwrap());
        assert!(eval(it, &lowered.starts_with("jane"), d.clone()).unwrap());
        assert!(eval(it, &it.field("email").contains("@"), d.clone()).unwrap());
        assert!(eval(it, &it.field("email").length().eq(16), d).unwrap());
    }

    #[test]
    fn test_array_calls() {
        let it = Param::fresh();
        let d = json!({"tags": ["a", "b"], "n": 2});
        assert!(eval(it, &it.field("tags").contains("b"), d.clone()).unwrap());
        assert!(eval(it, &it.field("tags").is_in(["x", "a"]), d.clone()).unwrap());
        assert!(eval(it, &it.field("n").is_in([1, 2, 3]), d.clone()).unwrap());
        assert!(!eval(it, &it.field("n").is_in(Vec::<i32>::new()), d).unwrap());
    }

    #[test]
    fn test_foreign_param_is_rejected() {
        let it = Param::fresh();
        let other = Param::fresh();
        let err = eval(it, &other.field("a").eq(1), json!({"a": 1})).unwrap_err();
        assert!(matches!(err, QueryError::UnboundParameter { .. }));
    }

    #[test]
    fn test_non_boolean_condition_is_rejected() {
        let it = Param::fresh();
        let err = eval(it, &it.field("a"), json!({"a": 1})).unwrap_err();
        assert!(matches!(err, QueryError::NotBoolean(_)));
    }

    #[test]
    fn test_member_on_computed_value_is_rejected() {
        let it = Param::fresh();
        let expr = Expr::Member(Box::new(it.field("a").to_lowercase()), "b".into()).eq(1);
        let err = eval(it, &expr, json!({"a": "x"})).unwrap_err();
        assert!(matches!(err, QueryError::InvalidMemberBase(_)));
    }
}
