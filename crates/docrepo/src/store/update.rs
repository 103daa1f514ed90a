//! Partial field-level updates applied by `execute_update`.

use serde_json::{Number, Value};

use common::{StoreError, StoreResult};
use query::{get_path, remove_path, set_path, Document, ID_FIELD};

/// One field-level operator.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOp {
    /// Overwrite (or create) the field
    Set(String, Value),
    /// Remove the field if present
    Unset(String),
    /// Add a number to the field, creating it when missing
    Inc(String, Value),
}

impl UpdateOp {
    pub fn path(&self) -> &str {
        match self {
            UpdateOp::Set(path, _) | UpdateOp::Unset(path) | UpdateOp::Inc(path, _) => path,
        }
    }
}

/// An ordered list of field operators applied to every matched document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateSpec {
    ops: Vec<UpdateOp>,
}

impl UpdateSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.ops.push(UpdateOp::Set(path.into(), value.into()));
        self
    }

    pub fn unset(mut self, path: impl Into<String>) -> Self {
        self.ops.push(UpdateOp::Unset(path.into()));
        self
    }

    pub fn inc(mut self, path: impl Into<String>, amount: impl Into<Number>) -> Self {
        self.ops.push(UpdateOp::Inc(path.into(), Value::Number(amount.into())));
        self
    }

    pub fn ops(&self) -> &[UpdateOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Reject empty specs and anything that touches `_id`.
    pub fn validate(&self) -> StoreResult<()> {
        if self.ops.is_empty() {
            return Err(StoreError::invalid_update("update spec has no operators"));
        }
        for op in &self.ops {
            let path = op.path();
            if path.is_empty() {
                return Err(StoreError::invalid_update("empty field path"));
            }
            if path == ID_FIELD || path.starts_with("_id.") {
                return Err(StoreError::invalid_update(format!(
                    "update may not modify '{}'",
                    path
                )));
            }
        }
        Ok(())
    }

    /// Apply every operator to `doc` in order. Returns whether the document changed.
    pub fn apply(&self, doc: &mut Document) -> StoreResult<bool> {
        let before = doc.clone();
        for op in &self.ops {
            match op {
                UpdateOp::Set(path, value) => {
                    if !set_path(doc, path, value.clone()) {
                        return Err(StoreError::invalid_update(format!(
                            "cannot set '{}': parent is not a document",
                            path
                        )));
                    }
                }
                UpdateOp::Unset(path) => {
                    remove_path(doc, path);
                }
                UpdateOp::Inc(path, amount) => {
                    let next = match get_path(doc, path) {
                        None | Some(Value::Null) => amount.clone(),
                        Some(Value::Number(current)) => add_numbers(current, amount)?,
                        Some(other) => {
                            return Err(StoreError::invalid_update(format!(
                                "cannot increment non-numeric field '{}' ({})",
                                path, other
                            )))
                        }
                    };
                    if !set_path(doc, path, next) {
                        return Err(StoreError::invalid_update(format!(
                            "cannot increment '{}': parent is not a document",
                            path
                        )));
                    }
                }
            }
        }
        Ok(*doc != before)
    }
}

fn add_numbers(current: &Number, amount: &Value) -> StoreResult<Value> {
    let amount = match amount {
        Value::Number(n) => n,
        other => {
            return Err(StoreError::invalid_update(format!(
                "increment amount must be numeric, got {}",
                other
            )))
        }
    };

    if let (Some(a), Some(b)) = (current.as_i64(), amount.as_i64()) {
        if let Some(sum) = a.checked_add(b) {
            return Ok(Value::from(sum));
        }
    }

    let sum = current.as_f64().unwrap_or_default() + amount.as_f64().unwrap_or_default();
    Number::from_f64(sum)
        .map(Value::Number)
        .ok_or_else(|| StoreError::invalid_update("increment produced a non-finite number"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_set_unset_inc() {
        let mut target = doc(json!({"_id": "x", "name": "Ada", "score": 2, "tmp": true}));
        let spec = UpdateSpec::new()
            .set("name", "Grace")
            .set("address.city", "Oslo")
            .unset("tmp")
            .inc("score", 3)
            .inc("visits", 1);

        assert!(spec.apply(&mut target).unwrap());
        assert_eq!(
            Value::Object(target),
            json!({
                "_id": "x",
                "name": "Grace",
                "address": {"city": "Oslo"},
                "score": 5,
                "visits": 1
            })
        );
    }

    #[test]
    fn test_apply_reports_unchanged() {
        let mut target = doc(json!({"name": "Ada"}));
        let spec = UpdateSpec::new().set("name", "Ada");
        assert!(!spec.apply(&mut target).unwrap());
    }

    #[test]
    fn test_inc_mixed_numbers() {
        let mut target = doc(json!({"ratio": 0.5}));
        UpdateSpec::new().inc("ratio", 2).apply(&mut target).unwrap();
        assert_eq!(target["ratio"], json!(2.5));
    }

    #[test]
    fn test_inc_rejects_strings() {
        let mut target = doc(json!({"name": "Ada"}));
        let err = UpdateSpec::new().inc("name", 1).apply(&mut target).unwrap_err();
        assert!(matches!(err, StoreError::InvalidUpdate(_)));
    }

    #[test]
    fn test_validate_rejects_id_and_empty() {
        assert!(matches!(
            UpdateSpec::new().validate(),
            Err(StoreError::InvalidUpdate(_))
        ));
        assert!(matches!(
            UpdateSpec::new().set("_id", "y").validate(),
            Err(StoreError::InvalidUpdate(_))
        ));
        assert!(UpdateSpec::new().set("name", "y").validate().is_ok());
    }
}
