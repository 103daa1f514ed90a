//! Sort specifications.

use std::cmp::Ordering;

use serde_json::Value;

use crate::document::{get_path, Document};
use crate::value::compare_values;

/// Specifies the direction for sorting documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    /// Smallest to largest
    #[default]
    Ascending,
    /// Largest to smallest
    Descending,
}

impl SortDirection {
    pub fn reverse(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

/// A (field, direction) pair. The field is a dotted document path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    field: String,
    direction: SortDirection,
}

impl Sort {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    pub fn ascending(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Ascending)
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Descending)
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn direction(&self) -> SortDirection {
        self.direction
    }

    /// Order two documents by this field. Missing fields sort as null.
    pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
        let null = Value::Null;
        let left = get_path(a, &self.field).unwrap_or(&null);
        let right = get_path(b, &self.field).unwrap_or(&null);
        let ord = compare_values(left, right);
        match self.direction {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    }
}
