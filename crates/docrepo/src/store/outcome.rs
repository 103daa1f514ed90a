//! Write acknowledgements.

use serde::Serialize;

/// Result of a single-document replacement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReplaceOutcome {
    pub matched_count: u64,
    pub modified_count: u64,
}

impl ReplaceOutcome {
    /// Whether the filter matched a document
    pub fn found(&self) -> bool {
        self.matched_count > 0
    }
}

/// Result of a partial update over every matching document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpdateOutcome {
    pub matched_count: u64,
    pub modified_count: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeleteOutcome {
    pub deleted_count: u64,
}
