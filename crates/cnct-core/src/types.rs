//! Outcome types shared by collection operations

use serde::{Deserialize, Serialize};

/// Counts reported by an update operation
///
/// `modified` never exceeds `matched`: a document whose fields already hold
/// the target values is matched but not modified.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UpdateOutcome {
    /// Documents selected by the filter
    pub matched: u64,
    /// Documents actually changed
    pub modified: u64,
}

impl UpdateOutcome {
    /// Create an outcome, clamping `modified` to `matched`
    pub fn new(matched: u64, modified: u64) -> Self {
        Self {
            matched,
            modified: modified.min(matched),
        }
    }

    /// True when the filter selected nothing
    pub fn is_unmatched(&self) -> bool {
        self.matched == 0
    }

    /// Matched documents that already held the target values
    pub fn unchanged(&self) -> u64 {
        self.matched - self.modified
    }
}

impl From<UpdateOutcome> for (u64, u64) {
    fn from(outcome: UpdateOutcome) -> Self {
        (outcome.matched, outcome.modified)
    }
}
