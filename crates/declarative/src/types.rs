//! Core types for declarative resource management

use serde::{Deserialize, Serialize};

use crate::diff::ChangeSet;

/// Result of reconciling a single resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplyResult {
    /// Resource exists and matches the desired state
    NoChange,
    /// Resource was absent and has been created
    Created,
    /// Resource existed with drift and has been updated
    Modified,
    /// Resource exists but drifts from the desired state (read-only pass)
    Drifted { changes: ChangeSet },
    /// Reconciliation failed
    Failed { error: String },
    /// Reconciliation was skipped
    Skipped { reason: String },
}

impl ApplyResult {
    /// Check if the result represents success (no failure)
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    /// Check if the result represents a change made on the remote host
    pub fn is_change(&self) -> bool {
        matches!(self, Self::Created | Self::Modified)
    }
}

/// Summary of execution results
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteSummary {
    pub created: usize,
    pub modified: usize,
    pub drifted: usize,
    pub skipped: usize,
    pub failed: usize,
    pub no_change: usize,
}

impl ExecuteSummary {
    /// Total number of actual changes made
    pub fn total_changes(&self) -> usize {
        self.created + self.modified
    }

    /// Check if execution was fully successful (no failures)
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Total number of resources processed
    pub fn total(&self) -> usize {
        self.created + self.modified + self.drifted + self.skipped + self.failed + self.no_change
    }

    /// Add a result to the summary
    pub fn add_result(&mut self, result: &ApplyResult) {
        match result {
            ApplyResult::NoChange => self.no_change += 1,
            ApplyResult::Created => self.created += 1,
            ApplyResult::Modified => self.modified += 1,
            ApplyResult::Drifted { .. } => self.drifted += 1,
            ApplyResult::Failed { .. } => self.failed += 1,
            ApplyResult::Skipped { .. } => self.skipped += 1,
        }
    }
}

/// Options for a reconciliation pass
#[derive(Debug, Clone, Default)]
pub struct ReconcileOptions {
    /// Read and diff only; never create or update
    pub dry_run: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts_each_result_kind() {
        let mut summary = ExecuteSummary::default();
        summary.add_result(&ApplyResult::Created);
        summary.add_result(&ApplyResult::Modified);
        summary.add_result(&ApplyResult::NoChange);
        summary.add_result(&ApplyResult::Failed {
            error: "boom".into(),
        });

        assert_eq!(summary.total(), 4);
        assert_eq!(summary.total_changes(), 2);
        assert!(!summary.is_success());
    }
}
