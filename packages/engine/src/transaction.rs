//! Transaction origin and the applied-change record.
//!
//! The origin is an explicit discriminated union threaded through the
//! apply path, not ambient metadata: a transaction is either local (emit
//! it, record it in history) or remote (never re-emit, never record).
//! There is no flag to get stuck.

use crate::steps::{Mapping, Step};

/// Where a transaction came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionOrigin {
    /// Produced by local user input.
    Local,

    /// Reconstructed from a peer's step batch.
    Remote { source_user_id: String },
}

/// The record of one applied change: the steps that went in, their
/// inverses (local only), and the position mapping presence trackers
/// remap through.
#[derive(Debug, Clone)]
pub struct Transaction {
    origin: TransactionOrigin,
    steps: Vec<Step>,
    inverses: Vec<Step>,
    mapping: Mapping,
    add_to_history: bool,
}

impl Transaction {
    pub(crate) fn new(
        origin: TransactionOrigin,
        steps: Vec<Step>,
        inverses: Vec<Step>,
        mapping: Mapping,
        add_to_history: bool,
    ) -> Self {
        Self {
            origin,
            steps,
            inverses,
            mapping,
            add_to_history,
        }
    }

    pub fn origin(&self) -> &TransactionOrigin {
        &self.origin
    }

    pub fn is_remote(&self) -> bool {
        matches!(self.origin, TransactionOrigin::Remote { .. })
    }

    /// Steps that actually applied, in application order.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Inverse steps in undo order. Empty for remote transactions.
    pub fn inverses(&self) -> &[Step] {
        &self.inverses
    }

    /// Position mapping through every applied step.
    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    /// Whether applying this transaction changed the document.
    pub fn doc_changed(&self) -> bool {
        !self.steps.is_empty()
    }

    /// Whether this transaction belongs in the local undo history.
    pub fn add_to_history(&self) -> bool {
        self.add_to_history
    }
}
