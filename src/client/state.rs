//! Workflow state shared by the vault and loan workflows.

/// A value read from chain. A failed refresh downgrades `Fresh` to `Stale`
/// so an old value is never presented as current.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reading<T> {
    Unknown,
    Fresh(T),
    Stale(T),
}

impl<T> Reading<T> {
    pub fn fresh(&self) -> Option<&T> {
        match self {
            Reading::Fresh(v) => Some(v),
            _ => None,
        }
    }

    /// Last known value, fresh or not.
    pub fn last_known(&self) -> Option<&T> {
        match self {
            Reading::Fresh(v) | Reading::Stale(v) => Some(v),
            Reading::Unknown => None,
        }
    }

    pub fn is_fresh(&self) -> bool {
        matches!(self, Reading::Fresh(_))
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, Reading::Stale(_))
    }

    pub(crate) fn mark_stale(&mut self) {
        *self = match core::mem::take(self) {
            Reading::Fresh(v) | Reading::Stale(v) => Reading::Stale(v),
            Reading::Unknown => Reading::Unknown,
        };
    }
}

impl<T> Default for Reading<T> {
    fn default() -> Self {
        Reading::Unknown
    }
}

/// Per-attempt state of a deposit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    Idle,
    Submitting,
    AwaitingConfirmation,
    Confirmed,
    Failed,
}

impl TxState {
    /// A transaction is on its way; the triggering control stays disabled.
    pub fn is_busy(&self) -> bool {
        matches!(self, TxState::Submitting | TxState::AwaitingConfirmation)
    }
}

/// Transaction state of the loan workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanTxState {
    Idle,
    Approving,
    Repaying,
    Confirmed,
    Failed,
}

impl LoanTxState {
    pub fn is_busy(&self) -> bool {
        matches!(self, LoanTxState::Approving | LoanTxState::Repaying)
    }
}
