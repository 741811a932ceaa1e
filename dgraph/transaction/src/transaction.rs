//! Transaction options and lifecycle state machine.
//!
//! A transaction is either `Active` or `Finished`. Every operation first asks
//! the [`Lifecycle`] whether it may run, and the lifecycle answers with the
//! next lifecycle value plus the server action (if any) the operation must
//! perform.

use serde::{Deserialize, Serialize};

use crate::error::TransactionError;

/// Options fixed when a transaction is created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxnOptions {
    pub read_only: bool,
    /// Allow reads from a possibly stale snapshot. Requires `read_only`.
    pub best_effort: bool,
}

impl TxnOptions {
    pub fn read_only() -> Self {
        Self {
            read_only: true,
            best_effort: false,
        }
    }

    pub fn with_best_effort(mut self) -> Self {
        self.best_effort = true;
        self
    }

    pub fn validate(&self) -> Result<(), TransactionError> {
        if self.best_effort && !self.read_only {
            return Err(TransactionError::BestEffortRequiresReadOnly);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TxnState {
    #[default]
    Active,
    /// Committed or discarded. Terminal.
    Finished,
}

/// What `commit` has to do against the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitAction {
    /// Nothing was written, so there is nothing to commit.
    Skip,
    Commit,
}

/// What `discard` has to do against the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardAction {
    Skip,
    Abort,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Lifecycle {
    state: TxnState,
    mutated: bool,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn state(&self) -> TxnState {
        self.state
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.state == TxnState::Finished
    }

    #[inline]
    pub fn is_mutated(&self) -> bool {
        self.mutated
    }

    pub fn check_active(&self) -> Result<(), TransactionError> {
        match self.state {
            TxnState::Active => Ok(()),
            TxnState::Finished => Err(TransactionError::Finished),
        }
    }

    /// Records that a mutation is about to be dispatched. The flag is set
    /// before the server answers, so a failed mutation still needs a discard.
    pub fn begin_mutate(self) -> Result<Self, TransactionError> {
        self.check_active()?;
        Ok(Self {
            mutated: true,
            ..self
        })
    }

    /// Applies a successful mutation response.
    pub fn finish_mutate(self, commit_now: bool) -> Self {
        if commit_now { self.finished() } else { self }
    }

    pub fn begin_commit(self) -> Result<(Self, CommitAction), TransactionError> {
        self.check_active()?;
        let action = if self.mutated {
            CommitAction::Commit
        } else {
            CommitAction::Skip
        };
        Ok((self.finished(), action))
    }

    /// Discarding is idempotent: a finished transaction yields `Skip`.
    pub fn begin_discard(self) -> (Self, DiscardAction) {
        if self.is_finished() || !self.mutated {
            return (self.finished(), DiscardAction::Skip);
        }
        (self.finished(), DiscardAction::Abort)
    }

    fn finished(self) -> Self {
        Self {
            state: TxnState::Finished,
            ..self
        }
    }
}
