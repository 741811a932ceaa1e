use thiserror::Error;

use crate::timestamp::Timestamp;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("transaction has already been committed or discarded")]
    Finished,

    #[error("best effort only works for read-only queries")]
    BestEffortRequiresReadOnly,

    #[error("start timestamp mismatch: transaction has {expected}, response has {found}")]
    StartTsMismatch {
        expected: Timestamp,
        found: Timestamp,
    },
}
