use dgraph_common::error::{ApiError, StubError};
use dgraph_common::predicate_map::PredicateMapError;
use dgraph_transaction::{Timestamp, TransactionError};
use miette::Diagnostic;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("no clients provided in client constructor")]
    NoClients,

    #[error("transaction has already been committed or discarded")]
    #[diagnostic(help("start a new transaction"))]
    Finished,

    #[error("Transaction has been aborted. Please retry")]
    #[diagnostic(help("replay the operation in a new transaction"))]
    Aborted,

    #[error("best effort only works for read-only queries")]
    BestEffortRequiresReadOnly,

    #[error("start timestamp mismatch: transaction has {expected}, response has {found}")]
    StartTsMismatch {
        expected: Timestamp,
        found: Timestamp,
    },

    /// Error reported by the server that is not an abort.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Api(ApiError),

    /// The call did not produce a well-formed server response.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Transport(StubError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    PredicateMap(#[from] PredicateMapError),
}

impl Error {
    /// Returns true if the caller should retry with a new transaction.
    #[inline]
    pub fn is_aborted(&self) -> bool {
        matches!(self, Error::Aborted)
    }
}

impl From<StubError> for Error {
    fn from(err: StubError) -> Self {
        match err {
            StubError::Api(api) => Error::Api(api),
            other => Error::Transport(other),
        }
    }
}

impl From<TransactionError> for Error {
    fn from(err: TransactionError) -> Self {
        match err {
            TransactionError::Finished => Error::Finished,
            TransactionError::BestEffortRequiresReadOnly => Error::BestEffortRequiresReadOnly,
            TransactionError::StartTsMismatch { expected, found } => {
                Error::StartTsMismatch { expected, found }
            }
        }
    }
}
