//! Client-side transaction bookkeeping.
//!
//! This crate holds the parts of a transaction that do not talk to a server:
//! the context accumulated from server responses and the lifecycle state
//! machine. Both are plain values whose transitions return new values, so
//! they can be tested without any I/O.

pub mod context;
pub mod error;
pub mod timestamp;
pub mod transaction;

pub use context::TransactionContext;
pub use error::TransactionError;
pub use timestamp::Timestamp;
pub use transaction::{CommitAction, DiscardAction, Lifecycle, TxnOptions, TxnState};
