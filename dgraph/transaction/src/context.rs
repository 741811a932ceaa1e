//! The context a transaction accumulates across server round trips.

use std::collections::BTreeSet;

use dgraph_common::types::TxnContext;

use crate::error::TransactionError;
use crate::timestamp::Timestamp;
use crate::transaction::TxnOptions;

/// Server-assigned conflict-tracking metadata of one transaction.
///
/// `keys` and `preds` only ever grow. `start_ts` is adopted from the first
/// response and must then match every later response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionContext {
    start_ts: Timestamp,
    hash: String,
    keys: BTreeSet<String>,
    preds: BTreeSet<String>,
    read_only: bool,
    best_effort: bool,
    aborted: bool,
}

impl TransactionContext {
    pub fn new(options: TxnOptions) -> Result<Self, TransactionError> {
        options.validate()?;
        Ok(Self {
            read_only: options.read_only,
            best_effort: options.best_effort,
            ..Default::default()
        })
    }

    #[inline]
    pub fn start_ts(&self) -> Timestamp {
        self.start_ts
    }

    #[inline]
    pub fn hash(&self) -> &str {
        &self.hash
    }

    #[inline]
    pub fn keys(&self) -> &BTreeSet<String> {
        &self.keys
    }

    #[inline]
    pub fn preds(&self) -> &BTreeSet<String> {
        &self.preds
    }

    #[inline]
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    #[inline]
    pub fn is_best_effort(&self) -> bool {
        self.best_effort
    }

    #[inline]
    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Returns this context with a response fragment folded in. A response
    /// without a fragment leaves the context unchanged.
    ///
    /// On error `self` is left untouched; a mismatching start timestamp means
    /// requests of one transaction reached inconsistent server state and is
    /// not retryable.
    pub fn merge(&self, fragment: Option<&TxnContext>) -> Result<Self, TransactionError> {
        let Some(fragment) = fragment else {
            return Ok(self.clone());
        };
        let found = Timestamp::with_ts(fragment.start_ts);
        let start_ts = if self.start_ts.is_unset() {
            found
        } else if self.start_ts != found {
            return Err(TransactionError::StartTsMismatch {
                expected: self.start_ts,
                found,
            });
        } else {
            self.start_ts
        };

        let mut merged = self.clone();
        merged.start_ts = start_ts;
        merged.hash = fragment.hash.clone().unwrap_or_default();
        merged.keys.extend(fragment.keys.iter().cloned());
        merged.preds.extend(fragment.preds.iter().cloned());
        Ok(merged)
    }

    /// Marks the context as belonging to a discarded transaction.
    pub fn into_aborted(self) -> Self {
        Self {
            aborted: true,
            ..self
        }
    }

    /// Renders the context in the shape the server expects for commit and
    /// abort calls.
    pub fn to_wire(&self) -> TxnContext {
        TxnContext {
            start_ts: self.start_ts.raw(),
            aborted: self.aborted,
            keys: self.keys.iter().cloned().collect(),
            preds: self.preds.iter().cloned().collect(),
            read_only: self.read_only,
            best_effort: self.best_effort,
            hash: Some(self.hash.clone()),
        }
    }
}
