//! A transaction-aware client for a cluster of graph database servers.
//!
//! [`Client`] owns a pool of [`ServerStub`]s and hands out [`Txn`]s. A
//! transaction tracks the context the servers return, merges it after every
//! query and mutation, and finishes exactly once through
//! [`Txn::commit`] or [`Txn::discard`].
//!
//! Aborts are reported as [`Error::Aborted`]; retrying is left to the caller,
//! which should replay its work in a fresh transaction.

pub mod client;
pub mod error;
pub mod selector;
pub mod stub;
pub mod txn;

pub use client::{Client, ClientConfig};
pub use dgraph_common::types::{
    Assigned, GraphQlMutation, Mutation, Operation, Payload, QueryOptions, Request, Response,
    TxnContext, UiKeywords,
};
pub use dgraph_transaction::TxnOptions;
pub use error::{Error, Result};
pub use selector::{RandomSelector, RoundRobinSelector, StubSelector};
pub use stub::ServerStub;
pub use txn::Txn;
pub use {dgraph_common as common, dgraph_transaction as transaction};
