//! Test support for the client crates.
//!
//! [`mock::MockServer`] simulates a server with optimistic conflict detection:
//! it hands out start timestamps, tracks the keys each transaction writes and
//! aborts a commit when another transaction committed one of those keys after
//! it started. Every call is recorded so tests can assert which server calls a
//! client operation made.

pub mod mock;

pub use mock::{Call, MockCluster, MockServer, MockStub, Op, RecordedCall};
