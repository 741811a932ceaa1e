//! Strategies for picking a pool member per call.

use std::fmt::Debug;
use std::sync::atomic::{AtomicUsize, Ordering};

use rand::Rng;

/// Picks which stub of a pool serves the next call.
pub trait StubSelector: Debug + Send + Sync {
    /// Returns an index in `0..len`. `len` is never zero.
    fn select(&self, len: usize) -> usize;
}

/// Uniform random choice, independently for every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSelector;

impl StubSelector for RandomSelector {
    fn select(&self, len: usize) -> usize {
        rand::rng().random_range(0..len)
    }
}

/// Cycles through the pool in order.
#[derive(Debug, Default)]
pub struct RoundRobinSelector {
    next: AtomicUsize,
}

impl RoundRobinSelector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StubSelector for RoundRobinSelector {
    fn select(&self, len: usize) -> usize {
        self.next.fetch_add(1, Ordering::Relaxed) % len
    }
}
