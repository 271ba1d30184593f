/// Strategies for picking one member out of an eligible set
use crate::core::Member;
use rand::Rng;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Picks the index of the member that will serve the operation
pub trait PickStrategy: Send + Sync {
    fn pick(&self, eligible: &[&Member]) -> Option<usize>;
}

/// Uniform random pick; the default for spreading load across equals
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomPick;

impl RandomPick {
    pub fn new() -> Self {
        Self
    }
}

impl PickStrategy for RandomPick {
    fn pick(&self, eligible: &[&Member]) -> Option<usize> {
        if eligible.is_empty() {
            return None;
        }

        Some(rand::thread_rng().gen_range(0..eligible.len()))
    }
}

/// Round-robin pick across successive calls
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self {
            counter: AtomicUsize::new(0),
        }
    }
}

impl PickStrategy for RoundRobin {
    fn pick(&self, eligible: &[&Member]) -> Option<usize> {
        if eligible.is_empty() {
            return None;
        }

        let index = self.counter.fetch_add(1, Ordering::Relaxed) % eligible.len();
        Some(index)
    }
}
