//! Sources of the per-request random draw.

use std::sync::atomic::{AtomicUsize, Ordering};

use rand::Rng;

/// Upper bound (exclusive) of every draw.
pub const DRAW_RANGE: u32 = 100;

/// Produces the uniform sample in `0..DRAW_RANGE` that drives fault injection.
pub trait DecisionSource: Send + Sync + 'static {
    fn sample(&self) -> u32;
}

/// Thread-local RNG backed draws.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomDecisions;

impl DecisionSource for RandomDecisions {
    fn sample(&self) -> u32 {
        rand::thread_rng().gen_range(0..DRAW_RANGE)
    }
}

/// Replays a fixed sequence of draws, wrapping around at the end.
///
/// Values are reduced modulo [`DRAW_RANGE`]. An empty script always yields 0.
#[derive(Debug, Default)]
pub struct ScriptedDecisions {
    values: Vec<u32>,
    cursor: AtomicUsize,
}

impl ScriptedDecisions {
    pub fn new(values: impl Into<Vec<u32>>) -> Self {
        Self {
            values: values.into(),
            cursor: AtomicUsize::new(0),
        }
    }

    /// Number of draws taken so far.
    pub fn drawn(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }
}

impl DecisionSource for ScriptedDecisions {
    fn sample(&self) -> u32 {
        let i = self.cursor.fetch_add(1, Ordering::SeqCst);
        match self.values.len() {
            0 => 0,
            len => self.values[i % len] % DRAW_RANGE,
        }
    }
}
