//! Back-off between unproductive claim/poll attempts.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Spin (yielding to the runtime) for a while, then park between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdleStrategy {
    /// Unproductive attempts that only yield before parking starts.
    pub max_spins: u32,
    /// How long to park once spinning is exhausted.
    pub park: Duration,
}

impl Default for IdleStrategy {
    fn default() -> Self {
        Self {
            max_spins: 100,
            park: Duration::from_micros(500),
        }
    }
}

/// Per-loop idle state.
#[derive(Debug)]
pub(crate) struct Idler {
    strategy: IdleStrategy,
    spins: u32,
}

impl Idler {
    pub(crate) fn new(strategy: IdleStrategy) -> Self {
        Self { strategy, spins: 0 }
    }

    /// Waits according to the strategy. Any work done resets the spin count.
    pub(crate) async fn idle(&mut self, work_count: usize) {
        if work_count > 0 {
            self.spins = 0;
            return;
        }
        if self.spins < self.strategy.max_spins {
            self.spins += 1;
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.strategy.park).await;
        }
    }

    pub(crate) fn reset(&mut self) {
        self.spins = 0;
    }
}
