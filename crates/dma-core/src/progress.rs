//! Monotonic chunk-processed counter exposed to UIs during a long scan.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Tracks `processed / total` chunks for a single scan invocation.
#[derive(Clone)]
pub struct Progress {
    processed: Arc<AtomicU64>,
    total: u64,
}

impl Progress {
    #[must_use]
    pub fn new(total_chunks: u64) -> Self {
        Self {
            processed: Arc::new(AtomicU64::new(0)),
            total: total_chunks,
        }
    }

    pub fn advance(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    #[must_use]
    pub const fn total(&self) -> u64 {
        self.total
    }

    /// Fraction complete in `[0.0, 1.0]`. `1.0` when there is nothing to do.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            (self.processed() as f64 / self.total as f64).min(1.0)
        }
    }
}
