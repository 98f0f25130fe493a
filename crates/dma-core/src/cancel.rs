//! Cooperative cancellation shared by chunked scans.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A caller-owned flag observed before each chunk read and each chunk scan.
///
/// Cloning shares the same underlying flag, so a UI thread can hold one
/// clone and call `cancel()` while a scan running elsewhere holds another
/// and polls `is_cancelled()`.
#[derive(Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    #[must_use]
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let flag = CancelFlag::new();
        let clone = flag.clone();
        assert!(!clone.is_cancelled());
        flag.cancel();
        assert!(clone.is_cancelled());
    }
}
