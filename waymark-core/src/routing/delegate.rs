use std::sync::atomic::{AtomicBool, Ordering};

use geo::Point;

/// Callbacks of a running route request. Shared between threads by batch routing.
pub trait RouterDelegate: Sync {
    fn is_cancelled(&self) -> bool {
        false
    }

    /// Progress in percent, only ever growing
    fn on_progress(&self, _percent: f64) {}

    /// Location of a vertex the search just settled
    fn on_point_check(&self, _point: Point<f64>) {}
}

pub struct NoopDelegate;

impl RouterDelegate for NoopDelegate {}

/// Delegate cancelled from another thread
#[derive(Debug, Default)]
pub struct CancelToken {
    cancelled: AtomicBool,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }
}

impl RouterDelegate for CancelToken {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}
