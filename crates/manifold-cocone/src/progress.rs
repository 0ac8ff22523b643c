//! Progress reporting and cooperative cancellation.
//!
//! The caller owns the progress object; the algorithms only report into it
//! and poll it. A cancelled progress makes the running operation return
//! [`ReconstructionError::Cancelled`] at the next poll point.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::ReconstructionError;

/// Progress sink supplied by the caller.
pub trait Progress: Sync {
    /// Report `value` out of `max` work units.
    fn set(&self, value: u64, max: u64);

    /// Report a completion ratio in `[0, 1]`.
    fn set_ratio(&self, ratio: f64);

    /// Poll point. Returning true asks the running operation to stop.
    fn is_cancelled(&self) -> bool;
}

#[inline]
pub(crate) fn check_cancelled(progress: &dyn Progress) -> Result<(), ReconstructionError> {
    if progress.is_cancelled() {
        Err(ReconstructionError::Cancelled)
    } else {
        Ok(())
    }
}

/// Progress that ignores reports and never cancels.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    #[inline]
    fn set(&self, _value: u64, _max: u64) {}

    #[inline]
    fn set_ratio(&self, _ratio: f64) {}

    #[inline]
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Thread-safe progress ratio that can be cancelled from another thread.
#[derive(Debug, Default)]
pub struct ProgressRatio {
    ratio_bits: AtomicU64,
    cancelled: AtomicBool,
}

impl ProgressRatio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last reported ratio.
    pub fn ratio(&self) -> f64 {
        f64::from_bits(self.ratio_bits.load(Ordering::Relaxed))
    }

    /// Request cancellation of every operation polling this progress.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }
}

impl Progress for ProgressRatio {
    fn set(&self, value: u64, max: u64) {
        let ratio = if max == 0 {
            0.0
        } else {
            value.min(max) as f64 / max as f64
        };
        self.set_ratio(ratio);
    }

    fn set_ratio(&self, ratio: f64) {
        let ratio = if ratio.is_finite() {
            ratio.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.ratio_bits.store(ratio.to_bits(), Ordering::Relaxed);
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_is_clamped() {
        let progress = ProgressRatio::new();
        assert_eq!(progress.ratio(), 0.0);

        progress.set(1, 4);
        assert_eq!(progress.ratio(), 0.25);

        progress.set(10, 4);
        assert_eq!(progress.ratio(), 1.0);

        progress.set(3, 0);
        assert_eq!(progress.ratio(), 0.0);

        progress.set_ratio(f64::NAN);
        assert_eq!(progress.ratio(), 0.0);
    }

    #[test]
    fn test_cancel_from_other_thread() {
        let progress = ProgressRatio::new();
        assert!(check_cancelled(&progress).is_ok());

        std::thread::scope(|s| {
            s.spawn(|| progress.cancel());
        });

        assert_eq!(
            check_cancelled(&progress),
            Err(ReconstructionError::Cancelled)
        );
        assert!(check_cancelled(&NoProgress).is_ok());
    }
}
