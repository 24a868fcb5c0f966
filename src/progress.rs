//! Cooperative cancellation for long-running stages.
//!
//! Stages report completion in `[0, 1]` at bounded intervals. A callback that
//! returns `false` cancels the stage, which then fails with
//! [`GazeError::Cancelled`] instead of returning partial output.
use crate::error::{GazeError, Result};

pub trait Progress {
    /// Report completion; return `false` to request cancellation.
    fn update(&mut self, fraction: f64) -> bool;
}

/// Progress sink that never cancels.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    #[inline]
    fn update(&mut self, _fraction: f64) -> bool {
        true
    }
}

impl<F> Progress for F
where
    F: FnMut(f64) -> bool,
{
    #[inline]
    fn update(&mut self, fraction: f64) -> bool {
        self(fraction)
    }
}

/// Emits progress every `total / steps` iterations and converts a refusal
/// into [`GazeError::Cancelled`].
pub(crate) struct Throttle {
    every: usize,
    total: usize,
}

impl Throttle {
    pub(crate) fn new(total: usize, steps: usize) -> Self {
        Self {
            every: (total / steps.max(1)).max(1),
            total: total.max(1),
        }
    }

    pub(crate) fn tick(&self, i: usize, progress: &mut dyn Progress) -> Result<()> {
        if i % self.every == 0 && !progress.update((i + 1) as f64 / self.total as f64) {
            return Err(GazeError::Cancelled);
        }
        Ok(())
    }
}
