//! Cooperative progress reporting and cancellation.
//!
//! Long computations call [`Monitor::checkpoint`] at fixed points (once per
//! lattice round, every few thousand search candidates). A checkpoint reports
//! progress to the optional callback and then polls the [`CancelToken`];
//! nothing is preempted.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{MalcevError, Result};

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Clear the flag so the owner can run again
    pub fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Progress callback: `(fraction in [0,1], message)`.
pub type ProgressFn = Box<dyn FnMut(f64, &str) + Send>;

/// Progress sink plus cancellation poll, checked at checkpoints only.
#[derive(Default)]
pub struct Monitor {
    callback: Option<ProgressFn>,
    cancel: CancelToken,
    checkpoints: usize,
}

impl fmt::Debug for Monitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Monitor")
            .field("has_callback", &self.callback.is_some())
            .field("cancelled", &self.cancel.is_cancelled())
            .field("checkpoints", &self.checkpoints)
            .finish()
    }
}

impl Monitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback<F>(mut self, f: F) -> Self
    where
        F: FnMut(f64, &str) + Send + 'static,
    {
        self.callback = Some(Box::new(f));
        self
    }

    /// Observe an externally owned token instead of a private one.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn set_callback(&mut self, callback: ProgressFn) {
        self.callback = Some(callback);
    }

    /// A handle another thread can use to cancel this computation.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Number of checkpoints passed so far
    pub fn checkpoints(&self) -> usize {
        self.checkpoints
    }

    /// Report progress, then fail with `Cancelled` if cancellation was requested.
    pub fn checkpoint(&mut self, fraction: f64, message: &str) -> Result<()> {
        self.checkpoints += 1;
        if let Some(callback) = self.callback.as_mut() {
            callback(fraction.clamp(0.0, 1.0), message);
        }
        if self.cancel.is_cancelled() {
            return Err(MalcevError::Cancelled);
        }
        Ok(())
    }
}
