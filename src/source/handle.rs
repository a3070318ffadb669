use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::capture::{CapturedFrame, ReadError, VideoCapture};

/// Shared liveness flag for one source.
///
/// Written by exactly one reader thread and read lock-free everywhere
/// else. The transition is monotonic (valid to invalid, never back), so a
/// stale read is always safe.
#[derive(Debug)]
pub struct Validity {
    valid: AtomicBool,
}

impl Validity {
    pub(crate) fn new() -> Self {
        Self {
            valid: AtomicBool::new(true),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Relaxed)
    }

    pub fn mark_invalid(&self) {
        self.valid.store(false, Ordering::Relaxed);
    }
}

/// A capture device paired with its liveness flag.
///
/// The handle moves into its reader thread; only the [`Validity`] is
/// shared with the assembler and the facade.
pub struct SourceHandle {
    capture: Box<dyn VideoCapture>,
    validity: Arc<Validity>,
    released: bool,
}

impl SourceHandle {
    pub fn new(capture: Box<dyn VideoCapture>) -> Self {
        Self {
            capture,
            validity: Arc::new(Validity::new()),
            released: false,
        }
    }

    /// Clone of the shared liveness flag.
    pub fn validity(&self) -> Arc<Validity> {
        Arc::clone(&self.validity)
    }

    pub fn open(&mut self, url: &str) -> bool {
        self.capture.open(url)
    }

    pub fn read(&mut self) -> Result<CapturedFrame<'_>, ReadError> {
        self.capture.read()
    }

    pub fn is_valid(&self) -> bool {
        self.validity.is_valid()
    }

    pub fn mark_invalid(&self) {
        self.validity.mark_invalid();
    }

    /// Close the underlying device. Idempotent; also runs on drop.
    pub fn release(&mut self) {
        if !self.released {
            self.capture.release();
            self.released = true;
        }
    }
}

impl Drop for SourceHandle {
    fn drop(&mut self) {
        self.release();
    }
}
