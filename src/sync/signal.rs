use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Condvar, Mutex};

/// Shared wake-up channel from the readers to the assembler.
///
/// Readers call `notify` after every queue push; the assembler parks in
/// `wait_until` between pipeline steps. `notify` takes the internal mutex
/// before waking, so a notification cannot slip between the assembler's
/// predicate check and its wait.
#[derive(Debug, Default)]
pub struct ProgressSignal {
    lock: Mutex<()>,
    cond: Condvar,
}

impl ProgressSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wake every waiter.
    pub fn notify(&self) {
        let _guard = self.lock.lock();
        self.cond.notify_all();
    }

    /// Block until `ready` returns true. Returns `false` if `stop` was
    /// raised first; the predicate is re-evaluated after every wake-up.
    pub fn wait_until(&self, stop: &AtomicBool, mut ready: impl FnMut() -> bool) -> bool {
        let mut guard = self.lock.lock();
        loop {
            if stop.load(Ordering::Relaxed) {
                return false;
            }
            if ready() {
                return true;
            }
            self.cond.wait(&mut guard);
        }
    }
}
