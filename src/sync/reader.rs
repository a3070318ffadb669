use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, warn};

use super::queue::FrameQueue;
use super::signal::ProgressSignal;
use super::types::{FrameRecord, FrameStatus};
use crate::diagnostics::IngestStats;
use crate::source::handle::SourceHandle;

/// How long a reader idles between stop-flag checks once its source is
/// retired.
const RETIRED_IDLE: Duration = Duration::from_millis(100);

/// Per-source ingest task: pumps decoded frames from one capture device
/// into one queue, counting consecutive read errors and retiring the
/// source at the configured threshold.
pub(crate) struct Reader {
    pub source_id: usize,
    pub handle: SourceHandle,
    pub queue: Arc<FrameQueue>,
    pub signal: Arc<ProgressSignal>,
    pub stop: Arc<AtomicBool>,
    pub stats: Arc<Mutex<IngestStats>>,
    pub max_read_errors: u32,
}

impl Reader {
    pub(crate) fn run(mut self) {
        let mut consecutive_errors = 0u32;

        while !self.stop.load(Ordering::Relaxed) {
            if !self.handle.is_valid() {
                // A retired source stays retired; this is idle, not recovery.
                thread::sleep(RETIRED_IDLE);
                continue;
            }

            // The capture may reuse its pixel buffer between reads, so the
            // record takes a fresh copy; the motion-vector table is a fresh
            // allocation per read and transfers as-is.
            let outcome = self.handle.read().map(|frame| FrameRecord {
                status: FrameStatus::Okay,
                timestamp: frame.timestamp,
                pixels: frame.pixels.to_vec(),
                width: frame.width,
                height: frame.height,
                motion_vectors: frame.motion_vectors,
                frame_type: frame.frame_type,
            });

            let record = match outcome {
                Ok(record) => {
                    consecutive_errors = 0;
                    self.stats
                        .lock()
                        .record_frame(record.pixels.len(), record.timestamp);
                    record
                }
                Err(err) => {
                    consecutive_errors += 1;
                    warn!(
                        "could not read the next frame from stream {}: {err}",
                        self.source_id
                    );
                    self.stats.lock().record_read_error();
                    if consecutive_errors >= self.max_read_errors {
                        self.handle.mark_invalid();
                        warn!(
                            "stream {} retired after {consecutive_errors} consecutive read errors",
                            self.source_id
                        );
                    }
                    // An error record keeps the queue non-empty so the
                    // assembler can observe liveness; it is discarded during
                    // catch-up and never emitted.
                    FrameRecord::read_error()
                }
            };

            self.queue.push(record);
            self.signal.notify();
        }

        self.handle.release();
        debug!("reader for stream {} exiting", self.source_id);
    }
}
