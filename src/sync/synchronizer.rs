use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::Mutex;
use tracing::{info, warn};

use super::assembler::Assembler;
use super::error::{Result, SyncError};
use super::packet_buffer::PacketBuffer;
use super::queue::FrameQueue;
use super::reader::Reader;
use super::signal::ProgressSignal;
use super::types::FramePacket;
use crate::config::SyncConfig;
use crate::diagnostics::{IngestStats, PipelineSnapshot, SourceSnapshot};
use crate::source::capture::VideoCapture;
use crate::source::handle::{SourceHandle, Validity};

/// The synchronization engine.
///
/// Owns one reader thread per source plus the assembler thread, and hands
/// synchronized frame packets to the consumer through a bounded buffer.
/// Dropping the synchronizer stops and joins every thread; a source
/// blocked inside a read delays shutdown until that read returns.
pub struct Synchronizer {
    queues: Vec<Arc<FrameQueue>>,
    validity: Vec<Arc<Validity>>,
    stats: Vec<Arc<Mutex<IngestStats>>>,
    output: Arc<PacketBuffer>,
    signal: Arc<ProgressSignal>,
    stop: Arc<AtomicBool>,
    fatal: Arc<Mutex<Option<SyncError>>>,
    threads: Vec<JoinHandle<()>>,
}

impl Synchronizer {
    /// Open every configured source and launch the pipeline.
    ///
    /// `make_capture` builds the capture device for each source URL. A
    /// source that fails to open is retired on the spot and contributes
    /// `CapBroken` records; only an invalid configuration fails `new`
    /// itself. Startup problems the assembler detects (offset too large,
    /// no streams at all) surface from [`get_frame_packet`](Self::get_frame_packet).
    pub fn new(
        config: SyncConfig,
        mut make_capture: impl FnMut(&str) -> Box<dyn VideoCapture>,
    ) -> Result<Self> {
        config.validate()?;

        let signal = Arc::new(ProgressSignal::new());
        let stop = Arc::new(AtomicBool::new(false));
        let output = Arc::new(PacketBuffer::new(config.output_capacity));
        let fatal = Arc::new(Mutex::new(None));

        let mut handles = Vec::with_capacity(config.sources.len());
        let mut validity = Vec::with_capacity(config.sources.len());
        let mut queues = Vec::with_capacity(config.sources.len());
        let mut stats = Vec::with_capacity(config.sources.len());

        for (id, url) in config.sources.iter().enumerate() {
            let mut handle = SourceHandle::new(make_capture(url));
            if handle.open(url) {
                info!("opened stream {id}");
            } else {
                handle.mark_invalid();
                warn!("failed to open stream {id} ({url})");
            }
            validity.push(handle.validity());
            queues.push(Arc::new(FrameQueue::new()));
            stats.push(Arc::new(Mutex::new(IngestStats::new())));
            handles.push(handle);
        }

        let mut threads = Vec::with_capacity(handles.len() + 1);
        for (id, handle) in handles.into_iter().enumerate() {
            let reader = Reader {
                source_id: id,
                handle,
                queue: Arc::clone(&queues[id]),
                signal: Arc::clone(&signal),
                stop: Arc::clone(&stop),
                stats: Arc::clone(&stats[id]),
                max_read_errors: config.max_read_errors,
            };
            threads.push(
                std::thread::Builder::new()
                    .name(format!("reader-{id}"))
                    .spawn(move || reader.run())
                    .expect("failed to spawn reader thread"),
            );
        }

        let assembler = Assembler {
            queues: queues.clone(),
            validity: validity.clone(),
            signal: Arc::clone(&signal),
            stop: Arc::clone(&stop),
            output: Arc::clone(&output),
            max_initial_stream_offset: config.max_initial_stream_offset,
            fatal: Arc::clone(&fatal),
        };
        threads.push(
            std::thread::Builder::new()
                .name("assembler".to_string())
                .spawn(move || assembler.run())
                .expect("failed to spawn assembler thread"),
        );

        Ok(Self {
            queues,
            validity,
            stats,
            output,
            signal,
            stop,
            fatal,
            threads,
        })
    }

    /// Block until the next synchronized frame packet is available.
    ///
    /// Ownership of every buffer in the packet transfers to the caller.
    /// Returns the fatal startup error once the pipeline has aborted.
    pub fn get_frame_packet(&self) -> Result<FramePacket> {
        match self.output.pop() {
            Some(packet) => Ok(packet),
            None => Err(self.fatal.lock().clone().unwrap_or(SyncError::ShutDown)),
        }
    }

    /// Number of configured sources; every packet has this many records.
    pub fn source_count(&self) -> usize {
        self.queues.len()
    }

    /// Whether the source is still live. Retirement is permanent.
    pub fn is_source_valid(&self, source_id: usize) -> bool {
        self.validity
            .get(source_id)
            .is_some_and(|validity| validity.is_valid())
    }

    /// Snapshot of per-source ingest counters and output-buffer state.
    pub fn diagnostics(&self) -> PipelineSnapshot {
        PipelineSnapshot {
            sources: (0..self.queues.len())
                .map(|id| SourceSnapshot {
                    source_id: id,
                    valid: self.validity[id].is_valid(),
                    queue_len: self.queues[id].len(),
                    ingest: self.stats[id].lock().snapshot(),
                })
                .collect(),
            packets_emitted: self.output.pushed(),
            packets_dropped: self.output.dropped(),
            output_len: self.output.len(),
        }
    }
}

impl Drop for Synchronizer {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        self.signal.notify();
        self.output.close();
        for handle in self.threads.drain(..) {
            let _ = handle.join();
        }
    }
}
