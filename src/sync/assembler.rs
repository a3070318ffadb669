use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, info, trace};

use super::error::SyncError;
use super::packet_buffer::PacketBuffer;
use super::queue::FrameQueue;
use super::signal::ProgressSignal;
use super::types::{FramePacket, FrameRecord, FrameStatus};
use crate::source::handle::Validity;

/// The synchronization task: repeatedly selects an alignment timestamp,
/// waits for every live source to cross it, and emits one packet with the
/// closest frame from each source.
pub(crate) struct Assembler {
    pub queues: Vec<Arc<FrameQueue>>,
    pub validity: Vec<Arc<Validity>>,
    pub signal: Arc<ProgressSignal>,
    pub stop: Arc<AtomicBool>,
    pub output: Arc<PacketBuffer>,
    pub max_initial_stream_offset: f64,
    /// Fatal startup error, handed to the consumer through the facade.
    pub fatal: Arc<Mutex<Option<SyncError>>>,
}

impl Assembler {
    pub(crate) fn run(self) {
        match self.synchronize() {
            Err(SyncError::ShutDown) => debug!("assembler exiting"),
            Err(err) => {
                error!("stream synchronization failed: {err}");
                *self.fatal.lock() = Some(err);
            }
            Ok(()) => {}
        }
        // Wake any consumer blocked on the output buffer.
        self.output.close();
    }

    fn synchronize(&self) -> Result<(), SyncError> {
        self.startup()?;

        loop {
            // Every valid source must have at least one record queued.
            if !self.signal.wait_until(&self.stop, || {
                self.min_buffer_len().is_some_and(|len| len > 0)
            }) {
                return Err(SyncError::ShutDown);
            }

            trace!("frame buffer sizes: {:?}", self.buffer_sizes());

            let Some((alignment, anchor)) = self.pick_alignment() else {
                // No valid source has a decodable front; consume the
                // placeholders and wait for fresh frames.
                self.discard_unusable_fronts();
                continue;
            };

            // Each source needs a frame at or past the alignment instant
            // before assembly can finish without blocking. Sources retired
            // while we wait satisfy the predicate by dropping out of it.
            if !self.signal.wait_until(&self.stop, || {
                self.all_sources_caught_up(alignment)
            }) {
                return Err(SyncError::ShutDown);
            }

            let packet = self.assemble(alignment, anchor);
            self.output.push(packet);
        }
    }

    /// Wait for the first frame of every live source, then verify the
    /// streams start close enough together to be synchronized at all.
    fn startup(&self) -> Result<(), SyncError> {
        debug!("waiting for every stream to deliver its first frame");
        // Trivially satisfied when every source is already retired; the
        // offset check below then reports the empty pipeline.
        if !self.signal.wait_until(&self.stop, || self.min_buffer_len() != Some(0)) {
            return Err(SyncError::ShutDown);
        }

        let offset = self
            .initial_offset()
            .ok_or(SyncError::NoStreamsAvailable)?;
        if offset > self.max_initial_stream_offset {
            return Err(SyncError::OffsetTooLarge {
                measured: offset,
                limit: self.max_initial_stream_offset,
            });
        }
        info!("streams aligned within {offset:.3}s at startup");
        Ok(())
    }

    /// Spread between the oldest timestamps of all valid queues, or `None`
    /// when no valid source has produced a record.
    fn initial_offset(&self) -> Option<f64> {
        let timestamps: Vec<f64> = self
            .valid_sources()
            .filter_map(|id| self.queues[id].front_meta())
            .map(|meta| meta.timestamp)
            .collect();
        let min = timestamps.iter().copied().reduce(f64::min)?;
        let max = timestamps.iter().copied().reduce(f64::max)?;
        Some(max - min)
    }

    fn valid_sources(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.queues.len()).filter(|&id| self.validity[id].is_valid())
    }

    /// Shortest valid queue, or `None` when every source is retired.
    fn min_buffer_len(&self) -> Option<usize> {
        self.valid_sources().map(|id| self.queues[id].len()).min()
    }

    fn buffer_sizes(&self) -> Vec<usize> {
        self.queues.iter().map(|queue| queue.len()).collect()
    }

    /// The alignment timestamp and its anchor source: the most recent of
    /// the oldest decodable timestamps across valid sources. Sources whose
    /// front is not `Okay` count as oldest (0.0) so their placeholders get
    /// consumed first; ties go to the highest source id. Returns `None`
    /// when no valid source has an `Okay` front to anchor on.
    fn pick_alignment(&self) -> Option<(f64, usize)> {
        let mut best: Option<(f64, usize, bool)> = None;
        for id in self.valid_sources() {
            let (timestamp, decodable) = match self.queues[id].front_meta() {
                Some(meta) if meta.status == FrameStatus::Okay => (meta.timestamp, true),
                _ => (0.0, false),
            };
            match best {
                Some((best_ts, _, _)) if timestamp < best_ts => {}
                _ => best = Some((timestamp, id, decodable)),
            }
        }
        let (alignment, anchor, decodable) = best?;
        decodable.then_some((alignment, anchor))
    }

    /// Drop the non-`Okay` fronts that blocked alignment selection.
    fn discard_unusable_fronts(&self) {
        for id in self.valid_sources() {
            if self.queues[id]
                .front_meta()
                .is_some_and(|meta| meta.status != FrameStatus::Okay)
            {
                self.queues[id].pop_front();
            }
        }
    }

    /// Whether every valid source's newest record has reached the
    /// alignment timestamp. Retired sources are treated as satisfied.
    fn all_sources_caught_up(&self, alignment: f64) -> bool {
        self.valid_sources().all(|id| {
            self.queues[id]
                .back_meta()
                .is_some_and(|meta| meta.timestamp >= alignment)
        })
    }

    /// Build one packet: the anchor contributes its front, every other
    /// live source advances to the latest frame at or before the alignment
    /// timestamp, and retired sources contribute placeholders.
    fn assemble(&self, alignment: f64, anchor: usize) -> FramePacket {
        let mut packet = FramePacket::with_capacity(self.queues.len());
        for id in 0..self.queues.len() {
            if !self.validity[id].is_valid() {
                packet.push(FrameRecord::cap_broken());
            } else if id == anchor {
                packet.push(self.queues[id].pop_front().unwrap_or_else(FrameRecord::dropped));
            } else {
                packet.push(self.catch_up(id, alignment));
            }
        }
        packet
    }

    /// Advance one non-anchor queue to the alignment timestamp. Non-`Okay`
    /// fronts are discarded; every `Okay` front at or before the alignment
    /// replaces the current candidate, which frees the superseded frame;
    /// the first newer front stays queued for future packets. The `<=` is
    /// load-bearing: a front exactly at the alignment timestamp is the
    /// correct pairing and must be taken, not left behind.
    fn catch_up(&self, id: usize, alignment: f64) -> FrameRecord {
        let queue = &self.queues[id];
        let mut chosen: Option<FrameRecord> = None;
        loop {
            match queue.front_meta() {
                Some(meta) if meta.status != FrameStatus::Okay => {
                    queue.pop_front();
                }
                Some(meta) if meta.timestamp <= alignment => {
                    chosen = queue.pop_front();
                }
                _ => return chosen.unwrap_or_else(FrameRecord::dropped),
            }
        }
    }
}
