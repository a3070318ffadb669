use serde::Serialize;
use std::time::Instant;

/// Ingest counters for a single source, updated by its reader thread.
pub struct IngestStats {
    frame_count: u64,
    read_error_count: u64,
    total_bytes: u64,
    start_time: Instant,
    last_timestamp: Option<f64>,
}

/// Snapshot of one source's ingest counters for IPC serialisation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestSnapshot {
    pub fps: f64,
    pub frame_count: u64,
    pub read_error_count: u64,
    pub bandwidth_bps: u64,
    /// Wall-clock timestamp of the newest decoded frame, if any.
    pub last_timestamp: Option<f64>,
}

impl IngestStats {
    /// Create new stats with zeroed counters.
    pub fn new() -> Self {
        Self {
            frame_count: 0,
            read_error_count: 0,
            total_bytes: 0,
            start_time: Instant::now(),
            last_timestamp: None,
        }
    }

    /// Record a successfully decoded frame.
    pub fn record_frame(&mut self, bytes: usize, timestamp: f64) {
        self.frame_count += 1;
        self.total_bytes += bytes as u64;
        self.last_timestamp = Some(timestamp);
    }

    /// Record a failed read.
    pub fn record_read_error(&mut self) {
        self.read_error_count += 1;
    }

    /// Decoded frames per second since the reader started.
    pub fn fps(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed < 0.001 {
            return 0.0;
        }
        self.frame_count as f64 / elapsed
    }

    /// Decoded bandwidth in bytes per second.
    pub fn bandwidth_bps(&self) -> u64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed < 0.001 {
            return 0;
        }
        (self.total_bytes as f64 / elapsed) as u64
    }

    /// Take a serialisable snapshot.
    pub fn snapshot(&self) -> IngestSnapshot {
        IngestSnapshot {
            fps: self.fps(),
            frame_count: self.frame_count,
            read_error_count: self.read_error_count,
            bandwidth_bps: self.bandwidth_bps(),
            last_timestamp: self.last_timestamp,
        }
    }
}

impl Default for IngestStats {
    fn default() -> Self {
        Self::new()
    }
}

/// State of one source as seen by the facade.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSnapshot {
    pub source_id: usize,
    pub valid: bool,
    pub queue_len: usize,
    pub ingest: IngestSnapshot,
}

/// Whole-pipeline snapshot: one entry per source plus output counters.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSnapshot {
    pub sources: Vec<SourceSnapshot>,
    pub packets_emitted: u64,
    pub packets_dropped: u64,
    pub output_len: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn initialises_with_zero_values() {
        let stats = IngestStats::new();
        assert_eq!(stats.frame_count, 0);
        assert_eq!(stats.read_error_count, 0);
        assert_eq!(stats.total_bytes, 0);
        assert!(stats.last_timestamp.is_none());
    }

    #[test]
    fn record_frame_tracks_count_and_timestamp() {
        let mut stats = IngestStats::new();
        stats.record_frame(1000, 17.5);
        stats.record_frame(1000, 18.0);
        assert_eq!(stats.frame_count, 2);
        assert_eq!(stats.total_bytes, 2000);
        assert_eq!(stats.last_timestamp, Some(18.0));
    }

    #[test]
    fn record_read_error_increments_error_count() {
        let mut stats = IngestStats::new();
        stats.record_read_error();
        stats.record_read_error();
        assert_eq!(stats.read_error_count, 2);
    }

    #[test]
    fn fps_is_positive_after_frames_arrive() {
        let mut stats = IngestStats::new();
        for i in 0..30 {
            stats.record_frame(1000, f64::from(i));
        }
        thread::sleep(Duration::from_millis(50));
        let fps = stats.fps();
        assert!(fps > 0.0, "fps should be positive, got {fps}");
    }

    #[test]
    fn bandwidth_bps_tracks_bytes() {
        let mut stats = IngestStats::new();
        stats.record_frame(10_000, 1.0);
        thread::sleep(Duration::from_millis(50));
        let bps = stats.bandwidth_bps();
        assert!(bps > 0, "bandwidth should be positive, got {bps}");
    }

    #[test]
    fn snapshot_produces_serialisable_data() {
        let mut stats = IngestStats::new();
        stats.record_frame(5000, 2.5);
        let snap = stats.snapshot();
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["frameCount"], 1);
        assert_eq!(json["readErrorCount"], 0);
        assert_eq!(json["lastTimestamp"], 2.5);
    }

    #[test]
    fn pipeline_snapshot_serialises_to_camel_case() {
        let snap = PipelineSnapshot {
            sources: vec![SourceSnapshot {
                source_id: 0,
                valid: true,
                queue_len: 3,
                ingest: IngestStats::new().snapshot(),
            }],
            packets_emitted: 10,
            packets_dropped: 2,
            output_len: 1,
        };
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["sources"][0]["sourceId"], 0);
        assert_eq!(json["sources"][0]["queueLen"], 3);
        assert_eq!(json["packetsEmitted"], 10);
        assert_eq!(json["packetsDropped"], 2);
    }
}
