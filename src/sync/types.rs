use serde::Serialize;

/// One row of the motion-vector table delivered by the decoder:
/// `[source, w, h, src_x, src_y, dst_x, dst_y, motion_x, motion_y, motion_scale]`.
pub type MotionVector = [i64; 10];

/// Validity of a single record in a frame packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameStatus {
    /// The frame was decoded successfully; all payload fields are populated.
    Okay,
    /// Placeholder inserted when the source had no newer frame at assembly time.
    Dropped,
    /// The reader failed to obtain this frame from a still-live source.
    /// Consumed internally, never emitted in a packet.
    ReadError,
    /// The source has been retired; no reader is feeding its buffer.
    CapBroken,
}

impl FrameStatus {
    /// Wire-style status name, as exposed to host-language bindings.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Okay => "FRAME_OKAY",
            Self::Dropped => "FRAME_DROPPED",
            Self::ReadError => "FRAME_READ_ERROR",
            Self::CapBroken => "CAP_BROKEN",
        }
    }
}

/// A single decoded frame plus metadata and status.
///
/// Only `status == Okay` guarantees the payload fields are meaningful;
/// placeholder records carry timestamp 0.0 and empty buffers.
#[derive(Debug, Clone)]
pub struct FrameRecord {
    pub status: FrameStatus,
    /// Wall-clock capture time in seconds (NTP-derived).
    pub timestamp: f64,
    /// Raw pixel data, `width * height * 3` bytes (8-bit BGR/RGB).
    pub pixels: Vec<u8>,
    pub width: i32,
    pub height: i32,
    pub motion_vectors: Vec<MotionVector>,
    /// Picture type reported by the decoder: `I`, `P`, `B` or `?`.
    pub frame_type: char,
}

impl FrameRecord {
    fn placeholder(status: FrameStatus) -> Self {
        Self {
            status,
            timestamp: 0.0,
            pixels: Vec::new(),
            width: 0,
            height: 0,
            motion_vectors: Vec::new(),
            frame_type: '?',
        }
    }

    /// Placeholder for a source that had no frame at or before the
    /// alignment timestamp.
    pub fn dropped() -> Self {
        Self::placeholder(FrameStatus::Dropped)
    }

    /// Placeholder pushed by a reader when a read fails.
    pub fn read_error() -> Self {
        Self::placeholder(FrameStatus::ReadError)
    }

    /// Placeholder for a retired source.
    pub fn cap_broken() -> Self {
        Self::placeholder(FrameStatus::CapBroken)
    }

    /// Whether the payload fields of this record are valid.
    pub fn is_okay(&self) -> bool {
        self.status == FrameStatus::Okay
    }
}

/// Cheap value copy of the fields the assembler inspects when peeking a
/// queue. Independent of later pops on the same queue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameMeta {
    pub status: FrameStatus,
    pub timestamp: f64,
}

/// One synchronized group of frames, one record per source, indexed by
/// source id. Length always equals the number of configured sources.
pub type FramePacket = Vec<FrameRecord>;
