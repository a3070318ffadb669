//! Synchronizes multiple live video streams based on the wall-clock
//! timestamp of each decoded frame.
//!
//! N sources are pumped by one reader thread each into unbounded
//! per-source queues. The assembler thread repeatedly picks an alignment
//! timestamp (the most recent of the oldest decodable timestamps across
//! live sources), waits for every source to cross it, and emits a frame
//! packet holding the closest frame from each source. The consumer pulls
//! packets from a bounded buffer that drops the oldest packet on
//! overflow, so a slow consumer always sees fresh data.
//!
//! The actual decoding is behind the [`VideoCapture`] trait; the engine
//! handles clock skew, variable frame rates, dropped frames, transient
//! read errors and permanent source failures.

pub mod config;
pub mod diagnostics;
pub mod source;
pub mod sync;

pub use config::SyncConfig;
pub use diagnostics::PipelineSnapshot;
pub use source::capture::{CapturedFrame, ReadError, VideoCapture};
pub use source::scripted::{EndBehavior, ScriptControl, ScriptStep, ScriptedCapture};
pub use sync::error::SyncError;
pub use sync::synchronizer::Synchronizer;
pub use sync::types::{FrameMeta, FramePacket, FrameRecord, FrameStatus, MotionVector};
