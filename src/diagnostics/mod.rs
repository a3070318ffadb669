// Pipeline observability: ingest counters and serialisable snapshots.

pub mod stats;

pub use stats::{IngestSnapshot, IngestStats, PipelineSnapshot, SourceSnapshot};
