use thiserror::Error;

/// Fatal synchronization errors.
///
/// Transient read failures are data (`FrameStatus::ReadError` records), not
/// errors; only conditions that terminate the pipeline appear here.
#[derive(Debug, Clone, Error)]
pub enum SyncError {
    #[error(
        "stream timestamps have a relative offset of {measured:.3}s, exceeding the maximum \
         allowed offset of {limit:.3}s; ensure all cameras use the same NTP server"
    )]
    OffsetTooLarge { measured: f64, limit: f64 },

    #[error("stream offset can not be computed: no stream produced a first frame")]
    NoStreamsAvailable,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("synchronizer is shut down")]
    ShutDown,
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, SyncError>;
