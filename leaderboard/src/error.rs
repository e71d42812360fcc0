use thiserror::Error;

/// Failure talking to the ranking/identity store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store snapshot (de)serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// The announcement scheduler would not take the job.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("announcement queue is closed")]
    Closed,

    #[error("announcement rejected: {0}")]
    Rejected(String),
}

/// Why a session log replay did not support the claimed score.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReplayError {
    #[error("unsupported session log version: {0}")]
    UnsupportedVersion(u32),

    #[error("too many events: {count} (max {max})")]
    TooManyEvents { count: usize, max: u32 },

    #[error("too many paddle frames: {count} (max {max})")]
    TooManyFrames { count: u64, max: u64 },

    #[error("power factor {factor} out of range (max {max})")]
    PowerFactorOutOfRange { factor: u32, max: u32 },

    #[error("claimed score {claimed} exceeds replayed score {replayed}")]
    ScoreMismatch { claimed: u64, replayed: u64 },

    #[error("submitted score {submitted} does not match session log claim {claimed}")]
    ClaimMismatch { submitted: u64, claimed: u64 },
}

#[derive(Debug, Error)]
pub enum LeaderboardError {
    #[error(transparent)]
    StoreUnavailable(#[from] StoreError),

    /// One id in a batched lookup had no display name
    #[error("no display name recorded for {stable_id}")]
    IdentityResolutionFailed { stable_id: String },

    #[error("invalid submission: {0}")]
    InvalidSubmission(String),

    #[error("session replay rejected: {0}")]
    ReplayRejected(#[from] ReplayError),
}
