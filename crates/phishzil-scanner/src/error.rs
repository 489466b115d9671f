use thiserror::Error;

/// Reasons a stage table is rejected before any timer is scheduled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StageTableError {
    #[error("stage table is empty")]
    Empty,

    #[error("last stage must be marked final")]
    MissingFinal,

    #[error("stage {index} is marked final but is not the last stage")]
    FinalNotLast { index: usize },

    #[error("stage {index} has progress target {value}, expected 0-100")]
    ProgressOutOfRange { index: usize, value: u8 },

    #[error("stage {index} lowers progress from {previous} to {value}")]
    ProgressDecreases {
        index: usize,
        previous: u8,
        value: u8,
    },
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("invalid stage table: {0}")]
    InvalidStageTable(#[from] StageTableError),

    #[error("scan sequencer requires a running tokio runtime: {0}")]
    NoRuntime(String),
}

pub type Result<T> = std::result::Result<T, ScanError>;
