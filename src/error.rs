use thiserror::Error;

/// Fatal errors. Any of these aborts the run before (or instead of)
/// processing candidates.
#[derive(Error, Debug)]
pub enum SweepError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid window size {0} - must be >= 1 and <= 28")]
    WindowSize(u32),

    #[error("not enough memory for window size {window}: needs {required_kib} KiB to build, system has {total_kib} KiB")]
    MemoryCeiling {
        window: u32,
        required_kib: u64,
        total_kib: u64,
    },

    #[error("bad ecmult table file: {0}")]
    TableFormat(String),

    #[error("bad bloom filter file: {0}")]
    FilterFormat(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SweepError>;

/// Per-candidate errors. These are counted and skipped; they never
/// terminate the stream and never appear on the match output.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CandidateError {
    #[error("invalid hex input")]
    InvalidHex,

    #[error("input exceeds decode buffer")]
    OversizedInput,

    #[error("scalar is zero or not below the curve order")]
    ScalarOutOfRange,

    #[error("kdf failure: {0}")]
    Kdf(String),
}
