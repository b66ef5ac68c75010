use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrajError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("unsupported: {0}")]
    Unsupported(String),
    #[error("mismatch: {0}")]
    Mismatch(String),
    #[error("invalid selection: {0}")]
    InvalidSelection(String),
    #[error("invalid: {0}")]
    Invalid(String),
    #[error("frame index {index} out of range for trajectory with {n_frames} frames")]
    OutOfRange { index: usize, n_frames: usize },
    #[error("numerical error: {message} (info={info})")]
    Numerical { message: String, info: i32 },
}

pub type TrajResult<T> = Result<T, TrajError>;
