use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("probe read timeout")]
    Timeout,
    #[error("probe disconnected: {0}")]
    Disconnected(String),
    #[error("scripted probe exhausted after {0} readings")]
    Exhausted(usize),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl HwError {
    /// Transient failures worth retrying within the same sample period.
    pub fn is_transient(&self) -> bool {
        matches!(self, HwError::Timeout)
    }
}

pub type Result<T> = std::result::Result<T, HwError>;
