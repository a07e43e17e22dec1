use thiserror::Error;

pub type ChartResult<T> = Result<T, ChartError>;

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("index out of bounds: index={index}, len={len}")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Broken internal invariant; not recoverable by the caller.
    #[error("internal invariant violated: {0}")]
    Internal(String),
}

impl ChartError {
    pub(crate) fn check_index(index: usize, len: usize) -> ChartResult<()> {
        if index < len {
            Ok(())
        } else {
            Err(Self::IndexOutOfBounds { index, len })
        }
    }
}
