pub type TextBufferResult<T> = Result<T, TextBufferError>;

#[derive(Debug, thiserror::Error)]
pub enum TextBufferError {
    /// An argument that is malformed for the operation, such as an
    /// `EditResult` whose newline offsets fall outside its inserted range.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    /// `offset` (or the end of `offset + length`) lies outside `0..=len`.
    #[error("offset {offset} is out of range for a document of {len} bytes")]
    OffsetOutOfRange { offset: u64, len: u64 },

    #[error("line {line} is out of range for a document of {count} lines")]
    LineOutOfRange { line: usize, count: usize },

    /// The add buffer (or its newline table) could not grow.
    #[error("failed to grow the add buffer: {0}")]
    AllocationFailed(#[from] std::collections::TryReserveError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("integer conversion failed: {0}")]
    Conversion(#[from] std::num::TryFromIntError),

    #[error("arithmetic overflow")]
    Overflow,
}
