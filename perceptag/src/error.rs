use std::io;

/// Errors raised while loading data, extracting features or training.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The tagset has no labels, so no tag can ever be predicted.
    #[error("invalid tagset: at least one tag is required")]
    EmptyTagset,
    /// A token position outside of its sentence was passed to the feature extractor.
    #[error("token index {index} is out of bounds for a sentence of {len} tokens")]
    IndexOutOfBounds { index: usize, len: usize },
    /// A corpus or features file line could not be parsed.
    #[error("malformed record at line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
