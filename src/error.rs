//! Crate-wide error type.

use thiserror::Error;

/// Errors surfaced by loading and by the control surface.
///
/// The render path itself never fails: once the frame count has been
/// validated, any inconsistency inside a voice produces silence from that
/// voice and the voice is marked done.
#[derive(Debug, Error)]
pub enum Error {
    /// Short read, unexpected tag, or mismatched container size during load.
    /// The file is never partially installed.
    #[error("malformed SoundFont: {0}")]
    Format(String),

    /// Underlying I/O failure while reading the file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An index passed through the control surface was out of range.
    #[error("index {index} out of range ({count} available)")]
    InvalidIndex { index: usize, count: usize },

    /// A render call asked for more frames than the configured maximum.
    /// No samples are produced.
    #[error("frame count {requested} exceeds configured maximum {max}")]
    CapacityExceeded { requested: usize, max: usize },
}

impl Error {
    pub(crate) fn format(msg: impl Into<String>) -> Self {
        Error::Format(msg.into())
    }
}
