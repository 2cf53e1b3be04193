//! Error types for the text2beep library

use std::io;

/// Library error type for text2beep operations
#[derive(Debug, thiserror::Error)]
pub enum BeepError {
    /// Note token not matching the notation grammar, or a tie joining different pitches
    #[error("Invalid note: {0}")]
    MalformedNote(String),

    /// Misuse of the synthesizer buffer (append to a full track, early flush)
    #[error("invalid buffer operation: {0}")]
    InvalidBufferOperation(String),

    /// Sheet could not be loaded
    #[error("sheet error: {0}")]
    SheetError(String),

    /// Audio-related error
    #[error("audio error: {0}")]
    AudioError(String),

    /// The other end of a handoff channel is gone
    #[error("channel closed: {0}")]
    ChannelClosed(String),

    /// Run stopped through its interrupt handle
    #[error("synthesis interrupted")]
    Interrupted,

    /// A synthesizer worker thread panicked
    #[error("worker panicked: {0}")]
    WorkerPanicked(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(String),
}

impl From<io::Error> for BeepError {
    fn from(error: io::Error) -> Self {
        Self::IoError(error.to_string())
    }
}
