use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the Wyoming client library.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("invalid JSON message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid WAV header")]
    InvalidWavHeader,

    #[error("only 16-bit audio is supported (got {0} bits per sample)")]
    UnsupportedBitsPerSample(u16),

    #[error("output file already exists: {0}")]
    OutputFileExists(PathBuf),

    #[error("unexpected response message type: {0:?}")]
    UnexpectedMessage(String),

    #[error("server does not offer text-to-speech")]
    TtsNotSupported,

    #[error("server does not offer speech recognition")]
    AsrNotSupported,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// True when the error means the audio stream ran out rather than failed.
    ///
    /// The transcription pipeline treats this class as "no more events".
    pub fn is_stream_end(&self) -> bool {
        matches!(self, Error::Io(err) if err.kind() == io::ErrorKind::UnexpectedEof)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
