//! Error types for vocoder

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VocoderError {
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Numeric instability in {stage}: non-finite sample at index {index}")]
    NumericInstability { stage: String, index: usize },
    #[error("Write error: {0}")]
    Write(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl VocoderError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, VocoderError>;
