//! Error types for the analysis pipeline.
//!
//! Runtime analysis never fails: degenerate frequency ranges yield zero energy
//! and a saturated tempo history keeps the previous estimate. Errors only come
//! from acquiring an input, decoding a file or loading configuration.

/// Result type alias for analysis operations.
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Error type for input acquisition, decoding and configuration.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// Microphone permission denied, no device, or a file that cannot be opened
    #[error("Input unavailable: {0}")]
    InputUnavailable(String),

    /// Configuration that would make analysis meaningless
    #[error("Degenerate configuration: {0}")]
    DegenerateConfiguration(String),

    /// Audio file could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration or report (de)serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WAV reader error
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
}
