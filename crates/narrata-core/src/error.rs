//! Error types for the Narrata pipeline.


/// Result type alias for Narrata operations
pub type NarrataResult<T> = Result<T, NarrataError>;

/// Main error type for Narrata pipeline operations
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum NarrataError {
    /// The segmenter produced nothing speakable
    #[error("No speakable content in document")]
    NoContent,

    /// The synthesis backend failed
    #[error("Speech synthesis unavailable: {message}")]
    SynthesisUnavailable {
        /// Error message describing the backend failure
        message: String,
    },

    /// Audio buffers disagree on sample rate
    #[error("Sample rate mismatch: expected {expected} Hz, found {found} Hz")]
    SampleRateMismatch {
        /// Sample rate of the first buffer in the sequence
        expected: u32,
        /// Conflicting sample rate
        found: u32,
    },

    /// The assembler was given zero buffers
    #[error("No audio buffers to assemble")]
    EmptyInput,

    /// The render was cancelled between chunks
    #[error("Render cancelled")]
    Cancelled,

    /// Invalid input error
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// Error message describing the invalid input
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigurationError {
        /// Error message describing the configuration issue
        message: String,
    },

    /// File I/O error
    #[error("File I/O error: {message}")]
    FileError {
        /// Error message describing the file operation failure
        message: String,
    },

    /// Network error
    #[error("Network error: {message}")]
    NetworkError {
        /// Error message describing the network issue
        message: String,
    },

    /// A story chapter could not be fetched
    #[error("Failed to fetch '{reference}': {message}")]
    FetchError {
        /// The chapter reference that failed
        reference: String,
        /// Error message describing the fetch failure
        message: String,
    },

    /// Audio encoding or decoding error
    #[error("Audio encoding error: {message}")]
    EncodingError {
        /// Error message describing the encoding issue
        message: String,
    },

    /// Timeout error
    #[error("Operation timed out: {message}")]
    TimeoutError {
        /// Error message describing the timeout
        message: String,
    },

    /// Voice not found error
    #[error("Voice '{voice_id}' not found")]
    VoiceNotFound {
        /// The voice ID that was not found
        voice_id: String,
    },
}

impl NarrataError {
    /// Create a new synthesis unavailable error
    #[must_use]
    pub fn synthesis_unavailable<S: Into<String>>(message: S) -> Self {
        Self::SynthesisUnavailable {
            message: message.into(),
        }
    }

    /// Create a new sample rate mismatch error
    #[must_use]
    pub const fn sample_rate_mismatch(expected: u32, found: u32) -> Self {
        Self::SampleRateMismatch { expected, found }
    }

    /// Create a new invalid input error
    #[must_use]
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    #[must_use]
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }

    /// Create a new file error
    #[must_use]
    pub fn file<S: Into<String>>(message: S) -> Self {
        Self::FileError {
            message: message.into(),
        }
    }

    /// Create a new network error
    #[must_use]
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::NetworkError {
            message: message.into(),
        }
    }

    /// Create a new fetch error for a chapter reference
    #[must_use]
    pub fn fetch<R: Into<String>, S: Into<String>>(reference: R, message: S) -> Self {
        Self::FetchError {
            reference: reference.into(),
            message: message.into(),
        }
    }

    /// Create a new encoding error
    #[must_use]
    pub fn encoding<S: Into<String>>(message: S) -> Self {
        Self::EncodingError {
            message: message.into(),
        }
    }

    /// Create a new timeout error
    #[must_use]
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        Self::TimeoutError {
            message: message.into(),
        }
    }

    /// Create a new voice not found error
    #[must_use]
    pub fn voice_not_found<S: Into<String>>(voice_id: S) -> Self {
        Self::VoiceNotFound {
            voice_id: voice_id.into(),
        }
    }

    /// Check if this error is retriable
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::NetworkError { .. }
                | Self::TimeoutError { .. }
                | Self::SynthesisUnavailable { .. }
        )
    }

    /// Check if this error is due to invalid user input
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput { .. }
                | Self::ConfigurationError { .. }
                | Self::VoiceNotFound { .. }
        )
    }

    /// Get the error category for logging/metrics
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::NoContent => "content",
            Self::SynthesisUnavailable { .. } => "synthesis",
            Self::SampleRateMismatch { .. } => "sample_rate",
            Self::EmptyInput => "assembly",
            Self::Cancelled => "cancelled",
            Self::InvalidInput { .. } => "input",
            Self::ConfigurationError { .. } => "configuration",
            Self::FileError { .. } => "file",
            Self::NetworkError { .. } => "network",
            Self::FetchError { .. } => "fetch",
            Self::EncodingError { .. } => "encoding",
            Self::TimeoutError { .. } => "timeout",
            Self::VoiceNotFound { .. } => "voice",
        }
    }
}

// Convert from common error types
impl From<std::io::Error> for NarrataError {
    fn from(err: std::io::Error) -> Self {
        Self::file(err.to_string())
    }
}

impl From<tokio::time::error::Elapsed> for NarrataError {
    fn from(err: tokio::time::error::Elapsed) -> Self {
        Self::timeout(format!("Operation timed out: {err}"))
    }
}

impl From<serde_json::Error> for NarrataError {
    fn from(err: serde_json::Error) -> Self {
        Self::file(format!("JSON serialization error: {err}"))
    }
}

impl From<reqwest::Error> for NarrataError {
    fn from(err: reqwest::Error) -> Self {
        Self::network(err.to_string())
    }
}

impl From<hound::Error> for NarrataError {
    fn from(err: hound::Error) -> Self {
        Self::encoding(err.to_string())
    }
}

impl From<anyhow::Error> for NarrataError {
    fn from(err: anyhow::Error) -> Self {
        Self::synthesis_unavailable(err.to_string())
    }
}
