//! Leafcheck error types

/// Leafcheck error types
#[derive(Debug, thiserror::Error)]
pub enum LeafError {
    // Input errors
    #[error("invalid image: {0}")]
    InvalidImage(String),

    // Gate (network) errors
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("empty response from gate model")]
    EmptyResponse,

    #[error("data error: {0}")]
    DataError(String),

    // Local model errors
    #[error("failed to load classifier model: {0}")]
    ModelLoad(String),

    /// The model failed to load at startup; every later classify fails fast
    /// with this instead of touching a missing model.
    #[error("classifier model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("classifier model has been released")]
    ModelReleased,

    #[error("classification failed: {0}")]
    Classification(String),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("no leaf gate configured")]
    NoGate,

    #[error("no classifier configured")]
    NoClassifier,
}

impl LeafError {
    /// Whether this error came out of the remote gate call.
    ///
    /// Gate failures are never surfaced: the pipeline treats them as a
    /// "not a leaf" verdict.
    pub fn is_gate_failure(&self) -> bool {
        matches!(
            self,
            Self::Http(_)
                | Self::Api { .. }
                | Self::Json(_)
                | Self::EmptyResponse
                | Self::DataError(_)
        )
    }

    /// Whether this error means the local model cannot run at all.
    pub fn is_model_failure(&self) -> bool {
        matches!(
            self,
            Self::ModelLoad(_) | Self::ModelUnavailable(_) | Self::ModelReleased
        )
    }
}

impl From<image::ImageError> for LeafError {
    fn from(err: image::ImageError) -> Self {
        LeafError::InvalidImage(err.to_string())
    }
}

/// Result type alias for Leafcheck operations
pub type Result<T> = std::result::Result<T, LeafError>;
