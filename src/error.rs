//! Error types for this crate.
//!
//! All fallible operations return [`Result<T>`] which uses [`AnalysisError`] as the error type.

use thiserror::Error;

/// A [`Result`](std::result::Result) alias using [`AnalysisError`] as the error type.
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// The unified error type for all crate errors.
///
/// # Example
///
/// ```rust
/// use candle_sentiment::error::AnalysisError;
///
/// fn status_for(e: &AnalysisError) -> u16 {
///     match e {
///         // Bad input - fix and resend
///         AnalysisError::Validation(_) => 400,
///         // Endpoint switched off in configuration
///         AnalysisError::FeatureDisabled(_) => 404,
///         // Model could not be loaded - next request retries the load
///         AnalysisError::ModelUnavailable(_) => 503,
///         // Model call failed for this input
///         AnalysisError::Inference(_) => 500,
///     }
/// }
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Input rejected before any model was invoked.
    #[error("{0}")]
    Validation(String),

    /// The requested capability is switched off.
    #[error("{0}")]
    FeatureDisabled(String),

    /// Model download or initialisation failed. Not cached; retried on next use.
    #[error("{0}")]
    ModelUnavailable(String),

    /// Runtime failure inside a model call.
    #[error("{0}")]
    Inference(String),
}

impl AnalysisError {
    /// Re-tags any error raised while loading a model as [`AnalysisError::ModelUnavailable`].
    pub fn into_unavailable(self, model_id: &str) -> Self {
        match self {
            AnalysisError::ModelUnavailable(_) => self,
            other => AnalysisError::ModelUnavailable(format!(
                "Failed to load model '{model_id}': {other}"
            )),
        }
    }
}

impl From<hf_hub::api::sync::ApiError> for AnalysisError {
    fn from(value: hf_hub::api::sync::ApiError) -> Self {
        AnalysisError::ModelUnavailable(format!("HuggingFace API error: {value}"))
    }
}

impl From<candle_core::Error> for AnalysisError {
    fn from(value: candle_core::Error) -> Self {
        AnalysisError::Inference(value.to_string())
    }
}

impl From<std::io::Error> for AnalysisError {
    fn from(value: std::io::Error) -> Self {
        AnalysisError::ModelUnavailable(value.to_string())
    }
}

impl From<serde_json::Error> for AnalysisError {
    fn from(value: serde_json::Error) -> Self {
        AnalysisError::ModelUnavailable(value.to_string())
    }
}
