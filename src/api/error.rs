use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{debug, warn};

use crate::error::AnalysisError;

/// An [`AnalysisError`] on its way out as `{"error": message}`.
#[derive(Debug)]
pub struct ApiError(pub AnalysisError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            AnalysisError::Validation(_) => StatusCode::BAD_REQUEST,
            AnalysisError::FeatureDisabled(_) => StatusCode::NOT_FOUND,
            AnalysisError::ModelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AnalysisError::Inference(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AnalysisError> for ApiError {
    fn from(value: AnalysisError) -> Self {
        Self(value)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(value: JsonRejection) -> Self {
        Self(AnalysisError::Validation(format!(
            "Invalid JSON body: {}",
            value.body_text()
        )))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(value: QueryRejection) -> Self {
        Self(AnalysisError::Validation(format!(
            "Invalid query: {}",
            value.body_text()
        )))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(status = status.as_u16(), error = %self.0, "request failed");
        } else {
            debug!(status = status.as_u16(), error = %self.0, "request rejected");
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        let cases = [
            (AnalysisError::Validation("x".into()), 400),
            (AnalysisError::FeatureDisabled("x".into()), 404),
            (AnalysisError::ModelUnavailable("x".into()), 503),
            (AnalysisError::Inference("x".into()), 500),
        ];
        for (error, code) in cases {
            assert_eq!(ApiError(error).status().as_u16(), code);
        }
    }
}
