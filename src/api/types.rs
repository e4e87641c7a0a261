//! Request and response bodies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analyzer::{AnalysisMode, BatchItem};
use crate::history::HistoryEntry;
use crate::registry::ModelInfo;

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisRequest {
    #[serde(default)]
    pub text: String,
}

/// `texts` is kept loose so that a missing or non-array value is reported as
/// `Invalid texts array` rather than a deserialisation error.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchRequest {
    #[serde(default)]
    pub texts: serde_json::Value,
    #[serde(default)]
    pub mode: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchResponse {
    pub results: Vec<BatchItem>,
    pub count: usize,
    pub mode: AnalysisMode,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryResponse {
    pub history: Vec<HistoryEntry>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub models: ModelInfo,
}
