use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;

use super::error::ApiError;
use super::types::{
    AnalysisRequest, BatchRequest, BatchResponse, HealthResponse, HistoryQuery, HistoryResponse,
    MessageResponse,
};
use super::AppState;
use crate::analyzer::{AnalysisMode, AnalysisResult};
use crate::error::{AnalysisError, Result};

const DEFAULT_HISTORY_LIMIT: usize = 20;

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

/// Runs model work on the blocking pool.
async fn blocking<T, F>(work: F) -> std::result::Result<T, ApiError>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| AnalysisError::Inference(format!("Analysis task failed: {e}")))?
        .map_err(ApiError::from)
}

async fn analyze_mode(
    state: AppState,
    mode: AnalysisMode,
    body: std::result::Result<Json<AnalysisRequest>, JsonRejection>,
) -> ApiResult<AnalysisResult> {
    let Json(request) = body?;
    let analyzer = state.analyzer.clone();
    let result = blocking(move || analyzer.analyze(mode, &request.text)).await?;
    Ok(Json(result))
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now(),
        models: state.analyzer.models(),
    })
}

pub async fn analyze(
    State(state): State<AppState>,
    body: std::result::Result<Json<AnalysisRequest>, JsonRejection>,
) -> ApiResult<AnalysisResult> {
    analyze_mode(state, AnalysisMode::Sentiment, body).await
}

pub async fn emotion(
    State(state): State<AppState>,
    body: std::result::Result<Json<AnalysisRequest>, JsonRejection>,
) -> ApiResult<AnalysisResult> {
    analyze_mode(state, AnalysisMode::Emotion, body).await
}

pub async fn aspect(
    State(state): State<AppState>,
    body: std::result::Result<Json<AnalysisRequest>, JsonRejection>,
) -> ApiResult<AnalysisResult> {
    analyze_mode(state, AnalysisMode::Aspect, body).await
}

pub async fn batch(
    State(state): State<AppState>,
    body: std::result::Result<Json<BatchRequest>, JsonRejection>,
) -> ApiResult<BatchResponse> {
    if !state.analyzer.features().batch {
        return Err(AnalysisError::FeatureDisabled("Batch processing is disabled".into()).into());
    }
    let Json(request) = body?;
    let mode = match request.mode.as_deref() {
        Some(mode) => mode.parse()?,
        None => AnalysisMode::default(),
    };
    let texts = batch_texts(request.texts)?;

    let analyzer = state.analyzer.clone();
    let results = blocking(move || analyzer.batch(&texts, mode)).await?;
    Ok(Json(BatchResponse {
        count: results.len(),
        results,
        mode,
    }))
}

fn batch_texts(value: serde_json::Value) -> Result<Vec<String>> {
    let invalid = || AnalysisError::Validation("Invalid texts array".into());
    let serde_json::Value::Array(items) = value else {
        return Err(invalid());
    };
    items
        .into_iter()
        .map(|item| match item {
            serde_json::Value::String(text) => Ok(text),
            _ => Err(invalid()),
        })
        .collect()
}

pub async fn history(
    State(state): State<AppState>,
    query: std::result::Result<Query<HistoryQuery>, QueryRejection>,
) -> ApiResult<HistoryResponse> {
    let Query(query) = query?;
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    let (history, total) = state.analyzer.history(limit)?;
    Ok(Json(HistoryResponse { history, total }))
}

pub async fn clear_history(State(state): State<AppState>) -> ApiResult<MessageResponse> {
    state.analyzer.clear_history()?;
    Ok(Json(MessageResponse {
        message: "History cleared".into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn batch_texts_must_be_an_array_of_strings() {
        assert_eq!(batch_texts(json!(["a", "b"])).unwrap(), vec!["a", "b"]);
        for bad in [json!(null), json!("a"), json!(["a", 1])] {
            assert_eq!(
                batch_texts(bad),
                Err(AnalysisError::Validation("Invalid texts array".into()))
            );
        }
    }
}
