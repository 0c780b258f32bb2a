//! Request handlers.

use super::error::{Result, ServerError};
use super::state::AppState;
use abode::FeatureOptions;
use abode_data::read_feature_frame;
use abode_model::{FeatureRecord, FeatureValue, ModelMetadata};
use abode_output::{
    BatchPredictionRow, ExportFormat, Exporter, PredictionResponse, SAMPLE_FILE_NAME, sample_csv,
};
use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use std::sync::Arc;

/// Reported by `/health`.
pub(crate) const API_VERSION: &str = "2.0";

fn header_value<'a>(headers: &'a HeaderMap, name: header::HeaderName) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

fn is_json(headers: &HeaderMap) -> bool {
    let content_type = header_value(headers, header::CONTENT_TYPE);
    content_type.starts_with("application/json") || content_type.contains("+json")
}

fn is_csv(headers: &HeaderMap) -> bool {
    header_value(headers, header::CONTENT_TYPE).starts_with("text/csv")
}

fn accepts_csv(headers: &HeaderMap) -> bool {
    header_value(headers, header::ACCEPT).contains("text/csv")
}

fn parse_json(body: &[u8]) -> Result<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ServerError::BadRequest("No input data provided".to_string()));
    }
    serde_json::from_slice(body).map_err(|e| ServerError::BadRequest(format!("Invalid JSON: {e}")))
}

/// Keep only the expected features of a JSON object. Other keys are dropped
/// whatever their type.
fn record_from(value: Value, expected: &[String]) -> Result<FeatureRecord> {
    let Value::Object(map) = value else {
        return Err(ServerError::BadRequest(
            "Request body must be a JSON object".to_string(),
        ));
    };
    if map.is_empty() {
        return Err(ServerError::BadRequest("No input data provided".to_string()));
    }
    map.into_iter()
        .filter(|(name, _)| expected.contains(name))
        .map(|(name, value)| -> Result<(String, FeatureValue)> {
            let value: FeatureValue = serde_json::from_value(value).map_err(|_| {
                ServerError::BadRequest(format!(
                    "Feature values must be numbers or strings: {name}"
                ))
            })?;
            Ok((name, value))
        })
        .collect()
}

fn records_from(value: Value, expected: &[String]) -> Result<Vec<FeatureRecord>> {
    let Value::Array(items) = value else {
        return Err(ServerError::BadRequest(
            "Batch body must be a JSON array of records".to_string(),
        ));
    };
    if items.is_empty() {
        return Err(ServerError::BadRequest("No input data provided".to_string()));
    }
    items
        .into_iter()
        .map(|item| record_from(item, expected))
        .collect()
}

/// `POST /predict`
pub(crate) async fn predict(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<PredictionResponse>> {
    let model = state.model()?;
    if !is_json(&headers) {
        return Err(ServerError::BadRequest("Request must be JSON".to_string()));
    }
    let record = record_from(parse_json(&body)?, model.pipeline().expected_features())?;

    let price = model.predict(&record)?;
    let category = model.pipeline().categorize(price);
    tracing::debug!(price, %category, "prediction served");
    Ok(Json(PredictionResponse::new(price, category, model.metadata())))
}

/// `POST /predict/batch`
///
/// Accepts a JSON array of records or a `text/csv` upload. Answers in JSON
/// unless the client asks for `text/csv`.
pub(crate) async fn predict_batch(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    let model = state.model()?;
    let worker = Arc::clone(&model);

    let prices = if is_csv(&headers) {
        tokio::task::spawn_blocking(move || -> Result<Vec<f64>> {
            let frame = read_feature_frame(body.as_ref())?;
            if frame.height() == 0 {
                return Err(ServerError::BadRequest("No input data provided".to_string()));
            }
            Ok(worker.pipeline().batch_predict_frame(&frame)?)
        })
        .await??
    } else if is_json(&headers) {
        let records = records_from(parse_json(&body)?, model.pipeline().expected_features())?;
        tokio::task::spawn_blocking(move || worker.pipeline().batch_predict(&records)).await??
    } else {
        return Err(ServerError::BadRequest(
            "Request must be JSON or CSV".to_string(),
        ));
    };
    tracing::info!(rows = prices.len(), "batch prediction served");

    let rows = BatchPredictionRow::from_prices(&prices, |p| model.pipeline().categorize(p));
    if accepts_csv(&headers) {
        let csv = rows.export_to_string(ExportFormat::Csv)?;
        Ok(([(header::CONTENT_TYPE, "text/csv")], csv).into_response())
    } else {
        Ok(Json(rows).into_response())
    }
}

fn endpoints() -> Value {
    json!({
        "predict": "/predict",
        "batch_predict": "/predict/batch",
        "health": "/health",
        "model_info": "/model_metadata_info",
        "model_summary": "/model_info",
        "options": "/options",
        "download_sample": "/download-sample",
        "reload": "/admin/reload",
    })
}

/// `GET /health`
pub(crate) async fn health(State(state): State<AppState>) -> Response {
    let Some(model) = state.handle.current() else {
        let error = state
            .handle
            .last_error()
            .unwrap_or_else(|| "Model not loaded".to_string());
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "status": "unhealthy",
                "model_loaded": false,
                "error": error,
            })),
        )
            .into_response();
    };

    let metadata = model.metadata();
    Json(json!({
        "status": "healthy",
        "model_loaded": true,
        "model_type": metadata.model_info.name,
        "features_required": metadata.expected_features(),
        "model_generation": model.generation(),
        "loaded_at": model.loaded_at(),
        "cache": model.cache_stats(),
        "api_version": API_VERSION,
        "endpoints": endpoints(),
    }))
    .into_response()
}

/// `GET /model_metadata_info`
pub(crate) async fn model_metadata_info(State(state): State<AppState>) -> Result<Json<ModelMetadata>> {
    Ok(Json(state.model()?.metadata().clone()))
}

/// `GET /model_info`: a plain-text summary for older clients.
pub(crate) async fn model_info(State(state): State<AppState>) -> Result<String> {
    let model = state.model()?;
    let metadata = model.metadata();
    let info = &metadata.model_info;
    Ok(format!(
        "{} ({}, {})\nTarget: {}\nFeatures: {}\nTrained: {}\nValidation R²: {:.4}\nGeneration: {}\n",
        info.name,
        info.model_type,
        info.framework,
        info.target,
        metadata.expected_features().join(", "),
        info.created_timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
        metadata.performance.val_r2,
        model.generation(),
    ))
}

/// `GET /options`
pub(crate) async fn options(State(state): State<AppState>) -> Json<FeatureOptions> {
    Json(state.options.as_ref().clone())
}

/// `GET /download-sample`
pub(crate) async fn download_sample() -> Result<Response> {
    let csv = sample_csv()?;
    let disposition = format!("attachment; filename=\"{SAMPLE_FILE_NAME}\"");
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    )
        .into_response())
}

/// `POST /admin/reload`
pub(crate) async fn reload(State(state): State<AppState>) -> Result<Json<Value>> {
    let handle = Arc::clone(&state.handle);
    let model = tokio::task::spawn_blocking(move || handle.reload()).await??;
    Ok(Json(json!({
        "status": "reloaded",
        "model": model.metadata().model_info.name,
        "generation": model.generation(),
    })))
}

pub(crate) async fn favicon() -> StatusCode {
    StatusCode::NO_CONTENT
}

pub(crate) async fn not_found() -> ServerError {
    ServerError::NotFound
}
