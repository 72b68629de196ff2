//! API request handlers

use super::models::{
    FineTuneRequest, FineTuneResponse, GenerateRequest, GenerateResponse, HealthResponse,
    LoadModelRequest, LoadModelResponse, ScanResponse,
};
use super::routes::AppState;
use crate::error::ApiError;
use crate::models::{GenerationParams, ModelRecord};
use crate::trainer::Dataset;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use std::path::Path as FsPath;

/// GET /health - Manager health check
pub async fn health() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now(),
        }),
    )
}

/// GET /metrics - Prometheus metrics
pub async fn metrics(State(state): State<AppState>) -> String {
    state.prometheus_handle.render()
}

/// GET /models - List registered models
pub async fn list_models(State(state): State<AppState>) -> Json<Vec<ModelRecord>> {
    Json(state.manager.list_records().await)
}

/// POST /models/scan - Scan the models directory and update the registry
pub async fn scan_models(State(state): State<AppState>) -> Result<Json<ScanResponse>, ApiError> {
    let discovered = state.manager.scan().await?;

    Ok(Json(ScanResponse {
        status: "success".to_string(),
        discovered: discovered.len(),
        registered: state.manager.list_registered_models().await,
    }))
}

/// POST /models/{name}/load - Load a registered model and select it for generation
pub async fn load_registered_model(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<LoadModelResponse>, ApiError> {
    let model = state.manager.load_model(&name).await?;
    let model_path = model.path().to_string_lossy().to_string();
    state.session.replace(model).await;

    Ok(Json(LoadModelResponse {
        status: "success".to_string(),
        message: format!("Model '{name}' loaded successfully"),
        model_path,
    }))
}

/// POST /load_model - Load a model from an explicit directory and select it
pub async fn load_model(
    State(state): State<AppState>,
    Json(req): Json<LoadModelRequest>,
) -> Result<Json<LoadModelResponse>, ApiError> {
    let model_path = match req.model_path.as_deref().map(str::trim) {
        Some(path) if !path.is_empty() => path.to_string(),
        _ => return Err(ApiError::BadRequest("model_path is required".to_string())),
    };

    let model = state.manager.load_from_path(FsPath::new(&model_path)).await?;
    state.session.replace(model).await;

    Ok(Json(LoadModelResponse {
        status: "success".to_string(),
        message: "Model loaded successfully".to_string(),
        model_path,
    }))
}

/// POST /generate_with_model - Generate sequences with the session model
pub async fn generate_with_model(
    State(state): State<AppState>,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let model = state
        .session
        .current()
        .await
        .ok_or_else(|| ApiError::BadRequest("No model is loaded".to_string()))?;

    let text = match req.text.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => return Err(ApiError::BadRequest("Text is required".to_string())),
    };

    let count = req.count.unwrap_or(10);
    if !(1..=100).contains(&count) {
        return Err(ApiError::BadRequest(
            "Count must be a positive integer between 1 and 100".to_string(),
        ));
    }
    let count = count as usize;

    // Generation is CPU-bound; keep it off the async workers
    let params = GenerationParams::default();
    let result = tokio::task::spawn_blocking(move || model.generate(&text, count, &params))
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("generation task failed: {e}")))??;

    crate::metrics::record_generation(result.len());

    Ok(Json(GenerateResponse {
        status: "success".to_string(),
        result,
    }))
}

/// POST /fine_tune - Fine-tune a model via the external trainer
pub async fn fine_tune(
    State(state): State<AppState>,
    Json(req): Json<FineTuneRequest>,
) -> Result<Json<FineTuneResponse>, ApiError> {
    let model_name = match req.model_name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => {
            return Err(ApiError::BadRequest(
                "model_name and dataset are required".to_string(),
            ));
        }
    };
    let dataset = match req.dataset {
        None => {
            return Err(ApiError::BadRequest(
                "model_name and dataset are required".to_string(),
            ));
        }
        Some(value) => serde_json::from_value::<Dataset>(value).map_err(|_| {
            ApiError::BadRequest(
                "invalid dataset: must be a file path or a list of records".to_string(),
            )
        })?,
    };

    let epochs = req.epochs.unwrap_or_else(|| state.trainer.default_epochs());
    if epochs == 0 {
        return Err(ApiError::BadRequest("epochs must be positive".to_string()));
    }

    // A registered name resolves to its artifact path; anything else is
    // treated as a model directory itself
    let model_path = match state.manager.registry().get(&model_name).await {
        Some(record) => record.path.to_string_lossy().to_string(),
        None => model_name,
    };

    let result = state.trainer.fine_tune(&model_path, dataset, epochs).await?;

    Ok(Json(FineTuneResponse {
        status: "success".to_string(),
        message: "Model fine-tuned successfully".to_string(),
        result,
    }))
}
