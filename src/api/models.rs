//! API request and response models

use crate::trainer::TrainingSummary;
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Request to load a model from an explicit directory
#[derive(Debug, Deserialize)]
pub struct LoadModelRequest {
    #[serde(default)]
    pub model_path: Option<String>,
}

/// Response after a model load
#[derive(Debug, Serialize, Deserialize)]
pub struct LoadModelResponse {
    pub status: String,
    pub message: String,
    pub model_path: String,
}

/// Response after a registry scan
#[derive(Debug, Serialize, Deserialize)]
pub struct ScanResponse {
    pub status: String,
    pub discovered: usize,
    pub registered: Vec<String>,
}

/// Request to generate sequences with the session model
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub count: Option<i64>,
}

/// Generated sequences
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub status: String,
    pub result: Vec<String>,
}

/// Request to fine-tune a model
///
/// `dataset` stays untyped here so a wrong shape surfaces as a 400 with
/// a dataset-specific message instead of a body rejection.
#[derive(Debug, Deserialize)]
pub struct FineTuneRequest {
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub dataset: Option<serde_json::Value>,
    #[serde(default)]
    pub epochs: Option<u32>,
}

/// Fine-tune outcome envelope
#[derive(Debug, Serialize)]
pub struct FineTuneResponse {
    pub status: String,
    pub message: String,
    pub result: TrainingSummary,
}
