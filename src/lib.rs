//! MCQ Manager - model lifecycle manager for question-generation models
//!
//! A lightweight Rust service that registers, scans, lazily loads, and
//! serves sequence-to-sequence models used for multiple-choice question
//! generation, and delegates fine-tuning to an external trainer process.

pub mod api;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod trainer;

pub use config::ManagerConfig;
pub use error::{ApiError, ModelError};
pub use models::{
    CandleT5Loader, GenerationParams, GenerativeModel, ModelCache, ModelKind, ModelLoader,
    ModelManager, ModelRecord, RegistryStore,
};
pub use trainer::{Dataset, ModelTrainer, TrainerConfig, TrainingSummary};
