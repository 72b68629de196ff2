//! Fine-tuning wrapper around an external trainer process
//!
//! The numerical training loop lives in a separate trainer binary; this
//! module validates the dataset, materializes inline records to a temp
//! file, spawns the binary, and reports the outcome. One fine-tune runs
//! at a time.

use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::Mutex;
use tokio::time::timeout;

/// Number of trailing stderr lines kept for error reporting
const STDERR_TAIL_LINES: usize = 10;

/// Configuration for the trainer
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TrainerConfig {
    /// Path to the fine-tune binary
    pub trainer_binary_path: String,
    /// Directory the trainer writes the fine-tuned model to
    pub output_dir: PathBuf,
    /// Epoch count used when a request does not specify one
    pub default_epochs: u32,
    /// Timeout for a fine-tune run in seconds
    pub train_timeout_secs: u64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            trainer_binary_path: "mcq-finetune".to_string(),
            output_dir: PathBuf::from("models/fine_tuned"),
            default_epochs: 3,
            train_timeout_secs: 3600,
        }
    }
}

/// Training input: either a dataset file on disk or inline records
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Dataset {
    Path(String),
    Records(Vec<serde_json::Value>),
}

/// Result summary of a completed fine-tune
#[derive(Debug, Clone, Serialize)]
pub struct TrainingSummary {
    pub status: String,
    pub model_path: PathBuf,
    pub epochs: u32,
}

/// Wrapper around the external fine-tune process
///
/// Ensures only one fine-tune runs at a time via mutex
pub struct ModelTrainer {
    config: TrainerConfig,
    lock: Mutex<()>,
}

impl ModelTrainer {
    pub fn new(config: TrainerConfig) -> Self {
        Self {
            config,
            lock: Mutex::new(()),
        }
    }

    pub fn default_epochs(&self) -> u32 {
        self.config.default_epochs
    }

    /// Fine-tune the model at `model_path` on the given dataset
    ///
    /// Inline record lists are written to a temporary JSON file that
    /// lives until the trainer exits. Returns a summary pointing at the
    /// configured output directory on a clean exit; a non-zero exit or
    /// timeout surfaces the tail of the trainer's stderr.
    pub async fn fine_tune(
        &self,
        model_path: &str,
        dataset: Dataset,
        epochs: u32,
    ) -> Result<TrainingSummary, ModelError> {
        let _guard = self.lock.lock().await;

        // Temp file must outlive the child process
        let (dataset_path, _dataset_file) = materialize_dataset(dataset)?;

        tracing::info!(
            model = %model_path,
            dataset = ?dataset_path,
            epochs,
            "Starting fine-tune"
        );

        let mut child = Command::new(&self.config.trainer_binary_path)
            .arg("--model-path")
            .arg(model_path)
            .arg("--dataset")
            .arg(&dataset_path)
            .arg("--epochs")
            .arg(epochs.to_string())
            .arg("--output-dir")
            .arg(&self.config.output_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                ModelError::Training(format!(
                    "failed to spawn trainer process '{}': {}",
                    self.config.trainer_binary_path, e
                ))
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ModelError::Training("failed to capture trainer stdout".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ModelError::Training("failed to capture trainer stderr".to_string()))?;

        let stdout_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                tracing::debug!(line = %line, "Trainer output");
            }
        });

        let stderr_task = tokio::spawn(async move {
            let mut tail: Vec<String> = Vec::new();
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if tail.len() == STDERR_TAIL_LINES {
                    tail.remove(0);
                }
                tail.push(line);
            }
            tail
        });

        let status = match timeout(
            Duration::from_secs(self.config.train_timeout_secs),
            child.wait(),
        )
        .await
        {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                return Err(ModelError::Training(format!(
                    "trainer process failed: {e}"
                )));
            }
            Err(_) => {
                tracing::error!(
                    model = %model_path,
                    timeout_secs = self.config.train_timeout_secs,
                    "Fine-tune timed out"
                );
                let _ = child.kill().await;
                return Err(ModelError::Training(format!(
                    "trainer timed out after {}s",
                    self.config.train_timeout_secs
                )));
            }
        };

        let _ = stdout_task.await;
        let stderr_tail = stderr_task.await.unwrap_or_default();

        if !status.success() {
            return Err(ModelError::Training(format!(
                "trainer exited with {}: {}",
                status,
                stderr_tail.join("\n")
            )));
        }

        crate::metrics::record_fine_tune(model_path);

        tracing::info!(
            model = %model_path,
            output = ?self.config.output_dir,
            "Fine-tune completed"
        );

        Ok(TrainingSummary {
            status: "fine-tune completed".to_string(),
            model_path: self.config.output_dir.clone(),
            epochs,
        })
    }
}

/// Resolve a dataset to a file path, keeping any temp file alive
fn materialize_dataset(
    dataset: Dataset,
) -> Result<(PathBuf, Option<tempfile::NamedTempFile>), ModelError> {
    match dataset {
        Dataset::Path(path) => {
            let path_buf = PathBuf::from(&path);
            if !path_buf.is_file() {
                return Err(ModelError::InvalidDataset(format!(
                    "dataset file not found: {path}"
                )));
            }
            Ok((path_buf, None))
        }
        Dataset::Records(records) => {
            if records.is_empty() {
                return Err(ModelError::InvalidDataset(
                    "dataset record list is empty".to_string(),
                ));
            }
            let file = tempfile::Builder::new()
                .suffix(".json")
                .tempfile()
                .map_err(|e| {
                    ModelError::Training(format!("failed to create dataset temp file: {e}"))
                })?;
            serde_json::to_writer(file.as_file(), &records).map_err(|e| {
                ModelError::Training(format!("failed to write dataset temp file: {e}"))
            })?;
            Ok((file.path().to_path_buf(), Some(file)))
        }
    }
}
