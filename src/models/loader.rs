//! Sequence-to-sequence model loading and generation
//!
//! A model directory follows the usual pretrained layout:
//! ```text
//! <path>/
//! ├── config.json
//! ├── tokenizer.json
//! └── model.safetensors
//! ```
//!
//! Every known task kind shares the one strategy below; the per-kind
//! dispatch lives in the manager.

use crate::error::ModelError;
use anyhow::{Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::generation::{LogitsProcessor, Sampling};
use candle_transformers::models::t5;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokenizers::Tokenizer;

/// Maximum number of input tokens fed to the encoder
const MAX_INPUT_TOKENS: usize = 512;

/// Decoding parameters for text generation
#[derive(Debug, Clone)]
pub struct GenerationParams {
    /// Cap on decoded tokens per sequence
    pub max_length: usize,
    pub temperature: f64,
    pub top_k: usize,
    pub top_p: f64,
    /// Base sampling seed; each sequence offsets it by its index
    pub seed: u64,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_length: 128,
            temperature: 1.2,
            top_k: 50,
            top_p: 0.9,
            seed: 299792458,
        }
    }
}

/// A loaded model: an opaque, thread-safe generation capability
pub trait GenerativeModel: Send + Sync {
    /// Directory the model was loaded from
    fn path(&self) -> &Path;

    /// Produce `count` decoded sequences for the input text
    fn generate(
        &self,
        text: &str,
        count: usize,
        params: &GenerationParams,
    ) -> Result<Vec<String>, ModelError>;
}

/// Strategy for materializing a model from a pretrained directory
pub trait ModelLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<Arc<dyn GenerativeModel>, ModelError>;
}

/// Production loader backed by candle's T5 implementation
pub struct CandleT5Loader {
    device: Device,
}

impl CandleT5Loader {
    pub fn new() -> Self {
        Self {
            device: Device::Cpu,
        }
    }

    fn load_inner(&self, path: &Path) -> Result<T5Generator> {
        let config_content = std::fs::read_to_string(path.join("config.json"))
            .context("Failed to read config.json")?;
        let config: t5::Config =
            serde_json::from_str(&config_content).context("Failed to parse config.json")?;

        let tokenizer = Tokenizer::from_file(path.join("tokenizer.json"))
            .map_err(anyhow::Error::msg)
            .context("Failed to load tokenizer.json")?;

        let weights = path.join("model.safetensors");
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[&weights], DType::F32, &self.device)
                .context("Failed to map model.safetensors")?
        };
        let model = t5::T5ForConditionalGeneration::load(vb, &config)
            .context("Failed to build model from weights")?;

        Ok(T5Generator {
            path: path.to_path_buf(),
            tokenizer,
            config,
            device: self.device.clone(),
            model: Mutex::new(model),
        })
    }
}

impl Default for CandleT5Loader {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelLoader for CandleT5Loader {
    fn load(&self, path: &Path) -> Result<Arc<dyn GenerativeModel>, ModelError> {
        let generator = self.load_inner(path).map_err(|source| ModelError::Load {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Arc::new(generator))
    }
}

/// A loaded T5 model/tokenizer pair
///
/// The decoder keeps a KV cache between steps, so the model sits behind
/// a mutex; one generation runs at a time per model.
pub struct T5Generator {
    path: PathBuf,
    tokenizer: Tokenizer,
    config: t5::Config,
    device: Device,
    model: Mutex<t5::T5ForConditionalGeneration>,
}

impl T5Generator {
    fn sample_sequences(
        &self,
        text: &str,
        count: usize,
        params: &GenerationParams,
    ) -> Result<Vec<String>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(anyhow::Error::msg)
            .context("Failed to tokenize input")?;
        let tokens = encoding.get_ids();
        let tokens = &tokens[..tokens.len().min(MAX_INPUT_TOKENS)];

        let input_ids = Tensor::new(tokens, &self.device)?.unsqueeze(0)?;
        let decoder_start = self
            .config
            .decoder_start_token_id
            .unwrap_or(self.config.pad_token_id) as u32;

        let mut model = self
            .model
            .lock()
            .map_err(|_| anyhow::anyhow!("model mutex poisoned"))?;

        let encoder_output = model.encode(&input_ids)?;

        let mut sequences = Vec::with_capacity(count);
        for sequence_index in 0..count {
            let mut logits_processor = LogitsProcessor::from_sampling(
                params.seed.wrapping_add(sequence_index as u64),
                Sampling::TopKThenTopP {
                    k: params.top_k,
                    p: params.top_p,
                    temperature: params.temperature,
                },
            );

            model.clear_kv_cache();
            let mut output_ids = vec![decoder_start];

            for step in 0..params.max_length {
                let decoder_input = if step == 0 || !self.config.use_cache {
                    Tensor::new(output_ids.as_slice(), &self.device)?.unsqueeze(0)?
                } else {
                    let last = output_ids[output_ids.len() - 1];
                    Tensor::new(&[last], &self.device)?.unsqueeze(0)?
                };

                let logits = model.decode(&decoder_input, &encoder_output)?.squeeze(0)?;
                let next = logits_processor.sample(&logits)?;
                if next as usize == self.config.eos_token_id {
                    break;
                }
                output_ids.push(next);
            }

            let decoded = self
                .tokenizer
                .decode(&output_ids[1..], true)
                .map_err(anyhow::Error::msg)
                .context("Failed to decode output tokens")?;
            sequences.push(decoded);
        }

        Ok(sequences)
    }
}

impl GenerativeModel for T5Generator {
    fn path(&self) -> &Path {
        &self.path
    }

    fn generate(
        &self,
        text: &str,
        count: usize,
        params: &GenerationParams,
    ) -> Result<Vec<String>, ModelError> {
        self.sample_sequences(text, count, params)
            .map_err(|e| ModelError::Generation(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_generation_params_defaults() {
        let params = GenerationParams::default();
        assert_eq!(params.max_length, 128);
        assert_eq!(params.temperature, 1.2);
        assert_eq!(params.top_k, 50);
        assert_eq!(params.top_p, 0.9);
    }

    #[test]
    fn test_load_missing_directory_fails() {
        let loader = CandleT5Loader::new();
        let result = loader.load(Path::new("/nonexistent/model-dir-12345"));
        assert!(matches!(result, Err(ModelError::Load { .. })));
    }

    #[test]
    fn test_load_error_names_the_path() {
        let loader = CandleT5Loader::new();
        let err = loader
            .load(Path::new("/nonexistent/model-dir-12345"))
            .err()
            .unwrap();
        assert!(err.to_string().contains("model-dir-12345"));
    }

    #[test]
    fn test_load_invalid_config_fails() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("config.json"), "not valid json").unwrap();

        let loader = CandleT5Loader::new();
        let result = loader.load(dir.path());
        assert!(matches!(result, Err(ModelError::Load { .. })));
    }
}
