//! Model lifecycle manager
//!
//! Single entry point combining registry lookup, cache lookup, and
//! type-dispatched loading. Per name, a model moves
//! `Unregistered -> Registered -> Loaded`; the second transition is
//! one-way and happens at most once per process.

use super::cache::ModelCache;
use super::loader::{GenerativeModel, ModelLoader};
use super::registry::{ModelKind, ModelRecord, RegistryStore};
use crate::error::ModelError;
use anyhow::Result;
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Composes the registry store, the model cache, and the load strategy
pub struct ModelManager {
    registry: Arc<RegistryStore>,
    cache: ModelCache,
    loader: Arc<dyn ModelLoader>,
    models_dir: PathBuf,
    /// One lock per model name so concurrent first loads collapse into one
    load_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl ModelManager {
    pub fn new(
        registry: Arc<RegistryStore>,
        loader: Arc<dyn ModelLoader>,
        models_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            registry,
            cache: ModelCache::new(),
            loader,
            models_dir: models_dir.into(),
            load_locks: DashMap::new(),
        }
    }

    pub fn registry(&self) -> &RegistryStore {
        &self.registry
    }

    pub fn cache(&self) -> &ModelCache {
        &self.cache
    }

    /// All registered names, sorted
    pub async fn list_registered_models(&self) -> Vec<String> {
        self.registry.names().await
    }

    /// All registry records, sorted by name
    pub async fn list_records(&self) -> Vec<ModelRecord> {
        self.registry.list().await
    }

    /// Scan the configured models directory and persist discovered records
    pub async fn scan(&self) -> Result<Vec<ModelRecord>> {
        let discovered = self.registry.scan(&self.models_dir).await?;
        crate::metrics::record_scan(discovered.len());
        crate::metrics::update_registered_count(self.registry.count().await);
        Ok(discovered)
    }

    /// Resolve a record's kind to its load strategy
    ///
    /// All known kinds currently share the one seq2seq strategy; the
    /// table grows a row when a genuinely distinct loader appears.
    fn strategy(&self, kind: &ModelKind) -> Option<Arc<dyn ModelLoader>> {
        match kind {
            ModelKind::QuestionGeneration
            | ModelKind::AnswerGeneration
            | ModelKind::DistractorGeneration => Some(self.loader.clone()),
            ModelKind::Other(_) => None,
        }
    }

    /// Load a registered model, memoizing the result
    ///
    /// Cache hits return the existing handle without touching the
    /// filesystem. On a miss, at most one caller performs the artifact
    /// load; concurrent callers for the same name wait on the per-name
    /// lock and reuse the winner's cached handle. Load failures are not
    /// cached and not retried.
    pub async fn load_model(&self, name: &str) -> Result<Arc<dyn GenerativeModel>, ModelError> {
        let record = self
            .registry
            .get(name)
            .await
            .ok_or_else(|| ModelError::Unregistered(name.to_string()))?;

        if let Some(model) = self.cache.get(name).await {
            return Ok(model);
        }

        let lock = self
            .load_locks
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        // A concurrent caller may have finished the load while we waited
        if let Some(model) = self.cache.get(name).await {
            return Ok(model);
        }

        let loader = self
            .strategy(&record.kind)
            .ok_or_else(|| ModelError::UnsupportedKind(record.kind.to_string()))?;

        tracing::info!(model = %name, kind = %record.kind, path = ?record.path, "Loading model");

        let model = Self::run_loader(loader, &record.path).await?;

        self.cache.put(name, model.clone()).await;
        crate::metrics::record_model_loaded(name);

        tracing::info!(model = %name, "Model loaded and cached");

        Ok(model)
    }

    /// Load a model directly from a directory, bypassing registry and cache
    ///
    /// Used for explicitly supplied paths (e.g. a fresh fine-tune output
    /// that has not been scanned yet).
    pub async fn load_from_path(&self, path: &Path) -> Result<Arc<dyn GenerativeModel>, ModelError> {
        tracing::info!(path = ?path, "Loading model from explicit path");
        Self::run_loader(self.loader.clone(), path).await
    }

    /// Run a load on the blocking pool; loads are seconds of I/O and
    /// weight deserialization.
    async fn run_loader(
        loader: Arc<dyn ModelLoader>,
        path: &Path,
    ) -> Result<Arc<dyn GenerativeModel>, ModelError> {
        let load_path = path.to_path_buf();
        let join_path = path.to_path_buf();
        tokio::task::spawn_blocking(move || loader.load(&load_path))
            .await
            .map_err(|e| ModelError::Load {
                path: join_path,
                source: anyhow::anyhow!("load task failed: {e}"),
            })?
    }
}
