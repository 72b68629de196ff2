//! In-memory cache of loaded models
//!
//! Process-lifetime memoization of loaded model handles, keyed by
//! registered name. The cache is unbounded and append-only: entries are
//! never evicted, and a later re-scan that changes a record's path does
//! not invalidate a model that is already cached.

use super::loader::GenerativeModel;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Memoized name -> loaded model mapping
#[derive(Default)]
pub struct ModelCache {
    models: RwLock<HashMap<String, Arc<dyn GenerativeModel>>>,
}

impl ModelCache {
    pub fn new() -> Self {
        Self {
            models: RwLock::new(HashMap::new()),
        }
    }

    /// Get the cached handle for a name, if present. No I/O.
    pub async fn get(&self, name: &str) -> Option<Arc<dyn GenerativeModel>> {
        let models = self.models.read().await;
        models.get(name).cloned()
    }

    /// Insert or overwrite the cache entry for a name
    pub async fn put(&self, name: &str, model: Arc<dyn GenerativeModel>) {
        let mut models = self.models.write().await;
        models.insert(name.to_string(), model);
    }

    pub async fn contains(&self, name: &str) -> bool {
        let models = self.models.read().await;
        models.contains_key(name)
    }

    pub async fn len(&self) -> usize {
        let models = self.models.read().await;
        models.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;
    use crate::models::loader::GenerationParams;
    use std::path::{Path, PathBuf};

    struct FakeModel {
        path: PathBuf,
    }

    impl GenerativeModel for FakeModel {
        fn path(&self) -> &Path {
            &self.path
        }

        fn generate(
            &self,
            _text: &str,
            count: usize,
            _params: &GenerationParams,
        ) -> Result<Vec<String>, ModelError> {
            Ok(vec!["ok".to_string(); count])
        }
    }

    fn fake(path: &str) -> Arc<dyn GenerativeModel> {
        Arc::new(FakeModel {
            path: PathBuf::from(path),
        })
    }

    #[tokio::test]
    async fn test_get_absent() {
        let cache = ModelCache::new();
        assert!(cache.get("question_generation").await.is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_put_then_get_returns_same_handle() {
        let cache = ModelCache::new();
        let model = fake("/m/qg/models");
        cache.put("question_generation", model.clone()).await;

        let cached = cache.get("question_generation").await.unwrap();
        assert!(Arc::ptr_eq(&model, &cached));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let cache = ModelCache::new();
        let first = fake("/m/v1/models");
        let second = fake("/m/v2/models");

        cache.put("question_generation", first.clone()).await;
        cache.put("question_generation", second.clone()).await;

        let cached = cache.get("question_generation").await.unwrap();
        assert!(Arc::ptr_eq(&second, &cached));
        assert!(!Arc::ptr_eq(&first, &cached));
        assert_eq!(cache.len().await, 1);
    }
}
