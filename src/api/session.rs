//! Session model state
//!
//! Holds the model that generation requests run against. Owned by the
//! request layer and passed through application state, rather than
//! living in process-global storage; `/load_model` writes it and
//! `/generate_with_model` reads it.

use crate::models::GenerativeModel;
use std::sync::Arc;
use tokio::sync::RwLock;

/// The currently selected generation model, if any
#[derive(Default)]
pub struct ModelSession {
    current: RwLock<Option<Arc<dyn GenerativeModel>>>,
}

impl ModelSession {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(None),
        }
    }

    /// Install a model as the session model, replacing any previous one
    pub async fn replace(&self, model: Arc<dyn GenerativeModel>) {
        let mut current = self.current.write().await;
        *current = Some(model);
    }

    /// The session model, if one has been loaded
    pub async fn current(&self) -> Option<Arc<dyn GenerativeModel>> {
        let current = self.current.read().await;
        current.clone()
    }

    pub async fn is_loaded(&self) -> bool {
        let current = self.current.read().await;
        current.is_some()
    }
}
