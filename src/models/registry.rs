//! Durable model registry
//!
//! Persists a name -> record mapping as a single JSON file, rewritten
//! wholesale on every change. Records are discovered by scanning a base
//! directory whose immediate subdirectories are task-type folders:
//! ```text
//! models/
//! ├── question_generation/
//! │   └── models/          <- artifact directory, becomes the record path
//! ├── answer_generation/
//! │   └── models/
//! └── scratch/             <- no artifact directory, silently skipped
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, RwLock};

/// Subdirectory a type folder must contain to be registered
pub const ARTIFACT_SUBDIR: &str = "models";

/// Task category of a registered model
///
/// Unrecognized tags are carried through as `Other` so a registry file
/// written by a newer version still parses; they fail at load dispatch,
/// not at registration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ModelKind {
    QuestionGeneration,
    AnswerGeneration,
    DistractorGeneration,
    Other(String),
}

impl ModelKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::QuestionGeneration => "question_generation",
            Self::AnswerGeneration => "answer_generation",
            Self::DistractorGeneration => "distractor_generation",
            Self::Other(tag) => tag,
        }
    }

    /// True for kinds the loader has a strategy for
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for ModelKind {
    fn from(tag: &str) -> Self {
        match tag {
            "question_generation" => Self::QuestionGeneration,
            "answer_generation" => Self::AnswerGeneration,
            "distractor_generation" => Self::DistractorGeneration,
            other => Self::Other(other.to_string()),
        }
    }
}

impl std::str::FromStr for ModelKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl Serialize for ModelKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ModelKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(Self::from(tag.as_str()))
    }
}

/// Entry for a model in the registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRecord {
    /// Unique name, key of the registry mapping
    pub name: String,
    /// Filesystem location of the model artifacts
    pub path: PathBuf,
    /// Task category, selects the load strategy
    #[serde(rename = "type")]
    pub kind: ModelKind,
    /// When this record was first created
    pub registered_at: DateTime<Utc>,
}

impl ModelRecord {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, kind: ModelKind) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind,
            registered_at: Utc::now(),
        }
    }
}

/// Durable store of model records
///
/// Saves are serialized behind a mutex and written atomically (temp file
/// + rename) so concurrent registry changes cannot interleave on disk.
pub struct RegistryStore {
    registry_file: PathBuf,
    records: RwLock<HashMap<String, ModelRecord>>,
    save_lock: Mutex<()>,
}

impl RegistryStore {
    /// Open the registry at the given file path
    ///
    /// A missing file yields an empty registry. A file that exists but
    /// does not parse is a hard error naming the file; delete or fix it
    /// manually.
    pub async fn open(registry_file: impl Into<PathBuf>) -> Result<Self> {
        let registry_file = registry_file.into();

        let records = match fs::read_to_string(&registry_file).await {
            Ok(content) => serde_json::from_str(&content).with_context(|| {
                format!(
                    "Failed to parse registry file: {:?}. File may be corrupted. \
                    Please delete or fix the file manually.",
                    registry_file
                )
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = ?registry_file, "No registry file found, starting empty");
                HashMap::new()
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read registry file: {:?}", registry_file));
            }
        };

        tracing::info!(
            path = ?registry_file,
            models = records.len(),
            "Registry opened"
        );

        Ok(Self {
            registry_file,
            records: RwLock::new(records),
            save_lock: Mutex::new(()),
        })
    }

    /// Persist the full mapping, overwriting the registry file
    pub async fn save(&self) -> Result<()> {
        let _guard = self.save_lock.lock().await;

        let snapshot = self.records.read().await.clone();
        let content = serde_json::to_string_pretty(&snapshot)
            .context("Failed to serialize registry to JSON")?;

        // Atomic write: write to temp file, then rename
        let temp_file = self.registry_file.with_extension("tmp");

        let mut file = fs::File::create(&temp_file)
            .await
            .context("Failed to create temp registry file")?;
        file.write_all(content.as_bytes())
            .await
            .context("Failed to write registry file")?;
        file.sync_all()
            .await
            .context("Failed to sync registry file")?;

        fs::rename(&temp_file, &self.registry_file)
            .await
            .context("Failed to rename temp registry file")?;

        tracing::debug!(
            path = ?self.registry_file,
            models = snapshot.len(),
            "Registry saved"
        );

        Ok(())
    }

    /// Scan a base directory and merge discovered records into the registry
    ///
    /// Each immediate subdirectory containing a `models/` artifact
    /// directory produces a record whose name and kind are the
    /// subdirectory's name. Subdirectories without the artifact directory
    /// are skipped. Existing records are upserted in place, keeping their
    /// original `registered_at`; records whose backing directory
    /// disappeared are left untouched. The registry is persisted before
    /// returning.
    pub async fn scan(&self, base_dir: &Path) -> Result<Vec<ModelRecord>> {
        let mut discovered = Vec::new();

        let mut entries = match fs::read_dir(base_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(base_dir = ?base_dir, "Scan directory does not exist");
                return Ok(discovered);
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read scan directory: {:?}", base_dir));
            }
        };

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().to_string();
            let artifact_path = entry.path().join(ARTIFACT_SUBDIR);
            if !artifact_path.is_dir() {
                tracing::debug!(folder = %name, "No artifact directory, skipping");
                continue;
            }

            discovered.push(ModelRecord::new(
                name.clone(),
                artifact_path,
                ModelKind::from(name.as_str()),
            ));
        }

        discovered.sort_by(|a, b| a.name.cmp(&b.name));

        {
            let mut records = self.records.write().await;
            for record in &discovered {
                match records.get_mut(&record.name) {
                    Some(existing) => {
                        existing.path = record.path.clone();
                        existing.kind = record.kind.clone();
                    }
                    None => {
                        records.insert(record.name.clone(), record.clone());
                    }
                }
            }
        }

        self.save().await?;

        tracing::info!(
            base_dir = ?base_dir,
            discovered = discovered.len(),
            "Scan complete"
        );

        Ok(discovered)
    }

    /// Insert or replace a record, persisting immediately
    pub async fn insert(&self, record: ModelRecord) -> Result<()> {
        {
            let mut records = self.records.write().await;
            records.insert(record.name.clone(), record);
        }
        self.save().await
    }

    /// Get a record by name
    pub async fn get(&self, name: &str) -> Option<ModelRecord> {
        let records = self.records.read().await;
        records.get(name).cloned()
    }

    /// Check if a name is registered
    pub async fn contains(&self, name: &str) -> bool {
        let records = self.records.read().await;
        records.contains_key(name)
    }

    /// List all records, sorted by name
    pub async fn list(&self) -> Vec<ModelRecord> {
        let records = self.records.read().await;
        let mut entries: Vec<_> = records.values().cloned().collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }

    /// List all registered names, sorted
    pub async fn names(&self) -> Vec<String> {
        let records = self.records.read().await;
        let mut names: Vec<_> = records.keys().cloned().collect();
        names.sort();
        names
    }

    /// Get count of registered models
    pub async fn count(&self) -> usize {
        let records = self.records.read().await;
        records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn registry_path(dir: &TempDir) -> PathBuf {
        dir.path().join("model_registry.json")
    }

    #[test]
    fn test_kind_round_trip() {
        for tag in [
            "question_generation",
            "answer_generation",
            "distractor_generation",
        ] {
            let kind = ModelKind::from(tag);
            assert!(kind.is_known());
            assert_eq!(kind.as_str(), tag);
        }
    }

    #[test]
    fn test_kind_unknown_tag_preserved() {
        let kind = ModelKind::from("summarization");
        assert!(!kind.is_known());
        assert_eq!(kind.to_string(), "summarization");
    }

    #[test]
    fn test_kind_serde_as_plain_string() {
        let json = serde_json::to_string(&ModelKind::QuestionGeneration).unwrap();
        assert_eq!(json, "\"question_generation\"");

        let parsed: ModelKind = serde_json::from_str("\"distractor_generation\"").unwrap();
        assert_eq!(parsed, ModelKind::DistractorGeneration);

        let unknown: ModelKind = serde_json::from_str("\"weird_kind\"").unwrap();
        assert_eq!(unknown, ModelKind::Other("weird_kind".to_string()));
    }

    #[test]
    fn test_record_serializes_type_field() {
        let record = ModelRecord::new(
            "question_generation",
            "/m/question_generation/models",
            ModelKind::QuestionGeneration,
        );
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"type\":\"question_generation\""));
    }

    #[tokio::test]
    async fn test_open_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = RegistryStore::open(registry_path(&dir)).await.unwrap();
        assert_eq!(store.count().await, 0);
        assert!(store.names().await.is_empty());
    }

    #[tokio::test]
    async fn test_open_corrupt_file_fails() {
        let dir = TempDir::new().unwrap();
        let path = registry_path(&dir);
        std::fs::write(&path, "not valid json").unwrap();
        assert!(RegistryStore::open(path).await.is_err());
    }

    #[tokio::test]
    async fn test_save_open_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = registry_path(&dir);

        let store = RegistryStore::open(&path).await.unwrap();
        store
            .insert(ModelRecord::new(
                "question_generation",
                "/m/qg/models",
                ModelKind::QuestionGeneration,
            ))
            .await
            .unwrap();
        store
            .insert(ModelRecord::new(
                "custom",
                "/m/custom/models",
                ModelKind::Other("custom".to_string()),
            ))
            .await
            .unwrap();

        let before = store.list().await;

        let reopened = RegistryStore::open(&path).await.unwrap();
        assert_eq!(reopened.list().await, before);
    }

    #[tokio::test]
    async fn test_scan_registers_only_folders_with_artifacts() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("models");
        std::fs::create_dir_all(base.join("question_generation/models")).unwrap();
        std::fs::create_dir_all(base.join("unknown_kind")).unwrap();

        let store = RegistryStore::open(registry_path(&dir)).await.unwrap();
        let discovered = store.scan(&base).await.unwrap();

        assert_eq!(discovered.len(), 1);
        assert_eq!(discovered[0].name, "question_generation");
        assert_eq!(discovered[0].kind, ModelKind::QuestionGeneration);
        assert_eq!(
            discovered[0].path,
            base.join("question_generation/models")
        );

        assert!(store.contains("question_generation").await);
        assert!(!store.contains("unknown_kind").await);
    }

    #[tokio::test]
    async fn test_scan_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("models");
        std::fs::create_dir_all(base.join("question_generation/models")).unwrap();
        std::fs::create_dir_all(base.join("answer_generation/models")).unwrap();

        let store = RegistryStore::open(registry_path(&dir)).await.unwrap();
        store.scan(&base).await.unwrap();
        let first = store.list().await;

        store.scan(&base).await.unwrap();
        let second = store.list().await;

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_scan_persists_immediately() {
        let dir = TempDir::new().unwrap();
        let path = registry_path(&dir);
        let base = dir.path().join("models");
        std::fs::create_dir_all(base.join("answer_generation/models")).unwrap();

        let store = RegistryStore::open(&path).await.unwrap();
        store.scan(&base).await.unwrap();

        let reopened = RegistryStore::open(&path).await.unwrap();
        assert!(reopened.contains("answer_generation").await);
    }

    #[tokio::test]
    async fn test_scan_missing_base_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = RegistryStore::open(registry_path(&dir)).await.unwrap();
        let discovered = store
            .scan(&dir.path().join("does-not-exist"))
            .await
            .unwrap();
        assert!(discovered.is_empty());
    }

    #[tokio::test]
    async fn test_scan_never_deletes_stale_records() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("models");
        std::fs::create_dir_all(&base).unwrap();

        let store = RegistryStore::open(registry_path(&dir)).await.unwrap();
        store
            .insert(ModelRecord::new(
                "question_generation",
                "/gone/models",
                ModelKind::QuestionGeneration,
            ))
            .await
            .unwrap();

        store.scan(&base).await.unwrap();
        assert!(store.contains("question_generation").await);
    }

    #[tokio::test]
    async fn test_upsert_preserves_registered_at() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("models");
        std::fs::create_dir_all(base.join("question_generation/models")).unwrap();

        let store = RegistryStore::open(registry_path(&dir)).await.unwrap();
        store.scan(&base).await.unwrap();
        let first = store.get("question_generation").await.unwrap();

        store.scan(&base).await.unwrap();
        let second = store.get("question_generation").await.unwrap();

        assert_eq!(first.registered_at, second.registered_at);
    }

    #[tokio::test]
    async fn test_list_is_sorted() {
        let dir = TempDir::new().unwrap();
        let store = RegistryStore::open(registry_path(&dir)).await.unwrap();

        store
            .insert(ModelRecord::new("b", "/b", ModelKind::Other("b".into())))
            .await
            .unwrap();
        store
            .insert(ModelRecord::new("a", "/a", ModelKind::Other("a".into())))
            .await
            .unwrap();

        let names = store.names().await;
        assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
    }
}
