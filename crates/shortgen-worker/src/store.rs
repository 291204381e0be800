//! Script document persistence.
//!
//! The document is the run checkpoint. Saves validate first and publish by
//! rename, so a crash never leaves a half-written or invalid `script.json`.

use std::path::{Path, PathBuf};
use tracing::debug;

use shortgen_media::write_atomic;
use shortgen_models::{ScriptDocument, ValidationError, SCHEMA_VERSION};

use crate::error::{PipelineError, PipelineResult};

#[derive(Debug, Clone)]
pub struct DocumentStore {
    path: PathBuf,
}

impl DocumentStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> PipelineResult<ScriptDocument> {
        let raw = tokio::fs::read(&self.path).await?;
        let value: serde_json::Value = serde_json::from_slice(&raw)?;

        // Reject foreign versions before the typed parse can misread them.
        let version = value.get("version").and_then(|v| v.as_u64()).unwrap_or(0);
        if version != u64::from(SCHEMA_VERSION) {
            return Err(ValidationError::UnsupportedVersion {
                found: u32::try_from(version).unwrap_or(u32::MAX),
            }
            .into());
        }

        let doc: ScriptDocument = serde_json::from_value(value)?;
        doc.validate()?;
        debug!("Loaded {} ({} scenes, phase {})", self.path.display(), doc.scenes.len(), doc.phase);
        Ok(doc)
    }

    pub async fn save(&self, doc: &ScriptDocument) -> PipelineResult<()> {
        doc.validate()?;
        let mut body = serde_json::to_vec_pretty(doc)?;
        body.push(b'\n');
        write_atomic(&self.path, &body).await.map_err(PipelineError::from)?;
        debug!("Saved {} (phase {})", self.path.display(), doc.phase);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shortgen_models::test_support::sample_document;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = DocumentStore::new(dir.path().join("script.json"));
        let doc = sample_document(30);

        store.save(&doc).await.unwrap();
        let loaded = store.load().await.unwrap();
        assert_eq!(loaded, doc);

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\"targetDurationSeconds\": 30"));
    }

    #[tokio::test]
    async fn test_unknown_version_rejected() {
        let dir = TempDir::new().unwrap();
        let store = DocumentStore::new(dir.path().join("script.json"));
        let mut value = serde_json::to_value(sample_document(10)).unwrap();
        value["version"] = serde_json::json!(7);
        std::fs::write(store.path(), serde_json::to_vec(&value).unwrap()).unwrap();

        let err = store.load().await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Validation(ValidationError::UnsupportedVersion { found: 7 })
        ));
    }

    #[tokio::test]
    async fn test_invalid_document_not_saved() {
        let dir = TempDir::new().unwrap();
        let store = DocumentStore::new(dir.path().join("script.json"));
        let mut doc = sample_document(10);
        doc.scenes[1].duration_seconds = 4;

        let err = store.save(&doc).await.unwrap_err();
        assert!(matches!(err, PipelineError::TimingInvariant(_)));
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_unknown_enum_value_rejected() {
        let dir = TempDir::new().unwrap();
        let store = DocumentStore::new(dir.path().join("script.json"));
        let mut value = serde_json::to_value(sample_document(10)).unwrap();
        value["visualMode"] = serde_json::json!("holograms");
        std::fs::write(store.path(), serde_json::to_vec(&value).unwrap()).unwrap();

        assert!(matches!(store.load().await.unwrap_err(), PipelineError::Json(_)));
    }
}
