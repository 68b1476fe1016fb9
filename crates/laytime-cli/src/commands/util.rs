//! Shared utilities for CLI commands.

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

use laytime_core::{DocumentType, ExtractedDocument};

/// Loads one extracted document from a JSON file.
///
/// When the payload lacks a `document_type` key and a fallback is supplied
/// (the flag the path arrived through), the fallback is injected.
pub fn load_document(path: &Path, fallback: Option<DocumentType>) -> Result<ExtractedDocument> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let mut value: Value = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;

    if value.get("document_type").is_none() {
        if let (Some(map), Some(kind)) = (value.as_object_mut(), fallback) {
            map.insert(
                "document_type".to_string(),
                Value::String(kind.to_string()),
            );
        }
    }

    ExtractedDocument::from_value(value)
        .with_context(|| format!("{} has no usable document_type", path.display()))
}

/// Loads every `.json` document in a voyage directory, sorted by file name.
///
/// Files without a recognizable `document_type` are skipped with a warning.
pub fn load_documents_from_dir(dir: &Path) -> Result<Vec<ExtractedDocument>> {
    let mut paths: Vec<_> = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read {}", dir.display()))?
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    let mut documents = Vec::new();
    for path in paths {
        match load_document(&path, None) {
            Ok(document) => documents.push(document),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "skipping document");
            }
        }
    }
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_document_injects_fallback_type() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("sof.json");
        std::fs::write(&path, r#"{"Chronological Events": []}"#).unwrap();

        let document = load_document(&path, Some(DocumentType::Sof)).unwrap();
        assert_eq!(document.document_type, DocumentType::Sof);
    }

    #[test]
    fn load_document_prefers_embedded_type() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("doc.json");
        std::fs::write(&path, r#"{"document_type": "contract", "Sections": []}"#).unwrap();

        let document = load_document(&path, Some(DocumentType::Sof)).unwrap();
        assert_eq!(document.document_type, DocumentType::Contract);
    }

    #[test]
    fn load_document_fails_without_any_type() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("doc.json");
        std::fs::write(&path, r"{}").unwrap();

        assert!(load_document(&path, None).is_err());
    }

    #[test]
    fn dir_loader_skips_unusable_files() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(
            temp.path().join("a-sof.json"),
            r#"{"document_type": "sof", "Chronological Events": []}"#,
        )
        .unwrap();
        std::fs::write(temp.path().join("b-junk.json"), "not json").unwrap();
        std::fs::write(temp.path().join("notes.txt"), "ignored").unwrap();

        let documents = load_documents_from_dir(temp.path()).unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].document_type, DocumentType::Sof);
    }
}
