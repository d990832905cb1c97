//! Per-asset sidecar documents.
//!
//! One JSON file next to each source asset, holding its full annotation and
//! technical metadata. Sidecars are the per-asset durable record; the catalog
//! is a rebuildable index over them. Their presence is what makes re-runs
//! idempotent.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::analyzer::AssetAnnotation;
use crate::probe::TechnicalMetadata;
use crate::scanner::{ManifestEntry, MediaKind};

/// Sidecar location for a source file: same directory, name plus suffix.
pub fn sidecar_path(source: &Path, suffix: &str) -> PathBuf {
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    source.with_file_name(format!("{}{}", name, suffix))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sidecar {
    pub filepath: String,
    pub filename: String,
    pub file_type: MediaKind,

    pub description: String,
    pub tags: Vec<String>,
    #[serde(default)]
    pub scene_type: String,
    #[serde(default)]
    pub mood: Vec<String>,
    #[serde(default)]
    pub time_of_day: String,
    #[serde(default)]
    pub weather: String,
    #[serde(default)]
    pub motion: String,
    #[serde(default)]
    pub shot_type: String,
    #[serde(default)]
    pub notable_elements: Vec<String>,

    #[serde(default)]
    pub technical_metadata: TechnicalMetadata,
    #[serde(default)]
    pub keyframe_count: i64,
    pub processed_at: String,
}

impl Sidecar {
    /// Assemble the sidecar for a freshly processed asset.
    pub fn from_parts(
        entry: &ManifestEntry,
        technical: TechnicalMetadata,
        annotation: AssetAnnotation,
        keyframe_count: usize,
    ) -> Self {
        Self {
            filepath: entry.filepath.to_string_lossy().to_string(),
            filename: entry.filename.clone(),
            file_type: entry.file_type,
            description: annotation.description,
            tags: annotation.tags,
            scene_type: annotation.scene_type,
            mood: annotation.mood,
            time_of_day: annotation.time_of_day,
            weather: annotation.weather,
            motion: annotation.motion,
            shot_type: annotation.shot_type,
            notable_elements: annotation.notable_elements,
            technical_metadata: technical,
            keyframe_count: keyframe_count as i64,
            processed_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Read and shape-validate a sidecar. A malformed document is rejected
    /// here so nothing partial ever reaches the store.
    pub fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading sidecar {}", path.display()))?;
        let sidecar: Sidecar = serde_json::from_str(&content)
            .with_context(|| format!("malformed sidecar {}", path.display()))?;
        sidecar
            .validate()
            .map_err(|e| anyhow!("invalid sidecar {}: {}", path.display(), e))?;
        Ok(sidecar)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("writing sidecar {}", path.display()))?;
        Ok(())
    }

    fn validate(&self) -> Result<(), String> {
        if self.filepath.is_empty() {
            return Err("filepath is empty".to_string());
        }
        if self.description.trim().is_empty() {
            return Err("description is empty".to_string());
        }
        if self.tags.iter().all(|t| t.trim().is_empty()) {
            return Err("no usable tags".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::EntryStatus;
    use tempfile::tempdir;

    fn sample_entry(dir: &Path) -> ManifestEntry {
        ManifestEntry {
            filepath: dir.join("clip.mp4"),
            filename: "clip.mp4".to_string(),
            file_type: MediaKind::Video,
            file_size_bytes: 1024,
            modified: None,
            status: EntryStatus::Pending,
            reason: None,
        }
    }

    fn sample_annotation() -> AssetAnnotation {
        AssetAnnotation {
            description: "A dog runs along a beach".to_string(),
            tags: vec!["dog".to_string(), "beach".to_string()],
            scene_type: "landscape".to_string(),
            mood: vec!["playful".to_string()],
            time_of_day: "morning".to_string(),
            weather: "sunny".to_string(),
            motion: "running".to_string(),
            shot_type: "wide".to_string(),
            notable_elements: vec!["dog".to_string()],
        }
    }

    #[test]
    fn test_sidecar_path_appends_suffix() {
        let p = sidecar_path(Path::new("/media/clip.mp4"), ".meta.json");
        assert_eq!(p, PathBuf::from("/media/clip.mp4.meta.json"));
    }

    #[test]
    fn test_sidecar_roundtrip() {
        let dir = tempdir().unwrap();
        let entry = sample_entry(dir.path());
        let sidecar = Sidecar::from_parts(
            &entry,
            TechnicalMetadata {
                duration_seconds: Some(12.5),
                ..Default::default()
            },
            sample_annotation(),
            5,
        );

        let path = sidecar_path(&entry.filepath, ".meta.json");
        sidecar.write(&path).unwrap();

        let loaded = Sidecar::read(&path).unwrap();
        assert_eq!(loaded.filename, "clip.mp4");
        assert_eq!(loaded.file_type, MediaKind::Video);
        assert_eq!(loaded.tags, vec!["dog", "beach"]);
        assert_eq!(loaded.keyframe_count, 5);
        assert_eq!(loaded.technical_metadata.duration_seconds, Some(12.5));
    }

    #[test]
    fn test_read_rejects_malformed_sidecar() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.meta.json");

        std::fs::write(&path, "{ not json").unwrap();
        assert!(Sidecar::read(&path).is_err());

        // Structurally valid JSON but missing required fields
        std::fs::write(&path, r#"{"filepath": "/x", "filename": "x"}"#).unwrap();
        assert!(Sidecar::read(&path).is_err());

        // Empty description fails validation
        std::fs::write(
            &path,
            r#"{"filepath": "/x", "filename": "x", "file_type": "photo",
                "description": "", "tags": ["a"], "processed_at": "now"}"#,
        )
        .unwrap();
        assert!(Sidecar::read(&path).is_err());
    }
}
