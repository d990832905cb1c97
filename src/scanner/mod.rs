//! Directory scanning and manifest building.
//!
//! The scanner walks a media tree, classifies files by extension and emits an
//! ordered manifest. It never writes to the tree; sidecar presence decides
//! whether a file is skipped on re-runs.

pub mod discovery;

use anyhow::Result;
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::ScannerConfig;
use crate::sidecar;

pub use discovery::{classify, discover_media};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Photo,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Photo => "photo",
            MediaKind::Video => "video",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntryStatus {
    Pending,
    SkippedExisting,
    Failed,
}

/// One discovered file. Immutable once emitted; consumed by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub filepath: PathBuf,
    pub filename: String,
    pub file_type: MediaKind,
    pub file_size_bytes: u64,
    pub modified: Option<String>,
    pub status: EntryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub scan_date: String,
    pub source_folder: PathBuf,
    pub file_count: usize,
    pub files: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn pending(&self) -> impl Iterator<Item = &ManifestEntry> + '_ {
        self.files.iter().filter(|e| e.status == EntryStatus::Pending)
    }

    pub fn pending_count(&self) -> usize {
        self.pending().count()
    }

    pub fn skipped_count(&self) -> usize {
        self.files
            .iter()
            .filter(|e| e.status == EntryStatus::SkippedExisting)
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.files
            .iter()
            .filter(|e| e.status == EntryStatus::Failed)
            .count()
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Human-readable scan summary for operator feedback.
    pub fn summary(&self) -> String {
        let pending: Vec<_> = self.pending().collect();
        let photos = pending
            .iter()
            .filter(|e| e.file_type == MediaKind::Photo)
            .count();
        let videos = pending
            .iter()
            .filter(|e| e.file_type == MediaKind::Video)
            .count();
        let total_bytes: u64 = pending.iter().map(|e| e.file_size_bytes).sum();

        let size = if total_bytes > 1_000_000_000 {
            format!("{:.1} GB", total_bytes as f64 / 1e9)
        } else {
            format!("{:.1} MB", total_bytes as f64 / 1e6)
        };

        format!(
            "Total found:  {}\nTo process:   {} ({} photos, {} videos)\nAlready done: {}\nUnreadable:   {}\nTotal size:   {}",
            self.file_count,
            pending.len(),
            photos,
            videos,
            self.skipped_count(),
            self.failed_count(),
            size,
        )
    }
}

/// Walk `root` and build the ordered manifest.
///
/// Files whose sidecar already exists are marked `skipped-existing` unless
/// `force` is set. A file that vanishes between discovery and stat is
/// reported as a failed entry rather than aborting the scan.
pub fn scan(root: &Path, config: &ScannerConfig, force: bool) -> Result<Manifest> {
    let media = discover_media(root, config)?;
    let mut files = Vec::with_capacity(media.len());

    for (path, kind) in media {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let metadata = match std::fs::metadata(&path) {
            Ok(m) => m,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "file vanished mid-scan");
                files.push(ManifestEntry {
                    filepath: path,
                    filename,
                    file_type: kind,
                    file_size_bytes: 0,
                    modified: None,
                    status: EntryStatus::Failed,
                    reason: Some(format!("unreadable: {}", err)),
                });
                continue;
            }
        };

        let modified = metadata
            .modified()
            .ok()
            .map(|t| DateTime::<Local>::from(t).to_rfc3339());

        let has_sidecar = sidecar::sidecar_path(&path, &config.sidecar_suffix).exists();
        let (status, reason) = if has_sidecar && !force {
            (EntryStatus::SkippedExisting, Some("sidecar exists".to_string()))
        } else {
            (EntryStatus::Pending, None)
        };

        files.push(ManifestEntry {
            filepath: path,
            filename,
            file_type: kind,
            file_size_bytes: metadata.len(),
            modified,
            status,
            reason,
        });
    }

    Ok(Manifest {
        scan_date: Utc::now().to_rfc3339(),
        source_folder: root.to_path_buf(),
        file_count: files.len(),
        files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_scan_marks_sidecarred_files_skipped() {
        let dir = tempdir().unwrap();
        File::create(dir.path().join("a.jpg")).unwrap();
        File::create(dir.path().join("b.jpg")).unwrap();
        File::create(dir.path().join("a.jpg.meta.json")).unwrap();

        let config = ScannerConfig::default();
        let manifest = scan(dir.path(), &config, false).unwrap();

        assert_eq!(manifest.file_count, 2);
        assert_eq!(manifest.pending_count(), 1);
        assert_eq!(manifest.skipped_count(), 1);
        assert_eq!(manifest.files[0].status, EntryStatus::SkippedExisting);
        assert_eq!(manifest.files[1].status, EntryStatus::Pending);
    }

    #[test]
    fn test_scan_force_reprocesses_sidecarred_files() {
        let dir = tempdir().unwrap();
        File::create(dir.path().join("a.jpg")).unwrap();
        File::create(dir.path().join("a.jpg.meta.json")).unwrap();

        let config = ScannerConfig::default();
        let manifest = scan(dir.path(), &config, true).unwrap();

        assert_eq!(manifest.pending_count(), 1);
        assert_eq!(manifest.skipped_count(), 0);
    }

    #[test]
    fn test_scan_is_deterministic() {
        let dir = tempdir().unwrap();
        for name in ["z.mp4", "m.jpg", "a.png"] {
            let mut f = File::create(dir.path().join(name)).unwrap();
            f.write_all(b"data").unwrap();
        }
        fs::create_dir(dir.path().join("nested")).unwrap();
        File::create(dir.path().join("nested/deep.mov")).unwrap();

        let config = ScannerConfig::default();
        let first = scan(dir.path(), &config, false).unwrap();
        let second = scan(dir.path(), &config, false).unwrap();

        let first_paths: Vec<_> = first.files.iter().map(|e| e.filepath.clone()).collect();
        let second_paths: Vec<_> = second.files.iter().map(|e| e.filepath.clone()).collect();
        assert_eq!(first_paths, second_paths);
        assert!(first_paths.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_manifest_summary_counts() {
        let dir = tempdir().unwrap();
        let mut f = File::create(dir.path().join("clip.mp4")).unwrap();
        f.write_all(&[0u8; 1024]).unwrap();
        File::create(dir.path().join("pic.jpg")).unwrap();
        File::create(dir.path().join("pic.jpg.meta.json")).unwrap();

        let config = ScannerConfig::default();
        let manifest = scan(dir.path(), &config, false).unwrap();
        let summary = manifest.summary();

        assert!(summary.contains("Total found:  2"));
        assert!(summary.contains("To process:   1 (0 photos, 1 videos)"));
        assert!(summary.contains("Already done: 1"));
    }
}
