use anyhow::Result;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use super::MediaKind;
use crate::config::ScannerConfig;

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|s| s.starts_with('.'))
            .unwrap_or(false)
}

/// Classify a path against the photo/video extension allowlists.
/// Files outside both lists are not media and return `None`.
pub fn classify(path: &Path, config: &ScannerConfig) -> Option<MediaKind> {
    let ext = path.extension()?.to_string_lossy().to_lowercase();
    if config.photo_extensions.iter().any(|e| e.to_lowercase() == ext) {
        Some(MediaKind::Photo)
    } else if config.video_extensions.iter().any(|e| e.to_lowercase() == ext) {
        Some(MediaKind::Video)
    } else {
        None
    }
}

/// Recursively discover media files under `root`, sorted by path so repeated
/// scans of an unchanged tree produce identical output.
///
/// Hidden files and directories (including `.keyframes` scratch dirs) are
/// skipped. An unreadable subtree is logged and its siblings continue.
pub fn discover_media(root: &Path, config: &ScannerConfig) -> Result<Vec<(PathBuf, MediaKind)>> {
    let mut media = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !is_hidden(e))
    {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                tracing::warn!(error = %err, "skipping unreadable path during scan");
                continue;
            }
        };

        let path = entry.path();
        if !entry.file_type().is_file() {
            continue;
        }

        if let Some(kind) = classify(path, config) {
            media.push((path.to_path_buf(), kind));
        }
    }

    // Sort by path for consistent ordering
    media.sort();

    Ok(media)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use tempfile::tempdir;

    #[test]
    fn test_discover_media_classifies_and_sorts() {
        let dir = tempdir().unwrap();

        File::create(dir.path().join("b_photo.jpg")).unwrap();
        File::create(dir.path().join("a_clip.mp4")).unwrap();
        File::create(dir.path().join("notes.txt")).unwrap();

        fs::create_dir(dir.path().join("subdir")).unwrap();
        File::create(dir.path().join("subdir/photo.HEIC")).unwrap();

        let config = ScannerConfig::default();
        let media = discover_media(dir.path(), &config).unwrap();

        assert_eq!(media.len(), 3);
        assert_eq!(media[0].1, MediaKind::Video);
        assert_eq!(media[1].1, MediaKind::Photo);
        assert_eq!(media[2].1, MediaKind::Photo);
        // Lexicographic order by path
        assert!(media[0].0 < media[1].0);
        assert!(media[1].0 < media[2].0);
    }

    #[test]
    fn test_discover_media_skips_hidden() {
        let dir = tempdir().unwrap();

        File::create(dir.path().join(".hidden.jpg")).unwrap();
        fs::create_dir(dir.path().join(".keyframes")).unwrap();
        File::create(dir.path().join(".keyframes/frame_001.jpg")).unwrap();
        File::create(dir.path().join("visible.jpg")).unwrap();

        let config = ScannerConfig::default();
        let media = discover_media(dir.path(), &config).unwrap();

        assert_eq!(media.len(), 1);
        assert!(media[0].0.ends_with("visible.jpg"));
    }

    #[test]
    fn test_discover_media_identical_across_runs() {
        let dir = tempdir().unwrap();
        for name in ["c.mp4", "a.jpg", "b.png"] {
            File::create(dir.path().join(name)).unwrap();
        }

        let config = ScannerConfig::default();
        let first = discover_media(dir.path(), &config).unwrap();
        let second = discover_media(dir.path(), &config).unwrap();

        assert_eq!(first, second);
    }
}
