//! Pipeline orchestration: scan -> probe -> keyframes -> analyze -> sidecar
//! -> catalog, over a bounded worker pool.
//!
//! The defining property is partial-failure isolation: any per-file error is
//! recorded against that file in the run summary and the batch keeps going.
//! Only failure to open the catalog aborts a run.

use anyhow::Result;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::analyzer::Analyzer;
use crate::config::Config;
use crate::db::{normalize_tag, Catalog};
use crate::error::AssetError;
use crate::keyframes;
use crate::probe::Probe;
use crate::scanner::{self, EntryStatus, ManifestEntry, MediaKind};
use crate::sidecar::{self, Sidecar};

#[derive(Debug, Clone)]
pub struct FileFailure {
    pub path: PathBuf,
    pub cause: String,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub tags_written: usize,
    pub failures: Vec<FileFailure>,
}

impl RunSummary {
    pub fn report(&self) -> String {
        let mut out = format!(
            "Processed:    {}\nSkipped:      {}\nFailed:       {}\nTags written: {}",
            self.processed, self.skipped, self.failed, self.tags_written
        );
        for failure in &self.failures {
            out.push_str(&format!("\n  FAILED {}: {}", failure.path.display(), failure.cause));
        }
        out
    }
}

pub struct Pipeline<'a> {
    config: &'a Config,
    probe: &'a dyn Probe,
    analyzer: &'a dyn Analyzer,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a Config, probe: &'a dyn Probe, analyzer: &'a dyn Analyzer) -> Self {
        Self {
            config,
            probe,
            analyzer,
        }
    }

    /// Run the full ingest over `root`.
    ///
    /// Manifest entries may complete out of order; catalog writes are
    /// serialized through the mutex so an asset row and its tag set never
    /// diverge. Re-running over an unchanged tree with `force` unset is a
    /// no-op: everything already has a sidecar.
    pub fn run(&self, root: &Path, catalog: &Mutex<Catalog>, force: bool) -> Result<RunSummary> {
        let manifest = scanner::scan(root, &self.config.scanner, force)?;

        let mut summary = RunSummary {
            skipped: manifest.skipped_count(),
            ..Default::default()
        };

        // Files that vanished or were unreadable during the scan
        for entry in manifest.files.iter().filter(|e| e.status == EntryStatus::Failed) {
            summary.failed += 1;
            summary.failures.push(FileFailure {
                path: entry.filepath.clone(),
                cause: entry.reason.clone().unwrap_or_else(|| "unreadable".to_string()),
            });
        }

        let pending: Vec<&ManifestEntry> = manifest.pending().collect();
        tracing::info!(
            root = %root.display(),
            pending = pending.len(),
            skipped = summary.skipped,
            "starting ingest"
        );

        let workers = self.config.pipeline.workers.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()?;

        let results: Vec<(PathBuf, Result<usize, AssetError>)> = pool.install(|| {
            pending
                .par_iter()
                .map(|entry| {
                    (
                        entry.filepath.clone(),
                        self.process_entry(entry, catalog),
                    )
                })
                .collect()
        });

        for (path, result) in results {
            match result {
                Ok(tags) => {
                    summary.processed += 1;
                    summary.tags_written += tags;
                }
                Err(err) => {
                    tracing::error!(path = %path.display(), error = %err, "asset failed");
                    summary.failed += 1;
                    summary.failures.push(FileFailure {
                        path,
                        cause: err.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            processed = summary.processed,
            failed = summary.failed,
            tags = summary.tags_written,
            "ingest finished"
        );
        Ok(summary)
    }

    /// Process one pending entry end to end. Returns the number of distinct
    /// tags written for the asset.
    fn process_entry(
        &self,
        entry: &ManifestEntry,
        catalog: &Mutex<Catalog>,
    ) -> Result<usize, AssetError> {
        tracing::debug!(path = %entry.filepath.display(), kind = %entry.file_type, "processing");

        let mut technical = self.probe.probe(&entry.filepath, entry.file_type)?;
        technical.file_size_bytes = Some(entry.file_size_bytes);

        // Scratch dir (video only) lives until the analyzer has consumed the frames
        let mut keyframe_count = 0;
        let (frames, _scratch) = match entry.file_type {
            MediaKind::Video => {
                let duration = technical.duration_seconds.unwrap_or(0.0);
                let plan = keyframes::plan_samples(duration);
                let scratch = tempfile::Builder::new()
                    .prefix("mediacat-frames-")
                    .tempdir()
                    .map_err(|e| AssetError::Io {
                        file: entry.filepath.clone(),
                        source: e,
                    })?;
                let frames = keyframes::extract(&entry.filepath, &plan, scratch.path())?;
                keyframe_count = frames.len();
                (frames, Some(scratch))
            }
            MediaKind::Photo => (vec![entry.filepath.clone()], None),
        };

        let annotation = self
            .analyzer
            .analyze(&frames, entry.file_type)
            .map_err(|e| AssetError::Analysis {
                file: entry.filepath.clone(),
                detail: e.to_string(),
            })?;
        annotation.validate().map_err(|detail| AssetError::Data {
            file: entry.filepath.clone(),
            detail,
        })?;

        let record = Sidecar::from_parts(entry, technical, annotation, keyframe_count);

        // Sidecar first: it is the durable record the catalog can be rebuilt from
        let sc_path = sidecar::sidecar_path(&entry.filepath, &self.config.scanner.sidecar_suffix);
        record.write(&sc_path).map_err(|e| AssetError::Io {
            file: entry.filepath.clone(),
            source: std::io::Error::other(e.to_string()),
        })?;

        let tag_count = {
            let mut normalized: Vec<String> = record
                .tags
                .iter()
                .map(|t| normalize_tag(t))
                .filter(|t| !t.is_empty())
                .collect();
            normalized.sort();
            normalized.dedup();
            normalized.len()
        };

        let mut cat = catalog.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        cat.upsert_asset(&record).map_err(|e| AssetError::Store {
            file: entry.filepath.clone(),
            detail: e.to_string(),
        })?;

        Ok(tag_count)
    }
}
