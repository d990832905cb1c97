//! Per-asset failure taxonomy.
//!
//! Errors scoped to a single manifest entry are carried as [`AssetError`] so
//! the pipeline can record them against the file and keep going. Batch-level
//! failures (catalog unavailable, bad arguments) use `anyhow` directly.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssetError {
    /// An external tool exited non-zero or could not be spawned.
    #[error("{tool} failed for {}: {detail}", file.display())]
    Tool {
        tool: &'static str,
        file: PathBuf,
        detail: String,
    },

    /// A tool ran but its output could not be parsed.
    #[error("could not parse {tool} output for {}: {detail}", file.display())]
    ProbeOutput {
        tool: &'static str,
        file: PathBuf,
        detail: String,
    },

    /// The analyzer returned an error or an unusable payload.
    #[error("analysis failed for {}: {detail}", file.display())]
    Analysis { file: PathBuf, detail: String },

    /// A sidecar or annotation failed shape validation.
    #[error("invalid metadata for {}: {detail}", file.display())]
    Data { file: PathBuf, detail: String },

    /// The catalog rejected the upsert; the transaction was rolled back.
    #[error("catalog write failed for {}: {detail}", file.display())]
    Store { file: PathBuf, detail: String },

    /// Filesystem error while handling this asset.
    #[error("io error for {}: {source}", file.display())]
    Io {
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl AssetError {
    /// The file this failure is scoped to.
    pub fn file(&self) -> &PathBuf {
        match self {
            AssetError::Tool { file, .. }
            | AssetError::ProbeOutput { file, .. }
            | AssetError::Analysis { file, .. }
            | AssetError::Data { file, .. }
            | AssetError::Store { file, .. }
            | AssetError::Io { file, .. } => file,
        }
    }
}
