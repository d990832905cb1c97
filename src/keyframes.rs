//! Adaptive keyframe sampling and extraction.
//!
//! A video of arbitrary length is represented by a bounded, evenly covering
//! frame set. The sampling plan is a pure function of duration; extraction
//! materializes frames into a caller-supplied scratch directory via ffmpeg.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::AssetError;

/// Hard ceiling for long clips. When a 30s grid would exceed this, the
/// samples are redistributed evenly across the full duration instead of
/// being dropped from the end, so coverage of the whole clip is preserved.
pub const MAX_SAMPLES: usize = 20;

/// Ordered timestamp offsets (seconds) at which frames must be captured.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyframePlan {
    pub timestamps: Vec<f64>,
}

impl KeyframePlan {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

/// Compute the sampling plan for a clip of the given duration.
///
/// Policy (monotonic in duration):
/// - under 10s: start, middle, end
/// - 10s to 60s: every 5s
/// - 60s to 5min: every 15s
/// - over 5min: every 30s, capped at [`MAX_SAMPLES`] with even redistribution
pub fn plan_samples(duration_secs: f64) -> KeyframePlan {
    if duration_secs <= 0.0 {
        return KeyframePlan { timestamps: vec![0.0] };
    }

    let timestamps = if duration_secs < 10.0 {
        let mut ts = vec![0.0, duration_secs / 2.0, duration_secs];
        ts.dedup_by(|a, b| (*a - *b).abs() < f64::EPSILON);
        ts
    } else if duration_secs <= 60.0 {
        grid(duration_secs, 5.0)
    } else if duration_secs <= 300.0 {
        grid(duration_secs, 15.0)
    } else {
        let sparse = grid(duration_secs, 30.0);
        if sparse.len() > MAX_SAMPLES {
            (0..MAX_SAMPLES)
                .map(|i| i as f64 * duration_secs / (MAX_SAMPLES - 1) as f64)
                .collect()
        } else {
            sparse
        }
    };

    KeyframePlan { timestamps }
}

fn grid(duration: f64, step: f64) -> Vec<f64> {
    let count = (duration / step).floor() as usize;
    (0..=count).map(|i| i as f64 * step).collect()
}

/// One extracted frame, as recorded in `keyframes_info.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameRecord {
    pub index: usize,
    pub timestamp_seconds: f64,
    pub timestamp_formatted: String,
    pub path: PathBuf,
}

/// Extract one JPEG per planned timestamp into `output_dir`.
///
/// Any ffmpeg non-zero exit fails the whole asset with the tool's stderr;
/// the failure is scoped to this file and never stops other entries.
/// Writes a `keyframes_info.json` index beside the frames.
pub fn extract(
    video: &Path,
    plan: &KeyframePlan,
    output_dir: &Path,
) -> Result<Vec<PathBuf>, AssetError> {
    std::fs::create_dir_all(output_dir).map_err(|e| AssetError::Io {
        file: video.to_path_buf(),
        source: e,
    })?;

    let mut frames = Vec::with_capacity(plan.len());

    for (i, &ts) in plan.timestamps.iter().enumerate() {
        let index = i + 1;
        let output_file = output_dir.join(format!("frame_{:03}.jpg", index));
        let video_str = video.to_string_lossy();
        let out_str = output_file.to_string_lossy();
        let ts_str = format!("{:.2}", ts);

        let output = Command::new("ffmpeg")
            .args([
                "-y",
                "-ss",
                &ts_str,
                "-i",
                video_str.as_ref(),
                "-frames:v",
                "1",
                "-q:v",
                "2",
                out_str.as_ref(),
            ])
            .output()
            .map_err(|e| AssetError::Tool {
                tool: "ffmpeg",
                file: video.to_path_buf(),
                detail: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail: String = stderr.chars().take(200).collect();
            return Err(AssetError::Tool {
                tool: "ffmpeg",
                file: video.to_path_buf(),
                detail: format!("frame at {}s: {}", ts_str, detail),
            });
        }

        tracing::debug!(video = %video.display(), ts = %ts_str, "extracted keyframe");
        frames.push(FrameRecord {
            index,
            timestamp_seconds: ts,
            timestamp_formatted: format_timestamp(ts),
            path: output_file,
        });
    }

    let info = serde_json::json!({
        "source_video": video,
        "frame_count": frames.len(),
        "frames": frames,
    });
    let info_path = output_dir.join("keyframes_info.json");
    std::fs::write(&info_path, serde_json::to_string_pretty(&info).unwrap_or_default()).map_err(
        |e| AssetError::Io {
            file: video.to_path_buf(),
            source: e,
        },
    )?;

    Ok(frames.into_iter().map(|f| f.path).collect())
}

/// Format seconds as HH:MM:SS.mm, or MM:SS.mm under an hour.
pub fn format_timestamp(seconds: f64) -> String {
    let h = (seconds / 3600.0) as u64;
    let m = ((seconds % 3600.0) / 60.0) as u64;
    let s = seconds % 60.0;
    if h > 0 {
        format!("{:02}:{:02}:{:05.2}", h, m, s)
    } else {
        format!("{:02}:{:05.2}", m, s)
    }
}
