//! Technical metadata probing via external tools.
//!
//! Video files go through `ffprobe`, photos through `exiftool`. Both tools
//! emit JSON; the adapter shells out, parses, and maps the fields we keep.
//! The tools themselves are opaque: a missing binary is a startup diagnostic,
//! a per-file failure stays scoped to that file.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Command;

use crate::error::AssetError;
use crate::scanner::MediaKind;

/// Kind-specific technical metadata attached to exactly one asset.
/// Video fields and photo fields are both present; whichever probe ran
/// fills its side and leaves the rest unset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TechnicalMetadata {
    #[serde(default)]
    pub file_size_bytes: Option<u64>,

    // Video
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    #[serde(default)]
    pub width: Option<i64>,
    #[serde(default)]
    pub height: Option<i64>,
    #[serde(default)]
    pub codec: Option<String>,
    #[serde(default)]
    pub frame_rate: Option<f64>,
    #[serde(default)]
    pub bit_rate: Option<i64>,

    // Photo
    #[serde(default)]
    pub camera_model: Option<String>,
    #[serde(default)]
    pub lens: Option<String>,
    #[serde(default)]
    pub iso: Option<i64>,
    #[serde(default)]
    pub aperture: Option<String>,
    #[serde(default)]
    pub shutter_speed: Option<String>,
    #[serde(default)]
    pub gps_lat: Option<f64>,
    #[serde(default)]
    pub gps_lon: Option<f64>,
    #[serde(default)]
    pub date_taken: Option<String>,
}

/// The probing boundary. The pipeline only sees this trait; production code
/// uses [`ToolProbe`], tests substitute a stub.
pub trait Probe: Send + Sync {
    fn probe(&self, path: &Path, kind: MediaKind) -> Result<TechnicalMetadata, AssetError>;
}

/// Probe implementation backed by ffprobe and exiftool subprocesses.
pub struct ToolProbe;

impl Probe for ToolProbe {
    fn probe(&self, path: &Path, kind: MediaKind) -> Result<TechnicalMetadata, AssetError> {
        match kind {
            MediaKind::Video => probe_video(path),
            MediaKind::Photo => probe_photo(path),
        }
    }
}

/// Verify that the external tools are resolvable. Called once at startup;
/// absence here is fatal to the run, never a per-file failure.
pub fn check_tools() -> anyhow::Result<()> {
    for (bin, arg) in [("ffprobe", "-version"), ("ffmpeg", "-version"), ("exiftool", "-ver")] {
        Command::new(bin)
            .arg(arg)
            .output()
            .map_err(|e| anyhow::anyhow!("{} not found on PATH: {}", bin, e))?;
    }
    Ok(())
}

fn run_tool(
    tool: &'static str,
    args: &[&str],
    file: &Path,
) -> Result<String, AssetError> {
    let output = Command::new(tool)
        .args(args)
        .output()
        .map_err(|e| AssetError::Tool {
            tool,
            file: file.to_path_buf(),
            detail: e.to_string(),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let detail: String = stderr.chars().take(200).collect();
        return Err(AssetError::Tool {
            tool,
            file: file.to_path_buf(),
            detail,
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

fn probe_video(path: &Path) -> Result<TechnicalMetadata, AssetError> {
    let path_str = path.to_string_lossy();
    let stdout = run_tool(
        "ffprobe",
        &[
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
            path_str.as_ref(),
        ],
        path,
    )?;

    parse_ffprobe_output(&stdout).map_err(|detail| AssetError::ProbeOutput {
        tool: "ffprobe",
        file: path.to_path_buf(),
        detail,
    })
}

fn probe_photo(path: &Path) -> Result<TechnicalMetadata, AssetError> {
    let path_str = path.to_string_lossy();
    let stdout = run_tool("exiftool", &["-json", "-n", path_str.as_ref()], path)?;

    parse_exiftool_output(&stdout).map_err(|detail| AssetError::ProbeOutput {
        tool: "exiftool",
        file: path.to_path_buf(),
        detail,
    })
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    bit_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<i64>,
    height: Option<i64>,
    r_frame_rate: Option<String>,
}

fn parse_ffprobe_output(stdout: &str) -> Result<TechnicalMetadata, String> {
    let parsed: FfprobeOutput =
        serde_json::from_str(stdout).map_err(|e| format!("bad json: {}", e))?;

    let duration = parsed
        .format
        .duration
        .as_deref()
        .and_then(|d| d.parse::<f64>().ok())
        .ok_or_else(|| "missing format.duration".to_string())?;

    let stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"));

    Ok(TechnicalMetadata {
        duration_seconds: Some(duration),
        width: stream.and_then(|s| s.width),
        height: stream.and_then(|s| s.height),
        codec: stream.and_then(|s| s.codec_name.clone()),
        frame_rate: stream
            .and_then(|s| s.r_frame_rate.as_deref())
            .and_then(parse_frame_rate),
        bit_rate: parsed
            .format
            .bit_rate
            .as_deref()
            .and_then(|b| b.parse::<i64>().ok()),
        ..Default::default()
    })
}

/// ffprobe reports frame rate as a rational like "30000/1001".
fn parse_frame_rate(raw: &str) -> Option<f64> {
    if let Some((num, den)) = raw.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if den == 0.0 {
            return None;
        }
        Some(num / den)
    } else {
        raw.parse().ok()
    }
}

fn parse_exiftool_output(stdout: &str) -> Result<TechnicalMetadata, String> {
    let parsed: Vec<serde_json::Value> =
        serde_json::from_str(stdout).map_err(|e| format!("bad json: {}", e))?;
    let fields = parsed
        .first()
        .ok_or_else(|| "empty exiftool output".to_string())?;

    let as_i64 = |key: &str| fields.get(key).and_then(|v| v.as_i64());
    let as_f64 = |key: &str| fields.get(key).and_then(|v| v.as_f64());
    let as_string = |key: &str| {
        fields.get(key).and_then(|v| match v {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    };

    Ok(TechnicalMetadata {
        width: as_i64("ImageWidth"),
        height: as_i64("ImageHeight"),
        camera_model: as_string("Model"),
        lens: as_string("LensModel").or_else(|| as_string("LensID")),
        iso: as_i64("ISO"),
        aperture: as_string("Aperture").or_else(|| as_string("FNumber")),
        shutter_speed: as_string("ShutterSpeed").or_else(|| as_string("ExposureTime")),
        gps_lat: as_f64("GPSLatitude"),
        gps_lon: as_f64("GPSLongitude"),
        date_taken: as_string("DateTimeOriginal").or_else(|| as_string("CreateDate")),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_rate() {
        assert_eq!(parse_frame_rate("30/1"), Some(30.0));
        assert_eq!(parse_frame_rate("25"), Some(25.0));
        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate("garbage"), None);

        let ntsc = parse_frame_rate("30000/1001").unwrap();
        assert!((ntsc - 29.97).abs() < 0.01);
    }

    #[test]
    fn test_parse_ffprobe_output() {
        let stdout = r#"{
            "streams": [
                {"codec_type": "audio", "codec_name": "aac"},
                {"codec_type": "video", "codec_name": "h264", "width": 1920,
                 "height": 1080, "r_frame_rate": "30000/1001"}
            ],
            "format": {"duration": "42.5", "bit_rate": "8000000"}
        }"#;

        let meta = parse_ffprobe_output(stdout).unwrap();
        assert_eq!(meta.duration_seconds, Some(42.5));
        assert_eq!(meta.width, Some(1920));
        assert_eq!(meta.height, Some(1080));
        assert_eq!(meta.codec.as_deref(), Some("h264"));
        assert_eq!(meta.bit_rate, Some(8_000_000));
        assert!(meta.frame_rate.unwrap() > 29.0);
    }

    #[test]
    fn test_parse_ffprobe_output_missing_duration() {
        let stdout = r#"{"streams": [], "format": {}}"#;
        assert!(parse_ffprobe_output(stdout).is_err());
    }

    #[test]
    fn test_parse_exiftool_output() {
        let stdout = r#"[{
            "ImageWidth": 6000,
            "ImageHeight": 4000,
            "Model": "ILCE-7M4",
            "LensModel": "FE 24-70mm F2.8 GM",
            "ISO": 400,
            "Aperture": 2.8,
            "ShutterSpeed": "1/250",
            "GPSLatitude": 51.5074,
            "GPSLongitude": -0.1278,
            "DateTimeOriginal": "2024:06:01 14:30:00"
        }]"#;

        let meta = parse_exiftool_output(stdout).unwrap();
        assert_eq!(meta.width, Some(6000));
        assert_eq!(meta.camera_model.as_deref(), Some("ILCE-7M4"));
        assert_eq!(meta.iso, Some(400));
        assert_eq!(meta.aperture.as_deref(), Some("2.8"));
        assert_eq!(meta.gps_lat, Some(51.5074));
        assert_eq!(meta.date_taken.as_deref(), Some("2024:06:01 14:30:00"));
    }

    #[test]
    fn test_parse_exiftool_output_empty() {
        assert!(parse_exiftool_output("[]").is_err());
        assert!(parse_exiftool_output("not json").is_err());
    }
}
