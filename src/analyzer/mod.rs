//! The visual-content analysis boundary.
//!
//! The pipeline treats analysis as an opaque capability: frames in,
//! [`AssetAnnotation`] out. The shipped implementation talks to an
//! OpenAI-compatible vision endpoint; tests substitute a stub.

pub mod vision;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::scanner::MediaKind;

pub use vision::VisionAnalyzer;

/// Analyzer output, validated for shape (not content) at this boundary.
///
/// `description` and `tags` are required and must be non-empty; everything
/// else defaults to empty when the payload omits it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetAnnotation {
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
}

impl AssetAnnotation {
    /// Shape validation. Rejects payloads that would produce unsearchable
    /// catalog rows rather than letting them propagate into the store.
    pub fn validate(&self) -> Result<(), String> {
        if self.description.trim().is_empty() {
            return Err("description is empty".to_string());
        }
        if self.tags.iter().all(|t| t.trim().is_empty()) {
            return Err("no usable tags".to_string());
        }
        Ok(())
    }
}

/// Capability interface the orchestrator calls for each asset.
pub trait Analyzer: Send + Sync {
    /// Analyze the given frames (a photo itself, or keyframes of a video).
    fn analyze(&self, frames: &[PathBuf], kind: MediaKind) -> Result<AssetAnnotation>;

    /// Provider name for display.
    fn name(&self) -> &'static str;
}

/// Parse a raw analyzer reply into a validated annotation.
///
/// Models often wrap JSON in markdown fences or surrounding prose; tolerate
/// that by slicing from the first `{` to the last `}`.
pub fn parse_annotation(raw: &str) -> Result<AssetAnnotation> {
    let start = raw.find('{').ok_or_else(|| anyhow!("no JSON object in analyzer reply"))?;
    let end = raw.rfind('}').ok_or_else(|| anyhow!("no JSON object in analyzer reply"))?;
    if end < start {
        return Err(anyhow!("no JSON object in analyzer reply"));
    }

    let annotation: AssetAnnotation = serde_json::from_str(&raw[start..=end])
        .map_err(|e| anyhow!("malformed annotation payload: {}", e))?;
    annotation
        .validate()
        .map_err(|e| anyhow!("invalid annotation: {}", e))?;
    Ok(annotation)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_annotation_plain_json() {
        let raw = r#"{"description": "A sunset over the ocean", "tags": ["sunset", "ocean"],
                      "scene_type": "landscape", "mood": ["calm"], "time_of_day": "evening"}"#;
        let ann = parse_annotation(raw).unwrap();
        assert_eq!(ann.tags, vec!["sunset", "ocean"]);
        assert_eq!(ann.scene_type, "landscape");
        assert_eq!(ann.weather, "");
    }

    #[test]
    fn test_parse_annotation_with_markdown_fences() {
        let raw = "Here is the analysis:\n```json\n{\"description\": \"d\", \"tags\": [\"t\"]}\n```";
        let ann = parse_annotation(raw).unwrap();
        assert_eq!(ann.description, "d");
        assert_eq!(ann.tags, vec!["t"]);
    }

    #[test]
    fn test_parse_annotation_defaults_optional_fields() {
        let ann = parse_annotation(r#"{"description": "d", "tags": ["t"]}"#).unwrap();
        assert!(ann.mood.is_empty());
        assert!(ann.notable_elements.is_empty());
        assert_eq!(ann.shot_type, "");
    }

    #[test]
    fn test_parse_annotation_rejects_missing_required_fields() {
        assert!(parse_annotation(r#"{"tags": ["t"]}"#).is_err());
        assert!(parse_annotation(r#"{"description": "d"}"#).is_err());
        assert!(parse_annotation(r#"{"description": "", "tags": ["t"]}"#).is_err());
        assert!(parse_annotation(r#"{"description": "d", "tags": [" "]}"#).is_err());
        assert!(parse_annotation("no json here").is_err());
    }
}
