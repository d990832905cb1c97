//! OpenAI-compatible vision analyzer (works with LM Studio, OpenAI, and
//! compatible APIs).

use anyhow::{anyhow, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::{parse_annotation, Analyzer, AssetAnnotation};
use crate::config::AnalyzerConfig;
use crate::scanner::MediaKind;

const ANNOTATION_PROMPT: &str = "You are cataloging a media library. Examine the attached \
frames (for a video they are keyframes in chronological order; for a photo there is a single \
frame) and reply with a single JSON object, no prose, with these fields:\n\
  description: 2-3 sentence account of what the footage shows\n\
  tags: 5-15 short lowercase keywords\n\
  scene_type: e.g. landscape, portrait, street, interior\n\
  mood: list of mood words\n\
  time_of_day, weather, motion, shot_type: short strings (empty if unknown)\n\
  notable_elements: list of distinctive objects or subjects";

pub struct VisionAnalyzer {
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: Vec<ContentPart>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

impl VisionAnalyzer {
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        }
    }

    fn encode_frame(path: &Path) -> Result<String> {
        let bytes = std::fs::read(path)?;
        let mime = match path.extension().and_then(|e| e.to_str()) {
            Some("png") => "image/png",
            Some("webp") => "image/webp",
            _ => "image/jpeg",
        };
        Ok(format!("data:{};base64,{}", mime, BASE64.encode(bytes)))
    }
}

impl Analyzer for VisionAnalyzer {
    fn analyze(&self, frames: &[PathBuf], kind: MediaKind) -> Result<AssetAnnotation> {
        if frames.is_empty() {
            return Err(anyhow!("no frames to analyze"));
        }

        let mut content = vec![ContentPart::Text {
            text: format!("{}\n\nAsset kind: {}", ANNOTATION_PROMPT, kind),
        }];
        for frame in frames {
            content.push(ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: Self::encode_frame(frame)?,
                },
            });
        }

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![Message {
                role: "user".to_string(),
                content,
            }],
            max_tokens: 800,
            temperature: 0.3,
        };

        let url = format!("{}/chat/completions", self.endpoint);

        let agent = ureq::AgentBuilder::new()
            .timeout(std::time::Duration::from_secs(180))
            .build();

        let mut req = agent.post(&url).set("Content-Type", "application/json");
        if let Some(ref api_key) = self.api_key {
            req = req.set("Authorization", &format!("Bearer {}", api_key));
        }

        let response = req
            .send_json(&request)
            .map_err(|e| anyhow!("analyzer request failed: {}", e))?;

        let chat_response: ChatResponse = response
            .into_json()
            .map_err(|e| anyhow!("failed to parse analyzer response: {}", e))?;

        let reply = chat_response
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| anyhow!("empty analyzer response"))?;

        parse_annotation(&reply)
    }

    fn name(&self) -> &'static str {
        "openai-compatible"
    }
}
