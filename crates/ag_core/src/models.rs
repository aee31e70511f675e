use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use crate::types::GeneratedImage;
use crate::Result;

/// How the text model should shape its answer.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseFormat {
    Free,
    /// JSON constrained by the given schema (provider schema dialect).
    Json(serde_json::Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextRequest {
    pub prompt: String,
    pub format: ResponseFormat,
    pub search_grounding: bool,
}

impl TextRequest {
    pub fn free(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            format: ResponseFormat::Free,
            search_grounding: false,
        }
    }

    pub fn json(prompt: impl Into<String>, schema: serde_json::Value) -> Self {
        Self {
            prompt: prompt.into(),
            format: ResponseFormat::Json(schema),
            search_grounding: false,
        }
    }

    pub fn with_search_grounding(mut self) -> Self {
        self.search_grounding = true;
        self
    }
}

/// One citation as reported by the provider's grounding metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingChunk {
    pub uri: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextResponse {
    pub text: String,
    pub grounding: Vec<GroundingChunk>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    pub prompt: String,
    pub aspect_ratio: String,
    pub mime_type: String,
    pub image_size: String,
}

impl ImageRequest {
    pub fn new(prompt: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            aspect_ratio: "16:9".to_string(),
            mime_type: mime_type.into(),
            image_size: "1K".to_string(),
        }
    }
}

#[async_trait]
pub trait TextModel: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    async fn generate(&self, request: TextRequest) -> Result<TextResponse>;
}

#[async_trait]
pub trait ImageModel: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// `Ok(None)` means the provider answered but returned no image bytes,
    /// which is what a safety-filter rejection looks like.
    async fn generate(&self, request: ImageRequest) -> Result<Option<GeneratedImage>>;
}
