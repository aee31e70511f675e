use std::fmt;
use std::sync::Arc;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use ag_core::{Error, GroundingChunk, ResponseFormat, Result, TextModel, TextRequest, TextResponse};
use crate::Config;

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<RawGroundingChunk>,
}

#[derive(Deserialize)]
struct RawGroundingChunk {
    web: Option<WebChunk>,
}

#[derive(Deserialize)]
struct WebChunk {
    uri: Option<String>,
    title: Option<String>,
}

/// Gemini `generateContent` over REST.
pub struct GeminiModel {
    client: Arc<Client>,
    api_key: String,
    base_url: String,
    model_name: String,
}

impl GeminiModel {
    pub fn new(config: &Config) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| Error::Configuration("Gemini API key is required".to_string()))?;
        Ok(Self {
            client: Arc::new(Client::new()),
            api_key: api_key.trim().to_string(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model_name: config.text_model.clone(),
        })
    }

    fn request_body(request: &TextRequest) -> serde_json::Value {
        let contents = vec![Content { parts: vec![Part { text: &request.prompt }] }];
        let mut body = json!({ "contents": contents });
        if let ResponseFormat::Json(schema) = &request.format {
            body["generationConfig"] = json!({
                "responseMimeType": "application/json",
                "responseSchema": schema,
            });
        }
        if request.search_grounding {
            body["tools"] = json!([{ "google_search": {} }]);
        }
        body
    }
}

impl fmt::Debug for GeminiModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiModel")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model_name", &self.model_name)
            .finish()
    }
}

#[async_trait]
impl TextModel for GeminiModel {
    fn name(&self) -> &str {
        &self.model_name
    }

    async fn generate(&self, request: TextRequest) -> Result<TextResponse> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model_name);
        tracing::debug!(model = %self.model_name, grounding = request.search_grounding, "calling generateContent");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::request_body(&request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Generation(format!("Gemini API error ({}): {}", status.as_u16(), text)));
        }

        let decoded = response.json::<GenerateContentResponse>().await?;
        let candidate = decoded
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| Error::Generation("Gemini response has no candidates".to_string()))?;

        let text = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<String>()
            })
            .unwrap_or_default();

        let grounding = candidate
            .grounding_metadata
            .map(|meta| {
                meta.grounding_chunks
                    .into_iter()
                    .map(|chunk| match chunk.web {
                        Some(web) => GroundingChunk { uri: web.uri, title: web.title },
                        None => GroundingChunk::default(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(TextResponse { text, grounding })
    }
}
