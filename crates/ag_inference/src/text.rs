use std::sync::Arc;
use serde::Deserialize;
use serde_json::json;
use ag_core::{Error, GroundingChunk, GroundingSource, Result, TextModel, TextRequest, UNTITLED_SOURCE};
use crate::prompts::META_SEPARATOR;

const TITLE_FAILURE: &str = "タイトルの生成中にエラーが発生しました。";
const ARTICLE_FAILURE: &str = "記事の生成中にエラーが発生しました。";

/// Decoded article response.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedArticle {
    pub article_text: String,
    pub meta_description: String,
    pub sources: Vec<GroundingSource>,
}

/// How an article response must be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArticleDecoding<'a> {
    /// JSON object with `article` and `metaDescription`.
    Structured,
    /// Free text split on the meta separator, with grounding citations.
    /// Carries the placeholder used when the separator is missing.
    Delimited { meta_fallback: &'a str },
}

#[derive(Deserialize)]
struct TitlesPayload {
    #[serde(default)]
    titles: Option<Vec<String>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StructuredArticle {
    article: String,
    meta_description: String,
}

#[derive(Debug, Clone)]
pub struct TextGenerationClient {
    model: Arc<dyn TextModel>,
}

impl TextGenerationClient {
    pub fn new(model: Arc<dyn TextModel>) -> Self {
        Self { model }
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    pub async fn request_titles(&self, prompt: &str) -> Result<Vec<String>> {
        let schema = json!({
            "type": "OBJECT",
            "properties": {
                "titles": { "type": "ARRAY", "items": { "type": "STRING" } }
            }
        });
        let response = self
            .model
            .generate(TextRequest::json(prompt, schema))
            .await
            .map_err(|e| fail("title generation call failed", TITLE_FAILURE, e))?;

        let payload: TitlesPayload = serde_json::from_str(response.text.trim())
            .map_err(|e| fail("title response is not valid JSON", TITLE_FAILURE, e))?;
        let titles = payload.titles.unwrap_or_default();
        tracing::debug!(count = titles.len(), "decoded title candidates");
        Ok(titles)
    }

    pub async fn request_article(&self, prompt: &str, decoding: ArticleDecoding<'_>) -> Result<GeneratedArticle> {
        match decoding {
            ArticleDecoding::Structured => {
                let schema = json!({
                    "type": "OBJECT",
                    "properties": {
                        "article": { "type": "STRING" },
                        "metaDescription": { "type": "STRING" }
                    },
                    "required": ["article", "metaDescription"]
                });
                let response = self
                    .model
                    .generate(TextRequest::json(prompt, schema))
                    .await
                    .map_err(|e| fail("article generation call failed", ARTICLE_FAILURE, e))?;
                let decoded: StructuredArticle = serde_json::from_str(response.text.trim())
                    .map_err(|e| fail("structured article response is not valid JSON", ARTICLE_FAILURE, e))?;
                Ok(GeneratedArticle {
                    article_text: decoded.article,
                    meta_description: decoded.meta_description,
                    sources: Vec::new(),
                })
            }
            ArticleDecoding::Delimited { meta_fallback } => {
                let response = self
                    .model
                    .generate(TextRequest::free(prompt).with_search_grounding())
                    .await
                    .map_err(|e| fail("article generation call failed", ARTICLE_FAILURE, e))?;
                let (article_text, meta_description) = split_meta(&response.text, meta_fallback);
                let sources = collect_sources(&response.grounding);
                tracing::debug!(sources = sources.len(), "decoded delimited article");
                Ok(GeneratedArticle {
                    article_text,
                    meta_description,
                    sources,
                })
            }
        }
    }
}

fn fail(context: &str, message: &str, err: impl std::fmt::Display) -> Error {
    tracing::error!(error = %err, "{}", context);
    Error::Generation(message.to_string())
}

/// Splits a delimited response on the first meta separator.
///
/// Without a separator (or with nothing before it) the whole trimmed
/// response is the article and the meta description is `fallback`.
pub fn split_meta(response: &str, fallback: &str) -> (String, String) {
    let response = response.trim();
    match response.split_once(META_SEPARATOR) {
        Some((body, meta)) if !body.trim().is_empty() => (body.trim().to_string(), meta.trim().to_string()),
        Some((_, meta)) => (response.to_string(), meta.trim().to_string()),
        None => (response.to_string(), fallback.to_string()),
    }
}

/// Grounding chunks without a URI are dropped; missing titles get a default.
pub fn collect_sources(chunks: &[GroundingChunk]) -> Vec<GroundingSource> {
    chunks
        .iter()
        .filter_map(|chunk| {
            let uri = chunk.uri.as_deref().map(str::trim).filter(|uri| !uri.is_empty())?;
            let title = chunk
                .title
                .as_deref()
                .map(str::trim)
                .filter(|title| !title.is_empty())
                .unwrap_or(UNTITLED_SOURCE);
            Some(GroundingSource {
                uri: uri.to_string(),
                title: title.to_string(),
            })
        })
        .collect()
}
