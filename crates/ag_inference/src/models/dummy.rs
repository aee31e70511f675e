//! Offline models. They answer deterministically, can be scripted with
//! canned answers, and record every request they receive.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Mutex;
use std::time::Duration;
use ag_core::{
    Error, GeneratedImage, GroundingChunk, ImageModel, ImageRequest, ResponseFormat, Result, TextModel,
    TextRequest, TextResponse,
};

/// 1x1 transparent PNG.
pub const PLACEHOLDER_PNG_BASE64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

enum Scripted<T> {
    Answer(T),
    Fail(String),
}

pub struct DummyTextModel {
    script: Mutex<VecDeque<Scripted<TextResponse>>>,
    requests: Mutex<Vec<TextRequest>>,
}

impl fmt::Debug for DummyTextModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DummyTextModel").finish()
    }
}

impl Default for DummyTextModel {
    fn default() -> Self {
        Self::new()
    }
}

impl DummyTextModel {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn push_response(&self, response: TextResponse) {
        lock(&self.script).push_back(Scripted::Answer(response));
    }

    pub fn push_text(&self, text: impl Into<String>) {
        self.push_response(TextResponse { text: text.into(), grounding: Vec::new() });
    }

    pub fn push_error(&self, message: impl Into<String>) {
        lock(&self.script).push_back(Scripted::Fail(message.into()));
    }

    pub fn requests(&self) -> Vec<TextRequest> {
        lock(&self.requests).clone()
    }

    fn fallback(request: &TextRequest) -> TextResponse {
        let text = match &request.format {
            ResponseFormat::Json(schema) if schema["properties"].get("titles").is_some() => {
                let titles: Vec<String> = (1..=10).map(|i| format!("Generated title {}", i)).collect();
                serde_json::json!({ "titles": titles }).to_string()
            }
            ResponseFormat::Json(_) => serde_json::json!({
                "article": sample_article(),
                "metaDescription": "A short overview of the topic.",
            })
            .to_string(),
            ResponseFormat::Free => format!("{}\n---meta---\nA short overview of the topic.", sample_article()),
        };
        let grounding = if request.search_grounding {
            vec![GroundingChunk {
                uri: Some("https://example.com/reference".to_string()),
                title: Some("Reference".to_string()),
            }]
        } else {
            Vec::new()
        };
        TextResponse { text, grounding }
    }
}

fn sample_article() -> String {
    [
        "Introduction paragraph.",
        "## First section",
        "Some **important** details.",
        "## Second section",
        "More details.",
        "## Third section",
        "Closing details.",
        "Summary paragraph.",
    ]
    .join("\n\n")
}

#[async_trait::async_trait]
impl TextModel for DummyTextModel {
    fn name(&self) -> &str {
        "Dummy"
    }

    async fn generate(&self, request: TextRequest) -> Result<TextResponse> {
        lock(&self.requests).push(request.clone());
        let scripted = lock(&self.script).pop_front();
        match scripted {
            Some(Scripted::Answer(response)) => Ok(response),
            Some(Scripted::Fail(message)) => Err(Error::Generation(message)),
            None => Ok(Self::fallback(&request)),
        }
    }
}

pub struct DummyImageModel {
    script: Mutex<VecDeque<(Duration, Scripted<Option<GeneratedImage>>)>>,
    requests: Mutex<Vec<ImageRequest>>,
}

impl fmt::Debug for DummyImageModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DummyImageModel").finish()
    }
}

impl Default for DummyImageModel {
    fn default() -> Self {
        Self::new()
    }
}

impl DummyImageModel {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn push_image(&self, image: GeneratedImage) {
        self.push_after(Duration::ZERO, Some(image));
    }

    /// Answer with no image bytes, as a safety-filtered request would.
    pub fn push_empty(&self) {
        self.push_after(Duration::ZERO, None);
    }

    pub fn push_after(&self, delay: Duration, image: Option<GeneratedImage>) {
        lock(&self.script).push_back((delay, Scripted::Answer(image)));
    }

    pub fn push_error(&self, message: impl Into<String>) {
        lock(&self.script).push_back((Duration::ZERO, Scripted::Fail(message.into())));
    }

    pub fn requests(&self) -> Vec<ImageRequest> {
        lock(&self.requests).clone()
    }
}

#[async_trait::async_trait]
impl ImageModel for DummyImageModel {
    fn name(&self) -> &str {
        "Dummy"
    }

    async fn generate(&self, request: ImageRequest) -> Result<Option<GeneratedImage>> {
        let mime_type = request.mime_type.clone();
        lock(&self.requests).push(request);
        let scripted = lock(&self.script).pop_front();
        match scripted {
            Some((delay, outcome)) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                match outcome {
                    Scripted::Answer(image) => Ok(image),
                    Scripted::Fail(message) => Err(Error::ImageGeneration(message)),
                }
            }
            None => Ok(Some(GeneratedImage {
                base64: PLACEHOLDER_PNG_BASE64.to_string(),
                mime_type,
            })),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
