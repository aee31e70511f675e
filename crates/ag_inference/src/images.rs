use std::sync::Arc;
use futures::future::join_all;
use ag_core::{Error, GeneratedImage, HeadingImage, ImageModel, ImageRequest, Result};

/// At most this many headings get an image per article.
pub const MAX_HEADING_IMAGES: usize = 5;

const DISABLED: &str = "画像生成は無効化されています（IMAGE_GEN_ENABLED=false）";
const NO_IMAGE: &str = "画像が生成されませんでした。安全フィルターが作動した可能性があります。";
const API_FAILURE: &str = "アイキャッチ画像の生成中にAPIエラーが発生しました。時間をおいて再試行してください。";

pub fn eyecatch_prompt(title: &str) -> String {
    format!(
        "A professional, high-quality, photorealistic image for a blog post titled \"{}\". The image should be visually appealing, clean, and modern. Focus purely on the visual theme.",
        title
    )
}

pub fn heading_prompt(heading: &str) -> String {
    format!(
        "A professional, high-quality, photorealistic image for a blog post heading titled \"{}\". The image should be visually appealing, clean, and modern. Crucially, the image must NOT contain any text, letters, characters, or symbols.",
        heading
    )
}

#[derive(Debug, Clone)]
pub struct ImageGenerationClient {
    model: Arc<dyn ImageModel>,
    enabled: bool,
}

impl ImageGenerationClient {
    pub fn new(model: Arc<dyn ImageModel>, enabled: bool) -> Self {
        Self { model, enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// One 16:9 hero image. JPEG first, then a single PNG retry when the
    /// provider answers without bytes.
    pub async fn request_eyecatch(&self, title: &str) -> Result<GeneratedImage> {
        if !self.enabled {
            return Err(Error::ImageGeneration(DISABLED.to_string()));
        }
        let prompt = eyecatch_prompt(title);

        for mime_type in ["image/jpeg", "image/png"] {
            let outcome = self.model.generate(ImageRequest::new(prompt.clone(), mime_type)).await;
            match outcome {
                Ok(Some(image)) => return Ok(image),
                Ok(None) => tracing::warn!(mime = mime_type, "eyecatch request returned no image bytes"),
                Err(e) => {
                    tracing::error!(error = %e, "eyecatch image request failed");
                    return Err(Error::ImageGeneration(API_FAILURE.to_string()));
                }
            }
        }
        Err(Error::ImageGeneration(NO_IMAGE.to_string()))
    }

    /// One image per heading for the first few headings, requested
    /// concurrently. Failed entries are dropped; this never fails.
    pub async fn request_heading_images(&self, headings: &[String]) -> Vec<HeadingImage> {
        if !self.enabled {
            return Vec::new();
        }
        let requests = headings.iter().take(MAX_HEADING_IMAGES).map(|heading| async move {
            let request = ImageRequest::new(heading_prompt(heading), "image/jpeg");
            match self.model.generate(request).await {
                Ok(Some(image)) => Some(HeadingImage {
                    heading: heading.clone(),
                    image_base64: image.base64,
                    mime_type: Some(image.mime_type),
                }),
                Ok(None) => {
                    tracing::warn!(heading = %heading, "heading image request returned no image bytes");
                    None
                }
                Err(e) => {
                    tracing::warn!(heading = %heading, error = %e, "heading image request failed");
                    None
                }
            }
        });
        join_all(requests).await.into_iter().flatten().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::dummy::DummyImageModel;

    fn image(mime: &str) -> GeneratedImage {
        GeneratedImage { base64: "AAAA".to_string(), mime_type: mime.to_string() }
    }

    #[tokio::test]
    async fn test_eyecatch_uses_jpeg_first() {
        let model = Arc::new(DummyImageModel::new());
        model.push_image(image("image/jpeg"));
        let client = ImageGenerationClient::new(model.clone(), true);

        let result = client.request_eyecatch("確定申告の基本").await.unwrap();
        assert_eq!(result.mime_type, "image/jpeg");
        let requests = model.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].aspect_ratio, "16:9");
        assert!(requests[0].prompt.contains("\"確定申告の基本\""));
    }

    #[tokio::test]
    async fn test_eyecatch_falls_back_to_png() {
        let model = Arc::new(DummyImageModel::new());
        model.push_empty();
        model.push_image(image("image/png"));
        let client = ImageGenerationClient::new(model.clone(), true);

        let result = client.request_eyecatch("title").await.unwrap();
        assert_eq!(result.mime_type, "image/png");
        let requests = model.requests();
        assert_eq!(requests[0].mime_type, "image/jpeg");
        assert_eq!(requests[1].mime_type, "image/png");
    }

    #[tokio::test]
    async fn test_eyecatch_fails_after_two_empty_answers() {
        let model = Arc::new(DummyImageModel::new());
        model.push_empty();
        model.push_empty();
        let client = ImageGenerationClient::new(model.clone(), true);

        let err = client.request_eyecatch("title").await.unwrap_err();
        assert_eq!(err.to_string(), format!("Image generation error: {}", NO_IMAGE));
        assert_eq!(model.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_eyecatch_transport_error_does_not_retry() {
        let model = Arc::new(DummyImageModel::new());
        model.push_error("500");
        let client = ImageGenerationClient::new(model.clone(), true);

        assert!(client.request_eyecatch("title").await.is_err());
        assert_eq!(model.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_disabled_client_never_calls_provider() {
        let model = Arc::new(DummyImageModel::new());
        let client = ImageGenerationClient::new(model.clone(), false);

        assert!(matches!(client.request_eyecatch("title").await, Err(Error::ImageGeneration(_))));
        assert!(client.request_heading_images(&["A".to_string()]).await.is_empty());
        assert!(model.requests().is_empty());
    }

    #[tokio::test]
    async fn test_heading_images_capped_and_tolerant() {
        let model = Arc::new(DummyImageModel::new());
        model.push_image(image("image/jpeg"));
        model.push_error("quota");
        model.push_empty();
        let client = ImageGenerationClient::new(model.clone(), true);

        let headings: Vec<String> = (1..=7).map(|i| format!("Heading {}", i)).collect();
        let images = client.request_heading_images(&headings).await;

        let requests = model.requests();
        assert_eq!(requests.len(), MAX_HEADING_IMAGES);
        assert!(requests.iter().all(|r| r.prompt.contains("must NOT contain any text")));
        assert_eq!(images.len(), 3);
        assert!(images.iter().all(|img| headings[..5].contains(&img.heading)));
    }
}
