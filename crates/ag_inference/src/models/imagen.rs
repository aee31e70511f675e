use std::fmt;
use std::sync::Arc;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use ag_core::{Error, GeneratedImage, ImageModel, ImageRequest, Result};
use crate::Config;

#[derive(Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    bytes_base64_encoded: Option<String>,
    mime_type: Option<String>,
}

/// Imagen `predict` over REST.
pub struct ImagenModel {
    client: Arc<Client>,
    api_key: String,
    base_url: String,
    model_name: String,
}

impl ImagenModel {
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
            model_name: config.image_model.clone(),
        })
    }
}

impl fmt::Debug for ImagenModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImagenModel")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model_name", &self.model_name)
            .finish()
    }
}

#[async_trait]
impl ImageModel for ImagenModel {
    fn name(&self) -> &str {
        &self.model_name
    }

    async fn generate(&self, request: ImageRequest) -> Result<Option<GeneratedImage>> {
        let url = format!("{}/models/{}:predict", self.base_url, self.model_name);
        let body = json!({
            "instances": [{ "prompt": request.prompt }],
            "parameters": {
                "sampleCount": 1,
                "aspectRatio": request.aspect_ratio,
                "imageSize": request.image_size,
                "outputOptions": { "mimeType": request.mime_type },
            }
        });
        tracing::debug!(model = %self.model_name, mime = %request.mime_type, "calling predict");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::ImageGeneration(format!("Imagen API error ({}): {}", status.as_u16(), text)));
        }

        let decoded = response.json::<PredictResponse>().await?;
        let image = decoded.predictions.into_iter().next().and_then(|prediction| {
            let bytes = prediction.bytes_base64_encoded.filter(|bytes| !bytes.is_empty())?;
            Some(GeneratedImage {
                base64: bytes,
                mime_type: prediction.mime_type.unwrap_or_else(|| request.mime_type.clone()),
            })
        });
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: String) -> Config {
        Config {
            api_key: Some("test-key".to_string()),
            base_url,
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_predict_returns_image() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/imagen-4.0-generate-001:predict"))
            .and(body_partial_json(json!({ "parameters": { "aspectRatio": "16:9", "outputOptions": { "mimeType": "image/jpeg" } } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "predictions": [{ "bytesBase64Encoded": "AAAA", "mimeType": "image/jpeg" }]
            })))
            .mount(&server)
            .await;

        let model = ImagenModel::new(&config(server.uri())).unwrap();
        let image = model.generate(ImageRequest::new("a cat", "image/jpeg")).await.unwrap().unwrap();
        assert_eq!(image.base64, "AAAA");
        assert_eq!(image.mime_type, "image/jpeg");
    }

    #[tokio::test]
    async fn test_filtered_response_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let model = ImagenModel::new(&config(server.uri())).unwrap();
        assert!(model.generate(ImageRequest::new("a cat", "image/png")).await.unwrap().is_none());
    }
}
