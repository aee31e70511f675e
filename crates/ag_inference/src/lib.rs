use ag_core::Result;

pub mod images;
pub mod models;
pub mod prompts;
pub mod text;

pub use images::ImageGenerationClient;
pub use models::{create_image_model, create_text_model, ModelKind};
pub use text::{ArticleDecoding, GeneratedArticle, TextGenerationClient};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_IMAGE_MODEL: &str = "imagen-4.0-generate-001";

#[derive(Clone)]
pub struct Config {
    pub model: ModelKind,
    pub api_key: Option<String>,
    pub base_url: String,
    pub text_model: String,
    pub image_model: String,
    pub image_generation_enabled: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_deref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("text_model", &self.text_model)
            .field("image_model", &self.image_model)
            .field("image_generation_enabled", &self.image_generation_enabled)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: ModelKind::Gemini,
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            image_generation_enabled: true,
        }
    }
}

/// Both generation clients, built from one config.
pub fn create_clients(config: &Config) -> Result<(TextGenerationClient, ImageGenerationClient)> {
    let text = TextGenerationClient::new(create_text_model(config)?);
    let images = ImageGenerationClient::new(create_image_model(config)?, config.image_generation_enabled);
    Ok((text, images))
}

pub mod prelude {
    pub use super::prompts::{build_article_prompt, build_title_prompt, ArticleBrief};
    pub use super::{create_clients, Config, ImageGenerationClient, TextGenerationClient};
    pub use ag_core::{Article, Error, GenerationConfig, Result};
}
