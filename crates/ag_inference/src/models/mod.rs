use std::sync::Arc;
use ag_core::{Error, ImageModel, Result, TextModel};
use crate::Config;

pub mod dummy;
pub mod gemini;
pub mod imagen;

pub use dummy::{DummyImageModel, DummyTextModel};
pub use gemini::GeminiModel;
pub use imagen::ImagenModel;

/// Which backend answers text and image requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Gemini,
    Dummy,
}

impl std::str::FromStr for ModelKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "gemini" | "google" => Ok(ModelKind::Gemini),
            "dummy" | "offline" => Ok(ModelKind::Dummy),
            _ => Err(Error::Configuration(format!(
                "Unknown model: {}. Available models: gemini (default), dummy",
                s
            ))),
        }
    }
}

pub fn create_text_model(config: &Config) -> Result<Arc<dyn TextModel>> {
    match config.model {
        ModelKind::Gemini => Ok(Arc::new(GeminiModel::new(config)?)),
        ModelKind::Dummy => Ok(Arc::new(DummyTextModel::new())),
    }
}

pub fn create_image_model(config: &Config) -> Result<Arc<dyn ImageModel>> {
    match config.model {
        ModelKind::Gemini => Ok(Arc::new(ImagenModel::new(config)?)),
        ModelKind::Dummy => Ok(Arc::new(DummyImageModel::new())),
    }
}
