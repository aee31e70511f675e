use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Missing or malformed user input, caught before any network call.
    #[error("Invalid input: {0}")]
    InputValidation(String),

    /// The text model failed or returned something we could not decode.
    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Image generation error: {0}")]
    ImageGeneration(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Publish error: {0}")]
    Publish(String),

    /// An operation was requested from a pipeline step that does not allow it.
    #[error("Invalid step: {0}")]
    InvalidStep(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("External error: {0}")]
    External(#[from] anyhow::Error),
}

impl Error {
    /// Generation failures are recoverable by asking again; nothing else is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Generation(_) | Error::ImageGeneration(_) | Error::Http(_))
    }

    /// The message without the category prefix, for showing next to the
    /// control that failed.
    pub fn user_message(&self) -> String {
        match self {
            Error::InputValidation(message)
            | Error::Generation(message)
            | Error::ImageGeneration(message)
            | Error::Persistence(message)
            | Error::Publish(message)
            | Error::InvalidStep(message)
            | Error::NotFound(message)
            | Error::Configuration(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
