pub mod error;
pub mod models;
pub mod plans;
pub mod storage;
pub mod types;

pub use error::{Error, Result};
pub use models::{GroundingChunk, ImageModel, ImageRequest, ResponseFormat, TextModel, TextRequest, TextResponse};
pub use plans::{plans, Plan};
pub use storage::{ArticleStore, CredentialStore, DEFAULT_HISTORY_LIMIT};
pub use types::*;
