use async_trait::async_trait;
use crate::types::{Article, WordPressCredentials};
use crate::Result;

pub const DEFAULT_HISTORY_LIMIT: usize = 50;

#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Newest first. With a user id, that user's articles plus legacy ones
    /// that belong to nobody; without one, everything.
    async fn fetch_articles(&self, user_id: Option<&str>, limit: usize) -> Result<Vec<Article>>;

    /// Insert or replace by article id.
    async fn save_article(&self, article: &Article, user_id: Option<&str>) -> Result<()>;
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn fetch_credentials(&self, user_id: &str) -> Result<Option<WordPressCredentials>>;

    /// Insert or replace the credentials for a user.
    async fn save_credentials(&self, user_id: &str, credentials: &WordPressCredentials) -> Result<()>;
}
