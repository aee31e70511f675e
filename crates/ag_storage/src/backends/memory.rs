use std::collections::HashMap;
use std::sync::Arc;
use async_trait::async_trait;
use tokio::sync::RwLock;
use ag_core::{Article, ArticleStore, CredentialStore, Result, WordPressCredentials};

#[derive(Default)]
pub struct MemoryStore {
    articles: Vec<Article>,
    credentials: HashMap<String, WordPressCredentials>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save_article(&mut self, article: &Article, user_id: Option<&str>) {
        let mut article = article.clone();
        article.user_id = user_id.map(str::to_string);
        if let Some(existing) = self.articles.iter_mut().find(|a| a.id == article.id) {
            *existing = article;
        } else {
            self.articles.push(article);
        }
    }

    pub fn fetch_articles(&self, user_id: Option<&str>, limit: usize) -> Vec<Article> {
        let mut articles = self
            .articles
            .iter()
            .filter(|article| match user_id {
                Some(user) => article.user_id.is_none() || article.user_id.as_deref() == Some(user),
                None => true,
            })
            .cloned()
            .collect::<Vec<_>>();
        articles.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        articles.truncate(limit);
        articles
    }
}

/// Process-local persistence. Everything is lost on exit.
#[derive(Clone, Default)]
pub struct InMemoryStorage {
    store: Arc<RwLock<MemoryStore>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ArticleStore for InMemoryStorage {
    async fn fetch_articles(&self, user_id: Option<&str>, limit: usize) -> Result<Vec<Article>> {
        let store = self.store.read().await;
        Ok(store.fetch_articles(user_id, limit))
    }

    async fn save_article(&self, article: &Article, user_id: Option<&str>) -> Result<()> {
        let mut store = self.store.write().await;
        store.save_article(article, user_id);
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for InMemoryStorage {
    async fn fetch_credentials(&self, user_id: &str) -> Result<Option<WordPressCredentials>> {
        let store = self.store.read().await;
        Ok(store.credentials.get(user_id).cloned())
    }

    async fn save_credentials(&self, user_id: &str, credentials: &WordPressCredentials) -> Result<()> {
        let mut store = self.store.write().await;
        store.credentials.insert(user_id.to_string(), credentials.clone());
        Ok(())
    }
}
