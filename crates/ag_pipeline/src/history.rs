use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use ag_core::Article;

/// In-process list of finalized articles, newest first. Clones share the
/// same list.
#[derive(Debug, Clone, Default)]
pub struct ArticleHistory {
    articles: Arc<RwLock<Vec<Article>>>,
}

impl ArticleHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from a store read, keeping the given order.
    pub fn with_articles(articles: Vec<Article>) -> Self {
        Self {
            articles: Arc::new(RwLock::new(articles)),
        }
    }

    /// Prepend, or replace in place when an article with the same id exists.
    pub fn record(&self, article: Article) {
        let mut articles = self.write();
        match articles.iter_mut().find(|existing| existing.id == article.id) {
            Some(existing) => *existing = article,
            None => articles.insert(0, article),
        }
    }

    pub fn list(&self) -> Vec<Article> {
        self.read().clone()
    }

    /// Articles visible to a user: their own plus those owned by nobody.
    pub fn list_for(&self, user_id: Option<&str>, limit: usize) -> Vec<Article> {
        self.read()
            .iter()
            .filter(|article| match user_id {
                Some(user) => article.user_id.as_deref().map_or(true, |owner| owner == user),
                None => true,
            })
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<Article> {
        self.read().iter().find(|article| article.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Article>> {
        self.articles.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Article>> {
        self.articles.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
