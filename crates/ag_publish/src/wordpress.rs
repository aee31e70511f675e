//! Plain WordPress REST calls with application-password basic auth.
//!
//! Used by the direct publish mode and by the relay endpoint, which makes
//! the same calls on the caller's behalf.

use std::sync::Arc;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use crate::{PublishedPost, WordPressStatus};

#[derive(Error, Debug)]
pub enum WordPressError {
    #[error("WordPress error ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("WordPress request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl WordPressError {
    /// Response body when WordPress answered, otherwise the transport message.
    pub fn detail(&self) -> String {
        match self {
            WordPressError::Status { body, .. } => body.clone(),
            WordPressError::Transport(e) => e.to_string(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            WordPressError::Status { status, .. } => Some(*status),
            WordPressError::Transport(_) => None,
        }
    }
}

/// Resolved site and login for one call.
#[derive(Clone)]
pub struct SiteAuth<'a> {
    pub url: &'a str,
    pub username: &'a str,
    pub app_password: &'a str,
}

impl SiteAuth<'_> {
    fn endpoint(&self, path: &str) -> String {
        format!("{}/wp-json/wp/v2/{}", self.url.trim().trim_end_matches('/'), path)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewPost<'a> {
    pub title: &'a str,
    pub content: &'a str,
    pub status: WordPressStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<&'a str>,
}

#[derive(Deserialize)]
struct CreatedPost {
    id: u64,
    #[serde(default)]
    link: String,
}

#[derive(Debug, Clone)]
pub struct WordPressApi {
    client: Arc<Client>,
}

impl Default for WordPressApi {
    fn default() -> Self {
        Self::new(Arc::new(Client::new()))
    }
}

impl WordPressApi {
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }

    pub async fn create_post(&self, site: &SiteAuth<'_>, post: &NewPost<'_>) -> Result<PublishedPost, WordPressError> {
        let response = self
            .client
            .post(site.endpoint("posts"))
            .basic_auth(site.username, Some(site.app_password))
            .json(post)
            .send()
            .await?;
        let created = check(response).await?.json::<CreatedPost>().await?;
        Ok(PublishedPost { id: created.id, link: created.link })
    }

    /// `users/me`, returned as the raw user object.
    pub async fn current_user(&self, site: &SiteAuth<'_>) -> Result<Value, WordPressError> {
        let response = self
            .client
            .get(site.endpoint("users/me"))
            .basic_auth(site.username, Some(site.app_password))
            .send()
            .await?;
        Ok(check(response).await?.json::<Value>().await?)
    }
}

async fn check(response: Response) -> Result<Response, WordPressError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(WordPressError::Status { status: status.as_u16(), body })
}
