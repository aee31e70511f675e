use std::fmt;
use std::sync::Arc;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use ag_core::{Error, Result, WordPressCredentials};

pub mod relay;
pub mod wordpress;

pub use relay::{RelayCredentials, RelayPayload, RelayTestResponse, PROXY_KEY_HEADER};
pub use wordpress::{NewPost, SiteAuth, WordPressApi, WordPressError};

const MISSING_CREDENTIALS: &str = "WordPressの接続情報が不足しています。設定を確認してください。";
const MISSING_TEST_FIELDS: &str = "URL / ユーザー名 / APP-PASS を入力してください";
const CONNECTED: &str = "接続成功";
const RELAY_UNREACHABLE: &str = "WordPressプロキシに接続できませんでした";
const RELAY_UNREADABLE: &str = "WordPressプロキシの応答を解析できませんでした";

/// Status requested from WordPress for a new post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WordPressStatus {
    #[default]
    Draft,
    Publish,
}

impl std::str::FromStr for WordPressStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(WordPressStatus::Draft),
            "publish" | "published" => Ok(WordPressStatus::Publish),
            _ => Err(Error::InputValidation(format!("Unknown WordPress status: {}", s))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedPost {
    pub id: u64,
    pub link: String,
}

/// What gets sent to WordPress for one article.
#[derive(Debug, Clone)]
pub struct PostDraft {
    pub title: String,
    pub content_html: String,
    pub status: WordPressStatus,
    pub excerpt: Option<String>,
}

#[derive(Clone, Default)]
pub struct PublishConfig {
    /// Relay endpoint. When unset, posts go straight to the WordPress REST API.
    pub proxy_url: Option<String>,
    pub proxy_key: Option<String>,
}

impl PublishConfig {
    pub fn is_proxy_configured(&self) -> bool {
        self.proxy_url.as_deref().map_or(false, |url| !url.trim().is_empty())
    }
}

impl fmt::Debug for PublishConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublishConfig")
            .field("proxy_url", &self.proxy_url)
            .field("proxy_key", &self.proxy_key.as_deref().map(|_| "<redacted>"))
            .finish()
    }
}

#[async_trait]
pub trait Publisher: Send + Sync + fmt::Debug {
    async fn post(&self, credentials: &WordPressCredentials, draft: &PostDraft) -> Result<PublishedPost>;

    /// Human-readable success message, or `Error::Publish`.
    async fn test_connection(&self, credentials: &WordPressCredentials) -> Result<String>;
}

enum Route {
    Relay { url: String, key: Option<String> },
    Direct,
}

pub struct WordPressClient {
    client: Arc<Client>,
    api: WordPressApi,
    route: Route,
}

impl WordPressClient {
    pub fn new(config: &PublishConfig) -> Result<Self> {
        let route = if config.is_proxy_configured() {
            let url = config.proxy_url.as_deref().unwrap_or_default().trim();
            url::Url::parse(url).map_err(|e| Error::Configuration(format!("Invalid WP_PROXY_URL {}: {}", url, e)))?;
            Route::Relay {
                url: url.to_string(),
                key: config.proxy_key.clone().filter(|key| !key.is_empty()),
            }
        } else {
            Route::Direct
        };
        let client = Arc::new(Client::new());
        Ok(Self {
            api: WordPressApi::new(client.clone()),
            client,
            route,
        })
    }

    pub fn uses_relay(&self) -> bool {
        matches!(self.route, Route::Relay { .. })
    }

    async fn send_to_relay(&self, url: &str, key: Option<&str>, payload: &RelayPayload) -> Result<reqwest::Response> {
        let mut request = self.client.post(url).json(payload);
        if let Some(key) = key {
            request = request.header(PROXY_KEY_HEADER, key);
        }
        request.send().await.map_err(|e| {
            tracing::warn!(error = %e, "relay unreachable");
            Error::Publish(format!("{}: {}", RELAY_UNREACHABLE, e))
        })
    }
}

fn unreadable_reply(e: reqwest::Error) -> Error {
    Error::Publish(format!("{}: {}", RELAY_UNREADABLE, e))
}

fn site_auth(credentials: &WordPressCredentials) -> Option<SiteAuth<'_>> {
    credentials.is_complete().then(|| SiteAuth {
        url: credentials.base_url(),
        username: credentials.username.trim(),
        app_password: &credentials.app_password,
    })
}

impl fmt::Debug for WordPressClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let route = match &self.route {
            Route::Relay { url, .. } => format!("relay({})", url),
            Route::Direct => "direct".to_string(),
        };
        f.debug_struct("WordPressClient").field("route", &route).finish()
    }
}

#[async_trait]
impl Publisher for WordPressClient {
    async fn post(&self, credentials: &WordPressCredentials, draft: &PostDraft) -> Result<PublishedPost> {
        match &self.route {
            Route::Relay { url, key } => {
                let payload = RelayPayload {
                    title: Some(draft.title.clone()),
                    content_html: Some(draft.content_html.clone()),
                    status: Some(draft.status),
                    excerpt: draft.excerpt.clone(),
                    credentials: Some(RelayCredentials::from(credentials)),
                    test: false,
                };
                let response = self.send_to_relay(url, key.as_deref(), &payload).await?;
                let status = response.status();
                if !status.is_success() {
                    let text = response.text().await.unwrap_or_default();
                    tracing::warn!(status = status.as_u16(), "relay rejected post");
                    return Err(Error::Publish(format!(
                        "WordPressプロキシへの投稿に失敗しました ({}): {}",
                        status.as_u16(),
                        text
                    )));
                }
                let post = response.json::<PublishedPost>().await.map_err(unreadable_reply)?;
                tracing::info!(id = post.id, link = %post.link, "posted via relay");
                Ok(post)
            }
            Route::Direct => {
                let site = site_auth(credentials).ok_or_else(|| Error::Publish(MISSING_CREDENTIALS.to_string()))?;
                let post = NewPost {
                    title: &draft.title,
                    content: &draft.content_html,
                    status: draft.status,
                    excerpt: draft.excerpt.as_deref(),
                };
                let created = self.api.create_post(&site, &post).await.map_err(|e| match e.status() {
                    Some(status) => Error::Publish(format!("WordPressへの投稿に失敗しました ({}): {}", status, e.detail())),
                    None => Error::Publish(e.to_string()),
                })?;
                tracing::info!(id = created.id, link = %created.link, "posted to WordPress");
                Ok(created)
            }
        }
    }

    async fn test_connection(&self, credentials: &WordPressCredentials) -> Result<String> {
        match &self.route {
            Route::Relay { url, key } => {
                let payload = RelayPayload {
                    credentials: Some(RelayCredentials::from(credentials)),
                    test: true,
                    ..RelayPayload::default()
                };
                let response = self.send_to_relay(url, key.as_deref(), &payload).await?;
                let status = response.status();
                if !status.is_success() {
                    let text = response.text().await.unwrap_or_default();
                    let message = if text.is_empty() { format!("Proxy error {}", status.as_u16()) } else { text };
                    return Err(Error::Publish(message));
                }
                let body = response.json::<RelayTestResponse>().await.map_err(unreadable_reply)?;
                let name = body.user.get("name").and_then(|name| name.as_str()).unwrap_or("OK");
                Ok(format!("{}: {}", CONNECTED, name))
            }
            Route::Direct => {
                let site = site_auth(credentials).ok_or_else(|| Error::Publish(MISSING_TEST_FIELDS.to_string()))?;
                self.api.current_user(&site).await.map_err(|e| {
                    let detail = e.detail();
                    match e.status() {
                        Some(status) if detail.is_empty() => Error::Publish(format!("WP error {}", status)),
                        _ => Error::Publish(detail),
                    }
                })?;
                Ok(CONNECTED.to_string())
            }
        }
    }
}

pub fn create_publisher(config: &PublishConfig) -> Result<Arc<dyn Publisher>> {
    Ok(Arc::new(WordPressClient::new(config)?))
}
