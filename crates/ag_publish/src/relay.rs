use serde::{Deserialize, Serialize};
use serde_json::Value;
use ag_core::WordPressCredentials;
use crate::WordPressStatus;

pub const PROXY_KEY_HEADER: &str = "x-wp-proxy-key";

/// Credential hints carried to the relay. Any field may be blank; the relay
/// fills gaps from its own defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayCredentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "app_password")]
    pub app_password: Option<String>,
}

impl From<&WordPressCredentials> for RelayCredentials {
    fn from(credentials: &WordPressCredentials) -> Self {
        let non_empty = |value: &str| Some(value.trim().to_string()).filter(|v| !v.is_empty());
        Self {
            url: non_empty(&credentials.url),
            username: non_empty(&credentials.username),
            app_password: non_empty(&credentials.app_password),
        }
    }
}

/// Body of `POST <relay>`: either a post to create or, with `test`, a
/// connection check.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<WordPressStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<RelayCredentials>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub test: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayTestResponse {
    pub ok: bool,
    #[serde(default)]
    pub user: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_wire_names() {
        let creds = WordPressCredentials::new(" https://blog.example.com ", "alice", "");
        let payload = RelayPayload {
            title: Some("T".to_string()),
            content_html: Some("<p>x</p>".to_string()),
            status: Some(WordPressStatus::Publish),
            excerpt: Some("meta".to_string()),
            credentials: Some(RelayCredentials::from(&creds)),
            test: false,
        };
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "title": "T",
                "contentHtml": "<p>x</p>",
                "status": "publish",
                "excerpt": "meta",
                "credentials": { "url": "https://blog.example.com", "username": "alice" }
            })
        );
    }

    #[test]
    fn test_payload_accepts_partial_bodies() {
        let payload: RelayPayload =
            serde_json::from_str(r#"{"test": true, "credentials": {"appPassword": "pw"}}"#).unwrap();
        assert!(payload.test);
        assert!(payload.title.is_none());
        assert_eq!(payload.credentials.unwrap().app_password.as_deref(), Some("pw"));
    }
}
