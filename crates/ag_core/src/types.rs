use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlanType {
    Normal,
    Expert,
    Affiliate,
    ForeignLanguage,
}

impl PlanType {
    /// Expert articles come back as a JSON object instead of delimited text.
    pub fn uses_structured_output(&self) -> bool {
        matches!(self, PlanType::Expert)
    }

    /// Every plan but Expert asks the model to ground itself with web search.
    pub fn uses_search_grounding(&self) -> bool {
        !self.uses_structured_output()
    }
}

impl fmt::Display for PlanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlanType::Normal => "Normal",
            PlanType::Expert => "Expert",
            PlanType::Affiliate => "Affiliate",
            PlanType::ForeignLanguage => "ForeignLanguage",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for PlanType {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "normal" => Ok(PlanType::Normal),
            "expert" => Ok(PlanType::Expert),
            "affiliate" => Ok(PlanType::Affiliate),
            "foreignlanguage" | "foreign" => Ok(PlanType::ForeignLanguage),
            _ => Err(crate::Error::InputValidation(format!("Unknown plan: {}", s))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    English,
    Mandarin,
    Cantonese,
    Korean,
}

impl Default for Language {
    fn default() -> Self {
        Self::English
    }
}

impl std::str::FromStr for Language {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_lowercase().as_str() {
            "english" | "en" => Ok(Language::English),
            "mandarin" | "zh" => Ok(Language::Mandarin),
            "cantonese" | "yue" => Ok(Language::Cantonese),
            "korean" | "ko" => Ok(Language::Korean),
            _ => Err(crate::Error::InputValidation(format!("Unsupported language: {}", s))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tone {
    Normal,
    Casual,
    Formal,
}

impl Default for Tone {
    fn default() -> Self {
        Self::Normal
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tone::Normal => "Normal",
            Tone::Casual => "Casual",
            Tone::Formal => "Formal",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for Tone {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_lowercase().as_str() {
            "normal" => Ok(Tone::Normal),
            "casual" => Ok(Tone::Casual),
            "formal" => Ok(Tone::Formal),
            _ => Err(crate::Error::InputValidation(format!("Unknown tone: {}", s))),
        }
    }
}

pub const MIN_H2_COUNT: u32 = 1;
pub const MIN_CHARS_PER_HEADING: u32 = 100;

/// Structural parameters for one article generation attempt.
///
/// A new value replaces the previous one wholesale on every attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub h2_count: u32,
    pub h3_count: u32,
    pub chars_per_heading: u32,
    pub tone: Tone,
    pub custom_prompt: String,
    /// Only read by the ForeignLanguage plan.
    pub language: Language,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            h2_count: 3,
            h3_count: 2,
            chars_per_heading: 400,
            tone: Tone::Normal,
            custom_prompt: String::new(),
            language: Language::English,
        }
    }
}

impl GenerationConfig {
    /// Applies the input-surface floors. The pipeline itself never calls this.
    pub fn clamped(mut self) -> Self {
        self.h2_count = self.h2_count.max(MIN_H2_COUNT);
        self.chars_per_heading = self.chars_per_heading.max(MIN_CHARS_PER_HEADING);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingSource {
    pub uri: String,
    pub title: String,
}

pub const UNTITLED_SOURCE: &str = "Untitled Source";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadingImage {
    pub heading: String,
    pub image_base64: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl HeadingImage {
    pub fn data_uri(&self) -> String {
        data_uri(self.mime_type.as_deref(), &self.image_base64)
    }
}

/// A generated raster image, base64 encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedImage {
    pub base64: String,
    pub mime_type: String,
}

impl GeneratedImage {
    pub fn data_uri(&self) -> String {
        data_uri(Some(&self.mime_type), &self.base64)
    }
}

pub fn data_uri(mime_type: Option<&str>, base64: &str) -> String {
    format!("data:{};base64,{}", mime_type.unwrap_or("image/jpeg"), base64)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleStatus {
    #[serde(alias = "下書き")]
    Draft,
    #[serde(alias = "投稿済み")]
    Published,
}

impl ArticleStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ArticleStatus::Draft => "下書き",
            ArticleStatus::Published => "投稿済み",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ArticleStatus::Draft => "draft",
            ArticleStatus::Published => "published",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" | "下書き" => Some(ArticleStatus::Draft),
            "published" | "投稿済み" => Some(ArticleStatus::Published),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub title: String,
    /// Markdown source.
    pub content: String,
    pub html_content: String,
    pub created_at: DateTime<Utc>,
    pub status: ArticleStatus,
    pub plan: PlanType,
    pub sources: Vec<GroundingSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eyecatch_image: Option<String>,
    pub meta_description: String,
    pub heading_images: Vec<HeadingImage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl Article {
    /// Timestamp-derived id with a random suffix so two articles finalized in
    /// the same millisecond stay distinct.
    pub fn generate_id(now: DateTime<Utc>) -> String {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        format!("{}-{}", now.to_rfc3339_opts(SecondsFormat::Millis, true), &suffix[..8])
    }

    /// The only status change an article supports.
    pub fn mark_published(&mut self) {
        self.status = ArticleStatus::Published;
    }
}

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordPressCredentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub app_password: String,
}

impl WordPressCredentials {
    pub fn new(url: impl Into<String>, username: impl Into<String>, app_password: impl Into<String>) -> Self {
        Self {
            site_name: None,
            url: url.into(),
            username: username.into(),
            app_password: app_password.into(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.url.trim().is_empty() && !self.username.trim().is_empty() && !self.app_password.trim().is_empty()
    }

    /// Site URL without trailing slashes, ready for `/wp-json/...` suffixes.
    pub fn base_url(&self) -> &str {
        self.url.trim().trim_end_matches('/')
    }
}

impl fmt::Debug for WordPressCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WordPressCredentials")
            .field("site_name", &self.site_name)
            .field("url", &self.url)
            .field("username", &self.username)
            .field("app_password", &"<redacted>")
            .finish()
    }
}
