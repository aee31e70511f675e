use std::path::{Path, PathBuf};
use std::sync::Arc;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqliteRow};
use sqlx::Row;
use ag_core::{Article, ArticleStatus, ArticleStore, CredentialStore, Error, Result, WordPressCredentials};

pub const DEFAULT_DATABASE_PATH: &str = "articles.db";

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS articles (
        id TEXT PRIMARY KEY,
        user_id TEXT,
        title TEXT NOT NULL,
        content TEXT NOT NULL,
        html_content TEXT NOT NULL,
        created_at TEXT NOT NULL,
        status TEXT NOT NULL,
        plan TEXT NOT NULL,
        sources TEXT NOT NULL,
        eyecatch_image TEXT,
        meta_description TEXT NOT NULL,
        heading_images TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS wp_credentials (
        user_id TEXT PRIMARY KEY,
        site_name TEXT,
        url TEXT NOT NULL,
        username TEXT NOT NULL,
        app_password TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_articles_created_at ON articles (created_at DESC)",
];

fn db_error(context: &str, e: sqlx::Error) -> Error {
    Error::Persistence(format!("{}: {}", context, e))
}

pub struct SQLiteStorage {
    pool: Arc<SqlitePool>,
    db_path: PathBuf,
}

impl SQLiteStorage {
    pub async fn new() -> Result<Self> {
        Self::new_with_path(Path::new(DEFAULT_DATABASE_PATH)).await
    }

    pub async fn new_with_path(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Persistence(format!("Failed to create database directory: {}", e)))?;
        }

        let options = SqliteConnectOptions::new().filename(db_path).create_if_missing(true);
        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(|e| db_error("Failed to connect to database", e))?;

        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&pool)
                .await
                .map_err(|e| db_error(&format!("Failed to run migration {}", i), e))?;
        }

        tracing::debug!(path = %db_path.display(), "sqlite storage ready");
        Ok(Self {
            pool: Arc::new(pool),
            db_path: db_path.to_path_buf(),
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn row_to_article(row: &SqliteRow) -> Result<Article> {
        let created_at: String = row.get("created_at");
        let created_at = DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| Error::Persistence(format!("Failed to parse date: {}", e)))?
            .with_timezone(&Utc);
        let status: String = row.get("status");
        let plan: String = row.get("plan");
        let sources: String = row.get("sources");
        let heading_images: String = row.get("heading_images");

        Ok(Article {
            id: row.get("id"),
            title: row.get("title"),
            content: row.get("content"),
            html_content: row.get("html_content"),
            created_at,
            // Rows written by older clients may carry unknown labels.
            status: ArticleStatus::parse(&status).unwrap_or(ArticleStatus::Draft),
            plan: plan.parse()?,
            sources: serde_json::from_str(&sources)?,
            eyecatch_image: row.get("eyecatch_image"),
            meta_description: row.get("meta_description"),
            heading_images: serde_json::from_str(&heading_images)?,
            user_id: row.get("user_id"),
        })
    }
}

#[async_trait]
impl ArticleStore for SQLiteStorage {
    async fn fetch_articles(&self, user_id: Option<&str>, limit: usize) -> Result<Vec<Article>> {
        let rows = match user_id {
            Some(user) => {
                sqlx::query(
                    r#"
                    SELECT * FROM articles
                    WHERE user_id = ? OR user_id IS NULL
                    ORDER BY created_at DESC
                    LIMIT ?
                    "#,
                )
                .bind(user)
                .bind(limit as i64)
                .fetch_all(&*self.pool)
                .await
            }
            None => {
                sqlx::query("SELECT * FROM articles ORDER BY created_at DESC LIMIT ?")
                    .bind(limit as i64)
                    .fetch_all(&*self.pool)
                    .await
            }
        }
        .map_err(|e| db_error("Failed to fetch articles", e))?;

        rows.iter().map(Self::row_to_article).collect()
    }

    async fn save_article(&self, article: &Article, user_id: Option<&str>) -> Result<()> {
        let sources = serde_json::to_string(&article.sources)?;
        let heading_images = serde_json::to_string(&article.heading_images)?;

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO articles
            (id, user_id, title, content, html_content, created_at, status, plan,
             sources, eyecatch_image, meta_description, heading_images)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&article.id)
        .bind(user_id)
        .bind(&article.title)
        .bind(&article.content)
        .bind(&article.html_content)
        .bind(article.created_at.to_rfc3339_opts(SecondsFormat::Millis, true))
        .bind(article.status.as_str())
        .bind(article.plan.to_string())
        .bind(sources)
        .bind(article.eyecatch_image.as_deref())
        .bind(&article.meta_description)
        .bind(heading_images)
        .execute(&*self.pool)
        .await
        .map_err(|e| db_error("Failed to store article", e))?;

        Ok(())
    }
}

#[async_trait]
impl CredentialStore for SQLiteStorage {
    async fn fetch_credentials(&self, user_id: &str) -> Result<Option<WordPressCredentials>> {
        let row = sqlx::query("SELECT * FROM wp_credentials WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| db_error("Failed to fetch credentials", e))?;

        Ok(row.map(|row| WordPressCredentials {
            site_name: row.get("site_name"),
            url: row.get("url"),
            username: row.get("username"),
            app_password: row.get("app_password"),
        }))
    }

    async fn save_credentials(&self, user_id: &str, credentials: &WordPressCredentials) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO wp_credentials
            (user_id, site_name, url, username, app_password)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(credentials.site_name.as_deref())
        .bind(&credentials.url)
        .bind(&credentials.username)
        .bind(&credentials.app_password)
        .execute(&*self.pool)
        .await
        .map_err(|e| db_error("Failed to store credentials", e))?;

        Ok(())
    }
}
