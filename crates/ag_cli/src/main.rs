use std::path::{Path, PathBuf};
use std::sync::Arc;
use clap::{ArgAction, Parser};
use tracing::info;
use ag_core::{
    ArticleStatus, GenerationConfig, Language, PlanType, Tone, WordPressCredentials, DEFAULT_HISTORY_LIMIT,
};
use ag_inference::{create_clients, ModelKind, DEFAULT_BASE_URL, DEFAULT_IMAGE_MODEL, DEFAULT_TEXT_MODEL};
use ag_pipeline::{extract_pdf_text, ArticleInput, Pipeline, TitleChoice, TitleInput};
use ag_publish::{create_publisher, PublishConfig, Publisher, WordPressStatus};
use ag_storage::{create_storage, Storage, StorageKind};
use ag_web::{create_app, AppState, RelayConfig};

#[derive(Parser, Debug)]
#[command(author, version, about = "SEO article generator for WordPress", long_about = None)]
pub struct Cli {
    #[arg(long, env = "AG_STORAGE", default_value = "memory", help = "Article storage: memory (default), sqlite")]
    storage: StorageKind,
    #[arg(long, env = "AG_DATABASE_PATH")]
    database_path: Option<PathBuf>,
    #[arg(long, default_value = "gemini", help = "Generation backend. Available models: gemini (default), dummy")]
    model: ModelKind,
    #[command(flatten)]
    gemini: GeminiArgs,
    #[command(flatten)]
    wordpress: WordPressArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Debug)]
struct GeminiArgs {
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
    #[arg(long, env = "GEMINI_TEXT_MODEL", default_value = DEFAULT_TEXT_MODEL)]
    text_model: String,
    #[arg(long, env = "GEMINI_IMAGE_MODEL", default_value = DEFAULT_IMAGE_MODEL)]
    image_model: String,
    #[arg(long, env = "GEMINI_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,
    /// Set to false to skip eyecatch and heading images.
    #[arg(long, env = "IMAGE_GEN_ENABLED", default_value_t = true, action = ArgAction::Set)]
    image_gen_enabled: bool,
}

#[derive(clap::Args, Debug)]
struct WordPressArgs {
    /// Relay endpoint. Without it posts go straight to the site.
    #[arg(long, env = "WP_PROXY_URL")]
    proxy_url: Option<String>,
    #[arg(long, env = "WP_PROXY_KEY", hide_env_values = true)]
    proxy_key: Option<String>,
    #[arg(long, env = "WORDPRESS_URL", default_value = "")]
    wordpress_url: String,
    #[arg(long, env = "WORDPRESS_USERNAME", default_value = "")]
    wordpress_username: String,
    #[arg(long, env = "WORDPRESS_APP_PASSWORD", default_value = "", hide_env_values = true)]
    wordpress_app_password: String,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Serve the wizard API and the WordPress relay.
    Serve {
        #[arg(long, default_value = "127.0.0.1:3000")]
        addr: String,
    },
    /// Run the whole wizard once without a browser.
    Generate(GenerateArgs),
    /// List saved articles, newest first.
    History {
        #[arg(long)]
        user: Option<String>,
        #[arg(long, default_value_t = DEFAULT_HISTORY_LIMIT)]
        limit: usize,
    },
    /// Check that WordPress accepts the credentials.
    WpTest {
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        app_password: Option<String>,
    },
}

#[derive(clap::Args, Debug)]
struct GenerateArgs {
    #[arg(long, default_value = "normal", help = "normal, expert, affiliate, foreign-language")]
    plan: PlanType,
    #[arg(long)]
    keywords: String,
    #[arg(long, default_value = "")]
    audience: String,
    /// Output language for the foreign-language plan.
    #[arg(long, default_value = "english")]
    language: Language,
    /// Which of the generated titles to use.
    #[arg(long, default_value_t = 0)]
    title_index: usize,
    /// Use this title instead of a generated one.
    #[arg(long)]
    title: Option<String>,
    /// Reference URL, may be repeated.
    #[arg(long = "url")]
    urls: Vec<String>,
    /// Source material for the expert plan.
    #[arg(long)]
    reference_file: Option<PathBuf>,
    #[arg(long, default_value_t = 3)]
    h2: u32,
    #[arg(long, default_value_t = 2)]
    h3: u32,
    #[arg(long, default_value_t = 400)]
    chars: u32,
    #[arg(long, default_value = "normal")]
    tone: Tone,
    #[arg(long, default_value = "")]
    custom: String,
    /// Post to WordPress with this status instead of saving a local draft.
    #[arg(long)]
    publish: Option<WordPressStatus>,
    #[arg(long)]
    user: Option<String>,
}

impl Cli {
    fn inference_config(&self) -> ag_inference::Config {
        ag_inference::Config {
            model: self.model,
            api_key: self
                .gemini
                .api_key
                .clone()
                .or_else(|| std::env::var("API_KEY").ok())
                .filter(|key| !key.is_empty()),
            base_url: self.gemini.base_url.clone(),
            text_model: self.gemini.text_model.clone(),
            image_model: self.gemini.image_model.clone(),
            image_generation_enabled: self.gemini.image_gen_enabled,
        }
    }

    fn publish_config(&self) -> PublishConfig {
        PublishConfig {
            proxy_url: self.wordpress.proxy_url.clone(),
            proxy_key: self.wordpress.proxy_key.clone(),
        }
    }

    fn default_credentials(&self) -> WordPressCredentials {
        WordPressCredentials::new(
            self.wordpress.wordpress_url.clone(),
            self.wordpress.wordpress_username.clone(),
            self.wordpress.wordpress_app_password.clone(),
        )
    }

    fn pipeline(&self, storage: &Storage) -> anyhow::Result<Pipeline> {
        let (text, images) = create_clients(&self.inference_config())?;
        info!("🧠 Generation clients ready (text: {}, images enabled: {})", text.model_name(), images.is_enabled());
        let publisher = create_publisher(&self.publish_config())?;
        Ok(Pipeline::new(text, images)
            .with_store(storage.articles.clone())
            .with_publisher(publisher))
    }
}

impl GenerateArgs {
    fn config(&self) -> GenerationConfig {
        GenerationConfig {
            h2_count: self.h2,
            h3_count: self.h3,
            chars_per_heading: self.chars,
            tone: self.tone,
            custom_prompt: self.custom.clone(),
            language: self.language,
        }
        .clamped()
    }
}

async fn serve(cli: &Cli, storage: Storage, addr: &str) -> anyhow::Result<()> {
    let relay = RelayConfig {
        proxy_key: cli.wordpress.proxy_key.clone(),
        defaults: cli.default_credentials(),
    };
    let state = AppState::new(cli.pipeline(&storage)?)
        .with_credentials(storage.credentials.clone())
        .with_relay(relay);
    let app = create_app(state).await;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("🌐 Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn generate(cli: &Cli, storage: Storage, args: &GenerateArgs) -> anyhow::Result<()> {
    let pipeline = cli.pipeline(&storage)?;
    let session = pipeline.session(args.plan, args.user.clone());

    let titles = session
        .generate_titles(TitleInput {
            keywords: args.keywords.clone(),
            audience: args.audience.clone(),
            language: args.language,
        })
        .await?;
    for (i, title) in titles.iter().enumerate() {
        info!("  {}. {}", i, title);
    }
    let choice = match &args.title {
        Some(title) => TitleChoice::Text(title.clone()),
        None => TitleChoice::Index(args.title_index),
    };
    let title = session.select_title(choice)?;
    info!("📝 Writing \"{}\"", title);

    let reference_text = match &args.reference_file {
        Some(path) => read_reference(path).await?,
        None => String::new(),
    };
    session
        .generate_article(ArticleInput {
            title: None,
            urls: args.urls.clone(),
            reference_text,
            config: args.config(),
        })
        .await?;
    session.wait_for_images().await;

    let snapshot = session.snapshot();
    for error in [&snapshot.errors.eyecatch, &snapshot.errors.heading_images].into_iter().flatten() {
        tracing::warn!("{}", error);
    }

    let article = match args.publish {
        Some(status) => {
            let credentials = match args.user.as_deref() {
                Some(user) => storage.credentials.fetch_credentials(user).await?,
                None => None,
            }
            .unwrap_or_else(|| cli.default_credentials());
            let (article, post) = session.post_to_wordpress(status, &credentials).await?;
            info!("🚀 Posted to WordPress as #{} {}", post.id, post.link);
            article
        }
        None => session.save_draft()?,
    };
    session.wait_for_persistence().await;

    println!("{}", serde_json::to_string_pretty(&article)?);
    Ok(())
}

/// PDFs are flattened to text; anything else is read as UTF-8.
async fn read_reference(path: &Path) -> anyhow::Result<String> {
    let is_pdf = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    if !is_pdf {
        return Ok(tokio::fs::read_to_string(path).await?);
    }
    let bytes = tokio::fs::read(path).await?;
    let text = tokio::task::spawn_blocking(move || extract_pdf_text(&bytes)).await??;
    info!("📎 Loaded {} characters from {}", text.chars().count(), path.display());
    Ok(text)
}

async fn history(storage: Storage, user: Option<&str>, limit: usize) -> anyhow::Result<()> {
    let articles = storage.articles.fetch_articles(user, limit).await?;
    if articles.is_empty() {
        println!("No saved articles.");
    }
    for article in articles {
        let marker = match article.status {
            ArticleStatus::Published => "*",
            ArticleStatus::Draft => " ",
        };
        println!(
            "{} {}  {}  [{}] {}",
            marker,
            article.created_at.format("%Y-%m-%d %H:%M"),
            article.status.label(),
            article.plan.plan().name,
            article.title
        );
    }
    Ok(())
}

async fn wp_test(cli: &Cli, credentials: WordPressCredentials) -> anyhow::Result<()> {
    let publisher: Arc<dyn Publisher> = create_publisher(&cli.publish_config())?;
    let message = publisher.test_connection(&credentials).await?;
    println!("{}", message);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
    let cli = Cli::parse();

    let storage = create_storage(cli.storage, cli.database_path.as_deref()).await?;
    info!("💾 Storage initialized (using {:?})", cli.storage);

    match &cli.command {
        Commands::Serve { addr } => serve(&cli, storage, addr).await,
        Commands::Generate(args) => generate(&cli, storage, args).await,
        Commands::History { user, limit } => history(storage, user.as_deref(), *limit).await,
        Commands::WpTest { url, username, app_password } => {
            let defaults = cli.default_credentials();
            let credentials = WordPressCredentials::new(
                url.clone().unwrap_or(defaults.url),
                username.clone().unwrap_or(defaults.username),
                app_password.clone().unwrap_or(defaults.app_password),
            );
            wp_test(&cli, credentials).await
        }
    }
}
