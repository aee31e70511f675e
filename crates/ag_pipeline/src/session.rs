use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use ag_core::{
    Article, ArticleStatus, ArticleStore, Error, GeneratedImage, GenerationConfig, GroundingSource, HeadingImage,
    Language, PlanType, Result, WordPressCredentials,
};
use ag_inference::prompts::{build_article_prompt, build_title_prompt, meta_fallback, ArticleBrief};
use ag_inference::{ArticleDecoding, ImageGenerationClient, TextGenerationClient};
use ag_publish::{PostDraft, PublishedPost, Publisher, WordPressStatus};
use crate::history::ArticleHistory;
use crate::markdown::{extract_headings, render_html};
use crate::outcome::{OutcomeSink, PersistenceOutcome, TracingOutcomeSink};

const KEYWORDS_REQUIRED: &str = "キーワードを入力してください。";
const TITLE_REQUIRED: &str = "タイトルを選択してください。";
const TITLES_FAILED: &str = "タイトルの生成に失敗しました。もう一度お試しください。";
const ARTICLE_FAILED: &str = "記事の生成に失敗しました。もう一度お試しください。";
const HEADING_IMAGES_FAILED: &str = "見出し画像を生成できませんでした。";
const PUBLISHER_MISSING: &str = "WordPress連携が設定されていません。";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    #[default]
    Keywords,
    Titles,
    Editor,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Keywords => "keywords",
            Step::Titles => "titles",
            Step::Editor => "editor",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TitleInput {
    pub keywords: String,
    #[serde(default)]
    pub audience: String,
    #[serde(default)]
    pub language: Language,
}

/// A title picked by position in the candidate list, or typed in.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TitleChoice {
    Index(usize),
    Text(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ArticleInput {
    /// Overrides the selected title when present.
    pub title: Option<String>,
    pub urls: Vec<String>,
    pub reference_text: String,
    pub config: GenerationConfig,
}

/// Per-stage in-flight flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StageFlags {
    pub titles: bool,
    pub article: bool,
    pub eyecatch: bool,
    pub heading_images: bool,
    pub publish: bool,
}

/// Per-stage user-facing error messages from the last attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StageErrors {
    pub titles: Option<String>,
    pub article: Option<String>,
    pub eyecatch: Option<String>,
    pub heading_images: Option<String>,
    pub publish: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub plan: PlanType,
    pub user_id: Option<String>,
    pub step: Step,
    pub keywords: String,
    pub audience: String,
    pub language: Language,
    pub titles: Vec<String>,
    pub selected_title: Option<String>,
    pub config: GenerationConfig,
    pub content: String,
    pub html_content: String,
    pub meta_description: String,
    pub sources: Vec<GroundingSource>,
    /// Data URI.
    pub eyecatch_image: Option<String>,
    pub heading_images: Vec<HeadingImage>,
    pub loading: StageFlags,
    pub errors: StageErrors,
}

/// Shared collaborators for every session.
#[derive(Clone)]
pub struct Pipeline {
    text: TextGenerationClient,
    images: ImageGenerationClient,
    store: Option<Arc<dyn ArticleStore>>,
    publisher: Option<Arc<dyn Publisher>>,
    history: ArticleHistory,
    outcomes: Arc<dyn OutcomeSink>,
}

impl Pipeline {
    pub fn new(text: TextGenerationClient, images: ImageGenerationClient) -> Self {
        Self {
            text,
            images,
            store: None,
            publisher: None,
            history: ArticleHistory::new(),
            outcomes: Arc::new(TracingOutcomeSink::new()),
        }
    }

    pub fn with_store(mut self, store: Arc<dyn ArticleStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_publisher(mut self, publisher: Arc<dyn Publisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn with_history(mut self, history: ArticleHistory) -> Self {
        self.history = history;
        self
    }

    pub fn with_outcome_sink(mut self, outcomes: Arc<dyn OutcomeSink>) -> Self {
        self.outcomes = outcomes;
        self
    }

    pub fn history(&self) -> &ArticleHistory {
        &self.history
    }

    pub fn store(&self) -> Option<&Arc<dyn ArticleStore>> {
        self.store.as_ref()
    }

    pub fn publisher(&self) -> Option<&Arc<dyn Publisher>> {
        self.publisher.as_ref()
    }

    pub fn session(&self, plan: PlanType, user_id: Option<String>) -> GenerationSession {
        GenerationSession {
            pipeline: self.clone(),
            plan,
            user_id,
            state: Arc::new(Mutex::new(SessionState::default())),
        }
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("text", &self.text)
            .field("images", &self.images)
            .field("store", &self.store.is_some())
            .field("publisher", &self.publisher)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
struct Draft {
    content: String,
    meta_description: String,
    sources: Vec<GroundingSource>,
    eyecatch: Option<GeneratedImage>,
    heading_images: Vec<HeadingImage>,
}

#[derive(Default)]
struct SessionState {
    step: Step,
    keywords: String,
    audience: String,
    language: Language,
    titles: Vec<String>,
    selected_title: Option<String>,
    config: GenerationConfig,
    draft: Draft,
    loading: StageFlags,
    errors: StageErrors,
    /// Bumped whenever the current draft is replaced or discarded.
    epoch: u64,
    /// Bumped on every eyecatch (re)generation.
    eyecatch_epoch: u64,
    eyecatch_task: Option<JoinHandle<()>>,
    heading_task: Option<JoinHandle<()>>,
    persist_tasks: Vec<JoinHandle<()>>,
}

impl SessionState {
    fn require(&self, step: Step) -> Result<()> {
        if self.step == step {
            Ok(())
        } else {
            Err(Error::InvalidStep(format!("expected step {}, session is at {}", step, self.step)))
        }
    }

    fn ensure_text_idle(&self) -> Result<()> {
        if self.loading.titles || self.loading.article {
            return Err(Error::InvalidStep("a text generation request is already in flight".to_string()));
        }
        Ok(())
    }

    /// Finalize and navigation wait for an in-flight publish to settle.
    fn ensure_publish_idle(&self) -> Result<()> {
        if self.loading.publish {
            return Err(Error::InvalidStep("a publish request is already in flight".to_string()));
        }
        Ok(())
    }

    fn abort_images(&mut self) {
        for task in [self.eyecatch_task.take(), self.heading_task.take()].into_iter().flatten() {
            task.abort();
        }
    }

    /// Back to an empty `Keywords` step. Anything still in flight becomes stale.
    fn reset(&mut self) {
        self.abort_images();
        let epoch = self.epoch + 1;
        let eyecatch_epoch = self.eyecatch_epoch + 1;
        let persist_tasks = std::mem::take(&mut self.persist_tasks);
        *self = SessionState {
            epoch,
            eyecatch_epoch,
            persist_tasks,
            ..SessionState::default()
        };
    }
}

fn lock(state: &Mutex<SessionState>) -> MutexGuard<'_, SessionState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn superseded() -> Error {
    Error::InvalidStep("the session moved on before the request finished".to_string())
}

/// One run of the keywords → titles → editor wizard.
///
/// Methods take `&self` and never hold the state lock across an await, so a
/// snapshot can be taken while a request is in flight.
pub struct GenerationSession {
    pipeline: Pipeline,
    plan: PlanType,
    user_id: Option<String>,
    state: Arc<Mutex<SessionState>>,
}

impl GenerationSession {
    pub fn plan(&self) -> PlanType {
        self.plan
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn step(&self) -> Step {
        self.lock().step
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        lock(&self.state)
    }

    pub async fn generate_titles(&self, input: TitleInput) -> Result<Vec<String>> {
        let epoch = {
            let mut st = self.lock();
            st.require(Step::Keywords)?;
            st.ensure_text_idle()?;
            if input.keywords.trim().is_empty() {
                st.errors.titles = Some(KEYWORDS_REQUIRED.to_string());
                return Err(Error::InputValidation(KEYWORDS_REQUIRED.to_string()));
            }
            st.keywords = input.keywords;
            st.audience = input.audience;
            st.language = input.language;
            st.loading.titles = true;
            st.errors.titles = None;
            st.epoch
        };
        self.run_titles(epoch).await
    }

    /// Same request again with the stored keywords; replaces the candidates.
    pub async fn regenerate_titles(&self) -> Result<Vec<String>> {
        let epoch = {
            let mut st = self.lock();
            st.require(Step::Titles)?;
            st.ensure_text_idle()?;
            st.loading.titles = true;
            st.errors.titles = None;
            st.epoch
        };
        self.run_titles(epoch).await
    }

    async fn run_titles(&self, epoch: u64) -> Result<Vec<String>> {
        let prompt = {
            let st = self.lock();
            build_title_prompt(self.plan, &st.keywords, &st.audience, st.language)
        };
        tracing::info!(plan = %self.plan, "generating titles");
        let result = self.pipeline.text.request_titles(&prompt).await;

        let mut st = self.lock();
        if st.epoch != epoch {
            return Err(superseded());
        }
        st.loading.titles = false;
        match result {
            Ok(titles) => {
                st.titles = titles.clone();
                st.selected_title = None;
                st.step = Step::Titles;
                Ok(titles)
            }
            Err(e) => {
                st.errors.titles = Some(TITLES_FAILED.to_string());
                Err(e)
            }
        }
    }

    pub fn select_title(&self, choice: TitleChoice) -> Result<String> {
        let mut st = self.lock();
        st.require(Step::Titles)?;
        st.ensure_text_idle()?;
        let title = match choice {
            TitleChoice::Index(index) => st.titles.get(index).cloned().ok_or_else(|| {
                Error::InputValidation(format!("title index {} is out of range ({} candidates)", index, st.titles.len()))
            })?,
            TitleChoice::Text(text) if text.trim().is_empty() => {
                return Err(Error::InputValidation(TITLE_REQUIRED.to_string()));
            }
            TitleChoice::Text(text) => text,
        };
        st.selected_title = Some(title.clone());
        Ok(title)
    }

    /// Generates the article and moves to the editor as soon as the text is
    /// in. Eyecatch and heading images are requested in the background.
    pub async fn generate_article(&self, input: ArticleInput) -> Result<()> {
        let (epoch, title, keywords, audience) = {
            let mut st = self.lock();
            st.require(Step::Titles)?;
            st.ensure_text_idle()?;
            if let Some(title) = input.title.as_ref().filter(|title| !title.trim().is_empty()) {
                st.selected_title = Some(title.clone());
            }
            let Some(title) = st.selected_title.clone() else {
                st.errors.article = Some(TITLE_REQUIRED.to_string());
                return Err(Error::InputValidation(TITLE_REQUIRED.to_string()));
            };
            st.loading.article = true;
            st.errors.article = None;
            (st.epoch, title, st.keywords.clone(), st.audience.clone())
        };

        let brief = ArticleBrief {
            title: &title,
            keywords: &keywords,
            audience: &audience,
            plan: self.plan,
            urls: &input.urls,
            reference_text: &input.reference_text,
        };
        let prompt = build_article_prompt(&brief, &input.config);
        let decoding = if self.plan.uses_structured_output() {
            ArticleDecoding::Structured
        } else {
            ArticleDecoding::Delimited { meta_fallback: meta_fallback(self.plan, input.config.language) }
        };
        tracing::info!(plan = %self.plan, title = %title, "generating article");
        let result = self.pipeline.text.request_article(&prompt, decoding).await;

        let mut st = self.lock();
        if st.epoch != epoch {
            return Err(superseded());
        }
        st.loading.article = false;
        let generated = match result {
            Ok(generated) => generated,
            Err(e) => {
                st.errors.article = Some(ARTICLE_FAILED.to_string());
                return Err(e);
            }
        };

        st.abort_images();
        st.epoch += 1;
        st.eyecatch_epoch += 1;
        st.selected_title = Some(title.clone());
        st.config = input.config;
        st.draft = Draft {
            content: generated.article_text,
            meta_description: generated.meta_description,
            sources: generated.sources,
            eyecatch: None,
            heading_images: Vec::new(),
        };
        st.errors.eyecatch = None;
        st.errors.heading_images = None;
        st.step = Step::Editor;

        let headings = extract_headings(&st.draft.content);
        tracing::info!(headings = headings.len(), sources = st.draft.sources.len(), "article ready");
        self.spawn_eyecatch(&mut st, title);
        if !headings.is_empty() {
            self.spawn_heading_images(&mut st, headings);
        }
        Ok(())
    }

    /// New eyecatch for the current title. Heading images are left alone.
    pub fn regenerate_eyecatch(&self) -> Result<()> {
        let mut st = self.lock();
        st.require(Step::Editor)?;
        if let Some(task) = st.eyecatch_task.take() {
            task.abort();
        }
        st.eyecatch_epoch += 1;
        let title = st.selected_title.clone().unwrap_or_default();
        self.spawn_eyecatch(&mut st, title);
        Ok(())
    }

    fn spawn_eyecatch(&self, st: &mut SessionState, title: String) {
        let state = Arc::clone(&self.state);
        let images = self.pipeline.images.clone();
        let (epoch, eyecatch_epoch) = (st.epoch, st.eyecatch_epoch);
        st.loading.eyecatch = true;
        st.errors.eyecatch = None;

        st.eyecatch_task = Some(tokio::spawn(async move {
            let result = images.request_eyecatch(&title).await;
            let mut st = lock(&state);
            if st.epoch != epoch || st.eyecatch_epoch != eyecatch_epoch {
                tracing::debug!(epoch, eyecatch_epoch, "discarding stale eyecatch result");
                return;
            }
            st.loading.eyecatch = false;
            match result {
                Ok(image) => st.draft.eyecatch = Some(image),
                Err(e) => st.errors.eyecatch = Some(e.user_message()),
            }
        }));
    }

    fn spawn_heading_images(&self, st: &mut SessionState, headings: Vec<String>) {
        let state = Arc::clone(&self.state);
        let images = self.pipeline.images.clone();
        let epoch = st.epoch;
        st.loading.heading_images = true;
        st.errors.heading_images = None;

        st.heading_task = Some(tokio::spawn(async move {
            let generated = images.request_heading_images(&headings).await;
            let mut st = lock(&state);
            if st.epoch != epoch {
                tracing::debug!(epoch, "discarding stale heading images");
                return;
            }
            st.loading.heading_images = false;
            if generated.is_empty() && images.is_enabled() {
                st.errors.heading_images = Some(HEADING_IMAGES_FAILED.to_string());
            }
            tracing::info!(requested = headings.len(), generated = generated.len(), "heading images ready");
            st.draft.heading_images = generated;
        }));
    }

    /// Replace the draft markdown. Headings are not re-extracted, so an edited
    /// heading loses its image.
    pub fn edit_content(&self, markdown: impl Into<String>) -> Result<()> {
        let mut st = self.lock();
        st.require(Step::Editor)?;
        st.ensure_publish_idle()?;
        st.draft.content = markdown.into();
        Ok(())
    }

    /// Discard everything and return to `Keywords`.
    pub fn back(&self) -> Result<()> {
        let mut st = self.lock();
        st.ensure_publish_idle()?;
        st.reset();
        Ok(())
    }

    pub fn save_draft(&self) -> Result<Article> {
        let mut st = self.lock();
        st.require(Step::Editor)?;
        st.ensure_publish_idle()?;
        let article = self.assemble(&st, ArticleStatus::Draft);
        tracing::info!(id = %article.id, "saving draft");
        self.record(&mut st, article.clone());
        st.reset();
        Ok(article)
    }

    /// Post the current draft. On success the article is recorded like a
    /// saved draft, marked published when WordPress was asked to publish.
    /// On failure nothing is recorded and the editor stays as it was.
    pub async fn post_to_wordpress(
        &self,
        status: WordPressStatus,
        credentials: &WordPressCredentials,
    ) -> Result<(Article, PublishedPost)> {
        let publisher = self
            .pipeline
            .publisher
            .clone()
            .ok_or_else(|| Error::InputValidation(PUBLISHER_MISSING.to_string()))?;

        let (epoch, mut article) = {
            let mut st = self.lock();
            st.require(Step::Editor)?;
            st.ensure_publish_idle()?;
            st.loading.publish = true;
            st.errors.publish = None;
            (st.epoch, self.assemble(&st, ArticleStatus::Draft))
        };

        let draft = PostDraft {
            title: article.title.clone(),
            content_html: article.html_content.clone(),
            status,
            excerpt: Some(article.meta_description.clone()),
        };
        let result = publisher.post(credentials, &draft).await;

        let mut st = self.lock();
        let current = st.epoch == epoch;
        if current {
            st.loading.publish = false;
        }
        let post = match result {
            Ok(post) => post,
            Err(e) => {
                tracing::warn!(error = %e, "publish failed");
                if current {
                    st.errors.publish = Some(e.user_message());
                }
                return Err(e);
            }
        };

        if status == WordPressStatus::Publish {
            article.mark_published();
        }
        tracing::info!(id = %article.id, post_id = post.id, status = %article.status.as_str(), "article posted");
        self.record(&mut st, article.clone());
        if current {
            st.reset();
        }
        Ok((article, post))
    }

    fn assemble(&self, st: &SessionState, status: ArticleStatus) -> Article {
        let now = Utc::now();
        Article {
            id: Article::generate_id(now),
            title: st.selected_title.clone().unwrap_or_default(),
            content: st.draft.content.clone(),
            html_content: render_html(&st.draft.content, &st.draft.heading_images),
            created_at: now,
            status,
            plan: self.plan,
            sources: st.draft.sources.clone(),
            eyecatch_image: st.draft.eyecatch.as_ref().map(GeneratedImage::data_uri),
            meta_description: st.draft.meta_description.clone(),
            heading_images: st.draft.heading_images.clone(),
            user_id: self.user_id.clone(),
        }
    }

    /// History first, synchronously; the store write runs in the background
    /// and only its outcome sink hears about failures.
    fn record(&self, st: &mut SessionState, article: Article) {
        self.pipeline.history.record(article.clone());

        let Some(store) = self.pipeline.store.clone() else {
            return;
        };
        let outcomes = Arc::clone(&self.pipeline.outcomes);
        let user_id = self.user_id.clone();
        st.persist_tasks.retain(|task| !task.is_finished());
        st.persist_tasks.push(tokio::spawn(async move {
            let outcome = match store.save_article(&article, user_id.as_deref()).await {
                Ok(()) => PersistenceOutcome::Saved { article_id: article.id },
                Err(e) => PersistenceOutcome::Failed { article_id: article.id, error: e.to_string() },
            };
            outcomes.report(&outcome);
        }));
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let st = self.lock();
        SessionSnapshot {
            plan: self.plan,
            user_id: self.user_id.clone(),
            step: st.step,
            keywords: st.keywords.clone(),
            audience: st.audience.clone(),
            language: st.language,
            titles: st.titles.clone(),
            selected_title: st.selected_title.clone(),
            config: st.config.clone(),
            content: st.draft.content.clone(),
            html_content: render_html(&st.draft.content, &st.draft.heading_images),
            meta_description: st.draft.meta_description.clone(),
            sources: st.draft.sources.clone(),
            eyecatch_image: st.draft.eyecatch.as_ref().map(GeneratedImage::data_uri),
            heading_images: st.draft.heading_images.clone(),
            loading: st.loading.clone(),
            errors: st.errors.clone(),
        }
    }

    /// Wait for the background image tasks, including any started while
    /// waiting.
    pub async fn wait_for_images(&self) {
        loop {
            let tasks: Vec<JoinHandle<()>> = {
                let mut st = self.lock();
                let eyecatch = st.eyecatch_task.take();
                let headings = st.heading_task.take();
                eyecatch.into_iter().chain(headings).collect()
            };
            if tasks.is_empty() {
                return;
            }
            join_quietly(tasks).await;
        }
    }

    /// Wait for background store writes started by finalize.
    pub async fn wait_for_persistence(&self) {
        let tasks = std::mem::take(&mut self.lock().persist_tasks);
        join_quietly(tasks).await;
    }
}

async fn join_quietly(tasks: Vec<JoinHandle<()>>) {
    for task in tasks {
        if let Err(e) = task.await {
            if !e.is_cancelled() {
                tracing::warn!(error = %e, "background task failed");
            }
        }
    }
}

/// Image tasks die with the session; queued store writes still run.
impl Drop for GenerationSession {
    fn drop(&mut self) {
        lock(&self.state).abort_images();
    }
}

impl fmt::Debug for GenerationSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationSession")
            .field("plan", &self.plan)
            .field("user_id", &self.user_id)
            .field("step", &self.step())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use ag_inference::models::{DummyImageModel, DummyTextModel};
    use ag_core::{ResponseFormat, TextModel, TextRequest, TextResponse};
    use ag_publish::{PublishConfig, WordPressClient};
    use ag_storage::InMemoryStorage;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct Fixture {
        text: Arc<DummyTextModel>,
        images: Arc<DummyImageModel>,
        pipeline: Pipeline,
    }

    fn fixture() -> Fixture {
        let text = Arc::new(DummyTextModel::new());
        let images = Arc::new(DummyImageModel::new());
        let pipeline = Pipeline::new(
            TextGenerationClient::new(text.clone()),
            ImageGenerationClient::new(images.clone(), true),
        );
        Fixture { text, images, pipeline }
    }

    fn image(tag: &str) -> GeneratedImage {
        GeneratedImage { base64: tag.to_string(), mime_type: "image/jpeg".to_string() }
    }

    fn keywords(keywords: &str) -> TitleInput {
        TitleInput { keywords: keywords.to_string(), ..TitleInput::default() }
    }

    async fn to_editor(session: &GenerationSession) {
        session.generate_titles(keywords("tax filing")).await.unwrap();
        session.select_title(TitleChoice::Index(0)).unwrap();
        session.generate_article(ArticleInput::default()).await.unwrap();
    }

    /// Yield until `ready` holds, letting spawned session calls make progress.
    async fn until(mut ready: impl FnMut() -> bool) {
        for _ in 0..1000 {
            if ready() {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("condition never became true");
    }

    /// Holds free-text (article) requests until released.
    #[derive(Debug, Default)]
    struct HeldArticleModel {
        inner: DummyTextModel,
        release: tokio::sync::Notify,
    }

    #[async_trait::async_trait]
    impl TextModel for HeldArticleModel {
        fn name(&self) -> &str {
            "Held"
        }

        async fn generate(&self, request: TextRequest) -> Result<TextResponse> {
            if matches!(request.format, ResponseFormat::Free) {
                self.release.notified().await;
            }
            self.inner.generate(request).await
        }
    }

    /// Yield until the image model has seen `count` requests.
    async fn until_image_requests(images: &DummyImageModel, count: usize) {
        for _ in 0..1000 {
            if images.requests().len() >= count {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("image model never received {} requests", count);
    }

    #[tokio::test]
    async fn test_normal_plan_end_to_end() {
        let f = fixture();
        let session = f.pipeline.session(PlanType::Normal, Some("alice".to_string()));

        let titles = session.generate_titles(keywords("tax filing")).await.unwrap();
        assert_eq!(titles.len(), 10);
        assert_eq!(session.step(), Step::Titles);

        let chosen = session.select_title(TitleChoice::Index(0)).unwrap();
        session.generate_article(ArticleInput::default()).await.unwrap();

        let snapshot = session.snapshot();
        assert_eq!(snapshot.step, Step::Editor);
        assert_eq!(snapshot.content.matches("## ").count(), 3);
        assert!(!snapshot.meta_description.is_empty());
        assert_eq!(snapshot.sources.len(), 1);

        let requests = f.text.requests();
        assert!(requests[1].search_grounding);
        assert!(matches!(requests[1].format, ResponseFormat::Free));

        session.wait_for_images().await;
        let snapshot = session.snapshot();
        assert!(snapshot.eyecatch_image.unwrap().starts_with("data:image/jpeg;base64,"));
        assert_eq!(snapshot.heading_images.len(), 3);
        assert_eq!(snapshot.html_content.matches("<img").count(), 3);
        assert_eq!(snapshot.loading, StageFlags::default());

        let article = session.save_draft().unwrap();
        assert_eq!(article.status, ArticleStatus::Draft);
        assert_eq!(article.title, chosen);
        assert!(!article.id.is_empty());
        assert_eq!(article.user_id.as_deref(), Some("alice"));
        assert_eq!(f.pipeline.history().len(), 1);
        assert_eq!(session.step(), Step::Keywords);
        assert!(session.snapshot().titles.is_empty());
    }

    #[tokio::test]
    async fn test_expert_plan_uses_structured_output() {
        let f = fixture();
        let session = f.pipeline.session(PlanType::Expert, None);
        to_editor(&session).await;

        let snapshot = session.snapshot();
        assert!(snapshot.sources.is_empty());
        assert!(!snapshot.content.is_empty());
        let requests = f.text.requests();
        assert!(matches!(requests[1].format, ResponseFormat::Json(_)));
        assert!(!requests[1].search_grounding);
    }

    #[tokio::test]
    async fn test_blank_keywords_rejected_before_any_request() {
        let f = fixture();
        let session = f.pipeline.session(PlanType::Normal, None);

        let err = session.generate_titles(keywords("   ")).await.unwrap_err();
        assert!(matches!(err, Error::InputValidation(_)));
        assert!(f.text.requests().is_empty());
        assert_eq!(session.snapshot().errors.titles.as_deref(), Some(KEYWORDS_REQUIRED));
    }

    #[tokio::test]
    async fn test_title_failure_stays_on_keywords_and_can_retry() {
        let f = fixture();
        f.text.push_error("quota");
        let session = f.pipeline.session(PlanType::Normal, None);

        assert!(matches!(session.generate_titles(keywords("tax")).await, Err(Error::Generation(_))));
        let snapshot = session.snapshot();
        assert_eq!(snapshot.step, Step::Keywords);
        assert_eq!(snapshot.errors.titles.as_deref(), Some(TITLES_FAILED));
        assert!(!snapshot.loading.titles);

        session.generate_titles(keywords("tax")).await.unwrap();
        assert_eq!(session.step(), Step::Titles);
        assert!(session.snapshot().errors.titles.is_none());
    }

    #[tokio::test]
    async fn test_regenerate_titles_replaces_candidates() {
        let f = fixture();
        let session = f.pipeline.session(PlanType::Affiliate, None);
        assert!(matches!(session.regenerate_titles().await, Err(Error::InvalidStep(_))));

        session.generate_titles(keywords("vpn")).await.unwrap();
        session.select_title(TitleChoice::Index(3)).unwrap();
        f.text.push_text(r#"{"titles": ["Only one"]}"#);
        let titles = session.regenerate_titles().await.unwrap();
        assert_eq!(titles, vec!["Only one"]);

        let snapshot = session.snapshot();
        assert_eq!(snapshot.step, Step::Titles);
        assert!(snapshot.selected_title.is_none());
        assert_eq!(f.text.requests()[0].prompt, f.text.requests()[1].prompt);
    }

    #[tokio::test]
    async fn test_article_requires_a_title() {
        let f = fixture();
        let session = f.pipeline.session(PlanType::Normal, None);
        session.generate_titles(keywords("tax")).await.unwrap();

        let err = session.generate_article(ArticleInput::default()).await.unwrap_err();
        assert!(matches!(err, Error::InputValidation(_)));
        assert_eq!(f.text.requests().len(), 1);
        assert!(session.select_title(TitleChoice::Index(99)).is_err());
        assert!(session.select_title(TitleChoice::Text(" ".to_string())).is_err());

        let input = ArticleInput { title: Some("My own title".to_string()), ..ArticleInput::default() };
        session.generate_article(input).await.unwrap();
        assert_eq!(session.snapshot().selected_title.as_deref(), Some("My own title"));
    }

    #[tokio::test]
    async fn test_article_failure_stays_on_titles() {
        let f = fixture();
        let session = f.pipeline.session(PlanType::Normal, None);
        session.generate_titles(keywords("tax")).await.unwrap();
        session.select_title(TitleChoice::Index(0)).unwrap();

        f.text.push_error("boom");
        assert!(session.generate_article(ArticleInput::default()).await.is_err());
        let snapshot = session.snapshot();
        assert_eq!(snapshot.step, Step::Titles);
        assert_eq!(snapshot.errors.article.as_deref(), Some(ARTICLE_FAILED));
        assert!(f.images.requests().is_empty());
    }

    #[tokio::test]
    async fn test_operations_are_gated_by_step() {
        let f = fixture();
        let session = f.pipeline.session(PlanType::Normal, None);
        assert!(matches!(session.save_draft(), Err(Error::InvalidStep(_))));
        assert!(matches!(session.edit_content("x"), Err(Error::InvalidStep(_))));
        assert!(matches!(session.regenerate_eyecatch(), Err(Error::InvalidStep(_))));
        assert!(matches!(session.select_title(TitleChoice::Index(0)), Err(Error::InvalidStep(_))));
        assert!(matches!(
            session.generate_article(ArticleInput::default()).await,
            Err(Error::InvalidStep(_))
        ));
    }

    #[tokio::test]
    async fn test_editor_is_ready_before_images() {
        let f = fixture();
        f.images.push_after(Duration::from_millis(200), Some(image("SLOW")));
        let session = f.pipeline.session(PlanType::Normal, None);
        session.generate_titles(keywords("tax")).await.unwrap();
        session.select_title(TitleChoice::Index(0)).unwrap();
        f.text.push_text("No headings here.\n---meta---\nmeta");
        session.generate_article(ArticleInput::default()).await.unwrap();

        let snapshot = session.snapshot();
        assert_eq!(snapshot.step, Step::Editor);
        assert!(snapshot.loading.eyecatch);
        assert!(snapshot.eyecatch_image.is_none());

        session.wait_for_images().await;
        assert_eq!(session.snapshot().eyecatch_image.as_deref(), Some("data:image/jpeg;base64,SLOW"));
    }

    #[tokio::test]
    async fn test_regenerated_eyecatch_wins_over_stale_result() {
        let f = fixture();
        f.images.push_after(Duration::from_millis(300), Some(image("OLD")));
        let session = f.pipeline.session(PlanType::Normal, None);
        session.generate_titles(keywords("tax")).await.unwrap();
        session.select_title(TitleChoice::Index(0)).unwrap();
        f.text.push_text("No headings here.\n---meta---\nmeta");
        session.generate_article(ArticleInput::default()).await.unwrap();

        until_image_requests(&f.images, 1).await;
        f.images.push_image(image("NEW"));
        session.regenerate_eyecatch().unwrap();
        session.wait_for_images().await;
        tokio::time::sleep(Duration::from_millis(400)).await;

        let snapshot = session.snapshot();
        assert_eq!(snapshot.eyecatch_image.as_deref(), Some("data:image/jpeg;base64,NEW"));
        assert!(!snapshot.loading.eyecatch);
    }

    #[tokio::test]
    async fn test_back_discards_in_flight_images() {
        let f = fixture();
        f.images.push_after(Duration::from_millis(200), Some(image("LATE")));
        let session = f.pipeline.session(PlanType::Normal, None);
        session.generate_titles(keywords("tax")).await.unwrap();
        session.select_title(TitleChoice::Index(0)).unwrap();
        f.text.push_text("No headings here.\n---meta---\nmeta");
        session.generate_article(ArticleInput::default()).await.unwrap();

        until_image_requests(&f.images, 1).await;
        session.back().unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;

        let snapshot = session.snapshot();
        assert_eq!(snapshot.step, Step::Keywords);
        assert!(snapshot.eyecatch_image.is_none());
        assert_eq!(snapshot.loading, StageFlags::default());
        assert!(snapshot.content.is_empty());
    }

    #[tokio::test]
    async fn test_eyecatch_failure_stays_in_its_slot() {
        let f = fixture();
        f.images.push_empty();
        f.images.push_empty();
        let session = f.pipeline.session(PlanType::Normal, None);
        session.generate_titles(keywords("tax")).await.unwrap();
        session.select_title(TitleChoice::Index(0)).unwrap();
        f.text.push_text("No headings here.\n---meta---\nmeta");
        session.generate_article(ArticleInput::default()).await.unwrap();
        session.wait_for_images().await;

        let snapshot = session.snapshot();
        assert_eq!(snapshot.step, Step::Editor);
        assert!(snapshot.errors.eyecatch.is_some());
        assert!(snapshot.eyecatch_image.is_none());
        assert!(!snapshot.loading.heading_images);

        let article = session.save_draft().unwrap();
        assert!(article.eyecatch_image.is_none());
        assert_eq!(article.meta_description, "meta");
    }

    #[tokio::test]
    async fn test_edit_content_does_not_request_new_images() {
        let f = fixture();
        let session = f.pipeline.session(PlanType::Normal, None);
        to_editor(&session).await;
        session.wait_for_images().await;
        let requested = f.images.requests().len();

        session.edit_content("## First section\nrewritten\n\n## Brand new\n").unwrap();
        let snapshot = session.snapshot();
        assert_eq!(f.images.requests().len(), requested);
        assert_eq!(snapshot.heading_images.len(), 3);
        assert_eq!(snapshot.html_content.matches("<img").count(), 1);
    }

    #[tokio::test]
    async fn test_persistence_outcome_reported() {
        let f = fixture();
        let store = Arc::new(InMemoryStorage::new());
        let sink = Arc::new(TracingOutcomeSink::new());
        let pipeline = f.pipeline.clone().with_store(store.clone()).with_outcome_sink(sink.clone());
        let session = pipeline.session(PlanType::Normal, Some("alice".to_string()));
        to_editor(&session).await;

        let article = session.save_draft().unwrap();
        session.wait_for_persistence().await;
        assert_eq!(sink.counts().saved, 1);
        let stored = store.fetch_articles(Some("alice"), 10).await.unwrap();
        assert_eq!(stored[0].id, article.id);
    }

    #[derive(Debug)]
    struct BrokenStore;

    #[async_trait::async_trait]
    impl ArticleStore for BrokenStore {
        async fn fetch_articles(&self, _user_id: Option<&str>, _limit: usize) -> Result<Vec<Article>> {
            Err(Error::Persistence("offline".to_string()))
        }

        async fn save_article(&self, _article: &Article, _user_id: Option<&str>) -> Result<()> {
            Err(Error::Persistence("offline".to_string()))
        }
    }

    #[tokio::test]
    async fn test_persistence_failure_never_reaches_the_user() {
        let f = fixture();
        let sink = Arc::new(TracingOutcomeSink::new());
        let pipeline = f.pipeline.clone().with_store(Arc::new(BrokenStore)).with_outcome_sink(sink.clone());
        let session = pipeline.session(PlanType::Normal, None);
        to_editor(&session).await;

        assert!(session.save_draft().is_ok());
        session.wait_for_persistence().await;
        assert_eq!(sink.counts().failed, 1);
        assert_eq!(pipeline.history().len(), 1);
        assert_eq!(session.step(), Step::Keywords);
    }

    #[tokio::test]
    async fn test_post_without_publisher_is_rejected() {
        let f = fixture();
        let session = f.pipeline.session(PlanType::Normal, None);
        to_editor(&session).await;

        let err = session
            .post_to_wordpress(WordPressStatus::Publish, &WordPressCredentials::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InputValidation(_)));
        assert_eq!(session.step(), Step::Editor);
    }

    fn relay_publisher(server: &MockServer) -> Arc<dyn Publisher> {
        let config = PublishConfig { proxy_url: Some(format!("{}/wp-proxy", server.uri())), proxy_key: None };
        Arc::new(WordPressClient::new(&config).unwrap())
    }

    #[tokio::test]
    async fn test_publish_through_relay_marks_published() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "status": "publish", "excerpt": "A short overview of the topic." })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 1, "link": "https://x/y" })))
            .mount(&server)
            .await;

        let f = fixture();
        let pipeline = f.pipeline.clone().with_publisher(relay_publisher(&server));
        let session = pipeline.session(PlanType::Normal, None);
        to_editor(&session).await;

        let (article, post) = session
            .post_to_wordpress(WordPressStatus::Publish, &WordPressCredentials::default())
            .await
            .unwrap();
        assert_eq!(post, PublishedPost { id: 1, link: "https://x/y".to_string() });
        assert_eq!(article.status, ArticleStatus::Published);
        assert_eq!(pipeline.history().get(&article.id).unwrap().status, ArticleStatus::Published);
        assert_eq!(session.step(), Step::Keywords);
    }

    #[tokio::test]
    async fn test_publish_failure_keeps_editor_and_allows_retry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("WordPress error (401): nope"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 2, "link": "https://x/2" })))
            .mount(&server)
            .await;

        let f = fixture();
        let pipeline = f.pipeline.clone().with_publisher(relay_publisher(&server));
        let session = pipeline.session(PlanType::Normal, None);
        to_editor(&session).await;

        let err = session
            .post_to_wordpress(WordPressStatus::Draft, &WordPressCredentials::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Publish(_)));
        let snapshot = session.snapshot();
        assert_eq!(snapshot.step, Step::Editor);
        assert!(snapshot.errors.publish.unwrap().contains("nope"));
        assert!(!snapshot.loading.publish);
        assert!(pipeline.history().is_empty());

        let (article, post) = session
            .post_to_wordpress(WordPressStatus::Draft, &WordPressCredentials::default())
            .await
            .unwrap();
        assert_eq!(post.id, 2);
        assert_eq!(article.status, ArticleStatus::Draft);
        assert_eq!(pipeline.history().len(), 1);
    }

    #[tokio::test]
    async fn test_title_is_locked_while_the_article_is_written() {
        let text = Arc::new(HeldArticleModel::default());
        let pipeline = Pipeline::new(
            TextGenerationClient::new(text.clone()),
            ImageGenerationClient::new(Arc::new(DummyImageModel::new()), false),
        );
        let session = Arc::new(pipeline.session(PlanType::Normal, None));
        session.generate_titles(keywords("tax filing")).await.unwrap();
        session.select_title(TitleChoice::Index(0)).unwrap();

        let writing = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.generate_article(ArticleInput::default()).await })
        };
        until(|| session.snapshot().loading.article).await;
        assert!(matches!(session.select_title(TitleChoice::Index(5)), Err(Error::InvalidStep(_))));

        text.release.notify_one();
        writing.await.unwrap().unwrap();
        let article = session.save_draft().unwrap();
        assert_eq!(article.title, "Generated title 1");
    }

    #[tokio::test]
    async fn test_finalize_waits_for_in_flight_publish() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "id": 3, "link": "https://x/3" }))
                    .set_delay(Duration::from_millis(200)),
            )
            .mount(&server)
            .await;

        let f = fixture();
        let pipeline = f.pipeline.clone().with_publisher(relay_publisher(&server));
        let session = Arc::new(pipeline.session(PlanType::Normal, None));
        to_editor(&session).await;

        let posting = {
            let session = Arc::clone(&session);
            tokio::spawn(async move {
                session.post_to_wordpress(WordPressStatus::Draft, &WordPressCredentials::default()).await
            })
        };
        until(|| session.snapshot().loading.publish).await;

        assert!(matches!(session.save_draft(), Err(Error::InvalidStep(_))));
        assert!(matches!(session.edit_content("rewritten"), Err(Error::InvalidStep(_))));
        assert!(matches!(session.back(), Err(Error::InvalidStep(_))));
        assert_eq!(session.step(), Step::Editor);

        let (article, post) = posting.await.unwrap().unwrap();
        assert_eq!(post.id, 3);
        assert_eq!(pipeline.history().len(), 1);
        assert_eq!(pipeline.history().list()[0].id, article.id);
        assert_eq!(session.step(), Step::Keywords);
    }

    #[tokio::test]
    async fn test_dropping_a_session_aborts_image_tasks() {
        let f = fixture();
        f.images.push_after(Duration::from_secs(60), Some(image("late")));
        let session = f.pipeline.session(PlanType::Normal, None);
        to_editor(&session).await;
        until_image_requests(&f.images, 1).await;

        let state = Arc::clone(&session.state);
        drop(session);
        let st = lock(&state);
        assert!(st.eyecatch_task.is_none());
        assert!(st.heading_task.is_none());
    }
}
