use std::sync::Arc;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use ag_core::{plans, Article, Error, Plan, PlanType, WordPressCredentials, DEFAULT_HISTORY_LIMIT};
use ag_pipeline::{extract_pdf_text, ArticleInput, SessionSnapshot, TitleChoice, TitleInput};
use ag_publish::{PublishedPost, WordPressStatus};
use crate::error::ApiResult;
use crate::AppState;

pub async fn list_plans() -> Json<&'static [Plan]> {
    Json(plans())
}

#[derive(Debug, Deserialize)]
pub struct CreateSession {
    pub plan: String,
    #[serde(default)]
    pub user_id: Option<String>,
}

pub async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateSession>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let plan: PlanType = request.plan.parse()?;
    let user_id = request.user_id.filter(|id| !id.trim().is_empty());
    let id = state.open_session(plan, user_id).await;
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

pub async fn get_session(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult<Json<SessionSnapshot>> {
    Ok(Json(state.session(&id).await?.snapshot()))
}

pub async fn delete_session(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    state.close_session(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Raw PDF body in, text for `ArticleInput::reference_text` out.
pub async fn extract_reference(body: Bytes) -> ApiResult<Json<Value>> {
    let text = tokio::task::spawn_blocking(move || extract_pdf_text(&body))
        .await
        .map_err(|e| Error::External(e.into()))??;
    Ok(Json(json!({ "reference_text": text })))
}

pub async fn generate_titles(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(input): Json<TitleInput>,
) -> ApiResult<Json<SessionSnapshot>> {
    let session = state.session(&id).await?;
    session.generate_titles(input).await?;
    Ok(Json(session.snapshot()))
}

pub async fn regenerate_titles(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<SessionSnapshot>> {
    let session = state.session(&id).await?;
    session.regenerate_titles().await?;
    Ok(Json(session.snapshot()))
}

#[derive(Debug, Deserialize)]
pub struct SelectTitle {
    pub title: TitleChoice,
}

pub async fn select_title(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<SelectTitle>,
) -> ApiResult<Json<SessionSnapshot>> {
    let session = state.session(&id).await?;
    session.select_title(request.title)?;
    Ok(Json(session.snapshot()))
}

pub async fn generate_article(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(mut input): Json<ArticleInput>,
) -> ApiResult<Json<SessionSnapshot>> {
    let session = state.session(&id).await?;
    input.config = input.config.clamped();
    session.generate_article(input).await?;
    Ok(Json(session.snapshot()))
}

pub async fn regenerate_eyecatch(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<SessionSnapshot>> {
    let session = state.session(&id).await?;
    session.regenerate_eyecatch()?;
    Ok(Json(session.snapshot()))
}

#[derive(Debug, Deserialize)]
pub struct EditContent {
    pub markdown: String,
}

pub async fn edit_content(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<EditContent>,
) -> ApiResult<Json<SessionSnapshot>> {
    let session = state.session(&id).await?;
    session.edit_content(request.markdown)?;
    Ok(Json(session.snapshot()))
}

pub async fn back(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult<Json<SessionSnapshot>> {
    let session = state.session(&id).await?;
    session.back()?;
    Ok(Json(session.snapshot()))
}

pub async fn save_draft(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult<Json<Article>> {
    let session = state.session(&id).await?;
    Ok(Json(session.save_draft()?))
}

#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    #[serde(default)]
    pub status: WordPressStatus,
    #[serde(default)]
    pub credentials: Option<WordPressCredentials>,
}

#[derive(Debug, Serialize)]
pub struct PublishResponse {
    pub article: Article,
    pub post: PublishedPost,
}

pub async fn publish(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<PublishRequest>,
) -> ApiResult<Json<PublishResponse>> {
    let session = state.session(&id).await?;
    let credentials = match request.credentials {
        Some(credentials) => credentials,
        None => stored_credentials(&state, session.user_id()).await,
    };
    let (article, post) = session.post_to_wordpress(request.status, &credentials).await?;
    Ok(Json(PublishResponse { article, post }))
}

/// Saved credentials for the user, or blank ones for the relay to fill in.
async fn stored_credentials(state: &AppState, user_id: Option<&str>) -> WordPressCredentials {
    let (Some(store), Some(user_id)) = (state.credentials.as_ref(), user_id) else {
        return WordPressCredentials::default();
    };
    match store.fetch_credentials(user_id).await {
        Ok(credentials) => credentials.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(user_id = %user_id, error = %e, "could not load WordPress credentials");
            WordPressCredentials::default()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub user_id: Option<String>,
    pub limit: Option<usize>,
}

pub async fn list_articles(State(state): State<Arc<AppState>>, Query(query): Query<HistoryQuery>) -> Json<Vec<Article>> {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    let user_id = query.user_id.as_deref().filter(|id| !id.is_empty());
    if let Some(store) = state.pipeline.store() {
        match store.fetch_articles(user_id, limit).await {
            Ok(articles) => return Json(articles),
            Err(e) => tracing::warn!(error = %e, "history read failed, serving in-memory history"),
        }
    }
    Json(state.pipeline.history().list_for(user_id, limit))
}

pub async fn get_credentials(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Option<WordPressCredentials>>> {
    let store = credential_store(&state)?;
    Ok(Json(store.fetch_credentials(&user_id).await?))
}

pub async fn put_credentials(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Json(credentials): Json<WordPressCredentials>,
) -> ApiResult<StatusCode> {
    let store = credential_store(&state)?;
    store.save_credentials(&user_id, &credentials).await?;
    tracing::info!(user_id = %user_id, "WordPress credentials saved");
    Ok(StatusCode::NO_CONTENT)
}

fn credential_store(state: &AppState) -> ApiResult<Arc<dyn ag_core::CredentialStore>> {
    state
        .credentials
        .clone()
        .ok_or_else(|| ag_core::Error::NotFound("credential storage is not configured".to_string()).into())
}
