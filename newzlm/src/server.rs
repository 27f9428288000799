use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rocket::figment::Figment;
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome, Request};
use rocket::serde::json::Json;
use rocket::{delete, get, post, put, routes, Build, Rocket, State};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use common::ServerConfig;

use crate::auth::{AuthError, Authenticator};
use crate::editorial::{
    AlreadyPublished, ArticleRecord, Dashboard, Draft, EditorialDesk, EditorialSettings, PublishedArticle, Submission,
};
use crate::generator::{
    compose_from_source, enhancement_request, generation_request, ArticleGenerator, ComposedDraft,
    GeneratedArticle, GenerationError,
};
use crate::news::{self, HackerNewsClient, HackerNewsItem, NewsArticle, NewsSource, WordWeight};

/// Application state stored inside Rocket managed state.
#[derive(Clone)]
pub struct AppState {
    pub started_at: DateTime<Utc>,
    pub desk: Arc<EditorialDesk>,
    /// `None` when no news API key is configured
    pub news: Option<Arc<dyn NewsSource>>,
    pub hacker_news: Arc<HackerNewsClient>,
    /// `None` when generation is switched off
    pub generator: Option<Arc<dyn ArticleGenerator>>,
    pub auth: Arc<Authenticator>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

type ApiError = (Status, Json<ErrorBody>);
type ApiResult<T> = Result<Json<T>, ApiError>;

fn api_error(status: Status, message: impl Into<String>) -> ApiError {
    (status, Json(ErrorBody { error: message.into() }))
}

fn not_found(what: &str, id: &str) -> ApiError {
    api_error(Status::NotFound, format!("{} {} not found", what, id))
}

fn internal(e: anyhow::Error) -> ApiError {
    error!("server: store failure: {:#}", e);
    api_error(Status::InternalServerError, "storage failure")
}

/// Request guard: a valid editor bearer token.
pub struct Editor {
    pub email: String,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Editor {
    type Error = AuthError;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let Some(state) = req.rocket().state::<AppState>() else {
            return Outcome::Error((Status::InternalServerError, AuthError::MissingToken));
        };
        match state.auth.verify_header(req.headers().get_one("Authorization")) {
            Ok(claims) => Outcome::Success(Editor { email: claims.sub }),
            Err(e) => Outcome::Error((Status::Unauthorized, e)),
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_seconds: i64,
}

#[get("/health")]
async fn health(state: &State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_seconds: (Utc::now() - state.started_at).num_seconds(),
    })
}

// ============================================================================
// Authentication
// ============================================================================

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Serialize)]
struct LoginResponse {
    token: String,
    email: String,
}

#[post("/api/v1/login", data = "<body>")]
async fn login(state: &State<AppState>, body: Json<LoginRequest>) -> ApiResult<LoginResponse> {
    match state.auth.login(&body.email, &body.password) {
        Ok(token) => Ok(Json(LoginResponse {
            token,
            email: body.email.trim().to_string(),
        })),
        Err(AuthError::InvalidCredentials) => Err(api_error(Status::Unauthorized, "Invalid credentials")),
        Err(e) => {
            error!("server: login failed: {}", e);
            Err(api_error(Status::InternalServerError, "login failed"))
        }
    }
}

#[get("/api/v1/dashboard")]
async fn dashboard(_editor: Editor, state: &State<AppState>) -> Json<Dashboard> {
    Json(state.desk.dashboard().await)
}

// ============================================================================
// Drafts
// ============================================================================

/// Editor contents; `id` is absent for an article that was never saved
#[derive(Deserialize)]
struct ArticleBody {
    id: Option<String>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
}

#[get("/api/v1/drafts")]
async fn list_drafts(_editor: Editor, state: &State<AppState>) -> Json<Vec<Draft>> {
    Json(state.desk.list_drafts().await)
}

#[post("/api/v1/drafts", data = "<body>")]
async fn save_draft(_editor: Editor, state: &State<AppState>, body: Json<ArticleBody>) -> ApiResult<Draft> {
    state
        .desk
        .save_draft(body.id.as_deref(), &body.title, &body.content)
        .await
        .map(Json)
        .map_err(internal)
}

#[get("/api/v1/drafts/<id>")]
async fn get_draft(_editor: Editor, state: &State<AppState>, id: &str) -> ApiResult<Draft> {
    state
        .desk
        .get_draft(id)
        .await
        .map(Json)
        .ok_or_else(|| not_found("draft", id))
}

#[delete("/api/v1/drafts/<id>")]
async fn delete_draft(_editor: Editor, state: &State<AppState>, id: &str) -> Result<Status, ApiError> {
    match state.desk.delete_draft(id).await.map_err(internal)? {
        true => Ok(Status::NoContent),
        false => Err(not_found("draft", id)),
    }
}

#[post("/api/v1/drafts/<id>/submit")]
async fn submit_draft(_editor: Editor, state: &State<AppState>, id: &str) -> ApiResult<Submission> {
    state
        .desk
        .submit(id)
        .await
        .map_err(internal)?
        .map(Json)
        .ok_or_else(|| not_found("draft", id))
}

// ============================================================================
// Moderation
// ============================================================================

#[get("/api/v1/submissions")]
async fn list_submissions(_editor: Editor, state: &State<AppState>) -> Json<Vec<Submission>> {
    Json(state.desk.list_submitted().await)
}

/// "Submit for Review" straight from the editor
#[post("/api/v1/submissions", data = "<body>")]
async fn save_and_submit(
    _editor: Editor,
    state: &State<AppState>,
    body: Json<ArticleBody>,
) -> ApiResult<Submission> {
    state
        .desk
        .save_and_submit(body.id.as_deref(), &body.title, &body.content)
        .await
        .map(Json)
        .map_err(internal)
}

#[get("/api/v1/submissions/<id>")]
async fn get_submission(_editor: Editor, state: &State<AppState>, id: &str) -> ApiResult<Submission> {
    state
        .desk
        .get_submitted(id)
        .await
        .map(Json)
        .ok_or_else(|| not_found("submission", id))
}

/// Any article by id, tagged with the collection that holds it
#[get("/api/v1/articles/<id>")]
async fn get_article(_editor: Editor, state: &State<AppState>, id: &str) -> ApiResult<ArticleRecord> {
    state
        .desk
        .locate(id)
        .await
        .map(Json)
        .ok_or_else(|| not_found("article", id))
}

#[post("/api/v1/submissions/<id>/approve")]
async fn approve(editor: Editor, state: &State<AppState>, id: &str) -> ApiResult<PublishedArticle> {
    let published = state.desk.approve(id).await.map_err(|e| match e.downcast_ref::<AlreadyPublished>() {
        Some(conflict) => api_error(Status::Conflict, conflict.to_string()),
        None => internal(e),
    })?;
    match published {
        Some(article) => {
            info!(id = %id, editor = %editor.email, "server: article approved");
            Ok(Json(article))
        }
        None => Err(not_found("submission", id)),
    }
}

#[post("/api/v1/submissions/<id>/reject")]
async fn reject(editor: Editor, state: &State<AppState>, id: &str) -> ApiResult<Draft> {
    let draft = state.desk.reject(id).await.map_err(internal)?;
    match draft {
        Some(draft) => {
            info!(id = %id, editor = %editor.email, "server: article sent back to drafts");
            Ok(Json(draft))
        }
        None => Err(not_found("submission", id)),
    }
}

#[get("/api/v1/published")]
async fn list_published(_editor: Editor, state: &State<AppState>) -> Json<Vec<PublishedArticle>> {
    Json(state.desk.list_published().await)
}

// ============================================================================
// Settings
// ============================================================================

#[get("/api/v1/settings")]
async fn get_settings(_editor: Editor, state: &State<AppState>) -> Json<EditorialSettings> {
    Json(state.desk.settings().await)
}

#[put("/api/v1/settings", data = "<body>")]
async fn put_settings(
    _editor: Editor,
    state: &State<AppState>,
    body: Json<EditorialSettings>,
) -> ApiResult<EditorialSettings> {
    let settings = body.into_inner();
    state.desk.save_settings(&settings).await.map_err(internal)?;
    Ok(Json(settings))
}

// ============================================================================
// News
// ============================================================================

#[get("/api/v1/news?<category>")]
async fn top_news(_editor: Editor, state: &State<AppState>, category: Option<&str>) -> Json<Vec<NewsArticle>> {
    Json(news::fetch_top_news(state.news.as_deref(), category).await)
}

#[get("/api/v1/news/search?<q>")]
async fn search_news(_editor: Editor, state: &State<AppState>, q: &str) -> ApiResult<Vec<NewsArticle>> {
    if q.trim().is_empty() {
        return Err(api_error(Status::BadRequest, "query must not be empty"));
    }
    Ok(Json(news::search_news(state.news.as_deref(), q).await))
}

#[get("/api/v1/news/hacker")]
async fn hacker_news(_editor: Editor, state: &State<AppState>) -> Json<Vec<HackerNewsItem>> {
    Json(news::fetch_hacker_news(&state.hacker_news).await)
}

#[get("/api/v1/news/word-cloud")]
async fn word_cloud(_editor: Editor, state: &State<AppState>) -> Json<Vec<WordWeight>> {
    let (articles, stories) = tokio::join!(
        news::fetch_top_news(state.news.as_deref(), None),
        news::fetch_hacker_news(&state.hacker_news),
    );
    Json(news::word_cloud(&articles, &stories))
}

// ============================================================================
// Generation
// ============================================================================

#[post("/api/v1/compose", data = "<body>")]
async fn compose(_editor: Editor, body: Json<NewsArticle>) -> Json<ComposedDraft> {
    Json(compose_from_source(&body))
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum GenerateMode {
    #[default]
    Generate,
    Enhance,
}

#[derive(Deserialize)]
struct GenerateBody {
    #[serde(default)]
    mode: GenerateMode,
    source: Option<NewsArticle>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
}

#[post("/api/v1/generate", data = "<body>")]
async fn generate(_editor: Editor, state: &State<AppState>, body: Json<GenerateBody>) -> ApiResult<GeneratedArticle> {
    let body = body.into_inner();
    let settings = state.desk.settings().await;

    let request = match body.mode {
        GenerateMode::Generate => generation_request(body.source, &body.title, &body.content, &settings),
        GenerateMode::Enhance => enhancement_request(&body.title, &body.content, &settings),
    }
    .map_err(|e| api_error(Status::BadRequest, e.to_string()))?;

    let Some(generator) = state.generator.as_ref() else {
        warn!("server: generation requested but no generator is configured");
        return Err(api_error(Status::BadGateway, GenerationError::USER_MESSAGE));
    };

    // No lock is held here; the editor saves the result explicitly afterwards
    generator.generate(&request).await.map(Json).map_err(|e| {
        warn!(error = %e, "server: generation failed");
        api_error(Status::BadGateway, GenerationError::USER_MESSAGE)
    })
}

/// Rocket instance with state and routes mounted, not yet launched.
pub fn build_rocket(state: AppState, figment: Figment) -> Rocket<Build> {
    rocket::custom(figment).manage(state).mount(
        "/",
        routes![
            health,
            login,
            dashboard,
            list_drafts,
            save_draft,
            get_draft,
            delete_draft,
            submit_draft,
            list_submissions,
            save_and_submit,
            get_submission,
            get_article,
            approve,
            reject,
            list_published,
            get_settings,
            put_settings,
            top_news,
            search_news,
            hacker_news,
            word_cloud,
            compose,
            generate,
        ],
    )
}

/// Build and launch the HTTP server, applying `[server] bind/port` when set.
/// Blocks until Rocket shuts down.
pub async fn launch_rocket(state: AppState, server: Option<&ServerConfig>) -> Result<()> {
    let mut fig = rocket::Config::figment();
    if let Some(server) = server {
        if let Some(bind) = &server.bind {
            fig = fig.merge(("address", bind.clone()));
        }
        if let Some(port) = server.port {
            fig = fig.merge(("port", port));
        }
    }

    info!("Starting Rocket HTTP server");
    build_rocket(state, fig)
        .launch()
        .await
        .map_err(|e| anyhow!("Rocket failed: {}", e))?;

    info!("Rocket HTTP server has shut down");
    Ok(())
}
