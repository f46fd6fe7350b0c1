//! Axum routes for the blog service.
//!
//! Views are returned as JSON. Gated routes read the session token from the
//! `auth` cookie or an `Authorization: Bearer` header; a rejected or missing
//! token redirects to the login entry point.

use std::time::Instant;

use axum::{
    async_trait,
    extract::{rejection::FormRejection, FromRequestParts, Path, Query, State},
    http::{request::Parts, StatusCode},
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use serde::{Deserialize, Serialize};

use crate::access::AccessState;
use crate::error::{parse_item_id, parse_page_number, require_field, BlogError};
use crate::store::DocumentStore;
use crate::types::{AdminView, ContentItem, ItemForm, RankedPage};

use super::middleware::{metrics_middleware, record_access_check, record_listing_metrics, record_login};
use super::state::ServiceState;

/// Cookie carrying the session token.
pub const SESSION_COOKIE: &str = "auth";

/// Login entry point; denied requests are redirected here.
pub const LOGIN_PATH: &str = "/admin/auth";

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query string of a listing request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListQuery {
    /// Raw, whitespace separated tag query.
    #[serde(default)]
    pub tags: Option<String>,
}

/// Login form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginForm {
    /// Submitted login.
    pub login: Option<String>,
    /// Submitted password.
    pub password: Option<String>,
}

/// Create/edit form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemInput {
    /// Item title.
    pub title: Option<String>,
    /// Item body.
    pub body: Option<String>,
    /// Raw tag string.
    pub tags: Option<String>,
}

/// State of the login entry point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginPrompt {
    /// Configured blog title.
    pub blog_title: String,
    /// Whether the caller already holds a valid session.
    pub authenticated: bool,
}

/// Simple liveness response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivenessResponse {
    /// Always `alive`.
    pub status: String,
}

/// Readiness response with dependency status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    /// Whether the service can take traffic.
    pub ready: bool,
    /// Whether the document store answered.
    pub store: bool,
    /// Failure detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Structured error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
    /// Machine-readable error code.
    pub code: String,
}

impl ErrorResponse {
    /// Create a new error response with code and message.
    pub fn new(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
        }
    }
}

impl IntoResponse for BlogError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            BlogError::Unauthorized => {
                return Redirect::to(LOGIN_PATH).into_response();
            }
            BlogError::NotFound(_) => (
                StatusCode::NOT_FOUND,
                ErrorResponse::new("NOT_FOUND", self.to_string()),
            ),
            BlogError::Validation(_) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("INVALID_INPUT", self.to_string()),
            ),
            BlogError::Infrastructure(detail) => {
                tracing::error!(error = %detail, "Store failure while serving request");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorResponse::new("STORE_UNAVAILABLE", "Document store unavailable"),
                )
            }
        };

        tracing::warn!(code = %body.code, error = %body.error, "Request error");
        (status, Json(body)).into_response()
    }
}

// ============================================================================
// Session Extraction
// ============================================================================

/// Client-presented session tokens.
///
/// The cookie is tried first; a bearer token still counts when the cookie is
/// stale or forged.
#[derive(Debug, Clone, Default)]
pub struct Session {
    cookie: Option<String>,
    bearer: Option<String>,
}

impl Session {
    /// Presented tokens in evaluation order.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.cookie.as_deref().into_iter().chain(self.bearer.as_deref())
    }
}

#[async_trait]
impl<T: Send + Sync> FromRequestParts<T> for Session {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &T) -> Result<Self, Self::Rejection> {
        let cookie = CookieJar::from_headers(&parts.headers)
            .get(SESSION_COOKIE)
            .map(|cookie| cookie.value().to_string());

        let bearer = TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
            .await
            .ok()
            .map(|TypedHeader(auth)| auth.token().to_string());

        Ok(Self { cookie, bearer })
    }
}

fn evaluate<S: DocumentStore>(state: &ServiceState<S>, session: &Session) -> AccessState {
    let access = session
        .tokens()
        .map(|token| state.blog.access(Some(token)))
        .find(AccessState::is_authenticated)
        .unwrap_or(AccessState::Anonymous);
    record_access_check(access.is_authenticated());
    access
}

/// Body rejections only surface once the gate has passed.
fn form_input(input: Result<Form<ItemInput>, FormRejection>) -> Result<ItemInput, BlogError> {
    input
        .map(|Form(input)| input)
        .map_err(|rejection| BlogError::Validation(rejection.body_text()))
}

// ============================================================================
// Route Handlers
// ============================================================================

async fn index_handler() -> Redirect {
    Redirect::to("/page/1")
}

/// List one ranked page.
async fn list_handler<S: DocumentStore>(
    State(state): State<ServiceState<S>>,
    Path(page): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<RankedPage>, BlogError> {
    let page = parse_page_number(&page)?;
    let tags = query.tags.unwrap_or_default();

    let start = Instant::now();
    let ranked = state.blog.list_items(&tags, page).await?;
    tracing::debug!(latency_ms = start.elapsed().as_millis() as u64, "Listing served");

    record_listing_metrics(page, ranked.items.len(), ranked.matching_count, !ranked.tags.is_empty());
    Ok(Json(ranked))
}

/// Show one item.
async fn item_handler<S: DocumentStore>(
    State(state): State<ServiceState<S>>,
    Path(id): Path<String>,
) -> Result<Json<ContentItem>, BlogError> {
    let id = parse_item_id(&id)?;
    Ok(Json(state.blog.get_item(id).await?))
}

/// Login entry point.
async fn login_prompt_handler<S: DocumentStore>(
    State(state): State<ServiceState<S>>,
    session: Session,
) -> Json<LoginPrompt> {
    Json(LoginPrompt {
        blog_title: state.blog.blog_title().to_string(),
        authenticated: session
            .tokens()
            .any(|token| state.blog.access(Some(token)).is_authenticated()),
    })
}

/// Check credentials, set the session cookie and go to the admin view.
async fn login_handler<S: DocumentStore>(
    State(state): State<ServiceState<S>>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<(CookieJar, Redirect), BlogError> {
    let login = require_field("login", form.login)?;
    let password = require_field("password", form.password)?;

    let result = state.blog.authenticate(&login, &password);
    record_login(result.is_ok());
    let token = result?;

    let cookie = Cookie::build((SESSION_COOKIE, token.as_str().to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);

    Ok((jar.add(cookie), Redirect::to("/admin")))
}

/// Admin landing view.
async fn admin_handler<S: DocumentStore>(
    State(state): State<ServiceState<S>>,
    session: Session,
) -> Result<Json<AdminView>, BlogError> {
    let access = evaluate(&state, &session);
    Ok(Json(state.blog.admin_view(access).await?))
}

/// Create an item and redirect to it.
async fn create_handler<S: DocumentStore>(
    State(state): State<ServiceState<S>>,
    session: Session,
    input: Result<Form<ItemInput>, FormRejection>,
) -> Result<Redirect, BlogError> {
    let access = evaluate(&state, &session);
    access.require()?;

    let input = form_input(input)?;
    let title = require_field("title", input.title)?;
    let body = require_field("body", input.body)?;
    let tags = input.tags.unwrap_or_default();

    let id = state.blog.create_item(access, &title, &body, &tags).await?;
    Ok(Redirect::to(&format!("/post/{id}")))
}

/// Edit-form prefill.
async fn change_form_handler<S: DocumentStore>(
    State(state): State<ServiceState<S>>,
    session: Session,
    Path(id): Path<String>,
) -> Result<Json<ItemForm>, BlogError> {
    let access = evaluate(&state, &session);
    access.require()?;
    let id = parse_item_id(&id)?;
    Ok(Json(state.blog.item_form(id, access).await?))
}

/// Overwrite an item and redirect to it.
async fn change_handler<S: DocumentStore>(
    State(state): State<ServiceState<S>>,
    session: Session,
    Path(id): Path<String>,
    input: Result<Form<ItemInput>, FormRejection>,
) -> Result<Redirect, BlogError> {
    let access = evaluate(&state, &session);
    access.require()?;

    let id = parse_item_id(&id)?;
    let input = form_input(input)?;
    let title = require_field("title", input.title)?;
    let body = require_field("body", input.body)?;
    let tags = input.tags.unwrap_or_default();

    state.blog.update_item(id, access, &title, &body, &tags).await?;
    Ok(Redirect::to(&format!("/post/{id}")))
}

/// Delete an item and go back to the admin view.
async fn remove_handler<S: DocumentStore>(
    State(state): State<ServiceState<S>>,
    session: Session,
    Path(id): Path<String>,
) -> Result<Redirect, BlogError> {
    let access = evaluate(&state, &session);
    access.require()?;

    let id = parse_item_id(&id)?;
    state.blog.delete_item(id, access).await?;
    Ok(Redirect::to("/admin"))
}

/// Liveness probe endpoint.
///
/// Does NOT check dependencies.
async fn liveness_handler() -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: "alive".to_string(),
    })
}

/// Readiness probe endpoint.
///
/// Returns 200 if the store answers, 503 otherwise.
async fn readiness_handler<S: DocumentStore>(
    State(state): State<ServiceState<S>>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    if state.blog.is_healthy().await {
        Ok(Json(ReadinessResponse {
            ready: true,
            store: true,
            details: None,
        }))
    } else {
        Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                ready: false,
                store: false,
                details: Some("Document store unreachable".to_string()),
            }),
        ))
    }
}

// ============================================================================
// Router Construction
// ============================================================================

/// Create the Axum router for the blog service.
pub fn create_router<S: DocumentStore>(state: ServiceState<S>) -> Router {
    Router::new()
        // Public reads
        .route("/", get(index_handler))
        .route("/page/:page", get(list_handler::<S>))
        .route("/post/:id", get(item_handler::<S>))
        // Session
        .route(LOGIN_PATH, get(login_prompt_handler::<S>).post(login_handler::<S>))
        // Gated
        .route("/admin", get(admin_handler::<S>))
        .route("/admin/create", post(create_handler::<S>))
        .route(
            "/admin/change/:id",
            get(change_form_handler::<S>).post(change_handler::<S>),
        )
        .route("/admin/remove/:id", post(remove_handler::<S>))
        // Health checks
        .route("/health/live", get(liveness_handler))
        .route("/health/ready", get(readiness_handler::<S>))
        .layer(middleware::from_fn(metrics_middleware))
        .with_state(state)
}
