//! HTTP API: auth, profile and dashboard routes, plus the onboarding routes.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::auth::{self, AuthOutcome, NextRoute};
use crate::backend::{AuthBackend, ProfileStore};
use crate::dashboard::{DashboardState, load_dashboard};
use crate::error::{AuthError, BackendError, ConfigError, OnboardingError};
use crate::onboarding::model::LifeStage;
use crate::onboarding::routes::{OnboardingRouteState, onboarding_routes};
use crate::onboarding::sessions::OnboardingSessions;
use crate::onboarding::submitter::ProfileSubmitter;
use crate::onboarding::validation::ValidationError;
use crate::profile::{ProfileUpdate, stage_update};

/// Shared state for the API routes.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<dyn AuthBackend>,
    pub store: Arc<dyn ProfileStore>,
    pub sessions: Arc<OnboardingSessions>,
    pub submitter: Arc<ProfileSubmitter>,
}

impl AppState {
    pub fn new(
        auth: Arc<dyn AuthBackend>,
        store: Arc<dyn ProfileStore>,
        sessions: Arc<OnboardingSessions>,
    ) -> Self {
        let submitter = Arc::new(ProfileSubmitter::new(auth.clone(), store.clone()));
        Self {
            auth,
            store,
            sessions,
            submitter,
        }
    }

    /// State for a backend that provides both auth and profile storage.
    pub fn with_backend<B>(backend: Arc<B>, sessions: Arc<OnboardingSessions>) -> Self
    where
        B: AuthBackend + ProfileStore + 'static,
    {
        Self::new(backend.clone(), backend, sessions)
    }

    fn onboarding(&self) -> OnboardingRouteState {
        OnboardingRouteState {
            sessions: self.sessions.clone(),
            submitter: self.submitter.clone(),
        }
    }
}

// ── Response helpers ────────────────────────────────────────────────────

pub(crate) fn error_json(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({"error": message.into()}))).into_response()
}

fn redirect_json(status: StatusCode, message: &str, next: NextRoute) -> Response {
    (
        status,
        Json(serde_json::json!({"error": message, "redirect": next.path()})),
    )
        .into_response()
}

/// Per-field issues with their display messages.
pub(crate) fn issues_json(err: &ValidationError) -> serde_json::Value {
    err.issues
        .iter()
        .map(|issue| {
            serde_json::json!({
                "field": issue.field,
                "problem": issue.problem,
                "message": issue.message(),
            })
        })
        .collect()
}

fn validation_response(err: &ValidationError) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(serde_json::json!({
            "error": err.to_string(),
            "step": err.step,
            "issues": issues_json(err),
        })),
    )
        .into_response()
}

fn backend_error_response(err: &BackendError) -> Response {
    let status = match err {
        BackendError::Unauthorized => StatusCode::UNAUTHORIZED,
        BackendError::Conflict(_) => StatusCode::CONFLICT,
        BackendError::NotFound { .. } => StatusCode::NOT_FOUND,
        BackendError::Request(_) | BackendError::Status { .. } | BackendError::Decode(_) => {
            StatusCode::BAD_GATEWAY
        }
    };
    error_json(status, err.to_string())
}

fn auth_error_response(err: &AuthError) -> Response {
    match err {
        AuthError::InvalidEmail | AuthError::EmptyPassword => {
            error_json(StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
        }
        AuthError::Backend(e) => backend_error_response(e),
    }
}

pub(crate) fn onboarding_error_response(err: &OnboardingError) -> Response {
    match err {
        OnboardingError::Validation(e) => validation_response(e),
        OnboardingError::AuthenticationMissing => {
            redirect_json(StatusCode::UNAUTHORIZED, &err.to_string(), NextRoute::SignUp)
        }
        OnboardingError::Submission { message, .. } => {
            let status = if err.is_conflict() {
                StatusCode::CONFLICT
            } else {
                StatusCode::BAD_GATEWAY
            };
            error_json(status, message.clone())
        }
        OnboardingError::NotOnFinalStep { .. } => {
            error_json(StatusCode::BAD_REQUEST, err.to_string())
        }
    }
}

/// Extract the access token from `Authorization: Bearer <token>`.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<SecretString> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(SecretString::from(token.to_string()))
}

// ── Handlers ────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "maylove"
    }))
}

#[derive(Deserialize)]
struct Credentials {
    email: String,
    password: SecretString,
}

fn auth_body(outcome: &AuthOutcome) -> serde_json::Value {
    let mut body = serde_json::json!({
        "user_id": outcome.user_id,
        "next": outcome.next.path(),
    });
    if let Some(session) = &outcome.session {
        body["access_token"] = session.identity.access_token.expose_secret().into();
        body["expires_in"] = session.expires_in.into();
    }
    if outcome.next == NextRoute::ConfirmEmail {
        body["confirm_email"] = true.into();
    }
    body
}

/// POST /api/auth/signup
async fn signup(State(state): State<AppState>, Json(creds): Json<Credentials>) -> Response {
    match auth::sign_up(
        state.auth.as_ref(),
        &creds.email,
        creds.password.expose_secret(),
    )
    .await
    {
        Ok(outcome) => {
            let status = if outcome.session.is_some() {
                StatusCode::CREATED
            } else {
                StatusCode::ACCEPTED
            };
            (status, Json(auth_body(&outcome))).into_response()
        }
        Err(e) => {
            warn!(error = %e, "Sign-up rejected");
            auth_error_response(&e)
        }
    }
}

/// POST /api/auth/login
async fn login(State(state): State<AppState>, Json(creds): Json<Credentials>) -> Response {
    match auth::sign_in(
        state.auth.as_ref(),
        &creds.email,
        creds.password.expose_secret(),
    )
    .await
    {
        Ok(outcome) => Json(auth_body(&outcome)).into_response(),
        Err(e) => auth_error_response(&e),
    }
}

/// POST /api/auth/logout
async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(token) = bearer_token(&headers) else {
        return error_json(StatusCode::UNAUTHORIZED, "Missing bearer token");
    };
    match auth::sign_out(state.auth.as_ref(), &token).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => auth_error_response(&e),
    }
}

/// GET /api/profile
async fn get_profile(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let token = bearer_token(&headers);
    let identity = match auth::resolve_identity(state.auth.as_ref(), token.as_ref()).await {
        Ok(Some(identity)) => identity,
        Ok(None) => {
            return redirect_json(StatusCode::UNAUTHORIZED, "Not logged in", NextRoute::SignUp);
        }
        Err(e) => return backend_error_response(&e),
    };
    match state.store.get_profile(&identity).await {
        Ok(Some(profile)) => Json(profile).into_response(),
        Ok(None) => redirect_json(
            StatusCode::NOT_FOUND,
            "No profile exists yet",
            NextRoute::Onboarding,
        ),
        Err(e) => backend_error_response(&e),
    }
}

/// Body of PATCH /api/profile. Stage columns travel together.
#[derive(Debug, Deserialize)]
struct UpdateProfileRequest {
    #[serde(flatten)]
    update: ProfileUpdate,
    #[serde(default)]
    momento: Option<LifeStage>,
    #[serde(default)]
    semanas_gestacao: Option<i32>,
    #[serde(default)]
    idade_bebe_meses: Option<i32>,
}

impl UpdateProfileRequest {
    fn touches_stage(&self) -> bool {
        self.momento.is_some() || self.semanas_gestacao.is_some() || self.idade_bebe_meses.is_some()
    }
}

/// PATCH /api/profile
async fn update_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<UpdateProfileRequest>,
) -> Response {
    let token = bearer_token(&headers);
    let identity = match auth::resolve_identity(state.auth.as_ref(), token.as_ref()).await {
        Ok(Some(identity)) => identity,
        Ok(None) => {
            return redirect_json(StatusCode::UNAUTHORIZED, "Not logged in", NextRoute::SignUp);
        }
        Err(e) => return backend_error_response(&e),
    };

    let mut update = request.update.clone();
    if request.touches_stage() {
        let stored = match state.store.get_profile(&identity).await {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                return redirect_json(
                    StatusCode::NOT_FOUND,
                    "No profile exists yet",
                    NextRoute::Onboarding,
                );
            }
            Err(e) => return backend_error_response(&e),
        };
        // Follow-up answers without `momento` apply to the stored stage.
        let stage = request.momento.unwrap_or(stored.life_stage);
        match stage_update(
            stage,
            request.semanas_gestacao,
            request.idade_bebe_meses,
            Some(&stored),
        ) {
            Ok(details) => update.stage = Some(details),
            Err(e) => return validation_response(&e),
        }
    }

    if update.is_empty() {
        return error_json(StatusCode::BAD_REQUEST, "Nothing to update");
    }
    if let Err(e) = update.validate() {
        return validation_response(&e);
    }

    match state.store.update_profile(&identity, &update).await {
        Ok(profile) => {
            info!(user_id = %profile.id, "Profile updated");
            Json(profile).into_response()
        }
        Err(e) => backend_error_response(&e),
    }
}

/// GET /api/dashboard
async fn dashboard(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let token = bearer_token(&headers);
    match load_dashboard(state.auth.as_ref(), state.store.as_ref(), token.as_ref()).await {
        Ok(DashboardState::Ready(dashboard)) => Json(*dashboard).into_response(),
        Ok(other @ DashboardState::NeedsSignUp) => redirect_json(
            StatusCode::UNAUTHORIZED,
            "Not logged in",
            other.redirect().unwrap_or(NextRoute::SignUp),
        ),
        Ok(other @ DashboardState::NeedsOnboarding) => redirect_json(
            StatusCode::NOT_FOUND,
            "No profile exists yet",
            other.redirect().unwrap_or(NextRoute::Onboarding),
        ),
        Err(e) => backend_error_response(&e),
    }
}

// ── Router ──────────────────────────────────────────────────────────────

/// All routes, without middleware.
pub fn app_routes(state: AppState) -> Router {
    let onboarding = onboarding_routes(state.onboarding());
    Router::new()
        .route("/health", get(health))
        .route("/api/auth/signup", post(signup))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/profile", get(get_profile).patch(update_profile))
        .route("/api/dashboard", get(dashboard))
        .with_state(state)
        .merge(onboarding)
}

/// Routes wrapped in request tracing and CORS.
pub fn build_app(state: AppState, cors_origin: Option<&str>) -> Result<Router, ConfigError> {
    let cors = match cors_origin {
        Some(origin) => {
            let origin: HeaderValue = origin.parse().map_err(|_| ConfigError::InvalidValue {
                key: "MAYLOVE_CORS_ORIGIN".into(),
                message: format!("not a valid origin: {origin:?}"),
            })?;
            CorsLayer::new()
                .allow_origin(origin)
                .allow_methods(Any)
                .allow_headers(Any)
        }
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    };

    Ok(app_routes(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors),
    ))
}
