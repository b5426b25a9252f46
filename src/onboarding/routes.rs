//! REST endpoints driving the three-step onboarding form.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use uuid::Uuid;

use crate::api::{bearer_token, error_json, onboarding_error_response};
use crate::auth::NextRoute;
use crate::error::{OnboardingError, SessionError};

use super::model::FieldUpdate;
use super::navigation::StepView;
use super::sessions::OnboardingSessions;
use super::state::{Action, OnboardingForm};
use super::submitter::ProfileSubmitter;

/// Shared state for onboarding routes.
#[derive(Clone)]
pub struct OnboardingRouteState {
    pub sessions: Arc<OnboardingSessions>,
    pub submitter: Arc<ProfileSubmitter>,
}

fn form_body(id: Uuid, form: &OnboardingForm) -> serde_json::Value {
    serde_json::json!({
        "session_id": id,
        "view": StepView::for_form(form),
        "draft": form.draft(),
    })
}

fn parse_session_id(raw: &str) -> Result<Uuid, Response> {
    Uuid::parse_str(raw).map_err(|_| error_json(StatusCode::BAD_REQUEST, "Invalid session id"))
}

fn session_error_response(err: &SessionError) -> Response {
    match err {
        SessionError::NotFound(_) => error_json(StatusCode::NOT_FOUND, err.to_string()),
        SessionError::TooMany => error_json(StatusCode::SERVICE_UNAVAILABLE, err.to_string()),
        SessionError::Onboarding(e) => onboarding_error_response(e),
    }
}

/// Run `action` and render the resulting form. A rejected action still
/// returns the (unchanged) form alongside the error.
async fn run_action(state: &OnboardingRouteState, raw_id: &str, action: Action) -> Response {
    let id = match parse_session_id(raw_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match state.sessions.apply(id, action).await {
        Ok((form, Ok(()))) => Json(form_body(id, &form)).into_response(),
        Ok((form, Err(OnboardingError::Validation(e)))) => {
            let mut body = form_body(id, &form);
            body["error"] = e.to_string().into();
            body["issues"] = crate::api::issues_json(&e);
            (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response()
        }
        Ok((_, Err(e))) => onboarding_error_response(&e),
        Err(e) => session_error_response(&e),
    }
}

/// POST /api/onboarding
///
/// Starts a new form on step 1.
async fn start(State(state): State<OnboardingRouteState>) -> Response {
    match state.sessions.start().await {
        Ok((id, form)) => (StatusCode::CREATED, Json(form_body(id, &form))).into_response(),
        Err(e) => session_error_response(&e),
    }
}

/// GET /api/onboarding/{id}
async fn get_form(
    State(state): State<OnboardingRouteState>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_session_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match state.sessions.get(id).await {
        Ok(form) => Json(form_body(id, &form)).into_response(),
        Err(e) => session_error_response(&e),
    }
}

/// PATCH /api/onboarding/{id}/fields
///
/// Body: `{"field": "nome", "value": "Ana"}`.
async fn update_field(
    State(state): State<OnboardingRouteState>,
    Path(id): Path<String>,
    Json(update): Json<FieldUpdate>,
) -> Response {
    run_action(&state, &id, Action::Update(update)).await
}

/// POST /api/onboarding/{id}/advance
async fn advance(State(state): State<OnboardingRouteState>, Path(id): Path<String>) -> Response {
    run_action(&state, &id, Action::Advance).await
}

/// POST /api/onboarding/{id}/retreat
async fn retreat(State(state): State<OnboardingRouteState>, Path(id): Path<String>) -> Response {
    run_action(&state, &id, Action::Retreat).await
}

/// POST /api/onboarding/{id}/submit
///
/// Requires `Authorization: Bearer <access token>`. On success the session
/// is closed and the created profile is returned.
async fn submit(
    State(state): State<OnboardingRouteState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let id = match parse_session_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let token = bearer_token(&headers);
    match state
        .sessions
        .submit(id, &state.submitter, token.as_ref())
        .await
    {
        Ok(profile) => (
            StatusCode::CREATED,
            Json(serde_json::json!({
                "profile": profile,
                "next": NextRoute::Dashboard.path(),
            })),
        )
            .into_response(),
        Err(e) => session_error_response(&e),
    }
}

/// Build the onboarding REST routes.
pub fn onboarding_routes(state: OnboardingRouteState) -> Router {
    Router::new()
        .route("/api/onboarding", post(start))
        .route("/api/onboarding/{id}", get(get_form))
        .route("/api/onboarding/{id}/fields", patch(update_field))
        .route("/api/onboarding/{id}/advance", post(advance))
        .route("/api/onboarding/{id}/retreat", post(retreat))
        .route("/api/onboarding/{id}/submit", post(submit))
        .with_state(state)
}
