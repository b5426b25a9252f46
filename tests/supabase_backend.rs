//! Integration tests for the Supabase client against a fake project.
//!
//! The fake speaks just enough GoTrue and PostgREST to check the headers,
//! request bodies and error mapping the client relies on.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tokio::net::TcpListener;

use maylove::backend::{
    AuthBackend, ProfileStore, SignUpOutcome, SupabaseBackend, SupabaseConfig,
};
use maylove::error::{BackendError, OnboardingError};
use maylove::onboarding::{FieldUpdate, LifeStage, ProfileDraft, ProfileSubmitter};

const ANON_KEY: &str = "anon-key";
const USER_TOKEN: &str = "tok-ana";
const USER_ID: &str = "0b7c9d2e-0000-4000-8000-000000000001";

#[derive(Default)]
struct FakeProject {
    /// Body and `Prefer` header of every insert.
    inserts: Vec<(Value, Option<String>)>,
    rows: Vec<Value>,
    missing_apikey: usize,
}

type Shared = Arc<Mutex<FakeProject>>;

fn check_apikey(state: &Shared, headers: &HeaderMap) {
    if headers.get("apikey").and_then(|v| v.to_str().ok()) != Some(ANON_KEY) {
        state.lock().unwrap().missing_apikey += 1;
    }
}

fn is_user(headers: &HeaderMap) -> bool {
    let expected = format!("Bearer {USER_TOKEN}");
    headers.get("authorization").and_then(|v| v.to_str().ok()) == Some(expected.as_str())
}

fn user_json(email: &str) -> Value {
    json!({"id": USER_ID, "email": email, "aud": "authenticated"})
}

async fn signup(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    check_apikey(&state, &headers);
    let email = body["email"].as_str().unwrap_or_default();
    if email == "taken@example.com" {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "code": 422,
                "error_code": "user_already_exists",
                "msg": "User already registered"
            })),
        )
            .into_response();
    }
    if email.starts_with("confirm") {
        return Json(user_json(email)).into_response();
    }
    Json(json!({
        "access_token": USER_TOKEN,
        "token_type": "bearer",
        "expires_in": 3600,
        "user": user_json(email),
    }))
    .into_response()
}

async fn token(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Response {
    check_apikey(&state, &headers);
    assert_eq!(query.get("grant_type").map(String::as_str), Some("password"));
    if body["password"] != "segredo" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "invalid_grant",
                "error_description": "Invalid login credentials"
            })),
        )
            .into_response();
    }
    Json(json!({
        "access_token": USER_TOKEN,
        "expires_in": 3600,
        "user": user_json(body["email"].as_str().unwrap_or_default()),
    }))
    .into_response()
}

async fn user(State(state): State<Shared>, headers: HeaderMap) -> Response {
    check_apikey(&state, &headers);
    if !is_user(&headers) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"code": 401, "error_code": "bad_jwt", "msg": "invalid JWT"})),
        )
            .into_response();
    }
    Json(user_json("ana@example.com")).into_response()
}

async fn insert_user(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    check_apikey(&state, &headers);
    if !is_user(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let prefer = headers
        .get("prefer")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let mut project = state.lock().unwrap();
    project.inserts.push((body.clone(), prefer));
    if project.rows.iter().any(|r| r["id"] == body["id"]) {
        return (
            StatusCode::CONFLICT,
            Json(json!({
                "code": "23505",
                "message": "duplicate key value violates unique constraint \"users_pkey\""
            })),
        )
            .into_response();
    }

    let mut row = body;
    row["email"] = json!("ana@example.com");
    row["data_criacao"] = json!("2024-05-01T10:00:00Z");
    project.rows.push(row.clone());
    (StatusCode::CREATED, Json(json!([row]))).into_response()
}

async fn select_users(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    check_apikey(&state, &headers);
    let wanted = query
        .get("id")
        .and_then(|f| f.strip_prefix("eq."))
        .unwrap_or_default()
        .to_string();
    let project = state.lock().unwrap();
    let rows: Vec<Value> = project
        .rows
        .iter()
        .filter(|r| r["id"] == wanted.as_str())
        .cloned()
        .collect();
    Json(rows).into_response()
}

/// Start the fake project on a random port.
async fn start_fake() -> (String, Shared) {
    let state: Shared = Arc::default();
    let app = Router::new()
        .route("/auth/v1/signup", post(signup))
        .route("/auth/v1/token", post(token))
        .route("/auth/v1/user", get(user))
        .route("/rest/v1/users", post(insert_user).get(select_users))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    (format!("http://127.0.0.1:{port}/"), state)
}

fn client(url: &str) -> Arc<SupabaseBackend> {
    Arc::new(SupabaseBackend::new(SupabaseConfig {
        url: url.to_string(),
        anon_key: SecretString::from(ANON_KEY.to_string()),
    }))
}

fn ana_draft() -> ProfileDraft {
    let mut draft = ProfileDraft::default();
    draft.apply(FieldUpdate::Name("Ana".into()));
    draft.apply(FieldUpdate::Age(28));
    draft.apply(FieldUpdate::City("SP".into()));
    draft.apply(FieldUpdate::LifeStage(LifeStage::Pregnant));
    draft.apply(FieldUpdate::GestationWeek(Some(12)));
    draft
}

#[tokio::test]
async fn sign_up_and_sign_in() {
    let (url, state) = start_fake().await;
    let backend = client(&url);

    match backend.sign_up("ana@example.com", "segredo").await.unwrap() {
        SignUpOutcome::SignedIn(session) => {
            assert_eq!(session.identity.id, USER_ID);
            assert_eq!(session.identity.access_token.expose_secret(), USER_TOKEN);
            assert_eq!(session.expires_in, Some(3600));
        }
        other => panic!("expected a session, got {other:?}"),
    }

    match backend.sign_up("confirm@example.com", "segredo").await.unwrap() {
        SignUpOutcome::ConfirmationPending { user_id } => assert_eq!(user_id, USER_ID),
        other => panic!("expected pending confirmation, got {other:?}"),
    }

    let err = backend
        .sign_up("taken@example.com", "segredo")
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::Conflict(ref m) if m == "User already registered"));

    let err = backend
        .sign_in("ana@example.com", "errada")
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::Unauthorized));

    let session = backend.sign_in("ana@example.com", "segredo").await.unwrap();
    assert_eq!(session.identity.email.as_deref(), Some("ana@example.com"));

    assert_eq!(state.lock().unwrap().missing_apikey, 0);
}

#[tokio::test]
async fn current_user_maps_rejected_token_to_none() {
    let (url, _) = start_fake().await;
    let backend = client(&url);

    let token = SecretString::from(USER_TOKEN.to_string());
    let identity = backend.current_user(&token).await.unwrap().unwrap();
    assert_eq!(identity.id, USER_ID);

    let stale = SecretString::from("expired".to_string());
    assert!(backend.current_user(&stale).await.unwrap().is_none());
}

#[tokio::test]
async fn submitter_creates_profile_row() {
    let (url, state) = start_fake().await;
    let backend = client(&url);
    let submitter = ProfileSubmitter::new(backend.clone(), backend.clone());
    let token = SecretString::from(USER_TOKEN.to_string());

    let profile = submitter
        .submit(&ana_draft(), Some(&token))
        .await
        .unwrap();
    assert_eq!(profile.id, USER_ID);
    assert_eq!(profile.email, "ana@example.com");
    assert_eq!(profile.gestation_week, Some(12));

    {
        let project = state.lock().unwrap();
        assert_eq!(project.inserts.len(), 1);
        let (body, prefer) = &project.inserts[0];
        assert_eq!(prefer.as_deref(), Some("return=representation"));
        assert_eq!(body["id"], USER_ID);
        assert_eq!(body["nome"], "Ana");
        assert_eq!(body["momento"], "gestante");
        assert_eq!(body["semanas_gestacao"], 12);
        assert!(body.get("idade_bebe_meses").is_none());
        assert_eq!(project.missing_apikey, 0);
    }

    // The row is readable afterwards.
    let identity = backend.current_user(&token).await.unwrap().unwrap();
    let stored = backend.get_profile(&identity).await.unwrap().unwrap();
    assert_eq!(stored.name, "Ana");
    assert_eq!(stored.life_stage, LifeStage::Pregnant);
}

#[tokio::test]
async fn duplicate_profile_is_a_conflict() {
    let (url, state) = start_fake().await;
    let backend = client(&url);
    let submitter = ProfileSubmitter::new(backend.clone(), backend);
    let token = SecretString::from(USER_TOKEN.to_string());

    submitter.submit(&ana_draft(), Some(&token)).await.unwrap();
    let err = submitter
        .submit(&ana_draft(), Some(&token))
        .await
        .unwrap_err();
    assert!(err.is_conflict());
    assert!(matches!(err, OnboardingError::Submission { .. }));
    assert_eq!(state.lock().unwrap().inserts.len(), 2);
}

#[tokio::test]
async fn unknown_token_never_reaches_the_table() {
    let (url, state) = start_fake().await;
    let backend = client(&url);
    let submitter = ProfileSubmitter::new(backend.clone(), backend);

    let stale = SecretString::from("expired".to_string());
    let err = submitter
        .submit(&ana_draft(), Some(&stale))
        .await
        .unwrap_err();
    assert!(matches!(err, OnboardingError::AuthenticationMissing));
    assert!(state.lock().unwrap().inserts.is_empty());
}

#[tokio::test]
async fn unreachable_project_is_a_request_error() {
    // Nothing listens on port 1.
    let backend = client("http://127.0.0.1:1");
    let err = backend
        .sign_in("ana@example.com", "segredo")
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::Request(_)));
}
