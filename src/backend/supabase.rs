//! Supabase client: GoTrue auth and PostgREST `users` table over HTTP.
//!
//! Every request carries the project's anon key in the `apikey` header.
//! Table requests authenticate as the end user (bearer access token) so
//! row-level security applies.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::traits::{AuthBackend, AuthSession, Identity, ProfileStore, SignUpOutcome};
use crate::error::BackendError;
use crate::profile::{NewProfile, Profile, ProfileUpdate};

const USERS_TABLE: &str = "users";

/// PostgreSQL unique-violation code, surfaced by PostgREST.
const PG_UNIQUE_VIOLATION: &str = "23505";

/// Connection settings for a Supabase project.
#[derive(Debug)]
pub struct SupabaseConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`.
    pub url: String,
    pub anon_key: SecretString,
}

/// Supabase-backed implementation of the auth and profile collaborators.
pub struct SupabaseBackend {
    base_url: String,
    anon_key: SecretString,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct GoTrueUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoTrueSession {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
    user: GoTrueUser,
}

impl GoTrueSession {
    fn into_session(self) -> AuthSession {
        AuthSession {
            identity: Identity {
                id: self.user.id,
                email: self.user.email,
                access_token: SecretString::from(self.access_token),
            },
            expires_in: self.expires_in,
        }
    }
}

impl SupabaseBackend {
    pub fn new(config: SupabaseConfig) -> Self {
        Self::with_client(config, reqwest::Client::new())
    }

    pub fn with_client(config: SupabaseConfig, client: reqwest::Client) -> Self {
        Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key,
            client,
        }
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.base_url)
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    /// Build a request with the project key and a bearer token (the user's
    /// access token, or the anon key for anonymous calls).
    fn request(&self, method: Method, url: String, token: Option<&SecretString>) -> RequestBuilder {
        let bearer = token.unwrap_or(&self.anon_key);
        self.client
            .request(method, url)
            .header("apikey", self.anon_key.expose_secret())
            .bearer_auth(bearer.expose_secret())
    }

    fn user_filter(identity: &Identity) -> [(&'static str, String); 2] {
        [
            ("id", format!("eq.{}", identity.id)),
            ("select", "*".to_string()),
        ]
    }
}

/// Turn an error response into a `BackendError`.
async fn error_from_response(response: reqwest::Response) -> BackendError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    classify_error(status, &body)
}

/// Map a status + body from GoTrue or PostgREST to a `BackendError`.
///
/// GoTrue reports `msg` / `error_description` / `error_code`; PostgREST
/// reports `message` / `code`.
fn classify_error(status: StatusCode, body: &str) -> BackendError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let field = |key: &str| {
        parsed
            .as_ref()
            .and_then(|v| v.get(key))
            .and_then(Value::as_str)
            .map(str::to_string)
    };

    let message = ["msg", "message", "error_description", "error"]
        .into_iter()
        .find_map(|k| field(k))
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("unknown error").to_string()
            } else {
                body.trim().to_string()
            }
        });
    let code = field("code");
    let error_code = field("error_code");

    match (status, code.as_deref(), error_code.as_deref()) {
        (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN, _, _) => BackendError::Unauthorized,
        (_, _, Some("invalid_credentials" | "bad_jwt" | "session_not_found")) => {
            BackendError::Unauthorized
        }
        (StatusCode::BAD_REQUEST, _, _) if field("error").as_deref() == Some("invalid_grant") => {
            BackendError::Unauthorized
        }
        (StatusCode::CONFLICT, _, _)
        | (_, Some(PG_UNIQUE_VIOLATION), _)
        | (_, _, Some("user_already_exists" | "email_exists")) => BackendError::Conflict(message),
        _ => BackendError::Status {
            status: status.as_u16(),
            message,
        },
    }
}

/// Read a PostgREST `return=representation` body and take its single row.
async fn single_row(response: reqwest::Response) -> Result<Option<Profile>, BackendError> {
    let rows: Vec<Profile> = response
        .json()
        .await
        .map_err(|e| BackendError::Decode(e.to_string()))?;
    Ok(rows.into_iter().next())
}

#[async_trait]
impl AuthBackend for SupabaseBackend {
    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, BackendError> {
        let response = self
            .request(Method::POST, self.auth_url("signup"), None)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let body: Value = response.json().await?;
        // With email confirmation enabled GoTrue returns only the user.
        if body.get("access_token").is_some() {
            let session: GoTrueSession =
                serde_json::from_value(body).map_err(|e| BackendError::Decode(e.to_string()))?;
            info!(user_id = %session.user.id, "Account created");
            Ok(SignUpOutcome::SignedIn(session.into_session()))
        } else {
            let user: GoTrueUser =
                serde_json::from_value(body).map_err(|e| BackendError::Decode(e.to_string()))?;
            info!(user_id = %user.id, "Account created, awaiting email confirmation");
            Ok(SignUpOutcome::ConfirmationPending { user_id: user.id })
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, BackendError> {
        let response = self
            .request(Method::POST, self.auth_url("token"), None)
            .query(&[("grant_type", "password")])
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        let session: GoTrueSession = response.json().await?;
        debug!(user_id = %session.user.id, "Signed in");
        Ok(session.into_session())
    }

    async fn sign_out(&self, access_token: &SecretString) -> Result<(), BackendError> {
        let response = self
            .request(Method::POST, self.auth_url("logout"), Some(access_token))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(())
    }

    async fn current_user(
        &self,
        access_token: &SecretString,
    ) -> Result<Option<Identity>, BackendError> {
        let response = self
            .request(Method::GET, self.auth_url("user"), Some(access_token))
            .send()
            .await?;
        if !response.status().is_success() {
            return match error_from_response(response).await {
                BackendError::Unauthorized => Ok(None),
                other => Err(other),
            };
        }
        let user: GoTrueUser = response.json().await?;
        Ok(Some(Identity {
            id: user.id,
            email: user.email,
            access_token: SecretString::from(access_token.expose_secret().to_string()),
        }))
    }
}

#[async_trait]
impl ProfileStore for SupabaseBackend {
    async fn create_profile(
        &self,
        identity: &Identity,
        profile: &NewProfile,
    ) -> Result<Profile, BackendError> {
        let response = self
            .request(
                Method::POST,
                self.table_url(USERS_TABLE),
                Some(&identity.access_token),
            )
            .header("Prefer", "return=representation")
            .json(profile)
            .send()
            .await?;
        if !response.status().is_success() {
            let err = error_from_response(response).await;
            warn!(user_id = %identity.id, error = %err, "Profile insert rejected");
            return Err(err);
        }
        let row = single_row(response)
            .await?
            .ok_or_else(|| BackendError::Decode("insert returned no rows".into()))?;
        info!(user_id = %row.id, momento = %row.life_stage, "Profile created");
        Ok(row)
    }

    async fn get_profile(&self, identity: &Identity) -> Result<Option<Profile>, BackendError> {
        let response = self
            .request(
                Method::GET,
                self.table_url(USERS_TABLE),
                Some(&identity.access_token),
            )
            .query(&Self::user_filter(identity))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        single_row(response).await
    }

    async fn update_profile(
        &self,
        identity: &Identity,
        update: &ProfileUpdate,
    ) -> Result<Profile, BackendError> {
        let response = self
            .request(
                Method::PATCH,
                self.table_url(USERS_TABLE),
                Some(&identity.access_token),
            )
            .query(&Self::user_filter(identity))
            .header("Prefer", "return=representation")
            .json(&update.to_columns())
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        single_row(response)
            .await?
            .ok_or_else(|| BackendError::NotFound {
                entity: USERS_TABLE.into(),
                id: identity.id.clone(),
            })
    }
}
