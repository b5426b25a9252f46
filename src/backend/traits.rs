//! Collaborator traits for the backend-as-a-service: auth and the `users` table.
//!
//! The service never talks to a global client; every caller receives an
//! `Arc<dyn AuthBackend>` / `Arc<dyn ProfileStore>` so tests can swap in fakes.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::error::BackendError;
use crate::profile::{NewProfile, Profile, ProfileUpdate};

/// An authenticated user plus the token that proves it.
#[derive(Debug)]
pub struct Identity {
    pub id: String,
    pub email: Option<String>,
    pub access_token: SecretString,
}

impl Clone for Identity {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            email: self.email.clone(),
            access_token: SecretString::from(self.access_token.expose_secret().to_string()),
        }
    }
}

/// A logged-in session.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub identity: Identity,
    /// Seconds until the access token expires, when the backend says.
    pub expires_in: Option<u64>,
}

/// Result of a sign-up request.
#[derive(Debug, Clone)]
pub enum SignUpOutcome {
    /// The account is usable right away.
    SignedIn(AuthSession),
    /// The backend requires email confirmation before the first login.
    ConfirmationPending { user_id: String },
}

/// Account management and identity resolution.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Register a new email/password account.
    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, BackendError>;

    /// Exchange credentials for a session.
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, BackendError>;

    /// Revoke the session behind `access_token`.
    async fn sign_out(&self, access_token: &SecretString) -> Result<(), BackendError>;

    /// Resolve the user behind `access_token`. `None` if the token is unknown
    /// or expired.
    async fn current_user(
        &self,
        access_token: &SecretString,
    ) -> Result<Option<Identity>, BackendError>;
}

/// Access to the `users` table, scoped to the calling identity.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Insert the profile for `identity`. Fails with `Conflict` if one exists.
    async fn create_profile(
        &self,
        identity: &Identity,
        profile: &NewProfile,
    ) -> Result<Profile, BackendError>;

    /// Fetch the profile for `identity`, if onboarding was completed.
    async fn get_profile(&self, identity: &Identity) -> Result<Option<Profile>, BackendError>;

    /// Apply a partial update and return the new row.
    async fn update_profile(
        &self,
        identity: &Identity,
        update: &ProfileUpdate,
    ) -> Result<Profile, BackendError>;
}
