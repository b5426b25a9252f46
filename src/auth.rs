//! Registration and login flow on top of the `AuthBackend` collaborator.
//!
//! Credentials are only checked for shape here; everything else is the
//! backend's job.

use secrecy::SecretString;
use serde::Serialize;
use tracing::{info, warn};

use crate::backend::{AuthBackend, AuthSession, Identity, SignUpOutcome};
use crate::error::{AuthError, BackendError};

/// Where the UI should send the user after an auth action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NextRoute {
    /// New account: fill in the onboarding questionnaire.
    Onboarding,
    /// Returning user.
    Dashboard,
    /// Account created but the email must be confirmed before logging in.
    ConfirmEmail,
    /// Not logged in.
    SignUp,
}

impl NextRoute {
    pub fn path(&self) -> &'static str {
        match self {
            Self::Onboarding => "/onboarding",
            Self::Dashboard => "/dashboard",
            Self::ConfirmEmail | Self::SignUp => "/cadastro",
        }
    }
}

/// Result of a successful sign-up or sign-in.
#[derive(Debug, Clone)]
pub struct AuthOutcome {
    pub user_id: String,
    /// Absent when the backend still requires email confirmation.
    pub session: Option<AuthSession>,
    pub next: NextRoute,
}

/// Check that the credentials are worth sending to the backend.
pub fn validate_credentials(email: &str, password: &str) -> Result<(), AuthError> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {}
        _ => return Err(AuthError::InvalidEmail),
    }
    if password.is_empty() {
        return Err(AuthError::EmptyPassword);
    }
    Ok(())
}

/// Create an account. On success the user continues to onboarding.
pub async fn sign_up(
    auth: &dyn AuthBackend,
    email: &str,
    password: &str,
) -> Result<AuthOutcome, AuthError> {
    validate_credentials(email, password)?;
    let outcome = match auth.sign_up(email.trim(), password).await? {
        SignUpOutcome::SignedIn(session) => AuthOutcome {
            user_id: session.identity.id.clone(),
            session: Some(session),
            next: NextRoute::Onboarding,
        },
        SignUpOutcome::ConfirmationPending { user_id } => AuthOutcome {
            user_id,
            session: None,
            next: NextRoute::ConfirmEmail,
        },
    };
    info!(user_id = %outcome.user_id, next = ?outcome.next, "Sign-up complete");
    Ok(outcome)
}

/// Log in. On success the user continues to the dashboard.
pub async fn sign_in(
    auth: &dyn AuthBackend,
    email: &str,
    password: &str,
) -> Result<AuthOutcome, AuthError> {
    validate_credentials(email, password)?;
    let session = auth.sign_in(email.trim(), password).await?;
    Ok(AuthOutcome {
        user_id: session.identity.id.clone(),
        session: Some(session),
        next: NextRoute::Dashboard,
    })
}

pub async fn sign_out(auth: &dyn AuthBackend, access_token: &SecretString) -> Result<(), AuthError> {
    auth.sign_out(access_token).await?;
    Ok(())
}

/// Resolve the caller, treating a missing or rejected token as "nobody".
pub async fn resolve_identity(
    auth: &dyn AuthBackend,
    access_token: Option<&SecretString>,
) -> Result<Option<Identity>, BackendError> {
    let Some(token) = access_token else {
        return Ok(None);
    };
    match auth.current_user(token).await {
        Ok(identity) => Ok(identity),
        Err(BackendError::Unauthorized) => Ok(None),
        Err(e) => {
            warn!(error = %e, "Failed to resolve current user");
            Err(e)
        }
    }
}
