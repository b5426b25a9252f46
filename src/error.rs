//! Error types for Maylove.

use uuid::Uuid;

use crate::onboarding::validation::ValidationError;

/// Top-level error type for the service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Onboarding error: {0}")]
    Onboarding(#[from] OnboardingError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors raised by the backend-as-a-service collaborators.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Request to backend failed: {0}")]
    Request(String),

    #[error("Backend returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Not authenticated")]
    Unauthorized,

    #[error("Record already exists: {0}")]
    Conflict(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Failed to decode backend response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Request(e.to_string())
        }
    }
}

/// Registration / login errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid email address")]
    InvalidEmail,

    #[error("Password must not be empty")]
    EmptyPassword,

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Onboarding flow outcomes that stop a transition or a submission.
///
/// All variants are recoverable: the draft is left untouched.
#[derive(Debug, thiserror::Error)]
pub enum OnboardingError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("No authenticated user; sign up or log in first")]
    AuthenticationMissing,

    #[error("Could not create profile: {message}")]
    Submission {
        message: String,
        #[source]
        source: Option<BackendError>,
    },

    #[error("Submit is only available on the last step (currently on step {step})")]
    NotOnFinalStep { step: u8 },
}

impl OnboardingError {
    /// Wrap a collaborator failure into a user-facing submission error.
    pub fn submission(source: BackendError) -> Self {
        let message = match &source {
            BackendError::Conflict(_) => "A profile already exists for this account".to_string(),
            BackendError::Unauthorized => "Your session expired, please log in again".to_string(),
            BackendError::Request(_) => {
                "Could not reach the server, check your connection and try again".to_string()
            }
            other => other.to_string(),
        };
        Self::Submission {
            message,
            source: Some(source),
        }
    }

    /// Whether the failure came from a duplicate profile.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::Submission {
                source: Some(BackendError::Conflict(_)),
                ..
            }
        )
    }
}

/// Errors addressing an onboarding session by id.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Onboarding session {0} not found")]
    NotFound(Uuid),

    #[error("Too many onboarding sessions in progress, try again later")]
    TooMany,

    #[error(transparent)]
    Onboarding(#[from] OnboardingError),
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;
