//! In-memory registry of active onboarding forms, one per session id.
//!
//! Starting a form needs no account, so the registry is bounded: at most
//! `max_sessions` forms are held at once and forms idle past `max_idle` are
//! swept. A full registry refuses new forms until one closes or expires.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use secrecy::SecretString;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{OnboardingError, SessionError};
use crate::profile::Profile;

use super::state::{Action, OnboardingForm};
use super::submitter::ProfileSubmitter;

/// Sessions untouched for this long are dropped by the sweep task.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Upper bound on forms held at once.
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

struct SessionEntry {
    form: OnboardingForm,
    touched_at: Instant,
}

/// Owns every in-progress draft. A draft is only reachable through its id.
pub struct OnboardingSessions {
    entries: RwLock<HashMap<Uuid, SessionEntry>>,
    max_sessions: usize,
    max_idle: Duration,
}

impl Default for OnboardingSessions {
    fn default() -> Self {
        Self {
            entries: RwLock::default(),
            max_sessions: DEFAULT_MAX_SESSIONS,
            max_idle: DEFAULT_IDLE_TIMEOUT,
        }
    }
}

impl OnboardingSessions {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_limits(max_sessions: usize, max_idle: Duration) -> Arc<Self> {
        Arc::new(Self {
            entries: RwLock::default(),
            max_sessions,
            max_idle,
        })
    }

    pub fn max_idle(&self) -> Duration {
        self.max_idle
    }

    /// Start a fresh form with default answers.
    ///
    /// When the registry is full, expired forms are dropped first; if it is
    /// still full the call fails with `SessionError::TooMany`.
    pub async fn start(&self) -> Result<(Uuid, OnboardingForm), SessionError> {
        let mut entries = self.entries.write().await;
        if entries.len() >= self.max_sessions {
            let max_idle = self.max_idle;
            entries.retain(|_, e| e.touched_at.elapsed() < max_idle);
            if entries.len() >= self.max_sessions {
                warn!(limit = self.max_sessions, "Onboarding session limit reached");
                return Err(SessionError::TooMany);
            }
        }

        let id = Uuid::new_v4();
        let form = OnboardingForm::new();
        entries.insert(
            id,
            SessionEntry {
                form: form.clone(),
                touched_at: Instant::now(),
            },
        );
        info!(session_id = %id, "Onboarding session started");
        Ok((id, form))
    }

    /// Snapshot of a session's form.
    pub async fn get(&self, id: Uuid) -> Result<OnboardingForm, SessionError> {
        self.entries
            .read()
            .await
            .get(&id)
            .map(|e| e.form.clone())
            .ok_or(SessionError::NotFound(id))
    }

    /// Apply one action. The form is returned even when validation fails so
    /// the caller can re-render the unchanged step.
    pub async fn apply(
        &self,
        id: Uuid,
        action: Action,
    ) -> Result<(OnboardingForm, Result<(), OnboardingError>), SessionError> {
        let mut entries = self.entries.write().await;
        let entry = entries.get_mut(&id).ok_or(SessionError::NotFound(id))?;
        entry.touched_at = Instant::now();
        let outcome = entry.form.apply(action).map(|step| {
            debug!(session_id = %id, %step, "Onboarding action applied");
        });
        Ok((entry.form.clone(), outcome.map_err(OnboardingError::from)))
    }

    /// Submit a session's draft. The session is closed on success and kept
    /// intact on failure.
    ///
    /// The lock is not held while the backend call is in flight.
    pub async fn submit(
        &self,
        id: Uuid,
        submitter: &ProfileSubmitter,
        access_token: Option<&SecretString>,
    ) -> Result<Profile, SessionError> {
        let form = self.get(id).await?;
        let profile = form.submit(submitter, access_token).await?;
        self.entries.write().await.remove(&id);
        info!(session_id = %id, user_id = %profile.id, "Onboarding session closed");
        Ok(profile)
    }

    /// Drop sessions idle for longer than `max_idle`. Returns how many went.
    pub async fn prune_idle(&self, max_idle: Duration) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| e.touched_at.elapsed() < max_idle);
        let pruned = before - entries.len();
        if pruned > 0 {
            info!(pruned, "Pruned idle onboarding sessions");
        }
        pruned
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// Spawn a background task that prunes sessions idle past the registry's
/// `max_idle` every minute.
pub fn spawn_prune_task(sessions: Arc<OnboardingSessions>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            sessions.prune_idle(sessions.max_idle()).await;
        }
    })
}
