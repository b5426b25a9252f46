//! In-memory backend: accounts, sessions, and profiles behind `RwLock`s.
//!
//! Used by the test suite and by local runs without Supabase credentials.
//! Passwords are kept as given; this is not a production store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use super::traits::{AuthBackend, AuthSession, Identity, ProfileStore, SignUpOutcome};
use crate::error::BackendError;
use crate::profile::{NewProfile, Profile, ProfileUpdate};

struct Account {
    id: String,
    password: String,
}

/// In-process stand-in for the backend-as-a-service.
#[derive(Default)]
pub struct MemoryBackend {
    /// email → account
    accounts: RwLock<HashMap<String, Account>>,
    /// access token → (user id, email)
    sessions: RwLock<HashMap<String, (String, String)>>,
    /// user id → profile row
    profiles: RwLock<HashMap<String, Profile>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    async fn open_session(&self, user_id: &str, email: &str) -> AuthSession {
        let token = Uuid::new_v4().to_string();
        self.sessions
            .write()
            .await
            .insert(token.clone(), (user_id.to_string(), email.to_string()));
        AuthSession {
            identity: Identity {
                id: user_id.to_string(),
                email: Some(email.to_string()),
                access_token: SecretString::from(token),
            },
            expires_in: None,
        }
    }

    /// Number of stored profiles.
    pub async fn profile_count(&self) -> usize {
        self.profiles.read().await.len()
    }

    async fn require_session(&self, identity: &Identity) -> Result<(), BackendError> {
        let sessions = self.sessions.read().await;
        match sessions.get(identity.access_token.expose_secret()) {
            Some((user_id, _)) if *user_id == identity.id => Ok(()),
            _ => Err(BackendError::Unauthorized),
        }
    }
}

#[async_trait]
impl AuthBackend for MemoryBackend {
    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, BackendError> {
        let email = email.trim().to_lowercase();
        let user_id = {
            let mut accounts = self.accounts.write().await;
            if accounts.contains_key(&email) {
                return Err(BackendError::Conflict("User already registered".into()));
            }
            let id = Uuid::new_v4().to_string();
            accounts.insert(
                email.clone(),
                Account {
                    id: id.clone(),
                    password: password.to_string(),
                },
            );
            id
        };
        info!(user_id = %user_id, "Account created");
        Ok(SignUpOutcome::SignedIn(
            self.open_session(&user_id, &email).await,
        ))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, BackendError> {
        let email = email.trim().to_lowercase();
        let user_id = {
            let accounts = self.accounts.read().await;
            match accounts.get(&email) {
                Some(account) if account.password == password => account.id.clone(),
                _ => return Err(BackendError::Unauthorized),
            }
        };
        Ok(self.open_session(&user_id, &email).await)
    }

    async fn sign_out(&self, access_token: &SecretString) -> Result<(), BackendError> {
        let removed = self
            .sessions
            .write()
            .await
            .remove(access_token.expose_secret());
        match removed {
            Some((user_id, _)) => {
                debug!(user_id = %user_id, "Session revoked");
                Ok(())
            }
            None => Err(BackendError::Unauthorized),
        }
    }

    async fn current_user(
        &self,
        access_token: &SecretString,
    ) -> Result<Option<Identity>, BackendError> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(access_token.expose_secret())
            .map(|(id, email)| Identity {
                id: id.clone(),
                email: Some(email.clone()),
                access_token: SecretString::from(access_token.expose_secret().to_string()),
            }))
    }
}

#[async_trait]
impl ProfileStore for MemoryBackend {
    async fn create_profile(
        &self,
        identity: &Identity,
        profile: &NewProfile,
    ) -> Result<Profile, BackendError> {
        self.require_session(identity).await?;
        if profile.id != identity.id {
            return Err(BackendError::Unauthorized);
        }

        let mut profiles = self.profiles.write().await;
        if profiles.contains_key(&profile.id) {
            return Err(BackendError::Conflict(format!(
                "profile for user {} already exists",
                profile.id
            )));
        }
        let mut row = Profile::from_new(profile, Utc::now());
        row.email = identity.email.clone().unwrap_or_default();
        profiles.insert(row.id.clone(), row.clone());
        info!(user_id = %row.id, momento = %row.life_stage, "Profile created");
        Ok(row)
    }

    async fn get_profile(&self, identity: &Identity) -> Result<Option<Profile>, BackendError> {
        self.require_session(identity).await?;
        Ok(self.profiles.read().await.get(&identity.id).cloned())
    }

    async fn update_profile(
        &self,
        identity: &Identity,
        update: &ProfileUpdate,
    ) -> Result<Profile, BackendError> {
        self.require_session(identity).await?;
        let mut profiles = self.profiles.write().await;
        let row = profiles
            .get_mut(&identity.id)
            .ok_or_else(|| BackendError::NotFound {
                entity: "users".into(),
                id: identity.id.clone(),
            })?;
        row.apply_update(update);
        Ok(row.clone())
    }
}
