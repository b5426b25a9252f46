//! ProfileSubmitter: turns a finished draft into a persisted profile.

use std::sync::Arc;

use secrecy::SecretString;
use tracing::{info, warn};

use crate::backend::{AuthBackend, ProfileStore};
use crate::error::{BackendError, OnboardingError};
use crate::profile::{NewProfile, Profile};

use super::model::ProfileDraft;

/// Resolves the caller's identity and issues the create-profile request.
///
/// Each call is a single attempt; retrying is up to the user.
pub struct ProfileSubmitter {
    auth: Arc<dyn AuthBackend>,
    store: Arc<dyn ProfileStore>,
}

impl ProfileSubmitter {
    pub fn new(auth: Arc<dyn AuthBackend>, store: Arc<dyn ProfileStore>) -> Self {
        Self { auth, store }
    }

    /// Submit `draft` on behalf of the user holding `access_token`.
    pub async fn submit(
        &self,
        draft: &ProfileDraft,
        access_token: Option<&SecretString>,
    ) -> Result<Profile, OnboardingError> {
        let token = access_token.ok_or(OnboardingError::AuthenticationMissing)?;
        let identity = match self.auth.current_user(token).await {
            Ok(Some(identity)) => identity,
            Ok(None) | Err(BackendError::Unauthorized) => {
                return Err(OnboardingError::AuthenticationMissing);
            }
            Err(e) => {
                warn!(error = %e, "Could not resolve current user for profile submission");
                return Err(OnboardingError::submission(e));
            }
        };

        let request = NewProfile::from_draft(&identity.id, draft)?;

        match self.store.create_profile(&identity, &request).await {
            Ok(profile) => {
                info!(user_id = %profile.id, momento = %profile.life_stage, "Onboarding completed");
                Ok(profile)
            }
            Err(e) => {
                warn!(user_id = %identity.id, error = %e, "Profile submission failed");
                Err(OnboardingError::submission(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use secrecy::ExposeSecret;

    use super::*;
    use crate::backend::{Identity, MemoryBackend, SignUpOutcome};
    use crate::onboarding::model::{FieldUpdate, LifeStage};
    use crate::profile::ProfileUpdate;

    /// Auth stub that always knows the caller.
    struct KnownUser;

    #[async_trait]
    impl AuthBackend for KnownUser {
        async fn sign_up(&self, _: &str, _: &str) -> Result<SignUpOutcome, BackendError> {
            unimplemented!("not used in submitter tests")
        }
        async fn sign_in(
            &self,
            _: &str,
            _: &str,
        ) -> Result<crate::backend::AuthSession, BackendError> {
            unimplemented!("not used in submitter tests")
        }
        async fn sign_out(&self, _: &SecretString) -> Result<(), BackendError> {
            Ok(())
        }
        async fn current_user(
            &self,
            token: &SecretString,
        ) -> Result<Option<Identity>, BackendError> {
            Ok(Some(Identity {
                id: "user-1".into(),
                email: None,
                access_token: SecretString::from(token.expose_secret().to_string()),
            }))
        }
    }

    /// Store stub that records requests and fails with a scripted error.
    #[derive(Default)]
    struct RecordingStore {
        requests: Mutex<Vec<NewProfile>>,
        fail_with: Mutex<Option<BackendError>>,
    }

    #[async_trait]
    impl ProfileStore for RecordingStore {
        async fn create_profile(
            &self,
            _identity: &Identity,
            profile: &NewProfile,
        ) -> Result<Profile, BackendError> {
            self.requests.lock().unwrap().push(profile.clone());
            if let Some(err) = self.fail_with.lock().unwrap().take() {
                return Err(err);
            }
            Ok(Profile::from_new(profile, chrono::Utc::now()))
        }
        async fn get_profile(&self, _: &Identity) -> Result<Option<Profile>, BackendError> {
            Ok(None)
        }
        async fn update_profile(
            &self,
            identity: &Identity,
            _: &ProfileUpdate,
        ) -> Result<Profile, BackendError> {
            Err(BackendError::NotFound {
                entity: "users".into(),
                id: identity.id.clone(),
            })
        }
    }

    fn ana_draft() -> ProfileDraft {
        let mut d = ProfileDraft::default();
        d.apply(FieldUpdate::Name("Ana".into()));
        d.apply(FieldUpdate::Age(28));
        d.apply(FieldUpdate::City("SP".into()));
        d.apply(FieldUpdate::LifeStage(LifeStage::Pregnant));
        d.apply(FieldUpdate::GestationWeek(Some(12)));
        d
    }

    fn token() -> SecretString {
        SecretString::from("token".to_string())
    }

    #[tokio::test]
    async fn missing_token_is_authentication_error() {
        let store = Arc::new(RecordingStore::default());
        let submitter = ProfileSubmitter::new(Arc::new(KnownUser), store.clone());
        let err = submitter.submit(&ana_draft(), None).await.unwrap_err();
        assert!(matches!(err, OnboardingError::AuthenticationMissing));
        assert!(store.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_token_is_authentication_error() {
        let backend = Arc::new(MemoryBackend::new());
        let submitter = ProfileSubmitter::new(backend.clone(), backend);
        let err = submitter
            .submit(&ana_draft(), Some(&token()))
            .await
            .unwrap_err();
        assert!(matches!(err, OnboardingError::AuthenticationMissing));
    }

    #[tokio::test]
    async fn success_issues_exactly_one_request() {
        let store = Arc::new(RecordingStore::default());
        let submitter = ProfileSubmitter::new(Arc::new(KnownUser), store.clone());
        let profile = submitter
            .submit(&ana_draft(), Some(&token()))
            .await
            .unwrap();
        assert_eq!(profile.id, "user-1");
        assert_eq!(profile.gestation_week, Some(12));

        let requests = store.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].id, "user-1");
        assert_eq!(requests[0].infant_age_months, None);
    }

    #[tokio::test]
    async fn store_failure_is_recoverable_submission_error() {
        let store = Arc::new(RecordingStore::default());
        *store.fail_with.lock().unwrap() = Some(BackendError::Conflict("users_pkey".into()));
        let submitter = ProfileSubmitter::new(Arc::new(KnownUser), store.clone());
        let draft = ana_draft();

        let err = submitter.submit(&draft, Some(&token())).await.unwrap_err();
        assert!(err.is_conflict());

        // Same draft, second attempt goes through.
        submitter.submit(&draft, Some(&token())).await.unwrap();
        assert_eq!(store.requests.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn incomplete_draft_never_reaches_store() {
        let store = Arc::new(RecordingStore::default());
        let submitter = ProfileSubmitter::new(Arc::new(KnownUser), store.clone());
        let err = submitter
            .submit(&ProfileDraft::default(), Some(&token()))
            .await
            .unwrap_err();
        assert!(matches!(err, OnboardingError::Validation(_)));
        assert!(store.requests.lock().unwrap().is_empty());
    }
}
