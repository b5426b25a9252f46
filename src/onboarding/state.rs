//! Onboarding form state machine: the draft plus the current step.
//!
//! All transitions are synchronous and deterministic; the only async
//! operation is `submit`, which hands the draft to a `ProfileSubmitter`.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::OnboardingError;
use crate::profile::Profile;

use super::model::{FieldUpdate, ProfileDraft};
use super::submitter::ProfileSubmitter;
use super::validation::{ValidationError, check_step};

/// The three onboarding steps.
///
/// Progresses linearly: Personal → LifeStage → Preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Step {
    /// Name, age, city.
    Personal,
    /// Life stage and its follow-up question.
    LifeStage,
    /// Notifications and emotional pace.
    Preferences,
}

impl Step {
    pub const FIRST: Step = Step::Personal;
    pub const LAST: Step = Step::Preferences;
    pub const COUNT: u8 = 3;

    /// 1-based position.
    pub fn number(&self) -> u8 {
        match self {
            Self::Personal => 1,
            Self::LifeStage => 2,
            Self::Preferences => 3,
        }
    }

    pub fn from_number(n: u8) -> Option<Step> {
        match n {
            1 => Some(Self::Personal),
            2 => Some(Self::LifeStage),
            3 => Some(Self::Preferences),
            _ => None,
        }
    }

    /// Next step in the progression, if any.
    pub fn next(&self) -> Option<Step> {
        Self::from_number(self.number() + 1)
    }

    /// Previous step, if any.
    pub fn previous(&self) -> Option<Step> {
        self.number().checked_sub(1).and_then(Self::from_number)
    }

    pub fn is_last(&self) -> bool {
        *self == Self::LAST
    }
}

impl Default for Step {
    fn default() -> Self {
        Self::FIRST
    }
}

impl From<Step> for u8 {
    fn from(step: Step) -> u8 {
        step.number()
    }
}

impl TryFrom<u8> for Step {
    type Error = String;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        Step::from_number(n).ok_or_else(|| format!("invalid onboarding step {n}"))
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// A user action on the form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "update", rename_all = "snake_case")]
pub enum Action {
    Update(FieldUpdate),
    Advance,
    Retreat,
}

/// One onboarding session's form: the draft and where the user is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OnboardingForm {
    draft: ProfileDraft,
    step: Step,
}

impl OnboardingForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draft(&self) -> &ProfileDraft {
        &self.draft
    }

    pub fn step(&self) -> Step {
        self.step
    }

    /// Merge an edit into the draft. Never validates, never fails.
    pub fn update_field(&mut self, update: FieldUpdate) {
        let field = update.field();
        if !self.draft.apply(update) {
            debug!(%field, "Ignoring follow-up answer not asked by the selected stage");
        }
    }

    /// Validate the current step and move forward on success.
    ///
    /// On the last step this is a no-op; use `submit` instead.
    pub fn advance(&mut self) -> Result<Step, ValidationError> {
        let Some(next) = self.step.next() else {
            return Ok(self.step);
        };
        check_step(self.step, &self.draft)?;
        self.step = next;
        Ok(next)
    }

    /// Move back one step without validating. No-op on the first step.
    pub fn retreat(&mut self) -> Step {
        if let Some(previous) = self.step.previous() {
            self.step = previous;
        }
        self.step
    }

    /// Reducer entry point: apply one action and return the resulting step.
    pub fn apply(&mut self, action: Action) -> Result<Step, ValidationError> {
        match action {
            Action::Update(update) => {
                self.update_field(update);
                Ok(self.step)
            }
            Action::Advance => self.advance(),
            Action::Retreat => Ok(self.retreat()),
        }
    }

    /// Submit the draft. Only allowed on the last step.
    ///
    /// The form is left untouched either way, so a failed attempt can be
    /// retried without re-entering data.
    pub async fn submit(
        &self,
        submitter: &ProfileSubmitter,
        access_token: Option<&secrecy::SecretString>,
    ) -> Result<Profile, OnboardingError> {
        if !self.step.is_last() {
            return Err(OnboardingError::NotOnFinalStep {
                step: self.step.number(),
            });
        }
        submitter.submit(&self.draft, access_token).await
    }
}
