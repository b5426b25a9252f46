//! Onboarding: a three-step questionnaire that becomes the user's profile.
//!
//! Step 1 asks for name, age and city. Step 2 asks for the life stage and,
//! depending on it, the gestation week or the baby's age. Step 3 sets
//! notification and emotional-pace preferences. The form only moves forward
//! when the current step validates; submission happens from the last step.

pub mod model;
pub mod navigation;
pub mod routes;
pub mod sessions;
pub mod state;
pub mod submitter;
pub mod validation;

pub use model::{EmotionalPace, Field, FieldUpdate, LifeStage, ProfileDraft, StageDetails};
pub use navigation::StepView;
pub use routes::{OnboardingRouteState, onboarding_routes};
pub use sessions::{OnboardingSessions, spawn_prune_task};
pub use state::{Action, OnboardingForm, Step};
pub use submitter::ProfileSubmitter;
pub use validation::{FieldIssue, Problem, ValidationError};
