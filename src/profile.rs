//! Persisted profile rows and the request shapes sent to the `users` table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::onboarding::model::{EmotionalPace, Field, LifeStage, ProfileDraft, StageDetails};
use crate::onboarding::state::Step;
use crate::onboarding::validation::{
    FieldIssue, ValidationError, check_step, foreign_follow_ups, stage_issues,
};

/// Insert payload for a completed onboarding draft.
///
/// Optional stage fields are omitted when not relevant, never sent as 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProfile {
    pub id: String,
    #[serde(rename = "nome")]
    pub name: String,
    /// Filled in by a database trigger.
    pub email: String,
    #[serde(rename = "idade")]
    pub age: i32,
    #[serde(rename = "cidade")]
    pub city: String,
    #[serde(rename = "momento")]
    pub life_stage: LifeStage,
    #[serde(
        rename = "semanas_gestacao",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub gestation_week: Option<i32>,
    #[serde(
        rename = "idade_bebe_meses",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub infant_age_months: Option<i32>,
    #[serde(rename = "preferencias_notificacoes")]
    pub notifications: bool,
    #[serde(rename = "ritmo_emocional")]
    pub emotional_pace: EmotionalPace,
}

impl NewProfile {
    /// Package a draft for `user_id`, re-checking the answer steps.
    pub fn from_draft(user_id: &str, draft: &ProfileDraft) -> Result<Self, ValidationError> {
        check_step(Step::Personal, draft)?;
        check_step(Step::LifeStage, draft)?;
        let stage = draft.stage.as_ref().ok_or_else(|| ValidationError {
            step: Step::LifeStage,
            issues: vec![FieldIssue::missing(Field::LifeStage)],
        })?;

        Ok(Self {
            id: user_id.to_string(),
            name: draft.name.trim().to_string(),
            email: String::new(),
            age: draft.age,
            city: draft.city.trim().to_string(),
            life_stage: stage.life_stage(),
            gestation_week: stage.gestation_week(),
            infant_age_months: stage.infant_age_months(),
            notifications: draft.notifications,
            emotional_pace: draft.emotional_pace,
        })
    }
}

/// A row of the `users` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(rename = "idade", default)]
    pub age: Option<i32>,
    #[serde(rename = "cidade", default)]
    pub city: Option<String>,
    #[serde(rename = "momento")]
    pub life_stage: LifeStage,
    #[serde(rename = "semanas_gestacao", default)]
    pub gestation_week: Option<i32>,
    #[serde(rename = "idade_bebe_meses", default)]
    pub infant_age_months: Option<i32>,
    #[serde(rename = "data_criacao")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "preferencias_notificacoes")]
    pub notifications: bool,
    #[serde(rename = "ritmo_emocional", default)]
    pub emotional_pace: Option<EmotionalPace>,
}

impl Profile {
    /// Build the row the store would return for an insert.
    pub fn from_new(new: &NewProfile, created_at: DateTime<Utc>) -> Self {
        Self {
            id: new.id.clone(),
            name: new.name.clone(),
            email: new.email.clone(),
            age: Some(new.age),
            city: Some(new.city.clone()),
            life_stage: new.life_stage,
            gestation_week: new.gestation_week,
            infant_age_months: new.infant_age_months,
            created_at,
            notifications: new.notifications,
            emotional_pace: Some(new.emotional_pace),
        }
    }

    /// Stage details, ignoring any stored value the stage does not own.
    pub fn stage_details(&self) -> StageDetails {
        StageDetails::with_values(self.life_stage, self.gestation_week, self.infant_age_months)
    }

    /// Apply a partial update in place.
    pub fn apply_update(&mut self, update: &ProfileUpdate) {
        if let Some(name) = &update.name {
            self.name = name.trim().to_string();
        }
        if let Some(age) = update.age {
            self.age = Some(age);
        }
        if let Some(city) = &update.city {
            self.city = Some(city.trim().to_string());
        }
        if let Some(stage) = &update.stage {
            self.life_stage = stage.life_stage();
            self.gestation_week = stage.gestation_week();
            self.infant_age_months = stage.infant_age_months();
        }
        if let Some(on) = update.notifications {
            self.notifications = on;
        }
        if let Some(pace) = update.emotional_pace {
            self.emotional_pace = Some(pace);
        }
    }
}

/// Partial update of the onboarding answers on an existing profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProfileUpdate {
    #[serde(rename = "nome", default)]
    pub name: Option<String>,
    #[serde(rename = "idade", default)]
    pub age: Option<i32>,
    #[serde(rename = "cidade", default)]
    pub city: Option<String>,
    #[serde(skip)]
    pub stage: Option<StageDetails>,
    #[serde(rename = "preferencias_notificacoes", default)]
    pub notifications: Option<bool>,
    #[serde(rename = "ritmo_emocional", default)]
    pub emotional_pace: Option<EmotionalPace>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Check the fields being changed with the same rules as onboarding.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();
        let mut step = Step::Personal;
        if self.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            issues.push(FieldIssue::missing(Field::Name));
        }
        match self.age {
            Some(0) => issues.push(FieldIssue::missing(Field::Age)),
            Some(a) if a < 0 => issues.push(FieldIssue::out_of_range(Field::Age)),
            _ => {}
        }
        if self.city.as_deref().is_some_and(|c| c.trim().is_empty()) {
            issues.push(FieldIssue::missing(Field::City));
        }
        if let Some(stage) = &self.stage {
            let stage_problems = stage_issues(stage);
            if issues.is_empty() && !stage_problems.is_empty() {
                step = Step::LifeStage;
            }
            issues.extend(stage_problems);
        }
        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { step, issues })
        }
    }

    /// Column map for a PATCH request.
    ///
    /// A stage change writes both follow-up columns, nulling the one the new
    /// stage does not own so no stale value survives.
    pub fn to_columns(&self) -> Map<String, Value> {
        let mut cols = Map::new();
        if let Some(name) = &self.name {
            cols.insert(Field::Name.as_str().into(), name.trim().into());
        }
        if let Some(age) = self.age {
            cols.insert(Field::Age.as_str().into(), age.into());
        }
        if let Some(city) = &self.city {
            cols.insert(Field::City.as_str().into(), city.trim().into());
        }
        if let Some(stage) = &self.stage {
            cols.insert(Field::LifeStage.as_str().into(), stage.life_stage().as_str().into());
            cols.insert(Field::GestationWeek.as_str().into(), stage.gestation_week().into());
            cols.insert(
                Field::InfantAgeMonths.as_str().into(),
                stage.infant_age_months().into(),
            );
        }
        if let Some(on) = self.notifications {
            cols.insert(Field::Notifications.as_str().into(), on.into());
        }
        if let Some(pace) = self.emotional_pace {
            cols.insert(Field::EmotionalPace.as_str().into(), pace.as_str().into());
        }
        cols
    }
}

/// Stage details for a profile update.
///
/// `stage` is the requested stage, or the stored one when the update only
/// sends follow-up answers; `stored` supplies the answer the update leaves
/// out. Answers to a question `stage` does not ask are rejected rather than
/// dropped.
pub fn stage_update(
    stage: LifeStage,
    gestation_week: Option<i32>,
    infant_age_months: Option<i32>,
    stored: Option<&Profile>,
) -> Result<StageDetails, ValidationError> {
    let issues = foreign_follow_ups(stage, gestation_week, infant_age_months);
    if !issues.is_empty() {
        return Err(ValidationError {
            step: Step::LifeStage,
            issues,
        });
    }
    Ok(StageDetails::with_values(
        stage,
        gestation_week.or(stored.and_then(|p| p.gestation_week)),
        infant_age_months.or(stored.and_then(|p| p.infant_age_months)),
    ))
}
