//! Per-step validation of the onboarding draft.
//!
//! Pure functions only; the state machine decides what to do with the result.

use std::ops::RangeInclusive;

use serde::Serialize;

use super::model::{Field, LifeStage, ProfileDraft, StageDetails};
use super::state::Step;

/// Accepted gestation weeks.
pub const GESTATION_WEEKS: RangeInclusive<i32> = 1..=42;
/// Accepted baby ages, in months.
pub const INFANT_AGE_MONTHS: RangeInclusive<i32> = 0..=24;

/// What is wrong with a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Problem {
    Missing,
    OutOfRange,
    /// An answer to a follow-up question the life stage does not ask.
    NotAsked,
}

/// A single offending field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    pub field: Field,
    pub problem: Problem,
}

impl FieldIssue {
    pub(crate) fn missing(field: Field) -> Self {
        Self {
            field,
            problem: Problem::Missing,
        }
    }

    pub(crate) fn out_of_range(field: Field) -> Self {
        Self {
            field,
            problem: Problem::OutOfRange,
        }
    }

    fn not_asked(field: Field) -> Self {
        Self {
            field,
            problem: Problem::NotAsked,
        }
    }

    /// Message shown next to the field.
    pub fn message(&self) -> &'static str {
        match (self.field, self.problem) {
            (_, Problem::NotAsked) => "Esta pergunta não se aplica ao seu momento",
            (Field::GestationWeek, Problem::Missing) => "Informe as semanas de gestação",
            (Field::GestationWeek, Problem::OutOfRange) => {
                "As semanas de gestação devem estar entre 1 e 42"
            }
            (Field::InfantAgeMonths, Problem::Missing) => "Informe a idade do bebê",
            (Field::InfantAgeMonths, Problem::OutOfRange) => {
                "A idade do bebê deve estar entre 0 e 24 meses"
            }
            (Field::LifeStage, _) => "Selecione o seu momento",
            (Field::Age, Problem::OutOfRange) => "Informe uma idade válida",
            _ => "Preencha todos os campos",
        }
    }
}

/// Required fields for a step are missing or out of range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("Step {step} is incomplete: {}", describe(.issues))]
pub struct ValidationError {
    pub step: Step,
    pub issues: Vec<FieldIssue>,
}

fn describe(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(|i| match i.problem {
            Problem::Missing => format!("{} is missing", i.field),
            Problem::OutOfRange => format!("{} is out of range", i.field),
            Problem::NotAsked => format!("{} is not asked for this life stage", i.field),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

impl ValidationError {
    /// The offending fields, in form order.
    pub fn fields(&self) -> Vec<Field> {
        self.issues.iter().map(|i| i.field).collect()
    }
}

/// Whether the draft satisfies `step`'s requirements.
pub fn is_step_valid(step: Step, draft: &ProfileDraft) -> bool {
    step_issues(step, draft).is_empty()
}

/// Validate `step`, naming every offending field on failure.
pub fn check_step(step: Step, draft: &ProfileDraft) -> Result<(), ValidationError> {
    let issues = step_issues(step, draft);
    if issues.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { step, issues })
    }
}

/// Fields the user must fill before leaving `step`.
///
/// On step 2 the follow-up question depends on the selected stage.
pub fn required_fields(step: Step, draft: &ProfileDraft) -> Vec<Field> {
    match step {
        Step::Personal => vec![Field::Name, Field::Age, Field::City],
        Step::LifeStage => {
            let mut fields = vec![Field::LifeStage];
            match draft.life_stage() {
                Some(LifeStage::Pregnant) => fields.push(Field::GestationWeek),
                Some(stage) if stage.tracks_infant_age() => fields.push(Field::InfantAgeMonths),
                _ => {}
            }
            fields
        }
        Step::Preferences => Vec::new(),
    }
}

fn step_issues(step: Step, draft: &ProfileDraft) -> Vec<FieldIssue> {
    match step {
        Step::Personal => personal_issues(draft),
        Step::LifeStage => match &draft.stage {
            Some(details) => stage_issues(details),
            None => vec![FieldIssue::missing(Field::LifeStage)],
        },
        Step::Preferences => Vec::new(),
    }
}

fn personal_issues(draft: &ProfileDraft) -> Vec<FieldIssue> {
    let mut issues = Vec::new();
    if draft.name.trim().is_empty() {
        issues.push(FieldIssue::missing(Field::Name));
    }
    if draft.age == 0 {
        issues.push(FieldIssue::missing(Field::Age));
    } else if draft.age < 0 {
        issues.push(FieldIssue::out_of_range(Field::Age));
    }
    if draft.city.trim().is_empty() {
        issues.push(FieldIssue::missing(Field::City));
    }
    issues
}

/// Flag follow-up answers that `stage` does not ask for.
pub fn foreign_follow_ups(
    stage: LifeStage,
    gestation_week: Option<i32>,
    infant_age_months: Option<i32>,
) -> Vec<FieldIssue> {
    let mut issues = Vec::new();
    if gestation_week.is_some() && stage != LifeStage::Pregnant {
        issues.push(FieldIssue::not_asked(Field::GestationWeek));
    }
    if infant_age_months.is_some() && !stage.tracks_infant_age() {
        issues.push(FieldIssue::not_asked(Field::InfantAgeMonths));
    }
    issues
}

/// Check the follow-up answer owned by the selected stage.
pub(crate) fn stage_issues(details: &StageDetails) -> Vec<FieldIssue> {
    let check = |field: Field, value: Option<i32>, range: RangeInclusive<i32>| match value {
        None => vec![FieldIssue::missing(field)],
        Some(v) if !range.contains(&v) => vec![FieldIssue::out_of_range(field)],
        Some(_) => Vec::new(),
    };
    match details {
        StageDetails::Pregnant { gestation_week } => {
            check(Field::GestationWeek, *gestation_week, GESTATION_WEEKS)
        }
        StageDetails::Postpartum { infant_age_months }
        | StageDetails::Infant { infant_age_months } => {
            check(Field::InfantAgeMonths, *infant_age_months, INFANT_AGE_MONTHS)
        }
        StageDetails::TryingToConceive | StageDetails::Family => Vec::new(),
    }
}
