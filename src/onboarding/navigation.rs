//! What each step shows: title, fields, and which buttons are enabled.

use serde::Serialize;

use super::model::{Field, LifeStage};
use super::state::{OnboardingForm, Step};
use super::validation::required_fields;

/// A selectable life-stage option for step 2.
#[derive(Debug, Clone, Serialize)]
pub struct StageOption {
    pub value: LifeStage,
    pub label: &'static str,
}

/// Rendering contract for the current step.
#[derive(Debug, Clone, Serialize)]
pub struct StepView {
    pub step: Step,
    pub title: &'static str,
    /// e.g. "Passo 2 de 3".
    pub position: String,
    pub visible_fields: Vec<Field>,
    pub required_fields: Vec<Field>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stage_options: Vec<StageOption>,
    pub can_advance: bool,
    pub can_retreat: bool,
    pub can_submit: bool,
}

impl StepView {
    pub fn for_form(form: &OnboardingForm) -> Self {
        let step = form.step();
        let draft = form.draft();

        let (title, visible_fields, stage_options) = match step {
            Step::Personal => (
                "Vamos nos conhecer",
                vec![Field::Name, Field::Age, Field::City],
                Vec::new(),
            ),
            Step::LifeStage => {
                let mut fields = vec![Field::LifeStage];
                match draft.life_stage() {
                    Some(LifeStage::Pregnant) => fields.push(Field::GestationWeek),
                    Some(stage) if stage.tracks_infant_age() => {
                        fields.push(Field::InfantAgeMonths)
                    }
                    _ => {}
                }
                let options = LifeStage::ALL
                    .iter()
                    .map(|s| StageOption {
                        value: *s,
                        label: s.label(),
                    })
                    .collect();
                ("Qual é o seu momento?", fields, options)
            }
            Step::Preferences => (
                "Últimos ajustes",
                vec![Field::Notifications, Field::EmotionalPace],
                Vec::new(),
            ),
        };

        Self {
            step,
            title,
            position: format!("Passo {} de {}", step.number(), Step::COUNT),
            visible_fields,
            required_fields: required_fields(step, draft),
            stage_options,
            can_advance: !step.is_last(),
            can_retreat: step != Step::FIRST,
            can_submit: step.is_last(),
        }
    }
}
