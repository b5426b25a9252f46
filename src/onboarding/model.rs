//! Onboarding answer models: life stage, emotional pace, and the draft.
//!
//! Wire codes mirror the backend `users` table (`gestante`, `moderado`, ...).
//! English names are accepted as aliases on input.

use serde::{Deserialize, Serialize};

/// The parenting/pregnancy phase the user is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifeStage {
    #[serde(rename = "tentante", alias = "trying_to_conceive")]
    TryingToConceive,
    #[serde(rename = "gestante", alias = "pregnant")]
    Pregnant,
    #[serde(rename = "pos_parto", alias = "postpartum")]
    Postpartum,
    #[serde(rename = "bebe", alias = "infant")]
    Infant,
    #[serde(rename = "papai", alias = "family")]
    Family,
}

impl LifeStage {
    pub const ALL: [LifeStage; 5] = [
        Self::TryingToConceive,
        Self::Pregnant,
        Self::Postpartum,
        Self::Infant,
        Self::Family,
    ];

    /// Backend column value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TryingToConceive => "tentante",
            Self::Pregnant => "gestante",
            Self::Postpartum => "pos_parto",
            Self::Infant => "bebe",
            Self::Family => "papai",
        }
    }

    /// Label shown next to the radio option.
    pub fn label(&self) -> &'static str {
        match self {
            Self::TryingToConceive => "Tentando engravidar",
            Self::Pregnant => "Gestante",
            Self::Postpartum => "Pós-parto",
            Self::Infant => "Bebê 0-24 meses",
            Self::Family => "Papai/Família",
        }
    }

    /// Whether this stage asks for the baby's age in months.
    pub fn tracks_infant_age(&self) -> bool {
        matches!(self, Self::Postpartum | Self::Infant)
    }
}

impl std::fmt::Display for LifeStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How much content the user wants to receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EmotionalPace {
    #[serde(rename = "calmo", alias = "calm")]
    Calm,
    #[default]
    #[serde(rename = "moderado", alias = "moderate")]
    Moderate,
    #[serde(rename = "intenso", alias = "intense")]
    Intense,
}

impl EmotionalPace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Calm => "calmo",
            Self::Moderate => "moderado",
            Self::Intense => "intenso",
        }
    }
}

impl std::fmt::Display for EmotionalPace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stage-specific answers, keyed by life stage.
///
/// Only the stage that owns a follow-up question carries a slot for it, so a
/// gestation week and a baby age can never both be meaningful.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "momento")]
pub enum StageDetails {
    #[serde(rename = "tentante")]
    TryingToConceive,
    #[serde(rename = "gestante")]
    Pregnant {
        #[serde(rename = "semanas_gestacao")]
        gestation_week: Option<i32>,
    },
    #[serde(rename = "pos_parto")]
    Postpartum {
        #[serde(rename = "idade_bebe_meses")]
        infant_age_months: Option<i32>,
    },
    #[serde(rename = "bebe")]
    Infant {
        #[serde(rename = "idade_bebe_meses")]
        infant_age_months: Option<i32>,
    },
    #[serde(rename = "papai")]
    Family,
}

impl StageDetails {
    /// Empty details for a freshly selected stage.
    pub fn new(stage: LifeStage) -> Self {
        Self::with_values(stage, None, None)
    }

    /// Build details for `stage`, keeping only the value that stage owns.
    pub fn with_values(
        stage: LifeStage,
        gestation_week: Option<i32>,
        infant_age_months: Option<i32>,
    ) -> Self {
        match stage {
            LifeStage::TryingToConceive => Self::TryingToConceive,
            LifeStage::Pregnant => Self::Pregnant { gestation_week },
            LifeStage::Postpartum => Self::Postpartum { infant_age_months },
            LifeStage::Infant => Self::Infant { infant_age_months },
            LifeStage::Family => Self::Family,
        }
    }

    /// Switch to `stage`, carrying over a value only if the new stage owns the
    /// same question (postpartum and infant share the baby's age).
    pub fn switch_to(&self, stage: LifeStage) -> Self {
        Self::with_values(stage, self.gestation_week(), self.infant_age_months())
    }

    pub fn life_stage(&self) -> LifeStage {
        match self {
            Self::TryingToConceive => LifeStage::TryingToConceive,
            Self::Pregnant { .. } => LifeStage::Pregnant,
            Self::Postpartum { .. } => LifeStage::Postpartum,
            Self::Infant { .. } => LifeStage::Infant,
            Self::Family => LifeStage::Family,
        }
    }

    pub fn gestation_week(&self) -> Option<i32> {
        match self {
            Self::Pregnant { gestation_week } => *gestation_week,
            _ => None,
        }
    }

    pub fn infant_age_months(&self) -> Option<i32> {
        match self {
            Self::Postpartum { infant_age_months } | Self::Infant { infant_age_months } => {
                *infant_age_months
            }
            _ => None,
        }
    }
}

/// A form field, named by its backend column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    #[serde(rename = "nome")]
    Name,
    #[serde(rename = "idade")]
    Age,
    #[serde(rename = "cidade")]
    City,
    #[serde(rename = "momento")]
    LifeStage,
    #[serde(rename = "semanas_gestacao")]
    GestationWeek,
    #[serde(rename = "idade_bebe_meses")]
    InfantAgeMonths,
    #[serde(rename = "preferencias_notificacoes")]
    Notifications,
    #[serde(rename = "ritmo_emocional")]
    EmotionalPace,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "nome",
            Self::Age => "idade",
            Self::City => "cidade",
            Self::LifeStage => "momento",
            Self::GestationWeek => "semanas_gestacao",
            Self::InfantAgeMonths => "idade_bebe_meses",
            Self::Notifications => "preferencias_notificacoes",
            Self::EmotionalPace => "ritmo_emocional",
        }
    }

    /// Form label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Name => "Nome",
            Self::Age => "Idade",
            Self::City => "Cidade",
            Self::LifeStage => "Momento",
            Self::GestationWeek => "Semanas de gestação",
            Self::InfantAgeMonths => "Idade do bebê (meses)",
            Self::Notifications => "Notificações",
            Self::EmotionalPace => "Ritmo emocional",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single edit to the draft, as sent by the UI.
///
/// JSON form: `{"field": "semanas_gestacao", "value": 12}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value")]
pub enum FieldUpdate {
    #[serde(rename = "nome")]
    Name(String),
    #[serde(rename = "idade")]
    Age(i32),
    #[serde(rename = "cidade")]
    City(String),
    #[serde(rename = "momento")]
    LifeStage(LifeStage),
    #[serde(rename = "semanas_gestacao")]
    GestationWeek(Option<i32>),
    #[serde(rename = "idade_bebe_meses")]
    InfantAgeMonths(Option<i32>),
    #[serde(rename = "preferencias_notificacoes")]
    Notifications(bool),
    #[serde(rename = "ritmo_emocional")]
    EmotionalPace(EmotionalPace),
}

impl FieldUpdate {
    pub fn field(&self) -> Field {
        match self {
            Self::Name(_) => Field::Name,
            Self::Age(_) => Field::Age,
            Self::City(_) => Field::City,
            Self::LifeStage(_) => Field::LifeStage,
            Self::GestationWeek(_) => Field::GestationWeek,
            Self::InfantAgeMonths(_) => Field::InfantAgeMonths,
            Self::Notifications(_) => Field::Notifications,
            Self::EmotionalPace(_) => Field::EmotionalPace,
        }
    }
}

/// The in-progress onboarding answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileDraft {
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "idade")]
    pub age: i32,
    #[serde(rename = "cidade")]
    pub city: String,
    #[serde(flatten)]
    pub stage: Option<StageDetails>,
    #[serde(rename = "preferencias_notificacoes")]
    pub notifications: bool,
    #[serde(rename = "ritmo_emocional")]
    pub emotional_pace: EmotionalPace,
}

impl Default for ProfileDraft {
    fn default() -> Self {
        Self {
            name: String::new(),
            age: 0,
            city: String::new(),
            stage: None,
            notifications: true,
            emotional_pace: EmotionalPace::default(),
        }
    }
}

impl ProfileDraft {
    /// Merge one edit into the draft.
    ///
    /// Returns `false` when the edit targets a follow-up question the selected
    /// stage does not ask; such edits are dropped.
    pub fn apply(&mut self, update: FieldUpdate) -> bool {
        match update {
            FieldUpdate::Name(name) => self.name = name,
            FieldUpdate::Age(age) => self.age = age,
            FieldUpdate::City(city) => self.city = city,
            FieldUpdate::LifeStage(stage) => {
                self.stage = Some(match &self.stage {
                    Some(current) => current.switch_to(stage),
                    None => StageDetails::new(stage),
                });
            }
            FieldUpdate::GestationWeek(week) => match &mut self.stage {
                Some(StageDetails::Pregnant { gestation_week }) => *gestation_week = week,
                _ => return false,
            },
            FieldUpdate::InfantAgeMonths(months) => match &mut self.stage {
                Some(
                    StageDetails::Postpartum { infant_age_months }
                    | StageDetails::Infant { infant_age_months },
                ) => *infant_age_months = months,
                _ => return false,
            },
            FieldUpdate::Notifications(on) => self.notifications = on,
            FieldUpdate::EmotionalPace(pace) => self.emotional_pace = pace,
        }
        true
    }

    pub fn life_stage(&self) -> Option<LifeStage> {
        self.stage.as_ref().map(StageDetails::life_stage)
    }

    pub fn gestation_week(&self) -> Option<i32> {
        self.stage.as_ref().and_then(StageDetails::gestation_week)
    }

    pub fn infant_age_months(&self) -> Option<i32> {
        self.stage.as_ref().and_then(StageDetails::infant_age_months)
    }
}
