//! Home screen content derived from a stored profile.

use secrecy::SecretString;
use serde::Serialize;

use crate::auth::{NextRoute, resolve_identity};
use crate::backend::{AuthBackend, ProfileStore};
use crate::error::BackendError;
use crate::onboarding::model::LifeStage;
use crate::profile::Profile;

/// Length of a full-term pregnancy used for the progress bar.
pub const PREGNANCY_WEEKS: i32 = 40;

const MILESTONE_MOVEMENTS: &str =
    "Seu bebê já consegue fazer movimentos! Os órgãos principais estão formados.";
const MILESTONE_ORGANS: &str = "Fase crucial de formação dos órgãos vitais do bebê.";
const MILESTONE_DISCOVERIES: &str = "Cada dia traz novas descobertas e aprendizados!";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PregnancyProgress {
    pub week: i32,
    pub total_weeks: i32,
    /// Not clamped: week 42 reports 105.
    pub percent: i32,
}

impl PregnancyProgress {
    pub fn for_week(week: i32) -> Self {
        let percent = (f64::from(week) / f64::from(PREGNANCY_WEEKS) * 100.0).round() as i32;
        Self {
            week,
            total_weeks: PREGNANCY_WEEKS,
            percent,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub label: &'static str,
    pub path: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub title: &'static str,
    pub detail: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dashboard {
    pub greeting: String,
    pub headline: String,
    pub life_stage: LifeStage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pregnancy: Option<PregnancyProgress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub milestone: Option<&'static str>,
    pub quick_links: Vec<Link>,
    pub suggestions: Vec<Suggestion>,
    pub emergency: Link,
}

impl Dashboard {
    pub fn for_profile(profile: &Profile) -> Self {
        let stage = profile.stage_details();
        // Missing follow-up answers render as zero, like the web page does.
        let week = stage.gestation_week().unwrap_or(0);
        let months = stage.infant_age_months().unwrap_or(0);

        let headline = match profile.life_stage {
            LifeStage::Pregnant => format!("Você está na semana {week} da sua gestação"),
            LifeStage::Infant => format!("Seu bebê tem {months} meses"),
            LifeStage::TryingToConceive => "Sua jornada está começando".to_string(),
            LifeStage::Postpartum => "Bem-vinda à maternidade".to_string(),
            LifeStage::Family => "Acompanhando a jornada".to_string(),
        };

        let (pregnancy, milestone) = match profile.life_stage {
            LifeStage::Pregnant => {
                let text = if week >= 12 {
                    MILESTONE_MOVEMENTS
                } else {
                    MILESTONE_ORGANS
                };
                (Some(PregnancyProgress::for_week(week)), Some(text))
            }
            LifeStage::Infant => (None, Some(MILESTONE_DISCOVERIES)),
            _ => (None, None),
        };

        Self {
            greeting: format!("Olá, {}!", profile.name),
            headline,
            life_stage: profile.life_stage,
            pregnancy,
            milestone,
            quick_links: vec![
                Link {
                    label: "Linha do Tempo",
                    path: "/timeline",
                },
                Link {
                    label: "Diário",
                    path: "/diario",
                },
                Link {
                    label: "Agenda",
                    path: "/agenda",
                },
                Link {
                    label: "Chat IA",
                    path: "/chat",
                },
            ],
            suggestions: vec![
                Suggestion {
                    title: "Consulta Pré-natal",
                    detail: "Próxima semana",
                },
                Suggestion {
                    title: "Nutrição na Gestação",
                    detail: "5 min",
                },
            ],
            emergency: Link {
                label: "Checklist de Emergência",
                path: "/emergencia",
            },
        }
    }
}

/// What the dashboard page should do for a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardState {
    NeedsSignUp,
    NeedsOnboarding,
    Ready(Box<Dashboard>),
}

impl DashboardState {
    /// Redirect target when the dashboard cannot be shown.
    pub fn redirect(&self) -> Option<NextRoute> {
        match self {
            Self::NeedsSignUp => Some(NextRoute::SignUp),
            Self::NeedsOnboarding => Some(NextRoute::Onboarding),
            Self::Ready(_) => None,
        }
    }
}

pub async fn load_dashboard(
    auth: &dyn AuthBackend,
    store: &dyn ProfileStore,
    access_token: Option<&SecretString>,
) -> Result<DashboardState, BackendError> {
    let Some(identity) = resolve_identity(auth, access_token).await? else {
        return Ok(DashboardState::NeedsSignUp);
    };
    Ok(match store.get_profile(&identity).await? {
        Some(profile) => DashboardState::Ready(Box::new(Dashboard::for_profile(&profile))),
        None => DashboardState::NeedsOnboarding,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::backend::{MemoryBackend, SignUpOutcome};
    use crate::profile::NewProfile;

    fn profile_request(stage: LifeStage, week: Option<i32>, months: Option<i32>) -> NewProfile {
        NewProfile {
            id: "u1".into(),
            name: "Ana".into(),
            email: String::new(),
            age: 28,
            city: "SP".into(),
            life_stage: stage,
            gestation_week: week,
            infant_age_months: months,
            notifications: true,
            emotional_pace: Default::default(),
        }
    }

    fn profile(stage: LifeStage, week: Option<i32>, months: Option<i32>) -> Profile {
        Profile::from_new(&profile_request(stage, week, months), Utc::now())
    }

    #[test]
    fn pregnant_dashboard() {
        let d = Dashboard::for_profile(&profile(LifeStage::Pregnant, Some(12), None));
        assert_eq!(d.greeting, "Olá, Ana!");
        assert_eq!(d.headline, "Você está na semana 12 da sua gestação");
        assert_eq!(d.pregnancy.as_ref().unwrap().percent, 30);
        assert_eq!(d.milestone, Some(MILESTONE_MOVEMENTS));

        let early = Dashboard::for_profile(&profile(LifeStage::Pregnant, Some(8), None));
        assert_eq!(early.milestone, Some(MILESTONE_ORGANS));
        assert_eq!(early.pregnancy.unwrap().percent, 20);
    }

    #[test]
    fn progress_is_not_clamped() {
        assert_eq!(PregnancyProgress::for_week(42).percent, 105);
        assert_eq!(PregnancyProgress::for_week(20).percent, 50);
        assert_eq!(PregnancyProgress::for_week(0).percent, 0);
    }

    #[test]
    fn other_stages() {
        let d = Dashboard::for_profile(&profile(LifeStage::Infant, None, Some(5)));
        assert_eq!(d.headline, "Seu bebê tem 5 meses");
        assert_eq!(d.milestone, Some(MILESTONE_DISCOVERIES));
        assert!(d.pregnancy.is_none());

        let d = Dashboard::for_profile(&profile(LifeStage::Postpartum, None, Some(1)));
        assert_eq!(d.headline, "Bem-vinda à maternidade");
        assert!(d.milestone.is_none());

        let d = Dashboard::for_profile(&profile(LifeStage::Family, None, None));
        assert_eq!(d.headline, "Acompanhando a jornada");
        assert_eq!(d.quick_links.len(), 4);
        assert_eq!(d.emergency.path, "/emergencia");
    }

    #[test]
    fn serialized_shape_skips_absent_sections() {
        let json = serde_json::to_value(Dashboard::for_profile(&profile(
            LifeStage::TryingToConceive,
            None,
            None,
        )))
        .unwrap();
        assert_eq!(json["life_stage"], "tentante");
        assert!(json.get("pregnancy").is_none());
        assert!(json.get("milestone").is_none());
        assert_eq!(json["quick_links"][1]["path"], "/diario");
    }

    #[tokio::test]
    async fn load_follows_page_routing() {
        let backend = MemoryBackend::new();
        let state = load_dashboard(&backend, &backend, None).await.unwrap();
        assert_eq!(state, DashboardState::NeedsSignUp);
        assert_eq!(state.redirect(), Some(NextRoute::SignUp));

        let session = match backend.sign_up("ana@example.com", "pw").await.unwrap() {
            SignUpOutcome::SignedIn(s) => s,
            SignUpOutcome::ConfirmationPending { .. } => unreachable!(),
        };
        let token = &session.identity.access_token;
        let state = load_dashboard(&backend, &backend, Some(token)).await.unwrap();
        assert_eq!(state, DashboardState::NeedsOnboarding);

        let mut new = profile_request(LifeStage::Family, None, None);
        new.id = session.identity.id.clone();
        backend.create_profile(&session.identity, &new).await.unwrap();

        match load_dashboard(&backend, &backend, Some(token)).await.unwrap() {
            DashboardState::Ready(d) => assert_eq!(d.greeting, "Olá, Ana!"),
            other => panic!("expected dashboard, got {other:?}"),
        }
    }
}
