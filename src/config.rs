//! Configuration types.

use std::time::Duration;

use secrecy::SecretString;

use crate::backend::SupabaseConfig;
use crate::error::ConfigError;
use crate::onboarding::sessions::{DEFAULT_IDLE_TIMEOUT, DEFAULT_MAX_SESSIONS};

pub const DEFAULT_PORT: u16 = 8080;

/// Service configuration, read from the environment.
#[derive(Debug)]
pub struct AppConfig {
    /// HTTP listen port.
    pub port: u16,
    /// Supabase project. `None` runs against the in-memory backend.
    pub supabase: Option<SupabaseConfig>,
    /// Allowed browser origin. `None` allows any origin.
    pub cors_origin: Option<String>,
    /// Onboarding sessions idle for this long are dropped.
    pub session_idle_timeout: Duration,
    /// Cap on onboarding forms held at once.
    pub max_sessions: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            supabase: None,
            cors_origin: None,
            session_idle_timeout: DEFAULT_IDLE_TIMEOUT,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }
}

impl AppConfig {
    /// Read configuration from the process environment.
    ///
    /// - `MAYLOVE_PORT` (default 8080)
    /// - `SUPABASE_URL` + `SUPABASE_ANON_KEY` (both or neither)
    /// - `MAYLOVE_CORS_ORIGIN`
    /// - `MAYLOVE_SESSION_IDLE_MINUTES` (default 60)
    /// - `MAYLOVE_MAX_SESSIONS` (default 10000)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = match var("MAYLOVE_PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "MAYLOVE_PORT".into(),
                message: format!("expected a port number, got {raw:?}"),
            })?,
            None => DEFAULT_PORT,
        };

        let supabase = match (var("SUPABASE_URL"), var("SUPABASE_ANON_KEY")) {
            (Some(url), Some(key)) => {
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err(ConfigError::InvalidValue {
                        key: "SUPABASE_URL".into(),
                        message: "must start with http:// or https://".into(),
                    });
                }
                Some(SupabaseConfig {
                    url,
                    anon_key: SecretString::from(key),
                })
            }
            (Some(_), None) => return Err(ConfigError::MissingEnvVar("SUPABASE_ANON_KEY".into())),
            (None, Some(_)) => return Err(ConfigError::MissingEnvVar("SUPABASE_URL".into())),
            (None, None) => None,
        };

        let session_idle_timeout = match var("MAYLOVE_SESSION_IDLE_MINUTES") {
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|&minutes| minutes > 0)
                .and_then(|minutes| minutes.checked_mul(60))
                .map(Duration::from_secs)
                .ok_or_else(|| ConfigError::InvalidValue {
                    key: "MAYLOVE_SESSION_IDLE_MINUTES".into(),
                    message: format!("expected a positive number of minutes, got {raw:?}"),
                })?,
            None => DEFAULT_IDLE_TIMEOUT,
        };

        let max_sessions = match var("MAYLOVE_MAX_SESSIONS") {
            Some(raw) => raw
                .parse::<usize>()
                .ok()
                .filter(|&n| n > 0)
                .ok_or_else(|| ConfigError::InvalidValue {
                    key: "MAYLOVE_MAX_SESSIONS".into(),
                    message: format!("expected a positive number, got {raw:?}"),
                })?,
            None => DEFAULT_MAX_SESSIONS,
        };

        Ok(Self {
            port,
            supabase,
            cors_origin: var("MAYLOVE_CORS_ORIGIN"),
            session_idle_timeout,
            max_sessions,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_to_local_mode() {
        let config = load(&[]).unwrap();
        assert_eq!(config.port, 8080);
        assert!(config.supabase.is_none());
        assert!(config.cors_origin.is_none());
        assert_eq!(config.session_idle_timeout, DEFAULT_IDLE_TIMEOUT);
        assert_eq!(config.max_sessions, DEFAULT_MAX_SESSIONS);
    }

    #[test]
    fn reads_supabase_project() {
        let config = load(&[
            ("MAYLOVE_PORT", "3000"),
            ("SUPABASE_URL", "https://xyz.supabase.co"),
            ("SUPABASE_ANON_KEY", "anon"),
            ("MAYLOVE_CORS_ORIGIN", "http://localhost:3000"),
            ("MAYLOVE_SESSION_IDLE_MINUTES", "5"),
            ("MAYLOVE_MAX_SESSIONS", "200"),
        ])
        .unwrap();
        assert_eq!(config.port, 3000);
        let supabase = config.supabase.unwrap();
        assert_eq!(supabase.url, "https://xyz.supabase.co");
        assert_eq!(supabase.anon_key.expose_secret(), "anon");
        assert_eq!(config.cors_origin.as_deref(), Some("http://localhost:3000"));
        assert_eq!(config.session_idle_timeout, Duration::from_secs(300));
        assert_eq!(config.max_sessions, 200);
    }

    #[test]
    fn half_configured_supabase_is_an_error() {
        let err = load(&[("SUPABASE_URL", "https://xyz.supabase.co")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(k) if k == "SUPABASE_ANON_KEY"));

        // Blank values count as unset.
        let err = load(&[("SUPABASE_URL", " "), ("SUPABASE_ANON_KEY", "anon")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(k) if k == "SUPABASE_URL"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            load(&[("MAYLOVE_PORT", "eighty")]),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            load(&[("SUPABASE_URL", "xyz.supabase.co"), ("SUPABASE_ANON_KEY", "k")]),
            Err(ConfigError::InvalidValue { .. })
        ));

        let overflow = u64::MAX.to_string();
        for minutes in ["ten", "0", "-5", overflow.as_str()] {
            let err = load(&[("MAYLOVE_SESSION_IDLE_MINUTES", minutes)]).unwrap_err();
            assert!(
                matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "MAYLOVE_SESSION_IDLE_MINUTES"),
                "{minutes} should be rejected"
            );
        }
        assert!(matches!(
            load(&[("MAYLOVE_MAX_SESSIONS", "0")]),
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "MAYLOVE_MAX_SESSIONS"
        ));
    }
}
