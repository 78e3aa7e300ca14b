//! Environment-driven configuration

use crate::auth::{CredentialsError, StaticCredentials};
use crate::gaps::{GapThresholds, DEFAULT_MIN_WORDS};
use crate::llm::LlmConfig;
use crate::tutor::{TutorSettings, DEFAULT_LLM_TIMEOUT};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(86_400);
/// Ten years; longer TTLs push the purge cutoff out of the date range.
pub const MAX_SESSION_TTL: Duration = Duration::from_secs(315_360_000);

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{name} must be {expected}, got {value:?}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
    #[error("TUTOR_USERS is invalid: {0}")]
    Users(#[from] CredentialsError),
}

#[derive(Debug, Clone)]
pub struct TutorConfig {
    pub port: u16,
    /// Raw `user:pass,...` table; parsed by [`TutorConfig::credentials`]
    pub users: String,
    pub min_words: usize,
    /// `None` keeps sessions in memory
    pub session_db: Option<PathBuf>,
    /// Zero disables purging
    pub session_ttl: Duration,
    /// Zero disables the deadline
    pub llm_timeout: Duration,
    pub llm: LlmConfig,
}

impl TutorConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = parse_or(&lookup, "TUTOR_PORT", "a port number", DEFAULT_PORT)?;
        let min_words = parse_or(
            &lookup,
            "TUTOR_MIN_WORDS",
            "a non-negative integer",
            DEFAULT_MIN_WORDS,
        )?;
        let ttl_secs = parse_or(
            &lookup,
            "TUTOR_SESSION_TTL_SECS",
            "a number of seconds",
            DEFAULT_SESSION_TTL.as_secs(),
        )?;
        if ttl_secs > MAX_SESSION_TTL.as_secs() {
            return Err(ConfigError::Invalid {
                name: "TUTOR_SESSION_TTL_SECS",
                expected: "at most 315360000 seconds",
                value: ttl_secs.to_string(),
            });
        }
        let timeout_secs = parse_or(
            &lookup,
            "TUTOR_LLM_TIMEOUT_SECS",
            "a number of seconds",
            DEFAULT_LLM_TIMEOUT.as_secs(),
        )?;

        let users = lookup("TUTOR_USERS").unwrap_or_default();
        // Surface malformed tables at startup rather than on first request.
        StaticCredentials::parse(&users)?;

        Ok(Self {
            port,
            users,
            min_words,
            session_db: lookup("TUTOR_SESSION_DB")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            session_ttl: Duration::from_secs(ttl_secs),
            llm_timeout: Duration::from_secs(timeout_secs),
            llm: LlmConfig::from_lookup(&lookup),
        })
    }

    pub fn credentials(&self) -> Result<StaticCredentials, CredentialsError> {
        StaticCredentials::parse(&self.users)
    }

    pub fn tutor_settings(&self) -> TutorSettings {
        TutorSettings {
            thresholds: GapThresholds::new(self.min_words),
            llm_timeout: (!self.llm_timeout.is_zero()).then_some(self.llm_timeout),
            ..TutorSettings::default()
        }
    }
}

fn parse_or<F, T>(
    lookup: &F,
    name: &'static str,
    expected: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            expected,
            value: raw,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::CredentialVerifier;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<TutorConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        TutorConfig::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.port, 8000);
        assert_eq!(cfg.min_words, 10);
        assert!(cfg.session_db.is_none());
        assert_eq!(cfg.session_ttl, Duration::from_secs(86_400));
        assert_eq!(cfg.llm.model_id(), "gpt-4");
        assert!(cfg.credentials().unwrap().is_empty());

        let settings = cfg.tutor_settings();
        assert_eq!(settings.thresholds.min_words, 10);
        assert_eq!(settings.llm_timeout, Some(Duration::from_secs(60)));
        assert_eq!(settings.max_tokens, 600);
    }

    #[test]
    fn test_overrides() {
        let cfg = config(&[
            ("TUTOR_PORT", "9090"),
            ("TUTOR_MIN_WORDS", "5"),
            ("TUTOR_SESSION_DB", "/tmp/sessions.db"),
            ("TUTOR_LLM_TIMEOUT_SECS", "0"),
            ("TUTOR_USERS", "alice:pw"),
            ("TUTOR_MODEL", "gpt-4o"),
        ])
        .unwrap();
        assert_eq!(cfg.port, 9090);
        assert_eq!(cfg.session_db, Some(PathBuf::from("/tmp/sessions.db")));
        assert_eq!(cfg.tutor_settings().thresholds.min_words, 5);
        assert_eq!(cfg.tutor_settings().llm_timeout, None);
        assert!(cfg.credentials().unwrap().verify("alice", "pw"));
        assert_eq!(cfg.llm.model_id(), "gpt-4o");
    }

    #[test]
    fn test_longest_session_ttl_is_accepted() {
        let cfg = config(&[("TUTOR_SESSION_TTL_SECS", "315360000")]).unwrap();
        assert_eq!(cfg.session_ttl, MAX_SESSION_TTL);
        assert!(chrono::Duration::from_std(cfg.session_ttl).is_ok());
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            config(&[("TUTOR_PORT", "eighty")]),
            Err(ConfigError::Invalid { name: "TUTOR_PORT", .. })
        ));
        assert!(matches!(
            config(&[("TUTOR_SESSION_TTL_SECS", "10000000000000")]),
            Err(ConfigError::Invalid { name: "TUTOR_SESSION_TTL_SECS", .. })
        ));
        assert!(matches!(
            config(&[("TUTOR_USERS", "nocolon")]),
            Err(ConfigError::Users(_))
        ));
    }
}
