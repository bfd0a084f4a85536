use std::env;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::auth::Credential;

/// Immutable runtime configuration, read from the environment once at
/// startup and passed by reference everywhere. Core logic never touches the
/// environment again after this.
///
/// Variables:
///
/// | variable                  | required | meaning                                   |
/// |---------------------------|----------|-------------------------------------------|
/// | `GITHUB_USER`             | yes      | account name, used for API basic auth     |
/// | `GITHUB_TOKEN`            | yes      | access token, spliced into clone URLs     |
/// | `TARGET`                  | yes      | backup root directory (made absolute)     |
/// | `GITHUB_ORG`              | no       | organization for `discover`               |
/// | `WEBHOOK_URL`             | no       | notification endpoint; unset disables it  |
/// | `BACKUP_RETRY`            | no       | enable retry passes (default off)         |
/// | `BACKUP_RETRY_LIMIT`      | no       | max retry passes (default 3)              |
/// | `BACKUP_RETRY_DELAY_SECS` | no       | fixed wait before each pass (default 300) |
/// | `BACKUP_JOBS`             | no       | parallel syncs; 1 = sequential, 0 = CPUs  |
/// | `GITHUB_API_URL`          | no       | API base, for GitHub Enterprise and tests |
#[derive(Debug, Clone)]
pub struct Settings {
    pub user: String,
    pub credential: Credential,
    pub org: Option<String>,
    pub target: PathBuf,
    pub webhook_url: Option<String>,
    pub retry: RetryPolicy,
    pub jobs: usize,
    pub api_base: String,
}

/// Bounded fixed-delay retry for repositories that failed the main cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub enabled: bool,
    pub limit: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            limit: 3,
            delay: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        let user = require("GITHUB_USER")?;
        let token = require("GITHUB_TOKEN")?;
        let target = require("TARGET")?;
        let target = std::path::absolute(&target).map_err(|err| ConfigError::Invalid {
            name: "TARGET",
            value: format!("{} ({})", target, err),
        })?;

        let retry = RetryPolicy {
            enabled: bool_env("BACKUP_RETRY")?.unwrap_or(false),
            limit: parse_env("BACKUP_RETRY_LIMIT")?.unwrap_or(3),
            delay: Duration::from_secs(parse_env("BACKUP_RETRY_DELAY_SECS")?.unwrap_or(300)),
        };

        let jobs = match parse_env::<usize>("BACKUP_JOBS")?.unwrap_or(1) {
            0 => num_cpus::get(),
            n => n,
        };

        let api_base = optional("GITHUB_API_URL")
            .unwrap_or_else(|| "https://api.github.com".to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            user,
            credential: Credential::new(token),
            org: optional("GITHUB_ORG"),
            target,
            webhook_url: optional("WEBHOOK_URL"),
            retry,
            jobs,
            api_base,
        })
    }
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(name)),
    }
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn bool_env(name: &'static str) -> Result<Option<bool>, ConfigError> {
    let Some(raw) = optional(name) else {
        return Ok(None);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        _ => Err(ConfigError::Invalid { name, value: raw }),
    }
}

fn parse_env<T: std::str::FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match optional(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const ALL: &[&str] = &[
        "GITHUB_USER",
        "GITHUB_TOKEN",
        "TARGET",
        "GITHUB_ORG",
        "WEBHOOK_URL",
        "BACKUP_RETRY",
        "BACKUP_RETRY_LIMIT",
        "BACKUP_RETRY_DELAY_SECS",
        "BACKUP_JOBS",
        "GITHUB_API_URL",
    ];

    fn reset() {
        for name in ALL {
            unsafe { env::remove_var(name) };
        }
        set("GITHUB_USER", "octo");
        set("GITHUB_TOKEN", "t0k3n");
        set("TARGET", "/backups/mirrors");
    }

    fn set(name: &str, value: &str) {
        unsafe { env::set_var(name, value) };
    }

    #[test]
    #[serial]
    fn reads_required_values_and_defaults() {
        reset();
        let settings = Settings::from_env().unwrap();
        assert_eq!(settings.user, "octo");
        assert_eq!(settings.credential.token(), "t0k3n");
        assert_eq!(settings.target, PathBuf::from("/backups/mirrors"));
        assert_eq!(settings.org, None);
        assert_eq!(settings.webhook_url, None);
        assert_eq!(settings.retry, RetryPolicy::default());
        assert_eq!(settings.jobs, 1);
        assert_eq!(settings.api_base, "https://api.github.com");
    }

    #[test]
    #[serial]
    fn missing_token_is_a_config_error() {
        reset();
        unsafe { env::remove_var("GITHUB_TOKEN") };
        let err = Settings::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Missing("GITHUB_TOKEN")));
    }

    #[test]
    #[serial]
    fn blank_token_counts_as_missing() {
        reset();
        set("GITHUB_TOKEN", "   ");
        let err = Settings::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Missing("GITHUB_TOKEN")));
    }

    #[test]
    #[serial]
    fn relative_target_is_made_absolute() {
        reset();
        set("TARGET", "mirrors");
        let settings = Settings::from_env().unwrap();
        assert!(settings.target.is_absolute());
        assert!(settings.target.ends_with("mirrors"));
    }

    #[test]
    #[serial]
    fn parses_the_retry_policy() {
        reset();
        set("BACKUP_RETRY", "true");
        set("BACKUP_RETRY_LIMIT", "5");
        set("BACKUP_RETRY_DELAY_SECS", "60");
        let settings = Settings::from_env().unwrap();
        assert!(settings.retry.enabled);
        assert_eq!(settings.retry.limit, 5);
        assert_eq!(settings.retry.delay, Duration::from_secs(60));
    }

    #[test]
    #[serial]
    fn rejects_unparseable_retry_limit() {
        reset();
        set("BACKUP_RETRY_LIMIT", "many");
        let err = Settings::from_env().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                name: "BACKUP_RETRY_LIMIT",
                ..
            }
        ));
    }

    #[test]
    #[serial]
    fn rejects_unrecognized_retry_flag() {
        reset();
        set("BACKUP_RETRY", "maybe");
        let err = Settings::from_env().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                name: "BACKUP_RETRY",
                ..
            }
        ));
    }

    #[test]
    #[serial]
    fn zero_jobs_means_one_per_cpu() {
        reset();
        set("BACKUP_JOBS", "0");
        let settings = Settings::from_env().unwrap();
        assert!(settings.jobs >= 1);
    }

    #[test]
    #[serial]
    fn api_base_override_drops_trailing_slash() {
        reset();
        set("GITHUB_API_URL", "https://ghe.example.com/api/v3/");
        let settings = Settings::from_env().unwrap();
        assert_eq!(settings.api_base, "https://ghe.example.com/api/v3");
    }
}
