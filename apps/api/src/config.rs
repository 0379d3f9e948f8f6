use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or still placeholders.
#[derive(Debug, Clone)]
pub struct Config {
    pub tavily_api_key: String,
    pub hunter_api_key: String,
    pub anthropic_api_key: String,
    /// Bearer token for the Gmail send endpoint. Obtained out-of-band.
    /// When absent only dry runs can send.
    pub gmail_access_token: Option<String>,
    pub gmail_sender: Option<String>,
    pub port: u16,
    pub rust_log: String,
    pub pipeline: PipelineSettings,
}

/// Tunables shared by the server and the CLI.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    /// Requests per second allowed against the search service.
    pub search_rate_limit: u32,
    /// Requests per second allowed against the email lookup service.
    pub lookup_rate_limit: u32,
    pub max_retries: u32,
    pub retry_delay: Duration,
    /// Minimum lookup confidence (0-100) for an email to be accepted.
    pub min_email_confidence: u8,
    pub send_delay_min: Duration,
    pub send_delay_max: Duration,
    pub recency_days: u32,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            search_rate_limit: 5,
            lookup_rate_limit: 10,
            max_retries: 3,
            retry_delay: Duration::from_secs(2),
            min_email_confidence: 50,
            send_delay_min: Duration::from_secs(5),
            send_delay_max: Duration::from_secs(15),
            recency_days: 45,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            tavily_api_key: require_key("TAVILY_API_KEY")?,
            hunter_api_key: require_key("HUNTER_API_KEY")?,
            anthropic_api_key: require_key("ANTHROPIC_API_KEY")?,
            gmail_access_token: optional_env("GMAIL_ACCESS_TOKEN"),
            gmail_sender: optional_env("GMAIL_SENDER"),
            port: env_or("PORT", 8000)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            pipeline: PipelineSettings::from_env()?,
        })
    }
}

impl PipelineSettings {
    pub fn from_env() -> Result<Self> {
        let defaults = PipelineSettings::default();

        let settings = PipelineSettings {
            search_rate_limit: env_or("SEARCH_RATE_LIMIT", defaults.search_rate_limit)?,
            lookup_rate_limit: env_or("LOOKUP_RATE_LIMIT", defaults.lookup_rate_limit)?,
            max_retries: env_or("MAX_RETRIES", defaults.max_retries)?,
            retry_delay: Duration::from_secs(env_or(
                "RETRY_DELAY_SECS",
                defaults.retry_delay.as_secs(),
            )?),
            min_email_confidence: env_or("MIN_EMAIL_CONFIDENCE", defaults.min_email_confidence)?,
            send_delay_min: Duration::from_secs(env_or(
                "SEND_DELAY_MIN_SECS",
                defaults.send_delay_min.as_secs(),
            )?),
            send_delay_max: Duration::from_secs(env_or(
                "SEND_DELAY_MAX_SECS",
                defaults.send_delay_max.as_secs(),
            )?),
            recency_days: env_or("RECENCY_DAYS", defaults.recency_days)?,
        };

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.search_rate_limit == 0 || self.lookup_rate_limit == 0 {
            bail!("Rate limits must be at least 1 request per second");
        }
        if self.max_retries == 0 {
            bail!("MAX_RETRIES must be at least 1");
        }
        if self.min_email_confidence > 100 {
            bail!("MIN_EMAIL_CONFIDENCE must be between 0 and 100");
        }
        if self.send_delay_min > self.send_delay_max {
            bail!("SEND_DELAY_MIN_SECS must not exceed SEND_DELAY_MAX_SECS");
        }
        Ok(())
    }
}

fn require_key(key: &str) -> Result<String> {
    let value = std::env::var(key)
        .with_context(|| format!("Required environment variable '{key}' is not set"))?;
    check_not_placeholder(key, &value)?;
    Ok(value)
}

/// Rejects empty values and the `your_..._here` placeholders shipped in `.env.example`.
fn check_not_placeholder(key: &str, value: &str) -> Result<()> {
    let trimmed = value.trim();
    if trimmed.is_empty() || (trimmed.starts_with("your_") && trimmed.ends_with("_here")) {
        bail!("Environment variable '{key}' is empty or still a placeholder");
    }
    Ok(())
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_key_is_rejected() {
        assert!(check_not_placeholder("TAVILY_API_KEY", "your_tavily_api_key_here").is_err());
        assert!(check_not_placeholder("TAVILY_API_KEY", "   ").is_err());
        assert!(check_not_placeholder("TAVILY_API_KEY", "tvly-abc123").is_ok());
    }

    #[test]
    fn test_default_settings_match_pipeline_constants() {
        let settings = PipelineSettings::default();
        assert_eq!(settings.min_email_confidence, 50);
        assert_eq!(settings.send_delay_min, Duration::from_secs(5));
        assert_eq!(settings.send_delay_max, Duration::from_secs(15));
        assert_eq!(settings.max_retries, 3);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_inverted_delay_bounds_fail_validation() {
        let settings = PipelineSettings {
            send_delay_min: Duration::from_secs(20),
            ..PipelineSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_confidence_above_100_fails_validation() {
        let settings = PipelineSettings {
            min_email_confidence: 120,
            ..PipelineSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_env_or_falls_back_to_default_when_unset() {
        let value: u32 = env_or("OUTREACH_TEST_SURELY_UNSET_VAR", 7).unwrap();
        assert_eq!(value, 7);
    }
}
