use std::env;
use std::time::Duration;

use url::Url;

use crate::error::ConfigError;

/// Default bound on any single network call.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings for the content and scoring service.
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub base_url: Url,
    pub auth_token: Option<String>,
    pub timeout: Duration,
}

impl ServiceConfig {
    /// # Errors
    ///
    /// Returns `ConfigError` if `base_url` does not parse or is not http(s).
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            auth_token: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    #[must_use]
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.auth_token = (!token.trim().is_empty()).then_some(token);
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Reads `ASSESS_BASE_URL`, `ASSESS_AUTH_TOKEN` and `ASSESS_TIMEOUT_SECS`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the base url is missing or invalid, or the timeout is not
    /// a positive integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = env::var("ASSESS_BASE_URL").map_err(|_| ConfigError::MissingBaseUrl)?;
        let mut config = Self::new(&base_url)?;
        if let Ok(token) = env::var("ASSESS_AUTH_TOKEN") {
            config = config.with_auth_token(token);
        }
        if let Ok(raw) = env::var("ASSESS_TIMEOUT_SECS") {
            config = config.with_timeout(parse_timeout(&raw)?);
        }
        Ok(config)
    }

    /// Joins path segments onto the base url, percent-encoding each one.
    #[must_use]
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

/// # Errors
///
/// Returns `ConfigError::InvalidTimeout` unless `raw` is a positive integer.
pub fn parse_timeout(raw: &str) -> Result<Duration, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidTimeout(raw.to_string())),
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidBaseUrl {
        raw: raw.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(ConfigError::UnsupportedScheme(url.scheme().to_string()));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_appends_encoded_segments() {
        let config = ServiceConfig::new("https://learn.example.com/api/").unwrap();
        let url = config.endpoint(&["activities", "intro to git", "attempts"]);
        assert_eq!(
            url.as_str(),
            "https://learn.example.com/api/activities/intro%20to%20git/attempts"
        );
    }

    #[test]
    fn rejects_non_http_schemes() {
        let err = ServiceConfig::new("ftp://example.com").unwrap_err();
        assert_eq!(err, ConfigError::UnsupportedScheme("ftp".into()));
    }

    #[test]
    fn rejects_garbage_urls() {
        assert!(matches!(
            ServiceConfig::new("not a url"),
            Err(ConfigError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn timeout_must_be_positive() {
        assert_eq!(parse_timeout("45").unwrap(), Duration::from_secs(45));
        assert!(parse_timeout("0").is_err());
        assert!(parse_timeout("soon").is_err());
    }

    #[test]
    fn blank_token_is_ignored() {
        let config = ServiceConfig::new("http://localhost:8080")
            .unwrap()
            .with_auth_token("   ");
        assert!(config.auth_token.is_none());
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }
}
