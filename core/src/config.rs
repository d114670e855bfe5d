//! Session configuration.
//!
//! Loaded from the environment, from TOML, or built in code. A pre-known
//! host URL and auth token let `login` skip the matching network calls.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// URL-discovery endpoint published in the Taleo Business Edition API docs.
pub const DEFAULT_SERVICE_URL: &str = "https://tbe.taleo.net/MANAGER/dispatcher/api/v1/serviceUrl";

const DEFAULT_TIMEOUT_MS: u64 = 30_000;

#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct SessionConfig {
    pub company_code: String,
    pub username: String,
    pub password: String,
    #[serde(default = "default_service_url")]
    pub service_url: String,
    #[serde(default)]
    pub host_url: Option<String>,
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_service_url() -> String {
    DEFAULT_SERVICE_URL.to_string()
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

impl SessionConfig {
    pub fn new(
        company_code: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        service_url: impl Into<String>,
    ) -> Self {
        Self {
            company_code: company_code.into(),
            username: username.into(),
            password: password.into(),
            service_url: service_url.into(),
            host_url: None,
            auth_token: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn with_host_url(mut self, host_url: impl Into<String>) -> Self {
        self.host_url = Some(host_url.into());
        self
    }

    pub fn with_auth_token(mut self, auth_token: impl Into<String>) -> Self {
        self.auth_token = Some(auth_token.into());
        self
    }

    /// Set the per-call timeout, kept at millisecond precision. Durations
    /// beyond `u64::MAX` milliseconds saturate.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Create configuration from environment variables.
    ///
    /// Requires `TALEO_COMPANY_CODE`, `TALEO_USERNAME` and `TALEO_PASSWORD`.
    /// Optional: `TALEO_SERVICE_URL`, `TALEO_HOST_URL`, `TALEO_AUTH_TOKEN`,
    /// `TALEO_TIMEOUT_MS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |name: &'static str| lookup(name).ok_or(ConfigError::Missing(name));

        let mut config = Self::new(
            required("TALEO_COMPANY_CODE")?,
            required("TALEO_USERNAME")?,
            required("TALEO_PASSWORD")?,
            lookup("TALEO_SERVICE_URL").unwrap_or_else(default_service_url),
        );
        config.host_url = lookup("TALEO_HOST_URL").filter(|v| !v.is_empty());
        config.auth_token = lookup("TALEO_AUTH_TOKEN").filter(|v| !v.is_empty());
        if let Some(raw) = lookup("TALEO_TIMEOUT_MS") {
            config.timeout_ms = match raw.parse() {
                Ok(ms) if ms > 0 => ms,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "TALEO_TIMEOUT_MS",
                        value: raw,
                    })
                }
            };
        }
        Ok(config)
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("company_code", &self.company_code)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("service_url", &self.service_url)
            .field("host_url", &self.host_url)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn lookup_reads_required_and_defaults() {
        let config = SessionConfig::from_lookup(env(&[
            ("TALEO_COMPANY_CODE", "ACME"),
            ("TALEO_USERNAME", "admin"),
            ("TALEO_PASSWORD", "secret"),
        ]))
        .unwrap();
        assert_eq!(config.company_code, "ACME");
        assert_eq!(config.service_url, DEFAULT_SERVICE_URL);
        assert_eq!(config.host_url, None);
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn lookup_reports_missing_setting() {
        let err = SessionConfig::from_lookup(env(&[("TALEO_COMPANY_CODE", "ACME")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("TALEO_USERNAME")));
    }

    #[test]
    fn lookup_rejects_bad_timeout() {
        let err = SessionConfig::from_lookup(env(&[
            ("TALEO_COMPANY_CODE", "ACME"),
            ("TALEO_USERNAME", "admin"),
            ("TALEO_PASSWORD", "secret"),
            ("TALEO_TIMEOUT_MS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "TALEO_TIMEOUT_MS", .. }));
    }

    #[test]
    fn lookup_rejects_zero_timeout() {
        let err = SessionConfig::from_lookup(env(&[
            ("TALEO_COMPANY_CODE", "ACME"),
            ("TALEO_USERNAME", "admin"),
            ("TALEO_PASSWORD", "secret"),
            ("TALEO_TIMEOUT_MS", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "TALEO_TIMEOUT_MS", .. }));
    }

    #[test]
    fn lookup_reads_timeout_in_milliseconds() {
        let config = SessionConfig::from_lookup(env(&[
            ("TALEO_COMPANY_CODE", "ACME"),
            ("TALEO_USERNAME", "admin"),
            ("TALEO_PASSWORD", "secret"),
            ("TALEO_TIMEOUT_MS", "1500"),
        ]))
        .unwrap();
        assert_eq!(config.timeout(), Duration::from_millis(1500));
    }

    #[test]
    fn sub_second_timeout_is_kept() {
        let config = SessionConfig::new("ACME", "admin", "secret", DEFAULT_SERVICE_URL)
            .with_timeout(Duration::from_millis(500));
        assert_eq!(config.timeout(), Duration::from_millis(500));
    }

    #[test]
    fn oversized_timeout_saturates() {
        let config = SessionConfig::new("ACME", "admin", "secret", DEFAULT_SERVICE_URL).with_timeout(Duration::MAX);
        assert_eq!(config.timeout_ms, u64::MAX);
    }

    #[test]
    fn lookup_ignores_empty_optional_values() {
        let config = SessionConfig::from_lookup(env(&[
            ("TALEO_COMPANY_CODE", "ACME"),
            ("TALEO_USERNAME", "admin"),
            ("TALEO_PASSWORD", "secret"),
            ("TALEO_HOST_URL", ""),
            ("TALEO_AUTH_TOKEN", "tok"),
        ]))
        .unwrap();
        assert_eq!(config.host_url, None);
        assert_eq!(config.auth_token.as_deref(), Some("tok"));
    }

    #[test]
    fn toml_fills_defaults() {
        let config = SessionConfig::from_toml_str(
            r#"
            company_code = "ACME"
            username = "admin"
            password = "secret"
            host_url = "https://ch.tbe.taleo.net/CH07/ats/api/v1/"
            timeout_ms = 5000
            "#,
        )
        .unwrap();
        assert_eq!(config.service_url, DEFAULT_SERVICE_URL);
        assert_eq!(config.host_url.as_deref(), Some("https://ch.tbe.taleo.net/CH07/ats/api/v1/"));
        assert_eq!(config.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn toml_requires_credentials() {
        assert!(matches!(
            SessionConfig::from_toml_str(r#"company_code = "ACME""#),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn debug_redacts_secrets() {
        let config = SessionConfig::new("ACME", "admin", "hunter2", DEFAULT_SERVICE_URL).with_auth_token("tok");
        let printed = format!("{config:?}");
        assert!(!printed.contains("hunter2"));
        assert!(!printed.contains("tok\""));
    }
}
