//! HTTP relay configuration.

use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};
use url::Url;

/// Default timeout for HTTP requests: 30 seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for the HTTP relay transport.
///
/// Credentials are optional here: a relay without them fails verification
/// when the first message is sent, not at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct HttpMailerConfig {
    /// Base URL of the mail relay API
    #[cfg_attr(feature = "config", arg(long = "mail-api-url", env = "MAIL_API_URL"))]
    #[serde(default)]
    pub mail_api_url: Option<Url>,

    /// API key sent as a bearer token to the relay
    #[cfg_attr(
        feature = "config",
        arg(long = "mail-api-key", env = "MAIL_API_KEY", hide_env_values = true)
    )]
    #[serde(default, skip_serializing)]
    pub mail_api_key: Option<String>,

    /// Sender address of outbound mail
    #[cfg_attr(feature = "config", arg(long = "mail-from", env = "MAIL_FROM"))]
    #[serde(default)]
    pub mail_from: Option<String>,

    /// HTTP request timeout in seconds
    #[cfg_attr(
        feature = "config",
        arg(long = "mail-http-timeout", env = "MAIL_HTTP_TIMEOUT", default_value = "30")
    )]
    #[serde(default = "default_timeout_secs")]
    pub http_timeout: u64,

    /// User-Agent header to send with requests
    #[cfg_attr(
        feature = "config",
        arg(long = "mail-user-agent", env = "MAIL_USER_AGENT")
    )]
    #[serde(default)]
    pub user_agent: Option<String>,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for HttpMailerConfig {
    fn default() -> Self {
        Self {
            mail_api_url: None,
            mail_api_key: None,
            mail_from: None,
            http_timeout: default_timeout_secs(),
            user_agent: None,
        }
    }
}

impl HttpMailerConfig {
    /// Returns the effective timeout, using default if zero.
    pub fn effective_timeout(&self) -> Duration {
        if self.http_timeout == 0 {
            Duration::from_secs(DEFAULT_TIMEOUT_SECS)
        } else {
            Duration::from_secs(self.http_timeout)
        }
    }

    /// Returns the effective user agent, using default if not set.
    pub fn effective_user_agent(&self) -> String {
        self.user_agent
            .clone()
            .unwrap_or_else(Self::default_user_agent)
    }

    /// Returns the default user agent string.
    fn default_user_agent() -> String {
        format!("tally/{}", env!("CARGO_PKG_VERSION"))
    }

    /// Returns whether URL, key and sender are all present.
    pub fn has_credentials(&self) -> bool {
        self.mail_api_url.is_some()
            && self.mail_api_key.as_deref().is_some_and(|k| !k.is_empty())
            && self.mail_from.as_deref().is_some_and(|f| !f.is_empty())
    }

    /// Set the relay URL.
    #[must_use]
    pub fn with_api_url(mut self, url: Url) -> Self {
        self.mail_api_url = Some(url);
        self
    }

    /// Set the relay API key.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.mail_api_key = Some(key.into());
        self
    }

    /// Set the sender address.
    #[must_use]
    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.mail_from = Some(from.into());
        self
    }

    /// Set the timeout in seconds.
    #[must_use]
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.http_timeout = timeout_secs;
        self
    }

    /// Set the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HttpMailerConfig::default();
        assert_eq!(config.http_timeout, 30);
        assert!(!config.has_credentials());
        assert_eq!(config.effective_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_zero_timeout_uses_default() {
        let config = HttpMailerConfig::default().with_timeout(0);
        assert_eq!(
            config.effective_timeout(),
            Duration::from_secs(DEFAULT_TIMEOUT_SECS)
        );
    }

    #[test]
    fn test_credentials() {
        let config = HttpMailerConfig::default()
            .with_api_url("https://relay.example.com".parse().unwrap())
            .with_api_key("key")
            .with_from("noreply@tally.dev");
        assert!(config.has_credentials());

        let empty_key = config.clone().with_api_key("");
        assert!(!empty_key.has_credentials());
    }

    #[test]
    fn test_user_agent() {
        let config = HttpMailerConfig::default();
        assert!(config.effective_user_agent().starts_with("tally/"));

        let custom = config.with_user_agent("custom/1.0");
        assert_eq!(custom.effective_user_agent(), "custom/1.0");
    }
}
