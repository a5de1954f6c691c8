//! Transport selection.

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::reqwest::{HttpMailer, HttpMailerConfig};
use crate::{MailService, MemoryMailer, Result, TRACING_TARGET};

/// Available mail transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[derive(Serialize, Deserialize, AsRefStr, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MailTransport {
    /// Post messages to an HTTP relay.
    #[default]
    Http,
    /// Keep messages in memory and log them.
    Memory,
}

/// Mail delivery configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "config does nothing unless you use it"]
pub struct MailConfig {
    /// Mail transport: `http` or `memory`
    #[cfg_attr(
        feature = "config",
        arg(long = "mail-transport", env = "MAIL_TRANSPORT", default_value = "http")
    )]
    #[serde(default)]
    pub mail_transport: MailTransport,

    /// HTTP relay settings
    #[cfg_attr(feature = "config", command(flatten))]
    #[serde(default)]
    pub http: HttpMailerConfig,
}

impl MailConfig {
    /// Builds the configured transport.
    ///
    /// Missing relay credentials are not an error here; they surface when
    /// the first message is sent.
    pub fn into_service(self) -> Result<MailService> {
        tracing::info!(
            target: TRACING_TARGET,
            transport = %self.mail_transport,
            credentials = self.http.has_credentials(),
            "Configuring mail transport"
        );

        match self.mail_transport {
            MailTransport::Http => Ok(HttpMailer::new(self.http)?.into_service()),
            MailTransport::Memory => Ok(MemoryMailer::new().into_service()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_transport_parse() {
        assert_eq!(MailTransport::from_str("http").unwrap(), MailTransport::Http);
        assert_eq!(
            MailTransport::from_str("memory").unwrap(),
            MailTransport::Memory
        );
        assert!(MailTransport::from_str("smtp").is_err());
    }

    #[test]
    fn test_default_is_http() {
        let config = MailConfig::default();
        assert_eq!(config.mail_transport, MailTransport::Http);
    }

    #[test]
    fn test_into_service_without_credentials() {
        let service = MailConfig::default().into_service().unwrap();
        assert!(!service.is_verified());
    }
}
