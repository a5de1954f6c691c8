//! Service configuration and the constructors that turn it into live
//! dependencies.

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};
use tally_mail::{MailConfig, MailService};
use tally_store::{StoreClient, StoreConfig};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::service::{DEFAULT_BROADCAST_CAPACITY, Result, SessionKeys, SessionKeysConfig};
use crate::Error;

/// Default values for configuration options.
mod defaults {
    /// Default address of the web frontend that magic links point to.
    pub const FRONTEND_URL: &str = "http://localhost:5173";
}

/// App [`state`] configuration.
///
/// [`state`]: crate::service::ServiceState
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "config does nothing unless you use it"]
pub struct ServiceConfig {
    /// Document store settings.
    #[cfg_attr(feature = "config", command(flatten))]
    pub store: StoreConfig,

    /// Mail delivery settings.
    #[cfg_attr(feature = "config", command(flatten))]
    pub mail: MailConfig,

    /// Credential signing settings.
    #[cfg_attr(feature = "config", command(flatten))]
    pub session_keys: SessionKeysConfig,

    /// Base URL of the frontend; magic links point to `{url}/auth/verify`.
    #[cfg_attr(
        feature = "config",
        arg(long = "frontend-url", env = "FRONTEND_URL", default_value = defaults::FRONTEND_URL)
    )]
    pub frontend_url: Url,

    /// Number of events buffered per live-update subscriber.
    #[cfg_attr(
        feature = "config",
        arg(long = "broadcast-capacity", env = "BROADCAST_CAPACITY", default_value_t = DEFAULT_BROADCAST_CAPACITY)
    )]
    pub broadcast_capacity: usize,
}

impl ServiceConfig {
    /// Creates a configuration with the given store URL and signing secret.
    ///
    /// The frontend URL starts at its default.
    pub fn new(store_url: impl Into<String>, jwt_secret: impl Into<String>) -> Result<Self> {
        let frontend_url = Url::parse(defaults::FRONTEND_URL).map_err(|err| {
            Error::config(format!("invalid frontend URL '{}'", defaults::FRONTEND_URL))
                .with_source(err)
        })?;

        Ok(Self {
            store: StoreConfig::new(store_url),
            mail: MailConfig::default(),
            session_keys: SessionKeysConfig::new(jwt_secret),
            frontend_url,
            broadcast_capacity: DEFAULT_BROADCAST_CAPACITY,
        })
    }

    /// Checks values that would otherwise fail on first use.
    pub fn validate(&self) -> Result<()> {
        self.store.backend()?;
        self.frontend_base()?;

        if self.broadcast_capacity == 0 {
            return Err(Error::config("BROADCAST_CAPACITY must be at least 1"));
        }

        Ok(())
    }

    /// Returns the frontend URL if links can be built on top of it.
    pub fn frontend_base(&self) -> Result<Url> {
        if self.frontend_url.cannot_be_a_base() {
            return Err(Error::config(format!(
                "FRONTEND_URL '{}' cannot be used as a base URL",
                self.frontend_url
            )));
        }

        Ok(self.frontend_url.clone())
    }

    /// Connects to the configured document store.
    pub async fn connect_store(&self, shutdown: CancellationToken) -> Result<StoreClient> {
        Ok(self.store.connect(shutdown).await?)
    }

    /// Builds the configured mail transport.
    pub fn mail_service(&self) -> Result<MailService> {
        Ok(self.mail.clone().into_service()?)
    }

    /// Derives the credential signing keys.
    pub fn load_session_keys(&self) -> Result<SessionKeys> {
        SessionKeys::from_config(&self.session_keys)
    }
}
