//! Store selection and connection configuration.

use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::{
    Error, MemoryStore, NatsClient, NatsConfig, NatsStore, Result, StoreClient,
    TRACING_TARGET_CLIENT,
};

/// Backend selected by the scheme of the store URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// `memory://`
    Memory,
    /// `nats://` or `tls://`
    Nats,
}

/// Document store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "config does nothing unless you use it"]
pub struct StoreConfig {
    /// Store location: `memory://` or a NATS URL (comma-separated for clustering)
    #[cfg_attr(feature = "config", arg(long = "store-url", env = "STORE_URL"))]
    pub store_url: String,

    /// NATS authentication token
    #[cfg_attr(feature = "config", arg(long = "nats-token", env = "NATS_TOKEN"))]
    pub nats_token: Option<String>,

    /// NATS client connection name
    #[cfg_attr(
        feature = "config",
        arg(long = "nats-client-name", env = "NATS_CLIENT_NAME")
    )]
    pub nats_client_name: Option<String>,

    /// NATS connection timeout in seconds
    #[cfg_attr(
        feature = "config",
        arg(long = "nats-connect-timeout", env = "NATS_CONNECT_TIMEOUT_SECS")
    )]
    pub nats_connect_timeout: Option<u64>,

    /// Interval in seconds between sweeps of expired login tokens
    #[cfg_attr(
        feature = "config",
        arg(long = "store-sweep-interval", env = "STORE_SWEEP_INTERVAL", default_value = "60")
    )]
    pub store_sweep_interval: u64,
}

impl StoreConfig {
    /// Creates a configuration for the given store URL.
    pub fn new(store_url: impl Into<String>) -> Self {
        Self {
            store_url: store_url.into(),
            nats_token: None,
            nats_client_name: None,
            nats_connect_timeout: None,
            store_sweep_interval: 60,
        }
    }

    /// Returns the sweep interval as a Duration.
    #[inline]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.store_sweep_interval.max(1))
    }

    /// Resolves the backend from the URL scheme.
    pub fn backend(&self) -> Result<StoreBackend> {
        let first = self
            .store_url
            .split(',')
            .map(str::trim)
            .find(|s| !s.is_empty())
            .ok_or_else(|| Error::invalid_config("STORE_URL must not be empty"))?;

        let url = Url::parse(first)
            .map_err(|e| Error::invalid_config(format!("invalid store URL '{first}': {e}")))?;

        match url.scheme() {
            "memory" => Ok(StoreBackend::Memory),
            "nats" | "tls" => Ok(StoreBackend::Nats),
            scheme => Err(Error::invalid_config(format!(
                "unsupported store scheme '{scheme}', expected memory, nats or tls"
            ))),
        }
    }

    /// Builds the NATS client configuration.
    pub fn nats_config(&self) -> NatsConfig {
        let mut config = NatsConfig::new(self.store_url.clone());
        config.nats_token = self.nats_token.clone();
        config.nats_client_name = self.nats_client_name.clone();
        config.nats_connect_timeout = self.nats_connect_timeout;
        config
    }

    /// Connects to the configured backend.
    ///
    /// Background tasks owned by the store stop when `shutdown` is cancelled.
    pub async fn connect(&self, shutdown: CancellationToken) -> Result<StoreClient> {
        match self.backend()? {
            StoreBackend::Memory => {
                let store = MemoryStore::new();
                store.spawn_sweeper(self.sweep_interval(), shutdown);
                tracing::info!(
                    target: TRACING_TARGET_CLIENT,
                    "Using in-memory document store"
                );
                Ok(StoreClient::new(store))
            }
            StoreBackend::Nats => {
                let client = NatsClient::connect(self.nats_config()).await?;
                let store = NatsStore::new(client).await?;
                Ok(StoreClient::new(store))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DocumentStore;

    #[test]
    fn test_backend_from_scheme() {
        assert_eq!(
            StoreConfig::new("memory://").backend().unwrap(),
            StoreBackend::Memory
        );
        assert_eq!(
            StoreConfig::new("nats://localhost:4222").backend().unwrap(),
            StoreBackend::Nats
        );
        assert_eq!(
            StoreConfig::new("tls://a:4222, tls://b:4222")
                .backend()
                .unwrap(),
            StoreBackend::Nats
        );
    }

    #[test]
    fn test_backend_rejects_unknown() {
        assert!(StoreConfig::new("").backend().is_err());
        assert!(StoreConfig::new("postgres://localhost").backend().is_err());
        assert!(StoreConfig::new("not a url").backend().is_err());
    }

    #[test]
    fn test_nats_config_carries_options() {
        let mut config = StoreConfig::new("nats://localhost:4222");
        config.nats_token = Some("secret".to_owned());
        config.nats_connect_timeout = Some(3);

        let nats = config.nats_config();
        assert_eq!(nats.nats_token.as_deref(), Some("secret"));
        assert_eq!(nats.connect_timeout(), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_connect_memory() -> anyhow::Result<()> {
        let shutdown = CancellationToken::new();
        let store = StoreConfig::new("memory://").connect(shutdown.clone()).await?;
        assert_eq!(store.backend_name(), "memory");
        shutdown.cancel();
        Ok(())
    }
}
