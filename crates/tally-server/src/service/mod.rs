//! Application state and dependency injection.

mod auth;
mod broadcast;
mod config;
mod polls;

use tally_mail::MailService;
use tally_store::StoreClient;
use tokio_util::sync::CancellationToken;

pub use crate::service::auth::{
    CredentialClaims, CredentialIssuer, CredentialPurpose, IssuedCredential, LOGIN_TOKEN_TTL,
    MagicLinkAuthenticator, SessionKeys, SessionKeysConfig, TokenHasher, VerifiedLogin,
    normalize_email,
};
pub use crate::service::broadcast::{DEFAULT_BROADCAST_CAPACITY, EventBroadcaster, PollEvent};
pub use crate::service::config::ServiceConfig;
pub use crate::service::polls::{MIN_POLL_OPTIONS, PollEngine};
// Re-export error types from crate root for convenience
pub use crate::{Error, Result};

/// Application state.
///
/// Used for the [`State`] extraction (dependency injection).
///
/// [`State`]: axum::extract::State
#[must_use = "state does nothing unless you use it"]
#[derive(Clone)]
pub struct ServiceState {
    // External services:
    pub store: StoreClient,
    pub mail: MailService,

    // Internal services:
    pub session_keys: SessionKeys,
    pub credential_issuer: CredentialIssuer,
    pub token_hasher: TokenHasher,
    pub magic_link: MagicLinkAuthenticator,
    pub poll_engine: PollEngine,
    pub broadcaster: EventBroadcaster,
}

impl ServiceState {
    /// Initializes application state from configuration.
    ///
    /// Connects to the document store and loads the signing keys. Background
    /// tasks owned by the store stop when `shutdown` is cancelled.
    pub async fn from_config(
        service_config: &ServiceConfig,
        shutdown: CancellationToken,
    ) -> Result<Self> {
        service_config.validate()?;

        let store = service_config.connect_store(shutdown).await?;
        let mail = service_config.mail_service()?;
        let session_keys = service_config.load_session_keys()?;
        let broadcaster = EventBroadcaster::new(service_config.broadcast_capacity);

        Ok(Self::new(
            store,
            mail,
            session_keys,
            TokenHasher::new(),
            broadcaster,
            service_config.frontend_base()?,
        ))
    }

    /// Wires the internal services on top of already constructed clients.
    pub fn new(
        store: StoreClient,
        mail: MailService,
        session_keys: SessionKeys,
        token_hasher: TokenHasher,
        broadcaster: EventBroadcaster,
        frontend_url: url::Url,
    ) -> Self {
        let credential_issuer = CredentialIssuer::new(session_keys.clone());
        let magic_link = MagicLinkAuthenticator::new(
            store.clone(),
            mail.clone(),
            credential_issuer.clone(),
            token_hasher.clone(),
            frontend_url,
        );
        let poll_engine = PollEngine::new(store.clone(), broadcaster.clone());

        Self {
            store,
            mail,
            session_keys,
            credential_issuer,
            token_hasher,
            magic_link,
            poll_engine,
            broadcaster,
        }
    }
}

macro_rules! impl_di {
    ($($f:ident: $t:ty),+) => {$(
        impl axum::extract::FromRef<ServiceState> for $t {
            fn from_ref(state: &ServiceState) -> Self {
                state.$f.clone()
            }
        }
    )+};
}

// External services:
impl_di!(store: StoreClient);
impl_di!(mail: MailService);

// Internal services:
impl_di!(session_keys: SessionKeys);
impl_di!(credential_issuer: CredentialIssuer);
impl_di!(token_hasher: TokenHasher);
impl_di!(magic_link: MagicLinkAuthenticator);
impl_di!(poll_engine: PollEngine);
impl_di!(broadcaster: EventBroadcaster);
