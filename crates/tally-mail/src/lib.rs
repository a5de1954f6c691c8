#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod error;
mod memory;
mod message;
mod service;

#[cfg(feature = "reqwest")]
#[cfg_attr(docsrs, doc(cfg(feature = "reqwest")))]
mod config;
#[cfg(feature = "reqwest")]
#[cfg_attr(docsrs, doc(cfg(feature = "reqwest")))]
pub mod reqwest;

#[cfg(feature = "reqwest")]
pub use config::{MailConfig, MailTransport};
pub use error::{BoxedError, Error, ErrorKind, Result};
pub use memory::MemoryMailer;
pub use message::{MailMessage, MailMessageBuilder, MailMessageError};
pub use service::MailService;

/// Tracing target for mail operations.
pub const TRACING_TARGET: &str = "tally_mail::service";

/// Core trait for mail delivery operations.
///
/// Implement this trait to create custom mail transports.
#[async_trait::async_trait]
pub trait MailProvider: Send + Sync {
    /// Checks that the transport is reachable and its credentials are usable.
    async fn verify(&self) -> Result<()>;

    /// Delivers a single message.
    async fn send(&self, message: &MailMessage) -> Result<()>;
}
