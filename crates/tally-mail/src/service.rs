//! Mail service wrapper with lazy transport verification.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::OnceCell;

use crate::{MailMessage, MailProvider, Result, TRACING_TARGET};

/// Mail service wrapper with observability.
///
/// The transport is verified on first use. A successful verification is
/// shared by every clone for the rest of the process; a failed one is not
/// remembered, so the next send verifies again. Concurrent first callers
/// wait on a single verification.
#[derive(Clone)]
pub struct MailService {
    inner: Arc<dyn MailProvider>,
    verified: Arc<OnceCell<()>>,
}

impl fmt::Debug for MailService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailService")
            .field("verified", &self.is_verified())
            .finish_non_exhaustive()
    }
}

impl MailService {
    /// Create a new mail service wrapper.
    pub fn new<P>(provider: P) -> Self
    where
        P: MailProvider + 'static,
    {
        Self {
            inner: Arc::new(provider),
            verified: Arc::new(OnceCell::new()),
        }
    }

    /// Returns whether the transport has been verified.
    pub fn is_verified(&self) -> bool {
        self.verified.initialized()
    }

    /// Verifies the transport unless a previous verification succeeded.
    pub async fn ready(&self) -> Result<()> {
        self.verified
            .get_or_try_init(|| async {
                let started_at = Instant::now();
                match self.inner.verify().await {
                    Ok(()) => {
                        tracing::info!(
                            target: TRACING_TARGET,
                            elapsed_ms = started_at.elapsed().as_millis(),
                            "Mail transport verified"
                        );
                        Ok(())
                    }
                    Err(error) => {
                        tracing::error!(
                            target: TRACING_TARGET,
                            error = %error,
                            "Mail transport verification failed"
                        );
                        Err(error)
                    }
                }
            })
            .await
            .map(|_| ())
    }

    /// Delivers a message, verifying the transport first if needed.
    pub async fn send(&self, message: &MailMessage) -> Result<()> {
        self.ready().await?;

        let started_at = Instant::now();
        tracing::debug!(
            target: TRACING_TARGET,
            subject = %message.subject,
            "Sending mail"
        );

        let result = self.inner.send(message).await;
        let elapsed = started_at.elapsed();

        match &result {
            Ok(()) => {
                tracing::debug!(
                    target: TRACING_TARGET,
                    elapsed_ms = elapsed.as_millis(),
                    "Mail sent"
                );
            }
            Err(error) => {
                tracing::error!(
                    target: TRACING_TARGET,
                    error = %error,
                    elapsed_ms = elapsed.as_millis(),
                    "Mail delivery error"
                );
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ErrorKind, MemoryMailer};

    fn message() -> MailMessage {
        MailMessage::builder()
            .with_to("ada@example.com")
            .with_subject("Hi")
            .with_html("<p>Hi</p>")
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn verification_is_memoized() -> anyhow::Result<()> {
        let mailer = MemoryMailer::new();
        let service = MailService::new(mailer.clone());

        service.send(&message()).await?;
        service.send(&message()).await?;

        assert_eq!(mailer.verify_calls(), 1);
        assert_eq!(mailer.sent().len(), 2);
        assert!(service.is_verified());
        Ok(())
    }

    #[tokio::test]
    async fn failed_verification_is_retried() -> anyhow::Result<()> {
        let mailer = MemoryMailer::new();
        mailer.fail_verify(true);
        let service = MailService::new(mailer.clone());

        let error = service.send(&message()).await.unwrap_err();
        assert_eq!(error.kind, ErrorKind::Configuration);
        assert!(!service.is_verified());
        assert!(mailer.sent().is_empty());

        mailer.fail_verify(false);
        service.send(&message()).await?;
        assert_eq!(mailer.verify_calls(), 2);
        assert_eq!(mailer.sent().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn clones_share_verification() -> anyhow::Result<()> {
        let mailer = MemoryMailer::new();
        let service = MailService::new(mailer.clone());
        let clone = service.clone();

        service.ready().await?;
        clone.ready().await?;
        assert_eq!(mailer.verify_calls(), 1);
        Ok(())
    }
}
