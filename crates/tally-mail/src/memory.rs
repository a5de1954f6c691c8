//! In-memory mail transport.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::{Error, MailMessage, MailProvider, MailService, Result, TRACING_TARGET};

/// Mail transport that keeps messages in memory instead of sending them.
///
/// Cheaply cloneable; clones share the outbox. Useful in tests and in
/// development, where message bodies (and the credentials they may carry)
/// are only logged at `debug` level.
#[derive(Debug, Clone, Default)]
pub struct MemoryMailer {
    inner: Arc<MemoryMailerInner>,
}

#[derive(Debug, Default)]
struct MemoryMailerInner {
    outbox: Mutex<Vec<MailMessage>>,
    verify_calls: AtomicUsize,
    fail_verify: AtomicBool,
    fail_send: AtomicBool,
}

impl MemoryMailer {
    /// Creates an empty mailer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent verifications fail (or succeed again).
    pub fn fail_verify(&self, fail: bool) {
        self.inner.fail_verify.store(fail, Ordering::SeqCst);
    }

    /// Makes subsequent sends fail (or succeed again).
    pub fn fail_send(&self, fail: bool) {
        self.inner.fail_send.store(fail, Ordering::SeqCst);
    }

    /// Returns a copy of every message sent so far.
    pub fn sent(&self) -> Vec<MailMessage> {
        self.outbox().clone()
    }

    /// Returns the most recently sent message.
    pub fn last_sent(&self) -> Option<MailMessage> {
        self.outbox().last().cloned()
    }

    /// Returns how many times the transport was verified.
    pub fn verify_calls(&self) -> usize {
        self.inner.verify_calls.load(Ordering::SeqCst)
    }

    /// Converts this mailer into a [`MailService`].
    pub fn into_service(self) -> MailService {
        MailService::new(self)
    }

    fn outbox(&self) -> std::sync::MutexGuard<'_, Vec<MailMessage>> {
        // A panic while holding the lock cannot leave the Vec half-written.
        self.inner
            .outbox
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait::async_trait]
impl MailProvider for MemoryMailer {
    async fn verify(&self) -> Result<()> {
        self.inner.verify_calls.fetch_add(1, Ordering::SeqCst);
        if self.inner.fail_verify.load(Ordering::SeqCst) {
            return Err(Error::configuration().with_message("memory transport set to fail"));
        }
        Ok(())
    }

    async fn send(&self, message: &MailMessage) -> Result<()> {
        if self.inner.fail_send.load(Ordering::SeqCst) {
            return Err(Error::rejected().with_message("memory transport set to fail"));
        }

        tracing::info!(
            target: TRACING_TARGET,
            to = %message.to,
            subject = %message.subject,
            "Captured outbound mail"
        );
        tracing::debug!(
            target: TRACING_TARGET,
            body = message.text.as_deref().unwrap_or(&message.html),
            "Captured outbound mail body"
        );
        self.outbox().push(message.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use tracing::level_filters::LevelFilter;

    use super::*;

    /// Collects formatted log output in memory.
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn message() -> MailMessage {
        MailMessage::builder()
            .with_to("ada@example.com")
            .with_subject("Your Magic Login Link")
            .with_html("<a href=\"https://polls.example.com/auth/verify?token=secret-credential\">here</a>")
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn body_is_not_logged_at_info() -> anyhow::Result<()> {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(LevelFilter::INFO)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let mailer = MemoryMailer::new();
        mailer.send(&message()).await?;

        let output = String::from_utf8(logs.0.lock().unwrap().clone())?;
        assert!(output.contains("Captured outbound mail"));
        assert!(!output.contains("secret-credential"));
        assert_eq!(mailer.sent().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn failing_send_keeps_outbox_empty() {
        let mailer = MemoryMailer::new();
        mailer.fail_send(true);

        let error = mailer.send(&message()).await.unwrap_err();
        assert_eq!(error.kind, crate::ErrorKind::Rejected);
        assert!(mailer.last_sent().is_none());
    }
}
