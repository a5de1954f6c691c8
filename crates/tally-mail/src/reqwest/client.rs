//! Reqwest-based HTTP client for mail delivery.

use std::sync::Arc;

use reqwest::{Client, Response, StatusCode};
use serde::Serialize;

use super::{Error, HttpMailerConfig, TRACING_TARGET};
use crate::{MailMessage, MailProvider, MailService};

struct HttpMailerInner {
    http: Client,
    config: HttpMailerConfig,
}

/// JSON body posted to the relay.
#[derive(Debug, Serialize)]
struct RelayMessage<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
}

/// Mail transport that posts messages to an HTTP relay.
///
/// Messages are sent as JSON to `{api_url}/messages` with the API key as a
/// bearer token. Verification expects an authenticated `GET {api_url}` to
/// answer with a success status.
#[derive(Clone)]
pub struct HttpMailer {
    inner: Arc<HttpMailerInner>,
}

impl std::fmt::Debug for HttpMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpMailer")
            .field("api_url", &self.inner.config.mail_api_url)
            .field("from", &self.inner.config.mail_from)
            .finish_non_exhaustive()
    }
}

impl HttpMailer {
    /// Creates a new relay client with the given configuration.
    pub fn new(config: HttpMailerConfig) -> crate::Result<Self> {
        let timeout = config.effective_timeout();
        let user_agent = config.effective_user_agent();

        tracing::debug!(
            target: TRACING_TARGET,
            timeout_ms = timeout.as_millis(),
            "Creating mail relay client"
        );

        let http = Client::builder()
            .timeout(timeout)
            .user_agent(&user_agent)
            .build()
            .map_err(Error::from)?;

        Ok(Self {
            inner: Arc::new(HttpMailerInner { http, config }),
        })
    }

    /// Gets the client configuration.
    pub fn config(&self) -> &HttpMailerConfig {
        &self.inner.config
    }

    /// Converts this client into a [`MailService`] for use with dependency injection.
    pub fn into_service(self) -> MailService {
        MailService::new(self)
    }

    fn credentials(&self) -> crate::Result<(&url::Url, &str, &str)> {
        let config = &self.inner.config;
        let missing = |name: &'static str| {
            crate::Error::configuration()
                .with_message(format!("{name} is not set"))
                .with_context("http mail relay")
        };

        let url = config.mail_api_url.as_ref().ok_or_else(|| missing("MAIL_API_URL"))?;
        let key = config
            .mail_api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| missing("MAIL_API_KEY"))?;
        let from = config
            .mail_from
            .as_deref()
            .filter(|f| !f.is_empty())
            .ok_or_else(|| missing("MAIL_FROM"))?;

        Ok((url, key, from))
    }

    fn endpoint(base: &url::Url, path: &str) -> String {
        format!("{}/{path}", base.as_str().trim_end_matches('/'))
    }

    async fn check_status(response: Response) -> crate::Result<()> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        let error = match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                crate::Error::new(crate::ErrorKind::Authentication)
            }
            StatusCode::TOO_MANY_REQUESTS => crate::Error::new(crate::ErrorKind::RateLimited),
            s if s.is_server_error() => crate::Error::new(crate::ErrorKind::ServiceUnavailable),
            _ => crate::Error::rejected(),
        };

        Err(error
            .with_message(format!("relay responded with {status}"))
            .with_context(body))
    }
}

#[async_trait::async_trait]
impl MailProvider for HttpMailer {
    async fn verify(&self) -> crate::Result<()> {
        let (url, key, _) = self.credentials()?;

        let response = self
            .inner
            .http
            .get(url.as_str())
            .bearer_auth(key)
            .send()
            .await
            .map_err(Error::from)?;

        let status = response.status();
        Self::check_status(response).await?;

        tracing::debug!(
            target: TRACING_TARGET,
            status = %status,
            "Mail relay reachable"
        );
        Ok(())
    }

    async fn send(&self, message: &MailMessage) -> crate::Result<()> {
        let (url, key, default_from) = self.credentials()?;

        let body = RelayMessage {
            from: message.sender(default_from),
            to: &message.to,
            subject: &message.subject,
            html: &message.html,
            text: message.text.as_deref(),
        };
        let payload = serde_json::to_vec(&body).map_err(Error::from)?;

        let response = self
            .inner
            .http
            .post(Self::endpoint(url, "messages"))
            .bearer_auth(key)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await
            .map_err(Error::from)?;

        Self::check_status(response).await?;

        tracing::debug!(
            target: TRACING_TARGET,
            subject = %message.subject,
            "Message accepted by relay"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_client_creation() {
        let client = HttpMailer::new(HttpMailerConfig::default()).unwrap();
        assert!(client.config().mail_api_url.is_none());
    }

    #[test]
    fn test_endpoint_join() {
        let base: url::Url = "https://relay.example.com/v1/".parse().unwrap();
        assert_eq!(
            HttpMailer::endpoint(&base, "messages"),
            "https://relay.example.com/v1/messages"
        );
    }

    #[tokio::test]
    async fn test_verify_without_credentials() {
        let client = HttpMailer::new(HttpMailerConfig::default()).unwrap();
        let error = client.verify().await.unwrap_err();
        assert_eq!(error.kind, ErrorKind::Configuration);
        assert!(error.message.as_deref().unwrap().contains("MAIL_API_URL"));
    }

    /// Serves `status` for every request and counts the requests.
    async fn relay(status: StatusCode) -> anyhow::Result<(url::Url, Arc<AtomicUsize>)> {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let app = axum::Router::new().fallback(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                status
            }
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move { axum::serve(listener, app).await });

        Ok((format!("http://{addr}/v1").parse()?, hits))
    }

    fn relay_service(url: url::Url) -> anyhow::Result<MailService> {
        let config = HttpMailerConfig::default()
            .with_api_url(url)
            .with_api_key("test-key")
            .with_from("noreply@tally.dev");
        Ok(HttpMailer::new(config)?.into_service())
    }

    #[tokio::test]
    async fn test_verify_requires_success_status() -> anyhow::Result<()> {
        let (url, hits) = relay(StatusCode::NOT_FOUND).await?;
        let service = relay_service(url)?;

        let error = service.ready().await.unwrap_err();
        assert_eq!(error.kind, ErrorKind::Rejected);
        assert!(!service.is_verified());

        assert!(service.ready().await.is_err());
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_verify_reports_rejected_key() -> anyhow::Result<()> {
        let (url, _) = relay(StatusCode::UNAUTHORIZED).await?;
        let service = relay_service(url)?;

        let error = service.ready().await.unwrap_err();
        assert_eq!(error.kind, ErrorKind::Authentication);
        assert!(!service.is_verified());
        Ok(())
    }

    #[tokio::test]
    async fn test_successful_verify_is_remembered() -> anyhow::Result<()> {
        let (url, hits) = relay(StatusCode::OK).await?;
        let service = relay_service(url)?;

        service.ready().await?;
        service.ready().await?;
        assert!(service.is_verified());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_send_without_key() {
        let config = HttpMailerConfig::default()
            .with_api_url("https://relay.example.com".parse().unwrap())
            .with_from("noreply@tally.dev");
        let client = HttpMailer::new(config).unwrap();

        let message = MailMessage::builder()
            .with_to("ada@example.com")
            .with_subject("Hi")
            .with_html("<p>Hi</p>")
            .build()
            .unwrap();
        let error = client.send(&message).await.unwrap_err();
        assert_eq!(error.kind, ErrorKind::Configuration);
    }
}
