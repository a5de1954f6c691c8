//! Passwordless login through emailed magic links.
//!
//! A login request finds or creates the user, issues a one-hour login
//! credential, stores a salted hash of it and emails a link carrying the raw
//! credential. The credential's `jti` is the id of its token record, so
//! verification compares against exactly one stored hash however many links
//! are outstanding. Verification redeems the credential exactly once: the
//! delete of the token record is the serialization point, and only the
//! caller whose delete removed the record is issued a session.

use std::time::Duration;

use jiff::Timestamp;
use tally_mail::{MailMessage, MailService};
use tally_store::model::{LoginTokenId, NewLoginToken, User, UserId};
use tally_store::StoreClient;
use url::Url;
use validator::ValidateEmail;

use super::{CredentialClaims, CredentialIssuer, CredentialPurpose, IssuedCredential, TokenHasher};
use crate::TRACING_TARGET_MAGIC_LINK as TRACING_TARGET;
use crate::handler::{Error, ErrorKind, Result};

/// Lifetime of a stored login token record.
pub const LOGIN_TOKEN_TTL: Duration = Duration::from_secs(3600);

/// Subject line of the login email.
const LOGIN_SUBJECT: &str = "Your Magic Login Link";

/// Result of a successful verification.
#[derive(Debug, Clone)]
pub struct VerifiedLogin {
    /// Newly issued session credential.
    pub session: IssuedCredential,
    /// The authenticated user.
    pub user: User,
}

/// Orchestrates magic-link issuance and redemption.
#[derive(Debug, Clone)]
pub struct MagicLinkAuthenticator {
    store: StoreClient,
    mail: MailService,
    issuer: CredentialIssuer,
    hasher: TokenHasher,
    frontend_url: Url,
}

impl MagicLinkAuthenticator {
    /// Creates an authenticator that links to `frontend_url`.
    pub fn new(
        store: StoreClient,
        mail: MailService,
        issuer: CredentialIssuer,
        hasher: TokenHasher,
        frontend_url: Url,
    ) -> Self {
        Self {
            store,
            mail,
            issuer,
            hasher,
            frontend_url,
        }
    }

    /// Sends a magic link to `email`.
    ///
    /// The outcome is the same whether or not the address was known before.
    /// If delivery fails the user and token records remain; a retry reuses
    /// the user and issues a fresh token.
    pub async fn request_login(&self, email: &str) -> Result<()> {
        let email = normalize_email(email)?;
        let user = self.store.find_or_create_user(&email).await?;

        let token_id = LoginTokenId::new();
        let claims = CredentialClaims::new(user.id, CredentialPurpose::Login, Timestamp::now())
            .with_credential_id(token_id.into());
        let credential = self.issuer.sign(claims)?;
        let token_hash = self.hasher.hash_token(&credential.token)?;

        let login_token = self
            .store
            .create_login_token(NewLoginToken {
                id: token_id,
                user_id: user.id,
                token_hash,
                ttl: LOGIN_TOKEN_TTL,
            })
            .await?;

        let link = self.login_link(&credential.token);
        let message = login_message(&email, &link)?;

        tracing::debug!(
            target: TRACING_TARGET,
            user_id = %user.id,
            token_id = %login_token.id,
            expires_at = %login_token.expires_at,
            "Login token stored, sending magic link"
        );

        self.mail.send(&message).await?;

        tracing::info!(
            target: TRACING_TARGET,
            user_id = %user.id,
            "Magic link sent"
        );

        Ok(())
    }

    /// Redeems a magic-link credential for a session credential.
    ///
    /// Every failure is reported as the same `401 Unauthorized`, whether the
    /// credential is malformed, expired, already used or simply wrong.
    pub async fn verify_login(&self, token: &str) -> Result<VerifiedLogin> {
        let claims = self
            .issuer
            .decode(token, CredentialPurpose::Login)
            .map_err(|e| invalid_credential(e.context().unwrap_or("undecodable credential")))?;
        let user_id = claims.user_id;
        let token_id = LoginTokenId::from(claims.credential_id);

        let record = self.store.find_login_token(user_id, token_id).await?;
        let matches = match &record {
            Some(record) => self.hasher.verify_token(token, &record.token_hash)?,
            None => self.hasher.verify_dummy_token(token),
        };

        let Some(record) = record.filter(|_| matches) else {
            tracing::warn!(
                target: TRACING_TARGET,
                user_id = %user_id,
                token_id = %token_id,
                "No live login token matches the credential"
            );
            return Err(invalid_credential("no matching login token"));
        };

        if !self.store.delete_login_token(user_id, record.id).await? {
            tracing::warn!(
                target: TRACING_TARGET,
                user_id = %user_id,
                token_id = %record.id,
                "Login token was redeemed concurrently"
            );
            return Err(invalid_credential("login token already consumed"));
        }

        let user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| invalid_credential("user no longer exists"))?;

        let session = self.issuer.issue(user.id, CredentialPurpose::Session)?;

        tracing::info!(
            target: TRACING_TARGET,
            user_id = %user.id,
            token_id = %record.id,
            "Magic link redeemed"
        );

        Ok(VerifiedLogin { session, user })
    }

    /// Builds `{frontend}/auth/verify?token=<credential>`.
    pub fn login_link(&self, token: &str) -> Url {
        let mut link = self.frontend_url.clone();
        if let Ok(mut segments) = link.path_segments_mut() {
            segments.pop_if_empty().extend(["auth", "verify"]);
        }
        link.query_pairs_mut().clear().append_pair("token", token);
        link
    }

    /// Returns the user behind a session credential, if they still exist.
    pub async fn resolve_session(&self, user_id: UserId) -> Result<Option<User>> {
        Ok(self.store.find_user_by_id(user_id).await?)
    }
}

/// Trims and lowercases an address and checks its syntax.
pub fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();

    if email.is_empty() {
        return Err(ErrorKind::BadRequest
            .with_message("Email is required.")
            .with_resource("email"));
    }

    if !email.validate_email() {
        return Err(ErrorKind::BadRequest
            .with_message("A valid email address is required.")
            .with_resource("email"));
    }

    Ok(email)
}

fn login_message(email: &str, link: &Url) -> Result<MailMessage> {
    MailMessage::builder()
        .with_to(email)
        .with_subject(LOGIN_SUBJECT)
        .with_html(format!(
            "Click <a href=\"{link}\">here</a> to login. This link expires in 1 hour."
        ))
        .with_text(format!(
            "Open this link to login: {link}\nThis link expires in 1 hour."
        ))
        .build()
        .map_err(|e| {
            ErrorKind::InternalServerError
                .with_context(format!("Cannot build login email: {e}"))
                .into_static()
        })
}

fn invalid_credential(reason: &str) -> Error<'static> {
    tracing::debug!(
        target: TRACING_TARGET,
        reason,
        "Login verification rejected"
    );

    ErrorKind::Unauthorized
        .with_resource("authentication")
        .with_context(reason.to_owned())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use argon2::Params;
    use tally_mail::MemoryMailer;

    use super::*;
    use crate::service::SessionKeys;

    struct Fixture {
        auth: MagicLinkAuthenticator,
        store: StoreClient,
        mailer: MemoryMailer,
        issuer: CredentialIssuer,
    }

    fn fixture() -> Fixture {
        let store = StoreClient::memory();
        let mailer = MemoryMailer::new();
        let keys = SessionKeys::from_secret("magic-link-test-secret-0123456789").unwrap();
        let issuer = CredentialIssuer::new(keys);
        let hasher = TokenHasher::with_params(Params::new(8, 1, 1, None).unwrap());

        let auth = MagicLinkAuthenticator::new(
            store.clone(),
            mailer.clone().into_service(),
            issuer.clone(),
            hasher,
            Url::parse("http://localhost:5173").unwrap(),
        );

        Fixture {
            auth,
            store,
            mailer,
            issuer,
        }
    }

    /// Extracts the credential from the last emailed link.
    fn sent_token(mailer: &MemoryMailer) -> String {
        let message = mailer.last_sent().expect("no mail sent");
        let start = message.html.find("token=").expect("no token in link") + "token=".len();
        let end = message.html[start..].find('"').expect("unterminated link") + start;
        message.html[start..end].to_owned()
    }

    #[tokio::test]
    async fn request_login_creates_user_once() -> anyhow::Result<()> {
        let fx = fixture();

        fx.auth.request_login("  Ada@Example.COM ").await?;
        fx.auth.request_login("ada@example.com").await?;

        let user = fx.store.find_user_by_email("ada@example.com").await?;
        let user = user.expect("user was not created");
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(fx.store.list_login_tokens(user.id).await?.len(), 2);

        let message = fx.mailer.last_sent().expect("no mail sent");
        assert_eq!(message.to, "ada@example.com");
        assert_eq!(message.subject, "Your Magic Login Link");
        assert!(message.html.contains("http://localhost:5173/auth/verify?token="));
        assert!(message.html.contains("This link expires in 1 hour."));
        Ok(())
    }

    #[tokio::test]
    async fn request_login_stores_only_hash() -> anyhow::Result<()> {
        let fx = fixture();
        fx.auth.request_login("ada@example.com").await?;

        let token = sent_token(&fx.mailer);
        let user = fx.store.find_user_by_email("ada@example.com").await?.unwrap();
        let records = fx.store.list_login_tokens(user.id).await?;

        assert_eq!(records.len(), 1);
        assert_ne!(records[0].token_hash, token);
        assert!(!records[0].token_hash.contains(&token));
        Ok(())
    }

    #[tokio::test]
    async fn request_login_rejects_invalid_email() {
        let fx = fixture();

        let empty = fx.auth.request_login("   ").await.unwrap_err();
        assert_eq!(empty.kind(), ErrorKind::BadRequest);

        let invalid = fx.auth.request_login("not-an-email").await.unwrap_err();
        assert_eq!(invalid.kind(), ErrorKind::BadRequest);
        assert!(fx.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn delivery_failure_is_reported_and_retry_reuses_user() -> anyhow::Result<()> {
        let fx = fixture();
        fx.mailer.fail_verify(true);

        let error = fx.auth.request_login("ada@example.com").await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::DeliveryFailed);
        let first = fx.store.find_user_by_email("ada@example.com").await?.unwrap();

        fx.mailer.fail_verify(false);
        fx.auth.request_login("ada@example.com").await?;
        let second = fx.store.find_user_by_email("ada@example.com").await?.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(fx.store.list_login_tokens(first.id).await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn verify_login_is_single_use() -> anyhow::Result<()> {
        let fx = fixture();
        fx.auth.request_login("ada@example.com").await?;
        let token = sent_token(&fx.mailer);

        let verified = fx.auth.verify_login(&token).await?;
        assert_eq!(verified.user.email, "ada@example.com");
        let claims = fx
            .issuer
            .decode(&verified.session.token, CredentialPurpose::Session)?;
        assert_eq!(claims.user_id, verified.user.id);

        let replay = fx.auth.verify_login(&token).await.unwrap_err();
        assert_eq!(replay.kind(), ErrorKind::Unauthorized);
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_redemption_succeeds_once() -> anyhow::Result<()> {
        let fx = fixture();
        fx.auth.request_login("ada@example.com").await?;
        let token: Arc<str> = sent_token(&fx.mailer).into();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let auth = fx.auth.clone();
            let token = token.clone();
            handles.push(tokio::spawn(async move { auth.verify_login(&token).await }));
        }

        let mut successes = 0;
        for handle in handles {
            if handle.await?.is_ok() {
                successes += 1;
            }
        }

        assert_eq!(successes, 1);
        Ok(())
    }

    #[tokio::test]
    async fn resent_links_stay_valid() -> anyhow::Result<()> {
        let fx = fixture();
        fx.auth.request_login("ada@example.com").await?;
        let first = sent_token(&fx.mailer);
        fx.auth.request_login("ada@example.com").await?;
        let second = sent_token(&fx.mailer);

        fx.auth.verify_login(&first).await?;
        fx.auth.verify_login(&second).await?;
        Ok(())
    }

    #[tokio::test]
    async fn verify_login_rejects_session_credential() -> anyhow::Result<()> {
        let fx = fixture();
        let user = fx.store.find_or_create_user("ada@example.com").await?;
        let session = fx.issuer.issue(user.id, CredentialPurpose::Session)?;

        let error = fx.auth.verify_login(&session.token).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Unauthorized);
        Ok(())
    }

    #[tokio::test]
    async fn verify_login_rejects_expired_credential() -> anyhow::Result<()> {
        let fx = fixture();
        let user = fx.store.find_or_create_user("ada@example.com").await?;

        let issued_at = Timestamp::now().checked_sub(Duration::from_secs(2 * 3600))?;
        let expired = fx
            .issuer
            .sign(CredentialClaims::new(user.id, CredentialPurpose::Login, issued_at))?;

        let hasher = TokenHasher::with_params(Params::new(8, 1, 1, None).unwrap());
        fx.store
            .create_login_token(NewLoginToken {
                id: LoginTokenId::from(expired.claims.credential_id),
                user_id: user.id,
                token_hash: hasher.hash_token(&expired.token)?,
                ttl: LOGIN_TOKEN_TTL,
            })
            .await?;

        let error = fx.auth.verify_login(&expired.token).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Unauthorized);
        Ok(())
    }

    #[tokio::test]
    async fn credential_names_its_token_record() -> anyhow::Result<()> {
        let fx = fixture();
        fx.auth.request_login("ada@example.com").await?;

        let claims = fx
            .issuer
            .decode(&sent_token(&fx.mailer), CredentialPurpose::Login)?;
        let records = fx.store.list_login_tokens(claims.user_id).await?;

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, LoginTokenId::from(claims.credential_id));
        Ok(())
    }

    #[tokio::test]
    async fn verify_login_compares_only_the_named_record() -> anyhow::Result<()> {
        let fx = fixture();
        fx.auth.request_login("ada@example.com").await?;
        let token = sent_token(&fx.mailer);
        let user = fx.store.find_user_by_email("ada@example.com").await?.unwrap();

        // Newer records with unreadable hashes fail if they are ever compared.
        for _ in 0..10 {
            fx.store
                .create_login_token(NewLoginToken {
                    id: LoginTokenId::new(),
                    user_id: user.id,
                    token_hash: "not-a-hash".to_owned(),
                    ttl: LOGIN_TOKEN_TTL,
                })
                .await?;
        }

        let verified = fx.auth.verify_login(&token).await?;
        assert_eq!(verified.user.id, user.id);
        assert_eq!(fx.store.list_login_tokens(user.id).await?.len(), 10);
        Ok(())
    }

    #[tokio::test]
    async fn failures_are_indistinguishable() -> anyhow::Result<()> {
        let fx = fixture();
        let user = fx.store.find_or_create_user("ada@example.com").await?;
        let unknown = fx.issuer.issue(user.id, CredentialPurpose::Login)?;

        let no_record = fx.auth.verify_login(&unknown.token).await.unwrap_err();
        let garbage = fx.auth.verify_login("garbage").await.unwrap_err();

        assert_eq!(no_record.kind(), garbage.kind());
        assert_eq!(no_record.message(), garbage.message());
        assert_eq!(no_record.resource(), garbage.resource());
        Ok(())
    }

    #[test]
    fn login_link_keeps_base_path() {
        let fx = fixture();
        let link = fx.auth.login_link("abc.def.ghi");
        assert_eq!(
            link.as_str(),
            "http://localhost:5173/auth/verify?token=abc.def.ghi"
        );

        let nested = MagicLinkAuthenticator {
            frontend_url: Url::parse("https://polls.example.com/app/").unwrap(),
            ..fx.auth.clone()
        };
        assert_eq!(
            nested.login_link("t").as_str(),
            "https://polls.example.com/app/auth/verify?token=t"
        );
    }
}
