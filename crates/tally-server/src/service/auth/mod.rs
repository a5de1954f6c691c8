//! Credential signing, login token hashing and magic-link orchestration.

mod credential_issuer;
mod magic_link;
mod session_keys;
mod token_hasher;

pub use credential_issuer::{
    CredentialClaims, CredentialIssuer, CredentialPurpose, IssuedCredential,
};
pub use magic_link::{LOGIN_TOKEN_TTL, MagicLinkAuthenticator, VerifiedLogin, normalize_email};
pub use session_keys::{SessionKeys, SessionKeysConfig};
pub use token_hasher::TokenHasher;
