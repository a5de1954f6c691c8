//! Outbound mail message.

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// A single email with an HTML body and a plain-text alternative.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[builder(
    name = "MailMessageBuilder",
    pattern = "owned",
    setter(into, strip_option, prefix = "with"),
    build_fn(private, name = "build_inner", error = "MailMessageError")
)]
pub struct MailMessage {
    /// Sender address; the transport default is used when absent.
    #[builder(default)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Recipient address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// HTML body.
    pub html: String,
    /// Plain-text body.
    #[builder(default)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Error type for MailMessage builder.
pub type MailMessageError = derive_builder::UninitializedFieldError;

impl MailMessageBuilder {
    /// Build the message.
    pub fn build(self) -> Result<MailMessage, MailMessageError> {
        self.build_inner()
    }
}

impl MailMessage {
    /// Create a builder for this message.
    pub fn builder() -> MailMessageBuilder {
        MailMessageBuilder::default()
    }

    /// Returns the sender, falling back to `default_from`.
    pub fn sender<'a>(&'a self, default_from: &'a str) -> &'a str {
        self.from.as_deref().unwrap_or(default_from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let message = MailMessage::builder()
            .with_to("ada@example.com")
            .with_subject("Hello")
            .with_html("<p>Hello</p>")
            .with_text("Hello")
            .build()
            .unwrap();

        assert_eq!(message.to, "ada@example.com");
        assert_eq!(message.text.as_deref(), Some("Hello"));
        assert_eq!(message.sender("noreply@tally.dev"), "noreply@tally.dev");
    }

    #[test]
    fn test_builder_requires_recipient() {
        let result = MailMessage::builder()
            .with_subject("Hello")
            .with_html("<p>Hello</p>")
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_explicit_sender() {
        let message = MailMessage::builder()
            .with_from("polls@tally.dev")
            .with_to("ada@example.com")
            .with_subject("Hello")
            .with_html("<p>Hello</p>")
            .build()
            .unwrap();
        assert_eq!(message.sender("noreply@tally.dev"), "polls@tally.dev");
    }
}
