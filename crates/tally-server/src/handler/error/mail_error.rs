//! Mail delivery error to HTTP error conversion.

use super::http_error::{Error as HttpError, ErrorKind};

/// Tracing target for mail error conversions.
const TRACING_TARGET: &str = "tally_server::handler::mail";

impl From<tally_mail::Error> for HttpError<'static> {
    fn from(error: tally_mail::Error) -> Self {
        tracing::error!(
            target: TRACING_TARGET,
            error = %error,
            error_kind = ?error.kind,
            retryable = error.kind.is_retryable(),
            "Login link delivery failed"
        );

        ErrorKind::DeliveryFailed
            .with_resource("mail")
            .with_context(error.to_string())
            .into_static()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mail_errors_are_delivery_failures() {
        let error: HttpError = tally_mail::Error::configuration()
            .with_message("MAIL_API_KEY is not set")
            .into();

        assert_eq!(error.kind(), ErrorKind::DeliveryFailed);
        assert!(error.message().is_none());
        assert!(error.context().is_some_and(|c| c.contains("MAIL_API_KEY")));
    }
}
