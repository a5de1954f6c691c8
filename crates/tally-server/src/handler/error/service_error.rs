//! Service wiring error to HTTP error conversion.

use super::http_error::{Error as HttpError, ErrorKind};

/// Tracing target for service error conversions.
const TRACING_TARGET: &str = "tally_server::handler::service";

impl From<crate::Error> for HttpError<'static> {
    fn from(error: crate::Error) -> Self {
        tracing::error!(
            target: TRACING_TARGET,
            error = %error,
            error_kind = %error.kind(),
            "Service operation failed"
        );

        ErrorKind::InternalServerError
            .with_context(error.to_string())
            .into_static()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_errors_are_internal() {
        let error: HttpError = crate::Error::auth("signing failed").into();
        assert_eq!(error.kind(), ErrorKind::InternalServerError);
        assert!(error.context().is_some_and(|c| c.contains("signing failed")));
    }
}
