//! Document store error to HTTP error conversion.
//!
//! Store failures are internal faults for the caller. The only exception is
//! a vote that addresses an option the poll does not have.

use super::http_error::{Error as HttpError, ErrorKind};

/// Tracing target for store error conversions.
const TRACING_TARGET: &str = "tally_server::handler::store";

impl From<tally_store::Error> for HttpError<'static> {
    fn from(error: tally_store::Error) -> Self {
        if let tally_store::Error::OptionOutOfRange { index, len } = error {
            return ErrorKind::BadRequest
                .with_message("Invalid option index.")
                .with_resource("poll")
                .with_context(format!("index {index} of {len} options"));
        }

        if error.is_transient() {
            tracing::warn!(
                target: TRACING_TARGET,
                error = %error,
                "Transient store failure"
            );
        } else {
            tracing::error!(
                target: TRACING_TARGET,
                error = %error,
                "Store operation failed"
            );
        }

        ErrorKind::InternalServerError
            .with_context(error.to_string())
            .into_static()
    }
}
