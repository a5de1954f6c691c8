//! Request extractors with uniform error responses.
//!
//! Drop-in replacements for the axum extractors of the same name. Their
//! rejections are converted into the server's [`Error`] so that malformed
//! requests get the same JSON error body as every other failure.
//!
//! [`Error`]: crate::handler::Error

mod json;
mod path;
mod validated_json;

pub use self::json::Json;
pub use self::path::Path;
pub use self::validated_json::ValidateJson;
