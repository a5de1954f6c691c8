//! Utility modules for common functionality across the crate.

mod route_category;
pub mod tracing_targets;

pub use route_category::RouteCategory;

/// Maximum accepted request body size in bytes (64 KiB).
///
/// Every request body of this service is a small JSON document.
pub const DEFAULT_MAX_BODY_SIZE: usize = 64 * 1024;
