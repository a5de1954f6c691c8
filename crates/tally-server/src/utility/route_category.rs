//! Route categorization for metrics and logging.

use axum::http::Uri;

/// Route classification for metrics grouping.
///
/// Each category represents a distinct functional area of the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteCategory {
    Authentication,
    Polls,
    Events,
    Monitoring,
    Api,
    Unknown,
}

impl RouteCategory {
    /// Categorizes a route based on its URI path.
    pub fn from_uri(uri: &Uri) -> Self {
        let path = uri.path();

        if path.starts_with("/auth/") {
            Self::Authentication
        } else if path == "/polls" || path.starts_with("/polls/") {
            Self::Polls
        } else if path == "/events" || path.starts_with("/events/") {
            Self::Events
        } else if path == "/health" {
            Self::Monitoring
        } else if path.starts_with("/api/") {
            Self::Api
        } else {
            Self::Unknown
        }
    }

    /// Returns the string representation for logging and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authentication => "auth",
            Self::Polls => "polls",
            Self::Events => "events",
            Self::Monitoring => "monitoring",
            Self::Api => "api",
            Self::Unknown => "unknown",
        }
    }
}
