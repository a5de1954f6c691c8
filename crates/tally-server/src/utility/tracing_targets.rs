//! Centralized tracing target constants for structured logging.
//!
//! This module defines all tracing target strings used throughout the crate,
//! providing a single source of truth for log categorization and filtering.
//! Using consistent targets enables fine-grained control over log output
//! via tracing subscriber filters.

/// Bearer credential extraction and session resolution.
pub const TRACING_TARGET_AUTHENTICATION: &str = "tally_server::authentication";

/// Credential issuing and decoding.
pub const TRACING_TARGET_CREDENTIALS: &str = "tally_server::credentials";

/// Magic-link issuance and redemption.
pub const TRACING_TARGET_MAGIC_LINK: &str = "tally_server::magic_link";

/// Login token hashing and verification.
pub const TRACING_TARGET_TOKEN_HASHER: &str = "tally_server::token_hasher";

/// Session key management.
pub const TRACING_TARGET_SESSION_KEYS: &str = "tally_server::session_keys";

/// Poll creation, voting and deletion.
pub const TRACING_TARGET_POLLS: &str = "tally_server::polls";

/// Event fan-out to connected clients.
pub const TRACING_TARGET_BROADCAST: &str = "tally_server::broadcast";

/// Request metrics and performance monitoring.
pub const TRACING_TARGET_METRICS: &str = "tally_server::metrics";

/// Error recovery including middleware errors and request failures.
pub const TRACING_TARGET_RECOVERY_ERROR: &str = "tally_server::recovery::error";

/// Panic recovery including handler panics and service failures.
pub const TRACING_TARGET_RECOVERY_PANIC: &str = "tally_server::recovery::panic";
