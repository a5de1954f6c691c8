//! Reqwest-based HTTP relay transport.
//!
//! This module provides a reqwest-based implementation of the
//! [`MailProvider`](crate::MailProvider) trait that posts messages to a
//! transactional mail relay.
//!
//! # Example
//!
//! ```rust,ignore
//! use tally_mail::reqwest::{HttpMailer, HttpMailerConfig};
//!
//! let config = HttpMailerConfig::default()
//!     .with_api_url("https://relay.example.com/v1".parse()?)
//!     .with_api_key("key")
//!     .with_from("noreply@tally.dev");
//! let service = HttpMailer::new(config)?.into_service();
//! ```

mod client;
mod config;
mod error;

pub use client::HttpMailer;
pub use config::HttpMailerConfig;
pub use error::{Error, Result};

/// Tracing target for reqwest client operations.
pub const TRACING_TARGET: &str = "tally_mail::reqwest";
