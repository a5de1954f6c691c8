//! Bearer credential extraction and session resolution.
//!
//! [`AuthHeader`] only checks the credential itself. [`AuthState`] goes on to
//! load the user it names and is what handlers and the authentication
//! middleware use.

mod auth_header;
mod auth_state;

pub use auth_header::AuthHeader;
pub use auth_state::AuthState;
