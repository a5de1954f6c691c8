//! [`CustomRoutes`] and other router utilities.

mod custom_routes;

pub use custom_routes::{CustomRoutes, RouterMapFn};
