//! Extension points for the API router.

use aide::axum::ApiRouter;

use crate::service::ServiceState;

/// Transforms an [`ApiRouter`] before or after the router's own layers.
pub type RouterMapFn = fn(ApiRouter<ServiceState>) -> ApiRouter<ServiceState>;

/// Additional routes and hooks merged into the router built by [`routes`].
///
/// Private routes sit behind the same bearer check as the built-in
/// poll management routes; public routes are mounted as they are.
///
/// ```rust
/// use tally_server::handler::CustomRoutes;
///
/// let custom = CustomRoutes::new();
/// assert!(custom.is_empty());
/// ```
///
/// [`routes`]: crate::handler::routes
#[derive(Default, Clone)]
pub struct CustomRoutes {
    /// Extra routes that require a session credential.
    pub private_routes: Option<ApiRouter<ServiceState>>,
    /// Extra routes open to everyone.
    pub public_routes: Option<ApiRouter<ServiceState>>,
    /// Applied to all private routes before the authentication layer.
    pub private_before_middleware: Option<RouterMapFn>,
    /// Applied to all private routes after the authentication layer.
    pub private_after_middleware: Option<RouterMapFn>,
    /// Applied to all public routes.
    pub public_middleware: Option<RouterMapFn>,
    /// Leaves out the magic-link login routes.
    pub disable_authentication: bool,
}

impl CustomRoutes {
    /// Creates an empty set of custom routes.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds routes that require a session credential.
    pub fn add_private_routes(mut self, routes: ApiRouter<ServiceState>) -> Self {
        self.private_routes = match self.private_routes {
            Some(existing) => Some(existing.merge(routes)),
            None => Some(routes),
        };
        self
    }

    /// Adds routes that are open to everyone.
    pub fn add_public_routes(mut self, routes: ApiRouter<ServiceState>) -> Self {
        self.public_routes = match self.public_routes {
            Some(existing) => Some(existing.merge(routes)),
            None => Some(routes),
        };
        self
    }

    /// Leaves out `/auth/login` and `/auth/verify` when `disable` is set.
    ///
    /// `/auth/me` stays mounted so credentials issued elsewhere keep working.
    pub fn with_disable_authentication(mut self, disable: bool) -> Self {
        self.disable_authentication = disable;
        self
    }

    pub fn with_private_before_middleware(mut self, f: RouterMapFn) -> Self {
        self.private_before_middleware = Some(f);
        self
    }

    pub fn with_private_after_middleware(mut self, f: RouterMapFn) -> Self {
        self.private_after_middleware = Some(f);
        self
    }

    pub fn with_public_middleware(mut self, f: RouterMapFn) -> Self {
        self.public_middleware = Some(f);
        self
    }

    /// Returns true if no extra routes are configured.
    pub fn is_empty(&self) -> bool {
        self.private_routes.is_none() && self.public_routes.is_none()
    }

    pub(crate) fn take_private_routes(&mut self) -> Option<ApiRouter<ServiceState>> {
        self.private_routes.take()
    }

    pub(crate) fn take_public_routes(&mut self) -> Option<ApiRouter<ServiceState>> {
        self.public_routes.take()
    }

    pub(crate) fn map_private_before_middleware(
        &self,
        routes: ApiRouter<ServiceState>,
    ) -> ApiRouter<ServiceState> {
        apply(self.private_before_middleware, routes)
    }

    pub(crate) fn map_private_after_middleware(
        &self,
        routes: ApiRouter<ServiceState>,
    ) -> ApiRouter<ServiceState> {
        apply(self.private_after_middleware, routes)
    }

    pub(crate) fn map_public_middleware(
        &self,
        routes: ApiRouter<ServiceState>,
    ) -> ApiRouter<ServiceState> {
        apply(self.public_middleware, routes)
    }
}

#[inline]
fn apply(f: Option<RouterMapFn>, routes: ApiRouter<ServiceState>) -> ApiRouter<ServiceState> {
    match f {
        Some(f) => f(routes),
        None => routes,
    }
}
