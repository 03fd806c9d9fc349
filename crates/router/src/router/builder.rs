use crate::config::RouterConfig;
use crate::error::PatternError;
use crate::handler::RequestHandler;
use crate::middleware::{Middleware, SharedMiddleware};
use crate::pattern::PathPattern;
use crate::report::ErrorReporter;
use crate::router::scope::ScopeStack;
use crate::router::{Route, Router};
use crate::view::ResponseConfig;
use http::Method;
use std::sync::Arc;
use tracing::debug;

/// Collects routes, groups and global middleware, then freezes them into a [`Router`].
pub struct RouterBuilder<T> {
    routes: Vec<Route<T>>,
    middlewares: Vec<SharedMiddleware>,
    scope: ScopeStack,
    reporter: ErrorReporter,
    response_config: ResponseConfig,
    debug: bool,
}

impl<T> std::fmt::Debug for RouterBuilder<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterBuilder")
            .field("routes", &self.routes)
            .field("middlewares", &self.middlewares.len())
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

macro_rules! method_route {
    ($name:ident, $method:ident) => {
        #[doc = concat!("Registers a `", stringify!($method), "` route in the current scope.")]
        pub fn $name<H>(&mut self, path: &str, handler: H) -> Result<RouteHandle<'_, T>, PatternError>
        where
            H: RequestHandler<T> + 'static,
        {
            self.add_route(Method::$method, path, handler, [])
        }
    };
}

impl<T: Send + 'static> RouterBuilder<T> {
    pub(crate) fn new(config: &RouterConfig) -> Self {
        Self {
            routes: Vec::new(),
            middlewares: Vec::new(),
            scope: ScopeStack::new(&config.base_path),
            reporter: config.reporter(),
            response_config: config.response_config(),
            debug: config.debug,
        }
    }

    /// Replaces the reporter faults are sent to.
    pub fn with_reporter(mut self, reporter: ErrorReporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Appends a route to the table.
    ///
    /// The resolved template is the current group prefix joined with `path`, and the route's
    /// chain is the current group middleware followed by `middlewares`. Both are frozen here:
    /// nothing registered later changes them, except [`RouteHandle::with`] on the returned
    /// handle.
    ///
    /// # Errors
    ///
    /// Returns a [`PatternError`] if the resolved template does not compile. The route is not
    /// added in that case.
    pub fn add_route<H, I>(
        &mut self,
        method: Method,
        path: &str,
        handler: H,
        middlewares: I,
    ) -> Result<RouteHandle<'_, T>, PatternError>
    where
        H: RequestHandler<T> + 'static,
        I: IntoIterator<Item = SharedMiddleware>,
    {
        let template = self.scope.resolve(path);
        let pattern = match PathPattern::compile(&template) {
            Ok(pattern) => pattern,
            Err(e) => {
                self.reporter.report_compilation(&method, &e);
                return Err(e);
            }
        };

        let middlewares = self.scope.chain_for(middlewares);
        debug!(%method, template = pattern.template(), middlewares = middlewares.len(), "route registered");

        self.routes.push(Route { method, pattern, handler: Arc::new(handler), middlewares });
        let index = self.routes.len() - 1;
        Ok(RouteHandle { route: &mut self.routes[index] })
    }

    method_route!(get, GET);
    method_route!(post, POST);
    method_route!(put, PUT);
    method_route!(patch, PATCH);
    method_route!(delete, DELETE);
    method_route!(options, OPTIONS);
    method_route!(head, HEAD);

    /// Registers the routes `builder` adds under `prefix`, with `middlewares` applied after the
    /// middleware of the enclosing groups.
    ///
    /// The scope is restored when `builder` returns, whether it succeeded or not, so a failed
    /// group never leaks its prefix or middleware to later registrations.
    ///
    /// # Errors
    ///
    /// Returns the first [`PatternError`] raised inside `builder`.
    pub fn group<I, F>(&mut self, prefix: &str, middlewares: I, builder: F) -> Result<&mut Self, PatternError>
    where
        I: IntoIterator<Item = SharedMiddleware>,
        F: FnOnce(&mut Self) -> Result<(), PatternError>,
    {
        self.scope.push(prefix, middlewares);
        debug!(prefix = self.scope.current().prefix(), depth = self.scope.depth(), "group opened");

        let result = builder(self);
        self.scope.pop();

        result.map(|()| self)
    }

    /// Appends a global middleware, run before any group or route middleware on every route.
    ///
    /// This is global also inside a group; use [`RouteHandle::with`] to scope a middleware to
    /// one route.
    pub fn add_middleware<M: Middleware + 'static>(&mut self, middleware: M) -> &mut Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    pub fn add_shared_middleware(&mut self, middleware: SharedMiddleware) -> &mut Self {
        self.middlewares.push(middleware);
        self
    }

    pub fn scope(&self) -> &ScopeStack {
        &self.scope
    }

    pub fn routes(&self) -> &[Route<T>] {
        &self.routes
    }

    pub fn build(self) -> Router<T> {
        debug!(routes = self.routes.len(), middlewares = self.middlewares.len(), "router built");
        Router {
            routes: self.routes,
            middlewares: self.middlewares,
            reporter: self.reporter,
            response_config: self.response_config,
            debug: self.debug,
        }
    }
}

/// The route that was just registered.
#[derive(Debug)]
pub struct RouteHandle<'b, T> {
    route: &'b mut Route<T>,
}

impl<T> RouteHandle<'_, T> {
    /// Appends a middleware to this route's chain only.
    pub fn with<M: Middleware + 'static>(self, middleware: M) -> Self {
        self.with_shared(Arc::new(middleware))
    }

    pub fn with_shared(self, middleware: SharedMiddleware) -> Self {
        self.route.middlewares.push(middleware);
        self
    }

    /// Same as [`RouteHandle::with`], for call sites holding the handle in a binding.
    pub fn add_middleware<M: Middleware + 'static>(&mut self, middleware: M) -> &mut Self {
        self.route.middlewares.push(Arc::new(middleware));
        self
    }

    pub fn route(&self) -> &Route<T> {
        self.route
    }
}
