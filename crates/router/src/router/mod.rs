//! The route table and the dispatcher driving it.
//!
//! A [`Router`] is built once with a [`RouterBuilder`] and is read-only afterwards, so it can be
//! shared across tasks behind an `Arc`. Dispatch scans the routes in registration order and the
//! first route whose method and pattern match wins; an earlier general pattern shadows a later
//! specific one.

mod builder;
pub mod scope;

pub use builder::RouteHandle;
pub use builder::RouterBuilder;

use crate::PathParams;
use crate::config::RouterConfig;
use crate::error::{DispatchError, FaultSite, Step};
use crate::handler::RequestHandler;
use crate::middleware::{Halt, Pipeline, SharedMiddleware, StepGuard};
use crate::pattern::PathPattern;
use crate::report::ErrorReporter;
use crate::view::{RequestView, ResponseConfig, ResponseView};
use http::Method;
use std::fmt;
use std::sync::Arc;

/// One registered route with its frozen middleware chain.
pub struct Route<T> {
    method: Method,
    pattern: PathPattern,
    handler: Arc<dyn RequestHandler<T>>,
    middlewares: Vec<SharedMiddleware>,
}

impl<T> fmt::Debug for Route<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("template", &self.pattern.template())
            .field("middlewares", &self.middlewares.len())
            .finish_non_exhaustive()
    }
}

impl<T> Route<T> {
    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    /// The resolved template, group prefixes included.
    pub fn template(&self) -> &str {
        self.pattern.template()
    }

    /// Group middleware followed by route middleware, in run order.
    pub fn middlewares(&self) -> &[SharedMiddleware] {
        &self.middlewares
    }

    pub fn handler(&self) -> &dyn RequestHandler<T> {
        self.handler.as_ref()
    }

    fn site(&self, step: Step) -> FaultSite {
        FaultSite::new(self.method.clone(), self.pattern.template(), step)
    }
}

/// The route selected for a request together with its bound params.
#[derive(Debug)]
pub struct RouteMatch<'router, 'req, T> {
    route: &'router Route<T>,
    params: PathParams<'router, 'req>,
}

impl<'router, 'req, T> RouteMatch<'router, 'req, T> {
    pub fn route(&self) -> &'router Route<T> {
        self.route
    }

    pub fn params(&self) -> &PathParams<'router, 'req> {
        &self.params
    }
}

/// How a dispatch that did not fail ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The pipeline completed and the handler returned this value.
    Completed(T),
    /// A middleware halted the pipeline, the handler did not run.
    Halted(Halt),
}

impl<T> Outcome<T> {
    pub fn completed(self) -> Option<T> {
        match self {
            Self::Completed(output) => Some(output),
            Self::Halted(_) => None,
        }
    }

    pub fn halt(&self) -> Option<Halt> {
        match self {
            Self::Completed(_) => None,
            Self::Halted(halt) => Some(*halt),
        }
    }

    pub fn is_halted(&self) -> bool {
        matches!(self, Self::Halted(_))
    }
}

/// An immutable route table with its global middleware.
pub struct Router<T = ()> {
    routes: Vec<Route<T>>,
    middlewares: Vec<SharedMiddleware>,
    reporter: ErrorReporter,
    response_config: ResponseConfig,
    debug: bool,
}

impl<T> fmt::Debug for Router<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes)
            .field("middlewares", &self.middlewares.len())
            .field("reporter", &self.reporter)
            .finish_non_exhaustive()
    }
}

impl<T: Send + 'static> Router<T> {
    pub fn builder() -> RouterBuilder<T> {
        RouterBuilder::new(&RouterConfig::default())
    }

    pub fn builder_with(config: RouterConfig) -> RouterBuilder<T> {
        RouterBuilder::new(&config)
    }

    pub fn routes(&self) -> &[Route<T>] {
        &self.routes
    }

    pub fn middlewares(&self) -> &[SharedMiddleware] {
        &self.middlewares
    }

    /// How responses created for this router should render errors.
    pub fn response_config(&self) -> ResponseConfig {
        self.response_config
    }

    /// Finds the first route registered for `method` whose pattern matches `path`.
    pub fn at<'router, 'req>(&'router self, method: &Method, path: &'req str) -> Option<RouteMatch<'router, 'req, T>> {
        self.routes
            .iter()
            .filter(|route| route.method == *method)
            .find_map(|route| route.pattern.captures(path).map(|params| RouteMatch { route, params }))
    }

    /// Dispatches `method` and `path` through the global middleware, the matched route's chain
    /// and its handler.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::RouteNotFound`] if no route matches, and a fault, deadline or
    /// cancellation error if a step failed. Errors are reported before they are returned, and
    /// are returned unchanged.
    pub async fn dispatch(
        &self,
        method: &Method,
        path: &str,
        req: &mut dyn RequestView,
        resp: &mut dyn ResponseView,
    ) -> Result<Outcome<T>, DispatchError> {
        let result = self.dispatch_matched(method, path, req, resp).await;
        if let Err(e) = &result {
            self.reporter.report(e);
        }
        result
    }

    /// Dispatches the request view's own method and path.
    ///
    /// # Errors
    ///
    /// See [`Router::dispatch`].
    pub async fn serve(&self, req: &mut dyn RequestView, resp: &mut dyn ResponseView) -> Result<Outcome<T>, DispatchError> {
        let method = req.method().clone();
        let path = req.path().to_owned();
        self.dispatch(&method, &path, req, resp).await
    }

    /// Serves the request and, if it failed before anything was sent, writes the error into the
    /// response.
    ///
    /// # Errors
    ///
    /// Returns the dispatch error after rendering it, see [`Router::dispatch`].
    pub async fn handle(&self, req: &mut dyn RequestView, resp: &mut dyn ResponseView) -> Result<Outcome<T>, DispatchError> {
        let result = self.serve(req, resp).await;
        if let Err(e) = &result
            && !resp.is_sent()
        {
            let status = e.status();
            let message = match e {
                DispatchError::RouteNotFound { .. } => "Route not found".to_owned(),
                _ if self.debug => e.to_string(),
                _ => status.canonical_reason().unwrap_or("Internal Server Error").to_owned(),
            };
            resp.with_error(&message, status);
        }
        result
    }

    async fn dispatch_matched(
        &self,
        method: &Method,
        path: &str,
        req: &mut dyn RequestView,
        resp: &mut dyn ResponseView,
    ) -> Result<Outcome<T>, DispatchError> {
        let Some(RouteMatch { route, params }) = self.at(method, path) else {
            return Err(DispatchError::route_not_found(method, path));
        };

        let guard = StepGuard::from_request(&*req);
        let site = |step: Step| route.site(step);

        let pipeline = Pipeline::new(&self.middlewares, &route.middlewares);
        if let Some(halt) = pipeline.run(req, resp, &params, &guard, &site).await? {
            return Ok(Outcome::Halted(halt));
        }

        guard.check(|| site(Step::Handler))?;
        let output = guard
            .run(route.handler.invoke(req, resp, &params))
            .await
            .map_err(|interrupt| interrupt.into_error(site(Step::Handler)))?
            .map_err(|source| DispatchError::Fault { site: site(Step::Handler), source })?;

        Ok(Outcome::Completed(output))
    }
}

impl Default for Router<()> {
    fn default() -> Self {
        Router::builder().build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{handler_fn, try_handler_fn};
    use crate::middleware::{HaltReason, middleware_fn};
    use crate::report::MockErrorSink;
    use crate::view::{Request, Response, ResponseBody};
    use http::{StatusCode, Uri};
    use serde_json::json;

    fn params_router() -> Router<Vec<(String, String)>> {
        let mut builder = Router::builder();
        builder
            .get("/users/:id/posts/:post_id", handler_fn(|_req, _resp, params| params.to_owned_pairs()))
            .unwrap();
        builder.build()
    }

    #[test]
    fn at_binds_params_in_declaration_order() {
        let router = params_router();
        let matched = router.at(&Method::GET, "/users/42/posts/7").unwrap();
        assert_eq!(matched.route().template(), "/users/:id/posts/:post_id");
        assert_eq!(matched.params().iter().collect::<Vec<_>>(), vec![("id", "42"), ("post_id", "7")]);

        assert!(router.at(&Method::POST, "/users/42/posts/7").is_none());
        assert!(router.at(&Method::GET, "/users/42").is_none());
    }

    #[tokio::test]
    async fn dispatch_returns_handler_output() {
        let router = params_router();
        let mut req = Request::default();
        let mut resp = Response::default();

        let outcome = router.dispatch(&Method::GET, "/users/1/posts/2/", &mut req, &mut resp).await.unwrap();
        assert_eq!(outcome, Outcome::Completed(vec![("id".into(), "1".into()), ("post_id".into(), "2".into())]));
    }

    #[tokio::test]
    async fn halted_dispatch_skips_handler() {
        let mut builder = Router::builder();
        builder.add_middleware(middleware_fn(|_req, _resp, _params| false));
        builder.get("/", handler_fn(|_req, _resp, _params| "unreachable")).unwrap();
        let router = builder.build();

        let outcome = router.dispatch(&Method::GET, "/", &mut Request::default(), &mut Response::default()).await.unwrap();
        assert!(outcome.is_halted());
        assert_eq!(outcome.halt().map(|halt| halt.reason()), Some(HaltReason::Rejected));
        assert_eq!(outcome.completed(), None);
    }

    #[tokio::test]
    async fn handler_fault_is_reported_and_returned() {
        let mut sink = MockErrorSink::new();
        sink.expect_append()
            .withf(|line| line.ends_with("] disk full in handler of PUT /files/:name"))
            .times(1)
            .returning(|_| Ok(()));

        let mut builder = Router::<()>::builder().with_reporter(ErrorReporter::new(sink));
        builder.put("/files/:name", try_handler_fn(|_req, _resp, _params| Err::<(), _>("disk full"))).unwrap();
        let router = builder.build();

        let err = router
            .dispatch(&Method::PUT, "/files/a.txt", &mut Request::default(), &mut Response::default())
            .await
            .unwrap_err();
        assert!(err.is_fault());
        assert_eq!(err.site().map(FaultSite::step), Some(Step::Handler));
    }

    #[tokio::test]
    async fn failing_sink_leaves_the_fault_unchanged() {
        fn failing_router(reporter: ErrorReporter) -> Router<()> {
            let mut builder = Router::builder().with_reporter(reporter);
            builder.post("/upload", try_handler_fn(|_req, _resp, _params| Err::<(), _>("quota exceeded"))).unwrap();
            builder.build()
        }

        let mut sink = MockErrorSink::new();
        sink.expect_append()
            .times(1)
            .returning(|_| Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only log")));

        let logged = failing_router(ErrorReporter::new(sink))
            .dispatch(&Method::POST, "/upload", &mut Request::default(), &mut Response::default())
            .await
            .unwrap_err();
        let silent = failing_router(ErrorReporter::disabled())
            .dispatch(&Method::POST, "/upload", &mut Request::default(), &mut Response::default())
            .await
            .unwrap_err();

        assert!(logged.is_fault());
        assert_eq!(logged.site().map(FaultSite::step), Some(Step::Handler));
        assert_eq!(logged.to_string(), silent.to_string());
        assert_eq!(logged.to_string(), "handler of POST /upload failed: quota exceeded");
    }

    #[tokio::test]
    async fn serve_uses_the_request_path() {
        let mut builder = Router::builder();
        builder
            .get("/search", handler_fn(|req, _resp, _params| req.query_params().get("q").map(str::to_owned)))
            .unwrap();
        let router = builder.build();

        let mut req = Request::new(Method::GET, Uri::from_static("/search?q=rust"));
        let outcome = router.serve(&mut req, &mut Response::default()).await.unwrap();
        assert_eq!(outcome, Outcome::Completed(Some("rust".to_owned())));
    }

    #[tokio::test]
    async fn handle_renders_errors() {
        let mut builder = Router::builder();
        builder.get("/boom", try_handler_fn(|_req, _resp, _params| Err::<(), _>("secret detail"))).unwrap();
        let router = builder.build();

        let mut resp = Response::default();
        let err = router.handle(&mut Request::new(Method::GET, Uri::from_static("/nope")), &mut resp).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(
            resp.body(),
            &ResponseBody::Json(json!({"error": true, "code": 404, "message": "Route not found"}))
        );

        let mut resp = Response::default();
        router.handle(&mut Request::new(Method::GET, Uri::from_static("/boom")), &mut resp).await.unwrap_err();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            resp.body(),
            &ResponseBody::Json(json!({"error": true, "code": 500, "message": "Internal Server Error"}))
        );
    }

    #[tokio::test]
    async fn handle_in_debug_mode_shows_the_fault() {
        let mut builder = Router::builder_with(RouterConfig::default().with_debug(true));
        builder.get("/boom", try_handler_fn(|_req, _resp, _params| Err::<(), _>("secret detail"))).unwrap();
        let router = builder.build();

        let mut resp = Response::default();
        router.handle(&mut Request::new(Method::GET, Uri::from_static("/boom")), &mut resp).await.unwrap_err();
        assert_eq!(
            resp.body(),
            &ResponseBody::Json(json!({"error": true, "code": 500, "message": "handler of GET /boom failed: secret detail"}))
        );
    }

    #[tokio::test]
    async fn handle_keeps_a_sent_response() {
        let mut builder = Router::builder();
        builder
            .get(
                "/partial",
                try_handler_fn(|_req, resp, _params| {
                    resp.with_status(StatusCode::ACCEPTED, Some("started"));
                    Err::<(), _>("then failed")
                }),
            )
            .unwrap();
        let router = builder.build();

        let mut resp = Response::default();
        router.handle(&mut Request::new(Method::GET, Uri::from_static("/partial")), &mut resp).await.unwrap_err();
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
    }

    #[test]
    fn router_is_shareable() {
        fn assert_send_sync<S: Send + Sync>() {}
        assert_send_sync::<Router<String>>();
    }
}
