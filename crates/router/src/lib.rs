//! An embeddable routing and middleware dispatch engine
//!
//! This crate maps an incoming `(method, path)` pair to a registered handler, after passing the
//! request through an ordered, short circuiting chain of middleware. It does not parse HTTP: it
//! drives whatever request and response objects the embedding server hands it, through the
//! [`RequestView`](view::RequestView) and [`ResponseView`](view::ResponseView) contracts.
//!
//! # Features
//!
//! - Path templates with `:name` params and `:name(regex)` overrides
//! - Nested groups sharing a prefix and accumulating middleware
//! - Global, group and route scoped middleware with halt semantics
//! - Deadlines and cancellation checked between pipeline steps
//! - Optional append only error log
//!
//! # Example
//!
//! ```
//! use http::{Method, StatusCode};
//! use micro_router::view::{Request, Response, ResponseView};
//! use micro_router::{Outcome, Router, handler_fn, middleware_fn};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut builder = Router::builder();
//! builder.get("/ping", handler_fn(|_req, _resp, _params| "pong"))?;
//! builder.group("/admin", [], |admin| {
//!     admin
//!         .get("/users/:id", handler_fn(|_req, _resp, _params| "user"))?
//!         .with(middleware_fn(|_req, resp: &mut dyn ResponseView, _params| {
//!             resp.with_status(StatusCode::FORBIDDEN, None);
//!         }));
//!     Ok(())
//! })?;
//! let router = builder.build();
//!
//! let outcome = router.dispatch(&Method::GET, "/ping/", &mut Request::default(), &mut Response::default()).await?;
//! assert_eq!(outcome, Outcome::Completed("pong"));
//!
//! let outcome = router.dispatch(&Method::GET, "/admin/users/7", &mut Request::default(), &mut Response::default()).await?;
//! assert!(outcome.is_halted());
//!
//! let err = router.dispatch(&Method::POST, "/ping", &mut Request::default(), &mut Response::default()).await.unwrap_err();
//! assert!(err.is_not_found());
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod handler;
mod params;

pub mod middleware;
pub mod pattern;
pub mod report;
pub mod router;
pub mod view;

pub use config::ConfigError;
pub use config::RouterConfig;
pub use error::BoxError;
pub use error::DispatchError;
pub use error::FaultSite;
pub use error::Panicked;
pub use error::PatternError;
pub use error::Step;
pub use handler::FnHandler;
pub use handler::RequestHandler;
pub use handler::TryFnHandler;
pub use handler::handler_fn;
pub use handler::try_handler_fn;
pub use middleware::Flow;
pub use middleware::Middleware;
pub use middleware::middleware_fn;
pub use params::PathParams;
pub use router::Outcome;
pub use router::RouteHandle;
pub use router::Router;
pub use router::RouterBuilder;
