//! Ready to use middleware built on the [`Middleware`](super::Middleware) contract.
//!
//! ```
//! use micro_router::middleware::builtin::{bearer_auth, cors, json_only, CorsConfig};
//! use micro_router::middleware::shared;
//! use micro_router::{handler_fn, Router};
//!
//! # fn main() -> Result<(), micro_router::PatternError> {
//! let mut builder = Router::builder();
//! builder.add_middleware(cors(CorsConfig::default()));
//! builder.group("/api", [shared(bearer_auth()), shared(json_only())], |api| {
//!     api.post("/users", handler_fn(|_req, _resp, _params| ()))?;
//!     Ok(())
//! })?;
//! let router = builder.build();
//! # assert_eq!(router.routes().len(), 1);
//! # Ok(())
//! # }
//! ```

mod auth;
mod cors;
mod json_only;
mod logger;
mod rate_limit;
mod validate;

pub use auth::ApiKey;
pub use auth::BearerAuth;
pub use auth::api_key;
pub use auth::bearer_auth;
pub use auth::bearer_auth_with;
pub use cors::Cors;
pub use cors::CorsConfig;
pub use cors::cors;
pub use json_only::JsonOnly;
pub use json_only::json_only;
pub use logger::RequestLogger;
pub use logger::request_logger;
pub use rate_limit::RateLimit;
pub use rate_limit::rate_limit;
pub use validate::Source;
pub use validate::Validate;
pub use validate::validate;
