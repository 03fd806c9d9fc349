//! Error types raised while registering routes and dispatching requests.
//!
//! Registration problems surface as [`PatternError`] from the registration call itself,
//! everything that goes wrong while serving a request surfaces as [`DispatchError`].
//! A middleware halting the pipeline is not an error, see [`crate::Outcome`].

use http::{Method, StatusCode};
use std::error::Error;
use std::fmt;
use thiserror::Error;

/// The error type handlers and middleware may fail with.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// Raised when a path template can not be compiled into a matcher.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("unterminated capture pattern for param '{name}' in '{template}'")]
    UnterminatedPattern { template: String, name: String },

    #[error("missing param name before capture pattern in '{template}'")]
    EmptyParamName { template: String },

    #[error("duplicate param '{name}' in '{template}'")]
    DuplicateParam { template: String, name: String },

    #[error("invalid capture pattern in '{template}': {reason}")]
    InvalidRegex { template: String, reason: String },
}

impl PatternError {
    pub fn template(&self) -> &str {
        match self {
            Self::UnterminatedPattern { template, .. }
            | Self::EmptyParamName { template }
            | Self::DuplicateParam { template, .. }
            | Self::InvalidRegex { template, .. } => template,
        }
    }
}

/// The pipeline step a dispatch failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Position in the combined global-then-route middleware sequence.
    Middleware(usize),
    Handler,
}

/// Where in the route table a dispatch failure happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultSite {
    method: Method,
    route: String,
    step: Step,
}

impl FaultSite {
    pub fn new(method: Method, route: impl Into<String>, step: Step) -> Self {
        Self { method, route: route.into(), step }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The resolved path template of the matched route.
    pub fn route(&self) -> &str {
        &self.route
    }

    pub fn step(&self) -> Step {
        self.step
    }
}

impl fmt::Display for FaultSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let route = if self.route.is_empty() { "/" } else { self.route.as_str() };
        match self.step {
            Step::Middleware(index) => write!(f, "middleware #{index} of {} {route}", self.method),
            Step::Handler => write!(f, "handler of {} {route}", self.method),
        }
    }
}

/// Raised by [`crate::Router::dispatch`].
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("route not found: {method} {path}")]
    RouteNotFound { method: Method, path: String },

    #[error("{site} failed: {source}")]
    Fault {
        site: FaultSite,
        #[source]
        source: BoxError,
    },

    #[error("deadline exceeded at {site}")]
    DeadlineExceeded { site: FaultSite },

    #[error("dispatch cancelled at {site}")]
    Cancelled { site: FaultSite },
}

impl DispatchError {
    pub fn route_not_found(method: &Method, path: impl Into<String>) -> Self {
        Self::RouteNotFound { method: method.clone(), path: path.into() }
    }

    pub fn fault<E: Into<BoxError>>(site: FaultSite, source: E) -> Self {
        Self::Fault { site, source: source.into() }
    }

    /// Returns true for failures raised inside a middleware or handler.
    pub fn is_fault(&self) -> bool {
        matches!(self, Self::Fault { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::RouteNotFound { .. })
    }

    pub fn site(&self) -> Option<&FaultSite> {
        match self {
            Self::RouteNotFound { .. } => None,
            Self::Fault { site, .. } | Self::DeadlineExceeded { site } | Self::Cancelled { site } => Some(site),
        }
    }

    /// The status an embedding server should answer with.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            Self::Fault { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::DeadlineExceeded { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::Cancelled { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// A panic caught while running a middleware or handler.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("panicked: {message}")]
pub struct Panicked {
    message: String,
}

impl Panicked {
    pub(crate) fn from_payload(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_owned()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_owned()
        };
        Self { message }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn site_display_names_step_and_route() {
        let site = FaultSite::new(Method::GET, "/users/:id", Step::Middleware(2));
        assert_eq!(site.to_string(), "middleware #2 of GET /users/:id");

        let site = FaultSite::new(Method::POST, "", Step::Handler);
        assert_eq!(site.to_string(), "handler of POST /");
    }

    #[test]
    fn status_follows_error_kind() {
        let not_found = DispatchError::route_not_found(&Method::GET, "/nope");
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
        assert!(not_found.is_not_found());
        assert!(!not_found.is_fault());
        assert!(not_found.site().is_none());

        let fault = DispatchError::fault(FaultSite::new(Method::GET, "/x", Step::Handler), "boom");
        assert_eq!(fault.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(fault.is_fault());
        assert_eq!(fault.to_string(), "handler of GET /x failed: boom");
    }

    #[test]
    fn panic_payloads_are_readable() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("static message");
        assert_eq!(Panicked::from_payload(payload.as_ref()).message(), "static message");

        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("owned message"));
        assert_eq!(Panicked::from_payload(payload.as_ref()).message(), "owned message");

        let payload: Box<dyn std::any::Any + Send> = Box::new(42_u8);
        assert_eq!(Panicked::from_payload(payload.as_ref()).message(), "unknown panic payload");
    }
}
