use crate::PathParams;
use crate::error::BoxError;
use crate::middleware::{Flow, Middleware};
use crate::view::{RequestView, ResponseView};
use async_trait::async_trait;
use http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE,
};
use http::{HeaderValue, Method, StatusCode};

/// Values of the `Access-Control-*` response headers.
#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allow_origin: HeaderValue,
    pub allow_methods: HeaderValue,
    pub allow_headers: HeaderValue,
    pub allow_credentials: bool,
    /// Seconds a preflight answer may be cached.
    pub max_age: u32,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origin: HeaderValue::from_static("*"),
            allow_methods: HeaderValue::from_static("GET, POST, PUT, PATCH, DELETE, OPTIONS"),
            allow_headers: HeaderValue::from_static("Content-Type, Authorization, X-Requested-With, X-API-Key"),
            allow_credentials: false,
            max_age: 86400,
        }
    }
}

/// Adds the CORS headers to every response and answers preflight requests itself.
#[derive(Debug, Clone)]
pub struct Cors {
    config: CorsConfig,
}

pub fn cors(config: CorsConfig) -> Cors {
    Cors { config }
}

#[async_trait]
impl Middleware for Cors {
    async fn handle(
        &self,
        req: &mut dyn RequestView,
        resp: &mut dyn ResponseView,
        _params: &PathParams<'_, '_>,
    ) -> Result<Flow, BoxError> {
        let config = &self.config;
        resp.set_header(ACCESS_CONTROL_ALLOW_ORIGIN, config.allow_origin.clone());
        resp.set_header(ACCESS_CONTROL_ALLOW_METHODS, config.allow_methods.clone());
        resp.set_header(ACCESS_CONTROL_ALLOW_HEADERS, config.allow_headers.clone());
        resp.set_header(ACCESS_CONTROL_MAX_AGE, HeaderValue::from(config.max_age));
        if config.allow_credentials {
            resp.set_header(ACCESS_CONTROL_ALLOW_CREDENTIALS, HeaderValue::from_static("true"));
        }

        if req.method() == Method::OPTIONS {
            resp.with_status(StatusCode::OK, None);
            return Ok(Flow::Halt);
        }

        Ok(Flow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::{Request, Response};
    use http::Uri;

    #[tokio::test]
    async fn headers_are_set_and_request_continues() {
        let mut req = Request::new(Method::GET, Uri::from_static("/users"));
        let mut resp = Response::default();

        let flow = cors(CorsConfig::default()).handle(&mut req, &mut resp, &PathParams::empty()).await.unwrap();
        assert_eq!(flow, Flow::Continue);
        assert!(!resp.is_sent());
        assert_eq!(resp.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(resp.headers()[ACCESS_CONTROL_MAX_AGE], "86400");
        assert!(resp.headers().get(ACCESS_CONTROL_ALLOW_CREDENTIALS).is_none());
    }

    #[tokio::test]
    async fn preflight_is_answered() {
        let config = CorsConfig {
            allow_origin: HeaderValue::from_static("https://example.com"),
            allow_credentials: true,
            ..CorsConfig::default()
        };
        let mut req = Request::new(Method::OPTIONS, Uri::from_static("/users"));
        let mut resp = Response::default();

        let flow = cors(config).handle(&mut req, &mut resp, &PathParams::empty()).await.unwrap();
        assert_eq!(flow, Flow::Halt);
        assert!(resp.is_sent());
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "https://example.com");
        assert_eq!(resp.headers()[ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    }
}
