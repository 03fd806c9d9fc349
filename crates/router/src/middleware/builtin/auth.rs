use crate::PathParams;
use crate::error::BoxError;
use crate::middleware::{Flow, Middleware};
use crate::view::{RequestView, ResponseView};
use async_trait::async_trait;
use http::header::AUTHORIZATION;
use http::{Extensions, HeaderName, StatusCode};

type TokenValidator = dyn Fn(&str, &mut Extensions) -> bool + Send + Sync;
type KeyValidator = dyn Fn(&str) -> bool + Send + Sync;

/// Requires an `Authorization: Bearer <token>` header.
pub struct BearerAuth {
    validator: Option<Box<TokenValidator>>,
}

impl std::fmt::Debug for BearerAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerAuth").field("validates", &self.validator.is_some()).finish()
    }
}

/// Accepts any non empty bearer token.
pub fn bearer_auth() -> BearerAuth {
    BearerAuth { validator: None }
}

/// Accepts the tokens `validator` resolves, storing what it returned in the request extensions.
///
/// ```
/// use micro_router::middleware::builtin::bearer_auth_with;
///
/// #[derive(Clone)]
/// struct User(String);
///
/// let auth = bearer_auth_with(|token| (token == "secret").then(|| User("zava".to_owned())));
/// ```
pub fn bearer_auth_with<F, U>(validator: F) -> BearerAuth
where
    F: Fn(&str) -> Option<U> + Send + Sync + 'static,
    U: Clone + Send + Sync + 'static,
{
    let validator = move |token: &str, extensions: &mut Extensions| match validator(token) {
        Some(user) => {
            extensions.insert(user);
            true
        }
        None => false,
    };
    BearerAuth { validator: Some(Box::new(validator)) }
}

/// Extracts the token of a `Bearer` authorization value, the scheme is case insensitive.
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(|c: char| c.is_ascii_whitespace())?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[async_trait]
impl Middleware for BearerAuth {
    async fn handle(
        &self,
        req: &mut dyn RequestView,
        resp: &mut dyn ResponseView,
        _params: &PathParams<'_, '_>,
    ) -> Result<Flow, BoxError> {
        let Some(token) = req.header(AUTHORIZATION).and_then(bearer_token).map(str::to_owned) else {
            resp.with_error("Unauthorized: Token not provided", StatusCode::UNAUTHORIZED);
            return Ok(Flow::Halt);
        };

        if let Some(validator) = &self.validator
            && !validator(&token, req.extensions_mut())
        {
            resp.with_error("Unauthorized: Invalid token", StatusCode::UNAUTHORIZED);
            return Ok(Flow::Halt);
        }

        Ok(Flow::Continue)
    }
}

/// Requires an API key header, `X-API-Key` unless configured otherwise.
pub struct ApiKey {
    header: HeaderName,
    validator: Option<Box<KeyValidator>>,
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKey")
            .field("header", &self.header)
            .field("validates", &self.validator.is_some())
            .finish()
    }
}

pub fn api_key() -> ApiKey {
    ApiKey { header: HeaderName::from_static("x-api-key"), validator: None }
}

impl ApiKey {
    /// Reads the key from `header` instead.
    pub fn header(mut self, header: HeaderName) -> Self {
        self.header = header;
        self
    }

    /// Only accepts keys for which `validator` returns true.
    pub fn validate_with<F>(mut self, validator: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.validator = Some(Box::new(validator));
        self
    }
}

#[async_trait]
impl Middleware for ApiKey {
    async fn handle(
        &self,
        req: &mut dyn RequestView,
        resp: &mut dyn ResponseView,
        _params: &PathParams<'_, '_>,
    ) -> Result<Flow, BoxError> {
        let key = req.header(&self.header).map(str::trim).filter(|key| !key.is_empty());
        let Some(key) = key else {
            resp.with_error("Unauthorized: API Key not provided", StatusCode::UNAUTHORIZED);
            return Ok(Flow::Halt);
        };

        if self.validator.as_ref().is_some_and(|validator| !validator(key)) {
            resp.with_error("Unauthorized: Invalid API Key", StatusCode::UNAUTHORIZED);
            return Ok(Flow::Halt);
        }

        Ok(Flow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::{Request, Response, ResponseBody};
    use http::{HeaderValue, Method, Uri};
    use serde_json::json;

    fn request(authorization: Option<&'static str>) -> Request {
        let request = Request::new(Method::GET, Uri::from_static("/me"));
        match authorization {
            Some(value) => request.with_header(AUTHORIZATION, HeaderValue::from_static(value)),
            None => request,
        }
    }

    fn error_message(resp: &Response) -> Option<&str> {
        match resp.body() {
            ResponseBody::Json(body) => body["message"].as_str(),
            _ => None,
        }
    }

    #[test]
    fn token_parsing() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("bearer   abc "), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Bearer"), None);
        assert_eq!(bearer_token("Bearer\tabc"), Some("abc"));
        assert_eq!(bearer_token("BEARER \t abc"), Some("abc"));
        assert_eq!(bearer_token("Bearer\t"), None);
    }

    #[tokio::test]
    async fn missing_token_is_rejected() {
        let mut req = request(None);
        let mut resp = Response::default();

        let flow = bearer_auth().handle(&mut req, &mut resp, &PathParams::empty()).await.unwrap();
        assert_eq!(flow, Flow::Halt);
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(error_message(&resp), Some("Unauthorized: Token not provided"));
    }

    #[tokio::test]
    async fn any_token_passes_without_validator() {
        let mut req = request(Some("Bearer whatever"));
        let mut resp = Response::default();

        let flow = bearer_auth().handle(&mut req, &mut resp, &PathParams::empty()).await.unwrap();
        assert_eq!(flow, Flow::Continue);
        assert!(!resp.is_sent());
    }

    #[tokio::test]
    async fn validated_token_stores_user() {
        #[derive(Debug, Clone, PartialEq)]
        struct User(&'static str);

        let auth = bearer_auth_with(|token| (token == "secret").then_some(User("zava")));

        let mut req = request(Some("Bearer secret"));
        let mut resp = Response::default();
        assert_eq!(auth.handle(&mut req, &mut resp, &PathParams::empty()).await.unwrap(), Flow::Continue);
        assert_eq!(req.extensions().get::<User>(), Some(&User("zava")));

        let mut req = request(Some("Bearer guess"));
        let mut resp = Response::default();
        assert_eq!(auth.handle(&mut req, &mut resp, &PathParams::empty()).await.unwrap(), Flow::Halt);
        assert_eq!(
            resp.body(),
            &ResponseBody::Json(json!({"error": true, "code": 401, "message": "Unauthorized: Invalid token"}))
        );
    }

    #[tokio::test]
    async fn api_key_header() {
        let middleware = api_key().validate_with(|key| key == "k-1");

        let mut req = Request::default();
        let mut resp = Response::default();
        assert_eq!(middleware.handle(&mut req, &mut resp, &PathParams::empty()).await.unwrap(), Flow::Halt);
        assert_eq!(error_message(&resp), Some("Unauthorized: API Key not provided"));

        let mut req = Request::default().with_header(HeaderName::from_static("x-api-key"), HeaderValue::from_static("k-2"));
        let mut resp = Response::default();
        assert_eq!(middleware.handle(&mut req, &mut resp, &PathParams::empty()).await.unwrap(), Flow::Halt);
        assert_eq!(error_message(&resp), Some("Unauthorized: Invalid API Key"));

        let mut req = Request::default().with_header(HeaderName::from_static("x-api-key"), HeaderValue::from_static("k-1"));
        let mut resp = Response::default();
        assert_eq!(middleware.handle(&mut req, &mut resp, &PathParams::empty()).await.unwrap(), Flow::Continue);
    }

    #[tokio::test]
    async fn api_key_custom_header() {
        let middleware = api_key().header(HeaderName::from_static("x-token"));

        let mut req = Request::default().with_header(HeaderName::from_static("x-token"), HeaderValue::from_static("any"));
        let mut resp = Response::default();
        assert_eq!(middleware.handle(&mut req, &mut resp, &PathParams::empty()).await.unwrap(), Flow::Continue);
    }
}
