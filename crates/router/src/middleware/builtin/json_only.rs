use crate::PathParams;
use crate::error::BoxError;
use crate::middleware::{Flow, Middleware};
use crate::view::{RequestView, ResponseView};
use async_trait::async_trait;
use http::header::CONTENT_TYPE;
use http::{Method, StatusCode};

/// Rejects non `GET` requests whose body is not declared as JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonOnly;

pub fn json_only() -> JsonOnly {
    JsonOnly
}

#[async_trait]
impl Middleware for JsonOnly {
    async fn handle(
        &self,
        req: &mut dyn RequestView,
        resp: &mut dyn ResponseView,
        _params: &PathParams<'_, '_>,
    ) -> Result<Flow, BoxError> {
        if req.method() == Method::GET {
            return Ok(Flow::Continue);
        }

        let is_json = req
            .header(CONTENT_TYPE)
            .and_then(|value| value.parse::<mime::Mime>().ok())
            .is_some_and(|mime| mime.essence_str() == mime::APPLICATION_JSON.essence_str());
        if !is_json {
            resp.with_error("Content-Type must be application/json", StatusCode::UNSUPPORTED_MEDIA_TYPE);
            return Ok(Flow::Halt);
        }

        Ok(Flow::Continue)
    }
}
