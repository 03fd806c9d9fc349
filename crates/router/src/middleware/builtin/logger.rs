use crate::PathParams;
use crate::error::BoxError;
use crate::middleware::{Flow, Middleware};
use crate::view::{RequestView, ResponseView};
use async_trait::async_trait;
use http::header::USER_AGENT;
use tracing::info;

/// Emits one `info` event per request, never halts.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestLogger;

pub fn request_logger() -> RequestLogger {
    RequestLogger
}

#[async_trait]
impl Middleware for RequestLogger {
    async fn handle(
        &self,
        req: &mut dyn RequestView,
        _resp: &mut dyn ResponseView,
        _params: &PathParams<'_, '_>,
    ) -> Result<Flow, BoxError> {
        let remote_addr = req.remote_addr().map_or_else(|| "unknown".to_owned(), |addr| addr.to_string());
        info!(
            method = %req.method(),
            path = req.path(),
            remote_addr = %remote_addr,
            user_agent = req.header(USER_AGENT).unwrap_or("unknown"),
            "request"
        );
        Ok(Flow::Continue)
    }
}
