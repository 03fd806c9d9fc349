//! Middleware: steps run before the handler which may continue or halt the dispatch.
//!
//! A middleware halts by returning [`Flow::Halt`], or by sending the response: the pipeline checks
//! [`ResponseView::is_sent`] after every step and stops as soon as it is set, whatever the step
//! returned.

pub mod builtin;
mod pipeline;

pub use pipeline::Halt;
pub use pipeline::HaltReason;
pub use pipeline::Pipeline;
pub(crate) use pipeline::StepGuard;

use crate::PathParams;
use crate::error::BoxError;
use crate::view::{RequestView, ResponseView};
use async_trait::async_trait;
use std::sync::Arc;

/// What the pipeline should do after a middleware ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Halt,
}

#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(
        &self,
        req: &mut dyn RequestView,
        resp: &mut dyn ResponseView,
        params: &PathParams<'_, '_>,
    ) -> Result<Flow, BoxError>;
}

/// A middleware as stored in routes, groups and the global list.
pub type SharedMiddleware = Arc<dyn Middleware>;

/// Wraps `middleware` for use in a group or route middleware list.
pub fn shared<M: Middleware + 'static>(middleware: M) -> SharedMiddleware {
    Arc::new(middleware)
}

/// Values a middleware closure may return.
///
/// Only an explicit `false` or [`Flow::Halt`] halts; `()` and `true` continue.
pub trait IntoFlow {
    fn into_flow(self) -> Result<Flow, BoxError>;
}

impl IntoFlow for Flow {
    #[inline]
    fn into_flow(self) -> Result<Flow, BoxError> {
        Ok(self)
    }
}

impl IntoFlow for bool {
    #[inline]
    fn into_flow(self) -> Result<Flow, BoxError> {
        Ok(if self { Flow::Continue } else { Flow::Halt })
    }
}

impl IntoFlow for () {
    #[inline]
    fn into_flow(self) -> Result<Flow, BoxError> {
        Ok(Flow::Continue)
    }
}

impl<R: IntoFlow, E: Into<BoxError>> IntoFlow for Result<R, E> {
    fn into_flow(self) -> Result<Flow, BoxError> {
        match self {
            Ok(flow) => flow.into_flow(),
            Err(e) => Err(e.into()),
        }
    }
}

/// a synchronous closure as a [`Middleware`]
#[derive(Debug, Clone, Copy)]
pub struct FnMiddleware<F> {
    f: F,
}

pub fn middleware_fn<F, R>(f: F) -> FnMiddleware<F>
where
    F: Fn(&mut dyn RequestView, &mut dyn ResponseView, &PathParams<'_, '_>) -> R + Send + Sync,
    R: IntoFlow,
{
    FnMiddleware { f }
}

#[async_trait]
impl<F, R> Middleware for FnMiddleware<F>
where
    F: Fn(&mut dyn RequestView, &mut dyn ResponseView, &PathParams<'_, '_>) -> R + Send + Sync,
    R: IntoFlow + 'static,
{
    async fn handle(
        &self,
        req: &mut dyn RequestView,
        resp: &mut dyn ResponseView,
        params: &PathParams<'_, '_>,
    ) -> Result<Flow, BoxError> {
        (self.f)(req, resp, params).into_flow()
    }
}

#[async_trait]
impl<M: Middleware + ?Sized> Middleware for Arc<M> {
    async fn handle(
        &self,
        req: &mut dyn RequestView,
        resp: &mut dyn ResponseView,
        params: &PathParams<'_, '_>,
    ) -> Result<Flow, BoxError> {
        self.as_ref().handle(req, resp, params).await
    }
}
