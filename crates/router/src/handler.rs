use crate::PathParams;
use crate::error::BoxError;
use crate::view::{RequestView, ResponseView};
use async_trait::async_trait;

/// The endpoint a route dispatches to once its middleware pipeline completed.
///
/// `T` is whatever the router hands back to the dispatch caller; handlers that only write to the
/// response usually use `()`.
#[async_trait]
pub trait RequestHandler<T>: Send + Sync {
    async fn invoke(
        &self,
        req: &mut dyn RequestView,
        resp: &mut dyn ResponseView,
        params: &PathParams<'_, '_>,
    ) -> Result<T, BoxError>;
}

/// an infallible closure as a [`RequestHandler`]
#[derive(Debug, Clone, Copy)]
pub struct FnHandler<F> {
    f: F,
}

/// a fallible closure as a [`RequestHandler`]
#[derive(Debug, Clone, Copy)]
pub struct TryFnHandler<F> {
    f: F,
}

pub fn handler_fn<F, T>(f: F) -> FnHandler<F>
where
    F: Fn(&mut dyn RequestView, &mut dyn ResponseView, &PathParams<'_, '_>) -> T + Send + Sync,
{
    FnHandler { f }
}

pub fn try_handler_fn<F, T, E>(f: F) -> TryFnHandler<F>
where
    F: Fn(&mut dyn RequestView, &mut dyn ResponseView, &PathParams<'_, '_>) -> Result<T, E> + Send + Sync,
    E: Into<BoxError>,
{
    TryFnHandler { f }
}

#[async_trait]
impl<F, T> RequestHandler<T> for FnHandler<F>
where
    F: Fn(&mut dyn RequestView, &mut dyn ResponseView, &PathParams<'_, '_>) -> T + Send + Sync,
    T: Send + 'static,
{
    async fn invoke(
        &self,
        req: &mut dyn RequestView,
        resp: &mut dyn ResponseView,
        params: &PathParams<'_, '_>,
    ) -> Result<T, BoxError> {
        Ok((self.f)(req, resp, params))
    }
}

#[async_trait]
impl<F, T, E> RequestHandler<T> for TryFnHandler<F>
where
    F: Fn(&mut dyn RequestView, &mut dyn ResponseView, &PathParams<'_, '_>) -> Result<T, E> + Send + Sync,
    E: Into<BoxError> + 'static,
    T: Send + 'static,
{
    async fn invoke(
        &self,
        req: &mut dyn RequestView,
        resp: &mut dyn ResponseView,
        params: &PathParams<'_, '_>,
    ) -> Result<T, BoxError> {
        (self.f)(req, resp, params).map_err(Into::into)
    }
}
