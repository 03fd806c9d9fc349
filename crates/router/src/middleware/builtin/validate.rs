use crate::PathParams;
use crate::error::BoxError;
use crate::middleware::{Flow, Middleware};
use crate::view::{RequestBody, RequestView, ResponseView};
use async_trait::async_trait;
use http::StatusCode;
use serde_json::Value;

/// Where [`Validate`] looks for the required fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Source {
    /// A JSON object body, or the fields of a form body.
    #[default]
    Body,
    Query,
    Params,
}

/// Rejects requests missing any of the required fields with `422 Unprocessable Entity`.
///
/// A field that is present but empty, or `null` in JSON, counts as missing.
#[derive(Debug, Clone)]
pub struct Validate {
    fields: Vec<String>,
    source: Source,
}

pub fn validate<I, S>(fields: I, source: Source) -> Validate
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Validate { fields: fields.into_iter().map(Into::into).collect(), source }
}

impl Validate {
    fn is_present(&self, field: &str, req: &dyn RequestView, params: &PathParams<'_, '_>) -> bool {
        match self.source {
            Source::Body => match req.body() {
                RequestBody::Json(Value::Object(object)) => match object.get(field) {
                    None | Some(Value::Null) => false,
                    Some(Value::String(s)) => !s.is_empty(),
                    Some(_) => true,
                },
                RequestBody::Form(form) => form.get(field).is_some_and(|value| !value.is_empty()),
                _ => false,
            },
            Source::Query => req.query_params().get(field).is_some_and(|value| !value.is_empty()),
            Source::Params => params.get(field).is_some_and(|value| !value.is_empty()),
        }
    }
}

#[async_trait]
impl Middleware for Validate {
    async fn handle(
        &self,
        req: &mut dyn RequestView,
        resp: &mut dyn ResponseView,
        params: &PathParams<'_, '_>,
    ) -> Result<Flow, BoxError> {
        let missing = self
            .fields
            .iter()
            .filter(|field| !self.is_present(field, &*req, params))
            .map(String::as_str)
            .collect::<Vec<_>>();

        if missing.is_empty() {
            return Ok(Flow::Continue);
        }

        resp.with_error(&format!("Missing required fields: {}", missing.join(", ")), StatusCode::UNPROCESSABLE_ENTITY);
        Ok(Flow::Halt)
    }
}
