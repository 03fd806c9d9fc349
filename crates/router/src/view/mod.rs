//! Contracts between the dispatch engine and the request/response objects it drives.
//!
//! The router only ever talks to a request through [`RequestView`] and to a response through
//! [`ResponseView`]; it never reaches into the transport. [`Request`] and [`Response`] are the
//! buffered implementations shipped with the crate, used by the examples and the tests.

mod request;
mod response;

pub use request::FormParams;
pub use request::Request;
pub use request::RequestBody;
pub use request::UploadedFile;
pub use response::Response;
pub use response::ResponseBody;
pub use response::ResponseConfig;

use http::header::AsHeaderName;
use http::{Extensions, HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use serde::de::DeserializeOwned;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Read access to the request being dispatched.
///
/// Middleware may stash data for later steps in [`RequestView::extensions_mut`].
pub trait RequestView: Send + Sync {
    fn method(&self) -> &Method;

    /// The request path, without the query string.
    fn path(&self) -> &str;

    fn headers(&self) -> &HeaderMap;

    /// The parsed payload, or the raw bytes when it could not be parsed.
    fn body(&self) -> &RequestBody;

    /// The raw query string, without the leading `?`.
    fn raw_query(&self) -> Option<&str>;

    fn query_params(&self) -> &FormParams;

    /// Fields of an `application/x-www-form-urlencoded` body.
    fn post_params(&self) -> &FormParams;

    fn files(&self) -> &[UploadedFile];

    fn extensions(&self) -> &Extensions;

    fn extensions_mut(&mut self) -> &mut Extensions;

    fn remote_addr(&self) -> Option<SocketAddr> {
        None
    }

    /// When set, dispatch gives up once this instant has passed.
    fn deadline(&self) -> Option<Instant> {
        None
    }

    /// When set, dispatch gives up once this token is cancelled.
    fn cancellation(&self) -> Option<&CancellationToken> {
        None
    }
}

impl dyn RequestView + '_ {
    /// Returns the header value as a str, if present and visible ASCII.
    pub fn header<K: AsHeaderName>(&self, name: K) -> Option<&str> {
        self.headers().get(name).and_then(|value| value.to_str().ok())
    }

    /// Deserializes the query string into `T`.
    ///
    /// # Errors
    ///
    /// Returns the `serde_qs` error when the query does not fit `T`.
    pub fn query_as<T: DeserializeOwned>(&self) -> Result<T, serde_qs::Error> {
        serde_qs::from_str(self.raw_query().unwrap_or_default())
    }

    /// Deserializes a JSON body into `T`, `None` when the body is not JSON.
    pub fn json_as<T: DeserializeOwned>(&self) -> Option<Result<T, serde_json::Error>> {
        match self.body() {
            RequestBody::Json(value) => Some(T::deserialize(value)),
            _ => None,
        }
    }
}

/// Write access to the response being produced.
///
/// Every `with_*` operation is terminal: it marks the response as sent, and the pipeline stops
/// after the step that sent it.
pub trait ResponseView: Send + Sync {
    fn set_header(&mut self, name: HeaderName, value: HeaderValue);

    fn with_json(&mut self, data: serde_json::Value, status: StatusCode);

    fn with_error(&mut self, message: &str, status: StatusCode);

    fn with_html(&mut self, html: String, status: StatusCode);

    /// Answers with the file at `path`, named `file_name` or the path's file name.
    fn with_download(&mut self, path: &Path, file_name: Option<&str>);

    fn with_status(&mut self, status: StatusCode, message: Option<&str>);

    fn is_sent(&self) -> bool;
}
