use crate::view::RequestView;
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{Extensions, HeaderMap, HeaderName, HeaderValue, Method, Uri};
use mime::Mime;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

static EMPTY_PARAMS: FormParams = FormParams { pairs: Vec::new() };

/// Ordered `name=value` pairs decoded from a query string or a form body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormParams {
    pairs: Vec<(String, String)>,
}

impl FormParams {
    /// Decodes `application/x-www-form-urlencoded` input.
    ///
    /// # Errors
    ///
    /// Returns the `serde_urlencoded` error for malformed input.
    pub fn parse(input: &str) -> Result<Self, serde_urlencoded::de::Error> {
        serde_urlencoded::from_str::<Vec<(String, String)>>(input).map(|pairs| Self { pairs })
    }

    /// The first value recorded for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs.iter().find(|(key, _)| key == name).map(|(_, value)| value.as_str())
    }

    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.pairs.iter().filter(move |(key, _)| key == name).map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self { pairs: iter.into_iter().map(|(key, value)| (key.into(), value.into())).collect() }
    }
}

/// The payload of a request.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(serde_json::Value),
    Form(FormParams),
    Raw(Bytes),
}

impl RequestBody {
    /// Parses JSON when the payload is JSON, form fields when it is declared as a form, and
    /// otherwise keeps the raw bytes.
    pub fn parse(content_type: Option<&Mime>, bytes: Bytes) -> Self {
        if bytes.is_empty() {
            return Self::Empty;
        }

        if let Ok(value) = serde_json::from_slice::<serde_json::Value>(&bytes) {
            return Self::Json(value);
        }

        let is_form = content_type.is_some_and(|mime| mime.essence_str() == mime::APPLICATION_WWW_FORM_URLENCODED.essence_str());
        if is_form {
            match std::str::from_utf8(&bytes).map(FormParams::parse) {
                Ok(Ok(params)) => return Self::Form(params),
                Ok(Err(e)) => debug!(cause = %e, "malformed form body, keeping raw bytes"),
                Err(e) => debug!(cause = %e, "non utf-8 form body, keeping raw bytes"),
            }
        }

        Self::Raw(bytes)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// A file received with the request, stored by the transport before dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub field: String,
    pub file_name: String,
    pub content_type: Option<Mime>,
    pub path: PathBuf,
    pub size: u64,
}

/// An owned, fully buffered [`RequestView`].
#[derive(Debug, Default)]
pub struct Request {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: RequestBody,
    query: FormParams,
    files: Vec<UploadedFile>,
    extensions: Extensions,
    remote_addr: Option<SocketAddr>,
    deadline: Option<Instant>,
    cancellation: Option<CancellationToken>,
}

impl Request {
    pub fn new(method: Method, uri: Uri) -> Self {
        let query = parse_query(&uri);
        Self { method, uri, query, ..Self::default() }
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Sets the payload, parsed according to the current `Content-Type` header.
    pub fn with_body(mut self, bytes: impl Into<Bytes>) -> Self {
        let content_type = content_type(&self.headers);
        self.body = RequestBody::parse(content_type.as_ref(), bytes.into());
        self
    }

    pub fn with_file(mut self, file: UploadedFile) -> Self {
        self.files.push(file);
        self
    }

    pub fn with_remote_addr(mut self, remote_addr: SocketAddr) -> Self {
        self.remote_addr = Some(remote_addr);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }
}

impl From<http::Request<Bytes>> for Request {
    fn from(request: http::Request<Bytes>) -> Self {
        let (parts, bytes) = request.into_parts();
        let content_type = content_type(&parts.headers);
        Self {
            query: parse_query(&parts.uri),
            body: RequestBody::parse(content_type.as_ref(), bytes),
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            extensions: parts.extensions,
            ..Self::default()
        }
    }
}

impl RequestView for Request {
    fn method(&self) -> &Method {
        &self.method
    }

    fn path(&self) -> &str {
        self.uri.path()
    }

    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn body(&self) -> &RequestBody {
        &self.body
    }

    fn raw_query(&self) -> Option<&str> {
        self.uri.query()
    }

    fn query_params(&self) -> &FormParams {
        &self.query
    }

    fn post_params(&self) -> &FormParams {
        match &self.body {
            RequestBody::Form(params) => params,
            _ => &EMPTY_PARAMS,
        }
    }

    fn files(&self) -> &[UploadedFile] {
        &self.files
    }

    fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    fn cancellation(&self) -> Option<&CancellationToken> {
        self.cancellation.as_ref()
    }
}

fn content_type(headers: &HeaderMap) -> Option<Mime> {
    headers.get(CONTENT_TYPE).and_then(|value| value.to_str().ok()).and_then(|value| value.parse::<Mime>().ok())
}

fn parse_query(uri: &Uri) -> FormParams {
    let Some(query) = uri.query() else {
        return FormParams::default();
    };

    FormParams::parse(query).unwrap_or_else(|e| {
        debug!(cause = %e, query, "malformed query string, ignored");
        FormParams::default()
    })
}
