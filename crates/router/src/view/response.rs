use crate::view::{RequestView, ResponseView};
use bytes::Bytes;
use http::header::{ACCEPT, CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE, EXPIRES, PRAGMA};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde_json::json;
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

const CONTENT_DESCRIPTION: HeaderName = HeaderName::from_static("content-description");

/// How a [`Response`] renders errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseConfig {
    /// Render errors as JSON even when the request does not ask for it.
    pub use_json: bool,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self { use_json: true }
    }
}

/// What a [`Response`] will write once it is converted into an http response.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ResponseBody {
    #[default]
    Empty,
    Json(serde_json::Value),
    Html(String),
    Text(String),
    /// Read from disk by [`Response::into_http`].
    File(PathBuf),
}

/// A buffered [`ResponseView`].
///
/// The first terminal operation wins; later ones are ignored.
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: ResponseBody,
    sent: bool,
    prefers_json: bool,
}

impl Default for Response {
    fn default() -> Self {
        Self::new(ResponseConfig::default())
    }
}

impl Response {
    pub fn new(config: ResponseConfig) -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: ResponseBody::Empty,
            sent: false,
            prefers_json: config.use_json,
        }
    }

    /// Creates a response which renders errors as JSON when the config says so, or when the
    /// request's `Accept` or `Content-Type` mention `application/json`.
    pub fn for_request(req: &dyn RequestView, config: ResponseConfig) -> Self {
        let mentions_json = |name: HeaderName| {
            req.headers()
                .get_all(name)
                .iter()
                .filter_map(|value| value.to_str().ok())
                .any(|value| value.contains(mime::APPLICATION_JSON.essence_str()))
        };

        let mut response = Self::new(config);
        response.prefers_json = config.use_json || mentions_json(ACCEPT) || mentions_json(CONTENT_TYPE);
        response
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &ResponseBody {
        &self.body
    }

    /// Converts into an [`http::Response`], reading the file of a download.
    ///
    /// # Errors
    ///
    /// Returns an io error if the download file can not be read or the JSON can not be encoded.
    pub fn into_http(self) -> io::Result<http::Response<Bytes>> {
        let mut headers = self.headers;
        let bytes = match self.body {
            ResponseBody::Empty => Bytes::new(),
            ResponseBody::Json(value) => Bytes::from(serde_json::to_vec_pretty(&value).map_err(io::Error::other)?),
            ResponseBody::Html(html) => Bytes::from(html),
            ResponseBody::Text(text) => {
                headers
                    .entry(CONTENT_TYPE)
                    .or_insert_with(|| HeaderValue::from_static("text/plain; charset=utf-8"));
                Bytes::from(text)
            }
            ResponseBody::File(path) => Bytes::from(std::fs::read(path)?),
        };

        let mut response = http::Response::new(bytes);
        *response.status_mut() = self.status;
        *response.headers_mut() = headers;
        Ok(response)
    }

    fn commit(&mut self, operation: &'static str) -> bool {
        if self.sent {
            warn!(operation, status = %self.status, "response already sent, ignored");
            return false;
        }
        self.sent = true;
        true
    }

    fn finish(&mut self, status: StatusCode, content_type: Option<&'static str>, body: ResponseBody) {
        self.status = status;
        if let Some(content_type) = content_type {
            self.headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        }
        self.body = body;
    }
}

impl ResponseView for Response {
    fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    fn with_json(&mut self, data: serde_json::Value, status: StatusCode) {
        if self.commit("with_json") {
            self.finish(status, Some("application/json"), ResponseBody::Json(data));
        }
    }

    fn with_error(&mut self, message: &str, status: StatusCode) {
        if !self.commit("with_error") {
            return;
        }

        if self.prefers_json {
            let body = json!({ "error": true, "code": status.as_u16(), "message": message });
            self.finish(status, Some("application/json"), ResponseBody::Json(body));
        } else {
            let html = format!("<h1>Error: {}</h1><p>Status Code: {}</p>", escape_html(message), status.as_u16());
            self.finish(status, Some("text/html; charset=utf-8"), ResponseBody::Html(html));
        }
    }

    fn with_html(&mut self, html: String, status: StatusCode) {
        if self.commit("with_html") {
            self.finish(status, Some("text/html; charset=utf-8"), ResponseBody::Html(html));
        }
    }

    fn with_download(&mut self, path: &Path, file_name: Option<&str>) {
        if !self.commit("with_download") {
            return;
        }

        let size = match std::fs::metadata(path) {
            Ok(metadata) if metadata.is_file() => metadata.len(),
            _ => {
                self.finish(StatusCode::NOT_FOUND, None, ResponseBody::Text("File not found.".to_owned()));
                return;
            }
        };

        let file_name = file_name
            .map(ToOwned::to_owned)
            .or_else(|| path.file_name().map(|name| name.to_string_lossy().into_owned()))
            .unwrap_or_else(|| "download".to_owned());

        let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", file_name.replace('"', "")))
            .unwrap_or_else(|e| {
                warn!(cause = %e, file_name = %file_name, "file name is not a valid header value");
                HeaderValue::from_static("attachment")
            });

        self.headers.insert(CONTENT_DESCRIPTION, HeaderValue::from_static("File Transfer"));
        self.headers.insert(CONTENT_DISPOSITION, disposition);
        self.headers.insert(EXPIRES, HeaderValue::from_static("0"));
        self.headers.insert(CACHE_CONTROL, HeaderValue::from_static("must-revalidate"));
        self.headers.insert(PRAGMA, HeaderValue::from_static("public"));
        self.headers.insert(CONTENT_LENGTH, HeaderValue::from(size));
        self.finish(
            StatusCode::OK,
            Some("application/octet-stream"),
            ResponseBody::File(path.to_path_buf()),
        );
    }

    fn with_status(&mut self, status: StatusCode, message: Option<&str>) {
        if self.commit("with_status") {
            let body = message.map_or(ResponseBody::Empty, |message| ResponseBody::Text(message.to_owned()));
            self.finish(status, None, body);
        }
    }

    fn is_sent(&self) -> bool {
        self.sent
    }
}

fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
