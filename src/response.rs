//! The response sink a pipeline writes into.
//!
//! [`ResponseWriter`] buffers status, headers and body for one request. The
//! host turns it into a wire response once the outermost handler returns.

use bytes::{Bytes, BytesMut};
use http::header::{self, HeaderMap, HeaderName, HeaderValue};
use http::StatusCode;
use http_body_util::Full;
use tracing::warn;

// ── ContentType ───────────────────────────────────────────────────────────────

/// Content types the built-in helpers answer with, for use with
/// [`ResponseWriter::set_content_type`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ContentType {
    Html,
    Json,
    Text,
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Html => "text/html; charset=utf-8",
            Self::Json => "application/json",
            Self::Text => "text/plain; charset=utf-8",
        }
    }
}

// ── ResponseWriter ────────────────────────────────────────────────────────────

/// Buffered response for a single request.
///
/// Headers stay mutable until the host sends the response, so a middleware
/// may add headers before or after calling `next`.
///
/// ```rust
/// use http::{StatusCode, header};
/// use plait::{ContentType, ResponseWriter};
///
/// let mut rw = ResponseWriter::new();
/// rw.set_content_type(ContentType::Json);
/// rw.set_header(header::LOCATION, "/users/42");
/// rw.write_header(StatusCode::CREATED);
/// rw.write(br#"{"id":42}"#);
///
/// assert_eq!(rw.status(), StatusCode::CREATED);
/// assert_eq!(rw.body(), br#"{"id":42}"#);
/// ```
#[derive(Debug, Default)]
pub struct ResponseWriter {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: BytesMut,
}

impl ResponseWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Sets `name` to `value`, replacing earlier values.
    ///
    /// A value that is not a legal header value is logged and dropped.
    pub fn set_header(&mut self, name: HeaderName, value: &str) {
        match HeaderValue::from_str(value) {
            Ok(value) => {
                self.headers.insert(name, value);
            }
            Err(_) => warn!(header = %name, "dropping invalid header value"),
        }
    }

    pub fn set_content_type(&mut self, content_type: ContentType) {
        self.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(content_type.as_str()),
        );
    }

    /// Records the response status. Only the first call has any effect.
    pub fn write_header(&mut self, status: StatusCode) {
        match self.status {
            None => self.status = Some(status),
            Some(current) => warn!(
                current = current.as_u16(),
                ignored = status.as_u16(),
                "superfluous write_header call"
            ),
        }
    }

    /// Appends `data` to the body. Implies `200 OK` if no status was written.
    pub fn write(&mut self, data: impl AsRef<[u8]>) {
        self.status.get_or_insert(StatusCode::OK);
        self.body.extend_from_slice(data.as_ref());
    }

    /// The status to send; `200 OK` until something else is written.
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    /// Whether a status or any body bytes have been written.
    pub fn is_written(&self) -> bool {
        self.status.is_some()
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Converts the buffered response into the form hyper sends.
    pub fn into_response(self) -> http::Response<Full<Bytes>> {
        let mut response = http::Response::new(Full::new(self.body.freeze()));
        *response.status_mut() = self.status.unwrap_or(StatusCode::OK);
        *response.headers_mut() = self.headers;
        response
    }
}
