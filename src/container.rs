//! The per-request capability object handlers operate on.

use std::fmt;

use http::header::{self, HeaderValue};
use http::{Method, StatusCode};
use tracing::error;

use crate::request::{RemoteAddr, Request, UrlValues};
use crate::response::{ContentType, ResponseWriter};

/// Access to the request being served and the response being built.
///
/// Only [`response_writer`](Container::response_writer) and the two request
/// accessors are required. Everything else derives from them, so a custom
/// container (one carrying a database handle, say) gets the helpers for free.
pub trait Container {
    fn response_writer(&mut self) -> &mut ResponseWriter;

    fn request(&self) -> &Request;

    fn request_mut(&mut self) -> &mut Request;

    /// URL values attached to the request, created empty on first access.
    fn url_values(&mut self) -> &mut UrlValues {
        self.request_mut()
            .extensions_mut()
            .get_or_insert_default::<UrlValues>()
    }

    /// Replies with `status` and its reason phrase, and logs `err`.
    fn error(&mut self, status: StatusCode, err: &dyn fmt::Display) {
        let reason = status.canonical_reason().unwrap_or("");
        let rw = self.response_writer();
        rw.set_content_type(ContentType::Text);
        rw.headers_mut().insert(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        );
        rw.write_header(status);
        rw.write(format!("{reason}\n"));

        let req = self.request();
        let peer = req.extensions().get::<RemoteAddr>().map(|addr| addr.0);
        error!(
            peer = ?peer,
            method = %req.method(),
            uri = %req.uri(),
            status = status.as_u16(),
            error = %err,
            "request failed"
        );
    }

    /// Replies with a redirect to `location`.
    ///
    /// GET and HEAD requests are marked as HTML unless a content type was
    /// already chosen; GET also gets a short body pointing at the target.
    fn redirect(&mut self, location: &str, status: StatusCode) {
        let method = self.request().method().clone();
        let untyped = !self.response_writer().headers().contains_key(header::CONTENT_TYPE);
        let with_body = untyped && method == Method::GET;

        let rw = self.response_writer();
        rw.set_header(header::LOCATION, location);
        if untyped && (method == Method::GET || method == Method::HEAD) {
            rw.set_content_type(ContentType::Html);
        }
        rw.write_header(status);
        if with_body {
            let reason = status.canonical_reason().unwrap_or("");
            rw.write(format!("<a href=\"{}\">{reason}</a>.\n", html_escape(location)));
        }
    }
}

fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// The container [`Server`](crate::Server) builds for every request: just the
/// writer and the request.
#[derive(Debug, Default)]
pub struct DefaultContainer {
    rw: ResponseWriter,
    req: Request,
}

impl DefaultContainer {
    pub fn new(rw: ResponseWriter, req: Request) -> Self {
        Self { rw, req }
    }

    pub fn into_parts(self) -> (ResponseWriter, Request) {
        (self.rw, self.req)
    }
}

impl Container for DefaultContainer {
    fn response_writer(&mut self) -> &mut ResponseWriter {
        &mut self.rw
    }

    fn request(&self) -> &Request {
        &self.req
    }

    fn request_mut(&mut self) -> &mut Request {
        &mut self.req
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::error::StatusError;

    fn container(method: Method, uri: &str) -> DefaultContainer {
        let req = http::Request::builder()
            .method(method)
            .uri(uri)
            .body(Bytes::new())
            .unwrap();
        DefaultContainer::new(ResponseWriter::new(), req)
    }

    #[test]
    fn url_values_start_empty_and_persist() {
        let mut c = container(Method::GET, "/users/42");
        assert!(c.url_values().is_empty());

        c.url_values().set("id", "42");
        assert_eq!(c.url_values().get("id"), Some("42"));
        assert_eq!(
            c.request().extensions().get::<UrlValues>().and_then(|v| v.get("id")),
            Some("42"),
        );
    }

    #[test]
    fn url_values_set_by_the_host_are_kept() {
        let mut c = container(Method::GET, "/");
        let mut values = UrlValues::new();
        values.add("slug", "hello");
        c.request_mut().extensions_mut().insert(values);

        assert_eq!(c.url_values().get("slug"), Some("hello"));
    }

    #[test]
    fn error_writes_the_reason_phrase() {
        let mut c = container(Method::POST, "/orders");
        c.error(StatusCode::FORBIDDEN, &StatusError::from(StatusCode::FORBIDDEN));

        let (rw, _) = c.into_parts();
        assert_eq!(rw.status(), StatusCode::FORBIDDEN);
        assert_eq!(rw.body(), b"Forbidden\n");
        assert_eq!(rw.headers()[header::CONTENT_TYPE], "text/plain; charset=utf-8");
        assert_eq!(rw.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    }

    #[test]
    fn redirect_on_get_links_to_the_target() {
        let mut c = container(Method::GET, "/old");
        c.redirect("/new?a=1&b=2", StatusCode::FOUND);

        let (rw, _) = c.into_parts();
        assert_eq!(rw.status(), StatusCode::FOUND);
        assert_eq!(rw.headers()[header::LOCATION], "/new?a=1&b=2");
        assert_eq!(rw.body(), b"<a href=\"/new?a=1&amp;b=2\">Found</a>.\n");
    }

    #[test]
    fn redirect_on_post_has_no_body() {
        let mut c = container(Method::POST, "/form");
        c.redirect("/done", StatusCode::SEE_OTHER);

        let (rw, _) = c.into_parts();
        assert_eq!(rw.status(), StatusCode::SEE_OTHER);
        assert_eq!(rw.headers()[header::LOCATION], "/done");
        assert!(rw.body().is_empty());
        assert!(rw.headers().get(header::CONTENT_TYPE).is_none());
    }

    #[test]
    fn redirect_on_head_is_html_without_a_body() {
        let mut c = container(Method::HEAD, "/old");
        c.redirect("/new", StatusCode::MOVED_PERMANENTLY);

        let (rw, _) = c.into_parts();
        assert_eq!(rw.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(rw.headers()[header::LOCATION], "/new");
        assert_eq!(rw.headers()[header::CONTENT_TYPE], "text/html; charset=utf-8");
        assert!(rw.body().is_empty());
    }
}
