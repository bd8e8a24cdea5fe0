//! Incoming request type and the request-scoped values attached to it.

use std::collections::HashMap;
use std::net::SocketAddr;

use bytes::Bytes;

/// An incoming HTTP request with its body fully buffered.
pub type Request = http::Request<Bytes>;

/// Peer address of the connection a request arrived on.
///
/// Inserted into the request extensions by [`Server`](crate::Server). Absent
/// when the request was built by hand.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RemoteAddr(pub SocketAddr);

/// Values extracted from the URL by whatever routes the request.
///
/// A multi-map: one key may carry several values, kept in insertion order.
/// Reach it through [`Container::url_values`](crate::Container::url_values),
/// which attaches an empty one to the request on first access.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct UrlValues(HashMap<String, Vec<String>>);

impl UrlValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// First value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.first()).map(String::as_str)
    }

    /// Every value for `key`, empty when the key is absent.
    pub fn get_all(&self, key: &str) -> &[String] {
        self.0.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    /// Appends `value` to whatever `key` already holds.
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.entry(key.into()).or_default().push(value.into());
    }

    /// Replaces every value of `key` with `value`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), vec![value.into()]);
    }

    pub fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
