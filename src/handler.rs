//! The terminal unit of work.
//!
//! # How handlers are stored
//!
//! A pipeline is a stack of closures, each capturing the one below it. Every
//! closure has its own concrete type, so they are erased behind a shared
//! trait object and passed around as one uniform value:
//!
//! ```text
//! |c: &mut C| { … }                      ← user writes this
//!        ↓ Handler::new
//! Arc<dyn Fn(&mut C) + Send + Sync>      ← Handler<C>
//!        ↓ Middleware::finish / Handler::wrap
//! Arc<dyn Fn(&mut C) …> capturing next   ← still a Handler<C>
//!        ↓
//! handler.handle(&mut container)         ← one virtual call per layer
//! ```
//!
//! Cloning a handler is one atomic increment. The same handler value serves
//! any number of concurrent requests; only the container is per-request.

use std::fmt;
use std::mem;
use std::sync::Arc;

use crate::container::Container;
use crate::legacy::{HandlerFunc, SwapBack};
use crate::middleware::Middleware;
use crate::request::Request;
use crate::response::ResponseWriter;

/// A function from a request container to nothing.
///
/// All output happens through `C`: writing the response, attaching
/// request-scoped state. A panic inside a handler propagates to whoever
/// invoked it; insert [`middleware::recover`](crate::middleware::recover) to
/// turn panics into responses.
///
/// Composition places no bound on `C`. Any type works as a container as long
/// as the handlers in the chain agree on it.
pub struct Handler<C>(Arc<dyn Fn(&mut C) + Send + Sync>);

impl<C: 'static> Handler<C> {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut C) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Runs the handler against `container`.
    pub fn handle(&self, container: &mut C) {
        (self.0)(container)
    }

    /// Decorates this handler with `middlewares`, first one outermost.
    ///
    /// Equivalent to `Middleware::queue(middlewares).finish(self)`. With no
    /// middleware the handler is returned as is.
    ///
    /// ```rust
    /// use plait::{Handler, Middleware};
    ///
    /// let tag = |label: &'static str| {
    ///     Middleware::from_fn(move |log: &mut Vec<&'static str>, next: &Handler<_>| {
    ///         log.push(label);
    ///         next.handle(log);
    ///     })
    /// };
    ///
    /// let handler = Handler::new(|log: &mut Vec<&'static str>| log.push("done"))
    ///     .wrap([tag("first"), tag("second")]);
    ///
    /// let mut log = Vec::new();
    /// handler.handle(&mut log);
    /// assert_eq!(log, ["first", "second", "done"]);
    /// ```
    pub fn wrap<I>(self, middlewares: I) -> Self
    where
        I: IntoIterator<Item = Middleware<C>>,
    {
        Middleware::queue(middlewares).finish(self)
    }

    /// Adapts this handler to the two-argument [`HandlerFunc`] form a host
    /// runtime calls.
    ///
    /// Every call builds a fresh container from the writer and request it is
    /// given, runs the handler, then moves both back to the caller so the host
    /// sees everything the pipeline wrote. They are moved back on unwind too.
    pub fn to_handler_func<F>(&self, factory: F) -> HandlerFunc
    where
        C: Container,
        F: Fn(ResponseWriter, Request) -> C + Send + Sync + 'static,
    {
        let handler = self.clone();
        HandlerFunc::new(move |rw: &mut ResponseWriter, req: &mut Request| {
            let mut container = factory(mem::take(rw), mem::take(req));
            let parts = SwapBack { container: &mut container, rw, req };
            handler.handle(&mut *parts.container);
        })
    }
}

impl<C> Clone for Handler<C> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<C> fmt::Debug for Handler<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler").finish_non_exhaustive()
    }
}
