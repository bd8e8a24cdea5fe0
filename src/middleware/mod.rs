//! Middleware and the chaining algebra.
//!
//! A [`Middleware`] turns one [`Handler`] into another. It is the right place
//! for cross-cutting concerns: tracing, panic recovery, authentication,
//! header injection.
//!
//! Chains are built with [`Middleware::then`] or [`Middleware::queue`] and
//! closed with [`Middleware::finish`]. Declaration order is execution order:
//!
//! ```text
//! m1.then(m2).then(m3).finish(h)
//!
//!   m1 pre ─▶ m2 pre ─▶ m3 pre ─▶ h
//!                                 │
//!   m1 post ◀─ m2 post ◀─ m3 post ◀┘
//! ```
//!
//! Each middleware decides whether anything downstream runs at all: one that
//! never calls `next` ends the request right there.
//!
//! Built-in middleware:
//! - [`trace`]: per-request span with method, path, status, latency
//! - [`recover`]: turns a panic downstream into an error response

mod recover;
mod trace;

pub use recover::recover;
pub use trace::trace;

use std::fmt;
use std::sync::Arc;

use crate::handler::Handler;

/// A transform from one [`Handler`] to another.
///
/// Composing a middleware has no side effects; those happen only when the
/// handler it produced is invoked. The same value can be reused in any number
/// of chains.
pub struct Middleware<C>(Arc<dyn Fn(Handler<C>) -> Handler<C> + Send + Sync>);

impl<C: 'static> Middleware<C> {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Handler<C>) -> Handler<C> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Builds a middleware from a function that receives the container and
    /// the next handler, and calls `next` when the chain should continue.
    ///
    /// ```rust
    /// use plait::{Handler, Middleware};
    ///
    /// let deny_empty = Middleware::from_fn(|body: &mut String, next: &Handler<String>| {
    ///     if !body.is_empty() {
    ///         next.handle(body);
    ///     }
    /// });
    ///
    /// let handler = deny_empty.finish(Handler::new(|body: &mut String| body.push('!')));
    ///
    /// let mut empty = String::new();
    /// handler.handle(&mut empty);
    /// assert_eq!(empty, "");
    /// ```
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&mut C, &Handler<C>) + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Self::new(move |next: Handler<C>| {
            let f = Arc::clone(&f);
            Handler::new(move |c: &mut C| (*f)(c, &next))
        })
    }

    /// The middleware that returns its input handler unchanged.
    pub fn identity() -> Self {
        Self::new(|next| next)
    }

    /// Applies the transform to `handler`.
    pub fn apply(&self, handler: Handler<C>) -> Handler<C> {
        (self.0)(handler)
    }

    /// Runs `self` around `other`: `self`'s pre-logic first, then `other`'s.
    ///
    /// Grouping does not matter; `a.then(b).then(c)` and `a.then(b.then(c))`
    /// produce the same call order.
    pub fn then(self, other: Middleware<C>) -> Self {
        Self::new(move |next| self.apply(other.apply(next)))
    }

    /// Closes the chain with a terminal handler, producing the handler that is
    /// actually invoked per request.
    pub fn finish(&self, handler: Handler<C>) -> Handler<C> {
        self.apply(handler)
    }

    /// Composes `middlewares` in order into a single middleware.
    ///
    /// `queue([m1, m2, m3])` is `m1.then(m2).then(m3)`; an empty sequence
    /// gives [`Middleware::identity`].
    pub fn queue<I>(middlewares: I) -> Self
    where
        I: IntoIterator<Item = Middleware<C>>,
    {
        middlewares
            .into_iter()
            .reduce(Self::then)
            .unwrap_or_else(Self::identity)
    }
}

impl<C> Clone for Middleware<C> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<C> fmt::Debug for Middleware<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Middleware").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Log = Vec<String>;

    /// Logs `pre{n}`, calls `next`, logs `post{n}`.
    fn around(n: u32) -> Middleware<Log> {
        Middleware::from_fn(move |log: &mut Log, next: &Handler<Log>| {
            log.push(format!("pre{n}"));
            next.handle(log);
            log.push(format!("post{n}"));
        })
    }

    /// Writes `n` and calls `next`, like a middleware that only has pre-logic.
    fn print(n: u32) -> Middleware<String> {
        Middleware::new(move |next: Handler<String>| {
            Handler::new(move |out: &mut String| {
                out.push_str(&n.to_string());
                next.handle(out);
            })
        })
    }

    fn terminal() -> Handler<Log> {
        Handler::new(|log: &mut Log| log.push("handler".to_owned()))
    }

    fn run(handler: &Handler<Log>) -> Log {
        let mut log = Log::new();
        handler.handle(&mut log);
        log
    }

    #[test]
    fn then_chain_prints_in_declaration_order() {
        let handler = print(1)
            .then(print(2))
            .then(print(3))
            .finish(Handler::new(|out: &mut String| out.push_str("Handle the request")));

        let mut out = String::new();
        handler.handle(&mut out);
        assert_eq!(out, "123Handle the request");
    }

    #[test]
    fn queue_runs_pre_in_order_and_post_in_reverse() {
        let handler = Middleware::queue([around(1), around(2), around(3)]).finish(terminal());
        assert_eq!(
            run(&handler),
            ["pre1", "pre2", "pre3", "handler", "post3", "post2", "post1"],
        );
    }

    #[test]
    fn queue_matches_then_chaining() {
        let queued = Middleware::queue([around(1), around(2), around(3)]).finish(terminal());
        let chained = around(1).then(around(2)).then(around(3)).finish(terminal());
        assert_eq!(run(&queued), run(&chained));
    }

    #[test]
    fn empty_queue_is_identity() {
        let handler = Middleware::queue(Vec::new()).finish(terminal());
        assert_eq!(run(&handler), run(&terminal()));
        assert_eq!(run(&Middleware::identity().finish(terminal())), ["handler"]);
    }

    #[test]
    fn single_element_queue_is_that_middleware() {
        let queued = Middleware::queue([around(7)]).finish(terminal());
        assert_eq!(run(&queued), run(&around(7).finish(terminal())));
    }

    #[test]
    fn then_is_associative() {
        let left = around(1).then(around(2)).then(around(3)).finish(terminal());
        let right = around(1).then(around(2).then(around(3))).finish(terminal());
        assert_eq!(run(&left), run(&right));
    }

    #[test]
    fn identity_is_neutral_on_both_sides() {
        let plain = around(1).finish(terminal());
        let left = Middleware::identity().then(around(1)).finish(terminal());
        let right = around(1).then(Middleware::identity()).finish(terminal());
        assert_eq!(run(&left), run(&plain));
        assert_eq!(run(&right), run(&plain));
    }

    #[test]
    fn middleware_that_skips_next_short_circuits() {
        let halt = Middleware::from_fn(|log: &mut Log, _next: &Handler<Log>| {
            log.push("halt".to_owned());
        });
        let handler = Middleware::queue([around(1), halt, around(3)]).finish(terminal());
        assert_eq!(run(&handler), ["pre1", "halt", "post1"]);
    }

    #[test]
    fn wrap_matches_queue_finish() {
        let wrapped = terminal().wrap([around(1), around(2)]);
        let queued = Middleware::queue([around(1), around(2)]).finish(terminal());
        assert_eq!(run(&wrapped), run(&queued));
        assert_eq!(run(&wrapped), ["pre1", "pre2", "handler", "post2", "post1"]);
    }

    #[test]
    fn composed_handler_is_reusable() {
        let handler = around(1).then(around(2)).finish(terminal());
        assert_eq!(run(&handler), run(&handler));
    }

    #[test]
    fn composing_has_no_side_effects_until_invoked() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let applied = Arc::new(AtomicUsize::new(0));
        let invoked = Arc::new(AtomicUsize::new(0));
        let (a, i) = (Arc::clone(&applied), Arc::clone(&invoked));
        let counting = Middleware::new(move |next: Handler<Log>| {
            a.fetch_add(1, Ordering::SeqCst);
            let i = Arc::clone(&i);
            Handler::new(move |log: &mut Log| {
                i.fetch_add(1, Ordering::SeqCst);
                next.handle(log);
            })
        });

        let chain = counting.clone().then(around(1));
        assert_eq!(applied.load(Ordering::SeqCst), 0);

        let handler = chain.finish(terminal());
        assert_eq!(applied.load(Ordering::SeqCst), 1);
        assert_eq!(invoked.load(Ordering::SeqCst), 0);

        run(&handler);
        run(&handler);
        assert_eq!(applied.load(Ordering::SeqCst), 1);
        assert_eq!(invoked.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn handlers_are_shareable_across_threads() {
        let handler = Arc::new(around(1).then(around(2)).finish(terminal()));
        let workers: Vec<_> = (0..4)
            .map(|_| {
                let handler = Arc::clone(&handler);
                std::thread::spawn(move || run(&handler))
            })
            .collect();

        for worker in workers {
            assert_eq!(
                worker.join().unwrap(),
                ["pre1", "pre2", "handler", "post2", "post1"],
            );
        }
    }
}
