//! Interop with the conventional two-argument handler form.
//!
//! Most HTTP stacks call handlers as `(response sink, request)`, and most
//! existing middleware decorates that shape. [`HandlerFunc`] is that shape
//! here; [`to_middleware`] lifts a middleware written against it into a
//! [`Middleware`], and [`Handler::to_handler_func`] goes the other way.
//!
//! # Bridging without rebuilding the container
//!
//! A lifted middleware sees only the writer and request, yet whatever it
//! calls through to must run against the very container the chain was
//! invoked with. Per invocation:
//!
//! ```text
//! c ──take writer + request──▶ legacy(inner).serve(&mut rw, &mut req)
//!                                      │
//!                                      ▼ inner(rw', req')
//!                         swap rw'/req' into c ─▶ next.handle(c) ─▶ swap back
//!                                      │
//! c ◀──restore writer + request────────┘
//! ```
//!
//! The container itself is moved into a slot the inner handler can reach,
//! never re-created, so request-scoped state survives and `next` runs
//! exactly once per call through the inner handler. Both hand-backs happen
//! in `Drop`, so a panic downstream unwinds through a restored container.

use std::fmt;
use std::mem;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

use crate::container::Container;
use crate::handler::Handler;
use crate::middleware::Middleware;
use crate::request::Request;
use crate::response::ResponseWriter;

/// A handler in the conventional `(response sink, request)` form.
#[derive(Clone)]
pub struct HandlerFunc(Arc<dyn Fn(&mut ResponseWriter, &mut Request) + Send + Sync>);

impl HandlerFunc {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut ResponseWriter, &mut Request) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn serve(&self, rw: &mut ResponseWriter, req: &mut Request) {
        (self.0)(rw, req)
    }
}

impl fmt::Debug for HandlerFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerFunc").finish_non_exhaustive()
    }
}

/// Lifts a middleware over [`HandlerFunc`] into a [`Middleware`].
///
/// Invoking the result with a container behaves exactly like invoking
/// `legacy` with the container's writer and request: headers, status and body
/// written on either side of the call end up in the same container.
///
/// ```rust
/// use http::header;
/// use plait::{Container, DefaultContainer, Handler, HandlerFunc, to_middleware};
///
/// let cors = to_middleware(|next: HandlerFunc| {
///     HandlerFunc::new(move |rw, req| {
///         rw.set_header(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*");
///         next.serve(rw, req);
///     })
/// });
///
/// let handler = cors.finish(Handler::new(|c: &mut DefaultContainer| {
///     c.response_writer().write("done");
/// }));
///
/// let mut c = DefaultContainer::default();
/// handler.handle(&mut c);
///
/// let (rw, _) = c.into_parts();
/// assert_eq!(rw.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
/// assert_eq!(rw.body(), b"done");
/// ```
pub fn to_middleware<C, M>(legacy: M) -> Middleware<C>
where
    C: Container + Default + Send + 'static,
    M: Fn(HandlerFunc) -> HandlerFunc + Send + Sync + 'static,
{
    let legacy = Arc::new(legacy);
    Middleware::new(move |next: Handler<C>| {
        let legacy = Arc::clone(&legacy);
        Handler::new(move |c: &mut C| {
            let mut owned = mem::take(c);
            let rw = mem::take(owned.response_writer());
            let req = mem::take(owned.request_mut());
            let slot = Arc::new(Mutex::new(Some(owned)));

            let inner = {
                let slot = Arc::clone(&slot);
                let next = next.clone();
                HandlerFunc::new(move |rw: &mut ResponseWriter, req: &mut Request| {
                    let mut guard = slot.lock();
                    let Some(c) = guard.as_mut() else {
                        warn!("legacy middleware called through after it returned; ignoring");
                        return;
                    };
                    mem::swap(c.response_writer(), rw);
                    mem::swap(c.request_mut(), req);
                    let parts = SwapBack { container: c, rw, req };
                    next.handle(&mut *parts.container);
                })
            };

            let mut restore = Restore { target: c, slot, rw, req };
            (*legacy)(inner).serve(&mut restore.rw, &mut restore.req);
        })
    })
}

// ── Unwind-safe hand-back ─────────────────────────────────────────────────────

/// Swaps writer and request between `container` and the caller's slots when
/// dropped, so they go back even if the handler in between panics.
pub(crate) struct SwapBack<'a, C: Container> {
    pub(crate) container: &'a mut C,
    pub(crate) rw: &'a mut ResponseWriter,
    pub(crate) req: &'a mut Request,
}

impl<C: Container> Drop for SwapBack<'_, C> {
    fn drop(&mut self) {
        mem::swap(self.container.response_writer(), self.rw);
        mem::swap(self.container.request_mut(), self.req);
    }
}

/// Moves the bridged container, writer and request back into `target` when
/// dropped, on return and on unwind alike.
struct Restore<'a, C: Container> {
    target: &'a mut C,
    slot: Arc<Mutex<Option<C>>>,
    rw: ResponseWriter,
    req: Request,
}

impl<C: Container> Drop for Restore<'_, C> {
    fn drop(&mut self) {
        if let Some(owned) = self.slot.lock().take() {
            *self.target = owned;
        }
        *self.target.response_writer() = mem::take(&mut self.rw);
        *self.target.request_mut() = mem::take(&mut self.req);
    }
}
