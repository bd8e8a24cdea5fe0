use std::panic::{self, AssertUnwindSafe};

use tracing::error;

use crate::container::Container;
use crate::error::{panic_message, status_of};
use crate::handler::Handler;
use crate::middleware::Middleware;

/// Turns a panic anywhere downstream into an error response.
///
/// A panic carrying a [`StatusError`](crate::StatusError) answers with that status; anything
/// else answers `500 Internal Server Error`. If the response was already
/// started when the panic hit, it is left alone and the panic is only logged.
///
/// Place it first in the chain so it covers everything after it.
pub fn recover<C>() -> Middleware<C>
where
    C: Container + 'static,
{
    Middleware::from_fn(|c: &mut C, next: &Handler<C>| {
        let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| next.handle(c))) else {
            return;
        };

        let status = status_of(payload.as_ref());
        let message = panic_message(payload.as_ref());
        if c.response_writer().is_written() {
            error!(status = status.as_u16(), panic = %message, "handler panicked after writing a response");
            return;
        }
        c.error(status, &message);
    })
}
