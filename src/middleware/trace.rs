use std::time::Instant;

use tracing::{info, info_span};

use crate::container::Container;
use crate::handler::Handler;
use crate::middleware::Middleware;

/// Wraps every request in a `request` span carrying method and path, and logs
/// the final status and latency once downstream returns.
pub fn trace<C>() -> Middleware<C>
where
    C: Container + 'static,
{
    Middleware::from_fn(|c: &mut C, next: &Handler<C>| {
        let req = c.request();
        let span = info_span!("request", method = %req.method(), path = %req.uri().path());
        let _entered = span.enter();

        let started = Instant::now();
        next.handle(c);

        info!(
            status = c.response_writer().status().as_u16(),
            latency_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX),
            "request completed"
        );
    })
}
