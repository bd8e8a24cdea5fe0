//! # plait
//!
//! Small, composable middleware chains for HTTP handlers.
//! Nothing more. Nothing less.
//!
//! ## The contract
//!
//! A [`Handler`] does the work for one request. A [`Middleware`] turns one
//! handler into another. Chains of middleware compose into a single
//! middleware, and [`Middleware::finish`] closes the chain with a terminal
//! handler. Declaration order is execution order, and every middleware
//! decides for itself whether to call `next`.
//!
//! What plait leaves to others:
//!
//! - **Routing**: match the URL first, then hand the request to a pipeline
//! - **Request parsing, TLS, connections**: hyper and your proxy own those
//!
//! What's left for plait:
//!
//! - The chaining algebra: [`Middleware::then`], [`Middleware::queue`],
//!   [`Handler::wrap`]
//! - Interop with `(response, request)` style middleware: [`to_middleware`],
//!   [`Handler::to_handler_func`]
//! - A thin hyper host with graceful shutdown: [`Server`]
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use http::{StatusCode, header};
//! use plait::{Container, DefaultContainer, Handler, HandlerFunc, Middleware, Server};
//! use plait::{middleware, to_middleware};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), plait::Error> {
//!     let require_token = Middleware::from_fn(|c: &mut DefaultContainer, next: &Handler<_>| {
//!         if c.request().headers().contains_key(header::AUTHORIZATION) {
//!             next.handle(c);
//!         } else {
//!             c.response_writer().write_header(StatusCode::UNAUTHORIZED);
//!         }
//!     });
//!
//!     // Middleware written for the two-argument form plugs straight in.
//!     let cors = to_middleware(|next: HandlerFunc| {
//!         HandlerFunc::new(move |rw, req| {
//!             rw.set_header(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*");
//!             next.serve(rw, req);
//!         })
//!     });
//!
//!     let app = Handler::new(|c: &mut DefaultContainer| c.response_writer().write("hello"))
//!         .wrap([middleware::recover(), middleware::trace(), cors, require_token]);
//!
//!     Server::bind("0.0.0.0:3000")
//!         .serve(app.to_handler_func(DefaultContainer::new))
//!         .await
//! }
//! ```

mod container;
mod error;
mod handler;
mod legacy;
mod request;
mod response;
mod server;

pub mod middleware;

pub use container::{Container, DefaultContainer};
pub use error::{Error, StatusError};
pub use handler::Handler;
pub use legacy::{HandlerFunc, to_middleware};
pub use middleware::Middleware;
pub use request::{RemoteAddr, Request, UrlValues};
pub use response::{ContentType, ResponseWriter};
pub use server::Server;
