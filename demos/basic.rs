//! Minimal plait example: one pipeline, four middleware, one handler.
//!
//! Run with:
//!   cargo run --example basic
//!
//! Try:
//!   curl -i http://localhost:3000/
//!   curl -i -H 'authorization: Bearer t' http://localhost:3000/hello
//!   curl -i -H 'authorization: Bearer t' http://localhost:3000/old
//!   curl -i -H 'authorization: Bearer t' http://localhost:3000/teapot

use http::{StatusCode, header};
use plait::{
    Container, DefaultContainer, Handler, HandlerFunc, Middleware, Server, StatusError,
    middleware, to_middleware,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let app = Handler::new(hello).wrap([
        middleware::recover(),
        middleware::trace(),
        to_middleware(cors),
        Middleware::from_fn(require_token),
        Middleware::from_fn(legacy_paths),
    ]);

    Server::bind("0.0.0.0:3000")
        .serve(app.to_handler_func(DefaultContainer::new))
        .await
        .expect("server error");
}

// A middleware written for the conventional (response, request) form.
fn cors(next: HandlerFunc) -> HandlerFunc {
    HandlerFunc::new(move |rw, req| {
        rw.set_header(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*");
        next.serve(rw, req);
    })
}

// Short-circuits: without a token nothing downstream runs.
fn require_token(c: &mut DefaultContainer, next: &Handler<DefaultContainer>) {
    if c.request().headers().contains_key(header::AUTHORIZATION) {
        next.handle(c);
    } else {
        c.error(StatusCode::UNAUTHORIZED, &"missing authorization header");
    }
}

fn legacy_paths(c: &mut DefaultContainer, next: &Handler<DefaultContainer>) {
    let path = c.request().uri().path().to_owned();
    match path.as_str() {
        "/old" => c.redirect("/hello", StatusCode::MOVED_PERMANENTLY),
        // recover turns this into a 418 response.
        "/teapot" => std::panic::panic_any(StatusError::from(StatusCode::IM_A_TEAPOT)),
        _ => {
            c.url_values().set("name", path.trim_start_matches('/'));
            next.handle(c);
        }
    }
}

fn hello(c: &mut DefaultContainer) {
    let name = match c.url_values().get("name") {
        Some(name) if !name.is_empty() => name.to_owned(),
        _ => "world".to_owned(),
    };
    c.response_writer().write(format!("hello, {name}\n"));
}
