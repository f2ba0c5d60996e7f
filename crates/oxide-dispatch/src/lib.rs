//! # oxide-dispatch
//!
//! The request-dispatch core of an HTTP server: route table, onion-ordered
//! middleware and nested mounts.
//!
//! This crate provides:
//! - Path patterns with `:name` parameters and a per-method `*` fallback
//! - HTTP method-based routing, first registered route wins
//! - Middleware wrapped around handlers (`next`-style, onion order)
//! - Route-local middleware, eager JSON/form decoding and validation
//! - Servers mounted under a path prefix, with 404 fall-through
//! - Named routes for reverse URL lookup
//!
//! Sockets, TLS and HTTP parsing are left to the transport: it builds a
//! [`Request`], calls [`Server::dispatch`] and writes out the [`Response`].
//!
//! ## Quick Start
//!
//! ```
//! use oxide_dispatch::{Request, Response, Result, Server};
//!
//! async fn user_handler(req: Request) -> Result<Response> {
//!     let id = req.params.get("id").unwrap_or("unknown");
//!     Ok(Response::json(&serde_json::json!({"id": id})))
//! }
//!
//! # tokio_test::block_on(async {
//! let server = Server::new().get("/user/:id", user_handler)?;
//!
//! let response = server.dispatch(Request::get("/user/42")).await;
//! assert_eq!(response.status, 200);
//! # Ok::<(), oxide_dispatch::RouterError>(())
//! # }).unwrap();
//! ```
//!
//! ## Middleware
//!
//! Middleware receives the request and the rest of the chain. The first
//! registered middleware is outermost: it runs first and sees the response
//! last.
//!
//! ```ignore
//! let server = Server::new()
//!     .middleware(LoggingMiddleware)
//!     .middleware_fn(|req, next| async move {
//!         let res = next.run(req).await?;
//!         Ok(res.header("X-Served-By", "oxide"))
//!     });
//! ```
//!
//! ## Route options
//!
//! ```ignore
//! let config = RouteConfig::new()
//!     .parse_json()
//!     .validate(|req| Ok(req.parsed.is_some()));
//!
//! let server = Server::new().route_with(Method::Post, "/submit", submit, config)?;
//! ```
//!
//! ## Mounts
//!
//! ```ignore
//! let files = Server::new().get("/", list_files)?.get("/:name", read_file)?;
//!
//! // `/files` reaches the child's `/`, `/files/a.txt` its `/:name`.
//! let server = Server::new().mount("/files", files).get("/", home)?;
//! ```
//!
//! ## Errors
//!
//! Handler and middleware errors, body decoding failures and panics are
//! turned into a response once, at the outermost server: by
//! [`ServerOptions::error_handler`] if set, otherwise as a plain 500.

mod error;
mod middleware;
mod mount;
mod options;
mod path;
mod request;
mod response;
mod server;
mod table;

pub use error::{Result, RouterError};
pub use middleware::{
    handler_fn, BoxFuture, FnMiddleware, Handler, LoggingMiddleware, Middleware,
    MiddlewareChain, Next,
};
pub use mount::Mount;
pub use options::{
    ErrorHandler, RouteConfig, ServerOptions, Validator, DEFAULT_MAX_BODY_SIZE,
};
pub use path::{PathPattern, PathSegment, WILDCARD};
pub use request::{Method, ParsedBody, PathParams, Request};
pub use response::Response;
pub use server::Server;
pub use table::{Route, RouteMatch, RouteTable};
