//! Middleware support for request/response processing.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::error::Result;
use crate::request::Request;
use crate::response::Response;

/// A boxed future for async middleware operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A boxed async handler function.
pub type Handler = Arc<dyn Fn(Request) -> BoxFuture<'static, Result<Response>> + Send + Sync>;

/// An ordered middleware list, shared by every request of a server.
pub type MiddlewareChain = Arc<Vec<Arc<dyn Middleware>>>;

/// Boxes an async function into a [`Handler`].
pub fn handler_fn<F, Fut>(handler: F) -> Handler
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response>> + Send + 'static,
{
    Arc::new(move |req| Box::pin(handler(req)))
}

/// Trait for middleware wrapped around the handler.
///
/// Middleware sees the request on the way in and the response on the way
/// out. It can:
/// - Modify the request before passing it to `next`
/// - Short-circuit processing by returning a response without calling `next`
/// - Inspect or rewrite the response returned by `next`
/// - Fail by returning an error, which the dispatcher turns into a response
///
/// The first registered middleware is the outermost layer.
///
/// # Example
///
/// ```ignore
/// struct Timing;
///
/// impl Middleware for Timing {
///     fn handle<'a>(&'a self, req: Request, next: Next) -> BoxFuture<'a, Result<Response>> {
///         Box::pin(async move {
///             let started = Instant::now();
///             let res = next.run(req).await?;
///             Ok(res.header("X-Elapsed-Ms", started.elapsed().as_millis().to_string()))
///         })
///     }
/// }
/// ```
pub trait Middleware: Send + Sync {
    /// Processes a request, delegating to the rest of the chain through `next`.
    fn handle<'a>(&'a self, req: Request, next: Next) -> BoxFuture<'a, Result<Response>>;
}

/// The remainder of a middleware chain.
///
/// `run` consumes the continuation, so it can be invoked at most once. Dropping
/// it without running it short-circuits the chain.
pub struct Next {
    chain: MiddlewareChain,
    index: usize,
    endpoint: Handler,
}

impl Next {
    /// Creates a continuation that runs `chain` in order and then `endpoint`.
    pub fn new(chain: MiddlewareChain, endpoint: Handler) -> Self {
        Self {
            chain,
            index: 0,
            endpoint,
        }
    }

    /// Runs the next middleware, or the endpoint once the chain is exhausted.
    pub fn run(self, req: Request) -> BoxFuture<'static, Result<Response>> {
        Box::pin(async move {
            match self.chain.get(self.index).cloned() {
                Some(mw) => {
                    let next = Self {
                        chain: self.chain,
                        index: self.index + 1,
                        endpoint: self.endpoint,
                    };
                    mw.handle(req, next).await
                }
                None => (self.endpoint)(req).await,
            }
        })
    }

    /// Returns the number of middleware still ahead of the endpoint.
    pub fn remaining(&self) -> usize {
        self.chain.len().saturating_sub(self.index)
    }
}

/// Adapts an async closure into middleware.
pub struct FnMiddleware<F>(F);

impl<F> FnMiddleware<F> {
    /// Wraps a closure taking the request and the continuation.
    pub fn new<Fut>(f: F) -> Self
    where
        F: Fn(Request, Next) -> Fut + Send + Sync,
        Fut: Future<Output = Result<Response>> + Send + 'static,
    {
        Self(f)
    }
}

impl<F, Fut> Middleware for FnMiddleware<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response>> + Send + 'static,
{
    fn handle<'a>(&'a self, req: Request, next: Next) -> BoxFuture<'a, Result<Response>> {
        Box::pin((self.0)(req, next))
    }
}

/// Middleware that logs each request and its outcome.
pub struct LoggingMiddleware;

impl Middleware for LoggingMiddleware {
    fn handle<'a>(&'a self, req: Request, next: Next) -> BoxFuture<'a, Result<Response>> {
        Box::pin(async move {
            let method = req.method;
            let path = req.path.clone();
            let started = Instant::now();
            let result = next.run(req).await;
            let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
            match &result {
                Ok(res) => info!(%method, %path, status = res.status, elapsed_ms, "request completed"),
                Err(e) => warn!(%method, %path, error = %e, elapsed_ms, "request failed"),
            }
            result
        })
    }
}
