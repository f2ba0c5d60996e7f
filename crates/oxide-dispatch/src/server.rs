//! Request dispatcher and registration surface.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, error, info, warn};

use crate::error::{Result, RouterError};
use crate::middleware::{
    handler_fn, FnMiddleware, Handler, Middleware, MiddlewareChain, Next,
};
use crate::options::{RouteConfig, ServerOptions};
use crate::request::{Method, ParsedBody, Request};
use crate::response::Response;
use crate::table::RouteTable;

/// An HTTP application: routes, global middleware and options.
///
/// Registration consumes and returns the server, so it happens before the
/// server is shared. Dispatch only takes `&self`; clones share the same
/// routes and middleware.
#[derive(Clone, Default)]
pub struct Server {
    options: Arc<ServerOptions>,
    routes: Arc<RouteTable>,
    middleware: MiddlewareChain,
}

impl Server {
    /// Creates a server with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a server with the given options.
    pub fn with_options(options: ServerOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            options: Arc::new(options),
            ..Self::default()
        })
    }

    /// Returns the server options.
    pub fn options(&self) -> &ServerOptions {
        &self.options
    }

    /// Returns the route table.
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Appends global middleware. The first registered runs outermost.
    #[must_use]
    pub fn middleware(mut self, mw: impl Middleware + 'static) -> Self {
        Arc::make_mut(&mut self.middleware).push(Arc::new(mw));
        self
    }

    /// Appends global middleware from an async closure.
    #[must_use]
    pub fn middleware_fn<F, Fut>(self, f: F) -> Self
    where
        F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response>> + Send + 'static,
    {
        self.middleware(FnMiddleware::new(f))
    }

    /// Adds a GET route.
    pub fn get<F, Fut>(self, path: &str, handler: F) -> Result<Self>
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response>> + Send + 'static,
    {
        self.route(Method::Get, path, handler)
    }

    /// Adds a POST route.
    pub fn post<F, Fut>(self, path: &str, handler: F) -> Result<Self>
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response>> + Send + 'static,
    {
        self.route(Method::Post, path, handler)
    }

    /// Adds a PUT route.
    pub fn put<F, Fut>(self, path: &str, handler: F) -> Result<Self>
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response>> + Send + 'static,
    {
        self.route(Method::Put, path, handler)
    }

    /// Adds a PATCH route.
    pub fn patch<F, Fut>(self, path: &str, handler: F) -> Result<Self>
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response>> + Send + 'static,
    {
        self.route(Method::Patch, path, handler)
    }

    /// Adds a DELETE route.
    pub fn delete<F, Fut>(self, path: &str, handler: F) -> Result<Self>
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response>> + Send + 'static,
    {
        self.route(Method::Delete, path, handler)
    }

    /// Adds an OPTIONS route.
    pub fn options_route<F, Fut>(self, path: &str, handler: F) -> Result<Self>
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response>> + Send + 'static,
    {
        self.route(Method::Options, path, handler)
    }

    /// Adds a HEAD route.
    pub fn head<F, Fut>(self, path: &str, handler: F) -> Result<Self>
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response>> + Send + 'static,
    {
        self.route(Method::Head, path, handler)
    }

    /// Adds a route with any method.
    pub fn route<F, Fut>(self, method: Method, path: &str, handler: F) -> Result<Self>
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response>> + Send + 'static,
    {
        self.route_with(method, path, handler, RouteConfig::default())
    }

    /// Adds a route with local middleware and options.
    pub fn route_with<F, Fut>(
        mut self,
        method: Method,
        path: &str,
        handler: F,
        config: RouteConfig,
    ) -> Result<Self>
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response>> + Send + 'static,
    {
        Arc::make_mut(&mut self.routes).register(method, path, handler_fn(handler), config)?;
        Ok(self)
    }

    /// Adds a named route.
    pub fn named_route<F, Fut>(
        mut self,
        name: &str,
        method: Method,
        path: &str,
        handler: F,
    ) -> Result<Self>
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response>> + Send + 'static,
    {
        Arc::make_mut(&mut self.routes).register_named(
            name,
            method,
            path,
            handler_fn(handler),
            RouteConfig::default(),
        )?;
        Ok(self)
    }

    /// Generates a URL for a named route.
    pub fn url_for(&self, name: &str, params: &HashMap<String, String>) -> Option<String> {
        self.routes.url_for(name, params)
    }

    /// Dispatches a request and always produces a response.
    ///
    /// Errors that the error handler does not cover become a generic 500.
    pub async fn dispatch(&self, req: Request) -> Response {
        let method = req.method;
        let path = req.path.clone();

        match self.handle(req).await {
            Ok(res) => res,
            Err(e) => {
                error!(%method, %path, error = %e, "unhandled error while dispatching");
                self.apply_default_headers(Response::internal_server_error())
            }
        }
    }

    /// Dispatches a request, returning errors the error handler does not cover.
    ///
    /// A mounted server is driven through this method, so its unhandled
    /// errors reach the parent.
    pub async fn handle(&self, mut req: Request) -> Result<Response> {
        if let Some(len) = req.content_length() {
            if len > self.options.max_body_size {
                warn!(
                    method = %req.method,
                    path = %req.path,
                    content_length = len,
                    max_body_size = self.options.max_body_size,
                    "request body too large"
                );
                return Ok(self.apply_default_headers(Response::payload_too_large()));
            }
        }

        req.query = req
            .query_string()
            .map(Request::parse_query_string)
            .unwrap_or_default();

        let snapshot = self.options.error_handler.is_some().then(|| req.clone());

        let next = Next::new(Arc::clone(&self.middleware), self.terminal());
        let result = AssertUnwindSafe(next.run(req))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(RouterError::Panic(panic_message(payload.as_ref()))));

        match (result, &self.options.error_handler, snapshot) {
            (Ok(res), _, _) => Ok(self.apply_default_headers(res)),
            (Err(e), Some(on_error), Some(snapshot)) => {
                warn!(method = %snapshot.method, path = %snapshot.path, error = %e, "request failed");
                Ok(self.apply_default_headers(on_error(&e, &snapshot)))
            }
            (Err(e), _, _) => Err(e),
        }
    }

    fn apply_default_headers(&self, mut res: Response) -> Response {
        for (key, value) in &self.options.default_headers {
            if res.get_header(key).is_none() {
                res.headers.insert(key.clone(), value.clone());
            }
        }
        res
    }

    /// The innermost step of the global chain: resolve and run the route.
    fn terminal(&self) -> Handler {
        let routes = Arc::clone(&self.routes);
        let verbose = self.options.debug;
        Arc::new(move |req| {
            let routes = Arc::clone(&routes);
            Box::pin(async move { run_route(&routes, req, verbose).await })
        })
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("options", &self.options)
            .field("routes", &self.routes.len())
            .field("middleware", &self.middleware.len())
            .finish()
    }
}

async fn run_route(routes: &RouteTable, mut req: Request, verbose: bool) -> Result<Response> {
    let Some(found) = routes.resolve(req.method, &req.path) else {
        log_routing(verbose, &req, "no route matched");
        return Ok(Response::not_found());
    };

    let route = found.route;
    log_routing(verbose, &req, route.pattern_str());
    req.params = found.params;

    decode_body(&route.config, &mut req)?;

    if let Some(validate) = &route.config.validate {
        if !validate(&req)? {
            log_routing(verbose, &req, "validation rejected");
            return Ok(Response::bad_request());
        }
    }

    Next::new(
        Arc::clone(&route.config.middleware),
        Arc::clone(&route.handler),
    )
    .run(req)
    .await
}

/// Eagerly decodes the body when the route asks for it and the content type
/// agrees. The raw bytes stay in `req.body`.
fn decode_body(config: &RouteConfig, req: &mut Request) -> Result<()> {
    if req.body.is_empty() {
        return Ok(());
    }

    if config.parse_json && req.is_json() {
        let value: serde_json::Value = serde_json::from_slice(&req.body)?;
        req.parsed = Some(ParsedBody::Json(value));
    } else if config.parse_url_encoded && req.is_form() {
        let text = std::str::from_utf8(&req.body)
            .map_err(|e| RouterError::InvalidBody(format!("form body is not UTF-8: {e}")))?;
        req.parsed = Some(ParsedBody::Form(Request::parse_query_string(text)));
    }

    Ok(())
}

fn log_routing(verbose: bool, req: &Request, outcome: &str) {
    if verbose {
        info!(method = %req.method, path = %req.path, outcome, "routing");
    } else {
        debug!(method = %req.method, path = %req.path, outcome, "routing");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn hello_handler(_req: Request) -> Result<Response> {
        Ok(Response::text("Hello, World!"))
    }

    async fn user_handler(req: Request) -> Result<Response> {
        let id = req.params.get("id").unwrap_or("unknown");
        Ok(Response::text(format!("User: {id}")))
    }

    #[tokio::test]
    async fn test_basic_routing() {
        let server = Server::new()
            .get("/", hello_handler)
            .unwrap()
            .get("/users/:id", user_handler)
            .unwrap();

        let res = server.dispatch(Request::get("/")).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body_string(), Some("Hello, World!".to_string()));
    }

    #[tokio::test]
    async fn test_path_params() {
        let server = Server::new().get("/users/:id", user_handler).unwrap();

        let res = server.dispatch(Request::get("/users/123")).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body_string(), Some("User: 123".to_string()));
    }

    #[tokio::test]
    async fn test_not_found_for_other_method() {
        let server = Server::new().get("/", hello_handler).unwrap();

        let res = server.dispatch(Request::post("/")).await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn test_query_is_parsed() {
        let server = Server::new()
            .get("/search", |req: Request| async move {
                Ok(Response::text(req.get_query("q").unwrap_or_default().to_string()))
            })
            .unwrap();

        let res = server.dispatch(Request::get("/search?q=oxide+router")).await;
        assert_eq!(res.body_string(), Some("oxide router".to_string()));
    }

    #[tokio::test]
    async fn test_invalid_options_rejected() {
        let err = Server::with_options(ServerOptions::new().max_body_size(0)).unwrap_err();
        assert!(matches!(err, RouterError::Config(_)));
    }

    #[tokio::test]
    async fn test_default_headers_do_not_override() {
        let options = ServerOptions::new()
            .default_header("X-Powered-By", "oxide")
            .default_header("Content-Type", "text/html");
        let server = Server::with_options(options)
            .unwrap()
            .get("/", hello_handler)
            .unwrap();

        let res = server.dispatch(Request::get("/")).await;
        assert_eq!(res.get_header("X-Powered-By"), Some("oxide"));
        assert_eq!(
            res.get_header("Content-Type"),
            Some("text/plain; charset=utf-8")
        );

        let res = server.dispatch(Request::get("/missing")).await;
        assert_eq!(res.status, 404);
        assert_eq!(res.get_header("X-Powered-By"), Some("oxide"));
    }

    #[tokio::test]
    async fn test_named_route() {
        let server = Server::new()
            .named_route("user_detail", Method::Get, "/users/:id", user_handler)
            .unwrap();

        let params: HashMap<String, String> =
            [("id".to_string(), "42".to_string())].into_iter().collect();
        assert_eq!(
            server.url_for("user_detail", &params),
            Some("/users/42".to_string())
        );
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }
}
