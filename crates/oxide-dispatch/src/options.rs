//! Server and route configuration.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use serde::Deserialize;

use crate::error::{Result, RouterError};
use crate::middleware::{FnMiddleware, Middleware, MiddlewareChain, Next};
use crate::request::Request;
use crate::response::Response;

/// Default limit for a declared request body: 1 MiB.
pub const DEFAULT_MAX_BODY_SIZE: u64 = 1024 * 1024;

/// Converts a dispatch failure into a response.
///
/// It returns a plain `Response`, so it cannot fail; a panic inside it is not
/// caught.
pub type ErrorHandler = Arc<dyn Fn(&RouterError, &Request) -> Response + Send + Sync>;

/// A route-level check run after body decoding.
///
/// `Ok(false)` rejects the request with a 400; `Err` goes to the error
/// handler like any other dispatch failure.
pub type Validator = Arc<dyn Fn(&Request) -> Result<bool> + Send + Sync>;

/// Options fixed when a server is built and read during dispatch.
///
/// Everything but the error handler can be loaded from JSON:
///
/// ```
/// use oxide_dispatch::ServerOptions;
///
/// let options = ServerOptions::from_json(r#"{"max_body_size": 4096}"#).unwrap();
/// assert_eq!(options.max_body_size, 4096);
/// assert!(!options.debug);
/// ```
#[derive(Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerOptions {
    /// Log routing decisions at `info` instead of `debug`.
    pub debug: bool,
    /// Largest accepted `Content-Length`, in bytes.
    pub max_body_size: u64,
    /// Headers added to every response that does not already set them.
    pub default_headers: HashMap<String, String>,
    /// Custom error handler.
    #[serde(skip)]
    pub error_handler: Option<ErrorHandler>,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            debug: false,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            default_headers: HashMap::new(),
            error_handler: None,
        }
    }
}

impl std::fmt::Debug for ServerOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerOptions")
            .field("debug", &self.debug)
            .field("max_body_size", &self.max_body_size)
            .field("default_headers", &self.default_headers)
            .field("error_handler", &self.error_handler.is_some())
            .finish()
    }
}

impl ServerOptions {
    /// Creates the default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads options from a JSON document and validates them.
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self =
            serde_json::from_str(json).map_err(|e| RouterError::Config(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    /// Checks that the options are usable.
    pub fn validate(&self) -> Result<()> {
        if self.max_body_size == 0 {
            return Err(RouterError::Config(
                "max_body_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Enables debug logging of routing decisions.
    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Sets the body size limit.
    #[must_use]
    pub fn max_body_size(mut self, bytes: u64) -> Self {
        self.max_body_size = bytes;
        self
    }

    /// Adds a default response header.
    #[must_use]
    pub fn default_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(key.into(), value.into());
        self
    }

    /// Sets the error handler.
    #[must_use]
    pub fn error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&RouterError, &Request) -> Response + Send + Sync + 'static,
    {
        self.error_handler = Some(Arc::new(handler));
        self
    }
}

/// Per-route options: local middleware, eager body decoding and validation.
#[derive(Clone, Default)]
pub struct RouteConfig {
    /// Middleware run only for this route, inside the global chain.
    pub middleware: MiddlewareChain,
    /// Decode JSON bodies before the route runs.
    pub parse_json: bool,
    /// Decode urlencoded form bodies before the route runs.
    pub parse_url_encoded: bool,
    /// Predicate run after decoding.
    pub validate: Option<Validator>,
}

impl std::fmt::Debug for RouteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteConfig")
            .field("middleware", &self.middleware.len())
            .field("parse_json", &self.parse_json)
            .field("parse_url_encoded", &self.parse_url_encoded)
            .field("validate", &self.validate.is_some())
            .finish()
    }
}

impl RouteConfig {
    /// Creates an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds route-local middleware.
    #[must_use]
    pub fn middleware(mut self, mw: impl Middleware + 'static) -> Self {
        Arc::make_mut(&mut self.middleware).push(Arc::new(mw));
        self
    }

    /// Adds route-local middleware from an async closure.
    #[must_use]
    pub fn middleware_fn<F, Fut>(self, f: F) -> Self
    where
        F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response>> + Send + 'static,
    {
        self.middleware(FnMiddleware::new(f))
    }

    /// Decodes JSON bodies into `Request::parsed`.
    #[must_use]
    pub fn parse_json(mut self) -> Self {
        self.parse_json = true;
        self
    }

    /// Decodes urlencoded bodies into `Request::parsed`.
    #[must_use]
    pub fn parse_url_encoded(mut self) -> Self {
        self.parse_url_encoded = true;
        self
    }

    /// Sets the validation predicate.
    #[must_use]
    pub fn validate<F>(mut self, f: F) -> Self
    where
        F: Fn(&Request) -> Result<bool> + Send + Sync + 'static,
    {
        self.validate = Some(Arc::new(f));
        self
    }
}
