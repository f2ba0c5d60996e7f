//! Per-method route table.

use std::collections::HashMap;

use crate::error::{Result, RouterError};
use crate::middleware::Handler;
use crate::options::RouteConfig;
use crate::path::PathPattern;
use crate::request::{Method, PathParams};

/// A single route definition.
#[derive(Clone)]
pub struct Route {
    /// Optional route name for reverse URL lookup.
    pub name: Option<String>,
    /// HTTP method.
    pub method: Method,
    /// Path pattern; `None` for a wildcard route.
    pub pattern: Option<PathPattern>,
    /// Request handler.
    pub handler: Handler,
    /// Route-local middleware and options.
    pub config: RouteConfig,
}

impl Route {
    /// Returns whether this route fills a wildcard slot.
    pub fn is_wildcard(&self) -> bool {
        self.pattern.is_none()
    }

    /// Returns the pattern as registered.
    pub fn pattern_str(&self) -> &str {
        self.pattern
            .as_ref()
            .map_or(crate::path::WILDCARD, PathPattern::pattern)
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("name", &self.name)
            .field("method", &self.method)
            .field("pattern", &self.pattern_str())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// A resolved route and the parameters captured from the path.
#[derive(Debug, Clone)]
pub struct RouteMatch<'a> {
    /// The matched route.
    pub route: &'a Route,
    /// Captured parameters; empty for the wildcard.
    pub params: PathParams,
}

/// Routes grouped by method, tried in registration order.
#[derive(Clone, Default)]
pub struct RouteTable {
    routes: HashMap<Method, Vec<Route>>,
    wildcards: HashMap<Method, Route>,
    named: HashMap<String, PathPattern>,
}

impl RouteTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a route.
    ///
    /// The pattern `*` replaces the method's wildcard slot; any other pattern
    /// is compiled and appended after the method's existing routes.
    pub fn register(
        &mut self,
        method: Method,
        pattern: &str,
        handler: Handler,
        config: RouteConfig,
    ) -> Result<()> {
        self.insert(None, method, pattern, handler, config)
    }

    /// Registers a named route, so its path can be rebuilt with [`Self::url_for`].
    pub fn register_named(
        &mut self,
        name: &str,
        method: Method,
        pattern: &str,
        handler: Handler,
        config: RouteConfig,
    ) -> Result<()> {
        self.insert(Some(name.to_string()), method, pattern, handler, config)
    }

    fn insert(
        &mut self,
        name: Option<String>,
        method: Method,
        pattern: &str,
        handler: Handler,
        config: RouteConfig,
    ) -> Result<()> {
        if PathPattern::is_wildcard(pattern) {
            if name.is_some() {
                return Err(RouterError::InvalidPattern(
                    "wildcard routes cannot be named".to_string(),
                ));
            }
            self.wildcards.insert(
                method,
                Route {
                    name,
                    method,
                    pattern: None,
                    handler,
                    config,
                },
            );
            return Ok(());
        }

        let compiled = PathPattern::parse(pattern)?;
        if let Some(name) = &name {
            self.named.insert(name.clone(), compiled.clone());
        }
        self.routes.entry(method).or_default().push(Route {
            name,
            method,
            pattern: Some(compiled),
            handler,
            config,
        });
        Ok(())
    }

    /// Finds the route for a request.
    ///
    /// Concrete routes win in registration order; the wildcard is only a
    /// fallback.
    pub fn resolve(&self, method: Method, path: &str) -> Option<RouteMatch<'_>> {
        let concrete = self.routes.get(&method).and_then(|routes| {
            routes.iter().find_map(|route| {
                let params = route.pattern.as_ref()?.match_path(path)?;
                Some(RouteMatch { route, params })
            })
        });

        concrete.or_else(|| {
            self.wildcards.get(&method).map(|route| RouteMatch {
                route,
                params: PathParams::new(),
            })
        })
    }

    /// Returns the concrete routes registered for a method.
    pub fn routes(&self, method: Method) -> &[Route] {
        self.routes.get(&method).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns the wildcard route of a method, if any.
    pub fn wildcard(&self, method: Method) -> Option<&Route> {
        self.wildcards.get(&method)
    }

    /// Generates a URL for a named route.
    pub fn url_for(&self, name: &str, params: &HashMap<String, String>) -> Option<String> {
        self.named.get(name).and_then(|p| p.reverse(params))
    }

    /// Returns the number of routes, wildcards included.
    pub fn len(&self) -> usize {
        self.routes.values().map(Vec::len).sum::<usize>() + self.wildcards.len()
    }

    /// Returns whether no route is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::handler_fn;
    use crate::response::Response;

    fn tagged(tag: &'static str) -> Handler {
        handler_fn(move |_req| async move { Ok(Response::text(tag)) })
    }

    fn table() -> RouteTable {
        let mut table = RouteTable::new();
        table
            .register(Method::Get, "/user/:id", tagged("user"), RouteConfig::new())
            .unwrap();
        table
            .register(Method::Get, "/user/me", tagged("me"), RouteConfig::new())
            .unwrap();
        table
    }

    #[test]
    fn test_resolve_captures_params() {
        let table = table();
        let found = table.resolve(Method::Get, "/user/42").unwrap();
        assert_eq!(found.route.pattern_str(), "/user/:id");
        assert_eq!(found.params.get("id"), Some("42"));
    }

    #[test]
    fn test_first_registered_wins() {
        let table = table();
        let found = table.resolve(Method::Get, "/user/me").unwrap();
        assert_eq!(found.route.pattern_str(), "/user/:id");
        assert_eq!(found.params.get("id"), Some("me"));
    }

    #[test]
    fn test_unknown_method_and_path() {
        let table = table();
        assert!(table.resolve(Method::Post, "/user/42").is_none());
        assert!(table.resolve(Method::Get, "/missing").is_none());
        assert!(table.resolve(Method::Get, "/user/42/").is_none());
    }

    #[test]
    fn test_wildcard_is_fallback_only() {
        let mut table = table();
        table
            .register(Method::Get, "*", tagged("any"), RouteConfig::new())
            .unwrap();

        let found = table.resolve(Method::Get, "/user/7").unwrap();
        assert!(!found.route.is_wildcard());

        let found = table.resolve(Method::Get, "/elsewhere/deep").unwrap();
        assert!(found.route.is_wildcard());
        assert!(found.params.is_empty());
        assert!(table.resolve(Method::Put, "/elsewhere").is_none());
    }

    #[test]
    fn test_last_wildcard_wins() {
        let mut table = RouteTable::new();
        table
            .register(Method::Options, "*", tagged("first"), RouteConfig::new())
            .unwrap();
        table
            .register(Method::Options, "*", tagged("second"), RouteConfig::new().parse_json())
            .unwrap();

        assert_eq!(table.len(), 1);
        let wildcard = table.wildcard(Method::Options).unwrap();
        assert!(wildcard.config.parse_json);
    }

    #[test]
    fn test_register_rejects_duplicate_params() {
        let mut table = RouteTable::new();
        let err = table
            .register(Method::Get, "/a/:x/:x", tagged("dup"), RouteConfig::new())
            .unwrap_err();
        assert!(matches!(err, RouterError::DuplicateParam { .. }));
        assert!(table.is_empty());
    }

    #[test]
    fn test_named_route() {
        let mut table = RouteTable::new();
        table
            .register_named(
                "user_detail",
                Method::Get,
                "/users/:id",
                tagged("user"),
                RouteConfig::new(),
            )
            .unwrap();

        let params: HashMap<String, String> =
            [("id".to_string(), "42".to_string())].into_iter().collect();
        assert_eq!(
            table.url_for("user_detail", &params),
            Some("/users/42".to_string())
        );
        assert_eq!(table.url_for("nope", &params), None);
        assert_eq!(table.routes(Method::Get).len(), 1);
    }
}
