//! Mounting a server under a path prefix.

use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::request::Request;
use crate::response::Response;
use crate::server::Server;

/// Global middleware delegating a path prefix to a child server.
///
/// Requests under the prefix are rewritten (prefix stripped, query kept) and
/// handed to the child. A 404 from the child falls through to the rest of the
/// parent's chain, so later mounts and the parent's own routes still get a
/// chance. Errors the child does not handle itself propagate to the parent.
pub struct Mount {
    prefix: String,
    child: Arc<Server>,
}

impl Mount {
    /// Creates a mount for `prefix`, normalized to `/segment` form.
    pub fn new(prefix: &str, child: Server) -> Self {
        Self {
            prefix: normalize_prefix(prefix),
            child: Arc::new(child),
        }
    }

    /// Returns the normalized prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the path as seen by the child, or `None` if the prefix does
    /// not apply. The prefix must end on a segment boundary.
    pub fn strip<'p>(&self, path: &'p str) -> Option<&'p str> {
        if self.prefix == "/" {
            return Some(path);
        }
        match path.strip_prefix(self.prefix.as_str())? {
            "" => Some("/"),
            rest if rest.starts_with('/') => Some(rest),
            _ => None,
        }
    }
}

impl Middleware for Mount {
    fn handle<'a>(&'a self, req: Request, next: Next) -> BoxFuture<'a, Result<Response>> {
        Box::pin(async move {
            let Some(child_path) = self.strip(&req.path) else {
                return next.run(req).await;
            };

            debug!(
                prefix = %self.prefix,
                path = %req.path,
                child_path,
                "delegating to mounted server"
            );
            let child_req = req.with_path(child_path);

            let res = self.child.handle(child_req).await?;
            if res.status == 404 {
                debug!(prefix = %self.prefix, path = %req.path, "mounted server fell through");
                return next.run(req).await;
            }
            Ok(res)
        })
    }
}

impl Server {
    /// Mounts `child` under `prefix`.
    ///
    /// The mount is global middleware, so it runs at the position it was
    /// registered in, relative to other middleware.
    #[must_use]
    pub fn mount(self, prefix: &str, child: Server) -> Self {
        self.middleware(Mount::new(prefix, child))
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_end_matches('/');
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_prefix() {
        assert_eq!(normalize_prefix("files"), "/files");
        assert_eq!(normalize_prefix("/files/"), "/files");
        assert_eq!(normalize_prefix("/api/v1"), "/api/v1");
        assert_eq!(normalize_prefix("/"), "/");
        assert_eq!(normalize_prefix(""), "/");
    }

    #[test]
    fn test_strip() {
        let mount = Mount::new("/files", Server::new());
        assert_eq!(mount.strip("/files"), Some("/"));
        assert_eq!(mount.strip("/files/nested"), Some("/nested"));
        assert_eq!(mount.strip("/files/a/b"), Some("/a/b"));
        assert_eq!(mount.strip("/filesystem"), None);
        assert_eq!(mount.strip("/other"), None);
    }

    #[test]
    fn test_root_mount_sees_every_path() {
        let mount = Mount::new("/", Server::new());
        assert_eq!(mount.prefix(), "/");
        assert_eq!(mount.strip("/anything"), Some("/anything"));
    }
}
