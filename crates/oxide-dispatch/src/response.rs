//! HTTP response type.

use std::collections::HashMap;

/// An HTTP response.
#[derive(Debug, Clone)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Response body.
    pub body: Vec<u8>,
}

impl Response {
    /// Creates a new response with the given status.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    /// Creates a 200 OK response.
    pub fn ok() -> Self {
        Self::new(200)
    }

    /// Creates a response with JSON content.
    pub fn json<T: serde::Serialize>(data: &T) -> Self {
        match serde_json::to_vec(data) {
            Ok(body) => Self::new(200)
                .header("Content-Type", "application/json")
                .body(body),
            Err(_) => Self::internal_server_error(),
        }
    }

    /// Creates a response with plain text content.
    pub fn text(body: impl Into<String>) -> Self {
        let body: String = body.into();
        Self::new(200)
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(body)
    }

    /// Creates a redirect response.
    pub fn redirect(url: impl Into<String>) -> Self {
        Self::new(302).header("Location", url)
    }

    /// Creates a JSON error response of the form `{"error": message}`.
    pub fn error(status: u16, message: &str) -> Self {
        Self::json(&serde_json::json!({ "error": message })).status(status)
    }

    /// Creates a 400 Bad Request response for a rejected route validation.
    pub fn bad_request() -> Self {
        Self::error(400, "Validation failed")
    }

    /// Creates a 404 Not Found response.
    ///
    /// Mounts detect exactly this status to fall through to the parent.
    pub fn not_found() -> Self {
        Self::error(404, "Not found")
    }

    /// Creates a 413 Payload Too Large response.
    pub fn payload_too_large() -> Self {
        Self::error(413, "Payload too large")
    }

    /// Creates a 500 Internal Server Error response.
    pub fn internal_server_error() -> Self {
        Self::new(500)
            .header("Content-Type", "application/json")
            .body(r#"{"error":"Internal server error"}"#)
    }

    /// Sets a header.
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Appends a value to a header as a comma-separated list.
    #[must_use]
    pub fn append_header(mut self, key: &str, value: &str) -> Self {
        let existing = self
            .headers
            .keys()
            .find(|k| k.eq_ignore_ascii_case(key))
            .cloned();
        match existing.and_then(|k| self.headers.get_mut(&k)) {
            Some(current) => {
                current.push(',');
                current.push_str(value);
            }
            None => {
                self.headers.insert(key.to_string(), value.to_string());
            }
        }
        self
    }

    /// Gets a header value.
    pub fn get_header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Sets the status code.
    #[must_use]
    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Returns the body as a string.
    pub fn body_string(&self) -> Option<String> {
        String::from_utf8(self.body.clone()).ok()
    }

    /// Parses the body as JSON.
    pub fn body_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_json() {
        let data = serde_json::json!({"name": "test"});
        let res = Response::json(&data);
        assert_eq!(res.status, 200);
        assert_eq!(res.get_header("content-type"), Some("application/json"));
        assert_eq!(res.body_json().unwrap(), data);
    }

    #[test]
    fn test_not_found_body() {
        let res = Response::not_found();
        assert_eq!(res.status, 404);
        assert_eq!(
            res.body_json().unwrap(),
            serde_json::json!({"error": "Not found"})
        );
    }

    #[test]
    fn test_internal_error_has_no_detail() {
        let res = Response::internal_server_error();
        assert_eq!(res.status, 500);
        assert_eq!(
            res.body_json().unwrap(),
            serde_json::json!({"error": "Internal server error"})
        );
    }

    #[test]
    fn test_append_header() {
        let res = Response::ok()
            .append_header("X-Trace", "A")
            .append_header("x-trace", "B");
        assert_eq!(res.get_header("X-Trace"), Some("A,B"));
        assert_eq!(res.headers.len(), 1);
    }

    #[test]
    fn test_response_builder() {
        let res = Response::ok().header("X-Custom", "value").body("Hello");

        assert_eq!(res.status, 200);
        assert_eq!(res.headers.get("X-Custom"), Some(&"value".to_string()));
        assert_eq!(res.body_string(), Some("Hello".to_string()));
    }
}
