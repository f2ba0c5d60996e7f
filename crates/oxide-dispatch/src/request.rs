//! HTTP request type.

use std::collections::HashMap;
use std::num::IntErrorKind;
use std::str::FromStr;

use crate::error::RouterError;

/// HTTP request methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET method
    Get,
    /// POST method
    Post,
    /// PUT method
    Put,
    /// PATCH method
    Patch,
    /// DELETE method
    Delete,
    /// HEAD method
    Head,
    /// OPTIONS method
    Options,
}

impl Method {
    /// Returns the method as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }
}

impl FromStr for Method {
    type Err = RouterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            _ => Err(RouterError::UnknownMethod(s.to_string())),
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Path parameters extracted from the URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    params: HashMap<String, String>,
}

impl PathParams {
    /// Creates new empty path params.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a parameter.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.insert(key.into(), value.into());
    }

    /// Gets a parameter value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Parses a parameter as a specific type.
    pub fn parse<T: FromStr>(&self, key: &str) -> Option<T> {
        self.get(key).and_then(|v| v.parse().ok())
    }

    /// Returns the number of parameters.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Returns whether no parameter was captured.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Returns an iterator over the parameters.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns the parameters as a plain map.
    pub fn as_map(&self) -> &HashMap<String, String> {
        &self.params
    }
}

/// A request body decoded eagerly by the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedBody {
    /// A JSON document.
    Json(serde_json::Value),
    /// `application/x-www-form-urlencoded` fields.
    Form(HashMap<String, String>),
}

impl ParsedBody {
    /// Returns the JSON document, if the body was decoded as JSON.
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Form(_) => None,
        }
    }

    /// Returns the form fields, if the body was decoded as a form.
    pub fn as_form(&self) -> Option<&HashMap<String, String>> {
        match self {
            Self::Form(fields) => Some(fields),
            Self::Json(_) => None,
        }
    }
}

/// An HTTP request as seen by middleware and handlers.
///
/// The raw `body` is never consumed by routing: eager decoding reads it by
/// reference and stores the result in `parsed`, so a handler can still read
/// the original bytes.
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP method.
    pub method: Method,
    /// The request target as received (path and query string).
    pub uri: String,
    /// Request path, without the query string.
    pub path: String,
    /// Path parameters extracted from URL patterns.
    pub params: PathParams,
    /// Query string parameters, parsed when the request is dispatched.
    pub query: HashMap<String, String>,
    /// Request headers.
    pub headers: HashMap<String, String>,
    /// Raw request body.
    pub body: Vec<u8>,
    /// Body decoded by the matched route's options.
    pub parsed: Option<ParsedBody>,
}

impl Request {
    /// Creates a new request for a target such as `/search?q=rust`.
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        let uri = target.into();
        let path = match uri.split_once('?') {
            Some((path, _)) => path.to_string(),
            None => uri.clone(),
        };
        Self {
            method,
            uri,
            path,
            params: PathParams::new(),
            query: HashMap::new(),
            headers: HashMap::new(),
            body: Vec::new(),
            parsed: None,
        }
    }

    /// Creates a GET request.
    pub fn get(target: impl Into<String>) -> Self {
        Self::new(Method::Get, target)
    }

    /// Creates a POST request.
    pub fn post(target: impl Into<String>) -> Self {
        Self::new(Method::Post, target)
    }

    /// Sets a header.
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets a JSON body along with its content type and length.
    #[must_use]
    pub fn json_body(self, value: &serde_json::Value) -> Self {
        let body = value.to_string().into_bytes();
        let len = body.len();
        self.header("Content-Type", "application/json")
            .header("Content-Length", len.to_string())
            .body(body)
    }

    /// Returns the raw query string, if the target carries one.
    pub fn query_string(&self) -> Option<&str> {
        self.uri.split_once('?').map(|(_, query)| query)
    }

    /// Gets a header value.
    pub fn get_header(&self, key: &str) -> Option<&str> {
        // Case-insensitive header lookup
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Gets a query parameter.
    pub fn get_query(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    /// Returns the declared `Content-Length`, if present and numeric.
    ///
    /// A length too large for `u64` saturates to `u64::MAX`.
    pub fn content_length(&self) -> Option<u64> {
        let value = self.get_header("Content-Length")?.trim();
        match value.parse::<u64>() {
            Ok(len) => Some(len),
            Err(e) if *e.kind() == IntErrorKind::PosOverflow => Some(u64::MAX),
            Err(_) => None,
        }
    }

    /// Returns the media type of the body, lower-cased and without parameters.
    pub fn content_type(&self) -> Option<String> {
        self.get_header("Content-Type").map(|v| {
            v.split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase()
        })
    }

    /// Returns whether the body is declared as JSON.
    pub fn is_json(&self) -> bool {
        self.content_type()
            .is_some_and(|ct| ct == "application/json" || ct.ends_with("+json"))
    }

    /// Returns whether the body is declared as a urlencoded form.
    pub fn is_form(&self) -> bool {
        self.content_type()
            .is_some_and(|ct| ct == "application/x-www-form-urlencoded")
    }

    /// Returns the body as a string.
    pub fn body_string(&self) -> Option<String> {
        String::from_utf8(self.body.clone()).ok()
    }

    /// Parses the body as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Rebuilds this request for another path, keeping the method, headers,
    /// body and query string. Params, query map and parsed body start empty.
    pub fn with_path(&self, path: &str) -> Self {
        let target = match self.query_string() {
            Some(query) => format!("{path}?{query}"),
            None => path.to_string(),
        };
        let mut req = Self::new(self.method, target);
        req.headers = self.headers.clone();
        req.body = self.body.clone();
        req
    }

    /// Parses query parameters from a query string.
    pub fn parse_query_string(query: &str) -> HashMap<String, String> {
        query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .filter_map(|pair| {
                let mut parts = pair.splitn(2, '=');
                let key = parts.next()?;
                let value = parts.next().unwrap_or("");
                Some((urlencoding_decode(key), urlencoding_decode(value)))
            })
            .collect()
    }
}

/// Percent-decodes a urlencoded component, treating `+` as a space.
fn urlencoding_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let decoded = bytes
                    .get(i + 1..i + 3)
                    .and_then(|hex| std::str::from_utf8(hex).ok())
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok());
                if let Some(byte) = decoded {
                    out.push(byte);
                    i += 3;
                    continue;
                }
                out.push(b'%');
            }
            b'+' => out.push(b' '),
            b => out.push(b),
        }
        i += 1;
    }

    String::from_utf8_lossy(&out).into_owned()
}
