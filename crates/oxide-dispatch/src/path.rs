//! Path pattern matching.

use regex::Regex;
use std::collections::HashMap;

use crate::error::{Result, RouterError};
use crate::request::PathParams;

/// The pattern that registers a per-method wildcard route.
pub const WILDCARD: &str = "*";

/// A piece of a path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Literal text, matched verbatim.
    Literal(String),
    /// A parameter (e.g., `:id`), matching one or more non-slash characters.
    Param(String),
}

/// A compiled path pattern for matching URLs.
#[derive(Debug, Clone)]
pub struct PathPattern {
    /// The original pattern string.
    pattern: String,
    /// Parsed segments.
    segments: Vec<PathSegment>,
    /// Compiled regex, anchored at both ends.
    regex: Regex,
    /// Parameter names in order.
    param_names: Vec<String>,
}

impl PathPattern {
    /// Parses a path pattern string.
    ///
    /// Pattern syntax:
    /// - `/users` - Literal path
    /// - `/users/:id` - Path with parameter
    ///
    /// The whole path must match; `/users` and `/users/` are distinct.
    /// Repeating a parameter name is rejected.
    ///
    /// # Example
    ///
    /// ```
    /// use oxide_dispatch::PathPattern;
    ///
    /// let pattern = PathPattern::parse("/posts/:id/comments/:comment_id").unwrap();
    /// let params = pattern.match_path("/posts/123/comments/456").unwrap();
    /// assert_eq!(params.get("id"), Some("123"));
    /// assert_eq!(params.get("comment_id"), Some("456"));
    /// ```
    pub fn parse(pattern: &str) -> Result<Self> {
        if !pattern.starts_with('/') {
            return Err(RouterError::InvalidPattern(format!(
                "{pattern:?} must start with '/'"
            )));
        }

        let segments = tokenize(pattern)?;
        let mut param_names: Vec<String> = Vec::new();
        let mut regex_str = String::from("^");

        for segment in &segments {
            match segment {
                PathSegment::Literal(text) => regex_str.push_str(&regex::escape(text)),
                PathSegment::Param(name) => {
                    if param_names.contains(name) {
                        return Err(RouterError::DuplicateParam {
                            pattern: pattern.to_string(),
                            name: name.clone(),
                        });
                    }
                    param_names.push(name.clone());
                    regex_str.push_str("([^/]+)");
                }
            }
        }

        regex_str.push('$');

        let regex = Regex::new(&regex_str)
            .map_err(|e| RouterError::InvalidPattern(format!("{pattern:?}: {e}")))?;

        Ok(Self {
            pattern: pattern.to_string(),
            segments,
            regex,
            param_names,
        })
    }

    /// Returns whether a pattern string denotes the wildcard slot.
    pub fn is_wildcard(pattern: &str) -> bool {
        pattern == WILDCARD
    }

    /// Attempts to match a path against this pattern.
    ///
    /// Returns extracted parameters if the path matches.
    pub fn match_path(&self, path: &str) -> Option<PathParams> {
        let caps = self.regex.captures(path)?;

        let mut params = PathParams::new();

        for (i, name) in self.param_names.iter().enumerate() {
            if let Some(value) = caps.get(i + 1) {
                params.insert(name.clone(), value.as_str());
            }
        }

        Some(params)
    }

    /// Returns the original pattern string.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Returns the parameter names.
    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    /// Generates a path from parameters.
    ///
    /// Returns `None` if a parameter is missing or its value contains `/`.
    ///
    /// # Example
    ///
    /// ```
    /// use std::collections::HashMap;
    /// use oxide_dispatch::PathPattern;
    ///
    /// let pattern = PathPattern::parse("/posts/:id").unwrap();
    /// let params: HashMap<String, String> =
    ///     [("id".to_string(), "123".to_string())]
    ///     .into_iter()
    ///     .collect();
    /// let path = pattern.reverse(&params).unwrap();
    /// assert_eq!(path, "/posts/123");
    /// ```
    pub fn reverse(&self, params: &HashMap<String, String>) -> Option<String> {
        let mut path = String::new();

        for segment in &self.segments {
            match segment {
                PathSegment::Literal(s) => path.push_str(s),
                PathSegment::Param(name) => {
                    let value = params.get(name).filter(|v| !v.is_empty() && !v.contains('/'))?;
                    path.push_str(value);
                }
            }
        }

        Some(path)
    }
}

/// Splits a pattern into literal runs and `:name` parameters.
fn tokenize(pattern: &str) -> Result<Vec<PathSegment>> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        if c != ':' {
            literal.push(c);
            continue;
        }

        let mut name = String::new();
        while let Some(&next) = chars.peek() {
            if next.is_ascii_alphanumeric() || next == '_' {
                name.push(next);
                chars.next();
            } else {
                break;
            }
        }

        if name.is_empty() {
            return Err(RouterError::InvalidPattern(format!(
                "{pattern:?} has a parameter without a name"
            )));
        }

        if !literal.is_empty() {
            segments.push(PathSegment::Literal(std::mem::take(&mut literal)));
        }
        segments.push(PathSegment::Param(name));
    }

    if !literal.is_empty() {
        segments.push(PathSegment::Literal(literal));
    }

    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_path() {
        let pattern = PathPattern::parse("/users").unwrap();
        assert!(pattern.match_path("/users").is_some());
        assert!(pattern.match_path("/users/").is_none());
        assert!(pattern.match_path("/users/1").is_none());
        assert!(pattern.match_path("/posts").is_none());
    }

    #[test]
    fn test_root_path() {
        let pattern = PathPattern::parse("/").unwrap();
        assert!(pattern.match_path("/").is_some());
        assert!(pattern.match_path("/x").is_none());
    }

    #[test]
    fn test_single_param() {
        let pattern = PathPattern::parse("/users/:id").unwrap();
        let params = pattern.match_path("/users/123").unwrap();
        assert_eq!(params.get("id"), Some("123"));
        assert!(pattern.match_path("/users/").is_none());
        assert!(pattern.match_path("/users/1/2").is_none());
    }

    #[test]
    fn test_multiple_params_in_order() {
        let pattern = PathPattern::parse("/posts/:post_id/comments/:comment_id").unwrap();
        assert_eq!(pattern.param_names(), ["post_id", "comment_id"]);
        let params = pattern.match_path("/posts/42/comments/7").unwrap();
        assert_eq!(params.get("post_id"), Some("42"));
        assert_eq!(params.get("comment_id"), Some("7"));
    }

    #[test]
    fn test_param_inside_segment() {
        let pattern = PathPattern::parse("/files/:name.json").unwrap();
        let params = pattern.match_path("/files/report.json").unwrap();
        assert_eq!(params.get("name"), Some("report"));
        assert!(pattern.match_path("/files/reportxjson").is_none());
    }

    #[test]
    fn test_metacharacters_are_literal() {
        let pattern = PathPattern::parse("/a+b/(c)").unwrap();
        assert!(pattern.match_path("/a+b/(c)").is_some());
        assert!(pattern.match_path("/aab/c").is_none());
    }

    #[test]
    fn test_duplicate_param_rejected() {
        let err = PathPattern::parse("/users/:id/friends/:id").unwrap_err();
        assert!(matches!(err, RouterError::DuplicateParam { ref name, .. } if name == "id"));
    }

    #[test]
    fn test_invalid_patterns() {
        assert!(matches!(
            PathPattern::parse("/users/:"),
            Err(RouterError::InvalidPattern(_))
        ));
        assert!(matches!(
            PathPattern::parse("users"),
            Err(RouterError::InvalidPattern(_))
        ));
    }

    #[test]
    fn test_wildcard_detection() {
        assert!(PathPattern::is_wildcard("*"));
        assert!(!PathPattern::is_wildcard("/*"));
    }

    #[test]
    fn test_reverse() {
        let pattern = PathPattern::parse("/posts/:id").unwrap();
        let params: HashMap<String, String> = [("id".to_string(), "123".to_string())]
            .into_iter()
            .collect();
        assert_eq!(pattern.reverse(&params), Some("/posts/123".to_string()));
    }

    #[test]
    fn test_reverse_missing_param() {
        let pattern = PathPattern::parse("/posts/:id").unwrap();
        let params: HashMap<String, String> = HashMap::new();
        assert!(pattern.reverse(&params).is_none());
    }
}
