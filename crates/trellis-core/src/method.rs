//! HTTP method helpers for route registration
//!
//! Endpoints are keyed by [`http::Method`] directly, which means extension
//! methods such as `PURGE` or `LINK` work without any global registration.

use crate::error::RouteError;
use http::Method;

/// The methods an "any method" registration expands to.
///
/// Kept sorted by name so `Allow` headers and walk output are stable.
pub const STANDARD_METHODS: [Method; 9] = [
    Method::CONNECT,
    Method::DELETE,
    Method::GET,
    Method::HEAD,
    Method::OPTIONS,
    Method::PATCH,
    Method::POST,
    Method::PUT,
    Method::TRACE,
];

/// Which methods an endpoint answers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodFilter {
    /// Every method, including extension methods.
    Any,
    /// Exactly one method.
    One(Method),
}

impl MethodFilter {
    pub fn matches(&self, method: &Method) -> bool {
        match self {
            MethodFilter::Any => true,
            MethodFilter::One(m) => m == method,
        }
    }
}

impl From<Method> for MethodFilter {
    fn from(method: Method) -> Self {
        MethodFilter::One(method)
    }
}

/// Split a `"METHOD /path"` registration into its method and path.
///
/// Plain patterns come back with [`MethodFilter::Any`].
pub fn split_method_pattern(pattern: &str) -> Result<(MethodFilter, &str), RouteError> {
    let trimmed = pattern.trim();
    match trimmed.split_once(|c: char| c == ' ' || c == '\t') {
        Some((method, path)) if !trimmed.starts_with('/') => {
            let method = Method::from_bytes(method.as_bytes())
                .map_err(|_| RouteError::InvalidMethod(method.to_string()))?;
            Ok((MethodFilter::One(method), path.trim_start()))
        }
        _ => Ok((MethodFilter::Any, trimmed)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_method_pattern() {
        assert_eq!(
            split_method_pattern("GET /users").unwrap(),
            (MethodFilter::One(Method::GET), "/users")
        );
        assert_eq!(
            split_method_pattern("PURGE   /cache/{key}").unwrap(),
            (
                MethodFilter::One(Method::from_bytes(b"PURGE").unwrap()),
                "/cache/{key}"
            )
        );
        assert_eq!(split_method_pattern("/plain").unwrap(), (MethodFilter::Any, "/plain"));
    }

    #[test]
    fn test_split_method_pattern_rejects_bad_method() {
        assert!(matches!(
            split_method_pattern("G(T /x"),
            Err(RouteError::InvalidMethod(_))
        ));
    }

    #[test]
    fn test_filter_matches() {
        assert!(MethodFilter::Any.matches(&Method::DELETE));
        assert!(MethodFilter::One(Method::GET).matches(&Method::GET));
        assert!(!MethodFilter::One(Method::GET).matches(&Method::POST));
    }
}
