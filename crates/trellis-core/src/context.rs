//! Per-request routing state
//!
//! A [`RouteContext`] travels inside every [`Request`](crate::Request). The
//! outermost router resets it once, then every router the request passes
//! through (mounted sub-routers included) appends to it:
//!
//! - URL parameters accumulate across mount boundaries, and lookups return
//!   the innermost binding.
//! - Matched route patterns are stacked so the full pattern can be rebuilt
//!   for logging and metrics, e.g. `/api/*` + `/users/{id}` gives
//!   `/api/users/{id}`.
//! - A mount point stores the unmatched remainder as the route path, which
//!   the sub-router routes on while the request URI stays untouched.

use crate::handler::BoxHandler;
use crate::params::Params;
use crate::pattern::CATCH_ALL_KEY;
use http::Method;
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// Routing state of a single request.
#[derive(Default)]
pub struct RouteContext {
    pub(crate) url_params: Params,
    pub(crate) route_params: Params,
    pub(crate) route_path: Option<String>,
    pub(crate) route_method: Option<Method>,
    pub(crate) route_patterns: SmallVec<[Arc<str>; 2]>,
    pub(crate) methods_allowed: SmallVec<[Method; 4]>,
    pub(crate) method_not_allowed: bool,
    pub(crate) dispatched: bool,
    pub(crate) fallbacks: Fallbacks,
}

/// Handlers a mounted router falls back to when it has none of its own.
#[derive(Clone, Default)]
pub(crate) struct Fallbacks {
    pub(crate) not_found: Option<BoxHandler>,
    pub(crate) method_not_allowed: Option<BoxHandler>,
}

impl RouteContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all state, keeping allocated storage.
    pub fn reset(&mut self) {
        self.url_params.clear();
        self.route_params.clear();
        self.route_path = None;
        self.route_method = None;
        self.route_patterns.clear();
        self.methods_allowed.clear();
        self.method_not_allowed = false;
        self.dispatched = false;
        self.fallbacks = Fallbacks::default();
    }

    /// The most recent value bound to `key`.
    pub fn url_param(&self, key: &str) -> Option<&str> {
        self.url_params.get(key)
    }

    /// All URL parameters bound so far, outermost router first.
    pub fn url_params(&self) -> &Params {
        &self.url_params
    }

    /// Parameters captured by the most recent tree lookup.
    pub fn route_params(&self) -> &Params {
        &self.route_params
    }

    /// Bind a URL parameter.
    pub fn add_param(&mut self, key: impl Into<Arc<str>>, value: impl Into<String>) {
        self.url_params.push(key, value);
    }

    /// Path override used for routing instead of the request URI path.
    pub fn route_path(&self) -> Option<&str> {
        self.route_path.as_deref()
    }

    pub fn set_route_path(&mut self, path: impl Into<String>) {
        self.route_path = Some(path.into());
    }

    /// Method override used for routing instead of the request method.
    pub fn route_method(&self) -> Option<&Method> {
        self.route_method.as_ref()
    }

    pub fn set_route_method(&mut self, method: Method) {
        self.route_method = Some(method);
    }

    /// Patterns matched so far, one per router crossed.
    pub fn route_patterns(&self) -> &[Arc<str>] {
        &self.route_patterns
    }

    /// Methods registered on the path when the last lookup ended in a
    /// method mismatch.
    pub fn methods_allowed(&self) -> &[Method] {
        &self.methods_allowed
    }

    pub fn is_method_not_allowed(&self) -> bool {
        self.method_not_allowed
    }

    /// The full route pattern matched so far.
    ///
    /// Mount wildcards between routers are collapsed, and a trailing slash
    /// left by a mount root is trimmed:
    ///
    /// `["/api/*", "/users/{id}"]` becomes `/api/users/{id}`.
    pub fn route_pattern(&self) -> String {
        let mut pattern = self.route_patterns.concat();
        while pattern.contains("/*/") {
            pattern = pattern.replace("/*/", "/");
        }
        if pattern != "/" {
            if let Some(trimmed) = pattern.strip_suffix("//") {
                pattern = trimmed.to_string();
            }
            if let Some(trimmed) = pattern.strip_suffix('/') {
                pattern = trimmed.to_string();
            }
        }
        pattern
    }

    /// The path a mounted router should route on: `/` followed by the
    /// catch-all remainder of the last lookup.
    pub(crate) fn next_route_path(&self) -> String {
        match self.route_params.iter().last() {
            Some((CATCH_ALL_KEY, rest)) => format!("/{}", rest),
            _ => "/".to_string(),
        }
    }
}

impl fmt::Debug for RouteContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteContext")
            .field("url_params", &self.url_params)
            .field("route_path", &self.route_path)
            .field("route_method", &self.route_method)
            .field("route_patterns", &self.route_patterns)
            .field("methods_allowed", &self.methods_allowed)
            .field("method_not_allowed", &self.method_not_allowed)
            .finish()
    }
}
