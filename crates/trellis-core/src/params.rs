//! URL parameter storage
//!
//! Parameters are kept as an ordered list of key/value pairs in a `SmallVec`,
//! so the common case of four or fewer parameters never touches the heap.
//! Keys are shared `Arc<str>` taken straight from the tree node that captured
//! them; only the values are allocated per request.
//!
//! Order matters: when a request crosses mount boundaries the same key may be
//! bound more than once, and lookups return the binding added last.

use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::Arc;

/// Number of parameters stored inline before spilling to the heap.
pub const STACK_PARAMS_CAPACITY: usize = 4;

/// Ordered URL parameters captured during routing.
#[derive(Debug, Clone, Default)]
pub struct Params {
    inner: SmallVec<[(Arc<str>, String); STACK_PARAMS_CAPACITY]>,
}

impl Params {
    /// Create an empty parameter list.
    #[inline]
    pub fn new() -> Self {
        Self {
            inner: SmallVec::new(),
        }
    }

    /// Append a binding.
    #[inline]
    pub fn push(&mut self, key: impl Into<Arc<str>>, value: impl Into<String>) {
        self.inner.push((key.into(), value.into()));
    }

    /// Value of the most recent binding for `key`.
    #[inline]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.inner
            .iter()
            .rev()
            .find(|(k, _)| &**k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Check if a key is bound.
    #[inline]
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.iter().any(|(k, _)| &**k == key)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Remove every binding, keeping the allocation.
    #[inline]
    pub fn clear(&mut self) {
        self.inner.clear();
    }

    /// Keys in binding order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.inner.iter().map(|(k, _)| &**k)
    }

    /// Values in binding order.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.inner.iter().map(|(_, v)| v.as_str())
    }

    /// Iterate over key-value pairs in binding order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, v)| (&**k, v.as_str()))
    }

    /// Append all bindings of `other`.
    pub fn extend_from(&mut self, other: &Params) {
        self.inner.extend(other.inner.iter().cloned());
    }

    /// Blank the value of the last binding when its key is `key`.
    ///
    /// Mounting uses this to hide the wildcard remainder from the sub-router
    /// once it has been turned into the route path.
    pub(crate) fn blank_last(&mut self, key: &str) {
        if let Some((k, v)) = self.inner.last_mut() {
            if &**k == key {
                v.clear();
            }
        }
    }

    /// Collapse into a map. Later bindings win over earlier ones.
    pub fn to_hashmap(&self) -> HashMap<String, String> {
        self.inner
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }
}

impl<K, V> FromIterator<(K, V)> for Params
where
    K: Into<Arc<str>>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            inner: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_params_on_stack() {
        let mut params = Params::new();
        params.push("id", "123");
        params.push("name", "test");

        assert_eq!(params.get("id"), Some("123"));
        assert_eq!(params.get("name"), Some("test"));
        assert_eq!(params.len(), 2);
        assert!(!params.inner.spilled());
    }

    #[test]
    fn test_many_params_spill_to_heap() {
        let mut params = Params::new();
        for i in 0..10 {
            params.push(format!("key{}", i), format!("value{}", i));
        }

        assert_eq!(params.len(), 10);
        assert!(params.inner.spilled());
    }

    #[test]
    fn test_last_binding_wins() {
        let params: Params = [("id", "outer"), ("slug", "x"), ("id", "inner")]
            .into_iter()
            .collect();

        assert_eq!(params.get("id"), Some("inner"));
        assert_eq!(params.keys().collect::<Vec<_>>(), ["id", "slug", "id"]);
        assert_eq!(params.to_hashmap().get("id").map(String::as_str), Some("inner"));
    }

    #[test]
    fn test_blank_last_only_touches_matching_key() {
        let mut params: Params = [("*", "a/b"), ("id", "1")].into_iter().collect();
        params.blank_last("*");
        assert_eq!(params.get("*"), Some("a/b"));

        params.push("*", "rest");
        params.blank_last("*");
        assert_eq!(params.get("*"), Some(""));
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_clear_keeps_capacity() {
        let mut params = Params::new();
        for i in 0..8 {
            params.push(format!("k{}", i), "v");
        }
        let capacity = params.inner.capacity();
        params.clear();
        assert!(params.is_empty());
        assert_eq!(params.inner.capacity(), capacity);
    }
}
