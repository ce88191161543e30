//! Response caching.
//!
//! - [`CacheKey`]: canonical key for an `(endpoint, query)` pair. Parameter
//!   order never matters; values are keyed on their wire form, so
//!   `limit=5` and `limit="5"` share an entry.
//!
//! - [`ResponseCache`]: bounded LRU + per-entry TTL store owned by a single
//!   client. See the [`response`] module docs for eviction details.

pub mod response;

pub use response::{CacheConfig, CacheEntry, ResponseCache};

use std::fmt;

use crate::params::QueryParams;

/// Deterministic cache key derived from an endpoint path and its query.
///
/// Rendered as `endpoint?k1=v1&k2=v2` with keys sorted and `%`, `&`, `=`
/// percent-escaped inside keys and values, so distinct requests never
/// collide.
///
/// ```rust
/// # use europarl_gateway::{CacheKey, QueryParams};
/// let a = QueryParams::new().with("country", "SE").with("limit", 5);
/// let b = QueryParams::new().with("limit", 5).with("country", "SE");
/// assert_eq!(CacheKey::new("/meps", &a), CacheKey::new("meps", &b));
/// assert_eq!(CacheKey::new("meps", &a).as_str(), "meps?country=SE&limit=5");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(endpoint: &str, params: &QueryParams) -> Self {
        Self::from_pairs(endpoint, params.to_pairs())
    }

    /// Build a key from arbitrary `(name, value)` pairs, sorting them first.
    pub fn from_pairs<I, K, V>(endpoint: &str, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut pairs: Vec<(String, String)> = pairs
            .into_iter()
            .map(|(k, v)| (escape(k.as_ref()), escape(v.as_ref())))
            .collect();
        pairs.sort();

        let mut key = normalize_endpoint(endpoint).to_owned();
        for (i, (k, v)) in pairs.iter().enumerate() {
            key.push(if i == 0 { '?' } else { '&' });
            key.push_str(k);
            key.push('=');
            key.push_str(v);
        }
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.0
    }
}

/// Strip leading and trailing slashes from an endpoint path.
pub(crate) fn normalize_endpoint(endpoint: &str) -> &str {
    endpoint.trim_matches('/')
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '%' => out.push_str("%25"),
            '&' => out.push_str("%26"),
            '=' => out.push_str("%3D"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_without_params_is_endpoint() {
        let key = CacheKey::new("/meps/show-current/", &QueryParams::new());
        assert_eq!(key.as_str(), "meps/show-current");
    }

    #[test]
    fn key_sorts_pairs() {
        let key = CacheKey::from_pairs("meps", [("z", "1"), ("a", "2")]);
        assert_eq!(key.as_str(), "meps?a=2&z=1");
    }

    #[test]
    fn key_escapes_separators() {
        let smuggled = CacheKey::from_pairs("meps", [("a", "1&b=2")]);
        let split = CacheKey::from_pairs("meps", [("a", "1"), ("b", "2")]);
        assert_ne!(smuggled, split);
        assert_eq!(smuggled.as_str(), "meps?a=1%26b%3D2");
    }

    #[test]
    fn key_uses_wire_form_of_values() {
        let int = QueryParams::new().with("limit", 5);
        let text = QueryParams::new().with("limit", "5");
        assert_eq!(CacheKey::new("meps", &int), CacheKey::new("meps", &text));
    }
}
