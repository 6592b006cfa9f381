//! Shared response cache.
//!
//! Entries are addressed by a [`CacheKey`] and hold the last successful
//! response for that key. There is no eviction or expiry; the number of
//! distinct keys a client uses is small.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use ytmp3_core::AppResult;

/// Deterministic serialization of a fetch identifier.
///
/// The identifier goes through `serde_json::Value`, whose objects keep keys
/// sorted, so two maps with the same entries always produce the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new<K: Serialize + ?Sized>(key: &K) -> AppResult<Self> {
        let value = serde_json::to_value(key)?;
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CacheKey {
    fn from(key: &str) -> Self {
        Self(Value::String(key.to_string()).to_string())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Cloneable handle to a shared key/value store of JSON responses.
#[derive(Clone, Default)]
pub struct ResponseCache {
    entries: Arc<RwLock<HashMap<CacheKey, Value>>>,
}

impl fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseCache")
            .field("entries", &self.len())
            .finish()
    }
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Typed read. An entry that no longer decodes as `T` is treated as absent.
    pub fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let value = entries.get(key)?;
        match serde_json::from_value(value.clone()) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                tracing::debug!(key = %key, error = %e, "Cached entry does not match requested type");
                None
            }
        }
    }

    pub fn set<T: Serialize>(&self, key: &CacheKey, value: &T) -> AppResult<()> {
        let value = serde_json::to_value(value)?;
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.clone(), value);
        Ok(())
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_key_is_stable_across_map_order() {
        let mut a = HashMap::new();
        a.insert("page", 1);
        a.insert("filter", 2);
        let mut b = HashMap::new();
        b.insert("filter", 2);
        b.insert("page", 1);

        assert_eq!(CacheKey::new(&a).unwrap(), CacheKey::new(&b).unwrap());
        assert_eq!(CacheKey::new(&a).unwrap().as_str(), r#"{"filter":2,"page":1}"#);
    }

    #[test]
    fn test_string_key_matches_serialized_string() {
        assert_eq!(CacheKey::from("tasks"), CacheKey::new("tasks").unwrap());
        assert_eq!(CacheKey::from("tasks").as_str(), "\"tasks\"");
    }

    #[test]
    fn test_distinct_identifiers_give_distinct_keys() {
        let one = CacheKey::new(&("info", "https://youtu.be/a")).unwrap();
        let two = CacheKey::new(&("info", "https://youtu.be/b")).unwrap();
        assert_ne!(one, two);
    }

    #[test]
    fn test_set_then_get_typed() {
        let cache = ResponseCache::new();
        let key = CacheKey::from("numbers");
        assert!(cache.get::<Vec<u32>>(&key).is_none());

        cache.set(&key, &vec![1u32, 2, 3]).unwrap();
        assert_eq!(cache.get::<Vec<u32>>(&key), Some(vec![1, 2, 3]));
        assert!(cache.contains(&key));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_get_with_wrong_type_is_none() {
        let cache = ResponseCache::new();
        let key = CacheKey::from("k");
        cache.set(&key, &"text").unwrap();
        assert!(cache.get::<BTreeMap<String, u32>>(&key).is_none());
        assert_eq!(cache.get::<String>(&key).as_deref(), Some("text"));
    }

    #[test]
    fn test_clones_share_entries() {
        let cache = ResponseCache::new();
        let other = cache.clone();
        cache.set(&CacheKey::from("a"), &1).unwrap();
        assert_eq!(other.get::<i32>(&CacheKey::from("a")), Some(1));
        assert!(!other.is_empty());
    }

    #[test]
    fn test_separate_caches_are_isolated() {
        let first = ResponseCache::new();
        let second = ResponseCache::new();
        first.set(&CacheKey::from("a"), &1).unwrap();
        assert!(second.get::<i32>(&CacheKey::from("a")).is_none());
    }
}
