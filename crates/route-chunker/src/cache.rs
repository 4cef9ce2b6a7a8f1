use std::sync::Arc;

use dashmap::DashMap;

/// Public contract from spec §4.2: `getOrSet(cacheKey, fingerprint, compute)`.
///
/// Returns the stored value iff an entry under `cacheKey` exists and its
/// fingerprint equals `fingerprint`; otherwise calls `compute()`, stores the
/// result, and returns it. No eviction policy is implemented — callers that
/// run this over large codebases must bound memory themselves (see design
/// notes, "Unbounded cache").
///
/// Safe to share across threads: a lost store race under the same key and
/// fingerprint is fine, since both racing computations are pure and produce
/// an equivalent value.
pub struct Cache<V> {
    entries: DashMap<String, Entry<V>>,
}

struct Entry<V> {
    fingerprint: Arc<str>,
    value: V,
}

impl<V> Default for Cache<V> {
    fn default() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

impl<V: Clone> Cache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_set(&self, key: &str, fingerprint: &str, compute: impl FnOnce() -> V) -> V {
        if let Some(entry) = self.entries.get(key)
            && &*entry.fingerprint == fingerprint
        {
            return entry.value.clone();
        }

        let value = compute();
        self.entries.insert(
            key.to_string(),
            Entry {
                fingerprint: Arc::from(fingerprint),
                value: value.clone(),
            },
        );
        value
    }
}

/// Builds a composite cache key by suffixing `cache_key` with an operation
/// name and its parameters (spec §4.2: "deterministic keys for every derived
/// artifact"). `\0` can't appear in a cache key, export name, or serialized
/// printer options, so it's a safe separator.
pub fn compose_key(cache_key: &str, operation: &str, params: &[&str]) -> String {
    let mut key = String::with_capacity(cache_key.len() + operation.len() + 8);
    key.push_str(cache_key);
    key.push('\0');
    key.push_str(operation);
    for param in params {
        key.push('\0');
        key.push_str(param);
    }
    key
}
