//! Optional bounded cache for detector results, keyed by a content hash of
//! the input bytes (spec.md §4.1.7, §5). Concurrency-safe via a single
//! mutex; callers decide whether to consult it at all, so a plain
//! `compile_bytes` invocation with no cache configured stays a pure
//! function of its input.

use crate::detector::connection::Connection;
use crate::detector::symbol::Symbol;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;

pub type DetectorOutput = (Vec<Symbol>, Vec<Connection>);

/// Blake3 content hash of the raw input bytes, used as the cache key.
/// Chosen over a hasher like the default `SipHash` because it gives a
/// stable, dependency-free-of-process-seed digest across runs and
/// machines, which determinism (spec.md §8) requires of anything that
/// touches observable behaviour.
pub fn content_key(bytes: &[u8]) -> [u8; 32] {
    *blake3::hash(bytes).as_bytes()
}

/// Bounded LRU cache over detector outputs, guarded by an internal mutex
/// (spec.md §5: "single writer or internal mutual exclusion").
pub struct DetectorCache {
    inner: Mutex<LruCache<[u8; 32], DetectorOutput>>,
}

impl DetectorCache {
    pub fn with_capacity(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).unwrap();
        Self { inner: Mutex::new(LruCache::new(cap)) }
    }

    pub fn get(&self, key: &[u8; 32]) -> Option<DetectorOutput> {
        self.inner.lock().unwrap().get(key).cloned()
    }

    pub fn insert(&self, key: [u8; 32], value: DetectorOutput) {
        self.inner.lock().unwrap().put(key, value);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::symbol::SymbolType;
    use nalgebra::Point2;

    #[test]
    fn same_bytes_same_key() {
        let a = content_key(b"hello");
        let b = content_key(b"hello");
        assert_eq!(a, b);
    }

    #[test]
    fn different_bytes_different_key() {
        assert_ne!(content_key(b"hello"), content_key(b"world"));
    }

    #[test]
    fn cache_roundtrips_and_evicts_under_capacity() {
        let cache = DetectorCache::with_capacity(1);
        let key_a = content_key(b"a");
        let key_b = content_key(b"b");
        let symbols = vec![Symbol::new(SymbolType::OuterCircle, Point2::new(0.0, 0.0), 10.0)];
        cache.insert(key_a, (symbols.clone(), Vec::new()));
        assert!(cache.get(&key_a).is_some());
        cache.insert(key_b, (symbols, Vec::new()));
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&key_a).is_none());
        assert!(cache.get(&key_b).is_some());
    }
}
