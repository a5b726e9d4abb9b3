use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use dashmap::DashMap;

/// A bounded counter. `max` is fixed when the bucket is created.
#[derive(Debug)]
struct Bucket {
    max: u32,
    reserved: AtomicU32,
}

impl Bucket {
    fn new(max: u32) -> Self {
        Self {
            max,
            reserved: AtomicU32::new(0),
        }
    }

    /// Increment only if the result stays within `max`.
    fn try_acquire(&self) -> bool {
        self.reserved
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.max).then_some(n + 1)
            })
            .is_ok()
    }

    /// Decrement, clamped at zero. Returns false if there was nothing to release.
    fn release(&self) -> bool {
        self.reserved
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok()
    }
}

/// Point-in-time view of one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketUsage {
    pub max: u32,
    pub reserved: u32,
}

impl BucketUsage {
    pub fn remaining(&self) -> u32 {
        self.max.saturating_sub(self.reserved)
    }
}

/// Concurrency-safe map from a dynamic key to a bounded counter.
///
/// Buckets are created lazily on the first reservation attempt for a key,
/// sized by the `max` passed to that attempt. Later attempts with a different
/// `max` do not resize an existing bucket.
pub struct CapacityLedger<K> {
    buckets: DashMap<K, Arc<Bucket>>,
}

impl<K: Eq + Hash + Clone> Default for CapacityLedger<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash + Clone> CapacityLedger<K> {
    pub fn new() -> Self {
        Self {
            buckets: DashMap::new(),
        }
    }

    /// Take one unit from `key`'s bucket, creating it with `max_if_absent`
    /// if this is the first time the key is seen. Never blocks on the
    /// bucket; returns false when it is full.
    pub fn try_reserve(&self, key: K, max_if_absent: u32) -> bool {
        // The entry guard holds the shard lock, so concurrent first access
        // for one key creates exactly one bucket. Clone the Arc out and drop
        // the guard before touching the counter.
        let bucket = self
            .buckets
            .entry(key)
            .or_insert_with(|| Arc::new(Bucket::new(max_if_absent)))
            .value()
            .clone();
        bucket.try_acquire()
    }

    /// Return one unit to `key`'s bucket. Unknown keys and empty buckets are
    /// left untouched. Returns true iff a unit was actually returned.
    pub fn release(&self, key: &K) -> bool {
        let Some(bucket) = self.buckets.get(key).map(|e| e.value().clone()) else {
            return false;
        };
        bucket.release()
    }

    pub fn usage(&self, key: &K) -> Option<BucketUsage> {
        self.buckets.get(key).map(|e| BucketUsage {
            max: e.max,
            reserved: e.reserved.load(Ordering::Acquire),
        })
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserve_up_to_max() {
        let ledger = CapacityLedger::new();
        assert!(ledger.try_reserve("a", 2));
        assert!(ledger.try_reserve("a", 2));
        assert!(!ledger.try_reserve("a", 2));
        assert_eq!(ledger.usage(&"a"), Some(BucketUsage { max: 2, reserved: 2 }));
    }

    #[test]
    fn zero_capacity_bucket_rejects() {
        let ledger = CapacityLedger::new();
        assert!(!ledger.try_reserve("a", 0));
        // The bucket still exists, frozen at zero.
        assert_eq!(ledger.usage(&"a"), Some(BucketUsage { max: 0, reserved: 0 }));
    }

    #[test]
    fn release_frees_one_unit() {
        let ledger = CapacityLedger::new();
        assert!(ledger.try_reserve("a", 1));
        assert!(!ledger.try_reserve("a", 1));
        assert!(ledger.release(&"a"));
        assert!(ledger.try_reserve("a", 1));
    }

    #[test]
    fn release_clamps_at_zero() {
        let ledger = CapacityLedger::new();
        assert!(ledger.try_reserve("a", 1));
        assert!(ledger.release(&"a"));
        assert!(!ledger.release(&"a"));
        assert!(!ledger.release(&"a"));
        assert_eq!(ledger.usage(&"a").unwrap().reserved, 0);
        // Over-release must not have inflated capacity.
        assert!(ledger.try_reserve("a", 1));
        assert!(!ledger.try_reserve("a", 1));
    }

    #[test]
    fn release_unknown_key_is_noop() {
        let ledger: CapacityLedger<&str> = CapacityLedger::new();
        assert!(!ledger.release(&"missing"));
        assert_eq!(ledger.bucket_count(), 0);
    }

    #[test]
    fn max_is_frozen_at_creation() {
        let ledger = CapacityLedger::new();
        assert!(ledger.try_reserve("a", 1));
        // A larger max on a later call does not resize the bucket.
        assert!(!ledger.try_reserve("a", 5));
        assert_eq!(ledger.usage(&"a").unwrap().max, 1);
    }

    #[test]
    fn keys_are_independent() {
        let ledger = CapacityLedger::new();
        assert!(ledger.try_reserve("a", 1));
        assert!(ledger.try_reserve("b", 1));
        assert!(!ledger.try_reserve("a", 1));
        assert_eq!(ledger.bucket_count(), 2);
    }

    #[test]
    fn concurrent_first_access_is_exact() {
        let ledger = Arc::new(CapacityLedger::new());
        let max = 7;
        let threads: Vec<_> = (0..32)
            .map(|_| {
                let ledger = ledger.clone();
                std::thread::spawn(move || ledger.try_reserve("hot".to_string(), max))
            })
            .collect();
        let granted = threads
            .into_iter()
            .map(|t| t.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(granted, max as usize);
        assert_eq!(ledger.bucket_count(), 1);
        assert_eq!(ledger.usage(&"hot".to_string()).unwrap().reserved, max);
    }

    #[test]
    fn concurrent_reserve_and_release_keep_accounting() {
        let ledger = Arc::new(CapacityLedger::new());
        assert!(ledger.try_reserve(1u32, 4));
        let threads: Vec<_> = (0..16)
            .map(|i| {
                let ledger = ledger.clone();
                std::thread::spawn(move || {
                    for _ in 0..500 {
                        if ledger.try_reserve(1u32, 4) {
                            ledger.release(&1u32);
                        }
                    }
                    i
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        let usage = ledger.usage(&1u32).unwrap();
        assert_eq!(usage.reserved, 1);
        assert!(usage.reserved <= usage.max);
    }
}
