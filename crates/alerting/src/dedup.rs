//! Time-Windowed Dedup Set

use std::collections::{HashSet, VecDeque};
use std::hash::Hash;

/// Set of recently seen keys with age based eviction.
///
/// Keys are kept in insertion order and dropped only once they are older
/// than the retention window.
#[derive(Debug)]
pub struct DedupWindow<K> {
    order: VecDeque<(K, u64)>,
    members: HashSet<K>,
    retention_ms: u64,
}

impl<K: Eq + Hash + Clone> DedupWindow<K> {
    pub fn new(retention_ms: u64) -> Self {
        Self {
            order: VecDeque::new(),
            members: HashSet::new(),
            retention_ms,
        }
    }

    /// Whether the key was recorded within the retention window
    pub fn contains(&mut self, key: &K, now_ms: u64) -> bool {
        self.evict_expired(now_ms);
        self.members.contains(key)
    }

    /// Record a key. Returns false if it was already present.
    pub fn insert(&mut self, key: K, now_ms: u64) -> bool {
        self.evict_expired(now_ms);
        if !self.members.insert(key.clone()) {
            return false;
        }
        self.order.push_back((key, now_ms));
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.members.clear();
    }

    fn evict_expired(&mut self, now_ms: u64) {
        while let Some((_, recorded_at)) = self.order.front() {
            if now_ms.saturating_sub(*recorded_at) <= self.retention_ms {
                break;
            }
            if let Some((key, _)) = self.order.pop_front() {
                self.members.remove(&key);
            }
        }
    }
}
