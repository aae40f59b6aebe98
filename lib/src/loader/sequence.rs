// lib/src/loader/sequence.rs

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;

use models::ResidentId;

use super::Slice;

/// Hands out request sequence numbers. One counter serves every slice, so
/// numbers are monotonic within each slice as well.
#[derive(Debug, Default)]
pub struct SliceSequencer {
    next: AtomicU64,
}

impl SliceSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn issue(&self, slice: Slice, resident_id: ResidentId) -> Ticket {
        Ticket {
            slice,
            resident_id,
            seq: self.next(),
        }
    }
}

/// Identifies one outstanding slice request.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Ticket {
    pub slice: Slice,
    pub resident_id: ResidentId,
    pub seq: u64,
}

#[derive(Debug)]
struct Versioned<V> {
    seq: u64,
    value: Option<V>,
}

/// Keyed values that only accept writes carrying a sequence number at least
/// as new as the last accepted one for the same key.
#[derive(Debug)]
pub struct SliceStore<K, V> {
    entries: RwLock<HashMap<K, Versioned<V>>>,
}

impl<K, V> Default for SliceStore<K, V> {
    fn default() -> Self {
        SliceStore {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash, V: Clone> SliceStore<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` unless a newer write for `key` already landed.
    pub async fn apply(&self, key: K, seq: u64, value: V) -> bool {
        let mut entries = self.entries.write().await;
        match entries.get(&key) {
            Some(current) if seq < current.seq => false,
            _ => {
                entries.insert(key, Versioned { seq, value: Some(value) });
                true
            }
        }
    }

    /// Drops the value for `key`. The sequence watermark is kept so late
    /// responses still cannot resurrect older data.
    pub async fn invalidate(&self, key: &K) {
        if let Some(current) = self.entries.write().await.get_mut(key) {
            current.value = None;
        }
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        self.entries.read().await.get(key).and_then(|v| v.value.clone())
    }

    pub async fn with<R>(&self, key: &K, f: impl FnOnce(&V) -> R) -> Option<R> {
        self.entries.read().await.get(key).and_then(|v| v.value.as_ref()).map(f)
    }

    pub async fn is_loaded(&self, key: &K) -> bool {
        self.with(key, |_| ()).await.is_some()
    }

    /// Visits every loaded value.
    pub async fn find_map<R>(&self, mut f: impl FnMut(&K, &V) -> Option<R>) -> Option<R> {
        let entries = self.entries.read().await;
        entries
            .iter()
            .find_map(|(k, v)| v.value.as_ref().and_then(|value| f(k, value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tickets_increase() {
        let sequencer = SliceSequencer::new();
        let a = sequencer.issue(Slice::Health, ResidentId(1));
        let b = sequencer.issue(Slice::Health, ResidentId(1));
        assert!(b.seq > a.seq);
    }

    #[tokio::test]
    async fn older_writes_are_rejected() {
        let store: SliceStore<ResidentId, Vec<u32>> = SliceStore::new();
        assert!(store.apply(ResidentId(1), 5, vec![5]).await);
        assert!(!store.apply(ResidentId(1), 3, vec![3]).await);
        assert_eq!(store.get(&ResidentId(1)).await, Some(vec![5]));
        assert!(store.apply(ResidentId(1), 6, vec![6]).await);
        assert_eq!(store.get(&ResidentId(1)).await, Some(vec![6]));
    }

    #[tokio::test]
    async fn invalidation_keeps_the_watermark() {
        let store: SliceStore<ResidentId, Vec<u32>> = SliceStore::new();
        store.apply(ResidentId(1), 5, vec![5]).await;
        store.invalidate(&ResidentId(1)).await;
        assert!(!store.is_loaded(&ResidentId(1)).await);
        assert!(!store.apply(ResidentId(1), 4, vec![4]).await);
        assert!(store.apply(ResidentId(1), 7, vec![7]).await);
        assert!(store.is_loaded(&ResidentId(1)).await);
    }
}
