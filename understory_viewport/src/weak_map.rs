// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A side table keyed by `Rc` identity that does not keep its keys alive.

use alloc::rc::{Rc, Weak};
use core::fmt;

use hashbrown::HashMap;
use tracing::trace;

/// Minimum table size before an insertion triggers a prune.
const MIN_PRUNE_AT: usize = 16;

struct Slot<K, V> {
    key: Weak<K>,
    value: V,
}

/// A map from `Rc<K>` identity to `V` that holds only weak references to keys.
///
/// Each slot keeps a [`Weak`] to its key, which keeps the key's allocation
/// (but not the key) alive. An address in the table therefore always names the
/// allocation it was inserted with, and any `Rc<K>` a caller can present is
/// live, so lookups never see a stale slot.
///
/// Once every strong reference to a key is gone the slot becomes unreachable.
/// Its value is dropped on the next [`prune`](Self::prune), which also runs
/// automatically whenever an insertion grows the table past a watermark.
///
/// Values that hold a strong reference to their own key keep that key alive.
pub struct WeakKeyMap<K, V> {
    slots: HashMap<usize, Slot<K, V>>,
    prune_at: usize,
}

fn addr<K>(key: &Rc<K>) -> usize {
    Rc::as_ptr(key).addr()
}

impl<K, V> WeakKeyMap<K, V> {
    /// Create an empty map.
    pub fn new() -> Self {
        Self {
            slots: HashMap::new(),
            prune_at: MIN_PRUNE_AT,
        }
    }

    /// Number of entries whose key is still alive.
    pub fn len(&self) -> usize {
        self.slots
            .values()
            .filter(|s| s.key.strong_count() > 0)
            .count()
    }

    /// Returns `true` if no live key has an entry.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `key` has an entry.
    pub fn contains_key(&self, key: &Rc<K>) -> bool {
        self.slots.contains_key(&addr(key))
    }

    /// The value stored for `key`.
    pub fn get(&self, key: &Rc<K>) -> Option<&V> {
        self.slots.get(&addr(key)).map(|s| &s.value)
    }

    /// The value stored for `key`, mutably.
    pub fn get_mut(&mut self, key: &Rc<K>) -> Option<&mut V> {
        self.slots.get_mut(&addr(key)).map(|s| &mut s.value)
    }

    /// The value stored for `key`, inserting the result of `f` if there is none.
    pub fn get_or_insert_with(&mut self, key: &Rc<K>, f: impl FnOnce() -> V) -> &mut V {
        let k = addr(key);
        if !self.slots.contains_key(&k) {
            self.maybe_prune();
        }
        &mut self
            .slots
            .entry(k)
            .or_insert_with(|| Slot {
                key: Rc::downgrade(key),
                value: f(),
            })
            .value
    }

    /// Remove and return the value stored for `key`.
    pub fn remove(&mut self, key: &Rc<K>) -> Option<V> {
        self.slots.remove(&addr(key)).map(|s| s.value)
    }

    /// Drop every entry whose key is gone. Returns how many were dropped.
    pub fn prune(&mut self) -> usize {
        let before = self.slots.len();
        self.slots.retain(|_, s| s.key.strong_count() > 0);
        let pruned = before - self.slots.len();
        if pruned > 0 {
            trace!(pruned, remaining = self.slots.len(), "pruned dead keys");
        }
        pruned
    }

    fn maybe_prune(&mut self) {
        if self.slots.len() >= self.prune_at {
            self.prune();
            self.prune_at = (self.slots.len() * 2).max(MIN_PRUNE_AT);
        }
    }
}

impl<K, V> Default for WeakKeyMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> fmt::Debug for WeakKeyMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakKeyMap")
            .field("live", &self.len())
            .field("slots", &self.slots.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_are_by_identity_not_value() {
        let a = Rc::new(7_u32);
        let b = Rc::new(7_u32);
        let mut map = WeakKeyMap::new();
        map.get_or_insert_with(&a, || "a");
        assert_eq!(map.get(&a), Some(&"a"));
        assert_eq!(map.get(&b), None);
        assert_eq!(map.get(&a.clone()), Some(&"a"));
    }

    #[test]
    fn dead_keys_are_invisible_and_pruned() {
        let a = Rc::new(1_u32);
        let b = Rc::new(2_u32);
        let mut map = WeakKeyMap::new();
        map.get_or_insert_with(&a, || 10);
        map.get_or_insert_with(&b, || 20);
        drop(a);
        assert_eq!(map.len(), 1);
        assert!(!map.is_empty());
        assert_eq!(map.prune(), 1);
        assert_eq!(map.prune(), 0);
        assert_eq!(map.get(&b), Some(&20));
    }

    #[test]
    fn growth_prunes_automatically() {
        let mut map = WeakKeyMap::new();
        for i in 0..(MIN_PRUNE_AT * 4) {
            let key = Rc::new(i);
            map.get_or_insert_with(&key, || i);
        }
        let keep = Rc::new(usize::MAX);
        map.get_or_insert_with(&keep, || 0);
        assert_eq!(map.len(), 1);
        assert!(map.slots.len() < MIN_PRUNE_AT * 4, "dead slots were never pruned");
    }

    #[test]
    fn get_or_insert_with_only_builds_once() {
        let a = Rc::new(());
        let mut map = WeakKeyMap::new();
        let mut built = 0;
        for _ in 0..3 {
            *map.get_or_insert_with(&a, || {
                built += 1;
                0
            }) += 1;
        }
        assert_eq!(built, 1);
        assert_eq!(map.get(&a), Some(&3));
        assert_eq!(map.remove(&a), Some(3));
        assert!(map.is_empty());
    }
}
