// Copyright © 2018 Cormac O'Brien
//
// Permission is hereby granted, free of charge, to any person obtaining a copy of this software
// and associated documentation files (the "Software"), to deal in the Software without
// restriction, including without limitation the rights to use, copy, modify, merge, publish,
// distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the
// Software is furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all copies or
// substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING
// BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM,
// DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! A capacity-bounded LRU cache (§4.F): a hash map from key to an entry
//! holding the value plus its position in an intrusive doubly linked
//! recency list, so `touch` is O(1) without walking the map.

use crate::alloc::{Pool, PoolId};

use std::collections::HashMap;
use std::hash::Hash;

struct Entry<K, V> {
    key: K,
    value: V,
    prev: Option<PoolId<Entry<K, V>>>,
    next: Option<PoolId<Entry<K, V>>>,
}

/// A fixed-capacity cache that evicts the least recently touched entry
/// (§4.F).
pub struct LruCache<K, V> {
    pool: Pool<Entry<K, V>>,
    index: HashMap<K, PoolId<Entry<K, V>>>,
    head: Option<PoolId<Entry<K, V>>>,
    tail: Option<PoolId<Entry<K, V>>>,
    capacity: usize,
}

impl<K: Eq + Hash + Clone, V> LruCache<K, V> {
    pub fn new(capacity: usize) -> LruCache<K, V> {
        LruCache {
            pool: Pool::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
            head: None,
            tail: None,
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn size(&self) -> usize {
        self.index.len()
    }

    /// Looks up `k` without affecting recency.
    pub fn find(&self, k: &K) -> Option<&V> {
        self.index.get(k).map(|id| &self.pool.get(*id).value)
    }

    /// Looks up `k`, touching it on hit, and copies the value into `out`.
    pub fn get(&mut self, k: &K, out: &mut V) -> bool
    where
        V: Clone,
    {
        match self.index.get(k).cloned() {
            Some(id) => {
                *out = self.pool.get(id).value.clone();
                self.move_to_front(id);
                true
            }
            None => false,
        }
    }

    /// Inserts or replaces `k`'s value, touching it either way.
    pub fn set(&mut self, k: K, v: V) {
        if let Some(&id) = self.index.get(&k) {
            self.pool.get_mut(id).value = v;
            self.move_to_front(id);
            return;
        }
        self.insert_new(k, v);
    }

    /// Inserts `k` only if it is not already present. Returns `true` if the
    /// insertion happened.
    pub fn add(&mut self, k: K, v: V) -> bool {
        if self.index.contains_key(&k) {
            return false;
        }
        self.insert_new(k, v);
        true
    }

    /// Touches `k` if present, moving it to the front of the recency list.
    pub fn touch(&mut self, k: &K) -> bool {
        match self.index.get(k).cloned() {
            Some(id) => {
                self.move_to_front(id);
                true
            }
            None => false,
        }
    }

    pub fn erase(&mut self, k: &K) -> bool {
        match self.index.remove(k) {
            Some(id) => {
                self.unlink(id);
                self.pool.remove(id);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.pool.clear();
        self.index.clear();
        self.head = None;
        self.tail = None;
    }

    fn insert_new(&mut self, k: K, v: V) {
        if self.capacity == 0 {
            return;
        }
        if self.index.len() >= self.capacity {
            self.evict_tail();
        }
        let id = self.pool.insert(Entry {
            key: k.clone(),
            value: v,
            prev: None,
            next: self.head,
        });
        if let Some(old_head) = self.head {
            self.pool.get_mut(old_head).prev = Some(id);
        }
        self.head = Some(id);
        if self.tail.is_none() {
            self.tail = Some(id);
        }
        self.index.insert(k, id);
    }

    fn evict_tail(&mut self) {
        if let Some(tail_id) = self.tail {
            let key = self.pool.get(tail_id).key.clone();
            self.unlink(tail_id);
            self.pool.remove(tail_id);
            self.index.remove(&key);
        }
    }

    fn move_to_front(&mut self, id: PoolId<Entry<K, V>>) {
        if self.head == Some(id) {
            return;
        }
        self.unlink(id);
        self.pool.get_mut(id).next = self.head;
        self.pool.get_mut(id).prev = None;
        if let Some(old_head) = self.head {
            self.pool.get_mut(old_head).prev = Some(id);
        }
        self.head = Some(id);
        if self.tail.is_none() {
            self.tail = Some(id);
        }
    }

    fn unlink(&mut self, id: PoolId<Entry<K, V>>) {
        let (prev, next) = {
            let entry = self.pool.get(id);
            (entry.prev, entry.next)
        };
        match prev {
            Some(p) => self.pool.get_mut(p).next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.pool.get_mut(n).prev = prev,
            None => self.tail = prev,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_find_returns_latest_value() {
        let mut cache: LruCache<&str, i32> = LruCache::new(2);
        cache.set("a", 1);
        cache.set("a", 2);
        assert_eq!(cache.find(&"a"), Some(&2));
        assert_eq!(cache.size(), 1);
    }

    #[test]
    fn capacity_eviction_drops_least_recently_touched() {
        let mut cache: LruCache<&str, i32> = LruCache::new(2);
        cache.set("a", 1);
        cache.set("b", 2);
        cache.touch(&"a");
        cache.set("c", 3);
        assert_eq!(cache.find(&"a"), Some(&1));
        assert_eq!(cache.find(&"b"), None);
        assert_eq!(cache.find(&"c"), Some(&3));
        assert_eq!(cache.size(), 2);
    }

    #[test]
    fn add_does_not_overwrite_existing_key() {
        let mut cache: LruCache<&str, i32> = LruCache::new(4);
        assert!(cache.add("a", 1));
        assert!(!cache.add("a", 2));
        assert_eq!(cache.find(&"a"), Some(&1));
    }

    #[test]
    fn get_touches_and_copies_value() {
        let mut cache: LruCache<&str, i32> = LruCache::new(2);
        cache.set("a", 1);
        cache.set("b", 2);
        let mut out = 0;
        assert!(cache.get(&"a", &mut out));
        assert_eq!(out, 1);
        cache.set("c", 3);
        assert_eq!(cache.find(&"a"), Some(&1));
        assert_eq!(cache.find(&"b"), None);
    }

    #[test]
    fn erase_removes_entry_and_shrinks_size() {
        let mut cache: LruCache<&str, i32> = LruCache::new(2);
        cache.set("a", 1);
        assert!(cache.erase(&"a"));
        assert_eq!(cache.size(), 0);
        assert_eq!(cache.find(&"a"), None);
    }

    #[test]
    fn clear_empties_cache() {
        let mut cache: LruCache<&str, i32> = LruCache::new(2);
        cache.set("a", 1);
        cache.set("b", 2);
        cache.clear();
        assert_eq!(cache.size(), 0);
        assert_eq!(cache.capacity(), 2);
    }
}
