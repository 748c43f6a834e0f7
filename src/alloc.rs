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

//! A slab-backed pool allocator used everywhere this crate needs arena-indexed
//! graph nodes: BSP3/BSP2 tree nodes, block-graph half-edges and faces, and
//! EPA polytope triangles are all allocated from a `Pool` and addressed by
//! `PoolId` rather than by pointer, so the trees and graphs are free of
//! reference-counting cycles and can be cloned or rebuilt wholesale.
//!
//! Freeing the owner (dropping the `Pool`, or calling `clear`) releases every
//! entry at once in O(1) (O(capacity) for the backing allocation, not O(n)
//! destructor calls per entry beyond what `Slab::clear` already does).

use slab::Slab;

use std::marker::PhantomData;

/// An index into a [`Pool<T>`]. Carries a marker so that ids from different
/// pools (e.g. a BSP3 node pool and a block-graph half-edge pool) are not
/// interchangeable at the type level, even though both are backed by `usize`.
pub struct PoolId<T> {
    index: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> PoolId<T> {
    fn new(index: usize) -> Self {
        PoolId {
            index,
            _marker: PhantomData,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

impl<T> Clone for PoolId<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for PoolId<T> {}

impl<T> PartialEq for PoolId<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}
impl<T> Eq for PoolId<T> {}

impl<T> std::hash::Hash for PoolId<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl<T> std::fmt::Debug for PoolId<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "PoolId({})", self.index)
    }
}

/// A pool of `T` addressed by [`PoolId<T>`], backed by a [`Slab`](slab::Slab).
///
/// Entries are never moved once inserted, so ids remain valid until the
/// entry is explicitly removed or the whole pool is cleared.
pub struct Pool<T> {
    slab: Slab<T>,
}

impl<T> Pool<T> {
    pub fn new() -> Pool<T> {
        Pool { slab: Slab::new() }
    }

    pub fn with_capacity(capacity: usize) -> Pool<T> {
        Pool {
            slab: Slab::with_capacity(capacity),
        }
    }

    pub fn insert(&mut self, val: T) -> PoolId<T> {
        PoolId::new(self.slab.insert(val))
    }

    pub fn remove(&mut self, id: PoolId<T>) -> T {
        self.slab.remove(id.index)
    }

    pub fn get(&self, id: PoolId<T>) -> &T {
        &self.slab[id.index]
    }

    pub fn get_mut(&mut self, id: PoolId<T>) -> &mut T {
        &mut self.slab[id.index]
    }

    pub fn try_get(&self, id: PoolId<T>) -> Option<&T> {
        self.slab.get(id.index)
    }

    pub fn try_get_mut(&mut self, id: PoolId<T>) -> Option<&mut T> {
        self.slab.get_mut(id.index)
    }

    pub fn contains(&self, id: PoolId<T>) -> bool {
        self.slab.contains(id.index)
    }

    pub fn len(&self) -> usize {
        self.slab.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slab.is_empty()
    }

    /// Release every entry in the pool at once. All previously issued
    /// `PoolId`s become invalid.
    pub fn clear(&mut self) {
        self.slab.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (PoolId<T>, &T)> {
        self.slab.iter().map(|(i, v)| (PoolId::new(i), v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (PoolId<T>, &mut T)> {
        self.slab.iter_mut().map(|(i, v)| (PoolId::new(i), v))
    }
}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        Pool::new()
    }
}

impl<T: Clone> Clone for Pool<T> {
    fn clone(&self) -> Self {
        Pool {
            slab: self.slab.clone(),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Pool").field("slab", &self.slab).finish()
    }
}

impl<T> std::ops::Index<PoolId<T>> for Pool<T> {
    type Output = T;

    fn index(&self, id: PoolId<T>) -> &T {
        self.get(id)
    }
}

impl<T> std::ops::IndexMut<PoolId<T>> for Pool<T> {
    fn index_mut(&mut self, id: PoolId<T>) -> &mut T {
        self.get_mut(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_get_remove() {
        let mut pool: Pool<i32> = Pool::new();
        let a = pool.insert(1);
        let b = pool.insert(2);
        assert_eq!(*pool.get(a), 1);
        assert_eq!(*pool.get(b), 2);
        assert_eq!(pool.remove(a), 1);
        assert!(!pool.contains(a));
        assert!(pool.contains(b));
    }

    #[test]
    fn clear_invalidates_all() {
        let mut pool: Pool<i32> = Pool::new();
        let a = pool.insert(1);
        pool.clear();
        assert!(!pool.contains(a));
        assert_eq!(pool.len(), 0);
    }
}
