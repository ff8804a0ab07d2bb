//! Bucketed node pool with stable indices
//!
//! Items live in one contiguous vector that grows a bucket at a time; each
//! bucket keeps an occupancy counter so free slots are found without scanning
//! full buckets. Indices never move, so callers link items by index.

/// Items stored in a [`Pool`] must have a recognisable vacant state.
///
/// A vacant slot is considered free by [`Pool::next_empty`].
pub trait PoolItem: Copy + Default {
    fn is_vacant(&self) -> bool;
}

impl PoolItem for u64 {
    fn is_vacant(&self) -> bool {
        *self == 0
    }
}

/// Default number of items per bucket
pub const DEFAULT_BUCKET_SIZE: usize = 1024;

/// Stable-index pool of at most `MAX_SIZE` items.
///
/// Index 0 is handed out by the very first insert and is never reported as
/// free afterwards; the octree keeps its root there.
#[derive(Clone, Debug, Default)]
pub struct Pool<T: PoolItem, const MAX_SIZE: usize, const BUCKET_SIZE: usize = DEFAULT_BUCKET_SIZE> {
    items: Vec<T>,
    counters: Vec<u16>,
}

impl<T: PoolItem, const MAX_SIZE: usize, const BUCKET_SIZE: usize> Pool<T, MAX_SIZE, BUCKET_SIZE> {
    pub const MAX_SIZE: usize = MAX_SIZE;
    pub const BUCKET_SIZE: usize = BUCKET_SIZE;

    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            counters: Vec::new(),
        }
    }

    /// Rebuild a pool from its raw storage.
    ///
    /// Returns `None` if the arrays are inconsistent with each other or with
    /// the pool geometry.
    pub fn from_raw(items: Vec<T>, counters: Vec<u16>) -> Option<Self> {
        if items.len() != counters.len() * BUCKET_SIZE || items.len() > MAX_SIZE {
            return None;
        }
        let consistent = items.chunks(BUCKET_SIZE).zip(&counters).all(|(bucket, &count)| {
            bucket.iter().filter(|item| !item.is_vacant()).count() == count as usize
        });
        consistent.then_some(Self { items, counters })
    }

    /// Reserve the next free slot and return its index.
    ///
    /// The slot is counted as occupied straight away; the caller must store a
    /// non-vacant value in it.
    ///
    /// # Panics
    /// Panics when the pool is at capacity.
    pub fn insert(&mut self) -> usize {
        let mut empty_idx = self.next_empty();
        if empty_idx == MAX_SIZE {
            assert!(
                self.counters.len() < MAX_SIZE / BUCKET_SIZE,
                "Pool maximum size reached ({} items)",
                MAX_SIZE
            );
            empty_idx = self.items.len();
            self.items.resize(self.items.len() + BUCKET_SIZE, T::default());
            self.counters.push(0);
        }

        let counter = &mut self.counters[empty_idx / BUCKET_SIZE];
        assert!(
            (*counter as usize) < BUCKET_SIZE,
            "Malformed pool counters during increment"
        );
        *counter += 1;
        empty_idx
    }

    /// # Panics
    /// Panics if `idx` is out of bounds.
    pub fn at(&self, idx: usize) -> &T {
        assert!(idx < self.items.len(), "Pool index {} out of bounds", idx);
        &self.items[idx]
    }

    /// # Panics
    /// Panics if `idx` is out of bounds.
    pub fn at_mut(&mut self, idx: usize) -> &mut T {
        assert!(idx < self.items.len(), "Pool index {} out of bounds", idx);
        &mut self.items[idx]
    }

    /// Index of an item borrowed from this pool.
    ///
    /// # Panics
    /// Panics if `item` does not point into the pool storage.
    pub fn index_of(&self, item: &T) -> usize {
        let base = self.items.as_ptr() as usize;
        let addr = item as *const T as usize;
        let idx = addr.wrapping_sub(base) / std::mem::size_of::<T>().max(1);
        assert!(
            addr >= base && idx < self.items.len(),
            "Item does not belong to this pool"
        );
        idx
    }

    /// Release the occupancy count of a slot.
    ///
    /// The slot contents are left untouched; store a vacant value to make the
    /// slot reusable.
    ///
    /// # Panics
    /// Panics if `idx` is out of bounds or the bucket counter is already zero.
    pub fn erase(&mut self, idx: usize) {
        if self.at(idx).is_vacant() {
            return;
        }
        let counter = &mut self.counters[idx / BUCKET_SIZE];
        assert!(*counter > 0, "Malformed pool counters during decrement");
        *counter -= 1;
    }

    /// First free slot in a non-full bucket, or `MAX_SIZE` if a new bucket
    /// is needed.
    pub fn next_empty(&self) -> usize {
        for (bucket, &count) in self.counters.iter().enumerate() {
            if count as usize >= BUCKET_SIZE {
                continue;
            }
            let start = bucket * BUCKET_SIZE;
            let found = self.items[start..start + BUCKET_SIZE]
                .iter()
                .enumerate()
                .position(|(i, item)| start + i != 0 && item.is_vacant());
            if let Some(i) = found {
                return start + i;
            }
        }
        MAX_SIZE
    }

    /// Number of occupied slots
    pub fn len(&self) -> usize {
        self.counters.iter().map(|&c| c as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Allocated slots, occupied or not
    pub fn capacity(&self) -> usize {
        self.items.len()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn counters(&self) -> &[u16] {
        &self.counters
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestPool = Pool<u64, 0xFFFF>;

    #[test]
    fn test_insert_and_reuse() {
        let mut pool = TestPool::new();
        assert_eq!(pool.len(), 0);
        assert_eq!(pool.next_empty(), TestPool::MAX_SIZE);

        let idx = pool.insert();
        *pool.at_mut(idx) = 1;
        assert_eq!(idx, 0);
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.next_empty(), 1);

        let idx = pool.insert();
        *pool.at_mut(idx) = 2;
        assert_eq!(idx, 1);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.next_empty(), 2);

        let mut last = 0;
        for i in 0..1024u64 {
            last = pool.insert();
            *pool.at_mut(last) = i + 3;
        }
        assert_eq!(last, 1024 + 1);
        assert_eq!(pool.len(), 1024 + 2);
        assert_eq!(pool.next_empty(), 1024 + 2);
        assert_eq!(*pool.at(1024 + 1), 1024 + 2);
        assert_eq!(pool.counters(), &[1024, 2]);

        pool.erase(3);
        *pool.at_mut(3) = 0;
        assert_eq!(pool.next_empty(), 3);
        assert_eq!(pool.len(), 1024 + 1);
    }

    #[test]
    fn test_root_slot_never_free() {
        let mut pool = TestPool::new();
        let root = pool.insert();
        assert_eq!(root, 0);
        // Vacant root is still reserved
        assert_eq!(pool.next_empty(), 1);
    }

    #[test]
    fn test_erase_vacant_slot_is_noop() {
        let mut pool = TestPool::new();
        let idx = pool.insert();
        *pool.at_mut(idx) = 7;
        pool.erase(5);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_index_of() {
        let mut pool = TestPool::new();
        for _ in 0..3 {
            let idx = pool.insert();
            *pool.at_mut(idx) = 9;
        }
        let item = pool.at(2);
        assert_eq!(pool.index_of(item), 2);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_at_out_of_bounds() {
        let pool = TestPool::new();
        pool.at(0);
    }

    #[test]
    #[should_panic(expected = "maximum size reached")]
    fn test_capacity_exhausted() {
        let mut pool = Pool::<u64, 8, 4>::new();
        for _ in 0..9 {
            let idx = pool.insert();
            *pool.at_mut(idx) = 1;
        }
    }

    #[test]
    fn test_from_raw_checks_counters() {
        let mut pool = Pool::<u64, 16, 4>::new();
        for v in 1..=5u64 {
            let idx = pool.insert();
            *pool.at_mut(idx) = v;
        }
        let rebuilt = Pool::<u64, 16, 4>::from_raw(pool.items().to_vec(), pool.counters().to_vec()).unwrap();
        assert_eq!(rebuilt.len(), 5);
        assert_eq!(rebuilt.next_empty(), 5);

        assert!(Pool::<u64, 16, 4>::from_raw(pool.items().to_vec(), vec![4, 2]).is_none());
        assert!(Pool::<u64, 16, 4>::from_raw(vec![1; 3], vec![3]).is_none());
    }
}
