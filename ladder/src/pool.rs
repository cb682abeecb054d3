use std::ops::{Add, Sub};

use crossbeam::queue::SegQueue;

use crate::level::PriceLevel;

/// Opaque handle to a pooled price level, shared verbatim between a
/// side's price→level cache and the price index's node values — both
/// point at the same authoritative slot in the pool's backing storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LevelHandle(pub(crate) usize);

/// Object pool of recyclable `PriceLevel`s.
///
/// Backed by a plain growable `Vec` for storage and a concurrency-safe
/// free list for recycling. The book itself is single-threaded by
/// contract (see the crate's concurrency notes), so the free list sees
/// only one producer/consumer in practice — using a lock-free queue
/// instead of a bespoke single-threaded stack costs nothing here and
/// makes accidental cross-thread sharing at teardown inert rather than
/// unsound.
pub struct PriceLevelPool<P, V> {
    storage: Vec<PriceLevel<P, V>>,
    free: SegQueue<LevelHandle>,
}

impl<P, V> PriceLevelPool<P, V>
where
    P: Copy,
    V: Copy + Add<Output = V> + Sub<Output = V> + Default,
{
    pub fn new() -> Self {
        Self {
            storage: Vec::new(),
            free: SegQueue::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            storage: Vec::with_capacity(capacity),
            free: SegQueue::new(),
        }
    }

    /// Hands out a level for `price`, reusing a recycled slot when one
    /// is available and growing the backing storage otherwise.
    pub fn acquire(&mut self, price: P) -> LevelHandle {
        if let Some(handle) = self.free.pop() {
            self.storage[handle.0].set_price(price);
            handle
        } else {
            self.storage.push(PriceLevel::new(price));
            LevelHandle(self.storage.len() - 1)
        }
    }

    /// Returns a level to the free list.
    ///
    /// The level must already be cleared (`size() == 0 && total_volume()
    /// == 0`); returning a non-empty level is a programming error — the
    /// caller always calls `clear` first.
    pub fn release(&mut self, handle: LevelHandle) {
        debug_assert!(
            self.storage[handle.0].is_empty(),
            "returning a non-empty level to the pool"
        );
        self.free.push(handle);
    }

    #[inline]
    pub fn get(&self, handle: LevelHandle) -> &PriceLevel<P, V> {
        &self.storage[handle.0]
    }

    #[inline]
    pub fn get_mut(&mut self, handle: LevelHandle) -> &mut PriceLevel<P, V> {
        &mut self.storage[handle.0]
    }
}

impl<P, V> Default for PriceLevelPool<P, V>
where
    P: Copy,
    V: Copy + Add<Output = V> + Sub<Output = V> + Default,
{
    fn default() -> Self {
        Self::new()
    }
}
