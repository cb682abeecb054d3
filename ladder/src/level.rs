use std::ops::{Add, Sub};

use slab::Slab;

use crate::queue::{OrderNode, OrderQueue};

/// All resting orders at a single price, in time priority.
///
/// Levels are recycled (see `pool`), so `price` is mutable only through
/// `set_price`, called exactly once when the pool hands out a fresh or
/// reused level.
pub struct PriceLevel<P, V> {
    price: P,
    queue: OrderQueue,
    total_volume: V,
}

impl<P, V> PriceLevel<P, V>
where
    P: Copy,
    V: Copy + Add<Output = V> + Sub<Output = V> + Default,
{
    pub fn new(price: P) -> Self {
        Self {
            price,
            queue: OrderQueue::new(),
            total_volume: V::default(),
        }
    }

    #[inline]
    pub fn price(&self) -> P {
        self.price
    }

    pub(crate) fn set_price(&mut self, price: P) {
        self.price = price;
    }

    #[inline]
    pub fn total_volume(&self) -> V {
        self.total_volume
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.queue.size()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn enqueue(&mut self, arena: &mut Slab<OrderNode<V>>, handle: usize, volume: V) {
        self.queue.enqueue(arena, handle);
        self.total_volume = self.total_volume + volume;
    }

    pub fn dequeue(&mut self, arena: &mut Slab<OrderNode<V>>) -> Option<usize> {
        let handle = self.queue.dequeue(arena)?;
        let volume = arena[handle].order.volume;
        self.total_volume = self.total_volume - volume;
        Some(handle)
    }

    /// Unlinks `handle` from the queue. Panics (a programming error,
    /// not a recoverable one) if `handle` does not belong to this level
    /// — the caller must check the order's back-reference first.
    pub fn delete(&mut self, arena: &mut Slab<OrderNode<V>>, handle: usize, volume: V) {
        self.queue.delete(arena, handle);
        self.total_volume = self.total_volume - volume;
    }

    /// Detaches every resting order and zeroes the level, releasing
    /// each order's arena slot — a bulk administrative clear, not a
    /// bulk cancel-with-return (the caller's handles become invalid).
    pub fn clear(&mut self, arena: &mut Slab<OrderNode<V>>) {
        while let Some(handle) = self.queue.dequeue(arena) {
            arena.remove(handle);
        }
        self.total_volume = V::default();
    }
}
