use slab::Slab;

use crate::order::Order;
use crate::pool::LevelHandle;

/// An order together with the intrusive links and back-reference the
/// book needs to give O(1) cancel. Lives in the book's order arena;
/// addressed by `OrderHandle`, never moved once inserted.
pub struct OrderNode<V> {
    pub order: Order<V>,
    pub(crate) prev: Option<usize>,
    pub(crate) next: Option<usize>,
    pub(crate) level: Option<LevelHandle>,
}

impl<V> OrderNode<V> {
    pub fn new(order: Order<V>) -> Self {
        Self {
            order,
            prev: None,
            next: None,
            level: None,
        }
    }
}

/// Intrusive doubly-linked FIFO over nodes held in a shared arena. The
/// queue itself only ever stores `head`/`tail`/`size` — the links live
/// on the nodes, so enqueue/dequeue/delete never allocate.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderQueue {
    head: Option<usize>,
    tail: Option<usize>,
    size: usize,
}

impl OrderQueue {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    #[inline]
    pub fn head(&self) -> Option<usize> {
        self.head
    }

    /// Appends `handle` at the tail.
    ///
    /// Precondition: `handle` is not currently linked in any queue
    /// (`prev`/`next` both `None`). Violating this is a programming
    /// error, not a recoverable one — enqueuing an already-linked order
    /// would silently corrupt two lists at once.
    pub fn enqueue<V>(&mut self, arena: &mut Slab<OrderNode<V>>, handle: usize) {
        assert!(
            arena[handle].prev.is_none() && arena[handle].next.is_none(),
            "enqueue of an order that is already linked"
        );

        let old_tail = self.tail;
        arena[handle].prev = old_tail;
        arena[handle].next = None;
        if let Some(t) = old_tail {
            arena[t].next = Some(handle);
        }
        self.tail = Some(handle);
        if self.head.is_none() {
            self.head = Some(handle);
        }
        self.size += 1;
    }

    /// Removes and returns the head handle, or `None` if empty.
    pub fn dequeue<V>(&mut self, arena: &mut Slab<OrderNode<V>>) -> Option<usize> {
        let head = self.head?;
        self.head = arena[head].next;
        if let Some(h) = self.head {
            // keep `head.prev == None` canonical at all times
            arena[h].prev = None;
        }
        if self.tail == Some(head) {
            self.tail = None;
        }
        arena[head].next = None;
        self.size -= 1;
        Some(head)
    }

    /// O(1) unlink of an arbitrary resident handle.
    ///
    /// Precondition: `handle` is currently linked in this queue. The
    /// caller (the price level) is responsible for that guarantee;
    /// unlinking a handle from the wrong queue is a programming error.
    pub fn delete<V>(&mut self, arena: &mut Slab<OrderNode<V>>, handle: usize) {
        let prev = arena[handle].prev;
        let next = arena[handle].next;

        match prev {
            Some(p) => arena[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => arena[n].prev = prev,
            None => self.tail = prev,
        }

        arena[handle].prev = None;
        arena[handle].next = None;
        self.size -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Side;

    fn node(v: u32) -> OrderNode<u32> {
        OrderNode::new(Order::new(1, v, Side::Buy))
    }

    #[test]
    fn test_enqueue_dequeue_fifo() {
        let mut arena: Slab<OrderNode<u32>> = Slab::new();
        let a = arena.insert(node(1));
        let b = arena.insert(node(2));
        let c = arena.insert(node(3));

        let mut q = OrderQueue::new();
        q.enqueue(&mut arena, a);
        q.enqueue(&mut arena, b);
        q.enqueue(&mut arena, c);
        assert_eq!(q.size(), 3);

        assert_eq!(q.dequeue(&mut arena), Some(a));
        assert_eq!(q.dequeue(&mut arena), Some(b));
        assert_eq!(q.dequeue(&mut arena), Some(c));
        assert_eq!(q.dequeue(&mut arena), None);
        assert!(q.is_empty());
    }

    #[test]
    fn test_delete_interior() {
        let mut arena: Slab<OrderNode<u32>> = Slab::new();
        let a = arena.insert(node(1));
        let b = arena.insert(node(2));
        let c = arena.insert(node(3));

        let mut q = OrderQueue::new();
        q.enqueue(&mut arena, a);
        q.enqueue(&mut arena, b);
        q.enqueue(&mut arena, c);

        q.delete(&mut arena, b);
        assert_eq!(q.size(), 2);
        assert_eq!(q.dequeue(&mut arena), Some(a));
        assert_eq!(q.dequeue(&mut arena), Some(c));
    }

    #[test]
    fn test_delete_head_and_tail() {
        let mut arena: Slab<OrderNode<u32>> = Slab::new();
        let a = arena.insert(node(1));
        let b = arena.insert(node(2));

        let mut q = OrderQueue::new();
        q.enqueue(&mut arena, a);
        q.enqueue(&mut arena, b);

        q.delete(&mut arena, a);
        assert_eq!(q.head(), Some(b));
        q.delete(&mut arena, b);
        assert!(q.is_empty());
        assert_eq!(q.head(), None);
    }

    #[test]
    #[should_panic(expected = "already linked")]
    fn test_enqueue_already_linked_panics() {
        let mut arena: Slab<OrderNode<u32>> = Slab::new();
        let a = arena.insert(node(1));
        let mut q = OrderQueue::new();
        q.enqueue(&mut arena, a);
        q.enqueue(&mut arena, a);
    }
}
