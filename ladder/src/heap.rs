use crate::error::{BookError, Result};

/// Fixed-capacity, minimum-oriented binary heap over prices.
///
/// A standalone secondary index — not wired into the book's hot path —
/// for callers that want a bounded watch-list of prices (e.g. "alert me
/// when any of these N prices becomes the best bid"). 1-indexed array
/// storage, classic swim/sink.
pub struct MinHeap<P> {
    keys: Vec<P>,
    n: usize,
}

impl<P: Ord + Copy + Default> MinHeap<P> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            keys: vec![P::default(); capacity + 1],
            n: 0,
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.keys.len() - 1
    }

    pub fn insert(&mut self, key: P) -> Result<()> {
        if self.n + 1 == self.keys.len() {
            return Err(BookError::Full);
        }
        self.n += 1;
        self.keys[self.n] = key;
        self.swim(self.n);
        Ok(())
    }

    pub fn top(&self) -> Result<P> {
        if self.is_empty() {
            return Err(BookError::Empty);
        }
        Ok(self.keys[1])
    }

    /// Removes and returns the minimum element.
    pub fn del_top(&mut self) -> Result<P> {
        if self.is_empty() {
            return Err(BookError::Empty);
        }
        let top = self.keys[1];
        self.keys[1] = self.keys[self.n];
        self.n -= 1;
        self.sink(1);
        Ok(top)
    }

    fn swim(&mut self, mut k: usize) {
        while k > 1 && self.keys[k] < self.keys[k / 2] {
            self.keys.swap(k, k / 2);
            k /= 2;
        }
    }

    fn sink(&mut self, mut k: usize) {
        while 2 * k <= self.n {
            let mut c = 2 * k;
            if c < self.n && self.keys[c + 1] < self.keys[c] {
                c += 1;
            }
            if self.keys[c] < self.keys[k] {
                self.keys.swap(c, k);
                k = c;
            } else {
                break;
            }
        }
    }
}
