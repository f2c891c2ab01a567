//! Fixed-capacity FIFO used for every rolling window in the pipeline.
use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    inner: VecDeque<T>,
    cap: usize,
}

impl<T> RingBuffer<T> {
    /// A zero capacity is bumped to 1 so `push` always retains the newest item.
    pub fn new(capacity: usize) -> Self {
        let cap = capacity.max(1);
        Self {
            inner: VecDeque::with_capacity(cap),
            cap,
        }
    }

    /// Append `item`, evicting and returning the oldest entry when full.
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.inner.len() == self.cap {
            self.inner.pop_front()
        } else {
            None
        };
        self.inner.push_back(item);
        evicted
    }

    pub fn pop(&mut self) -> Option<T> {
        self.inner.pop_front()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.inner.len() == self.cap
    }

    pub fn capacity(&self) -> usize {
        self.cap
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }

    pub fn front(&self) -> Option<&T> {
        self.inner.front()
    }

    pub fn back(&self) -> Option<&T> {
        self.inner.back()
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.inner.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_evicts_oldest() {
        let mut buf = RingBuffer::new(3);
        assert_eq!(buf.push(3), None);
        assert_eq!(buf.push(4), None);
        assert_eq!(buf.push(5), None);
        assert!(buf.is_full());
        assert_eq!(buf.push(1), Some(3));

        assert_eq!(buf.pop(), Some(4));
        assert_eq!(buf.pop(), Some(5));
        assert_eq!(buf.pop(), Some(1));
        assert_eq!(buf.pop(), None);
    }

    #[test]
    fn iter_runs_oldest_to_newest() {
        let mut buf = RingBuffer::new(3);
        for v in [3.1, 4.2, 5.3, 1.4] {
            buf.push(v);
        }
        let got: Vec<f64> = buf.iter().copied().collect();
        assert_eq!(got, vec![4.2, 5.3, 1.4]);
        assert_eq!(buf.front(), Some(&4.2));
        assert_eq!(buf.back(), Some(&1.4));
    }

    #[test]
    fn zero_capacity_keeps_one() {
        let mut buf = RingBuffer::new(0);
        buf.push('a');
        buf.push('b');
        assert_eq!(buf.len(), 1);
        assert_eq!(buf.capacity(), 1);
        assert_eq!(buf.back(), Some(&'b'));
    }
}
