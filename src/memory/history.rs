//! 有界历史缓冲
//!
//! 错误履历、监视履历、指标履历共用：超出 max_len 时丢弃最旧的记录（FIFO）。

use std::collections::VecDeque;

#[derive(Clone, Debug)]
pub struct BoundedHistory<T> {
    items: VecDeque<T>,
    max_len: usize,
}

impl<T> BoundedHistory<T> {
    pub fn new(max_len: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(max_len.min(1024)),
            max_len,
        }
    }

    pub fn push(&mut self, item: T) {
        self.items.push_back(item);
        self.prune();
    }

    fn prune(&mut self) {
        while self.items.len() > self.max_len {
            self.items.pop_front();
        }
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> {
        self.items.iter()
    }

    pub fn first(&self) -> Option<&T> {
        self.items.front()
    }

    pub fn last(&self) -> Option<&T> {
        self.items.back()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_never_exceeds_max_and_evicts_oldest() {
        let mut h = BoundedHistory::new(3);
        for i in 0..10 {
            h.push(i);
            assert!(h.len() <= 3);
        }
        assert_eq!(h.iter().copied().collect::<Vec<_>>(), vec![7, 8, 9]);
        assert_eq!(h.first(), Some(&7));
        assert_eq!(h.last(), Some(&9));
    }

    #[test]
    fn test_zero_capacity_keeps_nothing() {
        let mut h = BoundedHistory::new(0);
        h.push("x");
        assert!(h.is_empty());
    }
}
