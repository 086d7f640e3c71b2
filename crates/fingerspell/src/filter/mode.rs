//! Mode over a sliding window.

use std::collections::VecDeque;

use super::Filter;

/// Stabilizes a stream of discrete values by reporting the most frequent value among the last few.
///
/// Values are kept in a FIFO window of fixed capacity; the oldest value is evicted when a value is
/// pushed into a full window. When several values share the highest count, the one whose first
/// occurrence in the window is the oldest wins.
#[derive(Debug, Clone)]
pub struct ModeFilter<T> {
    history: VecDeque<T>,
    /// Max. number of values to keep in the history.
    capacity: usize,
}

impl<T: PartialEq + Clone> ModeFilter<T> {
    /// Creates a filter that computes the mode of the last `capacity` values.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "mode filter capacity must be non-zero");
        Self {
            history: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Returns the most frequent value in the window, or `None` if the window is empty.
    pub fn mode(&self) -> Option<T> {
        let mut best: Option<(&T, usize)> = None;
        for (i, value) in self.history.iter().enumerate() {
            // Only the first occurrence of each value is considered.
            if self.history.iter().take(i).any(|v| v == value) {
                continue;
            }
            let count = self.history.iter().filter(|v| *v == value).count();
            match best {
                Some((_, best_count)) if best_count >= count => {}
                _ => best = Some((value, count)),
            }
        }
        best.map(|(value, _)| value.clone())
    }

    /// Returns an iterator over the window, oldest value first.
    pub fn window(&self) -> impl Iterator<Item = &T> + '_ {
        self.history.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.history.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T: PartialEq + Clone> Filter<T> for ModeFilter<T> {
    fn push(&mut self, value: T) -> T {
        self.history.push_back(value);
        if self.history.len() > self.capacity {
            self.history.pop_front();
        }

        match self.mode() {
            Some(mode) => mode,
            None => unreachable!("window cannot be empty after a push"),
        }
    }

    fn reset(&mut self) {
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use crate::alphabet::Letter::{self, *};

    use super::*;

    fn push_all(filter: &mut ModeFilter<Letter>, values: &[Letter]) -> Letter {
        let mut last = None;
        for &v in values {
            last = Some(filter.push(v));
        }
        last.unwrap()
    }

    #[test]
    fn majority() {
        let mut filter = ModeFilter::new(5);
        assert_eq!(push_all(&mut filter, &[A, A, B, A, B]), A);
    }

    #[test]
    fn tie_prefers_first_encountered() {
        let mut filter = ModeFilter::new(5);
        assert_eq!(push_all(&mut filter, &[A, B, A, B, C]), A);

        let mut filter = ModeFilter::new(5);
        assert_eq!(push_all(&mut filter, &[B, A, A, B, C]), B);

        let mut filter = ModeFilter::new(5);
        assert_eq!(push_all(&mut filter, &[C, D, E]), C);
    }

    #[test]
    fn eviction() {
        let mut filter = ModeFilter::new(5);
        push_all(&mut filter, &[A, A, A, A, A]);
        assert_eq!(filter.push(B), A);
        assert_eq!(filter.window().copied().collect::<Vec<_>>(), [A, A, A, A, B]);
        assert_eq!(filter.len(), 5);
    }

    #[test]
    fn eviction_changes_tie_break() {
        let mut filter = ModeFilter::new(5);
        assert_eq!(push_all(&mut filter, &[A, B, A, B, C]), A);
        // Evicts the first `A`, so `B` is now encountered first.
        assert_eq!(filter.push(C), B);
        assert_eq!(filter.window().copied().collect::<Vec<_>>(), [B, A, B, C, C]);
    }

    #[test]
    fn every_prefix() {
        let mut filter = ModeFilter::new(3);
        assert_eq!(filter.mode(), None);
        assert_eq!(filter.push(X), X);
        assert_eq!(filter.push(Y), X);
        assert_eq!(filter.push(Y), Y);
        assert_eq!(filter.push(X), Y);
        assert_eq!(filter.push(X), X);
    }

    #[test]
    fn reset_clears_window() {
        let mut filter = ModeFilter::new(5);
        push_all(&mut filter, &[A, A, A]);
        filter.reset();
        assert!(filter.is_empty());
        assert_eq!(filter.mode(), None);
        assert_eq!(filter.push(B), B);
    }

    #[test]
    fn random_windows_match_reference() {
        let mut rng = fastrand::Rng::with_seed(1234);
        let mut filter = ModeFilter::new(5);
        let mut reference = Vec::new();
        for _ in 0..500 {
            let v = rng.u8(0..4);
            reference.push(v);
            if reference.len() > 5 {
                reference.remove(0);
            }
            let got = filter.push(v);

            let max = reference
                .iter()
                .map(|x| reference.iter().filter(|y| *y == x).count())
                .max()
                .unwrap();
            let expected = *reference
                .iter()
                .find(|x| reference.iter().filter(|y| y == x).count() == max)
                .unwrap();
            assert_eq!(got, expected, "window {:?}", reference);
        }
    }

    #[test]
    #[should_panic]
    fn zero_capacity() {
        ModeFilter::<Letter>::new(0);
    }
}
