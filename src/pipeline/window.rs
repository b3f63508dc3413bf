use std::num::NonZeroUsize;

/// A bounded, ordered slice of a stream
///
/// The final window of a stream may hold fewer items than its capacity; its
/// shortness is visible through [`Window::len`] rather than through padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window<T> {
    /// Zero-based position of this window within its stream
    pub index: usize,
    pub capacity: NonZeroUsize,
    pub items: Vec<T>,
}

impl<T> Window<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() == self.capacity.get()
    }
}

/// Iterator adapter produced by [`Batched::batched`]
pub struct Windows<I> {
    inner: I,
    capacity: NonZeroUsize,
    next_index: usize,
}

impl<I: Iterator> Iterator for Windows<I> {
    type Item = Window<I::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        let items: Vec<I::Item> = self.inner.by_ref().take(self.capacity.get()).collect();
        if items.is_empty() {
            return None;
        }

        let window = Window {
            index: self.next_index,
            capacity: self.capacity,
            items,
        };
        self.next_index += 1;
        Some(window)
    }
}

pub trait Batched: Iterator + Sized {
    /// Group items into consecutive windows of at most `capacity` items
    fn batched(self, capacity: NonZeroUsize) -> Windows<Self> {
        Windows {
            inner: self,
            capacity,
            next_index: 0,
        }
    }
}

impl<I: Iterator> Batched for I {}

#[cfg(test)]
mod tests {
    use super::*;

    fn size(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn test_last_window_is_short_not_padded() {
        let windows: Vec<Window<i32>> = (1..=7).batched(size(3)).collect();

        assert_eq!(windows.len(), 3);
        assert_eq!(windows[0].items, vec![1, 2, 3]);
        assert_eq!(windows[2].items, vec![7]);
        assert!(windows[1].is_full());
        assert!(!windows[2].is_full());
        assert_eq!(windows[2].index, 2);
    }

    #[test]
    fn test_exact_multiple_and_empty_input() {
        assert_eq!((0..6).batched(size(3)).count(), 2);
        assert_eq!(std::iter::empty::<u8>().batched(size(3)).count(), 0);
    }

    #[test]
    fn test_windows_are_lazy() {
        let mut pulled = 0;
        let mut windows = std::iter::repeat_with(|| {
            pulled += 1;
            pulled
        })
        .batched(size(2));

        assert_eq!(windows.next().map(|w| w.items), Some(vec![1, 2]));
        assert_eq!(windows.next().map(|w| w.items), Some(vec![3, 4]));
    }
}
