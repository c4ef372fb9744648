/// Fixed-capacity list used for the hard maxima

use std::ops::Deref;

/// A vector that refuses to grow past `N` items
#[derive(Debug, Clone, PartialEq)]
pub struct BoundedVec<T, const N: usize> {
    items: Vec<T>,
}

impl<T, const N: usize> BoundedVec<T, N> {
    /// Create an empty list
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Maximum number of items
    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Check if no more items can be added
    #[inline]
    pub fn is_full(&self) -> bool {
        self.items.len() >= N
    }

    /// Append an item, returning its index, or handing it back when full
    pub fn push(&mut self, item: T) -> Result<usize, T> {
        if self.is_full() {
            return Err(item);
        }
        self.items.push(item);
        Ok(self.items.len() - 1)
    }

    /// Get a mutable reference to an item
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.items.get_mut(index)
    }

    /// Remove and return the item at `index`, shifting later items down
    pub fn remove(&mut self, index: usize) -> Option<T> {
        if index < self.items.len() {
            Some(self.items.remove(index))
        } else {
            None
        }
    }

    /// Remove all items
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Iterate mutably over the items
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }
}

impl<T, const N: usize> Default for BoundedVec<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> Deref for BoundedVec<T, N> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.items
    }
}

impl<'a, T, const N: usize> IntoIterator for &'a BoundedVec<T, N> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_until_full() {
        let mut list: BoundedVec<u32, 3> = BoundedVec::new();
        assert_eq!(list.push(10), Ok(0));
        assert_eq!(list.push(20), Ok(1));
        assert_eq!(list.push(30), Ok(2));
        assert!(list.is_full());
        assert_eq!(list.push(40), Err(40));
        assert_eq!(list.len(), 3);
        assert_eq!(&list[..], &[10, 20, 30]);
    }

    #[test]
    fn test_remove_shifts() {
        let mut list: BoundedVec<u32, 4> = BoundedVec::new();
        for value in 1..=4 {
            list.push(value).unwrap();
        }
        assert_eq!(list.remove(1), Some(2));
        assert_eq!(&list[..], &[1, 3, 4]);
        assert_eq!(list.remove(9), None);
        assert!(!list.is_full());
    }

    #[test]
    fn test_capacity() {
        let list: BoundedVec<u8, 16> = BoundedVec::default();
        assert_eq!(list.capacity(), 16);
        assert!(list.is_empty());
    }
}
