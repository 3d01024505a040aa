//! Owning iterator for [`GrowVec`](crate::GrowVec).

use std::fmt;
use std::iter::FusedIterator;

use relo_buffer::{Allocator, Global, SplitBuffer};

/// Moves elements out of a [`GrowVec`](crate::GrowVec) from either end.
///
/// Holds the vector's buffer; each step pops one element off the front or
/// the back. Elements not yielded are dropped with the iterator.
pub struct IntoIter<T, A: Allocator = Global> {
    buf: SplitBuffer<T, A>,
}

impl<T, A: Allocator> IntoIter<T, A> {
    pub(crate) fn new(buf: SplitBuffer<T, A>) -> Self {
        Self { buf }
    }

    /// The elements not yet yielded.
    pub fn as_slice(&self) -> &[T] {
        self.buf.as_slice()
    }

    /// The elements not yet yielded, mutably.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self.buf.as_mut_slice()
    }
}

impl<T, A: Allocator> Iterator for IntoIter<T, A> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.buf.pop_front()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.buf.len();
        (len, Some(len))
    }

    fn count(self) -> usize {
        self.buf.len()
    }
}

impl<T, A: Allocator> DoubleEndedIterator for IntoIter<T, A> {
    fn next_back(&mut self) -> Option<T> {
        self.buf.pop_back()
    }
}

impl<T, A: Allocator> ExactSizeIterator for IntoIter<T, A> {}

impl<T, A: Allocator> FusedIterator for IntoIter<T, A> {}

impl<T: fmt::Debug, A: Allocator> fmt::Debug for IntoIter<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("IntoIter").field(&self.as_slice()).finish()
    }
}
