//! The growable array container.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Deref, DerefMut, Index, IndexMut, RangeBounds};
use std::slice::SliceIndex;

use relo_buffer::{strategy, Allocator, Global, Placement, Relocate, SplitBuffer, Strategy};
use relo_core::{GrowthRatio, IndexError, TryReserveError};

use crate::iter::IntoIter;

/// A contiguous growable array.
///
/// Backed by a [`SplitBuffer`] whose live run always starts at slot zero,
/// so all spare capacity sits behind the last element. Growth follows the
/// buffer's [`GrowthRatio`] and relocates elements with the cheapest
/// strategy their [`Relocate`] classification allows.
///
/// Operations that may allocate come in two forms: `try_*` returns a
/// [`TryReserveError`] and leaves the vector exactly as it was, while the
/// plain form panics.
pub struct GrowVec<T, A: Allocator = Global> {
    buf: SplitBuffer<T, A>,
}

impl<T> GrowVec<T, Global> {
    /// An empty vector. Does not allocate.
    pub const fn new() -> Self {
        Self::new_in(Global)
    }

    /// An empty vector with room for exactly `capacity` elements.
    ///
    /// # Panics
    ///
    /// Panics on capacity overflow or allocation failure.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_in(capacity, Global)
    }
}

impl<T, A: Allocator> GrowVec<T, A> {
    /// An empty vector on `alloc`. Does not allocate.
    pub const fn new_in(alloc: A) -> Self {
        Self {
            buf: SplitBuffer::new_in(alloc).with_placement(Placement::Packed),
        }
    }

    /// An empty vector on `alloc` with room for exactly `capacity`
    /// elements.
    ///
    /// # Panics
    ///
    /// Panics on capacity overflow or allocation failure.
    pub fn with_capacity_in(capacity: usize, alloc: A) -> Self {
        match Self::try_with_capacity_in(capacity, alloc) {
            Ok(vec) => vec,
            Err(err) => err.panic(),
        }
    }

    /// Fallible form of [`with_capacity_in`](Self::with_capacity_in).
    pub fn try_with_capacity_in(capacity: usize, alloc: A) -> Result<Self, TryReserveError> {
        let buf = SplitBuffer::with_capacity_in(capacity, 0, alloc)?;
        Ok(Self {
            buf: buf.with_placement(Placement::Packed),
        })
    }

    /// Use `growth` for every future reallocation.
    pub fn with_growth(mut self, growth: GrowthRatio) -> Self {
        self.buf.set_growth(growth);
        self
    }

    /// The growth ratio applied on reallocation.
    pub fn growth(&self) -> GrowthRatio {
        self.buf.growth()
    }

    /// The allocator backing the vector.
    pub fn allocator(&self) -> &A {
        self.buf.allocator()
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether the vector holds no elements.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Number of elements the vector can hold without reallocating.
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    /// Checked access: `Err` when `index` is out of bounds.
    pub fn at(&self, index: usize) -> Result<&T, IndexError> {
        let len = self.len();
        self.buf.get(index).ok_or(IndexError { index, len })
    }

    /// Checked mutable access: `Err` when `index` is out of bounds.
    pub fn at_mut(&mut self, index: usize) -> Result<&mut T, IndexError> {
        let len = self.len();
        self.buf.get_mut(index).ok_or(IndexError { index, len })
    }

    /// The elements as a slice.
    pub fn as_slice(&self) -> &[T] {
        self.buf.as_slice()
    }

    /// The elements as a mutable slice.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self.buf.as_mut_slice()
    }

    /// Remove and return the last element.
    pub fn pop_back(&mut self) -> Option<T> {
        self.buf.pop_back()
    }

    /// Destroy every element past the first `len`. Capacity is kept.
    pub fn truncate(&mut self, len: usize) {
        self.buf.truncate(len);
    }

    /// Destroy every element. Capacity is kept.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Exchange contents, capacity and allocator with `other` in O(1).
    pub fn swap_with(&mut self, other: &mut Self) {
        self.buf.swap_with(&mut other.buf);
    }
}

impl<T: Relocate, A: Allocator> GrowVec<T, A> {
    /// Append `value`.
    ///
    /// When the vector is full and the allocator cannot resize the block
    /// itself, the new element is constructed first in a fresh block and
    /// the old elements are relocated in front of it. On `Err` the vector
    /// is unchanged and `value` is dropped.
    pub fn try_push_back(&mut self, value: T) -> Result<(), TryReserveError> {
        if strategy::<T, A>() == Strategy::Delegated {
            // The allocator may extend the block in place.
            return self.buf.try_push_back(value);
        }
        let len = self.len();
        self.buf.try_insert(len, value)
    }

    /// Append `value`.
    ///
    /// # Panics
    ///
    /// Panics on capacity overflow or allocation failure.
    pub fn push_back(&mut self, value: T) {
        if let Err(err) = self.try_push_back(value) {
            err.panic();
        }
    }

    /// Append the value produced by `make`, reserving room first.
    ///
    /// `make` is only called once the slot is guaranteed; on `Err` it is
    /// never called.
    pub fn try_emplace_back<F: FnOnce() -> T>(
        &mut self,
        make: F,
    ) -> Result<&mut T, TryReserveError> {
        self.try_reserve(1)?;
        let len = self.len();
        self.buf.try_insert(len, make())?;
        Ok(&mut self.buf[len])
    }

    /// Append the value produced by `make` and return a reference to it.
    ///
    /// # Panics
    ///
    /// Panics on capacity overflow or allocation failure.
    pub fn emplace_back<F: FnOnce() -> T>(&mut self, make: F) -> &mut T {
        match self.try_emplace_back(make) {
            Ok(slot) => slot,
            Err(err) => err.panic(),
        }
    }

    /// Insert `value` at `index`, shifting later elements right.
    ///
    /// On `Err` the vector is unchanged and `value` is dropped.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    pub fn try_insert(&mut self, index: usize, value: T) -> Result<(), TryReserveError> {
        self.buf.try_insert(index, value)
    }

    /// Insert `value` at `index`, shifting later elements right.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`, on capacity overflow or on allocation
    /// failure.
    pub fn insert(&mut self, index: usize, value: T) {
        if let Err(err) = self.try_insert(index, value) {
            err.panic();
        }
    }

    /// Insert the value produced by `make` at `index`, reserving room
    /// first so `make` only runs once the insertion cannot fail.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`, on capacity overflow or on allocation
    /// failure.
    pub fn emplace<F: FnOnce() -> T>(&mut self, index: usize, make: F) -> &mut T {
        let len = self.len();
        assert!(
            index <= len,
            "insertion index (is {index}) should be <= len (is {len})"
        );
        if let Err(err) = self.try_reserve(1) {
            err.panic();
        }
        self.insert(index, make());
        &mut self.buf[index]
    }

    /// Remove and return the element at `index`, shifting later elements
    /// left. Never reallocates.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len`.
    pub fn erase(&mut self, index: usize) -> T {
        self.buf.remove(index)
    }

    /// Destroy the elements in `range`, shifting later elements left.
    /// Never reallocates.
    ///
    /// # Panics
    ///
    /// Panics if the range is decreasing or extends past `len`.
    pub fn erase_range<R: RangeBounds<usize>>(&mut self, range: R) {
        self.buf.erase_range(range);
    }

    /// Keep only the elements for which `keep` returns `true`.
    pub fn retain<F: FnMut(&T) -> bool>(&mut self, keep: F) {
        self.buf.retain(keep);
    }

    /// Ensure room for at least `additional` more elements, growing by the
    /// growth ratio.
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), TryReserveError> {
        self.buf.try_reserve_back(additional)
    }

    /// Ensure room for at least `additional` more elements.
    ///
    /// # Panics
    ///
    /// Panics on capacity overflow or allocation failure.
    pub fn reserve(&mut self, additional: usize) {
        if let Err(err) = self.try_reserve(additional) {
            err.panic();
        }
    }

    /// Ensure room for exactly `additional` more elements.
    pub fn try_reserve_exact(&mut self, additional: usize) -> Result<(), TryReserveError> {
        self.buf.try_reserve_exact_back(additional)
    }

    /// Ensure room for exactly `additional` more elements.
    ///
    /// # Panics
    ///
    /// Panics on capacity overflow or allocation failure.
    pub fn reserve_exact(&mut self, additional: usize) {
        if let Err(err) = self.try_reserve_exact(additional) {
            err.panic();
        }
    }

    /// Release all spare capacity.
    ///
    /// # Panics
    ///
    /// Panics on allocation failure.
    pub fn shrink_to_fit(&mut self) {
        self.buf.shrink_to_fit();
    }

    /// The capacity a reallocation to hold `new_len` elements would pick:
    /// the growth ratio applied to the current capacity, at least
    /// `new_len`, capped at the largest addressable element count.
    pub fn recommend(&self, new_len: usize) -> Result<usize, TryReserveError> {
        self.buf.recommend(new_len.saturating_sub(self.len()))
    }

    /// Resize to `new_len`, filling new slots with values from `make`.
    ///
    /// Growth reserves the whole extension up front; on `Err` the vector
    /// is unchanged and `make` is never called.
    pub fn try_resize_with<F: FnMut() -> T>(
        &mut self,
        new_len: usize,
        mut make: F,
    ) -> Result<(), TryReserveError> {
        let len = self.len();
        if new_len <= len {
            self.truncate(new_len);
            return Ok(());
        }
        self.try_reserve(new_len - len)?;
        for _ in len..new_len {
            self.buf.try_push_back(make())?;
        }
        Ok(())
    }

    /// Resize to `new_len`, filling new slots with values from `make`.
    ///
    /// # Panics
    ///
    /// Panics on capacity overflow or allocation failure.
    pub fn resize_with<F: FnMut() -> T>(&mut self, new_len: usize, make: F) {
        if let Err(err) = self.try_resize_with(new_len, make) {
            err.panic();
        }
    }

    /// Resize to `new_len`, filling new slots with `T::default()`.
    pub fn resize_default(&mut self, new_len: usize)
    where
        T: Default,
    {
        self.resize_with(new_len, T::default);
    }
}

impl<T: Relocate + Clone, A: Allocator> GrowVec<T, A> {
    /// Resize to `new_len`, filling new slots with clones of `fill`.
    ///
    /// On `Err` the vector is unchanged.
    pub fn try_resize(&mut self, new_len: usize, fill: T) -> Result<(), TryReserveError> {
        self.try_resize_with(new_len, || fill.clone())
    }

    /// Resize to `new_len`, filling new slots with clones of `fill`.
    ///
    /// # Panics
    ///
    /// Panics on capacity overflow or allocation failure.
    pub fn resize(&mut self, new_len: usize, fill: T) {
        if let Err(err) = self.try_resize(new_len, fill) {
            err.panic();
        }
    }

    /// Append clones of every element of `other`.
    pub fn extend_from_slice(&mut self, other: &[T]) {
        self.reserve(other.len());
        for value in other {
            self.push_back(value.clone());
        }
    }
}

impl<T: Relocate + Clone> GrowVec<T, Global> {
    /// A vector of `n` clones of `elem`.
    pub fn from_elem(elem: T, n: usize) -> Self {
        let mut vec = Self::with_capacity(n);
        vec.resize(n, elem);
        vec
    }
}

impl<T, A: Allocator> Deref for GrowVec<T, A> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T, A: Allocator> DerefMut for GrowVec<T, A> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T, I: SliceIndex<[T]>, A: Allocator> Index<I> for GrowVec<T, A> {
    type Output = I::Output;

    fn index(&self, index: I) -> &Self::Output {
        Index::index(self.as_slice(), index)
    }
}

impl<T, I: SliceIndex<[T]>, A: Allocator> IndexMut<I> for GrowVec<T, A> {
    fn index_mut(&mut self, index: I) -> &mut Self::Output {
        IndexMut::index_mut(self.as_mut_slice(), index)
    }
}

impl<T, A: Allocator> AsRef<[T]> for GrowVec<T, A> {
    fn as_ref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T, A: Allocator> AsMut<[T]> for GrowVec<T, A> {
    fn as_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T, A: Allocator + Default> Default for GrowVec<T, A> {
    fn default() -> Self {
        Self::new_in(A::default())
    }
}

impl<T: Relocate + Clone, A: Allocator + Clone> Clone for GrowVec<T, A> {
    fn clone(&self) -> Self {
        Self {
            buf: self.buf.clone(),
        }
    }
}

impl<T: fmt::Debug, A: Allocator> fmt::Debug for GrowVec<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_slice(), f)
    }
}

impl<T: Hash, A: Allocator> Hash for GrowVec<T, A> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_slice().hash(state);
    }
}

impl<T: PartialEq<U>, U, A: Allocator, B: Allocator> PartialEq<GrowVec<U, B>> for GrowVec<T, A> {
    fn eq(&self, other: &GrowVec<U, B>) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: PartialEq<U>, U, A: Allocator> PartialEq<[U]> for GrowVec<T, A> {
    fn eq(&self, other: &[U]) -> bool {
        self.as_slice() == other
    }
}

impl<T: PartialEq<U>, U, A: Allocator> PartialEq<&[U]> for GrowVec<T, A> {
    fn eq(&self, other: &&[U]) -> bool {
        self.as_slice() == *other
    }
}

impl<T: PartialEq<U>, U, A: Allocator, const N: usize> PartialEq<[U; N]> for GrowVec<T, A> {
    fn eq(&self, other: &[U; N]) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: PartialEq<U>, U, A: Allocator> PartialEq<Vec<U>> for GrowVec<T, A> {
    fn eq(&self, other: &Vec<U>) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Eq, A: Allocator> Eq for GrowVec<T, A> {}

impl<T: PartialOrd, A: Allocator> PartialOrd for GrowVec<T, A> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.as_slice().partial_cmp(other.as_slice())
    }
}

impl<T: Ord, A: Allocator> Ord for GrowVec<T, A> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_slice().cmp(other.as_slice())
    }
}

impl<T: Relocate, A: Allocator> Extend<T> for GrowVec<T, A> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        self.reserve(iter.size_hint().0);
        for value in iter {
            self.push_back(value);
        }
    }
}

impl<'a, T: Relocate + Copy + 'a, A: Allocator> Extend<&'a T> for GrowVec<T, A> {
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        self.extend(iter.into_iter().copied());
    }
}

impl<T: Relocate> FromIterator<T> for GrowVec<T, Global> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut vec = Self::new();
        vec.extend(iter);
        vec
    }
}

impl<T: Relocate> From<Vec<T>> for GrowVec<T, Global> {
    fn from(vec: Vec<T>) -> Self {
        vec.into_iter().collect()
    }
}

impl<T: Relocate, const N: usize> From<[T; N]> for GrowVec<T, Global> {
    fn from(array: [T; N]) -> Self {
        array.into_iter().collect()
    }
}

impl<T: Relocate + Clone> From<&[T]> for GrowVec<T, Global> {
    fn from(slice: &[T]) -> Self {
        let mut vec = Self::new();
        vec.extend_from_slice(slice);
        vec
    }
}

impl<T, A: Allocator> IntoIterator for GrowVec<T, A> {
    type Item = T;
    type IntoIter = IntoIter<T, A>;

    fn into_iter(self) -> IntoIter<T, A> {
        IntoIter::new(self.buf)
    }
}

impl<'a, T, A: Allocator> IntoIterator for &'a GrowVec<T, A> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T, A: Allocator> IntoIterator for &'a mut GrowVec<T, A> {
    type Item = &'a mut T;
    type IntoIter = std::slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relo_test_utils::{Ledger, TestAllocator, Tracked};

    #[test]
    fn at_reports_out_of_bounds() {
        let mut v: GrowVec<u32> = (0..3).collect();
        assert_eq!(v.at(2), Ok(&2));
        assert_eq!(v.at(3), Err(IndexError { index: 3, len: 3 }));
        *v.at_mut(0).unwrap() = 10;
        assert_eq!(v, [10, 1, 2]);
        assert!(v.at_mut(7).is_err());
    }

    #[test]
    #[should_panic(expected = "index out of bounds")]
    fn index_out_of_bounds_panics() {
        let v: GrowVec<u32> = GrowVec::new();
        let _ = v[0];
    }

    #[test]
    fn pushes_keep_front_spare_at_zero() {
        let mut v = GrowVec::new();
        for i in 0..100u32 {
            v.push_back(i);
            v.insert(v.len() / 2, i);
            assert_eq!(v.buf.front_spare(), 0);
        }
        v.erase_range(10..20);
        v.retain(|x| x % 2 == 0);
        v.shrink_to_fit();
        assert_eq!(v.buf.front_spare(), 0);
        assert_eq!(v.capacity(), v.len());
    }

    #[test]
    fn emplace_constructs_in_place() {
        let mut v = GrowVec::new();
        *v.emplace_back(|| 1u8) += 1;
        v.emplace(0, || 7);
        assert_eq!(v, [7, 2]);
    }

    #[test]
    fn emplace_back_does_not_call_closure_on_failure() {
        let alloc = TestAllocator::new();
        let mut v = GrowVec::new_in(alloc.clone());
        alloc.fail_next();
        let mut called = false;
        let result = v.try_emplace_back(|| {
            called = true;
            1u64
        });
        assert!(result.is_err());
        assert!(!called);
        assert!(v.is_empty());
    }

    #[test]
    fn resize_grows_and_shrinks() {
        let mut v = GrowVec::new();
        v.resize(5, 'a');
        assert_eq!(v, ['a'; 5]);
        v.resize(2, 'b');
        assert_eq!(v, ['a', 'a']);
        let mut n = 0;
        v.resize_with(4, || {
            n += 1;
            char::from(b'0' + n)
        });
        assert_eq!(v, ['a', 'a', '1', '2']);
        let mut d: GrowVec<u16> = GrowVec::new();
        d.resize_default(3);
        assert_eq!(d, [0, 0, 0]);
    }

    #[test]
    fn failed_resize_is_strong() {
        let ledger = Ledger::new();
        let alloc = TestAllocator::new();
        let mut v = GrowVec::with_capacity_in(2, alloc.clone());
        v.push_back(ledger.track(1));
        v.push_back(ledger.track(2));
        alloc.fail_next();
        let fill = ledger.track(0);
        assert!(v.try_resize(10, fill).is_err());
        assert_eq!(v.len(), 2);
        assert_eq!(v.capacity(), 2);
        assert_eq!(ledger.live(), 2);
    }

    #[test]
    fn recommend_applies_growth_ratio() {
        let v: GrowVec<u32> = GrowVec::with_capacity(10).with_growth(GrowthRatio::ONE_AND_A_HALF);
        assert_eq!(v.recommend(11), Ok(15));
        assert_eq!(v.recommend(40), Ok(40));
        assert!(v.recommend(usize::MAX).is_err());
    }

    #[test]
    fn reserve_exact_and_shrink() {
        let mut v: GrowVec<u64> = GrowVec::new();
        v.reserve_exact(7);
        assert_eq!(v.capacity(), 7);
        v.extend_from_slice(&[1, 2, 3]);
        v.shrink_to_fit();
        assert_eq!(v.capacity(), 3);
        v.reserve(1);
        assert_eq!(v.capacity(), 6);
    }

    #[test]
    fn swap_with_and_take() {
        let mut a: GrowVec<u8> = GrowVec::from([1, 2]);
        let mut b = GrowVec::from(vec![3]);
        a.swap_with(&mut b);
        assert_eq!(a, [3]);
        assert_eq!(b, [1, 2]);
        let taken = std::mem::take(&mut b);
        assert!(b.is_empty());
        assert_eq!(taken, [1, 2]);
    }

    #[test]
    fn comparisons_and_formatting() {
        let a = GrowVec::from([1, 2, 3]);
        let b = a.clone();
        assert_eq!(a, b);
        assert!(a < GrowVec::from([1, 2, 4]));
        assert_eq!(a, vec![1, 2, 3]);
        assert_eq!(a, &[1, 2, 3][..]);
        assert_eq!(format!("{a:?}"), "[1, 2, 3]");
    }
}
