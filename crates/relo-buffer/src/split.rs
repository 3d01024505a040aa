//! Contiguous buffer with spare capacity on both sides.
//!
//! A [`SplitBuffer`] owns one [`RawRegion`] and two indices into it,
//! `begin` and `end`. Elements live in `[begin, end)`; the slots before
//! `begin` and after `end` are spare. Pushing at either end is amortized
//! O(1): when one side runs out, the live run is first slid into the other
//! side's spare room, and only when both sides are full does the buffer
//! reallocate.
//!
//! ```text
//! first        begin              end           end_cap
//!   |  front spare |  live elements  |  back spare  |
//! ```

use std::fmt;
use std::ops::{Bound, Deref, DerefMut, RangeBounds};
use std::ptr::NonNull;
use std::slice;

use relo_core::{ElementRun, GrowthRatio, Markers, TryReserveError};

use crate::alloc::{max_elements, Allocator, Global};
use crate::classify::Relocate;
use crate::protocol::{reallocate, regrow_around, Regrow};
use crate::raw::RawRegion;
use crate::relocate::{construct_backward, construct_forward};

/// Where a reallocation puts the live run inside the new block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Placement {
    /// Split the new spare room between both ends, three quarters to the
    /// side that ran out. Suited to double-ended use.
    #[default]
    Balanced,
    /// Keep the live run at the start of the block when growing toward the
    /// back. Suited to append-only (vector-like) use.
    Packed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    Front,
    Back,
}

/// Growable contiguous storage with independent front and back spare
/// capacity.
///
/// Invariant: `0 <= begin <= end <= capacity`, and exactly the slots in
/// `[begin, end)` hold live values. Dropping the buffer destroys those
/// values and releases the block.
pub struct SplitBuffer<T, A: Allocator = Global> {
    region: RawRegion<T, A>,
    begin: usize,
    end: usize,
    growth: GrowthRatio,
    placement: Placement,
}

impl<T> SplitBuffer<T, Global> {
    /// An empty buffer on the global allocator. Does not allocate.
    pub const fn new() -> Self {
        Self::new_in(Global)
    }
}

impl<T, A: Allocator> SplitBuffer<T, A> {
    /// An empty buffer on `alloc`. Does not allocate.
    pub const fn new_in(alloc: A) -> Self {
        Self {
            region: RawRegion::new_in(alloc),
            begin: 0,
            end: 0,
            growth: GrowthRatio::DOUBLE,
            placement: Placement::Balanced,
        }
    }

    /// An empty buffer with room for `capacity` elements whose live run
    /// starts `front_spare` slots into the block.
    ///
    /// # Panics
    ///
    /// Panics if `front_spare > capacity`.
    pub fn with_capacity_in(
        capacity: usize,
        front_spare: usize,
        alloc: A,
    ) -> Result<Self, TryReserveError> {
        assert!(
            front_spare <= capacity,
            "front spare ({front_spare}) exceeds capacity ({capacity})"
        );
        Ok(Self {
            region: RawRegion::with_capacity_in(capacity, alloc)?,
            begin: front_spare,
            end: front_spare,
            growth: GrowthRatio::DOUBLE,
            placement: Placement::Balanced,
        })
    }

    /// Use `growth` for every future reallocation.
    pub const fn with_growth(mut self, growth: GrowthRatio) -> Self {
        self.growth = growth;
        self
    }

    /// Use `placement` for every future reallocation.
    pub const fn with_placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    /// The growth ratio applied on reallocation.
    pub fn growth(&self) -> GrowthRatio {
        self.growth
    }

    /// Replace the growth ratio.
    pub fn set_growth(&mut self, growth: GrowthRatio) {
        self.growth = growth;
    }

    /// The placement policy applied on reallocation.
    pub fn placement(&self) -> Placement {
        self.placement
    }

    /// The allocator backing the buffer.
    pub fn allocator(&self) -> &A {
        self.region.allocator()
    }

    /// Snapshot of the four buffer markers.
    pub fn markers(&self) -> Markers {
        Markers {
            first: 0,
            begin: self.begin,
            end: self.end,
            end_cap: self.region.capacity(),
        }
    }

    /// Number of live elements.
    pub fn len(&self) -> usize {
        self.end - self.begin
    }

    /// Whether the buffer holds no live elements.
    pub fn is_empty(&self) -> bool {
        self.begin == self.end
    }

    /// Total number of slots in the block.
    pub fn capacity(&self) -> usize {
        self.region.capacity()
    }

    /// Unused slots before the first element.
    pub fn front_spare(&self) -> usize {
        self.begin
    }

    /// Unused slots after the last element.
    pub fn back_spare(&self) -> usize {
        self.region.capacity() - self.end
    }

    /// The live elements as a slice.
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: `[begin, end)` are live, contiguous and inside the block.
        unsafe { slice::from_raw_parts(self.slot(self.begin).as_ptr(), self.len()) }
    }

    /// The live elements as a mutable slice.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: as above, and `&mut self` guarantees exclusivity.
        unsafe { slice::from_raw_parts_mut(self.slot(self.begin).as_ptr(), self.len()) }
    }

    /// Remove and return the first element.
    pub fn pop_front(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        // SAFETY: `begin` is live; advancing the marker retires the slot.
        let value = unsafe { self.slot(self.begin).read() };
        self.begin += 1;
        Some(value)
    }

    /// Remove and return the last element.
    pub fn pop_back(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        self.end -= 1;
        // SAFETY: the old last slot is live and now outside the run.
        Some(unsafe { self.slot(self.end).read() })
    }

    /// Destroy every element past the first `len`. Capacity is kept.
    pub fn truncate(&mut self, len: usize) {
        if len >= self.len() {
            return;
        }
        let old_end = self.end;
        self.end = self.begin + len;
        for i in self.end..old_end {
            // SAFETY: the slots past the new end are live and no longer
            // counted by the markers.
            unsafe { self.region.allocator().destroy(self.region.slot(i)) };
        }
    }

    /// Destroy every element. Capacity is kept and `begin` stays where it
    /// was.
    pub fn clear(&mut self) {
        self.truncate(0);
    }

    /// Exchange contents, capacity, policy and allocator with `other`.
    pub fn swap_with(&mut self, other: &mut Self) {
        std::mem::swap(self, other);
    }

    fn slot(&self, index: usize) -> NonNull<T> {
        self.region.slot(index)
    }

    fn debug_check(&self) {
        debug_assert!(
            self.markers().is_consistent(),
            "split buffer markers out of order: {}",
            self.markers()
        );
    }
}

impl<T: Relocate, A: Allocator> SplitBuffer<T, A> {
    /// Append `value`, making room first if the back is full.
    ///
    /// On `Err` the buffer is unchanged and `value` is dropped.
    pub fn try_push_back(&mut self, value: T) -> Result<(), TryReserveError> {
        if self.back_spare() == 0 {
            self.shift_front()?;
        }
        // SAFETY: `end` is a vacant slot inside the block.
        unsafe { self.region.allocator().construct(self.slot(self.end), value) };
        self.end += 1;
        self.debug_check();
        Ok(())
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

    /// Prepend `value`, making room first if the front is full.
    ///
    /// On `Err` the buffer is unchanged and `value` is dropped.
    pub fn try_push_front(&mut self, value: T) -> Result<(), TryReserveError> {
        if self.front_spare() == 0 {
            self.shift_back()?;
        }
        // SAFETY: `begin - 1` is a vacant slot inside the block.
        unsafe {
            self.region
                .allocator()
                .construct(self.slot(self.begin - 1), value)
        };
        self.begin -= 1;
        self.debug_check();
        Ok(())
    }

    /// Prepend `value`.
    ///
    /// # Panics
    ///
    /// Panics on capacity overflow or allocation failure.
    pub fn push_front(&mut self, value: T) {
        if let Err(err) = self.try_push_front(value) {
            err.panic();
        }
    }

    /// Make room at the front by sliding the live run toward the back.
    ///
    /// When the back spare is at least half the length, the run moves by
    /// half of that spare (rounded up) inside the current block. Otherwise
    /// the buffer reallocates to the recommended capacity with most of the
    /// new spare room in front.
    pub fn shift_back(&mut self) -> Result<(), TryReserveError> {
        let spare = self.back_spare();
        if self.worth_shifting(spare) {
            self.move_live_to(self.begin + (spare - spare / 2));
            return Ok(());
        }
        self.grow_for(Side::Front, 1)
    }

    /// Make room at the back by sliding the live run toward the front.
    ///
    /// The mirror image of [`shift_back`](Self::shift_back).
    pub fn shift_front(&mut self) -> Result<(), TryReserveError> {
        let spare = self.front_spare();
        if self.worth_shifting(spare) {
            self.move_live_to(self.begin - (spare - spare / 2));
            return Ok(());
        }
        self.grow_for(Side::Back, 1)
    }

    /// Insert `value` so that it ends up at `index`.
    ///
    /// Shifts the suffix right into back spare when there is some, else the
    /// prefix left into front spare, else reallocates around the new value.
    /// On `Err` the buffer is unchanged and `value` is dropped.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    pub fn try_insert(&mut self, index: usize, value: T) -> Result<(), TryReserveError> {
        let len = self.len();
        assert!(
            index <= len,
            "insertion index (is {index}) should be <= len (is {len})"
        );
        let begin = self.begin;

        if self.back_spare() > 0 {
            let at = begin + index;
            self.end = at;
            // SAFETY: the suffix `[at, at + len - index)` is live and moves up
            // one slot into back spare; `at` is then vacant.
            unsafe {
                let alloc = self.region.allocator();
                let (src, dst) = (self.region.slot(at), self.region.slot(at + 1));
                construct_backward(alloc, src, dst, len - index);
                alloc.construct(self.region.slot(at), value);
            }
            self.end = begin + len + 1;
        } else if self.front_spare() > 0 {
            self.begin = begin + index;
            // SAFETY: the prefix `[begin, begin + index)` is live and moves
            // down one slot into front spare; `begin - 1 + index` is then
            // vacant.
            unsafe {
                let alloc = self.region.allocator();
                let (src, dst) = (self.region.slot(begin), self.region.slot(begin - 1));
                construct_forward(alloc, src, dst, index);
                alloc.construct(self.region.slot(begin - 1 + index), value);
            }
            self.begin = begin - 1;
        } else {
            let new_capacity = self.recommend(1)?;
            let new_begin = self.back_biased_begin(new_capacity - len, 1);
            let plan = Regrow {
                begin,
                len,
                new_capacity,
                new_begin,
                gap_at: index,
            };
            // SAFETY: `[begin, begin + len)` are exactly the live elements.
            unsafe { regrow_around(&mut self.region, plan, value)? };
            self.begin = new_begin;
            self.end = new_begin + len + 1;
        }
        self.debug_check();
        Ok(())
    }

    /// Insert `value` at `index`.
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

    /// Remove and return the element at `index`, sliding the tail left over
    /// the gap. Never reallocates.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len`.
    pub fn remove(&mut self, index: usize) -> T {
        let len = self.len();
        assert!(
            index < len,
            "removal index (is {index}) should be < len (is {len})"
        );
        let at = self.begin + index;
        // SAFETY: `at` is live and read out exactly once; the tail after it
        // is live and slides down into the vacated slot.
        let value = unsafe { self.slot(at).read() };
        self.end = at;
        // SAFETY: see above; `end` excludes the tail while it moves.
        unsafe {
            construct_forward(
                self.region.allocator(),
                self.region.slot(at + 1),
                self.region.slot(at),
                len - index - 1,
            );
        }
        self.end = self.begin + len - 1;
        self.debug_check();
        value
    }

    /// Destroy the elements in `range` and slide the tail left over the
    /// gap. Never reallocates.
    ///
    /// # Panics
    ///
    /// Panics if the range is decreasing or extends past `len`.
    pub fn erase_range<R: RangeBounds<usize>>(&mut self, range: R) {
        let len = self.len();
        let (start, stop) = resolve_range(range, len);
        if start == stop {
            return;
        }
        let begin = self.begin;
        self.end = begin + start;
        // SAFETY: `[start, stop)` are live and destroyed once; the tail
        // `[stop, len)` is live and slides down into the vacated slots.
        unsafe {
            let alloc = self.region.allocator();
            for i in start..stop {
                alloc.destroy(self.region.slot(begin + i));
            }
            construct_forward(
                alloc,
                self.region.slot(begin + stop),
                self.region.slot(begin + start),
                len - stop,
            );
        }
        self.end = begin + len - (stop - start);
        self.debug_check();
    }

    /// Keep only the elements for which `keep` returns `true`, preserving
    /// their order. Never reallocates.
    ///
    /// If `keep` or a destructor panics, the buffer keeps the elements
    /// retained so far and leaks the unvisited rest.
    pub fn retain<F: FnMut(&T) -> bool>(&mut self, mut keep: F) {
        let (begin, len) = (self.begin, self.len());
        let mut kept = 0;
        self.end = begin;
        for i in 0..len {
            let slot = self.region.slot(begin + i);
            // SAFETY: slot `i` is live and has not been visited yet.
            if keep(unsafe { slot.as_ref() }) {
                if kept != i {
                    let dst = self.region.slot(begin + kept);
                    // SAFETY: slot `kept` was vacated earlier in this walk.
                    unsafe { construct_forward(self.region.allocator(), slot, dst, 1) };
                }
                kept += 1;
                self.end = begin + kept;
            } else {
                // SAFETY: the rejected value is live and never visited again.
                unsafe { self.region.allocator().destroy(slot) };
            }
        }
        self.debug_check();
    }

    /// Ensure at least `additional` slots of back spare, growing by the
    /// growth ratio if a reallocation is needed.
    pub fn try_reserve_back(&mut self, additional: usize) -> Result<(), TryReserveError> {
        if self.back_spare() >= additional {
            return Ok(());
        }
        self.grow_for(Side::Back, additional)
    }

    /// Ensure exactly enough room for `additional` more elements at the
    /// back, keeping the current front spare.
    pub fn try_reserve_exact_back(&mut self, additional: usize) -> Result<(), TryReserveError> {
        if self.back_spare() >= additional {
            return Ok(());
        }
        let max = max_elements::<T>();
        let new_capacity = self
            .end
            .checked_add(additional)
            .filter(|&cap| cap <= max)
            .ok_or(TryReserveError::CapacityOverflow {
                requested: self.len().saturating_add(additional),
                max,
            })?;
        self.relocate_into(new_capacity, self.begin)
    }

    /// Ensure at least `additional` slots of front spare, growing by the
    /// growth ratio if a reallocation is needed.
    pub fn try_reserve_front(&mut self, additional: usize) -> Result<(), TryReserveError> {
        if self.front_spare() >= additional {
            return Ok(());
        }
        self.grow_for(Side::Front, additional)
    }

    /// Reallocate to exactly `len` slots, dropping both spare regions.
    pub fn try_shrink_to_fit(&mut self) -> Result<(), TryReserveError> {
        if self.capacity() == self.len() {
            return Ok(());
        }
        self.relocate_into(self.len(), 0)
    }

    /// Reallocate to exactly `len` slots.
    ///
    /// # Panics
    ///
    /// Panics on allocation failure.
    pub fn shrink_to_fit(&mut self) {
        if let Err(err) = self.try_shrink_to_fit() {
            err.panic();
        }
    }

    /// The capacity a reallocation that must fit `additional` more
    /// elements would pick.
    pub fn recommend(&self, additional: usize) -> Result<usize, TryReserveError> {
        let max = max_elements::<T>();
        let required = self
            .len()
            .checked_add(additional)
            .ok_or(TryReserveError::CapacityOverflow {
                requested: usize::MAX,
                max,
            })?;
        self.growth.recommend(self.capacity(), required, max)
    }

    /// An in-place shift costs `len` moves and frees `ceil(spare / 2)`
    /// slots; it only pays off when that is a constant fraction of `len`.
    fn worth_shifting(&self, spare: usize) -> bool {
        spare > 0 && spare >= self.len() / 2
    }

    fn grow_for(&mut self, side: Side, additional: usize) -> Result<(), TryReserveError> {
        let new_capacity = self.recommend(additional)?;
        let spare = new_capacity - self.len();
        let new_begin = match side {
            Side::Front => (spare - spare / 4).max(additional),
            Side::Back => self.back_biased_begin(spare, additional),
        };
        self.relocate_into(new_capacity, new_begin)
    }

    /// Front offset for a reallocation demanding `additional` slots at the
    /// back out of `spare` new spare slots.
    fn back_biased_begin(&self, spare: usize, additional: usize) -> usize {
        match self.placement {
            Placement::Packed => 0,
            Placement::Balanced => (spare / 4).min(spare - additional),
        }
    }

    fn relocate_into(
        &mut self,
        new_capacity: usize,
        new_begin: usize,
    ) -> Result<(), TryReserveError> {
        let len = self.len();
        let run = ElementRun {
            count: len,
            old_offset: self.begin,
            new_offset: new_begin,
        };
        // SAFETY: the run covers exactly the live elements.
        unsafe { reallocate(&mut self.region, new_capacity, run)? };
        self.begin = new_begin;
        self.end = new_begin + len;
        self.debug_check();
        Ok(())
    }

    /// Slide the live run inside the current block so it starts at
    /// `new_begin`.
    fn move_live_to(&mut self, new_begin: usize) {
        let (begin, len) = (self.begin, self.len());
        if new_begin == begin {
            return;
        }
        debug_assert!(new_begin + len <= self.capacity());
        trace_event!(from = begin, to = new_begin, len, "shift in place");
        self.end = begin;
        // SAFETY: `[begin, begin + len)` is live and the target range is
        // inside the block; the walk direction matches the overlap.
        unsafe {
            let alloc = self.region.allocator();
            let (src, dst) = (self.region.slot(begin), self.region.slot(new_begin));
            if new_begin < begin {
                construct_forward(alloc, src, dst, len);
            } else {
                construct_backward(alloc, src, dst, len);
            }
        }
        self.begin = new_begin;
        self.end = new_begin + len;
        self.debug_check();
    }
}

fn resolve_range<R: RangeBounds<usize>>(range: R, len: usize) -> (usize, usize) {
    let start = match range.start_bound() {
        Bound::Included(&s) => s,
        Bound::Excluded(&s) => s.saturating_add(1),
        Bound::Unbounded => 0,
    };
    let stop = match range.end_bound() {
        Bound::Included(&e) => e.saturating_add(1),
        Bound::Excluded(&e) => e,
        Bound::Unbounded => len,
    };
    assert!(start <= stop, "range start ({start}) is greater than end ({stop})");
    assert!(stop <= len, "range end ({stop}) is out of bounds for len {len}");
    (start, stop)
}

impl<T, A: Allocator> Drop for SplitBuffer<T, A> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T, A: Allocator> Deref for SplitBuffer<T, A> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T, A: Allocator> DerefMut for SplitBuffer<T, A> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T, A: Allocator + Default> Default for SplitBuffer<T, A> {
    fn default() -> Self {
        Self::new_in(A::default())
    }
}

impl<T: Clone + Relocate, A: Allocator + Clone> Clone for SplitBuffer<T, A> {
    fn clone(&self) -> Self {
        let mut out = Self::with_capacity_in(self.len(), 0, self.allocator().clone())
            .unwrap_or_else(|err| err.panic())
            .with_growth(self.growth)
            .with_placement(self.placement);
        for value in self.iter() {
            out.push_back(value.clone());
        }
        out
    }
}

impl<T: fmt::Debug, A: Allocator> fmt::Debug for SplitBuffer<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: PartialEq<U>, U, A: Allocator, B: Allocator> PartialEq<SplitBuffer<U, B>>
    for SplitBuffer<T, A>
{
    fn eq(&self, other: &SplitBuffer<U, B>) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Eq, A: Allocator> Eq for SplitBuffer<T, A> {}

impl<T: Relocate, A: Allocator> Extend<T> for SplitBuffer<T, A> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        let (lower, _) = iter.size_hint();
        if let Err(err) = self.try_reserve_back(lower) {
            err.panic();
        }
        for value in iter {
            self.push_back(value);
        }
    }
}

impl<T: Relocate> FromIterator<T> for SplitBuffer<T, Global> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut buf = Self::new();
        buf.extend(iter);
        buf
    }
}

impl<'a, T, A: Allocator> IntoIterator for &'a SplitBuffer<T, A> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T, A: Allocator> IntoIterator for &'a mut SplitBuffer<T, A> {
    type Item = &'a mut T;
    type IntoIter = slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}
