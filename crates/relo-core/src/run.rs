//! Descriptors for buffer markers and relocated element runs.

use std::fmt;

/// The four logical markers of a buffer region, as element indices.
///
/// `first` is always `0` (the start of the allocation) and `end_cap` is
/// the capacity; `[begin, end)` holds the live elements. A well-formed
/// region satisfies `first <= begin <= end <= end_cap`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Markers {
    /// Start of the allocation.
    pub first: usize,
    /// First live element.
    pub begin: usize,
    /// One past the last live element.
    pub end: usize,
    /// One past the end of the allocation.
    pub end_cap: usize,
}

impl Markers {
    /// Markers of an empty region with no allocation.
    pub const EMPTY: Self = Self {
        first: 0,
        begin: 0,
        end: 0,
        end_cap: 0,
    };

    /// Whether `first <= begin <= end <= end_cap` holds.
    pub fn is_consistent(&self) -> bool {
        self.first <= self.begin && self.begin <= self.end && self.end <= self.end_cap
    }

    /// Number of live elements.
    pub fn len(&self) -> usize {
        self.end - self.begin
    }

    /// Whether the region holds no live elements.
    pub fn is_empty(&self) -> bool {
        self.begin == self.end
    }

    /// Size of the allocation in elements.
    pub fn capacity(&self) -> usize {
        self.end_cap - self.first
    }

    /// Unused slots before the first live element.
    pub fn front_spare(&self) -> usize {
        self.begin - self.first
    }

    /// Unused slots after the last live element.
    pub fn back_spare(&self) -> usize {
        self.end_cap - self.end
    }
}

impl fmt::Display for Markers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[first={}, begin={}, end={}, end_cap={}]",
            self.first, self.begin, self.end, self.end_cap
        )
    }
}

/// A run of `count` elements moved from `old_offset` in a source region
/// to `new_offset` in a destination region.
///
/// A run that does not fit either region is a caller bug, checked with
/// debug assertions by the relocation code, never reported as an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ElementRun {
    /// Number of elements to move.
    pub count: usize,
    /// Index of the first element in the source region.
    pub old_offset: usize,
    /// Index the first element lands at in the destination region.
    pub new_offset: usize,
}

impl ElementRun {
    /// A run of `count` elements kept at the same offset.
    pub const fn in_place(count: usize, offset: usize) -> Self {
        Self {
            count,
            old_offset: offset,
            new_offset: offset,
        }
    }

    /// Whether the run lies inside a source of `old_capacity` elements and
    /// a destination of `new_capacity` elements.
    pub fn fits(&self, old_capacity: usize, new_capacity: usize) -> bool {
        let old_end = self.old_offset.checked_add(self.count);
        let new_end = self.new_offset.checked_add(self.count);
        matches!(old_end, Some(e) if e <= old_capacity)
            && matches!(new_end, Some(e) if e <= new_capacity)
    }

    /// The same run expressed in bytes for elements of `elem_size` bytes.
    pub fn scaled(&self, elem_size: usize) -> Self {
        Self {
            count: self.count * elem_size,
            old_offset: self.old_offset * elem_size,
            new_offset: self.new_offset * elem_size,
        }
    }
}
