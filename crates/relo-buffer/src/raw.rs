//! Owning handle over one raw allocation.
//!
//! A [`RawRegion`] owns a block of `capacity` uninitialised slots and the
//! allocator that produced it. It never constructs or destroys elements:
//! which slots are live is tracked by the buffer that owns the region.
//! Dropping a region only releases the block.

use std::alloc::Layout;
use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::ptr::NonNull;

use relo_core::TryReserveError;

use crate::alloc::{array_layout, Allocator, Global};

/// An allocation of `capacity` slots of `T`, owned together with its
/// allocator.
///
/// Zero-sized element types never allocate and report a capacity of
/// `usize::MAX`. A region with capacity zero holds a dangling pointer and
/// no allocation.
pub struct RawRegion<T, A: Allocator = Global> {
    ptr: NonNull<T>,
    cap: usize,
    alloc: A,
    _owns: PhantomData<T>,
}

// SAFETY: the region owns its block exclusively; sending it sends the
// block and the allocator together.
unsafe impl<T: Send, A: Allocator + Send> Send for RawRegion<T, A> {}
// SAFETY: shared access only hands out the pointer and the allocator.
unsafe impl<T: Sync, A: Allocator + Sync> Sync for RawRegion<T, A> {}

impl<T, A: Allocator> RawRegion<T, A> {
    const IS_ZST: bool = mem::size_of::<T>() == 0;

    /// An empty region that has not allocated.
    pub const fn new_in(alloc: A) -> Self {
        Self {
            ptr: NonNull::dangling(),
            cap: if Self::IS_ZST { usize::MAX } else { 0 },
            alloc,
            _owns: PhantomData,
        }
    }

    /// A region with room for exactly `capacity` elements.
    ///
    /// On failure the allocator is dropped along with the error.
    pub fn with_capacity_in(capacity: usize, alloc: A) -> Result<Self, TryReserveError> {
        if Self::IS_ZST || capacity == 0 {
            return Ok(Self::new_in(alloc));
        }
        let layout = array_layout::<T>(capacity)?;
        let ptr = alloc.allocate(layout)?.cast::<T>();
        Ok(Self {
            ptr,
            cap: capacity,
            alloc,
            _owns: PhantomData,
        })
    }

    /// Number of slots in the block.
    pub fn capacity(&self) -> usize {
        self.cap
    }

    /// Pointer to slot zero.
    pub fn as_ptr(&self) -> NonNull<T> {
        self.ptr
    }

    /// Pointer to slot `index`; `index == capacity` yields the end pointer.
    pub fn slot(&self, index: usize) -> NonNull<T> {
        debug_assert!(index <= self.cap, "slot {index} outside region of {}", self.cap);
        // SAFETY: `index <= cap`, so the offset stays inside (or one past)
        // the block; for zero-sized `T` every offset is zero bytes.
        unsafe { self.ptr.add(index) }
    }

    /// The allocator that owns the block.
    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    /// Layout of the current block, or `None` when nothing is allocated.
    pub fn layout(&self) -> Option<Layout> {
        if Self::IS_ZST || self.cap == 0 {
            return None;
        }
        array_layout::<T>(self.cap).ok()
    }

    /// Adopt `ptr` as the block without releasing the current one.
    ///
    /// # Safety
    ///
    /// `ptr` must be a block of `capacity` slots allocated by this region's
    /// allocator, and the current block must already have been released
    /// (for example by [`Allocator::reallocate`]).
    pub(crate) unsafe fn adopt(&mut self, ptr: NonNull<T>, capacity: usize) {
        self.ptr = ptr;
        self.cap = capacity;
    }

    /// Install `ptr` as the block and release the current one.
    ///
    /// # Safety
    ///
    /// As for [`adopt`](Self::adopt), except that the current block must
    /// still be live; it must hold no live elements.
    pub(crate) unsafe fn replace(&mut self, ptr: NonNull<T>, capacity: usize) {
        self.release();
        // SAFETY: forwarded from the caller; the old block is gone.
        unsafe { self.adopt(ptr, capacity) };
    }

    /// Release the block, leaving an empty region.
    ///
    /// The block must hold no live elements.
    pub(crate) fn release(&mut self) {
        if let Some(layout) = self.layout() {
            // SAFETY: the block was allocated by `self.alloc` with `layout`.
            unsafe { self.alloc.deallocate(self.ptr.cast(), layout) };
        }
        self.ptr = NonNull::dangling();
        self.cap = if Self::IS_ZST { usize::MAX } else { 0 };
    }
}

impl<T, A: Allocator + Default> Default for RawRegion<T, A> {
    fn default() -> Self {
        Self::new_in(A::default())
    }
}

impl<T, A: Allocator> Drop for RawRegion<T, A> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<T, A: Allocator + fmt::Debug> fmt::Debug for RawRegion<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawRegion")
            .field("ptr", &self.ptr)
            .field("capacity", &self.cap)
            .field("alloc", &self.alloc)
            .finish()
    }
}
