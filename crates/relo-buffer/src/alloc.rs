//! Allocator capability set.
//!
//! An [`Allocator`] hands out raw blocks and constructs/destroys single
//! elements inside them. It may additionally advertise a bulk
//! [`reallocate`](Allocator::reallocate) primitive through
//! [`Allocator::REALLOCATE`]; the cooperation protocol reads that constant
//! at compile time and prefers the allocator's primitive for relocatable
//! element types.

use std::alloc::Layout;
use std::mem;
use std::ptr::{self, NonNull};

use relo_core::{AllocError, ElementRun, TryReserveError};

/// Memory provider for relo buffers.
///
/// Every value a buffer holds enters through [`construct`](Allocator::construct),
/// but only values that end their life inside the buffer leave through
/// [`destroy`](Allocator::destroy). Values handed back to the caller by
/// `pop_front`, `pop_back`, `remove` or an owning iterator are read out of
/// their slot and dropped by the caller, so an allocator counting both
/// hooks sees one more construct than destroy per such value.
///
/// # Safety
///
/// Implementors must guarantee that:
/// - a block returned by `allocate(layout)` is valid for reads and writes of
///   `layout.size()` bytes and aligned to `layout.align()`, and stays valid
///   until it is passed to `deallocate` (or to `reallocate`, which releases
///   it on success);
/// - `reallocate`, when it returns `Ok`, yields a block laid out as
///   `new_layout` whose bytes `[run.new_offset, run.new_offset + run.count)`
///   equal the old block's bytes `[run.old_offset, run.old_offset + run.count)`,
///   and has released the old block; when it returns `Err`, the old block
///   is unchanged in the bytes described by `run` and still owned by the
///   caller.
pub unsafe trait Allocator {
    /// Whether [`reallocate`](Allocator::reallocate) is a specialised
    /// primitive that should be preferred over allocate + copy + deallocate
    /// for relocatable element types.
    const REALLOCATE: bool = false;

    /// Allocate a block for `layout`. `layout.size()` is never zero.
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError>;

    /// Release a block previously returned by this allocator.
    ///
    /// # Safety
    ///
    /// `ptr` must denote a live block allocated by `self` with `layout`.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);

    /// Construct `value` into the uninitialised `slot`.
    ///
    /// # Safety
    ///
    /// `slot` must be valid for writes, aligned, and hold no live value.
    unsafe fn construct<T>(&self, slot: NonNull<T>, value: T) {
        // SAFETY: the caller guarantees `slot` is writable and vacant.
        unsafe { slot.as_ptr().write(value) }
    }

    /// Destroy the live value in `slot`, leaving it uninitialised.
    ///
    /// # Safety
    ///
    /// `slot` must hold a live value that is not used again.
    unsafe fn destroy<T>(&self, slot: NonNull<T>) {
        // SAFETY: the caller guarantees `slot` holds a live value.
        unsafe { ptr::drop_in_place(slot.as_ptr()) }
    }

    /// Resize the block at `ptr` from `old_layout` to `new_layout`, moving the
    /// byte run described by `run` (all offsets in bytes) to its new offset.
    ///
    /// The default allocates a fresh block, copies the run and releases the
    /// old block.
    ///
    /// # Safety
    ///
    /// `ptr` must denote a live block allocated by `self` with `old_layout`,
    /// `new_layout.size()` must be non-zero and share `old_layout`'s
    /// alignment, and `run` must fit both layouts.
    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_layout: Layout,
        run: ElementRun,
    ) -> Result<NonNull<u8>, AllocError> {
        debug_assert!(run.fits(old_layout.size(), new_layout.size()));
        let fresh = self.allocate(new_layout)?;
        // SAFETY: both blocks are live, distinct, and the run fits each.
        unsafe {
            ptr::copy_nonoverlapping(
                ptr.as_ptr().add(run.old_offset),
                fresh.as_ptr().add(run.new_offset),
                run.count,
            );
            self.deallocate(ptr, old_layout);
        }
        Ok(fresh)
    }
}

// SAFETY: every method forwards to `A`, which upholds the contract.
unsafe impl<A: Allocator> Allocator for &A {
    const REALLOCATE: bool = A::REALLOCATE;

    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        (**self).allocate(layout)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: forwarded contract.
        unsafe { (**self).deallocate(ptr, layout) }
    }

    unsafe fn construct<T>(&self, slot: NonNull<T>, value: T) {
        // SAFETY: forwarded contract.
        unsafe { (**self).construct(slot, value) }
    }

    unsafe fn destroy<T>(&self, slot: NonNull<T>) {
        // SAFETY: forwarded contract.
        unsafe { (**self).destroy(slot) }
    }

    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_layout: Layout,
        run: ElementRun,
    ) -> Result<NonNull<u8>, AllocError> {
        // SAFETY: forwarded contract.
        unsafe { (**self).reallocate(ptr, old_layout, new_layout, run) }
    }
}

/// The process-wide allocator from [`std::alloc`].
///
/// Advertises [`Allocator::REALLOCATE`]: resizing goes through
/// [`std::alloc::realloc`], which can often extend a block in place.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Global;

// SAFETY: delegates to the global allocator, which upholds the block
// validity requirements; `reallocate` keeps the run intact on both paths.
unsafe impl Allocator for Global {
    const REALLOCATE: bool = true;

    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        debug_assert!(layout.size() != 0, "zero-sized allocation request");
        // SAFETY: the layout has non-zero size.
        let raw = unsafe { std::alloc::alloc(layout) };
        NonNull::new(raw).ok_or(AllocError::from_layout(layout))
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: the caller guarantees `ptr` came from `allocate(layout)`.
        unsafe { std::alloc::dealloc(ptr.as_ptr(), layout) }
    }

    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_layout: Layout,
        run: ElementRun,
    ) -> Result<NonNull<u8>, AllocError> {
        debug_assert_eq!(old_layout.align(), new_layout.align());
        debug_assert!(run.fits(old_layout.size(), new_layout.size()));
        let base = ptr.as_ptr();

        if new_layout.size() >= old_layout.size() {
            // SAFETY: `ptr` was allocated with `old_layout`; the new size is
            // non-zero and does not overflow `isize` (it came from a Layout).
            let raw = unsafe { std::alloc::realloc(base, old_layout, new_layout.size()) };
            let grown = NonNull::new(raw).ok_or(AllocError::from_layout(new_layout))?;
            // SAFETY: the run fits the grown block, which holds the old bytes.
            unsafe {
                ptr::copy(
                    grown.as_ptr().add(run.old_offset),
                    grown.as_ptr().add(run.new_offset),
                    run.count,
                );
            }
            return Ok(grown);
        }

        // Shrinking: move the run under the new size first, then truncate.
        // SAFETY: the run fits the old block at both offsets.
        unsafe { ptr::copy(base.add(run.old_offset), base.add(run.new_offset), run.count) };
        // SAFETY: as above; the new size is non-zero.
        let raw = unsafe { std::alloc::realloc(base, old_layout, new_layout.size()) };
        match NonNull::new(raw) {
            Some(shrunk) => Ok(shrunk),
            None => {
                // SAFETY: the old block is still live; undo the move.
                unsafe { ptr::copy(base.add(run.new_offset), base.add(run.old_offset), run.count) };
                Err(AllocError::from_layout(new_layout))
            }
        }
    }
}

/// Maximum number of `T` a single region can address.
///
/// `isize::MAX` bytes divided by the element size; unbounded
/// (`usize::MAX`) for zero-sized types, which never allocate.
pub const fn max_elements<T>() -> usize {
    let size = mem::size_of::<T>();
    if size == 0 {
        usize::MAX
    } else {
        isize::MAX as usize / size
    }
}

/// Layout of an array of `n` elements of `T`.
///
/// Fails with [`TryReserveError::CapacityOverflow`] when `n` exceeds
/// [`max_elements`].
pub fn array_layout<T>(n: usize) -> Result<Layout, TryReserveError> {
    Layout::array::<T>(n).map_err(|_| TryReserveError::CapacityOverflow {
        requested: n,
        max: max_elements::<T>(),
    })
}
