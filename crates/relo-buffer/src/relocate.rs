//! The relocate primitive and relocating bulk construction.
//!
//! [`relocate`] moves a run into a disjoint (or, for relocatable types,
//! overlapping) destination without destroying the source; the caller
//! follows up with [`release_sources`] when the source region is being
//! abandoned. [`construct_forward`] and [`construct_backward`] move a run
//! within one allocation and leave the source slots dead; they walk in the
//! direction that stays correct when the ranges overlap.
//!
//! All functions pick their code path from [`relocation`], which is a
//! compile-time constant per element type.

use std::mem;
use std::ptr::{self, NonNull};

use crate::alloc::Allocator;
use crate::classify::{relocation, Relocate, Relocation};

/// Move `count` values from `src` to `dst`.
///
/// - [`Relocation::Bitwise`]: one `memmove` of the whole run.
/// - [`Relocation::Custom`]: one call to [`Relocate::relocate_bulk`].
/// - [`Relocation::MoveConstruct`]: each value is move-constructed into
///   `dst` in index order through [`Allocator::construct`]; nothing at the
///   source is destroyed. If a move constructor panics, the values already
///   built at `dst` are destroyed before the panic continues.
///
/// After a relocatable move the source slots are dead. After a
/// move-constructing one they are still live and must be passed to
/// [`release_sources`] (or otherwise destroyed).
///
/// # Safety
///
/// `src` must hold `count` live values and `dst` must have `count` vacant
/// slots. The ranges may overlap only for relocatable types.
pub unsafe fn relocate<T: Relocate, A: Allocator>(
    alloc: &A,
    src: NonNull<T>,
    dst: NonNull<T>,
    count: usize,
) {
    match relocation::<T>() {
        // SAFETY: forwarded from the caller; `ptr::copy` tolerates overlap.
        Relocation::Bitwise => unsafe { ptr::copy(src.as_ptr(), dst.as_ptr(), count) },
        // SAFETY: forwarded from the caller; `relocate_bulk` has memmove
        // semantics.
        Relocation::Custom => unsafe { T::relocate_bulk(src.as_ptr(), dst.as_ptr(), count) },
        Relocation::MoveConstruct => {
            debug_assert!(disjoint(src, dst, count), "overlapping move-construct run");
            let mut built = Built::new(alloc, dst);
            for i in 0..count {
                // SAFETY: slot `i` of `src` is live; slot `i` of `dst` is
                // vacant and disjoint from every source slot.
                unsafe {
                    let value = T::move_construct(&mut *src.add(i).as_ptr());
                    alloc.construct(dst.add(i), value);
                }
                built.len += 1;
            }
            mem::forget(built);
        }
    }
}

/// Destroy the sources of a finished [`relocate`] call.
///
/// A no-op for relocatable types, whose sources are already dead.
///
/// # Safety
///
/// `src` must be the source of a completed `relocate` of `count` values.
pub unsafe fn release_sources<T: Relocate, A: Allocator>(alloc: &A, src: NonNull<T>, count: usize) {
    if matches!(relocation::<T>(), Relocation::MoveConstruct) {
        for i in 0..count {
            // SAFETY: the moved-from source values are still live.
            unsafe { alloc.destroy(src.add(i)) };
        }
    }
}

/// Move `count` values from `src` down to `dst` within one allocation,
/// lowest index first. Source slots are dead afterwards.
///
/// Correct for overlapping ranges with `dst <= src`. Relocatable types take
/// one `memmove`; others are move-constructed and their source destroyed
/// one slot at a time. If a move constructor panics, every value still
/// live in either range is destroyed before the panic continues, so the
/// caller must not count the run as live across the call.
///
/// # Safety
///
/// `src` must hold `count` live values, `dst` must be at or below `src`,
/// and `dst`'s slots outside the source range must be vacant.
pub unsafe fn construct_forward<T: Relocate, A: Allocator>(
    alloc: &A,
    src: NonNull<T>,
    dst: NonNull<T>,
    count: usize,
) {
    if is_move_construct::<T>() {
        debug_assert!(dst <= src);
        let mut guard = ShiftGuard {
            alloc,
            built: dst,
            built_len: 0,
            pending: src,
            pending_len: count,
        };
        for i in 0..count {
            // SAFETY: slot `i` of `src` is live. Slot `i` of `dst` is either
            // outside the source range or a source slot below `i`, which
            // has already been moved out and destroyed.
            unsafe {
                let value = T::move_construct(&mut *src.add(i).as_ptr());
                guard.pending = src.add(i + 1);
                guard.pending_len -= 1;
                alloc.destroy(src.add(i));
                alloc.construct(dst.add(i), value);
            }
            guard.built_len += 1;
        }
        mem::forget(guard);
    } else {
        // SAFETY: forwarded from the caller.
        unsafe { relocate(alloc, src, dst, count) }
    }
}

/// Move `count` values from `src` up to `dst` within one allocation,
/// highest index first. Source slots are dead afterwards.
///
/// The mirror image of [`construct_forward`], correct for overlapping
/// ranges with `dst >= src`.
///
/// # Safety
///
/// `src` must hold `count` live values, `dst` must be at or above `src`,
/// and `dst`'s slots outside the source range must be vacant.
pub unsafe fn construct_backward<T: Relocate, A: Allocator>(
    alloc: &A,
    src: NonNull<T>,
    dst: NonNull<T>,
    count: usize,
) {
    if is_move_construct::<T>() {
        debug_assert!(dst >= src);
        let mut guard = ShiftGuard {
            alloc,
            built: dst,
            built_len: 0,
            pending: src,
            pending_len: count,
        };
        for i in (0..count).rev() {
            // SAFETY: slot `i` of `src` is live. Slot `i` of `dst` is either
            // outside the source range or a source slot above `i`, which
            // has already been moved out and destroyed.
            unsafe {
                let value = T::move_construct(&mut *src.add(i).as_ptr());
                guard.pending_len -= 1;
                alloc.destroy(src.add(i));
                alloc.construct(dst.add(i), value);
                guard.built = dst.add(i);
            }
            guard.built_len += 1;
        }
        mem::forget(guard);
    } else {
        // SAFETY: forwarded from the caller.
        unsafe { relocate(alloc, src, dst, count) }
    }
}

const fn is_move_construct<T: Relocate>() -> bool {
    matches!(relocation::<T>(), Relocation::MoveConstruct)
}

fn disjoint<T>(a: NonNull<T>, b: NonNull<T>, count: usize) -> bool {
    let size = mem::size_of::<T>();
    if size == 0 || count == 0 {
        return true;
    }
    let (a, b) = (a.as_ptr() as usize, b.as_ptr() as usize);
    let span = count * size;
    a + span <= b || b + span <= a
}

/// Destroys the values built so far by an interrupted [`relocate`].
struct Built<'a, T, A: Allocator> {
    alloc: &'a A,
    start: NonNull<T>,
    len: usize,
}

impl<'a, T, A: Allocator> Built<'a, T, A> {
    fn new(alloc: &'a A, start: NonNull<T>) -> Self {
        Self {
            alloc,
            start,
            len: 0,
        }
    }
}

impl<T, A: Allocator> Drop for Built<'_, T, A> {
    fn drop(&mut self) {
        for i in 0..self.len {
            // SAFETY: the first `len` slots were constructed by `relocate`.
            unsafe { self.alloc.destroy(self.start.add(i)) };
        }
    }
}

/// Destroys both the moved and the not-yet-moved parts of an interrupted
/// in-place shift. The two runs never overlap.
struct ShiftGuard<'a, T, A: Allocator> {
    alloc: &'a A,
    built: NonNull<T>,
    built_len: usize,
    pending: NonNull<T>,
    pending_len: usize,
}

impl<T, A: Allocator> Drop for ShiftGuard<'_, T, A> {
    fn drop(&mut self) {
        // SAFETY: `built[..built_len]` and `pending[..pending_len]` are
        // exactly the live slots of the interrupted shift.
        unsafe {
            for i in 0..self.built_len {
                self.alloc.destroy(self.built.add(i));
            }
            for i in 0..self.pending_len {
                self.alloc.destroy(self.pending.add(i));
            }
        }
    }
}
