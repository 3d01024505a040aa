//! Test utilities and instrumented types for relo development.
//!
//! Provides a counting, fault-injecting [`TestAllocator`] (plus its
//! [`Reallocating`] variant that advertises a bulk reallocate primitive)
//! and the element fixtures in [`fixtures`] that cover each relocation
//! class.

#![deny(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::alloc::Layout;
use std::cell::Cell;
use std::ptr::{self, NonNull};
use std::rc::Rc;

use relo_buffer::Allocator;
use relo_core::{AllocError, ElementRun};

pub use fixtures::{Chunk, Ledger, PanicOnMove, Point, Tracked};

/// Counter snapshot taken by [`TestAllocator::stats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AllocStats {
    pub allocations: usize,
    pub deallocations: usize,
    pub reallocations: usize,
    pub constructs: usize,
    pub destroys: usize,
    pub live_bytes: usize,
    pub peak_bytes: usize,
    pub failures: usize,
}

impl AllocStats {
    /// Blocks handed out and not yet released.
    pub fn live_blocks(&self) -> usize {
        self.allocations - self.deallocations
    }
}

#[derive(Default)]
struct State {
    stats: Cell<AllocStats>,
    fail_after: Cell<Option<usize>>,
}

impl State {
    fn update(&self, f: impl FnOnce(&mut AllocStats)) {
        let mut stats = self.stats.get();
        f(&mut stats);
        self.stats.set(stats);
    }

    /// Consume one unit of the failure budget; `true` means refuse.
    fn should_fail(&self) -> bool {
        match self.fail_after.get() {
            None => false,
            Some(0) => {
                self.update(|s| s.failures += 1);
                true
            }
            Some(n) => {
                self.fail_after.set(Some(n - 1));
                false
            }
        }
    }
}

/// Allocator over `std::alloc` that counts every call and can be told to
/// start refusing requests.
///
/// Clones share counters and the failure budget, so a test can keep one
/// handle while the container under test owns another.
#[derive(Clone, Default)]
pub struct TestAllocator {
    state: Rc<State>,
}

impl TestAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Let the next `n` allocation requests succeed, then refuse all of
    /// them until [`heal`](Self::heal) is called.
    pub fn fail_after(&self, n: usize) {
        self.state.fail_after.set(Some(n));
    }

    /// Refuse the very next allocation request (and all after it).
    pub fn fail_next(&self) {
        self.fail_after(0);
    }

    /// Stop refusing requests.
    pub fn heal(&self) {
        self.state.fail_after.set(None);
    }

    pub fn stats(&self) -> AllocStats {
        self.state.stats.get()
    }

    /// Wrap a clone of this allocator in [`Reallocating`].
    pub fn reallocating(&self) -> Reallocating {
        Reallocating(self.clone())
    }
}

impl std::fmt::Debug for TestAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestAllocator")
            .field("stats", &self.stats())
            .field("fail_after", &self.state.fail_after.get())
            .finish()
    }
}

#[allow(unsafe_code)]
// SAFETY: blocks come from `std::alloc` with the requested layout and are
// only released through `deallocate`; the default `reallocate` is kept.
unsafe impl Allocator for TestAllocator {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        assert_ne!(layout.size(), 0, "zero-sized allocation request");
        if self.state.should_fail() {
            return Err(AllocError::from_layout(layout));
        }
        // SAFETY: the layout has non-zero size.
        let raw = unsafe { std::alloc::alloc(layout) };
        let block = NonNull::new(raw).ok_or(AllocError::from_layout(layout))?;
        self.state.update(|s| {
            s.allocations += 1;
            s.live_bytes += layout.size();
            s.peak_bytes = s.peak_bytes.max(s.live_bytes);
        });
        Ok(block)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.state.update(|s| {
            s.deallocations += 1;
            s.live_bytes -= layout.size();
        });
        // SAFETY: the caller guarantees `ptr` came from `allocate(layout)`.
        unsafe { std::alloc::dealloc(ptr.as_ptr(), layout) }
    }

    unsafe fn construct<T>(&self, slot: NonNull<T>, value: T) {
        self.state.update(|s| s.constructs += 1);
        // SAFETY: the caller guarantees `slot` is writable and vacant.
        unsafe { slot.as_ptr().write(value) }
    }

    unsafe fn destroy<T>(&self, slot: NonNull<T>) {
        self.state.update(|s| s.destroys += 1);
        // SAFETY: the caller guarantees `slot` holds a live value.
        unsafe { ptr::drop_in_place(slot.as_ptr()) }
    }
}

/// A [`TestAllocator`] that advertises [`Allocator::REALLOCATE`], so
/// bitwise-relocatable element types hand growth to it wholesale.
///
/// Each successful delegated reallocation bumps
/// [`AllocStats::reallocations`].
#[derive(Clone, Debug, Default)]
pub struct Reallocating(pub TestAllocator);

impl Reallocating {
    pub fn stats(&self) -> AllocStats {
        self.0.stats()
    }

    pub fn inner(&self) -> &TestAllocator {
        &self.0
    }
}

#[allow(unsafe_code)]
// SAFETY: forwards to `TestAllocator`; `reallocate` copies the run into a
// fresh block before releasing the old one.
unsafe impl Allocator for Reallocating {
    const REALLOCATE: bool = true;

    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        self.0.allocate(layout)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: forwarded contract.
        unsafe { self.0.deallocate(ptr, layout) }
    }

    unsafe fn construct<T>(&self, slot: NonNull<T>, value: T) {
        // SAFETY: forwarded contract.
        unsafe { self.0.construct(slot, value) }
    }

    unsafe fn destroy<T>(&self, slot: NonNull<T>) {
        // SAFETY: forwarded contract.
        unsafe { self.0.destroy(slot) }
    }

    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_layout: Layout,
        run: ElementRun,
    ) -> Result<NonNull<u8>, AllocError> {
        let fresh = self.0.allocate(new_layout)?;
        // SAFETY: both blocks are live and distinct; the run fits each.
        unsafe {
            ptr::copy_nonoverlapping(
                ptr.as_ptr().add(run.old_offset),
                fresh.as_ptr().add(run.new_offset),
                run.count,
            );
            self.0.deallocate(ptr, old_layout);
        }
        self.0.state.update(|s| s.reallocations += 1);
        Ok(fresh)
    }
}
