//! Allocator cooperation protocol.
//!
//! Decides how a region grows or moves: [`reallocate`] carries one run of
//! live elements into a block of a new capacity, and [`regrow_around`]
//! builds a new block with a freshly constructed value sitting between the
//! relocated prefix and suffix of the old run. The strategy is fixed per
//! element type and allocator pair at compile time (see [`strategy`]).

use std::alloc::Layout;
use std::mem;
use std::ptr::NonNull;

use relo_core::{ElementRun, TryReserveError};

use crate::alloc::{array_layout, Allocator};
use crate::classify::{relocation, Relocate, Relocation};
use crate::raw::RawRegion;
use crate::relocate::{release_sources, relocate};

/// The data-movement path taken when a region is reallocated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// The allocator's own [`Allocator::reallocate`] moves the bytes.
    Delegated,
    /// Allocate, copy the run's bytes, release the old block.
    RawCopy,
    /// Allocate, run the element type's bulk primitive, release the old
    /// block.
    CustomPrimitive,
    /// Allocate, move-construct each element, destroy each source,
    /// release the old block.
    MoveThenDestroy,
}

impl Strategy {
    /// Short label used in trace events.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Delegated => "delegated",
            Self::RawCopy => "raw-copy",
            Self::CustomPrimitive => "custom-primitive",
            Self::MoveThenDestroy => "move-then-destroy",
        }
    }
}

/// The strategy [`reallocate`] uses for `T` in regions owned by `A`.
///
/// Only plain byte-relocatable types are handed to the allocator's
/// primitive; a type with its own bulk primitive always gets to run it.
pub const fn strategy<T: Relocate, A: Allocator>() -> Strategy {
    match relocation::<T>() {
        Relocation::Bitwise if A::REALLOCATE => Strategy::Delegated,
        Relocation::Bitwise => Strategy::RawCopy,
        Relocation::Custom => Strategy::CustomPrimitive,
        Relocation::MoveConstruct => Strategy::MoveThenDestroy,
    }
}

/// Move `run` out of `region` into a new block of `new_capacity` slots
/// and release the old block.
///
/// On `Err` the region, its block and every element in it are untouched.
/// If a move constructor panics, the partially built destination is
/// destroyed and freed and the region keeps its old block.
///
/// # Safety
///
/// The slots described by `run` must be the only live elements of the
/// region, and `run` must fit both the old and the new capacity.
pub unsafe fn reallocate<T: Relocate, A: Allocator>(
    region: &mut RawRegion<T, A>,
    new_capacity: usize,
    run: ElementRun,
) -> Result<(), TryReserveError> {
    if mem::size_of::<T>() == 0 {
        return Ok(());
    }
    debug_assert!(
        run.fits(region.capacity(), new_capacity),
        "run {run:?} does not fit {} -> {new_capacity}",
        region.capacity()
    );
    if new_capacity == 0 {
        region.release();
        return Ok(());
    }

    let new_layout = array_layout::<T>(new_capacity)?;
    let chosen = strategy::<T, A>();
    trace_event!(
        old_capacity = region.capacity(),
        new_capacity,
        count = run.count,
        strategy = chosen.as_str(),
        "reallocate"
    );

    if let (Strategy::Delegated, Some(old_layout)) = (chosen, region.layout()) {
        let bytes = run.scaled(mem::size_of::<T>());
        // SAFETY: the block was allocated by this allocator with
        // `old_layout`; both layouts share `T`'s alignment and the run fits.
        let block = unsafe {
            region
                .allocator()
                .reallocate(region.as_ptr().cast(), old_layout, new_layout, bytes)?
        };
        // SAFETY: the allocator released the old block on success.
        unsafe { region.adopt(block.cast(), new_capacity) };
        return Ok(());
    }

    let alloc = region.allocator();
    let block = alloc.allocate(new_layout)?.cast::<T>();
    let fresh = FreshBlock::new(alloc, block, new_layout);
    let src = region.slot(run.old_offset);
    // SAFETY: the source run is live, the fresh block is vacant and
    // distinct from the old one, and the run fits both.
    unsafe {
        let dst = block.add(run.new_offset);
        relocate(alloc, src, dst, run.count);
        fresh.commit();
        release_sources(alloc, src, run.count);
    }
    // SAFETY: the old block now holds no live elements.
    unsafe { region.replace(block, new_capacity) };
    Ok(())
}

/// Where the pieces go when a region regrows around an inserted value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Regrow {
    /// Index of the first live element in the old block.
    pub begin: usize,
    /// Number of live elements in the old block.
    pub len: usize,
    /// Capacity of the new block.
    pub new_capacity: usize,
    /// Index of the first live element in the new block.
    pub new_begin: usize,
    /// Position of the inserted value relative to `begin`.
    pub gap_at: usize,
}

impl Regrow {
    fn fits(&self, old_capacity: usize) -> bool {
        self.gap_at <= self.len
            && self.begin + self.len <= old_capacity
            && self.new_begin + self.len < self.new_capacity
    }
}

/// Allocate a new block, construct `value` at `new_begin + gap_at`, and
/// relocate the old prefix before it and the old suffix after it. The old
/// block is released.
///
/// On `Err` nothing has changed and `value` is dropped. If a move
/// constructor panics, `value` and everything built in the new block are
/// destroyed, the block is freed, and the region keeps its old block.
///
/// # Safety
///
/// `[begin, begin + len)` must be exactly the live elements of the region.
pub unsafe fn regrow_around<T: Relocate, A: Allocator>(
    region: &mut RawRegion<T, A>,
    plan: Regrow,
    value: T,
) -> Result<(), TryReserveError> {
    debug_assert!(mem::size_of::<T>() != 0, "zero-sized regions never regrow");
    debug_assert!(plan.fits(region.capacity()), "regrow plan {plan:?} out of range");

    let new_layout = array_layout::<T>(plan.new_capacity)?;
    trace_event!(
        old_capacity = region.capacity(),
        new_capacity = plan.new_capacity,
        len = plan.len,
        gap_at = plan.gap_at,
        "regrow around insertion"
    );

    let alloc = region.allocator();
    let block = alloc.allocate(new_layout)?.cast::<T>();
    let mut fresh = FreshBlock::new(alloc, block, new_layout);
    let suffix = plan.len - plan.gap_at;
    // SAFETY: the new block is vacant and distinct from the old one; all
    // offsets stay below `new_capacity` (checked by `plan.fits`), and the
    // old prefix and suffix are live.
    unsafe {
        let gap = block.add(plan.new_begin + plan.gap_at);
        alloc.construct(gap, value);
        fresh.built[0] = (gap, 1);

        let old_prefix = region.slot(plan.begin);
        relocate(alloc, old_prefix, block.add(plan.new_begin), plan.gap_at);
        fresh.built[1] = (block.add(plan.new_begin), plan.gap_at);

        let old_suffix = region.slot(plan.begin + plan.gap_at);
        relocate(alloc, old_suffix, gap.add(1), suffix);

        fresh.commit();
        release_sources(alloc, old_prefix, plan.len);
    }
    // SAFETY: the old block now holds no live elements.
    unsafe { region.replace(block, plan.new_capacity) };
    Ok(())
}

/// A freshly allocated block under construction. Unless committed, it
/// destroys the runs recorded in `built` and frees the block on drop.
struct FreshBlock<'a, T, A: Allocator> {
    alloc: &'a A,
    block: NonNull<T>,
    layout: Layout,
    built: [(NonNull<T>, usize); 2],
}

impl<'a, T, A: Allocator> FreshBlock<'a, T, A> {
    fn new(alloc: &'a A, block: NonNull<T>, layout: Layout) -> Self {
        Self {
            alloc,
            block,
            layout,
            built: [(block, 0); 2],
        }
    }

    fn commit(self) {
        mem::forget(self);
    }
}

impl<T, A: Allocator> Drop for FreshBlock<'_, T, A> {
    fn drop(&mut self) {
        // SAFETY: every recorded run was fully constructed in the block,
        // which was allocated by `alloc` with `layout`.
        unsafe {
            for &(start, len) in &self.built {
                for i in 0..len {
                    self.alloc.destroy(start.add(i));
                }
            }
            self.alloc.deallocate(self.block.cast(), self.layout);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::Global;
    use relo_core::AllocError;
    use std::cell::Cell;

    /// Refuses every allocation; no reallocate primitive.
    struct Refusing;

    // SAFETY: never hands out memory.
    unsafe impl Allocator for Refusing {
        fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
            Err(AllocError::from_layout(layout))
        }

        unsafe fn deallocate(&self, _ptr: NonNull<u8>, _layout: Layout) {
            unreachable!("nothing was allocated");
        }
    }

    /// `Global` without the reallocate primitive.
    #[derive(Default)]
    struct Plain {
        allocations: Cell<usize>,
    }

    // SAFETY: forwards to `Global`.
    unsafe impl Allocator for Plain {
        fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
            self.allocations.set(self.allocations.get() + 1);
            Global.allocate(layout)
        }

        unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
            // SAFETY: forwarded.
            unsafe { Global.deallocate(ptr, layout) }
        }
    }

    struct Noisy(u32);

    // SAFETY: moves go through `move_construct`.
    unsafe impl Relocate for Noisy {
        const OBSERVES_MOVES: bool = true;

        fn move_construct(src: &mut Self) -> Self {
            Noisy(src.0)
        }
    }

    fn fill<A: Allocator>(region: &RawRegion<u32, A>, values: &[u32]) {
        for (i, v) in values.iter().enumerate() {
            // SAFETY: the test regions are large enough for `values`.
            unsafe { region.slot(i).write(*v) };
        }
    }

    fn read<A: Allocator>(region: &RawRegion<u32, A>, at: usize, n: usize) -> Vec<u32> {
        // SAFETY: the test reads only slots it initialised.
        (at..at + n).map(|i| unsafe { region.slot(i).read() }).collect()
    }

    #[test]
    fn strategies_follow_type_and_allocator() {
        assert_eq!(strategy::<u32, Global>(), Strategy::Delegated);
        assert_eq!(strategy::<u32, Plain>(), Strategy::RawCopy);
        assert_eq!(strategy::<u32, &Global>(), Strategy::Delegated);
        assert_eq!(strategy::<Noisy, Global>(), Strategy::MoveThenDestroy);
    }

    #[test]
    fn delegated_reallocate_moves_run() {
        let mut region: RawRegion<u32> = RawRegion::with_capacity_in(4, Global).unwrap();
        fill(&region, &[1, 2, 3, 4]);
        let run = ElementRun {
            count: 4,
            old_offset: 0,
            new_offset: 2,
        };
        // SAFETY: all four slots are live and the run fits.
        unsafe { reallocate(&mut region, 8, run).unwrap() };
        assert_eq!(region.capacity(), 8);
        assert_eq!(read(&region, 2, 4), vec![1, 2, 3, 4]);
    }

    #[test]
    fn raw_copy_reallocate_moves_run() {
        let mut region: RawRegion<u32, Plain> =
            RawRegion::with_capacity_in(3, Plain::default()).unwrap();
        fill(&region, &[7, 8, 9]);
        let run = ElementRun {
            count: 2,
            old_offset: 1,
            new_offset: 0,
        };
        // SAFETY: slots 1 and 2 are the live run; u32 has no drop glue.
        unsafe { reallocate(&mut region, 6, run).unwrap() };
        assert_eq!(region.capacity(), 6);
        assert_eq!(read(&region, 0, 2), vec![8, 9]);
        assert_eq!(region.allocator().allocations.get(), 2);
    }

    #[test]
    fn failed_reallocate_leaves_region_untouched() {
        let mut region: RawRegion<u32, Refusing> = RawRegion::new_in(Refusing);
        // SAFETY: empty run.
        let err = unsafe { reallocate(&mut region, 4, ElementRun::in_place(0, 0)) };
        assert!(matches!(err, Err(TryReserveError::AllocFailed(_))));
        assert_eq!(region.capacity(), 0);
    }

    #[test]
    fn reallocate_to_zero_releases() {
        let mut region: RawRegion<u32> = RawRegion::with_capacity_in(4, Global).unwrap();
        // SAFETY: no live elements.
        unsafe { reallocate(&mut region, 0, ElementRun::in_place(0, 0)).unwrap() };
        assert_eq!(region.capacity(), 0);
    }

    #[test]
    fn regrow_places_value_between_prefix_and_suffix() {
        let mut region: RawRegion<u32> = RawRegion::with_capacity_in(4, Global).unwrap();
        fill(&region, &[0, 1, 2, 3]);
        let plan = Regrow {
            begin: 0,
            len: 4,
            new_capacity: 8,
            new_begin: 1,
            gap_at: 2,
        };
        // SAFETY: all four slots are live.
        unsafe { regrow_around(&mut region, plan, 99).unwrap() };
        assert_eq!(read(&region, 1, 5), vec![0, 1, 99, 2, 3]);
    }

    #[test]
    fn regrow_with_move_constructor() {
        let mut region: RawRegion<Noisy> = RawRegion::with_capacity_in(2, Global).unwrap();
        // SAFETY: both slots are initialised before the regrow and read after.
        unsafe {
            region.slot(0).write(Noisy(1));
            region.slot(1).write(Noisy(2));
            let plan = Regrow {
                begin: 0,
                len: 2,
                new_capacity: 4,
                new_begin: 0,
                gap_at: 0,
            };
            regrow_around(&mut region, plan, Noisy(0)).unwrap();
            let got: Vec<u32> = (0..3).map(|i| region.slot(i).as_ref().0).collect();
            assert_eq!(got, vec![0, 1, 2]);
        }
    }
}
