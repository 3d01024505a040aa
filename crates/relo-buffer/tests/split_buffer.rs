//! Integration test: split buffer behaviour under instrumented allocators
//! and observable element moves.
//!
//! Every test that stores [`Tracked`] values checks the shared ledger at
//! the end, so a leaked or doubly dropped element fails loudly.

use std::cell::Cell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

use relo_buffer::{strategy, Global, Placement, SplitBuffer, Strategy, TryReserveError};
use relo_test_utils::{Chunk, Ledger, PanicOnMove, Point, Reallocating, TestAllocator, Tracked};

fn values<A: relo_buffer::Allocator>(buf: &SplitBuffer<Tracked, A>) -> Vec<u32> {
    buf.iter().map(Tracked::value).collect()
}

// ── Front pushes into a back-spare-only buffer ───────────────────────

#[test]
fn repeated_push_front_with_only_back_spare() {
    let ledger = Ledger::new();
    let alloc = TestAllocator::new();
    {
        let mut buf = SplitBuffer::with_capacity_in(8, 0, alloc.clone()).unwrap();
        for i in 0..4 {
            buf.push_back(ledger.track(i));
        }
        assert_eq!(buf.front_spare(), 0);
        assert_eq!(buf.back_spare(), 4);

        for i in 0..40 {
            buf.push_front(ledger.track(100 + i));
            assert!(buf.markers().is_consistent());
        }

        let mut expected: Vec<u32> = (100..140).rev().collect();
        expected.extend(0..4);
        assert_eq!(values(&buf), expected);
        assert_eq!(ledger.live(), 44);
        assert!(ledger.moves() > 0);
        assert!(alloc.stats().allocations > 1);
    }
    assert_eq!(ledger.live(), 0);
    assert_eq!(alloc.stats().live_blocks(), 0);
}

#[test]
fn first_front_push_shifts_without_allocating() {
    let alloc = TestAllocator::new();
    let mut buf = SplitBuffer::with_capacity_in(8, 0, alloc.clone()).unwrap();
    buf.extend([Point::new(1, 1), Point::new(2, 2)]);
    let allocations = alloc.stats().allocations;
    buf.push_front(Point::new(0, 0));
    assert_eq!(alloc.stats().allocations, allocations);
    assert_eq!(buf[0], Point::new(0, 0));
    assert_eq!(buf[2], Point::new(2, 2));
}

// ── Allocation failure leaves the buffer untouched ───────────────────

#[test]
fn failed_growth_is_strong() {
    let ledger = Ledger::new();
    let alloc = TestAllocator::new();
    let mut buf = SplitBuffer::with_capacity_in(4, 0, alloc.clone()).unwrap();
    for i in 0..4 {
        buf.push_back(ledger.track(i));
    }
    let before = buf.markers();
    alloc.fail_next();

    let err = buf.try_push_back(ledger.track(10)).unwrap_err();
    assert!(matches!(err, TryReserveError::AllocFailed(_)));
    let err = buf.try_push_front(ledger.track(11)).unwrap_err();
    assert!(matches!(err, TryReserveError::AllocFailed(_)));
    let err = buf.try_insert(2, ledger.track(12)).unwrap_err();
    assert!(matches!(err, TryReserveError::AllocFailed(_)));
    assert!(buf.try_reserve_back(100).is_err());
    assert!(buf.try_reserve_front(100).is_err());

    assert_eq!(buf.markers(), before);
    assert_eq!(values(&buf), vec![0, 1, 2, 3]);
    assert_eq!(ledger.live(), 4);
    assert_eq!(ledger.moves(), 0);

    alloc.heal();
    buf.push_back(ledger.track(4));
    assert_eq!(values(&buf), vec![0, 1, 2, 3, 4]);
}

#[test]
fn failed_shrink_keeps_spare() {
    let alloc = TestAllocator::new();
    let mut buf = SplitBuffer::with_capacity_in(16, 4, alloc.clone()).unwrap();
    buf.extend(0u64..4);
    alloc.fail_next();
    assert!(buf.try_shrink_to_fit().is_err());
    assert_eq!(buf.capacity(), 16);
    assert_eq!(buf.as_slice(), &[0, 1, 2, 3]);
    alloc.heal();
    buf.shrink_to_fit();
    assert_eq!(buf.capacity(), 4);
    assert_eq!(buf.front_spare(), 0);
}

// ── Panicking move constructors ──────────────────────────────────────

#[test]
fn panic_during_reallocation_keeps_old_contents() {
    let ledger = Ledger::new();
    let budget = Rc::new(Cell::new(usize::MAX));
    let mut buf = SplitBuffer::with_capacity_in(4, 0, Global).unwrap();
    for i in 0..4 {
        buf.push_back(PanicOnMove::new(&ledger, i, &budget));
    }
    let before = buf.markers();
    budget.set(2);

    let result = catch_unwind(AssertUnwindSafe(|| {
        buf.push_back(PanicOnMove::new(&ledger, 99, &budget));
    }));
    assert!(result.is_err());
    assert_eq!(buf.markers(), before);
    let kept: Vec<u32> = buf.iter().map(PanicOnMove::value).collect();
    assert_eq!(kept, vec![0, 1, 2, 3]);
    assert_eq!(ledger.live(), 4);
}

#[test]
fn panic_during_in_place_shift_empties_buffer() {
    let ledger = Ledger::new();
    let budget = Rc::new(Cell::new(usize::MAX));
    let mut buf = SplitBuffer::with_capacity_in(8, 0, Global).unwrap();
    for i in 0..4 {
        buf.push_back(PanicOnMove::new(&ledger, i, &budget));
    }
    budget.set(1);

    let result = catch_unwind(AssertUnwindSafe(|| {
        buf.push_front(PanicOnMove::new(&ledger, 99, &budget));
    }));
    assert!(result.is_err());
    assert!(buf.markers().is_consistent());
    assert!(buf.is_empty());
    assert_eq!(ledger.live(), 0);

    budget.set(usize::MAX);
    buf.push_front(PanicOnMove::new(&ledger, 7, &budget));
    assert_eq!(buf.len(), 1);
}

// ── Strategy selection ───────────────────────────────────────────────

#[test]
fn strategy_follows_type_and_allocator() {
    assert_eq!(strategy::<Point, Reallocating>(), Strategy::Delegated);
    assert_eq!(strategy::<Point, Global>(), Strategy::Delegated);
    assert_eq!(strategy::<Point, TestAllocator>(), Strategy::RawCopy);
    assert_eq!(strategy::<Chunk, Reallocating>(), Strategy::CustomPrimitive);
    assert_eq!(strategy::<Tracked, Reallocating>(), Strategy::MoveThenDestroy);
    assert_eq!(strategy::<Tracked, TestAllocator>(), Strategy::MoveThenDestroy);
}

#[test]
fn relocatable_growth_is_delegated_to_allocator() {
    let alloc = TestAllocator::new().reallocating();
    let mut buf = SplitBuffer::new_in(alloc.clone()).with_placement(Placement::Packed);
    for i in 0..100 {
        buf.push_back(Point::new(i, -i));
    }
    let stats = alloc.stats();
    assert!(stats.reallocations > 0);
    assert_eq!(stats.live_blocks(), 1);
    assert!(buf.iter().enumerate().all(|(i, p)| p.x == i as i32 && p.y == -(i as i32)));
}

#[test]
fn move_constructed_growth_is_never_delegated() {
    let ledger = Ledger::new();
    let alloc = TestAllocator::new().reallocating();
    let mut buf = SplitBuffer::new_in(alloc.clone());
    for i in 0..100 {
        buf.push_back(ledger.track(i));
    }
    assert_eq!(alloc.stats().reallocations, 0);
    assert_eq!(values(&buf), (0..100).collect::<Vec<_>>());
}

#[test]
fn custom_primitive_runs_on_growth_and_shift() {
    let mut buf = SplitBuffer::new();
    let start = Chunk::bulk_calls();
    for i in 0..64 {
        buf.push_back(Chunk::splat(i));
    }
    let after_growth = Chunk::bulk_calls();
    assert!(after_growth > start);
    buf.push_front(Chunk::splat(99));
    buf.insert(10, Chunk::splat(100));
    assert!(Chunk::bulk_calls() > after_growth);
    assert_eq!(buf[0], Chunk::splat(99));
    assert_eq!(buf[10], Chunk::splat(100));
    assert_eq!(buf[64], Chunk::splat(62));
}

// ── Amortized edge pushes ────────────────────────────────────────────

const EDGE_PUSHES: u32 = 10_000;

fn moves_for_edge_pushes(placement: Placement, front: bool) -> usize {
    let ledger = Ledger::new();
    let mut buf = SplitBuffer::new().with_placement(placement);
    for i in 0..EDGE_PUSHES {
        if front {
            buf.push_front(ledger.track(i));
        } else {
            buf.push_back(ledger.track(i));
        }
    }
    assert_eq!(buf.len(), EDGE_PUSHES as usize);
    ledger.moves()
}

#[test]
fn balanced_push_back_moves_are_linear() {
    let moves = moves_for_edge_pushes(Placement::Balanced, false);
    assert!(moves <= 4 * EDGE_PUSHES as usize, "{moves} moves");
}

#[test]
fn balanced_push_front_moves_are_linear() {
    let moves = moves_for_edge_pushes(Placement::Balanced, true);
    assert!(moves <= 4 * EDGE_PUSHES as usize, "{moves} moves");
}

#[test]
fn packed_push_front_moves_are_linear() {
    let moves = moves_for_edge_pushes(Placement::Packed, true);
    assert!(moves <= 4 * EDGE_PUSHES as usize, "{moves} moves");
}

#[test]
fn alternating_edge_pushes_stay_linear() {
    let ledger = Ledger::new();
    let mut buf = SplitBuffer::new();
    for i in 0..EDGE_PUSHES {
        buf.push_back(ledger.track(i));
        buf.push_back(ledger.track(i));
        buf.push_front(ledger.track(i));
    }
    let pushes = 3 * EDGE_PUSHES as usize;
    assert!(ledger.moves() <= 4 * pushes, "{} moves", ledger.moves());
}

// ── Construct/destroy accounting ─────────────────────────────────────

#[test]
fn only_values_handed_out_skip_destroy() {
    let ledger = Ledger::new();
    let alloc = TestAllocator::new();
    {
        let mut buf = SplitBuffer::new_in(alloc.clone());
        for i in 0..50 {
            buf.push_back(ledger.track(i));
            buf.push_front(ledger.track(1000 + i));
        }
        buf.insert(30, ledger.track(5000));
        buf.erase_range(10..20);
        buf.truncate(60);
        buf.shrink_to_fit();
        assert_eq!(ledger.live(), 60);
        drop(buf.pop_front());
        drop(buf.pop_back());
        drop(buf.remove(3));
        assert_eq!(ledger.live(), 57);
    }
    let stats = alloc.stats();
    // Popped and removed values leave through the caller, not `destroy`.
    assert_eq!(stats.constructs, stats.destroys + 3);
    assert_eq!(stats.live_blocks(), 0);
    assert_eq!(stats.live_bytes, 0);
    assert_eq!(ledger.live(), 0);
}

// ── Composite elements ───────────────────────────────────────────────

#[test]
fn arrays_of_observed_values_survive_growth() {
    let ledger = Ledger::new();
    {
        let mut buf = SplitBuffer::new();
        for i in 0..40 {
            buf.push_back([ledger.track(2 * i), ledger.track(2 * i + 1)]);
            buf.push_front([ledger.track(1000 + i), ledger.track(2000 + i)]);
        }
        assert_eq!(strategy::<[Tracked; 2], Global>(), Strategy::MoveThenDestroy);
        assert!(ledger.moves() > 0);
        assert_eq!(ledger.live(), 160);
        let last = buf.last().map(|pair| (pair[0].value(), pair[1].value()));
        assert_eq!(last, Some((78, 79)));
        let first = buf.first().map(|pair| (pair[0].value(), pair[1].value()));
        assert_eq!(first, Some((1039, 2039)));
    }
    assert_eq!(ledger.live(), 0);
}

#[test]
fn tuples_of_owning_values_relocate_bitwise() {
    assert_eq!(strategy::<(String, u32), Global>(), Strategy::Delegated);
    let mut buf = SplitBuffer::new();
    for i in 0..100u32 {
        buf.push_back((i.to_string(), i));
    }
    buf.insert(50, (String::from("mid"), 500));
    assert_eq!(buf.len(), 101);
    assert_eq!(buf[50], (String::from("mid"), 500));
    assert_eq!(buf[100], (String::from("99"), 99));
}
