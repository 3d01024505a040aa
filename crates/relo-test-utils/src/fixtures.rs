//! Element fixtures, one per relocation class.
//!
//! - [`Point`]: plain data, bitwise relocatable.
//! - [`Chunk`]: supplies its own bulk relocation primitive.
//! - [`Tracked`]: observes every move; each value is registered in a
//!   shared [`Ledger`] so tests can check for leaks and double drops.
//! - [`PanicOnMove`]: like [`Tracked`], but its move constructor panics
//!   once a shared budget of moves is spent.

#![allow(unsafe_code)]

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::ptr;
use std::rc::Rc;

use relo_buffer::{impl_relocate, Relocate};

/// Plain two-field value, relocated by byte copy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl_relocate!(Point);

thread_local! {
    static BULK_CALLS: Cell<usize> = const { Cell::new(0) };
}

/// Fixed-size payload relocated through its own bulk primitive.
///
/// Every call to the primitive is counted per thread; see
/// [`Chunk::bulk_calls`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Chunk(pub [u64; 4]);

impl Chunk {
    pub fn splat(v: u64) -> Self {
        Chunk([v; 4])
    }

    /// Number of bulk relocations run on this thread so far.
    pub fn bulk_calls() -> usize {
        BULK_CALLS.with(Cell::get)
    }
}

// SAFETY: plain data; the primitive has memmove semantics.
unsafe impl Relocate for Chunk {
    const BULK_RELOCATE: bool = true;

    unsafe fn relocate_bulk(src: *const Self, dst: *mut Self, count: usize) {
        BULK_CALLS.with(|c| c.set(c.get() + 1));
        // SAFETY: forwarded from the caller.
        unsafe { ptr::copy(src, dst, count) }
    }
}

#[derive(Default)]
struct Book {
    next_id: Cell<u64>,
    live: RefCell<BTreeMap<u64, u32>>,
    moves: Cell<usize>,
    drops: Cell<usize>,
}

/// Shared registry of every live [`Tracked`] (or [`PanicOnMove`]) value.
///
/// Each value gets a unique id on construction. A move constructor mints a
/// new id for the destination; dropping a value removes its id and panics
/// if the id was already gone, which catches double drops.
#[derive(Clone, Default)]
pub struct Ledger {
    book: Rc<Book>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// A new tracked value carrying `value`.
    pub fn track(&self, value: u32) -> Tracked {
        Tracked {
            id: self.register(value),
            value,
            ledger: self.clone(),
        }
    }

    /// Number of values currently alive.
    pub fn live(&self) -> usize {
        self.book.live.borrow().len()
    }

    /// Payloads of every live value, in creation order.
    pub fn live_values(&self) -> Vec<u32> {
        self.book.live.borrow().values().copied().collect()
    }

    /// Move constructions observed so far.
    pub fn moves(&self) -> usize {
        self.book.moves.get()
    }

    /// Drops observed so far.
    pub fn drops(&self) -> usize {
        self.book.drops.get()
    }

    fn register(&self, value: u32) -> u64 {
        let id = self.book.next_id.get();
        self.book.next_id.set(id + 1);
        self.book.live.borrow_mut().insert(id, value);
        id
    }

    fn record_move(&self) {
        self.book.moves.set(self.book.moves.get() + 1);
    }

    fn release(&self, id: u64) {
        self.book.drops.set(self.book.drops.get() + 1);
        let removed = self.book.live.borrow_mut().remove(&id);
        assert!(removed.is_some(), "value {id} dropped twice");
    }
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("live", &self.live())
            .field("moves", &self.moves())
            .field("drops", &self.drops())
            .finish()
    }
}

/// A value whose moves are observable and recorded in a [`Ledger`].
pub struct Tracked {
    id: u64,
    value: u32,
    ledger: Ledger,
}

impl Tracked {
    pub fn value(&self) -> u32 {
        self.value
    }
}

// SAFETY: classified as move-constructed; never byte-copied.
unsafe impl Relocate for Tracked {
    const OBSERVES_MOVES: bool = true;

    fn move_construct(src: &mut Self) -> Self {
        src.ledger.record_move();
        src.ledger.track(src.value)
    }
}

impl Clone for Tracked {
    fn clone(&self) -> Self {
        self.ledger.track(self.value)
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.ledger.release(self.id);
    }
}

impl PartialEq for Tracked {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl std::fmt::Debug for Tracked {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Tracked({})", self.value)
    }
}

/// A tracked value whose move constructor panics once a shared budget of
/// moves runs out.
pub struct PanicOnMove {
    inner: Tracked,
    budget: Rc<Cell<usize>>,
}

impl PanicOnMove {
    /// A value drawing on `budget`; each move spends one unit.
    pub fn new(ledger: &Ledger, value: u32, budget: &Rc<Cell<usize>>) -> Self {
        Self {
            inner: ledger.track(value),
            budget: Rc::clone(budget),
        }
    }

    pub fn value(&self) -> u32 {
        self.inner.value
    }
}

// SAFETY: classified as move-constructed; never byte-copied.
unsafe impl Relocate for PanicOnMove {
    const OBSERVES_MOVES: bool = true;

    fn move_construct(src: &mut Self) -> Self {
        let left = src.budget.get();
        if left == 0 {
            panic!("move budget exhausted moving {}", src.inner.value);
        }
        src.budget.set(left - 1);
        Self {
            inner: Tracked::move_construct(&mut src.inner),
            budget: Rc::clone(&src.budget),
        }
    }
}

impl std::fmt::Debug for PanicOnMove {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PanicOnMove({})", self.inner.value)
    }
}
