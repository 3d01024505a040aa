//! Relocatability classification.
//!
//! Every element type stored in a relo buffer implements [`Relocate`],
//! which records whether a value may be moved to a new address with a plain
//! byte copy. [`relocation`] folds those facts into a [`Relocation`] tag at
//! compile time; the relocate primitive and the cooperation protocol match
//! on the tag, so each element type gets exactly one code path with no
//! runtime dispatch.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::mem;
use std::ptr;
use std::rc::Rc;
use std::sync::Arc;

/// How values of a type move between memory locations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Relocation {
    /// Not relocatable: each value is move-constructed into its new slot
    /// through [`Relocate::move_construct`] and the source is destroyed
    /// afterwards.
    MoveConstruct,
    /// Relocatable by byte copy: a whole run moves with one `memmove`.
    Bitwise,
    /// Relocatable through the type's own bulk primitive,
    /// [`Relocate::relocate_bulk`].
    Custom,
}

/// Per-type relocation facts.
///
/// The provided defaults describe an ordinary Rust type: moving it is a
/// byte copy and nothing can observe the old address. Types whose moves
/// must run code (registries keyed by address, instrumented values,
/// objects carrying inline dispatch tables) override
/// [`OBSERVES_MOVES`](Relocate::OBSERVES_MOVES) or
/// [`POLYMORPHIC`](Relocate::POLYMORPHIC) and implement
/// [`move_construct`](Relocate::move_construct).
///
/// # Safety
///
/// Unless the implementation overrides `OBSERVES_MOVES` or `POLYMORPHIC`,
/// copying a live value's bytes to a new address and treating the source as
/// uninitialised must yield a value indistinguishable from the original.
/// An implementation that sets `BULK_RELOCATE` must provide a
/// `relocate_bulk` with the documented semantics.
pub unsafe trait Relocate: Sized {
    /// A move is observable and must go through
    /// [`move_construct`](Relocate::move_construct).
    const OBSERVES_MOVES: bool = false;

    /// The value carries an inline dispatch table whose layout is not
    /// guaranteed to survive a byte copy. Treated as not relocatable unless
    /// the `assume-stable-vtables` feature is enabled.
    const POLYMORPHIC: bool = false;

    /// The type supplies its own bulk relocation primitive.
    const BULK_RELOCATE: bool = false;

    /// Build a new value by moving out of `src`.
    ///
    /// `src` remains a live value afterwards and is destroyed by the
    /// caller. Only called for types classified as
    /// [`Relocation::MoveConstruct`]; the default panics.
    fn move_construct(src: &mut Self) -> Self {
        let _ = src;
        panic!(
            "{} is relocatable and has no move constructor",
            std::any::type_name::<Self>()
        )
    }

    /// Relocate `count` values from `src` to `dst`.
    ///
    /// Semantics are those of `memmove`: the ranges may overlap, the
    /// destination is uninitialised on entry, and the source is
    /// uninitialised on return. The default is a byte copy.
    ///
    /// # Safety
    ///
    /// `src` must point to `count` live values and `dst` to `count` slots
    /// valid for writes; both must be aligned.
    unsafe fn relocate_bulk(src: *const Self, dst: *mut Self, count: usize) {
        // SAFETY: forwarded from the caller.
        unsafe { ptr::copy(src, dst, count) }
    }
}

/// The relocation strategy for `T`.
///
/// Zero-sized types are always [`Relocation::Bitwise`]: there is nothing to
/// copy. A declared bulk primitive wins over everything else; observable
/// moves and (without `assume-stable-vtables`) inline dispatch tables force
/// [`Relocation::MoveConstruct`].
pub const fn relocation<T: Relocate>() -> Relocation {
    if mem::size_of::<T>() == 0 {
        return Relocation::Bitwise;
    }
    if T::BULK_RELOCATE {
        return Relocation::Custom;
    }
    if T::OBSERVES_MOVES {
        return Relocation::MoveConstruct;
    }
    if T::POLYMORPHIC && !cfg!(feature = "assume-stable-vtables") {
        return Relocation::MoveConstruct;
    }
    Relocation::Bitwise
}

/// Whether values of `T` may be relocated without running move
/// constructors.
pub const fn is_relocatable<T: Relocate>() -> bool {
    !matches!(relocation::<T>(), Relocation::MoveConstruct)
}

/// Declare types as bitwise relocatable.
///
/// ```
/// struct Sample {
///     id: u32,
///     weight: f32,
/// }
/// relo_buffer::impl_relocate!(Sample);
/// assert!(relo_buffer::is_relocatable::<Sample>());
/// ```
#[macro_export]
macro_rules! impl_relocate {
    ($($ty:ty),* $(,)?) => {
        $(
            // SAFETY: declared bitwise relocatable by the invoking crate.
            unsafe impl $crate::Relocate for $ty {}
        )*
    };
}

impl_relocate!(
    (),
    bool,
    char,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    f32,
    f64,
    String,
    std::time::Duration,
    std::num::NonZeroU32,
    std::num::NonZeroU64,
    std::num::NonZeroUsize,
);

// SAFETY: references and raw pointers are plain addresses.
unsafe impl<T: ?Sized> Relocate for &T {}
// SAFETY: as above.
unsafe impl<T: ?Sized> Relocate for &mut T {}
// SAFETY: as above.
unsafe impl<T: ?Sized> Relocate for *const T {}
// SAFETY: as above.
unsafe impl<T: ?Sized> Relocate for *mut T {}

// SAFETY: owning handles keep their payload on the heap; moving the handle
// never moves the payload.
unsafe impl<T: ?Sized> Relocate for Box<T> {}
// SAFETY: as above.
unsafe impl<T: ?Sized> Relocate for Rc<T> {}
// SAFETY: as above.
unsafe impl<T: ?Sized> Relocate for Arc<T> {}
// SAFETY: as above.
unsafe impl<T> Relocate for Vec<T> {}
// SAFETY: as above.
unsafe impl<T> Relocate for VecDeque<T> {}
// SAFETY: as above.
unsafe impl<K, V, S> Relocate for HashMap<K, V, S> {}
// SAFETY: as above.
unsafe impl<T, S> Relocate for HashSet<T, S> {}
// SAFETY: as above.
unsafe impl<K, V> Relocate for BTreeMap<K, V> {}
// SAFETY: as above.
unsafe impl<T> Relocate for BTreeSet<T> {}

// SAFETY: interior mutability does not make a value address-sensitive.
unsafe impl<T: Relocate> Relocate for Cell<T> {
    const OBSERVES_MOVES: bool = T::OBSERVES_MOVES;
    const POLYMORPHIC: bool = T::POLYMORPHIC;

    fn move_construct(src: &mut Self) -> Self {
        Cell::new(T::move_construct(src.get_mut()))
    }
}

// SAFETY: as for `Cell`.
unsafe impl<T: Relocate> Relocate for RefCell<T> {
    const OBSERVES_MOVES: bool = T::OBSERVES_MOVES;
    const POLYMORPHIC: bool = T::POLYMORPHIC;

    fn move_construct(src: &mut Self) -> Self {
        RefCell::new(T::move_construct(src.get_mut()))
    }
}

// SAFETY: an `Option` relocates exactly like its payload.
unsafe impl<T: Relocate> Relocate for Option<T> {
    const OBSERVES_MOVES: bool = T::OBSERVES_MOVES;
    const POLYMORPHIC: bool = T::POLYMORPHIC;

    fn move_construct(src: &mut Self) -> Self {
        src.as_mut().map(T::move_construct)
    }
}

// SAFETY: an array relocates exactly like `N` consecutive `T`.
unsafe impl<T: Relocate, const N: usize> Relocate for [T; N] {
    const OBSERVES_MOVES: bool = T::OBSERVES_MOVES;
    const POLYMORPHIC: bool = T::POLYMORPHIC;
    const BULK_RELOCATE: bool = T::BULK_RELOCATE;

    fn move_construct(src: &mut Self) -> Self {
        std::array::from_fn(|i| T::move_construct(&mut src[i]))
    }

    unsafe fn relocate_bulk(src: *const Self, dst: *mut Self, count: usize) {
        // SAFETY: `count` arrays are `count * N` contiguous, aligned `T`.
        unsafe { T::relocate_bulk(src.cast::<T>(), dst.cast::<T>(), count * N) }
    }
}

/// The shared class of a tuple's members.
///
/// A bitwise member has no move constructor that leaves its source live,
/// and a bulk primitive cannot run over members interleaved with other
/// fields, so a tuple must be uniformly bitwise or uniformly
/// move-constructed. Anything else fails to compile.
const fn tuple_relocation(members: &[Relocation]) -> Relocation {
    let first = members[0];
    assert!(
        !matches!(first, Relocation::Custom),
        "tuple members cannot carry a bulk relocation primitive"
    );
    let mut i = 1;
    while i < members.len() {
        assert!(
            members[i] as u8 == first as u8,
            "tuple members must all relocate the same way"
        );
        i += 1;
    }
    first
}

macro_rules! impl_relocate_tuple {
    ($($name:ident $idx:tt),+) => {
        // SAFETY: the tuple is bitwise only when every member is; otherwise
        // each member is move-constructed.
        unsafe impl<$($name: Relocate),+> Relocate for ($($name,)+) {
            const OBSERVES_MOVES: bool = matches!(
                tuple_relocation(&[$(relocation::<$name>()),+]),
                Relocation::MoveConstruct
            );

            fn move_construct(src: &mut Self) -> Self {
                ($($name::move_construct(&mut src.$idx),)+)
            }
        }
    };
}

impl_relocate_tuple!(A 0);
impl_relocate_tuple!(A 0, B 1);
impl_relocate_tuple!(A 0, B 1, C 2);
impl_relocate_tuple!(A 0, B 1, C 2, D 3);
impl_relocate_tuple!(A 0, B 1, C 2, D 3, E 4);
impl_relocate_tuple!(A 0, B 1, C 2, D 3, E 4, F 5);

#[cfg(test)]
mod tests {
    use super::*;

    struct Observed(u32);

    // SAFETY: moves go through `move_construct`.
    unsafe impl Relocate for Observed {
        const OBSERVES_MOVES: bool = true;

        fn move_construct(src: &mut Self) -> Self {
            Observed(src.0)
        }
    }

    struct WithTable {
        _slots: [usize; 2],
    }

    // SAFETY: flagged polymorphic; moves go through `move_construct`.
    unsafe impl Relocate for WithTable {
        const POLYMORPHIC: bool = true;

        fn move_construct(src: &mut Self) -> Self {
            WithTable {
                _slots: src._slots,
            }
        }
    }

    struct Packed(u64);

    // SAFETY: default byte-copy primitive.
    unsafe impl Relocate for Packed {
        const BULK_RELOCATE: bool = true;
    }

    struct Silent;

    // SAFETY: zero-sized.
    unsafe impl Relocate for Silent {
        const OBSERVES_MOVES: bool = true;
    }

    #[test]
    fn primitives_are_bitwise() {
        assert_eq!(relocation::<u32>(), Relocation::Bitwise);
        assert_eq!(relocation::<String>(), Relocation::Bitwise);
        assert_eq!(relocation::<Box<dyn Fn()>>(), Relocation::Bitwise);
        assert_eq!(relocation::<(u8, f64)>(), Relocation::Bitwise);
        assert_eq!(relocation::<[u16; 4]>(), Relocation::Bitwise);
        assert!(is_relocatable::<Vec<String>>());
    }

    #[test]
    fn observed_moves_are_not_relocatable() {
        assert_eq!(relocation::<Observed>(), Relocation::MoveConstruct);
        assert_eq!(relocation::<Option<Observed>>(), Relocation::MoveConstruct);
        assert!(!is_relocatable::<Observed>());
    }

    #[test]
    fn zero_sized_types_are_always_bitwise() {
        assert_eq!(relocation::<Silent>(), Relocation::Bitwise);
        assert_eq!(relocation::<()>(), Relocation::Bitwise);
    }

    #[test]
    fn bulk_primitive_is_custom() {
        assert_eq!(relocation::<Packed>(), Relocation::Custom);
        assert!(is_relocatable::<Packed>());
    }

    #[cfg(not(feature = "assume-stable-vtables"))]
    #[test]
    fn polymorphic_is_conservative_by_default() {
        assert_eq!(relocation::<WithTable>(), Relocation::MoveConstruct);
    }

    #[cfg(feature = "assume-stable-vtables")]
    #[test]
    fn polymorphic_is_bitwise_with_escape_hatch() {
        assert_eq!(relocation::<WithTable>(), Relocation::Bitwise);
    }

    #[test]
    fn option_forwards_move_constructor() {
        let mut src = Some(Observed(9));
        let moved = <Option<Observed> as Relocate>::move_construct(&mut src);
        assert_eq!(moved.map(|o| o.0), Some(9));
    }

    #[test]
    fn arrays_forward_their_element_class() {
        assert_eq!(relocation::<[String; 2]>(), Relocation::Bitwise);
        assert_eq!(relocation::<[Observed; 3]>(), Relocation::MoveConstruct);
        assert_eq!(relocation::<[Packed; 2]>(), Relocation::Custom);
        assert_eq!(relocation::<[Observed; 0]>(), Relocation::Bitwise);

        let mut src = [Observed(1), Observed(2), Observed(3)];
        let moved = <[Observed; 3] as Relocate>::move_construct(&mut src);
        assert_eq!(moved.map(|o| o.0), [1, 2, 3]);
    }

    #[test]
    fn array_bulk_primitive_covers_every_element() {
        let src = [[Packed(1), Packed(2)], [Packed(3), Packed(4)]];
        let src = mem::ManuallyDrop::new(src);
        let mut dst = mem::MaybeUninit::<[[Packed; 2]; 2]>::uninit();
        // SAFETY: two live arrays move into two vacant slots; `src` is
        // never dropped.
        let dst = unsafe {
            <[Packed; 2] as Relocate>::relocate_bulk(
                src.as_ptr(),
                dst.as_mut_ptr().cast::<[Packed; 2]>(),
                2,
            );
            dst.assume_init()
        };
        let flat: Vec<u64> = dst.iter().flatten().map(|p| p.0).collect();
        assert_eq!(flat, [1, 2, 3, 4]);
    }

    #[test]
    fn tuples_share_their_members_class() {
        assert_eq!(relocation::<(String, u32)>(), Relocation::Bitwise);
        assert_eq!(relocation::<(Vec<u8>, Box<u8>, char)>(), Relocation::Bitwise);
        assert_eq!(
            relocation::<(Observed, Observed)>(),
            Relocation::MoveConstruct
        );

        let mut src = (Observed(4), Observed(5));
        let (a, b) = <(Observed, Observed) as Relocate>::move_construct(&mut src);
        assert_eq!((a.0, b.0), (4, 5));
    }

    #[cfg(not(feature = "assume-stable-vtables"))]
    #[test]
    fn polymorphic_members_make_a_tuple_move_constructed() {
        assert_eq!(
            relocation::<(WithTable, Observed)>(),
            Relocation::MoveConstruct
        );
    }

    #[test]
    #[should_panic(expected = "has no move constructor")]
    fn default_move_constructor_panics() {
        let mut v = 5u32;
        let _ = <u32 as Relocate>::move_construct(&mut v);
    }
}
