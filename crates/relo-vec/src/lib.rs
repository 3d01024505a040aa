//! Growable array container for relo.
//!
//! [`GrowVec`] is a contiguous, indexable, growable array. It owns exactly
//! one region at a time (two, briefly, while growing) and hands every
//! growth and relocation decision to the `relo-buffer` engine: the
//! capacity comes from a [`GrowthRatio`], and elements move by `memmove`,
//! by their own bulk primitive, or one move constructor at a time,
//! depending on how the element type implements [`Relocate`].
//!
//! ```
//! use relo_vec::{growvec, GrowVec};
//!
//! let mut v = growvec![0, 1, 2, 3, 4, 6];
//! v.insert(5, 5);
//! assert_eq!(v, [0, 1, 2, 3, 4, 5, 6]);
//! assert_eq!(v.erase(0), 0);
//! assert!(v.at(6).is_err());
//! ```
//!
//! This crate contains no `unsafe` code; all raw memory handling lives in
//! `relo-buffer`.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod iter;
pub mod vec;

pub use iter::IntoIter;
pub use vec::GrowVec;

pub use relo_buffer::{Allocator, Global, Relocate};
pub use relo_core::{GrowthRatio, IndexError, TryReserveError};

/// Build a [`GrowVec`] like `vec!`.
///
/// ```
/// let empty: relo_vec::GrowVec<u8> = relo_vec::growvec![];
/// let filled = relo_vec::growvec![7u8; 3];
/// let listed = relo_vec::growvec![1, 2, 3];
/// assert!(empty.is_empty());
/// assert_eq!(filled, [7, 7, 7]);
/// assert_eq!(listed.len(), 3);
/// ```
#[macro_export]
macro_rules! growvec {
    () => {
        $crate::GrowVec::new()
    };
    ($elem:expr; $n:expr) => {
        $crate::GrowVec::from_elem($elem, $n)
    };
    ($($x:expr),+ $(,)?) => {
        $crate::GrowVec::from([$($x),+])
    };
}
