//! Relo: relocation-aware contiguous storage.
//!
//! This is the top-level facade crate that re-exports the public API from
//! the relo sub-crates. For most users, adding `relo` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use relo::prelude::*;
//!
//! // A growable array: indexable, bounds-checked `at`, amortized growth.
//! let mut v: GrowVec<u32> = GrowVec::new().with_growth(GrowthRatio::ONE_AND_A_HALF);
//! for i in 0..10 {
//!     v.push_back(i);
//! }
//! v.insert(5, 100);
//! assert_eq!(v[5], 100);
//! assert!(v.at(11).is_err());
//!
//! // A split buffer: spare room on both sides, pushes at either end.
//! let mut buf = SplitBuffer::new();
//! buf.push_back(2);
//! buf.push_front(1);
//! assert_eq!(buf.as_slice(), &[1, 2]);
//! assert!(buf.markers().is_consistent());
//! ```
//!
//! # Element types
//!
//! Every stored type implements [`Relocate`](prelude::Relocate). Plain
//! data declares itself with [`impl_relocate!`]; types whose moves must
//! run code override the trait's constants and supply a move constructor.
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `relo-core` | Errors, growth ratio, markers, element runs |
//! | [`buffer`] | `relo-buffer` | Allocators, classification, relocation, `SplitBuffer` |
//! | [`vec`] | `relo-vec` | `GrowVec` and its iterator |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Shared value types (`relo-core`).
///
/// The error taxonomy ([`types::TryReserveError`], [`types::IndexError`],
/// [`types::ConfigError`]), the [`types::GrowthRatio`] policy and the
/// [`types::Markers`] snapshot.
pub use relo_core as types;

/// The storage engine (`relo-buffer`).
///
/// [`buffer::Allocator`] and [`buffer::Global`], the
/// [`buffer::Relocate`] classification, the relocate primitive and the
/// allocator cooperation protocol, and [`buffer::SplitBuffer`].
pub use relo_buffer as buffer;

/// The growable array container (`relo-vec`).
pub use relo_vec as vec;

pub use relo_buffer::impl_relocate;
pub use relo_vec::growvec;

/// Common imports for typical relo usage.
///
/// ```rust
/// use relo::prelude::*;
/// ```
pub mod prelude {
    // Containers
    pub use relo_buffer::{Placement, SplitBuffer};
    pub use relo_vec::GrowVec;

    // Element and allocator traits
    pub use relo_buffer::{Allocator, Global, Relocate, Relocation};

    // Policy and errors
    pub use relo_core::{GrowthRatio, IndexError, TryReserveError};
}
