//! Relocation-aware storage engine for relo containers.
//!
//! Everything that touches raw memory lives here. The crate is organised
//! bottom-up:
//!
//! ```text
//! SplitBuffer (front spare | live run | back spare)
//! ├── protocol   reallocate / regrow_around, strategy picked per (T, A)
//! │   └── relocate   bitwise, custom-primitive or move-construct copies
//! ├── RawRegion  one owned block of uninitialised slots
//! ├── Allocator  allocate / reallocate / construct / destroy capability
//! └── Relocate   per-type relocation facts, folded by `relocation::<T>()`
//! ```
//!
//! Types that [`Relocate`] as plain bytes move whole runs with one
//! `memmove`, and when the allocator can resize a block itself
//! ([`Allocator::REALLOCATE`]) growth is handed to it wholesale. Types whose
//! moves are observable take the slow path: every element is
//! move-constructed into its new slot and its source destroyed.
//!
//! # Unsafe code
//!
//! This is the only relo crate that contains `unsafe` code. Every `unsafe`
//! block carries a `// SAFETY:` comment naming the invariant it relies on.
//! The containers in `relo-vec` are built on [`SplitBuffer`]'s safe API.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

// Trace-level event, compiled out unless the `tracing` feature is enabled.
macro_rules! trace_event {
    ($($arg:tt)+) => {
        {
            #[cfg(feature = "tracing")]
            {
                tracing::trace!($($arg)+);
            }
        }
    };
}

pub mod alloc;
pub mod classify;
pub mod protocol;
pub mod raw;
pub mod relocate;
pub mod split;

pub use alloc::{Allocator, Global};
pub use classify::{is_relocatable, relocation, Relocate, Relocation};
pub use protocol::{strategy, Strategy};
pub use raw::RawRegion;
pub use split::{Placement, SplitBuffer};

pub use relo_core::{
    AllocError, ConfigError, ElementRun, GrowthRatio, IndexError, Markers, TryReserveError,
};
