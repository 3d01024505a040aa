//! Error types for the relo engine.
//!
//! Organised by failure class: allocation (the allocator refused a
//! request), capacity (a size exceeds what the element type can address),
//! bounds (checked indexing) and configuration (an invalid growth policy).
//! Contract violations such as unchecked indexing out of range are not
//! represented here; they panic at the call site.

use std::alloc::Layout;
use std::error::Error;
use std::fmt;

/// The allocator could not satisfy a request.
///
/// Carries the size and alignment of the refused layout so that the
/// infallible wrappers can forward it to [`std::alloc::handle_alloc_error`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AllocError {
    /// Requested size in bytes.
    pub size: usize,
    /// Requested alignment in bytes.
    pub align: usize,
}

impl AllocError {
    /// Build an error describing a refused `layout`.
    pub fn from_layout(layout: Layout) -> Self {
        Self {
            size: layout.size(),
            align: layout.align(),
        }
    }

    /// The refused layout, if the recorded size/alignment form a valid one.
    pub fn layout(&self) -> Option<Layout> {
        Layout::from_size_align(self.size, self.align).ok()
    }
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "memory allocation of {} bytes (align {}) failed",
            self.size, self.align
        )
    }
}

impl Error for AllocError {}

/// Errors from any operation that may need to grow a buffer.
///
/// Both variants are recoverable: the container that reported them is left
/// exactly as it was before the call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TryReserveError {
    /// The requested element count exceeds the maximum addressable count
    /// for the element type (or overflowed while being computed).
    CapacityOverflow {
        /// Number of elements requested (saturated on overflow).
        requested: usize,
        /// Maximum element count for the element type.
        max: usize,
    },
    /// The allocator refused the new region.
    AllocFailed(AllocError),
}

impl TryReserveError {
    /// Convert the error into a panic, the behaviour of the infallible
    /// wrappers (`push_back`, `reserve`, ...).
    ///
    /// Allocation failures are routed through
    /// [`std::alloc::handle_alloc_error`], matching the standard
    /// collections.
    #[cold]
    #[track_caller]
    pub fn panic(self) -> ! {
        match self {
            Self::AllocFailed(err) => match err.layout() {
                Some(layout) => std::alloc::handle_alloc_error(layout),
                None => panic!("{err}"),
            },
            Self::CapacityOverflow { .. } => panic!("{self}"),
        }
    }
}

impl fmt::Display for TryReserveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityOverflow { requested, max } => {
                write!(
                    f,
                    "capacity overflow: requested {requested} elements, maximum is {max}"
                )
            }
            Self::AllocFailed(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TryReserveError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::AllocFailed(err) => Some(err),
            Self::CapacityOverflow { .. } => None,
        }
    }
}

impl From<AllocError> for TryReserveError {
    fn from(err: AllocError) -> Self {
        Self::AllocFailed(err)
    }
}

/// A checked access (`at`, `at_mut`) named an index outside `[0, len)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexError {
    /// The offending index.
    pub index: usize,
    /// Length of the container at the time of the access.
    pub len: usize,
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "index out of range: the len is {} but the index is {}",
            self.len, self.index
        )
    }
}

impl Error for IndexError {}

/// Invalid growth-policy configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// The growth ratio's denominator was zero.
    ZeroDenominator,
    /// The growth ratio was not strictly greater than one, so repeated
    /// appends would not amortize.
    RatioNotGrowing {
        /// Numerator as supplied.
        numerator: usize,
        /// Denominator as supplied.
        denominator: usize,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroDenominator => write!(f, "growth ratio denominator must be non-zero"),
            Self::RatioNotGrowing {
                numerator,
                denominator,
            } => write!(
                f,
                "growth ratio {numerator}/{denominator} must be strictly greater than 1"
            ),
        }
    }
}

impl Error for ConfigError {}
