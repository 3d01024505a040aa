//! Core types for the relo contiguous-storage engine.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! value types shared by the buffer engine and the containers built on it:
//! the error taxonomy, the growth-ratio policy, and the descriptors used to
//! talk about a buffer's markers and about runs of elements being relocated.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod growth;
pub mod run;

pub use error::{AllocError, ConfigError, IndexError, TryReserveError};
pub use growth::GrowthRatio;
pub use run::{ElementRun, Markers};
