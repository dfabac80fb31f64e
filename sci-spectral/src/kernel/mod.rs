//! Shared trait-first kernel substrate.
//!
//! Constructor validation and the 1D buffer adapters used by the spectral
//! kernels in [`crate::signal`].

mod errors;
mod io;
mod lifecycle;

pub use errors::*;
pub use io::*;
pub use lifecycle::*;
