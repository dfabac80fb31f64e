//! Shared building blocks for `sci-spectral`.
//!
//! Kept `no_std` so the error type and numpy-parity helpers can be reused by
//! embedded front ends that only need frequency bookkeeping.

#![no_std]
#![deny(missing_docs)]

extern crate alloc;

mod error;
pub mod num_rs;

pub use error::{Error, Result};
