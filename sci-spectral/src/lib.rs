//! Welch power and cross spectral density estimation.
//!
//! The estimators follow `scipy.signal`: [`signal::spectral::welch_dyn`],
//! [`signal::spectral::csd_dyn`] and friends accept n-dimensional
//! [`ndarray`] input of real or complex `f32`/`f64` samples and transform
//! along one axis. Contiguous 1D buffers can also go through the validated
//! kernels in [`signal::spectral`], which implement the capability traits of
//! [`signal::traits`].
//!
//! Non-fatal adjustments (a segment length clipped to the input, a one-sided
//! request on complex input) are logged through [`log`] and returned with the
//! result.

#![deny(missing_docs)]

pub mod kernel;
pub mod signal;

pub use ndarray;
pub use rustfft::num_complex;
pub use sci_spectral_core::{Error, Result};
