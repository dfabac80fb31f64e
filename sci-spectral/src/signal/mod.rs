//! Signal processing routines analogous to `scipy.signal`.
//!
//! [`spectral`] holds the Welch family of estimators. [`windows`],
//! [`detrend`] and [`extend`] are the building blocks it applies to each
//! segment, usable on their own.

pub mod detrend;
pub mod extend;
pub mod spectral;
pub mod traits;
pub mod windows;

mod arraytools;
mod sample;

pub use sample::{SpectralFloat, SpectralSample};
