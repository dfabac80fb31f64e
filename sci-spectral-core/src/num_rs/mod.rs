//! Best effort parallels of numpy routines used by the spectral estimators.

mod fft_freq;

pub use fft_freq::*;
