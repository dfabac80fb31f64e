//! Trait interfaces for spectral-estimation capabilities.
//!
//! Kernels validate their configuration once and then implement one of these
//! traits for contiguous 1D input. N-dimensional data goes through the `*_dyn`
//! functions instead.

use crate::kernel::{ExecInvariantViolation, Read1D, Write1D};
use rustfft::num_complex::Complex;

/// Output pair of a spectral estimate: frequency bins and values.
pub type Spectrum<T, V = T> = (Vec<T>, Vec<V>);

/// Welch power spectral density capability.
pub trait WelchPsd1D<T> {
    /// Estimate into caller-provided frequency and PSD buffers.
    fn run_into<I, OF, OP>(
        &self,
        input: &I,
        freqs: &mut OF,
        pxx: &mut OP,
    ) -> Result<(), ExecInvariantViolation>
    where
        I: Read1D<T> + ?Sized,
        OF: Write1D<T> + ?Sized,
        OP: Write1D<T> + ?Sized;

    /// Estimate and allocate the output.
    fn run_alloc<I>(&self, input: &I) -> Result<Spectrum<T>, ExecInvariantViolation>
    where
        I: Read1D<T> + ?Sized;
}

/// Cross spectral density capability.
pub trait Csd1D<T> {
    /// Estimate into caller-provided frequency and CSD buffers.
    fn run_into<I1, I2, OF, OP>(
        &self,
        x: &I1,
        y: &I2,
        freqs: &mut OF,
        pxy: &mut OP,
    ) -> Result<(), ExecInvariantViolation>
    where
        I1: Read1D<T> + ?Sized,
        I2: Read1D<T> + ?Sized,
        OF: Write1D<T> + ?Sized,
        OP: Write1D<Complex<T>> + ?Sized;

    /// Estimate and allocate the output.
    fn run_alloc<I1, I2>(
        &self,
        x: &I1,
        y: &I2,
    ) -> Result<Spectrum<T, Complex<T>>, ExecInvariantViolation>
    where
        I1: Read1D<T> + ?Sized,
        I2: Read1D<T> + ?Sized;
}

/// Magnitude-squared coherence capability.
pub trait Coherence1D<T> {
    /// Estimate into caller-provided frequency and coherence buffers.
    fn run_into<I1, I2, OF, OC>(
        &self,
        x: &I1,
        y: &I2,
        freqs: &mut OF,
        coherence: &mut OC,
    ) -> Result<(), ExecInvariantViolation>
    where
        I1: Read1D<T> + ?Sized,
        I2: Read1D<T> + ?Sized,
        OF: Write1D<T> + ?Sized,
        OC: Write1D<T> + ?Sized;

    /// Estimate and allocate the output.
    fn run_alloc<I1, I2>(&self, x: &I1, y: &I2) -> Result<Spectrum<T>, ExecInvariantViolation>
    where
        I1: Read1D<T> + ?Sized,
        I2: Read1D<T> + ?Sized;
}

/// Single-segment periodogram capability.
pub trait Periodogram1D<T> {
    /// Estimate into caller-provided frequency and PSD buffers.
    fn run_into<I, OF, OP>(
        &self,
        input: &I,
        freqs: &mut OF,
        pxx: &mut OP,
    ) -> Result<(), ExecInvariantViolation>
    where
        I: Read1D<T> + ?Sized,
        OF: Write1D<T> + ?Sized,
        OP: Write1D<T> + ?Sized;

    /// Estimate and allocate the output.
    fn run_alloc<I>(&self, input: &I) -> Result<Spectrum<T>, ExecInvariantViolation>
    where
        I: Read1D<T> + ?Sized;
}

/// Trend removal capability.
pub trait Detrend1D<T> {
    /// Detrend into a caller-provided buffer of the input's length.
    fn run_into<I, O>(&self, input: &I, out: &mut O) -> Result<(), ExecInvariantViolation>
    where
        I: Read1D<T> + ?Sized,
        O: Write1D<T> + ?Sized;

    /// Detrend and allocate the output.
    fn run_alloc<I>(&self, input: &I) -> Result<Vec<T>, ExecInvariantViolation>
    where
        I: Read1D<T> + ?Sized;
}

/// Window generation capability.
pub trait WindowGenerate<T> {
    /// Run window generation into a caller-provided output buffer.
    fn run_into<O>(&self, out: &mut O) -> Result<(), ExecInvariantViolation>
    where
        O: Write1D<T> + ?Sized;

    /// Run window generation and allocate output samples.
    fn run_alloc(&self) -> Result<Vec<T>, ExecInvariantViolation>;
}
