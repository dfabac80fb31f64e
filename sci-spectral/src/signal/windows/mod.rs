//! Window functions for spectral estimation.
//!
//! The catalog covers the generalized cosine family. Windows are plain
//! structs implementing [`GetWindow`]; [`get_window`] and
//! [`WindowBuilderOwned`] dispatch over them by variant.

use num_traits::{Float, FloatConst};

mod general_cosine;
mod kernels;

pub use general_cosine::*;
pub use kernels::*;

/// Produce the coefficients of a window.
pub trait GetWindow<W = f64>
where
    W: Float,
{
    /// Window coefficients, `m` values long.
    fn get_window(&self) -> Vec<W>;
}

/// Borrowed window family selector understood by [`get_window`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GetWindowBuilder<'a, F> {
    /// Boxcar window.
    Boxcar,
    /// Hann window.
    Hann,
    /// Hamming window.
    Hamming,
    /// General cosine window.
    GeneralCosine {
        /// Coefficients for weighted cosine terms.
        weights: &'a [F],
    },
    /// General hamming window.
    GeneralHamming {
        /// Alpha coefficient.
        coefficient: F,
    },
}

/// A concrete window of known length and symmetry.
#[derive(Debug, Clone, PartialEq)]
pub enum Window<F> {
    /// [Boxcar] window.
    Boxcar(Boxcar),
    /// [Hann] window.
    Hann(Hann),
    /// [Hamming] window.
    Hamming(Hamming),
    /// [GeneralCosine] window.
    GeneralCosine(GeneralCosine<F>),
    /// [GeneralHamming] window.
    GeneralHamming(GeneralHamming<F>),
}

impl<F> GetWindow<F> for Window<F>
where
    F: Float + FloatConst,
{
    fn get_window(&self) -> Vec<F> {
        match self {
            Window::Boxcar(w) => w.get_window(),
            Window::Hann(w) => w.get_window(),
            Window::Hamming(w) => w.get_window(),
            Window::GeneralCosine(w) => w.get_window(),
            Window::GeneralHamming(w) => w.get_window(),
        }
    }
}

/// Return a window of a given length and type.
///
/// # Parameters
/// * `window`: The type of window to create.
/// * `nx`: The number of samples in the window.
/// * `fftbins`: `None` or `Some(true)` creates a periodic window, ready to
///   use with an FFT. `Some(false)` creates a symmetric window for filter
///   design.
///
/// # Examples
/// ```
/// use sci_spectral::signal::windows::{get_window, GetWindow, GetWindowBuilder};
///
/// let w: Vec<f64> = get_window(GetWindowBuilder::<f64>::Hann, 4, None).get_window();
/// assert_eq!(w.len(), 4);
/// assert!((w[2] - 1.0).abs() < 1e-12);
/// ```
pub fn get_window<F>(window: GetWindowBuilder<'_, F>, nx: usize, fftbins: Option<bool>) -> Window<F>
where
    F: Float,
{
    let sym = !fftbins.unwrap_or(true);
    match window {
        GetWindowBuilder::Boxcar => Window::Boxcar(Boxcar::new(nx, sym)),
        GetWindowBuilder::Hann => Window::Hann(Hann::new(nx, sym)),
        GetWindowBuilder::Hamming => Window::Hamming(Hamming::new(nx, sym)),
        GetWindowBuilder::GeneralCosine { weights } => {
            Window::GeneralCosine(GeneralCosine::new(nx, weights.to_vec(), sym))
        }
        GetWindowBuilder::GeneralHamming { coefficient } => {
            Window::GeneralHamming(GeneralHamming::new(nx, coefficient, sym))
        }
    }
}

/// Lengths of 0 or 1 short-circuit to a window of ones.
#[inline]
fn len_guard(m: usize) -> bool {
    m <= 1
}

/// Periodic windows are computed one sample longer, then truncated.
#[inline]
fn extend(m: usize, sym: bool) -> (usize, bool) {
    if sym {
        (m, false)
    } else {
        (m + 1, true)
    }
}

#[inline]
fn truncate<W>(mut w: Vec<W>, needed: bool) -> Vec<W> {
    if needed {
        w.pop();
    }
    w
}
