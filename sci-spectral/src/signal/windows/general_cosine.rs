use num_traits::{Float, FloatConst};

use super::{extend, len_guard, truncate, GetWindow};

/// Generic weighted sum of cosine terms window.
///
/// `w[n] = sum_k a[k] * cos(k * fac[n])` with `fac` spanning `[-pi, pi]`.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneralCosine<F> {
    /// Number of points in the output window.
    pub m: usize,
    /// Weighting coefficients.
    pub a: Vec<F>,
    /// `true` for a filter-design style symmetric window, `false` for a
    /// periodic one suitable for spectral analysis.
    pub sym: bool,
}

impl<F> GeneralCosine<F> {
    /// Create a new general cosine window.
    pub fn new(m: usize, a: Vec<F>, sym: bool) -> Self {
        GeneralCosine { m, a, sym }
    }
}

impl<F, W> GetWindow<W> for GeneralCosine<F>
where
    F: Float + FloatConst,
    W: Float + FloatConst,
{
    fn get_window(&self) -> Vec<W> {
        let weights = self
            .a
            .iter()
            .map(|&a| W::from(a).unwrap_or_else(W::nan))
            .collect::<Vec<_>>();
        general_cosine(self.m, &weights, self.sym)
    }
}

pub(crate) fn general_cosine<W>(m: usize, a: &[W], sym: bool) -> Vec<W>
where
    W: Float + FloatConst,
{
    if len_guard(m) {
        return vec![W::one(); m];
    }
    let (m, needs_trunc) = extend(m, sym);

    // linspace(-pi, pi, m), endpoint pinned.
    let div = W::from(m - 1).unwrap_or_else(W::nan);
    let step = (W::PI() + W::PI()) / div;
    let fac = (0..m).map(|i| {
        if i == m - 1 {
            W::PI()
        } else {
            -W::PI() + step * W::from(i).unwrap_or_else(W::nan)
        }
    });

    let w = fac
        .map(|f| {
            a.iter().enumerate().fold(W::zero(), |acc, (k, &ak)| {
                acc + ak * (W::from(k).unwrap_or_else(W::nan) * f).cos()
            })
        })
        .collect();
    truncate(w, needs_trunc)
}

/// Generalized Hamming window, `general_cosine` with `[alpha, 1 - alpha]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeneralHamming<F> {
    /// Number of points in the output window.
    pub m: usize,
    /// Window coefficient.
    pub alpha: F,
    /// Symmetric when `true`, periodic otherwise.
    pub sym: bool,
}

impl<F> GeneralHamming<F> {
    /// Create a new generalized Hamming window.
    pub fn new(m: usize, alpha: F, sym: bool) -> Self {
        GeneralHamming { m, alpha, sym }
    }
}

impl<F, W> GetWindow<W> for GeneralHamming<F>
where
    F: Float,
    W: Float + FloatConst,
{
    fn get_window(&self) -> Vec<W> {
        let alpha = W::from(self.alpha).unwrap_or_else(W::nan);
        general_cosine(self.m, &[alpha, W::one() - alpha], self.sym)
    }
}

/// Hann window, a generalized Hamming window with `alpha = 0.5`.
///
/// # Examples
/// ```
/// use sci_spectral::signal::windows::{GetWindow, Hann};
///
/// let w: Vec<f64> = Hann::new(5, true).get_window();
/// assert!((w[2] - 1.0).abs() < 1e-12);
/// assert!((w[1] - 0.5).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hann {
    /// Number of points in the output window.
    pub m: usize,
    /// Symmetric when `true`, periodic otherwise.
    pub sym: bool,
}

impl Hann {
    /// Create a new Hann window.
    pub fn new(m: usize, sym: bool) -> Self {
        Hann { m, sym }
    }
}

impl<W> GetWindow<W> for Hann
where
    W: Float + FloatConst,
{
    fn get_window(&self) -> Vec<W> {
        let half = W::one() / (W::one() + W::one());
        general_cosine(self.m, &[half, half], self.sym)
    }
}

/// Hamming window, a generalized Hamming window with `alpha = 0.54`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hamming {
    /// Number of points in the output window.
    pub m: usize,
    /// Symmetric when `true`, periodic otherwise.
    pub sym: bool,
}

impl Hamming {
    /// Create a new Hamming window.
    pub fn new(m: usize, sym: bool) -> Self {
        Hamming { m, sym }
    }
}

impl<W> GetWindow<W> for Hamming
where
    W: Float + FloatConst,
{
    fn get_window(&self) -> Vec<W> {
        GeneralHamming::new(self.m, 0.54f64, self.sym).get_window()
    }
}

/// Boxcar (rectangular) window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boxcar {
    /// Number of points in the output window.
    pub m: usize,
    /// Accepted for API parity; a boxcar is its own periodic extension.
    pub sym: bool,
}

impl Boxcar {
    /// Create a new boxcar window.
    pub fn new(m: usize, sym: bool) -> Self {
        Boxcar { m, sym }
    }
}

impl<W> GetWindow<W> for Boxcar
where
    W: Float,
{
    fn get_window(&self) -> Vec<W> {
        vec![W::one(); self.m]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        actual
            .iter()
            .zip(expected.iter())
            .for_each(|(a, b)| assert_abs_diff_eq!(*a, *b, epsilon = 1e-12));
    }

    #[test]
    fn symmetric_hann() {
        let w: Vec<f64> = Hann::new(5, true).get_window();
        assert_close(&w, &[0.0, 0.5, 1.0, 0.5, 0.0]);
    }

    #[test]
    fn periodic_hann_drops_the_closing_zero() {
        let w: Vec<f64> = Hann::new(4, false).get_window();
        assert_close(&w, &[0.0, 0.5, 1.0, 0.5]);
    }

    #[test]
    fn symmetric_hamming() {
        let w: Vec<f64> = Hamming::new(5, true).get_window();
        assert_close(&w, &[0.08, 0.54, 1.0, 0.54, 0.08]);
    }

    #[test]
    fn general_cosine_matches_hann_weights() {
        let w: Vec<f64> = GeneralCosine::new(9, vec![0.5, 0.5], false).get_window();
        let hann: Vec<f64> = Hann::new(9, false).get_window();
        assert_close(&w, &hann);
    }

    #[test]
    fn single_precision_window() {
        let w: Vec<f32> = GeneralHamming::new(3, 0.5f32, true).get_window();
        assert_eq!(w.len(), 3);
        assert_abs_diff_eq!(w[1], 1.0f32, epsilon = 1e-6);
    }

    #[test]
    fn degenerate_lengths_are_ones() {
        let w: Vec<f64> = Hann::new(1, false).get_window();
        assert_eq!(w, vec![1.0]);
        let w: Vec<f64> = Hann::new(0, true).get_window();
        assert!(w.is_empty());
    }
}
