use core::cmp::Ordering;
use core::str::FromStr;

use itertools::Itertools;
use ndarray::{ArrayD, Axis};
use rustfft::num_complex::{Complex, ComplexFloat};
use sci_spectral_core::{Error, Result};

use crate::signal::sample::SpectralFloat;

/// Reduction over the per-segment periodograms.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Average {
    /// Arithmetic mean.
    #[default]
    Mean,
    /// Median, corrected for its bias on chi-squared periodograms.
    Median,
}

impl FromStr for Average {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mean" => Ok(Average::Mean),
            "median" => Ok(Average::Median),
            _ => Err(Error::invalid_arg(
                "average",
                format!("average must be \"median\" or \"mean\", got {s}"),
            )),
        }
    }
}

/// Bias of the median of `n` chi-squared periodograms relative to their mean.
///
/// `1 + sum_{k=1}^{(n-1)/2} (1/(2k+1) - 1/(2k))`
///
/// # Examples
/// ```
/// use sci_spectral::signal::spectral::median_bias;
///
/// assert_eq!(median_bias::<f64>(1), 1.0);
/// assert!((median_bias::<f64>(3) - 5.0 / 6.0).abs() < 1e-12);
/// ```
pub fn median_bias<F>(n: usize) -> F
where
    F: SpectralFloat,
{
    let half = n.saturating_sub(1) / 2;
    (1..=half).fold(F::one(), |acc, k| {
        let ii_2 = F::from_usize(2 * k).unwrap_or_else(F::nan);
        acc + F::one() / (ii_2 + F::one()) - F::one() / ii_2
    })
}

/// Lexicographic order on complex values, real part first.
fn cmp_complex<F: SpectralFloat>(a: &Complex<F>, b: &Complex<F>) -> Ordering {
    a.re.partial_cmp(&b.re)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.im.partial_cmp(&b.im).unwrap_or(Ordering::Equal))
}

/// Median of one lane. Any NaN makes the median NaN, as in numpy.
fn median_of<F: SpectralFloat>(lane: impl Iterator<Item = Complex<F>>) -> Complex<F> {
    let sorted = lane.sorted_by(cmp_complex).collect::<Vec<_>>();
    if sorted.iter().any(|v| v.is_nan()) {
        return Complex::new(F::nan(), F::zero());
    }
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        let two = F::one() + F::one();
        (sorted[mid - 1] + sorted[mid]) / two
    }
}

/// Reduce a periodogram stack along its last (segment) axis.
///
/// Stacks with fewer than two axes or no elements are returned unchanged.
/// A single segment is returned as is, without the bias correction.
pub(crate) fn average_segments<F>(pxy: ArrayD<Complex<F>>, average: Average) -> ArrayD<Complex<F>>
where
    F: SpectralFloat,
{
    if pxy.ndim() < 2 || pxy.is_empty() {
        return pxy;
    }
    let last = Axis(pxy.ndim() - 1);
    let nseg = pxy.len_of(last);
    if nseg == 1 {
        return pxy.index_axis_move(last, 0);
    }
    match average {
        Average::Mean => {
            let n = F::from_usize(nseg).unwrap_or_else(F::nan);
            let mut out = pxy.sum_axis(last);
            out.mapv_inplace(|v| v / n);
            out
        }
        Average::Median => {
            let bias = median_bias::<F>(nseg);
            pxy.map_axis(last, |lane| median_of(lane.iter().copied()) / bias)
        }
    }
}
