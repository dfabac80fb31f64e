//! Removal of constant and piecewise-linear trends along one axis.

use core::fmt;
use core::str::FromStr;
use std::sync::Arc;

use nalgebra::DMatrix;
use ndarray::{Array, ArrayBase, ArrayD, ArrayView1, Axis, Data, Dimension};
use num_traits::{Float, Zero};
use rustfft::num_complex::Complex;
use sci_spectral_core::{Error, Result};

use super::arraytools::{check_and_get_axis_dyn, move_axis};
use super::sample::{working_lanes, SpectralFloat, SpectralSample};
use crate::kernel::{ConfigError, ExecInvariantViolation, KernelLifecycle, Read1D, Write1D};
use crate::signal::traits::Detrend1D;

/// Kind of trend removed by [`detrend_dyn`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum DetrendType {
    /// Least-squares line fit, optionally piecewise between breakpoints.
    #[default]
    Linear,
    /// Mean.
    Constant,
}

impl FromStr for DetrendType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "linear" | "l" => Ok(DetrendType::Linear),
            "constant" | "c" => Ok(DetrendType::Constant),
            _ => Err(Error::invalid_arg(
                "type",
                "Trend type must be 'linear' or 'constant'.",
            )),
        }
    }
}

/// Remove a linear or constant trend along an axis from data.
///
/// # Parameters
/// * `data`: The input data, real or complex.
/// * `axis`: The axis along which to detrend the data. `None` is the last axis.
/// * `kind`: [DetrendType::Linear] subtracts the least-squares fit of a line,
///   [DetrendType::Constant] subtracts the mean.
/// * `bp`: Breakpoints for a piecewise linear fit. Each piece between
///   consecutive breakpoints gets its own line. Ignored for constant trends.
///
/// # Errors
/// * `axis` is out of range.
/// * A breakpoint lies beyond the length of `axis`.
///
/// # Examples
/// ```
/// use ndarray::array;
/// use sci_spectral::signal::detrend::{detrend_dyn, DetrendType};
///
/// let x = array![1.0f64, 3.0, 5.0, 7.0, 9.0];
/// let y = detrend_dyn(&x, None, DetrendType::Linear, &[]).unwrap();
/// assert!(y.iter().all(|v| v.abs() < 1e-12));
/// ```
pub fn detrend_dyn<T, S, D>(
    data: &ArrayBase<S, D>,
    axis: Option<isize>,
    kind: DetrendType,
    bp: &[usize],
) -> Result<Array<T, D>>
where
    T: SpectralSample,
    S: Data<Elem = T>,
    D: Dimension,
{
    let axis = check_and_get_axis_dyn(axis, data)?;
    let lanes = working_lanes(data, axis)?;
    let last = lanes.ndim() - 1;
    let detrended = match kind {
        DetrendType::Constant => remove_mean(lanes),
        DetrendType::Linear => remove_linear(lanes, bp)?,
    };
    move_axis(detrended, last, axis)
        .mapv(T::from_complex)
        .into_dimensionality::<D>()
        .map_err(|_| Error::invariant("detrended data lost its dimensionality"))
}

/// Subtract the mean of every lane along the last axis.
pub(crate) fn remove_mean<F>(mut data: ArrayD<Complex<F>>) -> ArrayD<Complex<F>>
where
    F: SpectralFloat,
{
    let Some(last) = data.ndim().checked_sub(1) else {
        return data;
    };
    let n = data.len_of(Axis(last));
    if n == 0 {
        return data;
    }
    let n = F::from_usize(n).unwrap_or_else(F::nan);
    data.lanes_mut(Axis(last)).into_iter().for_each(|mut lane| {
        let mean = lane.sum() / n;
        lane.mapv_inplace(|v| v - mean);
    });
    data
}

/// Least-squares line of one piece, stored as the pseudo-inverse of its
/// `[ramp, 1]` design matrix.
struct LinearPiece<F: SpectralFloat> {
    start: usize,
    design: DMatrix<F>,
    pinv: DMatrix<F>,
}

impl<F> LinearPiece<F>
where
    F: SpectralFloat,
{
    fn new(start: usize, end: usize) -> Result<Self> {
        let npts = end - start;
        let npts_f = F::from_usize(npts).unwrap_or_else(F::nan);
        let design = DMatrix::<F>::from_fn(npts, 2, |i, j| {
            if j == 0 {
                F::from_usize(i + 1).unwrap_or_else(F::nan) / npts_f
            } else {
                F::one()
            }
        });

        // Same cutoff as numpy's lstsq: eps * max(M, N) * largest singular value.
        let svd = design.clone().svd(true, true);
        let smax = svd
            .singular_values
            .iter()
            .fold(F::zero(), |acc, &s| if s > acc { s } else { acc });
        let rcond = <F as Float>::epsilon() * F::from_usize(npts.max(2)).unwrap_or_else(F::nan);
        let pinv = svd
            .pseudo_inverse(rcond * smax)
            .map_err(|reason| Error::invariant(reason))?;
        Ok(Self {
            start,
            design,
            pinv,
        })
    }

    fn remove_from(&self, lane: &mut [Complex<F>]) {
        let piece = &mut lane[self.start..self.start + self.design.nrows()];
        let coef = (0..2)
            .map(|k| {
                piece
                    .iter()
                    .enumerate()
                    .fold(Complex::zero(), |acc, (i, &y)| acc + y * self.pinv[(k, i)])
            })
            .collect::<Vec<_>>();
        piece.iter_mut().enumerate().for_each(|(i, y)| {
            *y = *y - (coef[0] * self.design[(i, 0)] + coef[1] * self.design[(i, 1)]);
        });
    }
}

/// Subtract a piecewise least-squares line from every lane along the last axis.
pub(crate) fn remove_linear<F>(
    mut data: ArrayD<Complex<F>>,
    bp: &[usize],
) -> Result<ArrayD<Complex<F>>>
where
    F: SpectralFloat,
{
    let Some(last) = data.ndim().checked_sub(1) else {
        return Ok(data);
    };
    let n = data.len_of(Axis(last));

    let mut breaks = Vec::with_capacity(bp.len() + 2);
    breaks.push(0);
    breaks.extend_from_slice(bp);
    breaks.push(n);
    breaks.sort_unstable();
    breaks.dedup();
    if breaks.iter().any(|&b| b > n) {
        return Err(Error::invalid_arg(
            "bp",
            "Breakpoints must be less than length of data along given axis.",
        ));
    }

    let pieces = breaks
        .windows(2)
        .map(|w| LinearPiece::new(w[0], w[1]))
        .collect::<Result<Vec<_>>>()?;
    if pieces.is_empty() {
        return Ok(data);
    }

    if !data.is_standard_layout() {
        data = data.as_standard_layout().into_owned();
    }
    let flat = data
        .as_slice_mut()
        .ok_or_else(|| Error::invariant("detrend scratch buffer is not contiguous"))?;
    flat.chunks_exact_mut(n).for_each(|lane| {
        pieces.iter().for_each(|piece| piece.remove_from(lane));
    });
    Ok(data)
}

/// Custom detrending strategy.
///
/// Receives the segment stack with the within-segment samples on the last
/// axis and must return an array of the same shape.
pub type DetrendFn<F> =
    Arc<dyn Fn(ArrayD<Complex<F>>) -> Result<ArrayD<Complex<F>>> + Send + Sync>;

/// Per-segment detrending applied by the spectral estimators.
#[derive(Clone, Default)]
pub enum Detrend<F> {
    /// Leave segments untouched.
    None,
    /// Subtract each segment's mean.
    #[default]
    Constant,
    /// Subtract each segment's least-squares line.
    Linear,
    /// User supplied transform.
    Custom(DetrendFn<F>),
}

impl<F> fmt::Debug for Detrend<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Detrend::None => f.write_str("None"),
            Detrend::Constant => f.write_str("Constant"),
            Detrend::Linear => f.write_str("Linear"),
            Detrend::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl<F> FromStr for Detrend<F> {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" | "false" => Ok(Detrend::None),
            _ => s.parse::<DetrendType>().map(Detrend::from),
        }
    }
}

impl<F> From<DetrendType> for Detrend<F> {
    fn from(value: DetrendType) -> Self {
        match value {
            DetrendType::Linear => Detrend::Linear,
            DetrendType::Constant => Detrend::Constant,
        }
    }
}

impl<F> Detrend<F>
where
    F: SpectralFloat,
{
    /// Wrap a closure as a [`Detrend::Custom`] strategy.
    pub fn custom<C>(transform: C) -> Self
    where
        C: Fn(ArrayD<Complex<F>>) -> Result<ArrayD<Complex<F>>> + Send + Sync + 'static,
    {
        Detrend::Custom(Arc::new(transform))
    }

    /// Apply along the last axis of `segments`.
    pub(crate) fn apply(&self, segments: ArrayD<Complex<F>>) -> Result<ArrayD<Complex<F>>> {
        match self {
            Detrend::None => Ok(segments),
            Detrend::Constant => Ok(remove_mean(segments)),
            Detrend::Linear => remove_linear(segments, &[]),
            Detrend::Custom(transform) => {
                let shape = segments.shape().to_vec();
                let out = transform(segments)?;
                if out.shape() != shape.as_slice() {
                    return Err(Error::invalid_arg(
                        "detrend",
                        "detrend function must preserve the shape of its input.",
                    ));
                }
                Ok(out)
            }
        }
    }
}

/// Constructor config for [`DetrendKernel`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DetrendConfig {
    /// Kind of trend removed.
    pub kind: DetrendType,
    /// Breakpoints of a piecewise linear fit.
    pub bp: Vec<usize>,
}

/// Trait-first detrend kernel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetrendKernel {
    kind: DetrendType,
    bp: Vec<usize>,
}

impl KernelLifecycle for DetrendKernel {
    type Config = DetrendConfig;

    fn try_new(config: Self::Config) -> core::result::Result<Self, ConfigError> {
        if config.kind == DetrendType::Constant && !config.bp.is_empty() {
            return Err(ConfigError::InvalidArgument {
                arg: "bp",
                reason: "breakpoints only apply to linear detrending",
            });
        }
        Ok(Self {
            kind: config.kind,
            bp: config.bp,
        })
    }
}

impl<F> Detrend1D<F> for DetrendKernel
where
    F: SpectralFloat + SpectralSample<Real = F>,
{
    fn run_into<I, O>(&self, input: &I, out: &mut O) -> core::result::Result<(), ExecInvariantViolation>
    where
        I: Read1D<F> + ?Sized,
        O: Write1D<F> + ?Sized,
    {
        let detrended = self.run_alloc(input)?;
        let out = out.write_slice_mut().map_err(ExecInvariantViolation::from)?;
        if out.len() != detrended.len() {
            return Err(ExecInvariantViolation::LengthMismatch {
                arg: "out",
                expected: detrended.len(),
                got: out.len(),
            });
        }
        out.copy_from_slice(&detrended);
        Ok(())
    }

    fn run_alloc<I>(&self, input: &I) -> core::result::Result<Vec<F>, ExecInvariantViolation>
    where
        I: Read1D<F> + ?Sized,
    {
        let input = input.read_slice().map_err(ExecInvariantViolation::from)?;
        let view = ArrayView1::from(input);
        Ok(detrend_dyn(&view, None, self.kind, &self.bp)?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array1, Array2};

    #[test]
    fn constant_detrend_removes_mean() {
        let x = array![1.0f64, 2.0, 3.0, 6.0];
        let y = detrend_dyn(&x, None, DetrendType::Constant, &[]).unwrap();
        assert_eq!(y, array![-2.0, -1.0, 0.0, 3.0]);
    }

    #[test]
    fn linear_detrend_kills_a_ramp_with_offset() {
        let x = Array1::from_iter((0..64).map(|i| 0.25 * i as f64 - 3.0));
        let y = detrend_dyn(&x, Some(0), DetrendType::Linear, &[]).unwrap();
        y.iter().for_each(|v| assert_abs_diff_eq!(*v, 0.0, epsilon = 1e-10));
    }

    #[test]
    fn breakpoints_fit_each_piece() {
        // Ramp up for 5 samples, then a constant plateau.
        let x = array![0.0f64, 1.0, 2.0, 3.0, 4.0, 10.0, 10.0, 10.0, 10.0];
        let y = detrend_dyn(&x, None, DetrendType::Linear, &[5]).unwrap();
        y.iter().for_each(|v| assert_abs_diff_eq!(*v, 0.0, epsilon = 1e-10));

        // Without the breakpoint a single line cannot explain the knee.
        let z = detrend_dyn(&x, None, DetrendType::Linear, &[]).unwrap();
        assert!(z.iter().any(|v| v.abs() > 0.1));
    }

    #[test]
    fn breakpoint_past_the_end_is_rejected() {
        let x = array![1.0f64, 2.0, 3.0];
        let err = detrend_dyn(&x, None, DetrendType::Linear, &[4]).unwrap_err();
        assert_eq!(
            err,
            Error::invalid_arg(
                "bp",
                "Breakpoints must be less than length of data along given axis."
            )
        );
    }

    #[test]
    fn detrend_along_first_axis_keeps_shape() {
        let x: Array2<f32> = array![[1.0, 10.0], [2.0, 10.0], [3.0, 13.0]];
        let y = detrend_dyn(&x, Some(0), DetrendType::Constant, &[]).unwrap();
        assert_eq!(y.shape(), &[3, 2]);
        assert_abs_diff_eq!(y[[0, 0]], -1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(y[[2, 1]], 2.0, epsilon = 1e-6);
    }

    #[test]
    fn complex_linear_detrend() {
        let x = Array1::from_iter((0..8).map(|i| Complex::new(i as f64, -2.0 * i as f64 + 1.0)));
        let y = detrend_dyn(&x, None, DetrendType::Linear, &[]).unwrap();
        y.iter().for_each(|v| assert_abs_diff_eq!(v.norm(), 0.0, epsilon = 1e-10));
    }

    #[test]
    fn single_sample_piece_is_zeroed() {
        let x = array![5.0f64, 1.0, 2.0, 3.0];
        let y = detrend_dyn(&x, None, DetrendType::Linear, &[1]).unwrap();
        y.iter().for_each(|v| assert_abs_diff_eq!(*v, 0.0, epsilon = 1e-10));
    }

    #[test]
    fn kind_names_parse() {
        assert_eq!("l".parse::<DetrendType>().unwrap(), DetrendType::Linear);
        assert!(matches!("c".parse::<Detrend<f64>>().unwrap(), Detrend::Constant));
        assert!(matches!("false".parse::<Detrend<f64>>().unwrap(), Detrend::None));
        assert_eq!(
            "quadratic".parse::<Detrend<f64>>().unwrap_err(),
            Error::invalid_arg("type", "Trend type must be 'linear' or 'constant'.")
        );
    }

    #[test]
    fn custom_strategy_must_preserve_shape() {
        let segments = ArrayD::from_elem(ndarray::IxDyn(&[2, 4]), Complex::new(1.0f64, 0.0));
        let halve = Detrend::custom(|d: ArrayD<Complex<f64>>| Ok(d.mapv(|v| v * 0.5)));
        let out = halve.apply(segments.clone()).unwrap();
        assert_eq!(out[[1, 3]], Complex::new(0.5, 0.0));

        let squash = Detrend::custom(|d: ArrayD<Complex<f64>>| {
            Ok(d.sum_axis(Axis(1)).into_dyn())
        });
        assert!(squash.apply(segments).is_err());
    }

    #[test]
    fn detrend_kernel_matches_function() {
        let kernel = DetrendKernel::try_new(DetrendConfig {
            kind: DetrendType::Linear,
            bp: vec![2],
        })
        .expect("valid config");
        let x = vec![1.0f64, 4.0, 2.0, 8.0, 3.0];
        let from_kernel: Vec<f64> = kernel.run_alloc(&x).expect("detrend should run");
        let from_fn = detrend_dyn(&Array1::from(x.clone()), None, DetrendType::Linear, &[2]).unwrap();
        from_kernel
            .iter()
            .zip(from_fn.iter())
            .for_each(|(a, b)| assert_abs_diff_eq!(*a, *b, epsilon = 1e-12));

        let mut short = vec![0.0f64; 4];
        assert!(matches!(
            kernel.run_into(&x, &mut short),
            Err(ExecInvariantViolation::LengthMismatch { .. })
        ));

        assert!(DetrendKernel::try_new(DetrendConfig {
            kind: DetrendType::Constant,
            bp: vec![3],
        })
        .is_err());
    }
}
