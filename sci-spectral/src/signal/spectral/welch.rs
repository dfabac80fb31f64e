use core::any::TypeId;

use ndarray::{Array1, ArrayBase, ArrayD, Axis, Data, Dimension, IxDyn, Slice, Zip};
use rustfft::num_complex::Complex;
use sci_spectral_core::{Error, Result};

use super::average::{average_segments, Average};
use super::helper::{cross_spectral_helper, spectral_helper, SpectralHelperConfig};
use super::kernels::{CsdKernel, WelchKernel};
use super::{Scaling, SpectralMode, SpectralWarning, SpectralWindow};
use crate::kernel::KernelLifecycle;
use crate::signal::arraytools::{broadcast_shapes, normalize_axis};
use crate::signal::detrend::Detrend;
use crate::signal::sample::{SpectralFloat, SpectralSample};
use crate::signal::traits::{Csd1D, WelchPsd1D};
use crate::signal::windows::WindowBuilderOwned;

/// Options shared by [`welch_dyn`], [`csd_dyn`] and [`coherence_dyn`].
#[derive(Debug, Clone)]
pub struct SpectralParams<F> {
    /// Sampling frequency. Defaults to 1.
    pub fs: F,
    /// Segment window. Defaults to a periodic Hann window.
    pub window: SpectralWindow<F>,
    /// Samples per segment. `None` picks 256 for a named window, clipped to
    /// the input length, or the coefficient count of an explicit window.
    pub nperseg: Option<usize>,
    /// Overlap between segments. `None` picks `nperseg / 2`.
    pub noverlap: Option<usize>,
    /// FFT length. `None` picks `nperseg`.
    pub nfft: Option<usize>,
    /// Per-segment trend removal. Defaults to removing the mean.
    pub detrend: Detrend<F>,
    /// Return only non-negative frequencies for real input.
    pub return_onesided: bool,
    /// Density (`V**2/Hz`) or spectrum (`V**2`).
    pub scaling: Scaling,
    /// Sample axis. Defaults to the last axis.
    pub axis: isize,
    /// How the segment periodograms are combined.
    pub average: Average,
}

impl<F> Default for SpectralParams<F>
where
    F: SpectralFloat,
{
    fn default() -> Self {
        Self {
            fs: F::one(),
            window: SpectralWindow::default(),
            nperseg: None,
            noverlap: None,
            nfft: None,
            detrend: Detrend::Constant,
            return_onesided: true,
            scaling: Scaling::Density,
            axis: -1,
            average: Average::Mean,
        }
    }
}

impl<F> SpectralParams<F>
where
    F: SpectralFloat,
{
    fn helper_config(&self) -> SpectralHelperConfig<F> {
        SpectralHelperConfig {
            fs: self.fs,
            window: self.window.clone(),
            nperseg: self.nperseg,
            noverlap: self.noverlap,
            nfft: self.nfft,
            detrend: self.detrend.clone(),
            return_onesided: self.return_onesided,
            scaling: self.scaling,
            axis: self.axis,
            mode: SpectralMode::Psd,
            boundary: None,
            padded: false,
        }
    }
}

/// Output of [`welch_dyn`].
#[derive(Debug, Clone, PartialEq)]
pub struct WelchResult<F> {
    /// Sample frequencies.
    pub frequencies: Array1<F>,
    /// Power spectral density or power spectrum.
    pub pxx: ArrayD<F>,
    /// Adjustments made along the way.
    pub warnings: Vec<SpectralWarning>,
}

/// Output of [`csd_dyn`].
#[derive(Debug, Clone, PartialEq)]
pub struct CsdResult<F> {
    /// Sample frequencies.
    pub frequencies: Array1<F>,
    /// Cross spectral density or cross spectrum.
    pub pxy: ArrayD<Complex<F>>,
    /// Adjustments made along the way.
    pub warnings: Vec<SpectralWarning>,
}

/// Output of [`coherence_dyn`].
#[derive(Debug, Clone, PartialEq)]
pub struct CoherenceResult<F> {
    /// Sample frequencies.
    pub frequencies: Array1<F>,
    /// Magnitude squared coherence, within `[0, 1]`.
    pub cxy: ArrayD<F>,
    /// Adjustments made along the way.
    pub warnings: Vec<SpectralWarning>,
}

/// Whether `x` and `y` are the same array: same element type, memory,
/// shape and strides.
fn is_same_data<T, U, S1, S2, D1, D2>(x: &ArrayBase<S1, D1>, y: &ArrayBase<S2, D2>) -> bool
where
    T: 'static,
    U: 'static,
    S1: Data<Elem = T>,
    S2: Data<Elem = U>,
    D1: Dimension,
    D2: Dimension,
{
    TypeId::of::<T>() == TypeId::of::<U>()
        && x.as_ptr().cast::<()>() == y.as_ptr().cast::<()>()
        && x.shape() == y.shape()
        && x.strides() == y.strides()
}

/// Estimate power spectral density using Welch's method.
///
/// Welch's method computes an estimate of the power spectral density by
/// dividing the data into overlapping segments, computing a modified
/// periodogram for each segment and averaging the periodograms.
///
/// `pxx` has the shape of `x` with the sample axis replaced by the
/// frequency axis. An `x` with no elements returns empty frequencies and a
/// zero `pxx` of the same shape as `x`.
///
/// # Errors
/// Invalid segment parameters, an explicit window that does not fit the
/// input, or an `axis` out of range.
///
/// # Examples
/// ```
/// use sci_spectral::ndarray::Array1;
/// use sci_spectral::signal::spectral::{welch_dyn, SpectralParams};
///
/// let fs = 1000.0;
/// let x = Array1::from_iter((0..1000).map(|i| (2.0 * std::f64::consts::PI * 50.0 * i as f64 / fs).sin()));
/// let params = SpectralParams { fs, nperseg: Some(200), ..Default::default() };
/// let out = welch_dyn(&x, &params).unwrap();
/// assert_eq!(out.frequencies.len(), 101);
/// let peak = (0..101).max_by(|&a, &b| out.pxx[[a]].total_cmp(&out.pxx[[b]])).unwrap();
/// assert_eq!(out.frequencies[peak], 50.0);
/// ```
pub fn welch_dyn<T, S, D>(
    x: &ArrayBase<S, D>,
    params: &SpectralParams<T::Real>,
) -> Result<WelchResult<T::Real>>
where
    T: SpectralSample,
    S: Data<Elem = T>,
    D: Dimension,
{
    let out = spectral_helper(x, &params.helper_config())?;
    let pxx = average_segments(out.result, params.average);
    Ok(WelchResult {
        frequencies: out.frequencies,
        pxx: pxx.mapv(|v| v.re),
        warnings: out.warnings,
    })
}

/// Estimate the cross power spectral density, `Pxy`, using Welch's method.
///
/// The non-sample axes of `x` and `y` are broadcast together; the shorter
/// signal is zero-padded to the length of the longer one. Passing the same
/// array twice is equivalent to [`welch_dyn`], with a zero imaginary part.
///
/// # Errors
/// As [`welch_dyn`], or the non-sample axes cannot be broadcast.
pub fn csd_dyn<T, U, S1, S2, D1, D2>(
    x: &ArrayBase<S1, D1>,
    y: &ArrayBase<S2, D2>,
    params: &SpectralParams<T::Real>,
) -> Result<CsdResult<T::Real>>
where
    T: SpectralSample,
    U: SpectralSample<Real = T::Real>,
    S1: Data<Elem = T>,
    S2: Data<Elem = U>,
    D1: Dimension,
    D2: Dimension,
{
    let config = params.helper_config();
    let out = if is_same_data(x, y) {
        spectral_helper(x, &config)?
    } else {
        cross_spectral_helper(x, y, &config)?
    };
    Ok(CsdResult {
        frequencies: out.frequencies,
        pxy: average_segments(out.result, params.average),
        warnings: out.warnings,
    })
}

/// Welch PSD of a contiguous 1D signal with default options otherwise.
///
/// # Examples
/// ```
/// use sci_spectral::signal::spectral::welch;
///
/// let x = [1.0f64; 64];
/// let (f, pxx) = welch(&x, 1.0, 16).unwrap();
/// assert_eq!(f.len(), 9);
/// assert!(pxx.iter().all(|&p| p.abs() < 1e-20));
/// ```
pub fn welch<F>(x: &[F], fs: F, nperseg: usize) -> Result<(Vec<F>, Vec<F>)>
where
    F: SpectralFloat + SpectralSample<Real = F>,
{
    let kernel = WelchKernel::try_new(SpectralParams {
        fs,
        nperseg: Some(nperseg),
        ..Default::default()
    })?;
    Ok(kernel.run_alloc(x)?)
}

/// Cross spectral density of two contiguous 1D signals with default options
/// otherwise.
pub fn csd<F>(x: &[F], y: &[F], fs: F, nperseg: usize) -> Result<(Vec<F>, Vec<Complex<F>>)>
where
    F: SpectralFloat + SpectralSample<Real = F>,
{
    let kernel = CsdKernel::try_new(SpectralParams {
        fs,
        nperseg: Some(nperseg),
        ..Default::default()
    })?;
    Ok(kernel.run_alloc(x, y)?)
}

/// Options of [`periodogram_dyn`].
#[derive(Debug, Clone)]
pub struct PeriodogramParams<F> {
    /// Sampling frequency.
    pub fs: F,
    /// Window over the whole signal. Defaults to boxcar.
    pub window: SpectralWindow<F>,
    /// FFT length. Shorter than the signal truncates it, longer zero-pads.
    pub nfft: Option<usize>,
    /// Trend removal.
    pub detrend: Detrend<F>,
    /// Return only non-negative frequencies for real input.
    pub return_onesided: bool,
    /// Density or spectrum.
    pub scaling: Scaling,
    /// Sample axis.
    pub axis: isize,
}

impl<F> Default for PeriodogramParams<F>
where
    F: SpectralFloat,
{
    fn default() -> Self {
        Self {
            fs: F::one(),
            window: SpectralWindow::Builder(WindowBuilderOwned::Boxcar),
            nfft: None,
            detrend: Detrend::Constant,
            return_onesided: true,
            scaling: Scaling::Density,
            axis: -1,
        }
    }
}

/// Estimate power spectral density using a periodogram: a single segment
/// spanning the whole signal.
///
/// # Errors
/// An explicit window of a length other than the segment, or an `axis` out
/// of range.
pub fn periodogram_dyn<T, S, D>(
    x: &ArrayBase<S, D>,
    params: &PeriodogramParams<T::Real>,
) -> Result<WelchResult<T::Real>>
where
    T: SpectralSample,
    S: Data<Elem = T>,
    D: Dimension,
{
    let axis = normalize_axis(params.axis, x.ndim())?;
    if x.is_empty() {
        return Ok(WelchResult {
            frequencies: Array1::zeros(0),
            pxx: ArrayD::zeros(IxDyn(x.shape())),
            warnings: Vec::new(),
        });
    }
    let len = x.len_of(Axis(axis));
    let (view, nperseg, nfft) = match params.nfft {
        Some(nfft) if nfft < len => {
            let mut view = x.view();
            view.slice_axis_inplace(Axis(axis), Slice::from(..nfft));
            (view, nfft, None)
        }
        Some(nfft) => (x.view(), len, Some(nfft)),
        None => (x.view(), len, None),
    };
    let welch_params = SpectralParams {
        fs: params.fs,
        window: params.window.clone(),
        nperseg: Some(nperseg),
        noverlap: Some(0),
        nfft,
        detrend: params.detrend.clone(),
        return_onesided: params.return_onesided,
        scaling: params.scaling,
        axis: params.axis,
        average: Average::Mean,
    };
    welch_dyn(&view, &welch_params)
}

/// Estimate the magnitude squared coherence, `|Pxy|**2 / (Pxx * Pyy)`, of
/// two signals using Welch's method.
///
/// # Errors
/// As [`csd_dyn`].
pub fn coherence_dyn<T, U, S1, S2, D1, D2>(
    x: &ArrayBase<S1, D1>,
    y: &ArrayBase<S2, D2>,
    params: &SpectralParams<T::Real>,
) -> Result<CoherenceResult<T::Real>>
where
    T: SpectralSample,
    U: SpectralSample<Real = T::Real>,
    S1: Data<Elem = T>,
    S2: Data<Elem = U>,
    D1: Dimension,
    D2: Dimension,
{
    let pxx = welch_dyn(x, params)?;
    let pyy = welch_dyn(y, params)?;
    let pxy = csd_dyn(x, y, params)?;

    let shape = broadcast_shapes(pxy.pxy.shape(), pxx.pxx.shape())
        .and_then(|shape| broadcast_shapes(&shape, pyy.pxx.shape()))?;
    let broadcast_err = || Error::invalid_arg("x", "x and y cannot be broadcast together.");
    let bxy = pxy.pxy.broadcast(IxDyn(&shape)).ok_or_else(broadcast_err)?;
    let bxx = pxx.pxx.broadcast(IxDyn(&shape)).ok_or_else(broadcast_err)?;
    let byy = pyy.pxx.broadcast(IxDyn(&shape)).ok_or_else(broadcast_err)?;
    let cxy = Zip::from(&bxy)
        .and(&bxx)
        .and(&byy)
        .map_collect(|&p, &a, &b| p.norm_sqr() / a / b);

    let mut warnings = pxx.warnings;
    for warning in pyy.warnings.into_iter().chain(pxy.warnings) {
        if !warnings.contains(&warning) {
            warnings.push(warning);
        }
    }
    Ok(CoherenceResult {
        frequencies: pxy.frequencies,
        cxy,
        warnings,
    })
}
