use std::sync::Arc;

use ndarray::{concatenate, Array1, ArrayBase, ArrayD, Axis, Data, Dimension, IxDyn, Zip};
use num_traits::{Float, Zero};
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use sci_spectral_core::num_rs::{fftfreq, rfftfreq};
use sci_spectral_core::{Error, Result};

use super::segments::stack_segments;
use super::{Scaling, SpectralMode, SpectralWarning, SpectralWindow};
use crate::signal::arraytools::{broadcast_shapes, move_axis, normalize_axis};
use crate::signal::detrend::Detrend;
use crate::signal::extend::Boundary;
use crate::signal::sample::{working_lanes, SpectralFloat, SpectralSample};
use crate::signal::windows::GetWindow;

/// Segment length used with a named window when none is given.
pub const DEFAULT_NPERSEG: usize = 256;

/// Options of [`spectral_helper`] and [`cross_spectral_helper`].
#[derive(Debug, Clone)]
pub struct SpectralHelperConfig<F> {
    /// Sampling frequency.
    pub fs: F,
    /// Window applied to each segment.
    pub window: SpectralWindow<F>,
    /// Samples per segment. Defaults to [`DEFAULT_NPERSEG`] for a named window
    /// or the coefficient count for an explicit one.
    pub nperseg: Option<usize>,
    /// Samples shared by consecutive segments. Defaults to `nperseg / 2`.
    pub noverlap: Option<usize>,
    /// FFT length, at least `nperseg`. Defaults to `nperseg`.
    pub nfft: Option<usize>,
    /// Per-segment trend removal.
    pub detrend: Detrend<F>,
    /// Keep only the non-negative frequencies of real input.
    pub return_onesided: bool,
    /// Normalisation of the result.
    pub scaling: Scaling,
    /// Axis of the samples.
    pub axis: isize,
    /// Periodograms or raw transforms.
    pub mode: SpectralMode,
    /// Extension applied to both ends before segmenting.
    pub boundary: Option<Boundary>,
    /// Zero-pad the end so the last segment is whole.
    pub padded: bool,
}

impl<F> Default for SpectralHelperConfig<F>
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
            mode: SpectralMode::Psd,
            boundary: None,
            padded: false,
        }
    }
}

/// Frequencies, segment times and per-segment spectra.
///
/// `result` has the input's batch shape with the frequency axis where the
/// sample axis was and a trailing segment axis.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralOutput<F> {
    /// Sample frequencies.
    pub frequencies: Array1<F>,
    /// Segment centre times.
    pub times: Array1<F>,
    /// Scaled periodograms or transforms.
    pub result: ArrayD<Complex<F>>,
    /// Adjustments made along the way.
    pub warnings: Vec<SpectralWarning>,
}

impl<F> SpectralOutput<F>
where
    F: SpectralFloat,
{
    fn empty(result: ArrayD<Complex<F>>) -> Self {
        Self {
            frequencies: Array1::zeros(0),
            times: Array1::zeros(0),
            result,
            warnings: Vec::new(),
        }
    }
}

/// Per-segment spectra of one signal.
///
/// In [`SpectralMode::Psd`] every segment yields its scaled auto periodogram,
/// which is real. In [`SpectralMode::Stft`] the scaled transforms are
/// returned as they are.
///
/// An input with no elements yields empty frequencies and times and a zero
/// `result` of the input's shape.
///
/// # Errors
/// * `axis` out of range.
/// * `nperseg == 0`, an explicit window longer than the input or of a
///   length other than `nperseg`.
/// * `nfft < nperseg` or `noverlap >= nperseg`.
/// * A boundary extension longer than the input allows.
pub fn spectral_helper<T, S, D>(
    x: &ArrayBase<S, D>,
    config: &SpectralHelperConfig<T::Real>,
) -> Result<SpectralOutput<T::Real>>
where
    T: SpectralSample,
    S: Data<Elem = T>,
    D: Dimension,
{
    let axis = normalize_axis(config.axis, x.ndim())?;
    if x.is_empty() {
        return Ok(SpectralOutput::empty(ArrayD::zeros(IxDyn(x.shape()))));
    }
    let lanes = working_lanes(x, axis)?;
    run(lanes, None, (T::IS_COMPLEX, false), config)
}

/// Per-segment cross periodograms `conj(X) * Y` of two signals.
///
/// The non-sample axes of `x` and `y` are broadcast together, and the
/// shorter signal is zero-padded to the longer one.
///
/// # Errors
/// As [`spectral_helper`], and additionally:
/// * `config.mode` is [`SpectralMode::Stft`].
/// * The non-sample axes cannot be broadcast.
pub fn cross_spectral_helper<T, U, S1, S2, D1, D2>(
    x: &ArrayBase<S1, D1>,
    y: &ArrayBase<S2, D2>,
    config: &SpectralHelperConfig<T::Real>,
) -> Result<SpectralOutput<T::Real>>
where
    T: SpectralSample,
    U: SpectralSample<Real = T::Real>,
    S1: Data<Elem = T>,
    S2: Data<Elem = U>,
    D1: Dimension,
    D2: Dimension,
{
    if config.mode != SpectralMode::Psd {
        return Err(Error::invalid_arg(
            "mode",
            "x and y must be equal if mode is 'stft'",
        ));
    }
    let ax_x = normalize_axis(config.axis, x.ndim())?;
    let ax_y = normalize_axis(config.axis, y.ndim())?;
    let outershape = broadcast_shapes(&outer_shape(x.shape(), ax_x), &outer_shape(y.shape(), ax_y))?;

    if x.is_empty() || y.is_empty() {
        let mut shape = outershape;
        shape.push(x.len_of(Axis(ax_x)).min(y.len_of(Axis(ax_y))));
        let ndim = shape.len();
        let target = normalize_axis(config.axis, ndim).unwrap_or(ndim - 1);
        let empty = move_axis(ArrayD::zeros(IxDyn(&shape)), ndim - 1, target);
        return Ok(SpectralOutput::empty(empty.as_standard_layout().into_owned()));
    }

    let x_lanes = working_lanes(x, ax_x)?;
    let y_lanes = working_lanes(y, ax_y)?;
    run(x_lanes, Some(y_lanes), (T::IS_COMPLEX, U::IS_COMPLEX), config)
}

fn outer_shape(shape: &[usize], axis: usize) -> Vec<usize> {
    shape
        .iter()
        .enumerate()
        .filter(|&(ax, _)| ax != axis)
        .map(|(_, &len)| len)
        .collect()
}

fn last_len<A>(a: &ArrayD<A>) -> usize {
    a.shape().last().copied().unwrap_or(0)
}

fn pad_zeros<F: SpectralFloat>(a: ArrayD<Complex<F>>, n: usize) -> Result<ArrayD<Complex<F>>> {
    if n == 0 || a.ndim() == 0 {
        return Ok(a);
    }
    let mut shape = a.shape().to_vec();
    if let Some(last) = shape.last_mut() {
        *last = n;
    }
    let zeros = ArrayD::zeros(IxDyn(&shape));
    concatenate(Axis(a.ndim() - 1), &[a.view(), zeros.view()])
        .map_err(|_| Error::invariant("zero padding changed the batch shape"))
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Sides {
    OneSided,
    TwoSided,
}

impl Sides {
    fn nfreq(self, nfft: usize) -> usize {
        match self {
            Sides::OneSided => nfft / 2 + 1,
            Sides::TwoSided => nfft,
        }
    }
}

/// Window coefficients and the segment length they imply.
fn triage_segments<F>(
    window: &SpectralWindow<F>,
    nperseg: Option<usize>,
    input_len: usize,
    warnings: &mut Vec<SpectralWarning>,
) -> Result<(Vec<F>, usize)>
where
    F: SpectralFloat,
{
    match window {
        SpectralWindow::Builder(builder) => {
            let mut nperseg = nperseg.unwrap_or(DEFAULT_NPERSEG);
            if nperseg > input_len {
                SpectralWarning::NpersegClipped {
                    requested: nperseg,
                    input_len,
                }
                .raise(warnings);
                nperseg = input_len;
            }
            Ok((builder.build_window(nperseg, None).get_window(), nperseg))
        }
        SpectralWindow::Coefficients(win) => {
            if input_len < win.len() {
                return Err(Error::invalid_arg(
                    "window",
                    "window is longer than input signal",
                ));
            }
            match nperseg {
                Some(n) if n != win.len() => Err(Error::invalid_arg(
                    "nperseg",
                    "value specified for nperseg is different from length of window",
                )),
                _ => Ok((win.clone(), win.len())),
            }
        }
    }
}

/// Detrend, window and transform every segment of a set of lanes.
struct SegmentTransform<'a, F: SpectralFloat> {
    window: &'a [F],
    nperseg: usize,
    noverlap: usize,
    nfft: usize,
    sides: Sides,
    detrend: &'a Detrend<F>,
    fft: Arc<dyn Fft<F>>,
}

impl<F: SpectralFloat> SegmentTransform<'_, F> {
    /// `(batch..., len)` lanes to `(batch..., nseg, nfreq)` spectra.
    fn apply(&self, x: &ArrayD<Complex<F>>) -> Result<ArrayD<Complex<F>>> {
        let segments = stack_segments(x, self.nperseg, self.noverlap)?;
        let segments = self.detrend.apply(segments)?.as_standard_layout().into_owned();
        let flat = segments
            .as_slice()
            .ok_or_else(|| Error::invariant("segment stack is not contiguous"))?;

        let nfreq = self.sides.nfreq(self.nfft);
        let mut out = Vec::with_capacity(flat.len() / self.nperseg * nfreq);
        let mut buffer = vec![Complex::zero(); self.nfft];
        let mut scratch = vec![Complex::zero(); self.fft.get_inplace_scratch_len()];
        for seg in flat.chunks_exact(self.nperseg) {
            buffer.fill(Complex::zero());
            for ((b, &s), &w) in buffer.iter_mut().zip(seg).zip(self.window) {
                // Only the real part of real input takes part in a one-sided transform.
                let s = match self.sides {
                    Sides::OneSided => Complex::new(s.re, F::zero()),
                    Sides::TwoSided => s,
                };
                *b = s * w;
            }
            self.fft.process_with_scratch(&mut buffer, &mut scratch);
            out.extend_from_slice(&buffer[..nfreq]);
        }

        let mut shape = segments.shape().to_vec();
        if let Some(last) = shape.last_mut() {
            *last = nfreq;
        }
        ArrayD::from_shape_vec(IxDyn(&shape), out)
            .map_err(|_| Error::invariant("spectra have the wrong size"))
    }
}

fn cross_product<F: SpectralFloat>(
    rx: &ArrayD<Complex<F>>,
    ry: &ArrayD<Complex<F>>,
) -> Result<ArrayD<Complex<F>>> {
    let shape = broadcast_shapes(rx.shape(), ry.shape())?;
    let bx = rx
        .broadcast(IxDyn(&shape))
        .ok_or_else(|| Error::invalid_arg("x", "x and y cannot be broadcast together."))?;
    let by = ry
        .broadcast(IxDyn(&shape))
        .ok_or_else(|| Error::invalid_arg("y", "x and y cannot be broadcast together."))?;
    Ok(Zip::from(&bx).and(&by).map_collect(|a, b| a.conj() * *b))
}

/// Position of the frequency axis in a result of `ndim` axes whose last
/// axis is the segment axis.
fn freq_axis_target(axis: isize, ndim: usize) -> usize {
    let target = if axis >= 0 {
        Some(axis.unsigned_abs())
    } else {
        ndim.checked_add_signed(axis - 1)
    };
    target.map_or(ndim - 1, |t| t.min(ndim - 1))
}

fn run<F>(
    mut x: ArrayD<Complex<F>>,
    mut y: Option<ArrayD<Complex<F>>>,
    (x_complex, y_complex): (bool, bool),
    config: &SpectralHelperConfig<F>,
) -> Result<SpectralOutput<F>>
where
    F: SpectralFloat,
{
    if let Some(ny) = y.as_ref().map(|y| last_len(y)) {
        let nx = last_len(&x);
        if nx > ny {
            y = y.map(|y| pad_zeros(y, nx - ny)).transpose()?;
        } else if ny > nx {
            x = pad_zeros(x, ny - nx)?;
        }
    }

    if config.nperseg == Some(0) {
        return Err(Error::invalid_arg(
            "nperseg",
            "nperseg must be a positive integer",
        ));
    }
    let mut warnings = Vec::new();
    let (win, nperseg) = triage_segments(&config.window, config.nperseg, last_len(&x), &mut warnings)?;

    let nfft = match config.nfft {
        Some(nfft) if nfft < nperseg => {
            return Err(Error::invalid_arg(
                "nfft",
                "nfft must be greater than or equal to nperseg.",
            ))
        }
        Some(nfft) => nfft,
        None => nperseg,
    };
    let noverlap = config.noverlap.unwrap_or(nperseg / 2);
    if noverlap >= nperseg {
        return Err(Error::invalid_arg(
            "noverlap",
            "noverlap must be less than nperseg.",
        ));
    }
    let step = nperseg - noverlap;

    if let Some(boundary) = config.boundary {
        let half = nperseg / 2;
        x = boundary.ext(&x, half, Some(-1))?;
        y = y.map(|y| boundary.ext(&y, half, Some(-1))).transpose()?;
    }

    if config.padded {
        let excess = last_len(&x) as i64 - nperseg as i64;
        let nadd = (-excess).rem_euclid(step as i64) % nperseg as i64;
        let nadd = usize::try_from(nadd).unwrap_or(0);
        x = pad_zeros(x, nadd)?;
        y = y.map(|y| pad_zeros(y, nadd)).transpose()?;
    }

    let wsum: F = win.iter().copied().sum();
    let wsq: F = win.iter().map(|&w| w * w).sum();
    let mut scale = match config.scaling {
        Scaling::Density => F::one() / (config.fs * wsq),
        Scaling::Spectrum => F::one() / (wsum * wsum),
    };
    if config.mode == SpectralMode::Stft {
        scale = Float::sqrt(scale);
    }

    let mut sides = if config.return_onesided {
        Sides::OneSided
    } else {
        Sides::TwoSided
    };
    if sides == Sides::OneSided && (x_complex || y_complex) {
        sides = Sides::TwoSided;
        SpectralWarning::OneSidedDowngraded.raise(&mut warnings);
    }

    let spacing = F::one() / config.fs;
    let frequencies = match sides {
        Sides::OneSided => rfftfreq(nfft, spacing)?,
        Sides::TwoSided => fftfreq(nfft, spacing)?,
    };

    let transform = SegmentTransform {
        window: &win,
        nperseg,
        noverlap,
        nfft,
        sides,
        detrend: &config.detrend,
        fft: FftPlanner::<F>::new().plan_fft_forward(nfft),
    };
    let rx = transform.apply(&x)?;
    let mut result = match (&y, config.mode) {
        (Some(y), _) => cross_product(&rx, &transform.apply(y)?)?,
        // conj(r) * r, exactly real.
        (None, SpectralMode::Psd) => rx.mapv(|v| Complex::new(v.norm_sqr(), F::zero())),
        (None, SpectralMode::Stft) => rx,
    };
    result.mapv_inplace(|v| v * scale);

    let two = F::one() + F::one();
    if sides == Sides::OneSided && config.mode == SpectralMode::Psd {
        // Fold the negative frequencies in; DC and, for even nfft, Nyquist have no mirror.
        let nfreq = frequencies.len();
        let stop = if nfft % 2 == 1 { nfreq } else { nfreq - 1 };
        let last = Axis(result.ndim() - 1);
        for mut lane in result.lanes_mut(last) {
            lane.iter_mut()
                .take(stop)
                .skip(1)
                .for_each(|v| *v = *v * two);
        }
    }

    let ndim = result.ndim();
    let nseg = result.len_of(Axis(ndim - 2));
    let half = F::from_usize(nperseg).unwrap_or_else(F::nan) / two;
    let step = F::from_usize(step).unwrap_or_else(F::nan);
    let times = Array1::from_iter((0..nseg).map(|k| {
        let k = F::from_usize(k).unwrap_or_else(F::nan);
        let centre = (half + k * step) / config.fs;
        match config.boundary {
            Some(_) => centre - half / config.fs,
            None => centre,
        }
    }));

    let target = freq_axis_target(config.axis, ndim);
    let result = move_axis(result, ndim - 1, target)
        .as_standard_layout()
        .into_owned();

    Ok(SpectralOutput {
        frequencies,
        times,
        result,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::windows::WindowBuilderOwned;
    use approx::assert_abs_diff_eq;
    use ndarray::{Array1, Array2};

    fn ramp(n: usize) -> Array1<f64> {
        Array1::from_iter((0..n).map(|i| (i as f64 * 0.37).sin()))
    }

    #[test]
    fn psd_mode_shapes_and_times() {
        let x = ramp(1000);
        let config = SpectralHelperConfig {
            fs: 10.0,
            nperseg: Some(200),
            ..Default::default()
        };
        let out = spectral_helper(&x, &config).expect("psd");
        assert_eq!(out.frequencies.len(), 101);
        assert_eq!(out.result.shape(), &[101, 9]);
        assert_eq!(out.times.len(), 9);
        assert_abs_diff_eq!(out.times[0], 10.0, epsilon = 1e-12);
        assert_abs_diff_eq!(out.times[8], 90.0, epsilon = 1e-12);
        assert!(out.result.iter().all(|v| v.im == 0.0 && v.re >= 0.0));
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn stft_mode_extends_and_pads() {
        let x = ramp(1000);
        let config = SpectralHelperConfig {
            nperseg: Some(256),
            detrend: Detrend::None,
            scaling: Scaling::Spectrum,
            mode: SpectralMode::Stft,
            boundary: Some(Boundary::Zeros),
            padded: true,
            ..Default::default()
        };
        let out = spectral_helper(&x, &config).expect("stft");
        assert_eq!(out.result.shape(), &[129, 9]);
        assert_abs_diff_eq!(out.times[0], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(out.times[8], 1024.0, epsilon = 1e-12);
        assert!(out.result.iter().any(|v| v.im != 0.0));
    }

    #[test]
    fn frequency_axis_replaces_the_sample_axis() {
        let x = Array2::from_shape_fn((64, 3), |(i, j)| ((i * (j + 1)) as f64 * 0.1).cos());
        let config = SpectralHelperConfig {
            nperseg: Some(16),
            axis: 0,
            ..Default::default()
        };
        let out = spectral_helper(&x, &config).expect("axis 0");
        assert_eq!(out.result.shape(), &[9, 3, 7]);
    }

    #[test]
    fn cross_pads_the_shorter_signal() {
        let x = ramp(100);
        let y = ramp(60);
        let config = SpectralHelperConfig {
            nperseg: Some(20),
            ..Default::default()
        };
        let out = cross_spectral_helper(&x, &y, &config).expect("csd");
        assert_eq!(out.result.shape(), &[11, 9]);
    }

    #[test]
    fn cross_broadcasts_batch_axes() {
        let x = Array2::from_shape_fn((3, 64), |(i, j)| ((i + j) as f64).sin());
        let y = ramp(64);
        let config = SpectralHelperConfig {
            nperseg: Some(32),
            ..Default::default()
        };
        let out = cross_spectral_helper(&x, &y, &config).expect("broadcast");
        assert_eq!(out.result.shape(), &[3, 17, 3]);

        let z = Array2::<f64>::zeros((2, 64));
        assert!(cross_spectral_helper(&x, &z, &config).is_err());
    }

    #[test]
    fn cross_rejects_stft_mode() {
        let x = ramp(32);
        let y = ramp(32);
        let config = SpectralHelperConfig {
            mode: SpectralMode::Stft,
            ..Default::default()
        };
        assert_eq!(
            cross_spectral_helper(&x, &y, &config).unwrap_err(),
            Error::invalid_arg("mode", "x and y must be equal if mode is 'stft'")
        );
    }

    #[test]
    fn empty_inputs_short_circuit() {
        let x = Array2::<f64>::zeros((3, 0));
        let out = spectral_helper(&x, &SpectralHelperConfig::default()).expect("empty");
        assert_eq!(out.result.shape(), &[3, 0]);
        assert!(out.frequencies.is_empty());

        let y = Array2::<f64>::zeros((3, 5));
        let out = cross_spectral_helper(&x, &y, &SpectralHelperConfig::default())
            .expect("empty cross");
        assert_eq!(out.result.shape(), &[3, 0]);

        let y = Array1::<f64>::zeros(5);
        let x = Array2::<f64>::zeros((0, 4));
        let config = SpectralHelperConfig {
            axis: 0,
            ..Default::default()
        };
        let out = cross_spectral_helper(&x, &y, &config).expect("empty along axis 0");
        assert_eq!(out.result.shape(), &[0, 4]);
    }

    #[test]
    fn named_window_is_clipped_with_a_warning() {
        let x = ramp(100);
        let out = spectral_helper(&x, &SpectralHelperConfig::default()).expect("clip");
        assert_eq!(
            out.warnings,
            vec![SpectralWarning::NpersegClipped {
                requested: 256,
                input_len: 100
            }]
        );
        assert_eq!(out.frequencies.len(), 51);
        assert_eq!(out.result.shape(), &[51, 1]);
    }

    #[test]
    fn explicit_window_errors() {
        let x = ramp(8);
        let long = SpectralHelperConfig {
            window: SpectralWindow::Coefficients(vec![1.0; 9]),
            ..Default::default()
        };
        assert_eq!(
            spectral_helper(&x, &long).unwrap_err(),
            Error::invalid_arg("window", "window is longer than input signal")
        );
        let mismatched = SpectralHelperConfig {
            window: SpectralWindow::Coefficients(vec![1.0; 4]),
            nperseg: Some(5),
            ..Default::default()
        };
        assert_eq!(
            spectral_helper(&x, &mismatched).unwrap_err(),
            Error::invalid_arg(
                "nperseg",
                "value specified for nperseg is different from length of window"
            )
        );
    }

    #[test]
    fn segment_parameter_errors() {
        let x = ramp(64);
        let cases = [
            (Some(0), None, None, "nperseg"),
            (Some(16), Some(16), None, "noverlap"),
            (Some(16), None, Some(8), "nfft"),
        ];
        for (nperseg, noverlap, nfft, arg) in cases {
            let config = SpectralHelperConfig {
                window: SpectralWindow::Builder(WindowBuilderOwned::Hann),
                nperseg,
                noverlap,
                nfft,
                ..Default::default()
            };
            let err = spectral_helper(&x, &config).unwrap_err();
            assert!(matches!(err, Error::InvalidArg { arg: a, .. } if a == arg));
        }
    }

    #[test]
    fn complex_input_is_two_sided() {
        let x = Array1::from_iter((0..64).map(|i| Complex::new((i as f64).cos(), (i as f64).sin())));
        let config = SpectralHelperConfig {
            nperseg: Some(16),
            ..Default::default()
        };
        let out = spectral_helper(&x, &config).expect("complex");
        assert_eq!(out.frequencies.len(), 16);
        assert_eq!(out.warnings, vec![SpectralWarning::OneSidedDowngraded]);
    }

    #[test]
    fn freq_axis_target_follows_negative_axes() {
        assert_eq!(freq_axis_target(-1, 2), 0);
        assert_eq!(freq_axis_target(-1, 3), 1);
        assert_eq!(freq_axis_target(0, 3), 0);
        assert_eq!(freq_axis_target(-2, 4), 1);
    }
}
