use ndarray::{Array1, ArrayBase, ArrayD, Data, Dimension};
use rustfft::num_complex::Complex;
use sci_spectral_core::Result;

use super::helper::{spectral_helper, SpectralHelperConfig};
use super::{Scaling, SpectralMode, SpectralWarning, SpectralWindow};
use crate::signal::detrend::Detrend;
use crate::signal::extend::Boundary;
use crate::signal::sample::{SpectralFloat, SpectralSample};

/// Options of [`stft_dyn`].
#[derive(Debug, Clone)]
pub struct StftParams<F> {
    /// Sampling frequency.
    pub fs: F,
    /// Segment window. Defaults to a periodic Hann window.
    pub window: SpectralWindow<F>,
    /// Samples per segment. Defaults to 256.
    pub nperseg: usize,
    /// Overlap between segments. `None` picks `nperseg / 2`.
    pub noverlap: Option<usize>,
    /// FFT length. `None` picks `nperseg`.
    pub nfft: Option<usize>,
    /// Per-segment trend removal. Defaults to none.
    pub detrend: Detrend<F>,
    /// Return only non-negative frequencies for real input.
    pub return_onesided: bool,
    /// Extension at both ends, so the first sample sits at a segment centre.
    /// Defaults to zeros.
    pub boundary: Option<Boundary>,
    /// Zero-pad the end to a whole number of segments. Defaults to `true`.
    pub padded: bool,
    /// Sample axis.
    pub axis: isize,
    /// `Spectrum` scales by `1 / sum(win)`, `Density` by
    /// `1 / sqrt(fs * sum(win**2))`.
    pub scaling: Scaling,
}

impl<F> Default for StftParams<F>
where
    F: SpectralFloat,
{
    fn default() -> Self {
        Self {
            fs: F::one(),
            window: SpectralWindow::default(),
            nperseg: 256,
            noverlap: None,
            nfft: None,
            detrend: Detrend::None,
            return_onesided: true,
            boundary: Some(Boundary::Zeros),
            padded: true,
            axis: -1,
            scaling: Scaling::Spectrum,
        }
    }
}

/// Output of [`stft_dyn`].
#[derive(Debug, Clone, PartialEq)]
pub struct StftResult<F> {
    /// Sample frequencies.
    pub frequencies: Array1<F>,
    /// Segment times.
    pub times: Array1<F>,
    /// STFT of `x`: its batch shape, the frequency axis in place of the sample
    /// axis and a trailing time axis.
    pub zxx: ArrayD<Complex<F>>,
    /// Adjustments made along the way.
    pub warnings: Vec<SpectralWarning>,
}

/// Compute the Short Time Fourier Transform.
///
/// # Errors
/// Invalid segment parameters, an explicit window longer than the input,
/// or an `axis` out of range.
///
/// # Examples
/// ```
/// use sci_spectral::ndarray::Array1;
/// use sci_spectral::signal::spectral::{stft_dyn, StftParams};
///
/// let x = Array1::from_iter((0..1000).map(|i| (i as f64 * 0.3).sin()));
/// let out = stft_dyn(&x, &StftParams::default()).unwrap();
/// assert_eq!(out.zxx.shape(), &[129, 9]);
/// assert_eq!(out.times[1], 128.0);
/// ```
pub fn stft_dyn<T, S, D>(
    x: &ArrayBase<S, D>,
    params: &StftParams<T::Real>,
) -> Result<StftResult<T::Real>>
where
    T: SpectralSample,
    S: Data<Elem = T>,
    D: Dimension,
{
    let config = SpectralHelperConfig {
        fs: params.fs,
        window: params.window.clone(),
        nperseg: Some(params.nperseg),
        noverlap: params.noverlap,
        nfft: params.nfft,
        detrend: params.detrend.clone(),
        return_onesided: params.return_onesided,
        scaling: params.scaling,
        axis: params.axis,
        mode: SpectralMode::Stft,
        boundary: params.boundary,
        padded: params.padded,
    };
    let out = spectral_helper(x, &config)?;
    Ok(StftResult {
        frequencies: out.frequencies,
        times: out.times,
        zxx: out.result,
        warnings: out.warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::windows::WindowBuilderOwned;
    use approx::assert_abs_diff_eq;
    use core::f64::consts::PI;
    use ndarray::Array2;

    #[test]
    fn tone_amplitude_with_spectrum_scaling() {
        // Bin-centred tone of amplitude 2 through a boxcar window.
        let x = Array1::from_iter((0..512).map(|i| 2.0 * (2.0 * PI * 8.0 * i as f64 / 64.0).cos()));
        let params = StftParams {
            window: SpectralWindow::Builder(WindowBuilderOwned::Boxcar),
            nperseg: 64,
            noverlap: Some(0),
            boundary: None,
            padded: false,
            ..Default::default()
        };
        let out = stft_dyn(&x, &params).expect("stft");
        assert_eq!(out.zxx.shape(), &[33, 8]);
        for t in 0..8 {
            assert_abs_diff_eq!(out.zxx[[8, t]].norm(), 1.0, epsilon = 1e-12);
        }
        assert_abs_diff_eq!(out.times[0], 32.0, epsilon = 1e-12);
    }

    #[test]
    fn boundary_extension_centres_the_first_segment() {
        let x = Array1::from_iter((0..100).map(|i| (i as f64 * 0.2).sin()));
        let params = StftParams {
            fs: 10.0,
            nperseg: 20,
            boundary: Some(Boundary::Even),
            ..Default::default()
        };
        let out = stft_dyn(&x, &params).expect("stft");
        assert_abs_diff_eq!(out.times[0], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(out.times[1], 1.0, epsilon = 1e-12);
        // 100 + 2 * 10 samples, already a whole number of hops.
        assert_eq!(out.zxx.shape(), &[11, 11]);
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn batch_axes_are_kept() {
        let x = Array2::from_shape_fn((3, 300), |(i, j)| ((i + 1) as f64 * j as f64 * 0.05).sin());
        let params = StftParams {
            nperseg: 32,
            ..Default::default()
        };
        let out = stft_dyn(&x, &params).expect("stft");
        assert_eq!(out.zxx.shape()[..2], [3, 17]);
        assert_eq!(out.zxx.shape()[2], out.times.len());
    }

    #[test]
    fn batched_rows_match_single_rows() {
        // 250 samples extend to 314 and pad to 320 with nperseg 64.
        let x = Array2::from_shape_fn((3, 250), |(i, j)| ((i + 1) as f64 * j as f64 * 0.11).sin());
        let params = StftParams {
            nperseg: 64,
            ..Default::default()
        };
        let out = stft_dyn(&x, &params).expect("batched stft");
        assert_eq!(out.zxx.shape(), &[3, 33, 9]);
        for row in 0..3 {
            let single = stft_dyn(&x.row(row), &params).expect("row stft");
            assert_eq!(single.times, out.times);
            for (a, b) in out.zxx.index_axis(ndarray::Axis(0), row).iter().zip(single.zxx.iter()) {
                assert_abs_diff_eq!(a.re, b.re, epsilon = 1e-12);
                assert_abs_diff_eq!(a.im, b.im, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn short_input_clips_before_extending() {
        let x = Array1::from_iter((0..10).map(|i| i as f64));
        let params = StftParams {
            nperseg: 64,
            boundary: Some(Boundary::Odd),
            ..Default::default()
        };
        // nperseg is clipped to 10, so the odd extension by 5 fits.
        let out = stft_dyn(&x, &params).expect("clipped");
        assert_eq!(
            out.warnings,
            vec![SpectralWarning::NpersegClipped {
                requested: 64,
                input_len: 10
            }]
        );
        assert_eq!(out.zxx.shape(), &[6, 3]);

        let params = StftParams {
            window: SpectralWindow::Coefficients(vec![1.0; 10]),
            nperseg: 10,
            ..Default::default()
        };
        assert!(stft_dyn(&x.slice(ndarray::s![..6]), &params).is_err());
    }
}
