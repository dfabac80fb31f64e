//! Trait-first kernel wrappers for the spectral estimators.

use crate::kernel::{ConfigError, ExecInvariantViolation, KernelLifecycle, Read1D, Write1D};
use crate::signal::sample::{SpectralFloat, SpectralSample};
use crate::signal::traits::{Coherence1D, Csd1D, Periodogram1D, Spectrum, WelchPsd1D};
use crate::signal::windows::WindowBuilderOwned;
use ndarray::{ArrayD, ArrayView1};
use num_traits::Float;
use rustfft::num_complex::Complex;

use super::welch::{coherence_dyn, csd_dyn, periodogram_dyn, welch_dyn};
use super::{PeriodogramParams, SpectralParams, SpectralWindow};

fn validate_fs<F: SpectralFloat>(fs: F) -> Result<(), ConfigError> {
    if !(Float::is_finite(fs) && fs > F::zero()) {
        return Err(ConfigError::InvalidArgument {
            arg: "fs",
            reason: "fs must be finite and positive",
        });
    }
    Ok(())
}

fn validate_axis(axis: isize) -> Result<(), ConfigError> {
    if axis != -1 && axis != 0 {
        return Err(ConfigError::InvalidArgument {
            arg: "axis",
            reason: "1D kernels operate on axis -1 or 0",
        });
    }
    Ok(())
}

/// Segment length implied by the window and `nperseg`, if known before the
/// input is seen.
fn validate_window<F>(
    window: &SpectralWindow<F>,
    nperseg: Option<usize>,
) -> Result<Option<usize>, ConfigError> {
    if nperseg == Some(0) {
        return Err(ConfigError::InvalidArgument {
            arg: "nperseg",
            reason: "nperseg must be a positive integer",
        });
    }
    match window {
        SpectralWindow::Coefficients(win) if win.is_empty() => {
            Err(ConfigError::EmptyInput { arg: "window" })
        }
        SpectralWindow::Coefficients(win) => match nperseg {
            Some(n) if n != win.len() => Err(ConfigError::InvalidArgument {
                arg: "nperseg",
                reason: "value specified for nperseg is different from length of window",
            }),
            _ => Ok(Some(win.len())),
        },
        SpectralWindow::Builder(WindowBuilderOwned::GeneralCosine { weights })
            if weights.is_empty() =>
        {
            Err(ConfigError::EmptyInput { arg: "weights" })
        }
        SpectralWindow::Builder(_) => Ok(nperseg),
    }
}

fn validate_params<F: SpectralFloat>(params: &SpectralParams<F>) -> Result<(), ConfigError> {
    validate_fs(params.fs)?;
    validate_axis(params.axis)?;
    if let Some(nperseg) = validate_window(&params.window, params.nperseg)? {
        if params.noverlap.is_some_and(|noverlap| noverlap >= nperseg) {
            return Err(ConfigError::InvalidArgument {
                arg: "noverlap",
                reason: "noverlap must be less than nperseg.",
            });
        }
        if params.nfft.is_some_and(|nfft| nfft < nperseg) {
            return Err(ConfigError::InvalidArgument {
                arg: "nfft",
                reason: "nfft must be greater than or equal to nperseg.",
            });
        }
    }
    Ok(())
}

fn non_empty<'a, F, I>(input: &'a I, reason: &'static str) -> Result<&'a [F], ExecInvariantViolation>
where
    I: Read1D<F> + ?Sized,
{
    let input = input.read_slice().map_err(ExecInvariantViolation::from)?;
    if input.is_empty() {
        return Err(ExecInvariantViolation::InvalidState { reason });
    }
    Ok(input)
}

fn flatten<A: Copy>(values: &ArrayD<A>) -> Vec<A> {
    values.iter().copied().collect()
}

/// Copy a freshly computed spectrum into caller buffers of matching length.
fn write_spectrum<F, V, OF, OV>(
    (freqs, values): Spectrum<F, V>,
    freqs_out: &mut OF,
    values_out: &mut OV,
    values_arg: &'static str,
) -> Result<(), ExecInvariantViolation>
where
    F: Copy,
    V: Copy,
    OF: Write1D<F> + ?Sized,
    OV: Write1D<V> + ?Sized,
{
    let freqs_slice = freqs_out
        .write_slice_mut()
        .map_err(ExecInvariantViolation::from)?;
    if freqs_slice.len() != freqs.len() {
        return Err(ExecInvariantViolation::LengthMismatch {
            arg: "freqs",
            expected: freqs.len(),
            got: freqs_slice.len(),
        });
    }
    freqs_slice.copy_from_slice(&freqs);

    let values_slice = values_out
        .write_slice_mut()
        .map_err(ExecInvariantViolation::from)?;
    if values_slice.len() != values.len() {
        return Err(ExecInvariantViolation::LengthMismatch {
            arg: values_arg,
            expected: values.len(),
            got: values_slice.len(),
        });
    }
    values_slice.copy_from_slice(&values);
    Ok(())
}

/// Stateless 1D Welch PSD kernel.
#[derive(Debug, Clone)]
pub struct WelchKernel<F> {
    params: SpectralParams<F>,
}

impl<F> KernelLifecycle for WelchKernel<F>
where
    F: SpectralFloat,
{
    type Config = SpectralParams<F>;

    fn try_new(config: Self::Config) -> Result<Self, ConfigError> {
        validate_params(&config)?;
        Ok(Self { params: config })
    }
}

impl<F> WelchPsd1D<F> for WelchKernel<F>
where
    F: SpectralFloat + SpectralSample<Real = F>,
{
    fn run_into<I, OF, OP>(
        &self,
        input: &I,
        freqs: &mut OF,
        pxx: &mut OP,
    ) -> Result<(), ExecInvariantViolation>
    where
        I: Read1D<F> + ?Sized,
        OF: Write1D<F> + ?Sized,
        OP: Write1D<F> + ?Sized,
    {
        write_spectrum(self.run_alloc(input)?, freqs, pxx, "pxx")
    }

    fn run_alloc<I>(&self, input: &I) -> Result<Spectrum<F>, ExecInvariantViolation>
    where
        I: Read1D<F> + ?Sized,
    {
        let input = non_empty(input, "welch input must be non-empty")?;
        let out = welch_dyn(&ArrayView1::from(input), &self.params)?;
        Ok((out.frequencies.to_vec(), flatten(&out.pxx)))
    }
}

/// Stateless 1D cross spectral density kernel.
#[derive(Debug, Clone)]
pub struct CsdKernel<F> {
    params: SpectralParams<F>,
}

impl<F> KernelLifecycle for CsdKernel<F>
where
    F: SpectralFloat,
{
    type Config = SpectralParams<F>;

    fn try_new(config: Self::Config) -> Result<Self, ConfigError> {
        validate_params(&config)?;
        Ok(Self { params: config })
    }
}

impl<F> Csd1D<F> for CsdKernel<F>
where
    F: SpectralFloat + SpectralSample<Real = F>,
{
    fn run_into<I1, I2, OF, OP>(
        &self,
        x: &I1,
        y: &I2,
        freqs: &mut OF,
        pxy: &mut OP,
    ) -> Result<(), ExecInvariantViolation>
    where
        I1: Read1D<F> + ?Sized,
        I2: Read1D<F> + ?Sized,
        OF: Write1D<F> + ?Sized,
        OP: Write1D<Complex<F>> + ?Sized,
    {
        write_spectrum(self.run_alloc(x, y)?, freqs, pxy, "pxy")
    }

    fn run_alloc<I1, I2>(
        &self,
        x: &I1,
        y: &I2,
    ) -> Result<Spectrum<F, Complex<F>>, ExecInvariantViolation>
    where
        I1: Read1D<F> + ?Sized,
        I2: Read1D<F> + ?Sized,
    {
        let x = non_empty(x, "csd x must be non-empty")?;
        let y = non_empty(y, "csd y must be non-empty")?;
        let out = csd_dyn(&ArrayView1::from(x), &ArrayView1::from(y), &self.params)?;
        Ok((out.frequencies.to_vec(), flatten(&out.pxy)))
    }
}

/// Stateless 1D magnitude squared coherence kernel.
#[derive(Debug, Clone)]
pub struct CoherenceKernel<F> {
    params: SpectralParams<F>,
}

impl<F> KernelLifecycle for CoherenceKernel<F>
where
    F: SpectralFloat,
{
    type Config = SpectralParams<F>;

    fn try_new(config: Self::Config) -> Result<Self, ConfigError> {
        validate_params(&config)?;
        Ok(Self { params: config })
    }
}

impl<F> Coherence1D<F> for CoherenceKernel<F>
where
    F: SpectralFloat + SpectralSample<Real = F>,
{
    fn run_into<I1, I2, OF, OC>(
        &self,
        x: &I1,
        y: &I2,
        freqs: &mut OF,
        coherence: &mut OC,
    ) -> Result<(), ExecInvariantViolation>
    where
        I1: Read1D<F> + ?Sized,
        I2: Read1D<F> + ?Sized,
        OF: Write1D<F> + ?Sized,
        OC: Write1D<F> + ?Sized,
    {
        write_spectrum(self.run_alloc(x, y)?, freqs, coherence, "coherence")
    }

    fn run_alloc<I1, I2>(&self, x: &I1, y: &I2) -> Result<Spectrum<F>, ExecInvariantViolation>
    where
        I1: Read1D<F> + ?Sized,
        I2: Read1D<F> + ?Sized,
    {
        let x = non_empty(x, "coherence x must be non-empty")?;
        let y = non_empty(y, "coherence y must be non-empty")?;
        let out = coherence_dyn(&ArrayView1::from(x), &ArrayView1::from(y), &self.params)?;
        Ok((out.frequencies.to_vec(), flatten(&out.cxy)))
    }
}

/// Stateless 1D periodogram kernel.
#[derive(Debug, Clone)]
pub struct PeriodogramKernel<F> {
    params: PeriodogramParams<F>,
}

impl<F> KernelLifecycle for PeriodogramKernel<F>
where
    F: SpectralFloat,
{
    type Config = PeriodogramParams<F>;

    fn try_new(config: Self::Config) -> Result<Self, ConfigError> {
        validate_fs(config.fs)?;
        validate_axis(config.axis)?;
        validate_window(&config.window, None)?;
        if config.nfft == Some(0) {
            return Err(ConfigError::InvalidArgument {
                arg: "nfft",
                reason: "nfft must be a positive integer",
            });
        }
        Ok(Self { params: config })
    }
}

impl<F> Periodogram1D<F> for PeriodogramKernel<F>
where
    F: SpectralFloat + SpectralSample<Real = F>,
{
    fn run_into<I, OF, OP>(
        &self,
        input: &I,
        freqs: &mut OF,
        pxx: &mut OP,
    ) -> Result<(), ExecInvariantViolation>
    where
        I: Read1D<F> + ?Sized,
        OF: Write1D<F> + ?Sized,
        OP: Write1D<F> + ?Sized,
    {
        write_spectrum(self.run_alloc(input)?, freqs, pxx, "pxx")
    }

    fn run_alloc<I>(&self, input: &I) -> Result<Spectrum<F>, ExecInvariantViolation>
    where
        I: Read1D<F> + ?Sized,
    {
        let input = non_empty(input, "periodogram input must be non-empty")?;
        let out = periodogram_dyn(&ArrayView1::from(input), &self.params)?;
        Ok((out.frequencies.to_vec(), flatten(&out.pxx)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::spectral::Average;
    use approx::assert_abs_diff_eq;
    use sci_spectral_core::Error;

    fn signal(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| (i as f64 * 0.21).sin() + 0.3 * (i as f64 * 1.7).cos())
            .collect()
    }

    #[test]
    fn welch_kernel_rejects_bad_config() {
        let cases = [
            SpectralParams {
                fs: 0.0,
                ..Default::default()
            },
            SpectralParams {
                nperseg: Some(0),
                ..Default::default()
            },
            SpectralParams {
                nperseg: Some(16),
                noverlap: Some(16),
                ..Default::default()
            },
            SpectralParams {
                nperseg: Some(16),
                nfft: Some(8),
                ..Default::default()
            },
            SpectralParams {
                window: SpectralWindow::Coefficients(vec![]),
                ..Default::default()
            },
            SpectralParams {
                window: SpectralWindow::Coefficients(vec![1.0; 8]),
                nperseg: Some(16),
                ..Default::default()
            },
            SpectralParams {
                axis: 1,
                ..Default::default()
            },
        ];
        for params in cases {
            assert!(WelchKernel::<f64>::try_new(params).is_err());
        }
    }

    #[test]
    fn welch_kernel_matches_dyn_api() {
        let x = signal(500);
        let params = SpectralParams {
            fs: 4.0,
            nperseg: Some(64),
            average: Average::Median,
            ..Default::default()
        };
        let kernel = WelchKernel::try_new(params.clone()).expect("kernel");
        let (f, pxx) = kernel.run_alloc(&x).expect("run");
        let expected = welch_dyn(&ArrayView1::from(&x[..]), &params).expect("welch");
        assert_eq!(f, expected.frequencies.to_vec());
        assert_eq!(pxx, expected.pxx.iter().copied().collect::<Vec<_>>());

        let mut f_out = vec![0.0; 33];
        let mut p_out = vec![0.0; 33];
        kernel.run_into(&x, &mut f_out, &mut p_out).expect("run_into");
        assert_eq!(p_out, pxx);
    }

    #[test]
    fn welch_kernel_reports_output_mismatch() {
        let x = signal(128);
        let kernel = WelchKernel::try_new(SpectralParams {
            nperseg: Some(32),
            ..Default::default()
        })
        .expect("kernel");
        let mut f_out = vec![0.0; 17];
        let mut p_out = vec![0.0; 16];
        let err = kernel
            .run_into(&x, &mut f_out, &mut p_out)
            .expect_err("short pxx");
        assert!(matches!(
            err,
            ExecInvariantViolation::LengthMismatch {
                arg: "pxx",
                expected: 17,
                got: 16
            }
        ));
    }

    #[test]
    fn empty_input_is_invalid_state() {
        let kernel = WelchKernel::<f64>::try_new(SpectralParams::default()).expect("kernel");
        let err = kernel.run_alloc(&Vec::<f64>::new()).expect_err("empty");
        assert!(matches!(err, ExecInvariantViolation::InvalidState { .. }));
    }

    #[test]
    fn runtime_rejections_are_wrapped() {
        let kernel = WelchKernel::try_new(SpectralParams {
            window: SpectralWindow::Coefficients(vec![1.0f64; 64]),
            ..Default::default()
        })
        .expect("kernel");
        let err = kernel.run_alloc(&signal(32)).expect_err("window too long");
        assert_eq!(
            err,
            ExecInvariantViolation::Rejected(Error::invalid_arg(
                "window",
                "window is longer than input signal"
            ))
        );
    }

    #[test]
    fn csd_kernel_writes_complex_spectrum() {
        let x = signal(256);
        let y = x.iter().rev().copied().collect::<Vec<_>>();
        let kernel = CsdKernel::try_new(SpectralParams {
            nperseg: Some(32),
            ..Default::default()
        })
        .expect("kernel");
        let mut f_out = vec![0.0; 17];
        let mut p_out = vec![Complex::new(0.0, 0.0); 17];
        kernel
            .run_into(&x, &y, &mut f_out, &mut p_out)
            .expect("run_into");
        assert_abs_diff_eq!(f_out[16], 0.5, epsilon = 1e-12);
        assert!(p_out.iter().any(|v| v.im != 0.0));
    }

    #[test]
    fn coherence_kernel_is_bounded() {
        let x = signal(512);
        let y = x
            .iter()
            .enumerate()
            .map(|(i, v)| v + (i as f64 * 2.9).sin())
            .collect::<Vec<_>>();
        let kernel = CoherenceKernel::try_new(SpectralParams {
            nperseg: Some(64),
            ..Default::default()
        })
        .expect("kernel");
        let (f, cxy) = kernel.run_alloc(&x, &y).expect("coherence");
        assert_eq!(f.len(), cxy.len());
        assert!(cxy.iter().skip(1).all(|&c| (0.0..=1.0 + 1e-12).contains(&c)));
    }

    #[test]
    fn periodogram_kernel_validates_and_runs() {
        assert!(PeriodogramKernel::<f64>::try_new(PeriodogramParams {
            nfft: Some(0),
            ..Default::default()
        })
        .is_err());
        let kernel = PeriodogramKernel::try_new(PeriodogramParams {
            fs: 8.0,
            ..Default::default()
        })
        .expect("kernel");
        let (f, pxx) = kernel.run_alloc(&signal(64)).expect("periodogram");
        assert_eq!(f.len(), 33);
        assert_eq!(pxx.len(), 33);
        assert_abs_diff_eq!(f[32], 4.0, epsilon = 1e-12);
    }
}
