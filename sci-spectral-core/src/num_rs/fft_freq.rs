use crate::{Error, Result};
use alloc::string::ToString;
use ndarray::Array1;
use num_traits::{Float, FromPrimitive};

fn sample_spacing_scale<F>(n: usize, d: F) -> Result<F>
where
    F: Float + FromPrimitive,
{
    if n == 0 {
        return Err(Error::InvalidArg {
            arg: "n".into(),
            reason: "window length must be positive.".into(),
        });
    }
    if !d.is_finite() || d == F::zero() {
        return Err(Error::InvalidArg {
            arg: "d".into(),
            reason: "sample spacing must be finite and non-zero.".into(),
        });
    }
    let n_f = F::from_usize(n).ok_or_else(|| Error::InvalidArg {
        arg: "n".into(),
        reason: n.to_string(),
    })?;
    Ok(F::one() / (n_f * d))
}

/// Best effort parallel behaviour with numpy's `fft.fftfreq`.
///
/// Returns the discrete Fourier transform sample frequencies, in cycles per
/// unit of the sample spacing, laid out the way an unshifted FFT emits them:
/// `[0, 1, ..., (n-1)/2, -(n/2), ..., -1] / (d*n)`.
///
/// # Parameters
/// * `n` : Window length.
/// * `d` : Sample spacing (inverse of the sampling rate).
///
/// # Errors
/// `n == 0`, or a zero / non-finite `d`.
///
/// # Examples
/// ```
/// use ndarray::array;
/// use sci_spectral_core::num_rs::fftfreq;
///
/// assert_eq!(fftfreq(4, 1.0).unwrap(), array![0., 0.25, -0.5, -0.25]);
/// assert_eq!(fftfreq(5, 1.0).unwrap(), array![0., 0.2, 0.4, -0.4, -0.2]);
/// ```
pub fn fftfreq<F>(n: usize, d: F) -> Result<Array1<F>>
where
    F: Float + FromPrimitive,
{
    let val = sample_spacing_scale(n, d)?;
    let positive = (n - 1) / 2 + 1;
    let freqs = (0..n)
        .map(|i| {
            let k = if i < positive {
                i as f64
            } else {
                i as f64 - n as f64
            };
            F::from_f64(k).unwrap_or_else(F::nan) * val
        })
        .collect::<Array1<F>>();
    Ok(freqs)
}

/// Best effort parallel behaviour with numpy's `fft.rfftfreq`.
///
/// Returns the `n / 2 + 1` non-negative sample frequencies of a real-input
/// transform of length `n`: `[0, 1, ..., n/2] / (d*n)`.
///
/// # Examples
/// ```
/// use ndarray::array;
/// use sci_spectral_core::num_rs::rfftfreq;
///
/// assert_eq!(rfftfreq(4, 1.0).unwrap(), array![0., 0.25, 0.5]);
/// assert_eq!(rfftfreq(5, 1.0).unwrap(), array![0., 0.2, 0.4]);
/// ```
pub fn rfftfreq<F>(n: usize, d: F) -> Result<Array1<F>>
where
    F: Float + FromPrimitive,
{
    let val = sample_spacing_scale(n, d)?;
    let freqs = (0..n / 2 + 1)
        .map(|k| F::from_usize(k).unwrap_or_else(F::nan) * val)
        .collect::<Array1<F>>();
    Ok(freqs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn fftfreq_scales_with_sampling_rate() {
        let fs = 1000.0f64;
        let f = fftfreq(8, 1.0 / fs).unwrap();
        let expected = [0., 125., 250., 375., -500., -375., -250., -125.];
        f.iter()
            .zip(expected.iter())
            .for_each(|(a, b)| assert_abs_diff_eq!(*a, *b, epsilon = 1e-9));
    }

    #[test]
    fn rfftfreq_ends_at_nyquist_for_even_lengths() {
        let f = rfftfreq(200, 1.0f32 / 1000.0).unwrap();
        assert_eq!(f.len(), 101);
        assert_abs_diff_eq!(f[100], 500.0, epsilon = 1e-3);
        assert_abs_diff_eq!(f[10], 50.0, epsilon = 1e-4);
    }

    #[test]
    fn single_point_transform_has_only_dc() {
        assert_eq!(fftfreq(1, 1.0f64).unwrap().to_vec(), [0.0]);
        assert_eq!(rfftfreq(1, 1.0f64).unwrap().to_vec(), [0.0]);
    }

    #[test]
    fn rejects_degenerate_arguments() {
        assert!(matches!(
            fftfreq::<f64>(0, 1.0),
            Err(Error::InvalidArg { .. })
        ));
        assert!(matches!(
            rfftfreq::<f64>(4, 0.0),
            Err(Error::InvalidArg { .. })
        ));
    }
}
