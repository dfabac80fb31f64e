//! Spectral analysis analogous to the `scipy.signal` Welch family.
//!
//! [`welch_dyn`] and [`csd_dyn`] estimate power and cross spectral densities
//! by averaging modified periodograms of overlapping segments.
//! [`periodogram_dyn`], [`coherence_dyn`] and [`stft_dyn`] are built on the
//! same engine, [`spectral_helper`].

use core::fmt;
use core::str::FromStr;

use sci_spectral_core::{Error, Result};

use crate::signal::windows::WindowBuilderOwned;

mod average;
mod helper;
mod kernels;
mod segments;
mod stft;
mod welch;

pub use average::*;
pub use helper::*;
pub use kernels::*;
pub use segments::*;
pub use stft::*;
pub use welch::*;

/// Normalisation of a spectral estimate.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Scaling {
    /// Power spectral density, units of `V**2/Hz`.
    #[default]
    Density,
    /// Power spectrum, units of `V**2`.
    Spectrum,
}

impl FromStr for Scaling {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "density" => Ok(Scaling::Density),
            "spectrum" => Ok(Scaling::Spectrum),
            _ => Err(Error::invalid_arg(
                "scaling",
                format!("Unknown scaling: '{s}'"),
            )),
        }
    }
}

/// What the engine returns per segment.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum SpectralMode {
    /// Scaled (cross) periodograms.
    #[default]
    Psd,
    /// Scaled complex transforms, no conjugate product.
    Stft,
}

impl FromStr for SpectralMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "psd" => Ok(SpectralMode::Psd),
            "stft" => Ok(SpectralMode::Stft),
            _ => Err(Error::invalid_arg(
                "mode",
                format!("Unknown value for mode {s}, must be one of: {{'psd', 'stft'}}"),
            )),
        }
    }
}

/// Non-fatal adjustments made while estimating a spectrum.
///
/// Every result carries the warnings raised for it; each one is also logged
/// at `warn` level.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SpectralWarning {
    /// The requested segment length exceeded the input and was clipped.
    NpersegClipped {
        /// Requested segment length.
        requested: usize,
        /// Length of the input along the transform axis.
        input_len: usize,
    },
    /// A one-sided spectrum was requested for complex input; a two-sided
    /// spectrum was returned instead.
    OneSidedDowngraded,
}

impl fmt::Display for SpectralWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpectralWarning::NpersegClipped {
                requested,
                input_len,
            } => write!(
                f,
                "nperseg = {requested} is greater than input length  = {input_len}, \
                 using nperseg = {input_len}"
            ),
            SpectralWarning::OneSidedDowngraded => {
                f.write_str("Input data is complex, switching to return_onesided=False")
            }
        }
    }
}

impl SpectralWarning {
    pub(crate) fn raise(self, sink: &mut Vec<SpectralWarning>) {
        log::warn!("{self}");
        if !sink.contains(&self) {
            sink.push(self);
        }
    }
}

/// Window applied to every segment.
#[derive(Debug, Clone, PartialEq)]
pub enum SpectralWindow<F> {
    /// A named family, generated periodic at the segment length.
    Builder(WindowBuilderOwned<F>),
    /// Explicit coefficients; their length fixes the segment length.
    Coefficients(Vec<F>),
}

impl<F> Default for SpectralWindow<F> {
    fn default() -> Self {
        SpectralWindow::Builder(WindowBuilderOwned::Hann)
    }
}

impl<F> From<WindowBuilderOwned<F>> for SpectralWindow<F> {
    fn from(value: WindowBuilderOwned<F>) -> Self {
        SpectralWindow::Builder(value)
    }
}

impl<F> From<Vec<F>> for SpectralWindow<F> {
    fn from(value: Vec<F>) -> Self {
        SpectralWindow::Coefficients(value)
    }
}

impl<F> FromStr for SpectralWindow<F>
where
    F: num_traits::Float,
{
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.parse::<WindowBuilderOwned<F>>().map(SpectralWindow::Builder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_names_parse() {
        assert_eq!("spectrum".parse::<Scaling>().unwrap(), Scaling::Spectrum);
        assert_eq!("stft".parse::<SpectralMode>().unwrap(), SpectralMode::Stft);
        assert_eq!(
            "power".parse::<Scaling>().unwrap_err(),
            Error::invalid_arg("scaling", "Unknown scaling: 'power'")
        );
        assert_eq!(
            "magnitude".parse::<SpectralMode>().unwrap_err(),
            Error::invalid_arg(
                "mode",
                "Unknown value for mode magnitude, must be one of: {'psd', 'stft'}"
            )
        );
    }

    #[test]
    fn window_specs_parse_by_name() {
        assert_eq!(
            "hamming".parse::<SpectralWindow<f64>>().unwrap(),
            SpectralWindow::Builder(WindowBuilderOwned::Hamming)
        );
        assert_eq!(
            SpectralWindow::from(vec![1.0f32; 4]),
            SpectralWindow::Coefficients(vec![1.0; 4])
        );
    }

    #[test]
    fn warnings_are_recorded_once() {
        let mut sink = Vec::new();
        SpectralWarning::OneSidedDowngraded.raise(&mut sink);
        SpectralWarning::OneSidedDowngraded.raise(&mut sink);
        assert_eq!(sink, vec![SpectralWarning::OneSidedDowngraded]);
        assert_eq!(
            SpectralWarning::NpersegClipped {
                requested: 256,
                input_len: 100
            }
            .to_string(),
            "nperseg = 256 is greater than input length  = 100, using nperseg = 100"
        );
    }
}
