//! Trait-first window generation kernels.

use core::str::FromStr;

use crate::kernel::{ConfigError, ExecInvariantViolation, KernelLifecycle, Write1D};
use crate::signal::traits::WindowGenerate;
use num_traits::{Float, FloatConst};
use sci_spectral_core::{Error, Result};

use super::{get_window, GetWindow, GetWindowBuilder, Window};

/// Owned window specification suitable for kernel and estimator configs.
#[derive(Debug, Clone, PartialEq)]
pub enum WindowBuilderOwned<F> {
    /// Boxcar window.
    Boxcar,
    /// Hann window.
    Hann,
    /// Hamming window.
    Hamming,
    /// General cosine window.
    GeneralCosine {
        /// Coefficients for weighted cosine terms.
        weights: Vec<F>,
    },
    /// General hamming window.
    GeneralHamming {
        /// Alpha coefficient.
        coefficient: F,
    },
}

impl<F> Default for WindowBuilderOwned<F> {
    fn default() -> Self {
        WindowBuilderOwned::Hann
    }
}

impl<F> WindowBuilderOwned<F>
where
    F: Float,
{
    fn as_builder(&self) -> GetWindowBuilder<'_, F> {
        match self {
            WindowBuilderOwned::Boxcar => GetWindowBuilder::Boxcar,
            WindowBuilderOwned::Hann => GetWindowBuilder::Hann,
            WindowBuilderOwned::Hamming => GetWindowBuilder::Hamming,
            WindowBuilderOwned::GeneralCosine { weights } => GetWindowBuilder::GeneralCosine {
                weights: weights.as_slice(),
            },
            WindowBuilderOwned::GeneralHamming { coefficient } => {
                GetWindowBuilder::GeneralHamming {
                    coefficient: *coefficient,
                }
            }
        }
    }

    /// Build a concrete [`Window`] with the given length and symmetry mode.
    pub fn build_window(&self, nx: usize, fftbins: Option<bool>) -> Window<F> {
        get_window(self.as_builder(), nx, fftbins)
    }

    /// Resolve a window by name, with parameters for the parameterised families.
    ///
    /// Accepted names: `boxcar` (`box`, `ones`, `rect`, `rectangular`),
    /// `hann` (`hanning`, `han`), `hamming` (`hamm`, `ham`),
    /// `general_hamming` (one parameter) and `general_cosine` (its weights).
    ///
    /// # Errors
    /// Unknown names, or a parameterised family given no parameters.
    pub fn from_name(name: &str, params: &[F]) -> Result<Self> {
        match name {
            "boxcar" | "box" | "ones" | "rect" | "rectangular" => Ok(WindowBuilderOwned::Boxcar),
            "hann" | "hanning" | "han" => Ok(WindowBuilderOwned::Hann),
            "hamming" | "hamm" | "ham" => Ok(WindowBuilderOwned::Hamming),
            "general_hamming" | "general hamming" => match params.first() {
                Some(&coefficient) => Ok(WindowBuilderOwned::GeneralHamming { coefficient }),
                None => Err(needs_params(name)),
            },
            "general_cosine" | "general cosine" => {
                if params.is_empty() {
                    Err(needs_params(name))
                } else {
                    Ok(WindowBuilderOwned::GeneralCosine {
                        weights: params.to_vec(),
                    })
                }
            }
            _ => Err(Error::invalid_arg("window", "Unknown window type.")),
        }
    }

    /// A bare numeric window spec selects the generalized Hamming family with
    /// `coefficient` as its alpha.
    ///
    /// SciPy's `get_window` reads a bare number as a Kaiser beta instead.
    /// There is no Kaiser window here, and a Hann fallback that discards the
    /// number is not taken either: ask for [`WindowBuilderOwned::Hann`]
    /// explicitly to get that window.
    pub fn from_param(coefficient: F) -> Self {
        WindowBuilderOwned::GeneralHamming { coefficient }
    }
}

fn needs_params(name: &str) -> Error {
    Error::invalid_arg(
        "window",
        format!("The '{name}' window needs one or more parameters -- pass a tuple."),
    )
}

impl<F> FromStr for WindowBuilderOwned<F>
where
    F: Float,
{
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        WindowBuilderOwned::from_name(s, &[])
    }
}

/// Constructor config for [`WindowKernel`].
#[derive(Debug, Clone, PartialEq)]
pub struct WindowConfig<F> {
    /// Window family and parameters.
    pub builder: WindowBuilderOwned<F>,
    /// Output length.
    pub nx: usize,
    /// FFT-bin mode (`Some(true)` periodic, `Some(false)` symmetric).
    pub fftbins: Option<bool>,
}

/// Trait-first window generation kernel.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowKernel<F> {
    builder: WindowBuilderOwned<F>,
    nx: usize,
    fftbins: Option<bool>,
}

impl<F> KernelLifecycle for WindowKernel<F>
where
    F: Float,
{
    type Config = WindowConfig<F>;

    fn try_new(config: Self::Config) -> core::result::Result<Self, ConfigError> {
        if config.nx == 0 {
            return Err(ConfigError::InvalidArgument {
                arg: "nx",
                reason: "window length must be positive",
            });
        }
        if matches!(
            &config.builder,
            WindowBuilderOwned::GeneralCosine { weights } if weights.is_empty()
        ) {
            return Err(ConfigError::EmptyInput { arg: "weights" });
        }

        Ok(Self {
            builder: config.builder,
            nx: config.nx,
            fftbins: config.fftbins,
        })
    }
}

impl<F> WindowGenerate<F> for WindowKernel<F>
where
    F: Float + FloatConst,
{
    fn run_into<O>(&self, out: &mut O) -> core::result::Result<(), ExecInvariantViolation>
    where
        O: Write1D<F> + ?Sized,
    {
        let generated = self.run_alloc()?;
        let out_slice = out
            .write_slice_mut()
            .map_err(ExecInvariantViolation::from)?;
        if out_slice.len() != generated.len() {
            return Err(ExecInvariantViolation::LengthMismatch {
                arg: "out",
                expected: generated.len(),
                got: out_slice.len(),
            });
        }
        out_slice.copy_from_slice(&generated);
        Ok(())
    }

    fn run_alloc(&self) -> core::result::Result<Vec<F>, ExecInvariantViolation> {
        let window = self.builder.build_window(self.nx, self.fftbins);
        Ok(window.get_window())
    }
}
