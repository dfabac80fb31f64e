//! Numeric element types accepted by the spectral estimators.

use core::fmt::{Debug, Display};
use core::iter::Sum;
use nalgebra::RealField;
use ndarray::{ArrayBase, ArrayD, Data, Dimension, IxDyn};
use num_traits::{Float, FloatConst, FromPrimitive, NumAssign};
use rustfft::num_complex::Complex;
use rustfft::FftNum;
use sci_spectral_core::{Error, Result};

/// Real working precision of an estimate, `f32` or `f64`.
///
/// Everything the pipeline needs from a float in one bound: transcendental
/// functions, the FFT planner and the SVD used by the linear detrender.
pub trait SpectralFloat:
    Float + FloatConst + FromPrimitive + FftNum + RealField + NumAssign + Default + Sum + Display
{
}

impl<T> SpectralFloat for T where
    T: Float
        + FloatConst
        + FromPrimitive
        + FftNum
        + RealField
        + NumAssign
        + Default
        + Sum
        + Display
{
}

/// A sample of an input signal: a real float or a complex number over one.
pub trait SpectralSample: Copy + Debug + Send + Sync + 'static {
    /// Precision family of the sample.
    type Real: SpectralFloat;

    /// Whether the sample type carries an imaginary part.
    const IS_COMPLEX: bool;

    /// Promote into the working complex type.
    fn to_complex(self) -> Complex<Self::Real>;

    /// Demote from the working complex type. Real samples keep the real part.
    fn from_complex(value: Complex<Self::Real>) -> Self;
}

macro_rules! impl_spectral_sample {
    ($float:ty) => {
        impl SpectralSample for $float {
            type Real = $float;
            const IS_COMPLEX: bool = false;

            #[inline]
            fn to_complex(self) -> Complex<$float> {
                Complex::new(self, 0.0)
            }

            #[inline]
            fn from_complex(value: Complex<$float>) -> Self {
                value.re
            }
        }

        impl SpectralSample for Complex<$float> {
            type Real = $float;
            const IS_COMPLEX: bool = true;

            #[inline]
            fn to_complex(self) -> Complex<$float> {
                self
            }

            #[inline]
            fn from_complex(value: Complex<$float>) -> Self {
                value
            }
        }
    };
}

impl_spectral_sample!(f32);
impl_spectral_sample!(f64);

/// Copy `x` into a standard-layout complex array whose last axis is `axis`.
///
/// Remaining axes keep their relative order, matching numpy's `moveaxis`.
pub(crate) fn working_lanes<T, S, D>(
    x: &ArrayBase<S, D>,
    axis: usize,
) -> Result<ArrayD<Complex<T::Real>>>
where
    T: SpectralSample,
    S: Data<Elem = T>,
    D: Dimension,
{
    let view = x.view().into_dyn();
    let ndim = view.ndim();
    if axis >= ndim {
        return Err(Error::invalid_arg("axis", "index out of range."));
    }
    let order = (0..ndim)
        .filter(|&ax| ax != axis)
        .chain(core::iter::once(axis))
        .collect::<Vec<_>>();
    let moved = view.permuted_axes(IxDyn(&order));
    let shape = moved.shape().to_vec();
    let data = moved.iter().map(|v| v.to_complex()).collect::<Vec<_>>();
    ArrayD::from_shape_vec(IxDyn(&shape), data)
        .map_err(|_| Error::invariant("working copy lost its shape"))
}
