//! Boundary extensions of n-dimensional arrays along one axis.
//!
//! These pad a signal at both ends before it is cut into segments, so that
//! the first and last samples sit at a segment centre.

use core::ops::{Add, Sub};
use core::str::FromStr;

use ndarray::{
    Array, ArrayBase, ArrayView, Axis, Data, Dimension, RemoveAxis, SliceArg, SliceInfo,
    SliceInfoElem,
};
use num_traits::Zero;
use sci_spectral_core::{Error, Result};

use super::arraytools::{axis_slice_at, check_and_get_axis_dyn};

/// How a signal is extended past its ends.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Boundary {
    /// Mirror about the end samples, without repeating them.
    Even,
    /// Point-reflect about the end samples.
    Odd,
    /// Repeat the end samples.
    Constant,
    /// Pad with zeros.
    Zeros,
}

impl FromStr for Boundary {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "even" => Ok(Boundary::Even),
            "odd" => Ok(Boundary::Odd),
            "constant" => Ok(Boundary::Constant),
            "zeros" => Ok(Boundary::Zeros),
            _ => Err(Error::invalid_arg(
                "boundary",
                format!(
                    "Unknown boundary option '{s}', must be one of: \
                     ['even', 'odd', 'constant', 'zeros', None]"
                ),
            )),
        }
    }
}

impl Boundary {
    /// Extend `x` by `n` samples at each end of `axis` (default: last axis).
    ///
    /// `n < 1` returns an owned copy of `x`.
    ///
    /// # Errors
    /// * `axis` out of range.
    /// * Even/odd extension with `n > x.shape[axis] - 1`.
    /// * Constant extension of an empty axis.
    pub fn ext<T, S, D>(&self, x: &ArrayBase<S, D>, n: usize, axis: Option<isize>) -> Result<Array<T, D>>
    where
        T: Clone + Zero + Add<Output = T> + Sub<Output = T>,
        S: Data<Elem = T>,
        D: Dimension + RemoveAxis,
        SliceInfo<Vec<SliceInfoElem>, D, D>: SliceArg<D, OutDim = D>,
    {
        let axis = check_and_get_axis_dyn(axis, x)?;
        if n < 1 {
            return Ok(x.to_owned());
        }
        let axis_len = x.len_of(Axis(axis));
        let n_i = n as isize;

        match self {
            Boundary::Even | Boundary::Odd => {
                if n + 1 > axis_len {
                    return Err(Error::invalid_arg(
                        "n",
                        format!(
                            "The extension length n ({n}) is too big. \
                             It must not exceed x.shape[axis]-1, which is {}.",
                            axis_len.saturating_sub(1)
                        ),
                    ));
                }
                let left_ext = axis_slice_at(x, Some(n_i), Some(0), Some(-1), axis)?;
                let right_ext = axis_slice_at(x, Some(-2), Some(-2 - n_i), Some(-1), axis)?;
                if matches!(self, Boundary::Even) {
                    return concat_along(axis, &[left_ext, x.view(), right_ext]);
                }

                let left_end = axis_slice_at(x, Some(0), Some(1), None, axis)?;
                let right_end = axis_slice_at(x, Some(-1), None, None, axis)?;
                let ll = left_end.to_owned() + &left_end - &left_ext;
                let rr = right_end.to_owned() + &right_end - &right_ext;
                concat_along(axis, &[ll.view(), x.view(), rr.view()])
            }
            Boundary::Constant => {
                if axis_len == 0 {
                    return Err(Error::invalid_arg(
                        "x",
                        "Cannot extend an empty axis with its end values.",
                    ));
                }
                let mut dim = x.raw_dim();
                dim[axis] = n;
                let left_end = axis_slice_at(x, Some(0), Some(1), None, axis)?;
                let right_end = axis_slice_at(x, Some(-1), None, None, axis)?;
                let ll = left_end
                    .broadcast(dim.clone())
                    .ok_or_else(|| Error::invalid_arg("x", "Shape Error"))?;
                let rr = right_end
                    .broadcast(dim)
                    .ok_or_else(|| Error::invalid_arg("x", "Shape Error"))?;
                concat_along(axis, &[ll, x.view(), rr])
            }
            Boundary::Zeros => {
                let mut dim = x.raw_dim();
                dim[axis] = n;
                let zeros = Array::<T, D>::zeros(dim);
                concat_along(axis, &[zeros.view(), x.view(), zeros.view()])
            }
        }
    }
}

fn concat_along<T, D>(axis: usize, parts: &[ArrayView<'_, T, D>]) -> Result<Array<T, D>>
where
    T: Clone,
    D: RemoveAxis,
{
    ndarray::concatenate(Axis(axis), parts).map_err(|_| Error::invalid_arg("x", "Shape Error"))
}

/// Even extension at the boundaries of an array.
///
/// # Examples
/// ```
/// use ndarray::array;
/// use sci_spectral::signal::extend::even_ext;
///
/// let a = array![[1, 2, 3, 4, 5], [0, 1, 4, 9, 16]];
/// assert_eq!(
///     even_ext(&a, 2, None).unwrap(),
///     array![[3, 2, 1, 2, 3, 4, 5, 4, 3], [4, 1, 0, 1, 4, 9, 16, 9, 4]]
/// );
/// ```
pub fn even_ext<T, S, D>(x: &ArrayBase<S, D>, n: usize, axis: Option<isize>) -> Result<Array<T, D>>
where
    T: Clone + Zero + Add<Output = T> + Sub<Output = T>,
    S: Data<Elem = T>,
    D: Dimension + RemoveAxis,
    SliceInfo<Vec<SliceInfoElem>, D, D>: SliceArg<D, OutDim = D>,
{
    Boundary::Even.ext(x, n, axis)
}

/// Odd extension at the boundaries of an array.
///
/// # Examples
/// ```
/// use ndarray::array;
/// use sci_spectral::signal::extend::odd_ext;
///
/// let a = array![[1, 2, 3, 4, 5], [0, 1, 4, 9, 16]];
/// assert_eq!(
///     odd_ext(&a, 2, None).unwrap(),
///     array![[-1, 0, 1, 2, 3, 4, 5, 6, 7], [-4, -1, 0, 1, 4, 9, 16, 23, 28]]
/// );
/// ```
pub fn odd_ext<T, S, D>(x: &ArrayBase<S, D>, n: usize, axis: Option<isize>) -> Result<Array<T, D>>
where
    T: Clone + Zero + Add<Output = T> + Sub<Output = T>,
    S: Data<Elem = T>,
    D: Dimension + RemoveAxis,
    SliceInfo<Vec<SliceInfoElem>, D, D>: SliceArg<D, OutDim = D>,
{
    Boundary::Odd.ext(x, n, axis)
}

/// Constant extension at the boundaries of an array.
pub fn const_ext<T, S, D>(x: &ArrayBase<S, D>, n: usize, axis: Option<isize>) -> Result<Array<T, D>>
where
    T: Clone + Zero + Add<Output = T> + Sub<Output = T>,
    S: Data<Elem = T>,
    D: Dimension + RemoveAxis,
    SliceInfo<Vec<SliceInfoElem>, D, D>: SliceArg<D, OutDim = D>,
{
    Boundary::Constant.ext(x, n, axis)
}

/// Zero padding at the boundaries of an array.
pub fn zero_ext<T, S, D>(x: &ArrayBase<S, D>, n: usize, axis: Option<isize>) -> Result<Array<T, D>>
where
    T: Clone + Zero + Add<Output = T> + Sub<Output = T>,
    S: Data<Elem = T>,
    D: Dimension + RemoveAxis,
    SliceInfo<Vec<SliceInfoElem>, D, D>: SliceArg<D, OutDim = D>,
{
    Boundary::Zeros.ext(x, n, axis)
}
