//! Functions for acting on an axis of an array.
//!
//! Designed for ndarrays; with numpy's nomenclature.

use ndarray::{
    ArrayBase, ArrayD, ArrayView, Data, Dimension, IxDyn, SliceArg, SliceInfo, SliceInfoElem,
};
use sci_spectral_core::{Error, Result};

/// Resolve a possibly negative `axis` against an array, defaulting to the last axis.
///
/// # Errors
/// `axis` is outside `-ndim <= axis < ndim`, or the array is zero dimensional.
#[inline]
pub(crate) fn check_and_get_axis_dyn<S, D>(axis: Option<isize>, x: &ArrayBase<S, D>) -> Result<usize>
where
    S: Data,
    D: Dimension,
{
    normalize_axis(axis.unwrap_or(-1), x.ndim())
}

/// [check_and_get_axis_dyn] for callers that only carry the dimensionality.
pub(crate) fn normalize_axis(axis: isize, ndim: usize) -> Result<usize> {
    let in_range = if axis < 0 {
        axis.unsigned_abs() <= ndim
    } else {
        axis.unsigned_abs() < ndim
    };
    if !in_range {
        return Err(Error::invalid_arg("axis", "index out of range."));
    }
    if axis >= 0 {
        Ok(axis.unsigned_abs())
    } else {
        ndim.checked_add_signed(axis)
            .ok_or_else(|| Error::invalid_arg("axis", "Invalid add to `axis` option"))
    }
}

/// Takes a slice along `axis` from `a`.
///
/// # Parameters
/// * `a`: Array being sliced from.
/// * `start`: `Option<isize>`. None defaults to 0.
/// * `end`: `Option<isize>`.
/// * `step`: `Option<isize>`. None default to 1.
/// * `axis`: `Option<isize>`. None defaults to -1.
///
/// # Errors
/// - Axis is out of bounds.
pub(crate) fn axis_slice<A, S, D>(
    a: &ArrayBase<S, D>,
    start: Option<isize>,
    end: Option<isize>,
    step: Option<isize>,
    axis: Option<isize>,
) -> Result<ArrayView<'_, A, D>>
where
    S: Data<Elem = A>,
    D: Dimension,
    SliceInfo<Vec<SliceInfoElem>, D, D>: SliceArg<D, OutDim = D>,
{
    let axis = check_and_get_axis_dyn(axis, a)?;
    axis_slice_at(a, start, end, step, axis)
}

/// Takes a slice along an already resolved `axis` from `a`.
///
/// Negative `start`/`end` count from the end of the axis, and a negative
/// `step` walks backwards from `start` (inclusive) to `end` (exclusive).
pub(crate) fn axis_slice_at<A, S, D>(
    a: &ArrayBase<S, D>,
    start: Option<isize>,
    end: Option<isize>,
    step: Option<isize>,
    axis: usize,
) -> Result<ArrayView<'_, A, D>>
where
    S: Data<Elem = A>,
    D: Dimension,
    SliceInfo<Vec<SliceInfoElem>, D, D>: SliceArg<D, OutDim = D>,
{
    let a_ndim = a.ndim();
    let axis_len = *a
        .shape()
        .get(axis)
        .ok_or_else(|| Error::invalid_arg("axis", "index out of range."))?
        as isize;
    let step = step.unwrap_or(1);
    if step == 0 {
        return Err(Error::invalid_arg("step", "step cannot be zero"));
    }

    let coerce = |idx: Option<isize>, def_pos: isize, def_neg: isize| -> isize {
        match idx {
            Some(i) if i.is_negative() => (axis_len + i).max(-1),
            Some(i) => i.min(axis_len),
            None if step.is_negative() => def_neg,
            None => def_pos,
        }
    };
    let start = coerce(start, 0, axis_len - 1);
    let end = coerce(end, axis_len, -1);
    let (start, end) = if step.is_negative() {
        ((end + 1).max(0), Some((start + 1).max(0)))
    } else {
        (start.max(0), Some(end.max(start.max(0))))
    };

    let sl = SliceInfo::<_, D, D>::try_from({
        let mut tmp = vec![SliceInfoElem::from(..); a_ndim];
        tmp[axis] = SliceInfoElem::Slice { start, end, step };
        tmp
    })
    .map_err(|_| Error::invalid_arg("slice", "Invalid slice parameters."))?;

    Ok(a.slice(&sl))
}

/// Broadcast two shapes together with numpy's trailing-dimension rules.
///
/// # Errors
/// A pair of aligned dimensions differs and neither is 1.
pub(crate) fn broadcast_shapes(a: &[usize], b: &[usize]) -> Result<Vec<usize>> {
    let ndim = a.len().max(b.len());
    let dim_at = |shape: &[usize], i: usize| {
        let offset = ndim - shape.len();
        if i < offset {
            1
        } else {
            shape[i - offset]
        }
    };
    (0..ndim)
        .map(|i| match (dim_at(a, i), dim_at(b, i)) {
            (p, q) if p == q => Ok(p),
            (1, q) => Ok(q),
            (p, 1) => Ok(p),
            _ => Err(Error::invalid_arg(
                "x",
                "x and y cannot be broadcast together.",
            )),
        })
        .collect()
}

/// Move axis `from` of `a` to position `to`, keeping the other axes in order.
pub(crate) fn move_axis<A>(a: ArrayD<A>, from: usize, to: usize) -> ArrayD<A> {
    let ndim = a.ndim();
    if from == to || from >= ndim || to >= ndim {
        return a;
    }
    let mut order = (0..ndim).filter(|&ax| ax != from).collect::<Vec<_>>();
    order.insert(to, from);
    a.permuted_axes(IxDyn(&order))
}

#[cfg(test)]
mod test {
    use super::*;
    use ndarray::{array, Array, ArrayD, IxDyn};

    /// Tests on IxN arrays.
    #[test]
    fn axis_slice_doc() {
        let a = array![[1, 2, 3], [4, 5, 6], [7, 8, 9]];

        assert_eq!(
            axis_slice(&a, Some(0), Some(1), Some(1), Some(1)).unwrap(),
            array![[1], [4], [7]]
        );
        assert_eq!(
            axis_slice(&a, Some(0), Some(2), Some(1), Some(0)).unwrap(),
            array![[1, 2, 3], [4, 5, 6]]
        );
    }

    #[test]
    fn axis_slice_neg_step_mirrors_edges() {
        let a = array![[1, 2, 3, 4, 5], [0, 1, 4, 9, 16]];
        assert_eq!(
            axis_slice(&a, Some(2), Some(0), Some(-1), None).unwrap(),
            array![[3, 2], [4, 1]]
        );
        assert_eq!(
            axis_slice(&a, Some(-2), Some(-4), Some(-1), None).unwrap(),
            array![[4, 3], [9, 4]]
        );
    }

    #[test]
    fn axis_slice_neg_indices_past_start() {
        let a = array![1, 2, 3, 4];
        assert_eq!(
            axis_slice(&a, Some(-2), Some(-5), Some(-1), None).unwrap(),
            array![3, 2, 1]
        );
    }

    #[test]
    fn axis_slice_dyn() {
        let a: Array<i64, IxDyn> =
            ArrayD::from_shape_vec(IxDyn(&[2, 3]), vec![5, 6, 7, 1, 2, 3]).unwrap();
        assert_eq!(
            axis_slice(&a, Some(0), Some(1), Some(1), Some(1))
                .unwrap()
                .into_dimensionality()
                .unwrap(),
            array![[5], [1]]
        );
    }

    #[test]
    fn axis_out_of_range_is_rejected() {
        let a = array![[1.0, 2.0]];
        assert!(check_and_get_axis_dyn(Some(2), &a).is_err());
        assert!(check_and_get_axis_dyn(Some(-3), &a).is_err());
        assert_eq!(check_and_get_axis_dyn(Some(-2), &a).unwrap(), 0);
        assert_eq!(check_and_get_axis_dyn(None, &a).unwrap(), 1);
    }

    #[test]
    fn broadcast_follows_trailing_rules() {
        assert_eq!(broadcast_shapes(&[2, 1], &[3]).unwrap(), vec![2, 3]);
        assert_eq!(broadcast_shapes(&[], &[4, 5]).unwrap(), vec![4, 5]);
        assert_eq!(broadcast_shapes(&[2, 3], &[2, 3]).unwrap(), vec![2, 3]);
        assert!(broadcast_shapes(&[2], &[3]).is_err());
    }

    #[test]
    fn move_axis_inserts_at_target() {
        let a = ArrayD::<f32>::zeros(IxDyn(&[2, 3, 4]));
        assert_eq!(move_axis(a.clone(), 2, 0).shape(), &[4, 2, 3]);
        assert_eq!(move_axis(a.clone(), 0, 2).shape(), &[3, 4, 2]);
        assert_eq!(move_axis(a, 1, 1).shape(), &[2, 3, 4]);
    }
}
