use ndarray::{ArrayD, IxDyn};
use rustfft::num_complex::Complex;
use sci_spectral_core::{Error, Result};

use crate::signal::sample::SpectralFloat;

/// Number of whole segments of `nperseg` samples, `nperseg - noverlap` apart,
/// that fit in `len` samples. Trailing samples that do not fill a segment
/// are dropped.
///
/// # Examples
/// ```
/// use sci_spectral::signal::spectral::segment_count;
///
/// assert_eq!(segment_count(1000, 200, 100), 9);
/// assert_eq!(segment_count(10, 1, 0), 10);
/// ```
pub fn segment_count(len: usize, nperseg: usize, noverlap: usize) -> usize {
    if nperseg == 1 && noverlap == 0 {
        return len;
    }
    match nperseg.checked_sub(noverlap) {
        Some(step) if step > 0 => len.saturating_sub(noverlap) / step,
        _ => 0,
    }
}

/// Overlapping, read-only segments of one lane, addressed by index
/// arithmetic over the borrowed samples.
#[derive(Debug, Clone, Copy)]
pub struct SegmentView<'a, T> {
    base: &'a [T],
    step: usize,
    nperseg: usize,
    count: usize,
}

impl<'a, T> SegmentView<'a, T> {
    /// Segment `base` into `nperseg`-sample windows overlapping by `noverlap`.
    ///
    /// # Errors
    /// `nperseg == 0` or `noverlap >= nperseg`.
    pub fn new(base: &'a [T], nperseg: usize, noverlap: usize) -> Result<Self> {
        if nperseg == 0 {
            return Err(Error::invalid_arg(
                "nperseg",
                "nperseg must be a positive integer",
            ));
        }
        if noverlap >= nperseg {
            return Err(Error::invalid_arg(
                "noverlap",
                "noverlap must be less than nperseg.",
            ));
        }
        Ok(Self {
            base,
            step: nperseg - noverlap,
            nperseg,
            count: segment_count(base.len(), nperseg, noverlap),
        })
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether no full segment fits.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Distance between consecutive segment starts.
    pub fn step(&self) -> usize {
        self.step
    }

    /// Segment `k`, if it exists.
    pub fn get(&self, k: usize) -> Option<&'a [T]> {
        if k >= self.count {
            return None;
        }
        let start = k * self.step;
        self.base.get(start..start + self.nperseg)
    }

    /// Iterate over the segments in order.
    pub fn iter(&self) -> impl Iterator<Item = &'a [T]> + '_ {
        (0..self.count).filter_map(move |k| self.get(k))
    }
}

/// Copy the segments of every lane of `x` (last axis) into a
/// `(batch..., nseg, nperseg)` stack that detrending may overwrite.
pub(crate) fn stack_segments<F>(
    x: &ArrayD<Complex<F>>,
    nperseg: usize,
    noverlap: usize,
) -> Result<ArrayD<Complex<F>>>
where
    F: SpectralFloat,
{
    let (batch, len) = match x.shape().split_last() {
        Some((&len, batch)) => (batch.to_vec(), len),
        None => return Err(Error::invariant("cannot segment a scalar")),
    };
    // Extended or padded lanes are concatenated and need not be row-major.
    let x = x.as_standard_layout();
    let samples = x
        .as_slice()
        .ok_or_else(|| Error::invariant("segment source is not contiguous"))?;
    let nseg = segment_count(len, nperseg, noverlap);

    let mut data = Vec::with_capacity(samples.len() / len.max(1) * nseg * nperseg);
    if len > 0 {
        for lane in samples.chunks_exact(len) {
            let view = SegmentView::new(lane, nperseg, noverlap)?;
            view.iter().for_each(|seg| data.extend_from_slice(seg));
        }
    }

    let mut shape = batch;
    shape.extend_from_slice(&[nseg, nperseg]);
    ArrayD::from_shape_vec(IxDyn(&shape), data)
        .map_err(|_| Error::invariant("segment stack has the wrong size"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_matches_strided_formula() {
        assert_eq!(segment_count(256, 256, 128), 1);
        assert_eq!(segment_count(255, 256, 128), 0);
        assert_eq!(segment_count(1000, 256, 128), 6);
        // Boundary extension plus padding: 1000 + 2 * 128 + 24.
        assert_eq!(segment_count(1280, 256, 128), 9);
    }

    #[test]
    fn segments_overlap_and_drop_the_tail() {
        let x = (0..10).collect::<Vec<i32>>();
        let view = SegmentView::new(&x, 4, 2).unwrap();
        assert_eq!(view.len(), 4);
        assert_eq!(view.get(0), Some(&x[0..4]));
        assert_eq!(view.get(3), Some(&x[6..10]));
        assert_eq!(view.get(4), None);

        let view = SegmentView::new(&x[..9], 4, 2).unwrap();
        assert_eq!(view.iter().last(), Some(&x[4..8]));
    }

    #[test]
    fn invalid_overlap_is_rejected() {
        let x = [0.0f64; 16];
        assert!(SegmentView::new(&x, 8, 8).is_err());
        assert!(SegmentView::new(&x, 0, 0).is_err());
    }

    #[test]
    fn stack_keeps_batch_axes_in_front() {
        let x = ArrayD::from_shape_fn(IxDyn(&[2, 10]), |ix| {
            Complex::new((ix[0] * 10 + ix[1]) as f64, 0.0)
        });
        let stack = stack_segments(&x, 4, 1).unwrap();
        assert_eq!(stack.shape(), &[2, 3, 4]);
        assert_eq!(stack[[1, 2, 0]].re, 16.0);
        assert_eq!(stack[[0, 1, 3]].re, 6.0);
    }

    #[test]
    fn stack_accepts_column_major_lanes() {
        let x = ArrayD::from_shape_fn(IxDyn(&[10, 2]), |ix| {
            Complex::new((ix[1] * 10 + ix[0]) as f64, 0.0)
        });
        let x = x.reversed_axes();
        assert!(!x.is_standard_layout());
        let stack = stack_segments(&x, 4, 1).unwrap();
        assert_eq!(stack.shape(), &[2, 3, 4]);
        assert_eq!(stack[[1, 2, 0]].re, 16.0);
        assert_eq!(stack[[0, 1, 3]].re, 6.0);
    }
}
