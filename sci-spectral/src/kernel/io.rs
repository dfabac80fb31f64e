use super::ConfigError;
use ndarray::{ArrayBase, Data, DataMut, Ix1};

/// Adapter trait for reading contiguous 1D input.
pub trait Read1D<T> {
    /// Borrow the underlying input as a contiguous slice.
    fn read_slice(&self) -> Result<&[T], ConfigError>;
}

/// Adapter trait for writing contiguous 1D output.
pub trait Write1D<T> {
    /// Borrow the underlying output as a mutable contiguous slice.
    fn write_slice_mut(&mut self) -> Result<&mut [T], ConfigError>;
}

impl<T> Read1D<T> for [T] {
    fn read_slice(&self) -> Result<&[T], ConfigError> {
        Ok(self)
    }
}

impl<T> Write1D<T> for [T] {
    fn write_slice_mut(&mut self) -> Result<&mut [T], ConfigError> {
        Ok(self)
    }
}

impl<T, const N: usize> Read1D<T> for [T; N] {
    fn read_slice(&self) -> Result<&[T], ConfigError> {
        Ok(self)
    }
}

impl<T, const N: usize> Write1D<T> for [T; N] {
    fn write_slice_mut(&mut self) -> Result<&mut [T], ConfigError> {
        Ok(self)
    }
}

impl<T> Read1D<T> for Vec<T> {
    fn read_slice(&self) -> Result<&[T], ConfigError> {
        Ok(self.as_slice())
    }
}

impl<T> Write1D<T> for Vec<T> {
    fn write_slice_mut(&mut self) -> Result<&mut [T], ConfigError> {
        Ok(self.as_mut_slice())
    }
}

// Covers owned arrays and views alike; strided views are rejected.
impl<T, S> Read1D<T> for ArrayBase<S, Ix1>
where
    S: Data<Elem = T>,
{
    fn read_slice(&self) -> Result<&[T], ConfigError> {
        self.as_slice()
            .ok_or(ConfigError::NonContiguous { arg: "array" })
    }
}

impl<T, S> Write1D<T> for ArrayBase<S, Ix1>
where
    S: DataMut<Elem = T>,
{
    fn write_slice_mut(&mut self) -> Result<&mut [T], ConfigError> {
        self.as_slice_mut()
            .ok_or(ConfigError::NonContiguous { arg: "array" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{s, Array1};

    #[test]
    fn slice_and_vec_adapters() {
        let a = [1.0f32, 2.0, 3.0];
        assert_eq!(a.read_slice().expect("array adapter").len(), 3);

        let mut out = vec![0.0f32; 3];
        out.write_slice_mut()
            .expect("vec write adapter")
            .copy_from_slice(&a);
        assert_eq!(out, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn ndarray_views_must_be_contiguous() {
        let arr = Array1::from(vec![1.0f64, 2.0, 3.0, 4.0]);
        assert_eq!(arr.view().read_slice().expect("view read")[3], 4.0);

        let strided = arr.slice(s![..;2]);
        assert_eq!(
            strided.read_slice(),
            Err(ConfigError::NonContiguous { arg: "array" })
        );
    }
}
