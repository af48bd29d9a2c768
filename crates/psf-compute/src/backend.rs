//! Compute backend trait and device abstraction.
//!
//! The [`ComputeBackend`] trait abstracts over execution environments so that
//! the optics code in `psf-core` stays device-agnostic. A backend only has to
//! know how to fill a 3D scalar grid from a pure per-voxel function and how to
//! reduce a buffer after the fill has joined.

use ndarray::Array3;
use thiserror::Error;

/// Errors originating from compute backends.
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Backend not available: {0}")]
    Unavailable(String),

    #[error("Device error: {0}")]
    DeviceError(String),

    #[error("Thread pool could not be built with {threads} threads: {reason}")]
    ThreadPool { threads: usize, reason: String },
}

/// Describes the capabilities of a compute backend.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub name: String,
    pub backend_type: BackendType,
    pub compute_units: Option<usize>,
}

/// The type of compute backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// Single-threaded reference execution.
    Serial,
    /// Shared-memory parallelism over a thread pool.
    Cpu,
}

/// Per-voxel evaluation callback, called with `[ix, iy, iz]`.
pub type VoxelFn<'a> = dyn Fn([usize; 3]) -> f64 + Send + Sync + 'a;

/// Abstraction over compute backends.
///
/// Implementations must call `fill_fn` exactly once per voxel and must never
/// let two workers write the same output cell. The reduction in [`sum`] is
/// only ever called after a fill has completed.
///
/// [`sum`]: ComputeBackend::sum
pub trait ComputeBackend: Send + Sync {
    /// Return information about the device.
    fn device_info(&self) -> DeviceInfo;

    /// Fill a volume of `shape = [nx, ny, nz]` voxels.
    ///
    /// The returned array is laid out `[z, y, x]` (x fastest), so each
    /// z-slice is one contiguous slab of memory.
    fn parallel_volume_fill(
        &self,
        shape: [usize; 3],
        fill_fn: &VoxelFn<'_>,
    ) -> Result<Array3<f64>, ComputeError>;

    /// Sum all values of a buffer. Summation order is backend-defined.
    fn sum(&self, values: &[f64]) -> f64 {
        values.iter().sum()
    }
}

/// Single-threaded backend, used as a reference for the parallel ones.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialBackend;

impl ComputeBackend for SerialBackend {
    fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            name: "Serial".into(),
            backend_type: BackendType::Serial,
            compute_units: Some(1),
        }
    }

    fn parallel_volume_fill(
        &self,
        shape: [usize; 3],
        fill_fn: &VoxelFn<'_>,
    ) -> Result<Array3<f64>, ComputeError> {
        let [nx, ny, nz] = shape;
        Ok(Array3::from_shape_fn((nz, ny, nx), |(iz, iy, ix)| {
            fill_fn([ix, iy, iz])
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_fill_layout_is_z_y_x() {
        let volume = SerialBackend
            .parallel_volume_fill([4, 3, 2], &|[ix, iy, iz]| (100 * iz + 10 * iy + ix) as f64)
            .unwrap();
        assert_eq!(volume.dim(), (2, 3, 4));
        assert_eq!(volume[[1, 2, 3]], 123.0);
        assert_eq!(volume[[0, 1, 0]], 10.0);
    }

    #[test]
    fn test_serial_sum() {
        assert_eq!(SerialBackend.sum(&[1.0, 2.0, 3.5]), 6.5);
        assert_eq!(SerialBackend.sum(&[]), 0.0);
    }
}
