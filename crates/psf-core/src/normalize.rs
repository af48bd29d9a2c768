//! Post-fill normalization.
//!
//! The reduction runs only after the fill has joined, through the same
//! backend, so every voxel is final when it is summed.

use ndarray::Array3;
use psf_compute::ComputeBackend;

/// Rescale `data` so that its voxels sum to `target`.
///
/// Returns the total intensity before rescaling. A volume that cannot be
/// rescaled to a finite, positive total is left untouched: an all-dark PSF
/// is a valid, if degenerate, result. That covers a zero or negative total
/// and a total so small that `target / total` overflows.
pub fn normalize(data: &mut Array3<f64>, target: f64, backend: &dyn ComputeBackend) -> f64 {
    let total = match data.as_slice() {
        Some(values) => backend.sum(values),
        None => data.sum(),
    };

    let scale = target / total;
    if !total.is_finite() || total <= 0.0 || !scale.is_finite() {
        log::warn!(
            "PSF volume of {} voxels has degenerate total intensity {:e}; skipping normalization",
            data.len(),
            total
        );
        return total;
    }

    data.mapv_inplace(|v| v * scale);
    total
}
