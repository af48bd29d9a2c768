//! CPU compute backend using Rayon for shared-memory parallelism.

use std::sync::Arc;

use ndarray::Array3;
use rayon::prelude::*;

use crate::backend::{BackendType, ComputeBackend, ComputeError, DeviceInfo, VoxelFn};

/// CPU backend that parallelises work across threads via Rayon.
///
/// The output buffer is split into z-slabs of `nx * ny` cells. Each slab is
/// an independent task, so a worker only ever writes the slab it was handed.
pub struct CpuBackend {
    num_threads: usize,
    /// Dedicated pool when a thread count was requested, otherwise the
    /// global Rayon pool is used.
    pool: Option<Arc<rayon::ThreadPool>>,
}

impl CpuBackend {
    /// Create a new CPU backend using all available threads.
    pub fn new() -> Self {
        Self {
            num_threads: rayon::current_num_threads(),
            pool: None,
        }
    }

    /// Create a CPU backend with a specified thread count.
    pub fn with_threads(num_threads: usize) -> Result<Self, ComputeError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("psf-worker-{i}"))
            .build()
            .map_err(|e| ComputeError::ThreadPool {
                threads: num_threads,
                reason: e.to_string(),
            })?;
        log::debug!("built CPU thread pool with {} threads", pool.current_num_threads());
        Ok(Self {
            num_threads: pool.current_num_threads(),
            pool: Some(Arc::new(pool)),
        })
    }

    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    fn install<R, F>(&self, op: F) -> R
    where
        R: Send,
        F: FnOnce() -> R + Send,
    {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ComputeBackend for CpuBackend {
    fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            name: format!("CPU ({} threads)", self.num_threads),
            backend_type: BackendType::Cpu,
            compute_units: Some(self.num_threads),
        }
    }

    fn parallel_volume_fill(
        &self,
        shape: [usize; 3],
        fill_fn: &VoxelFn<'_>,
    ) -> Result<Array3<f64>, ComputeError> {
        let [nx, ny, nz] = shape;
        let slab = nx * ny;
        let mut data = vec![0.0; slab * nz];

        if slab > 0 {
            self.install(|| {
                data.par_chunks_mut(slab)
                    .enumerate()
                    .for_each(|(iz, cells)| {
                        for iy in 0..ny {
                            for ix in 0..nx {
                                cells[iy * nx + ix] = fill_fn([ix, iy, iz]);
                            }
                        }
                    });
            });
        }

        Array3::from_shape_vec((nz, ny, nx), data)
            .map_err(|e| ComputeError::DeviceError(e.to_string()))
    }

    fn sum(&self, values: &[f64]) -> f64 {
        self.install(|| values.par_iter().sum())
    }
}
