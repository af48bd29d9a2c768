//! # PSF Compute
//!
//! Compute backend abstraction for the PSF engine. This crate provides a
//! [`ComputeBackend`](backend::ComputeBackend) trait that isolates the optics
//! code from how a volume is actually scheduled across threads.
//!
//! ## Available backends
//!
//! | Backend | Feature flag | Partitioning |
//! |---------|-------------|--------------|
//! | Serial | always | none |
//! | CPU (Rayon) | `cpu` (default) | contiguous z-slabs |

pub mod backend;

#[cfg(feature = "cpu")]
pub mod cpu;

pub use backend::{BackendType, ComputeBackend, ComputeError, DeviceInfo, SerialBackend, VoxelFn};

#[cfg(feature = "cpu")]
pub use cpu::CpuBackend;
