//! Error type for PSF configuration and generation.

use psf_compute::ComputeError;
use thiserror::Error;

use crate::generator::GenerationState;

/// Errors that can occur while configuring or generating a PSF.
///
/// All errors are reported synchronously by the call that caused them.
/// Generation is a pure computation, so there is no partial result to
/// recover: fix the configuration and generate again.
#[derive(Debug, Error)]
pub enum PsfError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Non-finite intensity {value} at voxel {index:?}")]
    NonFiniteIntensity { index: [usize; 3], value: f64 },

    #[error("Unknown parameter '{0}'")]
    UnknownParameter(String),

    #[error("Invalid value {value} for parameter '{name}': {reason}")]
    InvalidParameterValue {
        name: String,
        value: f64,
        reason: String,
    },

    #[error("Malformed attribute {key}=\"{value}\"")]
    MalformedAttribute { key: String, value: String },

    #[error("Generation pass is {found:?}, expected {expected:?}")]
    InvalidState {
        expected: GenerationState,
        found: GenerationState,
    },

    #[error("Compute backend error: {0}")]
    Compute(#[from] ComputeError),
}
