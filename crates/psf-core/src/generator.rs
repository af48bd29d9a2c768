//! Generation pass: snapshot, region-parallel fill, normalization.
//!
//! A pass walks a fixed state machine:
//!
//! ```text
//! Idle ──freeze──▶ ParametersFrozen ──run──▶ Generating ──▶ Complete
//!   ▲                                             │             │
//!   └───────────────── failure ◀──────────────────┘   freeze ◀──┘
//! ```
//!
//! `freeze` copies the live [`PsfSource`] into a [`Snapshot`]; only the
//! snapshot is shared with the workers. `Generating` is the only phase in
//! which more than one thread runs, and it ends with a full join before the
//! normalization reduction.

use ndarray::Array3;
use psf_compute::ComputeBackend;

use crate::error::PsfError;
use crate::models::{build_model, PsfModel, Snapshot};
use crate::normalize::normalize;
use crate::source::PsfSource;
use crate::types::{GridGeometry, PsfVolume};

/// Lifecycle of a [`GenerationPass`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationState {
    Idle,
    ParametersFrozen,
    Generating,
    Complete,
}

/// One generation of a PSF volume.
#[derive(Debug)]
pub struct GenerationPass {
    state: GenerationState,
    snapshot: Option<Snapshot>,
}

impl Default for GenerationPass {
    fn default() -> Self {
        Self::new()
    }
}

impl GenerationPass {
    pub fn new() -> Self {
        Self {
            state: GenerationState::Idle,
            snapshot: None,
        }
    }

    pub fn state(&self) -> GenerationState {
        self.state
    }

    /// The frozen configuration, once [`freeze`](Self::freeze) has succeeded.
    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    /// Validate `source` and take a snapshot of it.
    ///
    /// Allowed from every state except `Generating`. On a validation error the
    /// pass returns to `Idle`.
    pub fn freeze(&mut self, source: &PsfSource) -> Result<(), PsfError> {
        if self.state == GenerationState::Generating {
            return Err(PsfError::InvalidState {
                expected: GenerationState::Idle,
                found: self.state,
            });
        }

        match source.snapshot() {
            Ok(snapshot) => {
                log::debug!(
                    "Froze {} parameters: k = {:.6e} m⁻¹, pupil radius = {:.6e} m",
                    snapshot.kind,
                    snapshot.constants.k,
                    snapshot.constants.aperture_radius
                );
                self.snapshot = Some(snapshot);
                self.state = GenerationState::ParametersFrozen;
                Ok(())
            }
            Err(e) => {
                self.snapshot = None;
                self.state = GenerationState::Idle;
                Err(e)
            }
        }
    }

    /// Fill and normalize the volume described by the frozen snapshot.
    pub fn run(&mut self, backend: &dyn ComputeBackend) -> Result<PsfVolume, PsfError> {
        let snapshot = match (&self.state, &self.snapshot) {
            (GenerationState::ParametersFrozen, Some(snapshot)) => snapshot.clone(),
            _ => {
                return Err(PsfError::InvalidState {
                    expected: GenerationState::ParametersFrozen,
                    found: self.state,
                })
            }
        };

        self.state = GenerationState::Generating;
        log::debug!("Generation pass entering {:?}", self.state);

        match generate_snapshot(&snapshot, backend) {
            Ok(volume) => {
                self.state = GenerationState::Complete;
                Ok(volume)
            }
            Err(e) => {
                self.state = GenerationState::Idle;
                self.snapshot = None;
                Err(e)
            }
        }
    }
}

fn generate_snapshot(
    snapshot: &Snapshot,
    backend: &dyn ComputeBackend,
) -> Result<PsfVolume, PsfError> {
    let model = build_model(snapshot);
    let mut data = fill_volume(model.as_ref(), &snapshot.geometry, backend)?;
    check_finite(&data)?;

    let total = normalize(&mut data, snapshot.summed_intensity, backend);
    log::info!(
        "{}: {} voxels on {} (raw total {:.6e}, target {})",
        model.method_name(),
        data.len(),
        backend.device_info().name,
        total,
        snapshot.summed_intensity
    );

    Ok(PsfVolume::new(data, snapshot.geometry.clone()))
}

/// Evaluate `model` at every voxel centre of `geometry`.
///
/// Each voxel receives the pixel-integrated value at its physical position.
/// The backend decides how the grid is split across workers.
pub fn fill_volume(
    model: &dyn PsfModel,
    geometry: &GridGeometry,
    backend: &dyn ComputeBackend,
) -> Result<Array3<f64>, PsfError> {
    let voxel = |index: [usize; 3]| {
        model.compute_integrated_pixel_value(geometry.index_to_physical(index))
    };
    Ok(backend.parallel_volume_fill(geometry.size(), &voxel)?)
}

fn check_finite(data: &Array3<f64>) -> Result<(), PsfError> {
    match data.indexed_iter().find(|(_, v)| !v.is_finite()) {
        Some(((iz, iy, ix), &value)) => Err(PsfError::NonFiniteIntensity {
            index: [ix, iy, iz],
            value,
        }),
        None => Ok(()),
    }
}
