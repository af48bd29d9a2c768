//! PSF model variants and the per-voxel evaluation contract.
//!
//! Every model implements [`PsfModel`]: given a physical point (nm) it
//! returns an intensity. Models are built from a [`Snapshot`], an immutable
//! copy of the configuration taken when a generation pass starts, so they
//! can be shared by reference across worker threads.
//!
//! | Model | Integrand | Extras |
//! |-------|-----------|--------|
//! | [`GibsonLanni`] | scalar, $J_0$ | |
//! | [`Haeberle`] | vectorial, $J_0, J_1, J_2$ with Fresnel transmission | |
//! | [`ModifiedGibsonLanni`] | scalar, $J_0$ | additive Gaussian lobe |
//! | [`GeneralizedWidefield`] | scalar, $J_0$ | detector distances, pixel border |

pub mod gibson_lanni;
pub mod haeberle;
pub mod modified;
pub mod widefield;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PsfError;
use crate::types::{GaussianLobe, GridGeometry, OpticalParams, CLASSIC_TUBE_LENGTH_M};

pub use gibson_lanni::{GibsonLanni, GibsonLanniIntegrand};
pub use haeberle::{Haeberle, HaeberleIntegrand, VectorialComponent};
pub use modified::ModifiedGibsonLanni;
pub use widefield::GeneralizedWidefield;

/// The available PSF models.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelKind {
    #[default]
    GibsonLanni,
    Haeberle,
    ModifiedGibsonLanni,
    #[serde(rename = "widefield")]
    GeneralizedWidefield,
}

impl ModelKind {
    pub const ALL: [ModelKind; 4] = [
        ModelKind::GibsonLanni,
        ModelKind::Haeberle,
        ModelKind::ModifiedGibsonLanni,
        ModelKind::GeneralizedWidefield,
    ];

    /// Stable identifier used in job files and attribute files.
    pub fn key(self) -> &'static str {
        match self {
            ModelKind::GibsonLanni => "gibson-lanni",
            ModelKind::Haeberle => "haeberle",
            ModelKind::ModifiedGibsonLanni => "modified-gibson-lanni",
            ModelKind::GeneralizedWidefield => "widefield",
        }
    }

    /// Human-readable name.
    pub fn label(self) -> &'static str {
        match self {
            ModelKind::GibsonLanni => "Gibson-Lanni",
            ModelKind::Haeberle => "Haeberle (vectorial)",
            ModelKind::ModifiedGibsonLanni => "Modified Gibson-Lanni",
            ModelKind::GeneralizedWidefield => "Generalized widefield",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ModelKind {
    type Err = PsfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelKind::ALL
            .into_iter()
            .find(|kind| kind.key().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                PsfError::InvalidConfiguration(format!(
                    "unknown model '{s}'. Valid models: gibson-lanni, haeberle, modified-gibson-lanni, widefield"
                ))
            })
    }
}

/// Constants derived once per snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpticalConstants {
    /// Vacuum wavenumber (m⁻¹).
    pub k: f64,
    /// Pupil radius in the back focal plane (m).
    pub aperture_radius: f64,
    /// Design distance from back focal plane to detector (m).
    pub tube_length_design: f64,
    /// Actual distance from back focal plane to detector (m).
    pub tube_length_actual: f64,
}

impl OpticalConstants {
    /// Derive the constants for `kind`. Only the generalized widefield model
    /// reads the detector distances; the others use the classic tube length.
    pub fn derive(kind: ModelKind, optics: &OpticalParams) -> Self {
        let (tube_length_design, tube_length_actual) = match kind {
            ModelKind::GeneralizedWidefield => (
                optics.bfp_detector_distance_design_mm * 1e-3,
                optics.bfp_detector_distance_actual_mm * 1e-3,
            ),
            _ => (CLASSIC_TUBE_LENGTH_M, CLASSIC_TUBE_LENGTH_M),
        };
        Self {
            k: optics.wavenumber(),
            aperture_radius: optics.aperture_radius(tube_length_design),
            tube_length_design,
            tube_length_actual,
        }
    }
}

/// Frozen configuration for one generation pass.
///
/// Built by [`PsfSource::snapshot`](crate::source::PsfSource::snapshot),
/// which validates it. Workers only ever see a shared reference to this.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub kind: ModelKind,
    pub optics: OpticalParams,
    pub constants: OpticalConstants,
    pub geometry: GridGeometry,
    pub gaussian: GaussianLobe,
    pub summed_intensity: f64,
    pub integration_order: usize,
    pub oversampling: usize,
}

/// The per-voxel evaluation contract shared by every model.
///
/// Both evaluation methods are pure, so a model can be called concurrently
/// from any number of threads.
pub trait PsfModel: Send + Sync {
    /// Human-readable name of the model.
    fn method_name(&self) -> &str;

    /// Intensity at a physical point (nm).
    fn compute_sample(&self, point: [f64; 3]) -> f64;

    /// Lateral extent (nm) of the light-sensitive part of a pixel.
    fn pixel_footprint(&self) -> [f64; 2];

    /// Sub-samples per lateral axis used by
    /// [`compute_integrated_pixel_value`](PsfModel::compute_integrated_pixel_value).
    fn oversampling(&self) -> usize;

    /// Pixel-area integrated intensity at a voxel centre (nm).
    ///
    /// Averages [`compute_sample`](PsfModel::compute_sample) over an
    /// `n × n` midpoint grid spanning the pixel footprint, which damps the
    /// aliasing of the Bessel ringing close to the optical axis.
    fn compute_integrated_pixel_value(&self, point: [f64; 3]) -> f64 {
        let n = self.oversampling().max(1);
        if n == 1 {
            return self.compute_sample(point);
        }

        let [wx, wy] = self.pixel_footprint();
        let offset = |i: usize, width: f64| ((i as f64 + 0.5) / n as f64 - 0.5) * width;

        let mut sum = 0.0;
        for j in 0..n {
            let y = point[1] + offset(j, wy);
            for i in 0..n {
                let x = point[0] + offset(i, wx);
                sum += self.compute_sample([x, y, point[2]]);
            }
        }
        sum / (n * n) as f64
    }
}

/// Build the evaluator for a snapshot.
pub fn build_model(snapshot: &Snapshot) -> Box<dyn PsfModel> {
    match snapshot.kind {
        ModelKind::GibsonLanni => Box::new(GibsonLanni::new(snapshot)),
        ModelKind::Haeberle => Box::new(Haeberle::new(snapshot)),
        ModelKind::ModifiedGibsonLanni => Box::new(ModifiedGibsonLanni::new(snapshot)),
        ModelKind::GeneralizedWidefield => Box::new(GeneralizedWidefield::new(snapshot)),
    }
}

/// Lateral and axial distance (m) of `point` from the emitter at `center`
/// (both nm).
pub(crate) fn radial_axial(point: [f64; 3], center: [f64; 3]) -> (f64, f64) {
    let dx = point[0] - center[0];
    let dy = point[1] - center[1];
    let r = (dx * dx + dy * dy).sqrt() * 1e-9;
    let z = (point[2] - center[2]) * 1e-9;
    (r, z)
}
