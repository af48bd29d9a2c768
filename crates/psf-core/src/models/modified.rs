//! Modified Gibson-Lanni model: the scalar diffraction PSF plus an empirical
//! anisotropic Gaussian lobe, which accounts for the out-of-focus haze that
//! measured widefield PSFs show and the diffraction model does not.
//!
//! The diffraction term is divided by its value at the emitter before the
//! lobe is added, so the lobe scale is relative to the diffraction peak.

use super::gibson_lanni::GibsonLanni;
use super::{PsfModel, Snapshot};
use crate::types::GaussianLobe;

/// The modified Gibson-Lanni model evaluator.
#[derive(Debug, Clone)]
pub struct ModifiedGibsonLanni {
    diffraction: GibsonLanni,
    lobe: GaussianLobe,
    /// Diffraction intensity at the emitter, used to normalise the
    /// diffraction term.
    peak: f64,
}

impl ModifiedGibsonLanni {
    pub fn new(snapshot: &Snapshot) -> Self {
        let diffraction = GibsonLanni::new(snapshot);
        let peak = diffraction.compute_sample(diffraction.center());
        let peak = if peak.is_finite() && peak > 0.0 { peak } else { 1.0 };
        Self {
            diffraction,
            lobe: snapshot.gaussian,
            peak,
        }
    }
}

impl PsfModel for ModifiedGibsonLanni {
    fn method_name(&self) -> &str {
        "Modified Gibson-Lanni"
    }

    fn compute_sample(&self, point: [f64; 3]) -> f64 {
        let center = self.diffraction.center();
        let offset = [
            point[0] - center[0],
            point[1] - center[1],
            point[2] - center[2],
        ];
        self.diffraction.compute_sample(point) / self.peak + self.lobe.evaluate(offset)
    }

    fn pixel_footprint(&self) -> [f64; 2] {
        self.diffraction.pixel_footprint()
    }

    fn oversampling(&self) -> usize {
        self.diffraction.oversampling()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ModelKind;
    use crate::source::PsfSource;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_peak_is_one_plus_lobe_scale() {
        let mut source = PsfSource::new(ModelKind::ModifiedGibsonLanni);
        source.gaussian_mut().intensity_scale = 0.2;
        let model = ModifiedGibsonLanni::new(&source.snapshot().unwrap());
        assert_abs_diff_eq!(model.compute_sample([0.0, 0.0, 0.0]), 1.2, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_scale_is_normalised_gibson_lanni() {
        let mut source = PsfSource::new(ModelKind::ModifiedGibsonLanni);
        source.gaussian_mut().intensity_scale = 0.0;
        let snapshot = source.snapshot().unwrap();
        let modified = ModifiedGibsonLanni::new(&snapshot);
        let plain = GibsonLanni::new(&snapshot);
        let peak = plain.compute_sample([0.0; 3]);

        let point = [80.0, 30.0, 400.0];
        assert_abs_diff_eq!(
            modified.compute_sample(point),
            plain.compute_sample(point) / peak,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_lobe_dominates_far_from_focus() {
        let mut source = PsfSource::new(ModelKind::ModifiedGibsonLanni);
        *source.gaussian_mut() = GaussianLobe {
            center_nm: [0.0, 0.0, 0.0],
            sigma_nm: [500.0, 500.0, 2000.0],
            intensity_scale: 0.1,
        };
        let model = ModifiedGibsonLanni::new(&source.snapshot().unwrap());
        let point = [400.0, 0.0, 1500.0];
        let lobe = source.gaussian().evaluate(point);
        assert!(model.compute_sample(point) >= lobe);
        assert!(lobe > 0.01);
    }
}
