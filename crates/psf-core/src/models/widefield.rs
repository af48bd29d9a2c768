//! Generalized widefield model.
//!
//! Same pupil integral as [`GibsonLanni`], but the tube length is replaced
//! by the design and actual distances from the back focal plane to the
//! detector, and pixel integration only covers the light-sensitive area of
//! each detector pixel (its footprint minus the border on both sides).

use super::gibson_lanni::GibsonLanni;
use super::{PsfModel, Snapshot};

/// The generalized widefield model evaluator.
#[derive(Debug, Clone)]
pub struct GeneralizedWidefield {
    scalar: GibsonLanni,
}

impl GeneralizedWidefield {
    pub fn new(snapshot: &Snapshot) -> Self {
        let footprint = active_footprint(
            snapshot.geometry.spacing(),
            snapshot.optics.detector_border_width_nm,
        );
        Self {
            scalar: GibsonLanni::with_footprint(snapshot, footprint),
        }
    }
}

/// Light-sensitive lateral extent (nm) of a pixel with the given border.
///
/// A border of half the spacing or more leaves a single point at the pixel
/// centre.
pub fn active_footprint(spacing: [f64; 3], border: [f64; 2]) -> [f64; 2] {
    [
        (spacing[0] - 2.0 * border[0]).max(0.0),
        (spacing[1] - 2.0 * border[1]).max(0.0),
    ]
}

impl PsfModel for GeneralizedWidefield {
    fn method_name(&self) -> &str {
        "Generalized widefield"
    }

    fn compute_sample(&self, point: [f64; 3]) -> f64 {
        self.scalar.compute_sample(point)
    }

    fn pixel_footprint(&self) -> [f64; 2] {
        self.scalar.pixel_footprint()
    }

    fn oversampling(&self) -> usize {
        self.scalar.oversampling()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ModelKind;
    use crate::source::PsfSource;

    #[test]
    fn test_active_footprint() {
        assert_eq!(active_footprint([65.0, 80.0, 200.0], [5.0, 0.0]), [55.0, 80.0]);
        assert_eq!(active_footprint([65.0, 80.0, 200.0], [40.0, 40.0]), [0.0, 0.0]);
    }

    #[test]
    fn test_matches_gibson_lanni_at_classic_tube_length() {
        let gl = PsfSource::new(ModelKind::GibsonLanni);
        let mut wf = PsfSource::new(ModelKind::GeneralizedWidefield);
        wf.optics_mut().bfp_detector_distance_design_mm = 160.0;
        wf.optics_mut().bfp_detector_distance_actual_mm = 160.0;

        let gl = GibsonLanni::new(&gl.snapshot().unwrap());
        let wf = GeneralizedWidefield::new(&wf.snapshot().unwrap());
        for point in [[0.0, 0.0, 0.0], [120.0, -40.0, 250.0], [0.0, 300.0, -800.0]] {
            let a = gl.compute_sample(point);
            let b = wf.compute_sample(point);
            assert!((a - b).abs() <= 1e-12 * a.max(1e-30), "{point:?}: {a} vs {b}");
        }
    }

    #[test]
    fn test_detector_mismatch_defocuses() {
        let mut source = PsfSource::new(ModelKind::GeneralizedWidefield);
        let matched = GeneralizedWidefield::new(&source.snapshot().unwrap());
        source.optics_mut().bfp_detector_distance_actual_mm = 180.0;
        let shifted = GeneralizedWidefield::new(&source.snapshot().unwrap());

        let origin = [0.0, 0.0, 0.0];
        assert!(shifted.compute_sample(origin) < matched.compute_sample(origin));
    }

    #[test]
    fn test_border_shrinks_integration_area() {
        let mut source = PsfSource::new(ModelKind::GeneralizedWidefield);
        source.set_oversampling(3);
        source.optics_mut().detector_border_width_nm = [10.0, 20.0];
        let model = GeneralizedWidefield::new(&source.snapshot().unwrap());
        assert_eq!(model.pixel_footprint(), [45.0, 25.0]);

        let mut full = PsfSource::new(ModelKind::GeneralizedWidefield);
        full.set_oversampling(3);
        let full = GeneralizedWidefield::new(&full.snapshot().unwrap());

        // Sub-samples closer to the axis give a brighter pixel at the peak.
        let centre = [0.0, 0.0, 0.0];
        assert!(model.compute_integrated_pixel_value(centre) > full.compute_integrated_pixel_value(centre));
    }
}
