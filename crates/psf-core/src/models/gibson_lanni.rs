//! Scalar Gibson-Lanni model.
//!
//! The amplitude at lateral distance $r$ and defocus $z$ is the pupil integral
//!
//! $$
//! U(r, z) = \int_0^1 J_0\!\left(\frac{k A \rho \, M r}{L + z}\right)
//!   e^{i k \,\mathrm{OPD}(\rho, z)} \rho \, d\rho
//! $$
//!
//! where $A$ is the back focal plane pupil radius, $L$ the tube length and
//! $M r$ the lateral distance mapped into the detector plane. The intensity is
//! $|U|^2$.

use num_complex::Complex64;

use super::{radial_axial, OpticalConstants, PsfModel, Snapshot};
use crate::bessel::j0;
use crate::opd::optical_path_difference;
use crate::quadrature::{integrate, Integrand};
use crate::types::OpticalParams;

/// Gibson-Lanni pupil integrand.
#[derive(Debug, Clone, Copy)]
pub struct GibsonLanniIntegrand {
    optics: OpticalParams,
    constants: OpticalConstants,
}

impl GibsonLanniIntegrand {
    pub fn new(optics: OpticalParams, constants: OpticalConstants) -> Self {
        Self { optics, constants }
    }

    /// Extra path from a detector that is not where the objective expects it,
    /// $A^2\rho^2 (z_d^* - z_d) / (2 z_d^* z_d)$. Zero for the classic model.
    fn detector_path(&self, rho: f64) -> f64 {
        let c = &self.constants;
        let design = c.tube_length_design;
        let actual = c.tube_length_actual;
        c.aperture_radius * c.aperture_radius * rho * rho * (design - actual)
            / (2.0 * design * actual)
    }
}

impl Integrand for GibsonLanniIntegrand {
    fn eval(&self, r: f64, z: f64, rho: f64) -> Complex64 {
        let c = &self.constants;
        let detector_r = self.optics.magnification * r;
        let bessel = j0(c.k * c.aperture_radius * rho * detector_r / (c.tube_length_actual + z));
        let opd = optical_path_difference(rho, z, &self.optics) + self.detector_path(rho);
        bessel * (Complex64::i() * c.k * opd).exp() * rho
    }
}

/// The Gibson-Lanni model evaluator.
#[derive(Debug, Clone)]
pub struct GibsonLanni {
    integrand: GibsonLanniIntegrand,
    center: [f64; 3],
    integration_order: usize,
    footprint: [f64; 2],
    oversampling: usize,
}

impl GibsonLanni {
    pub fn new(snapshot: &Snapshot) -> Self {
        let spacing = snapshot.geometry.spacing();
        Self::with_footprint(snapshot, [spacing[0], spacing[1]])
    }

    /// Build with an explicit pixel footprint (nm) for pixel integration.
    pub(crate) fn with_footprint(snapshot: &Snapshot, footprint: [f64; 2]) -> Self {
        Self {
            integrand: GibsonLanniIntegrand::new(snapshot.optics, snapshot.constants),
            center: snapshot.geometry.point_center(),
            integration_order: snapshot.integration_order,
            footprint,
            oversampling: snapshot.oversampling,
        }
    }

    /// Complex amplitude at lateral distance `r` and defocus `z` (m).
    pub fn amplitude(&self, r: f64, z: f64) -> Complex64 {
        integrate(&self.integrand, 0.0, 1.0, self.integration_order, r, z)
    }

    /// Position of the emitter (nm).
    pub fn center(&self) -> [f64; 3] {
        self.center
    }
}

impl PsfModel for GibsonLanni {
    fn method_name(&self) -> &str {
        "Gibson-Lanni"
    }

    fn compute_sample(&self, point: [f64; 3]) -> f64 {
        let (r, z) = radial_axial(point, self.center);
        self.amplitude(r, z).norm_sqr()
    }

    fn pixel_footprint(&self) -> [f64; 2] {
        self.footprint
    }

    fn oversampling(&self) -> usize {
        self.oversampling
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::PsfSource;
    use crate::models::ModelKind;

    fn model() -> GibsonLanni {
        let source = PsfSource::new(ModelKind::GibsonLanni);
        GibsonLanni::new(&source.snapshot().unwrap())
    }

    #[test]
    fn test_in_focus_on_axis_amplitude() {
        // With matched layers and no defocus the phase vanishes and
        // U(0, 0) = ∫ rho d rho = 1/2.
        let gl = model();
        let u = gl.amplitude(0.0, 0.0);
        assert!((u.re - 0.5).abs() < 1e-8, "{u}");
        assert!(u.im.abs() < 1e-12);
    }

    #[test]
    fn test_peak_on_axis_in_focus() {
        let gl = model();
        let peak = gl.compute_sample([0.0, 0.0, 0.0]);
        for point in [[100.0, 0.0, 0.0], [0.0, 150.0, 0.0], [0.0, 0.0, 300.0], [0.0, 0.0, -300.0]] {
            assert!(gl.compute_sample(point) < peak, "{point:?}");
        }
    }

    #[test]
    fn test_axial_symmetry_when_matched() {
        let gl = model();
        for dz in [100.0, 400.0, 1200.0] {
            let above = gl.compute_sample([0.0, 0.0, dz]);
            let below = gl.compute_sample([0.0, 0.0, -dz]);
            assert!((above - below).abs() <= 1e-9 * above.max(below), "dz={dz}");
        }
    }

    #[test]
    fn test_first_dark_ring_near_airy_radius() {
        // In focus the integral is the Airy pattern, zero at 0.61 λ / NA.
        let gl = model();
        let airy = 0.61 * 550.0 / 1.4;
        let at_ring = gl.compute_sample([airy, 0.0, 0.0]);
        let peak = gl.compute_sample([0.0, 0.0, 0.0]);
        assert!(at_ring / peak < 1e-3, "ratio {}", at_ring / peak);
    }
}
