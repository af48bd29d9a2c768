//! Vectorial PSF after Haeberle (*Opt. Commun.* **216**, 55, 2003) and
//! Török & Varga (*Appl. Opt.* **36**, 2305, 1997).
//!
//! Light from the emitter crosses specimen → cover slip → oil before
//! entering the objective. With $n_i \sin\theta_i = NA\,\rho$ fixing the ray
//! angle in every layer, the field in the detector plane is described by
//! three pupil integrals
//!
//! $$
//! \begin{aligned}
//! I_0 &= \int_0^1 w(\rho)\,(\tau_s + \tau_p \cos\theta_s)\,J_0(k NA \rho r)\,e^{ik\,\mathrm{OPD}}\,d\rho \\
//! I_1 &= \int_0^1 w(\rho)\,\tau_p \sin\theta_s\,J_1(k NA \rho r)\,e^{ik\,\mathrm{OPD}}\,d\rho \\
//! I_2 &= \int_0^1 w(\rho)\,(\tau_s - \tau_p \cos\theta_s)\,J_2(k NA \rho r)\,e^{ik\,\mathrm{OPD}}\,d\rho
//! \end{aligned}
//! $$
//!
//! where $\tau_{s,p}$ are the Fresnel transmission products over both
//! interfaces and $w(\rho) = \frac{NA}{n_i}\sin\theta_i / \sqrt{\cos\theta_i}$
//! combines the aplanatic apodisation with the Jacobian of $\theta_i \to \rho$.
//! For a randomly oriented emitter the intensity is
//! $|I_0|^2 + 2|I_1|^2 + |I_2|^2$.

use num_complex::Complex64;

use super::{radial_axial, PsfModel, Snapshot};
use crate::bessel::{j0, j1, j2};
use crate::opd::{direction_cosine, optical_path_difference};
use crate::quadrature::{integrate, Integrand};
use crate::types::OpticalParams;

/// Which of the three vectorial pupil integrals to evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorialComponent {
    I0,
    I1,
    I2,
}

/// Quantities of one pupil ray that all three components share.
struct PupilRay {
    /// $w(\rho) e^{ik\,\mathrm{OPD}}$.
    weighted_phase: Complex64,
    tau_s: Complex64,
    tau_p: Complex64,
    cos_specimen: Complex64,
    sin_specimen: f64,
}

/// Fresnel amplitude transmission coefficients $(t_s, t_p)$ from a medium
/// of index `n_a` into one of index `n_b`.
fn fresnel_transmission(
    n_a: f64,
    cos_a: Complex64,
    n_b: f64,
    cos_b: Complex64,
) -> (Complex64, Complex64) {
    let numerator = 2.0 * n_a * cos_a;
    let t_s = numerator / (n_a * cos_a + n_b * cos_b);
    let t_p = numerator / (n_b * cos_a + n_a * cos_b);
    (t_s, t_p)
}

/// One component of the vectorial pupil integral.
#[derive(Debug, Clone, Copy)]
pub struct HaeberleIntegrand {
    optics: OpticalParams,
    k: f64,
    component: VectorialComponent,
}

impl HaeberleIntegrand {
    pub fn new(optics: OpticalParams, k: f64, component: VectorialComponent) -> Self {
        Self {
            optics,
            k,
            component,
        }
    }

    fn ray(&self, z: f64, rho: f64) -> PupilRay {
        let p = &self.optics;
        let na_rho = p.numerical_aperture * rho;
        let (n_s, n_g, n_i) = (p.specimen_ri_actual, p.coverslip_ri_actual, p.oil_ri_actual);

        let cos_s = direction_cosine(na_rho, n_s);
        let cos_g = direction_cosine(na_rho, n_g);
        let cos_i = direction_cosine(na_rho, n_i);

        let (ts_sg, tp_sg) = fresnel_transmission(n_s, cos_s, n_g, cos_g);
        let (ts_gi, tp_gi) = fresnel_transmission(n_g, cos_g, n_i, cos_i);

        let sin_i = na_rho / n_i;
        let weight = (p.numerical_aperture / n_i) * sin_i / cos_i.sqrt();
        let phase = (Complex64::i() * self.k * optical_path_difference(rho, z, p)).exp();

        PupilRay {
            weighted_phase: weight * phase,
            tau_s: ts_sg * ts_gi,
            tau_p: tp_sg * tp_gi,
            cos_specimen: cos_s,
            sin_specimen: na_rho / n_s,
        }
    }
}

impl Integrand for HaeberleIntegrand {
    fn eval(&self, r: f64, z: f64, rho: f64) -> Complex64 {
        let ray = self.ray(z, rho);
        let v = self.k * self.optics.numerical_aperture * rho * r;
        let angular = match self.component {
            VectorialComponent::I0 => (ray.tau_s + ray.tau_p * ray.cos_specimen) * j0(v),
            VectorialComponent::I1 => ray.tau_p * ray.sin_specimen * j1(v),
            VectorialComponent::I2 => (ray.tau_s - ray.tau_p * ray.cos_specimen) * j2(v),
        };
        ray.weighted_phase * angular
    }
}

/// The Haeberle vectorial model evaluator.
#[derive(Debug, Clone)]
pub struct Haeberle {
    components: [HaeberleIntegrand; 3],
    center: [f64; 3],
    integration_order: usize,
    footprint: [f64; 2],
    oversampling: usize,
}

impl Haeberle {
    pub fn new(snapshot: &Snapshot) -> Self {
        let k = snapshot.constants.k;
        let component = |c| HaeberleIntegrand::new(snapshot.optics, k, c);
        let spacing = snapshot.geometry.spacing();
        Self {
            components: [
                component(VectorialComponent::I0),
                component(VectorialComponent::I1),
                component(VectorialComponent::I2),
            ],
            center: snapshot.geometry.point_center(),
            integration_order: snapshot.integration_order,
            footprint: [spacing[0], spacing[1]],
            oversampling: snapshot.oversampling,
        }
    }

    /// The three pupil integrals $(I_0, I_1, I_2)$ at `r`, `z` (m).
    pub fn integrals(&self, r: f64, z: f64) -> [Complex64; 3] {
        self.components
            .map(|c| integrate(&c, 0.0, 1.0, self.integration_order, r, z))
    }
}

impl PsfModel for Haeberle {
    fn method_name(&self) -> &str {
        "Haeberle (vectorial)"
    }

    fn compute_sample(&self, point: [f64; 3]) -> f64 {
        let (r, z) = radial_axial(point, self.center);
        let [i0, i1, i2] = self.integrals(r, z);
        i0.norm_sqr() + 2.0 * i1.norm_sqr() + i2.norm_sqr()
    }

    fn pixel_footprint(&self) -> [f64; 2] {
        self.footprint
    }

    fn oversampling(&self) -> usize {
        self.oversampling
    }
}
