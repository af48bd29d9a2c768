//! Optical path difference between the design and actual imaging conditions.
//!
//! Following Gibson & Lanni (*J. Opt. Soc. Am. A* **8**, 1601, 1991), a ray
//! leaving the pupil at normalised radius $\rho$ picks up a path difference
//! from defocus in the immersion oil plus one term per layer whose index or
//! thickness differs from what the objective was designed for:
//!
//! $$
//! \mathrm{OPD}(\rho, \Delta z) = n_i \Delta z \sqrt{1 - (NA\rho/n_i)^2}
//!   + T(n_s, t_s) + T(n_g, t_g) - T(n_g^*, t_g^*) - T(n_i^*, t_i^*)
//! $$
//!
//! with $T(n, t) = n t \left(\sqrt{1 - (NA\rho/n)^2} - \frac{n_i^2}{n^2}\sqrt{1 - (NA\rho/n_i)^2}\right)$.
//!
//! Square roots are complex: past the critical angle of a layer the radicand
//! goes negative and the term becomes an evanescent (decaying) phase.

use num_complex::Complex64;

use crate::types::OpticalParams;

const UM_TO_M: f64 = 1e-6;

/// $\sqrt{1 - (NA\rho/n)^2}$ as a complex number.
#[inline]
pub fn direction_cosine(na_rho: f64, n: f64) -> Complex64 {
    let s = na_rho / n;
    Complex64::new(1.0 - s * s, 0.0).sqrt()
}

/// Path term of one layer of index `n` and thickness `t` (m).
#[inline]
fn layer_term(na_rho: f64, n: f64, t: f64, n_oil: f64, oil_cosine: Complex64) -> Complex64 {
    let ratio = n_oil * n_oil / (n * n);
    n * t * (direction_cosine(na_rho, n) - ratio * oil_cosine)
}

/// Optical path difference (m) at pupil radius `rho` for an axial defocus
/// `dz` (m) from the point source.
pub fn optical_path_difference(rho: f64, dz: f64, params: &OpticalParams) -> Complex64 {
    let na_rho = params.numerical_aperture * rho;
    let n_oil = params.oil_ri_actual;
    let oil_cosine = direction_cosine(na_rho, n_oil);

    let term = |n: f64, t_um: f64| layer_term(na_rho, n, t_um * UM_TO_M, n_oil, oil_cosine);

    n_oil * dz * oil_cosine
        + term(params.specimen_ri_actual, params.point_source_depth_actual_um)
        + term(params.coverslip_ri_actual, params.coverslip_thickness_actual_um)
        - term(params.coverslip_ri_design, params.coverslip_thickness_design_um)
        - term(params.oil_ri_design, params.oil_thickness_design_um)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_matched_conditions_reduce_to_defocus() {
        let p = OpticalParams::default();
        for &rho in &[0.0, 0.25, 0.5, 0.9, 1.0] {
            let opd = optical_path_difference(rho, 0.0, &p);
            assert_abs_diff_eq!(opd.re, 0.0, epsilon = 1e-18);
            assert_abs_diff_eq!(opd.im, 0.0, epsilon = 1e-18);

            let dz = 1.5e-6;
            let opd = optical_path_difference(rho, dz, &p);
            let expected = p.oil_ri_actual * dz * (1.0 - (p.numerical_aperture * rho / p.oil_ri_actual).powi(2)).sqrt();
            assert_abs_diff_eq!(opd.re, expected, epsilon = 1e-18);
        }
    }

    #[test]
    fn test_on_axis_is_pure_path_length() {
        // At rho = 0 every layer contributes n t - n_oil^2 / n t.
        let p = OpticalParams {
            coverslip_ri_actual: 1.50,
            coverslip_thickness_actual_um: 180.0,
            ..Default::default()
        };
        let opd = optical_path_difference(0.0, 0.0, &p);
        let term = |n: f64, t: f64| n * t * 1e-6 * (1.0 - p.oil_ri_actual.powi(2) / (n * n));
        let expected = term(1.50, 180.0) - term(p.coverslip_ri_design, p.coverslip_thickness_design_um);
        assert_abs_diff_eq!(opd.re, expected, epsilon = 1e-15);
        assert_abs_diff_eq!(opd.im, 0.0, epsilon = 1e-18);
    }

    #[test]
    fn test_supercritical_specimen_is_finite_and_evanescent() {
        // NA 1.4 in a 1.33 specimen: rho near 1 is past the critical angle.
        let p = OpticalParams {
            point_source_depth_actual_um: 5.0,
            ..Default::default()
        };
        let opd = optical_path_difference(1.0, 0.0, &p);
        assert!(opd.re.is_finite() && opd.im.is_finite());
        assert!(opd.im > 0.0, "evanescent term should damp exp(ik OPD)");
    }
}
