//! Composite Simpson's rule over the normalised pupil radius.

use num_complex::Complex64;

/// Default number of Simpson panel pairs; the rule uses `2m + 1` nodes.
pub const DEFAULT_INTEGRATION_ORDER: usize = 100;

/// A complex-valued function of lateral distance `r` (m), axial distance
/// `z` (m) and normalised pupil radius `rho`.
pub trait Integrand: Sync {
    fn eval(&self, r: f64, z: f64, rho: f64) -> Complex64;
}

impl<F> Integrand for F
where
    F: Fn(f64, f64, f64) -> Complex64 + Sync,
{
    fn eval(&self, r: f64, z: f64, rho: f64) -> Complex64 {
        self(r, z, rho)
    }
}

/// Integrate `integrand` over `rho` in `[a, b]` with `2m + 1` nodes.
///
/// $$
/// \int_a^b f\,d\rho \approx \frac{h}{3}\Big[f(a) + f(b)
///   + 2\sum_{k=1}^{m-1} f(a + 2kh) + 4\sum_{k=1}^{m} f(a + (2k-1)h)\Big],
///   \quad h = \frac{b - a}{2m}
/// $$
///
/// `m = 0` is treated as `m = 1` so the rule always has three nodes.
pub fn integrate<I: Integrand + ?Sized>(
    integrand: &I,
    a: f64,
    b: f64,
    m: usize,
    r: f64,
    z: f64,
) -> Complex64 {
    let m = m.max(1);
    let h = (b - a) / (2 * m) as f64;

    let mut sum = integrand.eval(r, z, a) + integrand.eval(r, z, b);
    for k in 1..m {
        sum += 2.0 * integrand.eval(r, z, a + (2 * k) as f64 * h);
    }
    for k in 1..=m {
        sum += 4.0 * integrand.eval(r, z, a + (2 * k - 1) as f64 * h);
    }

    sum * (h / 3.0)
}
