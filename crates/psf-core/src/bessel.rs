//! Bessel functions of the first kind, $J_0$, $J_1$ and $J_2$.
//!
//! Thin wrappers over `scilib`'s integer-order $J_n$. The pupil integrals only
//! ever pass non-negative arguments, but the parity $J_n(-x) = (-1)^n J_n(x)$
//! is applied here so the wrappers are valid on the whole real line.

use scilib::math::bessel;

/// Zeroth-order Bessel function of the first kind.
pub fn j0(x: f64) -> f64 {
    bessel::j_n(0, x.abs())
}

/// First-order Bessel function of the first kind.
pub fn j1(x: f64) -> f64 {
    let v = bessel::j_n(1, x.abs());
    if x < 0.0 {
        -v
    } else {
        v
    }
}

/// Second-order Bessel function of the first kind.
pub fn j2(x: f64) -> f64 {
    bessel::j_n(2, x.abs())
}
