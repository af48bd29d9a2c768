//! Integration tests: full generation passes through the public API.
//!
//! These exercise the path a caller takes: configure a `PsfSource`, generate
//! on a backend, and inspect the resulting volume.

use approx::{assert_abs_diff_eq, assert_relative_eq};
use ndarray::Array3;
use psf_compute::{ComputeBackend, CpuBackend, SerialBackend};
use psf_core::generator::fill_volume;
use psf_core::normalize::normalize;
use psf_core::source::DEFAULT_OVERSAMPLING;
use psf_core::types::GridGeometry;
use psf_core::{ModelKind, PsfError, PsfModel, PsfSource};

// ─── Helpers ────────────────────────────────────────────────────────────────

/// The classic 32³ configuration: matched design and actual layers, NA 1.4,
/// 100x objective, 65 nm pixels and 200 nm z-steps.
fn reference_source() -> PsfSource {
    let mut source = PsfSource::new(ModelKind::GibsonLanni);
    let optics = source.optics_mut();
    optics.emission_wavelength_nm = 550.0;
    optics.numerical_aperture = 1.4;
    optics.magnification = 100.0;
    source.set_size([32, 32, 32]);
    source.set_spacing([65.0, 65.0, 200.0]);
    source.set_summed_intensity(1.0);
    source.set_oversampling(1);
    source.set_integration_order(50);
    source
}

fn small_source(kind: ModelKind) -> PsfSource {
    let mut source = PsfSource::new(kind);
    source.set_size([15, 15, 5]);
    source.set_spacing([65.0, 65.0, 250.0]);
    source.set_integration_order(40);
    source
}

/// A model that is dark everywhere.
struct Dark;

impl PsfModel for Dark {
    fn method_name(&self) -> &str {
        "dark"
    }

    fn compute_sample(&self, _point: [f64; 3]) -> f64 {
        0.0
    }

    fn pixel_footprint(&self) -> [f64; 2] {
        [1.0, 1.0]
    }

    fn oversampling(&self) -> usize {
        2
    }
}

// ─── End-to-end ─────────────────────────────────────────────────────────────

#[test]
fn test_reference_volume() {
    let volume = reference_source().generate().unwrap();
    assert_eq!(volume.data().dim(), (32, 32, 32));
    assert_abs_diff_eq!(volume.total_intensity(), 1.0, epsilon = 1e-9);

    // The emitter sits between voxels 15 and 16 on every axis, so the
    // central-axis profile peaks on one of the two nearest z-slices.
    let axial: Vec<f64> = (0..32).map(|iz| volume.value([15, 15, iz])).collect();
    let (iz_peak, _) = axial
        .iter()
        .enumerate()
        .fold((0, f64::MIN), |best, (i, &v)| if v > best.1 { (i, v) } else { best });
    assert!(iz_peak == 15 || iz_peak == 16, "axial peak at z = {iz_peak}");

    // Lateral decay inside the central Airy disc.
    let lateral: Vec<f64> = (16..=18).map(|ix| volume.value([ix, 15, iz_peak])).collect();
    assert!(lateral[0] > lateral[1] && lateral[1] > lateral[2], "{lateral:?}");

    let (peak_index, _) = volume.peak().unwrap();
    for axis in 0..3 {
        assert!(
            peak_index[axis] == 15 || peak_index[axis] == 16,
            "peak at {peak_index:?}"
        );
    }
}

#[test]
fn test_reference_volume_with_pixel_integration() {
    let mut source = reference_source();
    source.set_oversampling(DEFAULT_OVERSAMPLING);
    let volume = source.generate().unwrap();
    assert_abs_diff_eq!(volume.total_intensity(), 1.0, epsilon = 1e-9);

    let axial: Vec<f64> = (0..32).map(|iz| volume.value([15, 15, iz])).collect();
    let (iz_peak, _) = axial
        .iter()
        .enumerate()
        .fold((0, f64::MIN), |best, (i, &v)| if v > best.1 { (i, v) } else { best });
    assert!(iz_peak == 15 || iz_peak == 16, "axial peak at z = {iz_peak}");

    let lateral: Vec<f64> = (16..=18).map(|ix| volume.value([ix, 15, iz_peak])).collect();
    assert!(lateral[0] > lateral[1] && lateral[1] > lateral[2], "{lateral:?}");
}

#[test]
fn test_generate_is_idempotent() {
    let source = small_source(ModelKind::GibsonLanni);
    let a = source.generate_with(&SerialBackend).unwrap();
    let b = source.generate_with(&SerialBackend).unwrap();
    assert_eq!(a.data(), b.data());
}

// ─── Determinism across worker counts ───────────────────────────────────────

#[test]
fn test_worker_count_does_not_change_result() {
    let source = small_source(ModelKind::GibsonLanni);
    let reference = source.generate_with(&SerialBackend).unwrap();

    for threads in [1, 2, 4] {
        let backend = CpuBackend::with_threads(threads).unwrap();
        let volume = source.generate_with(&backend).unwrap();
        for (&a, &b) in reference.data().iter().zip(volume.data().iter()) {
            assert_relative_eq!(a, b, max_relative = 1e-9);
        }
    }
}

// ─── Symmetry ───────────────────────────────────────────────────────────────

fn assert_radially_symmetric(kind: ModelKind) {
    let volume = small_source(kind).generate_with(&SerialBackend).unwrap();
    let c = 7usize;
    for iz in 0..5 {
        for a in 1..=4usize {
            for b in 0..=a {
                let reference = volume.value([c + a, c + b, iz]);
                for v in [
                    volume.value([c - a, c + b, iz]),
                    volume.value([c + a, c - b, iz]),
                    volume.value([c + b, c + a, iz]),
                    volume.value([c - b, c - a, iz]),
                ] {
                    assert_relative_eq!(v, reference, max_relative = 1e-9);
                }
            }
        }
    }
}

#[test]
fn test_gibson_lanni_radial_symmetry() {
    assert_radially_symmetric(ModelKind::GibsonLanni);
}

#[test]
fn test_widefield_radial_symmetry() {
    assert_radially_symmetric(ModelKind::GeneralizedWidefield);
}

// ─── Normalization ──────────────────────────────────────────────────────────

#[test]
fn test_summed_intensity_target() {
    for target in [1.0, 250.0, 1e-3] {
        let mut source = small_source(ModelKind::ModifiedGibsonLanni);
        source.set_summed_intensity(target);
        let volume = source.generate_with(&SerialBackend).unwrap();
        assert_relative_eq!(volume.total_intensity(), target, max_relative = 1e-12);
    }
}

#[test]
fn test_dark_volume_is_returned_unchanged() {
    let geometry = GridGeometry::new([4, 3, 2], [65.0, 65.0, 100.0], [0.0; 3]);
    let backend = CpuBackend::with_threads(2).unwrap();
    let mut data = fill_volume(&Dark, &geometry, &backend).unwrap();
    let total = normalize(&mut data, 1.0, &backend);
    assert_eq!(total, 0.0);
    assert_eq!(data, Array3::<f64>::zeros((2, 3, 4)));
}

// ─── Models ─────────────────────────────────────────────────────────────────

#[test]
fn test_haeberle_volume_peaks_at_emitter() {
    let mut source = PsfSource::new(ModelKind::Haeberle);
    let optics = source.optics_mut();
    optics.specimen_ri_design = 1.515;
    optics.specimen_ri_actual = 1.515;
    optics.coverslip_ri_design = 1.515;
    optics.coverslip_ri_actual = 1.515;
    source.set_size([9, 9, 5]);
    source.set_spacing([65.0, 65.0, 200.0]);
    source.set_integration_order(40);

    let volume = source.generate_with(&CpuBackend::new()).unwrap();
    let (peak, value) = volume.peak().unwrap();
    assert_eq!(peak, [4, 4, 2]);
    assert!(value > 0.0);
    assert_abs_diff_eq!(volume.total_intensity(), 1.0, epsilon = 1e-9);
}

#[test]
fn test_every_model_generates_finite_volume() {
    for kind in ModelKind::ALL {
        let mut source = small_source(kind);
        source.set_size([7, 7, 3]);
        source.optics_mut().point_source_depth_actual_um = 5.0;
        let volume = source.generate_with(&SerialBackend).unwrap();
        assert!(
            volume.data().iter().all(|v| v.is_finite() && *v >= 0.0),
            "{kind}"
        );
    }
}

#[test]
fn test_point_center_moves_the_peak() {
    let mut source = small_source(ModelKind::GibsonLanni);
    source.set_size([15, 15, 5]);
    // Shift the emitter by two pixels in x; the grid follows it, so the
    // peak stays at the centre voxel and the physical peak moves.
    source.set_point_center([130.0, 0.0, 0.0]);
    let volume = source.generate_with(&SerialBackend).unwrap();
    let (peak, _) = volume.peak().unwrap();
    assert_eq!(peak, [7, 7, 2]);
    assert_abs_diff_eq!(volume.geometry().index_to_physical(peak)[0], 130.0, epsilon = 1e-9);
}

// ─── Validation ─────────────────────────────────────────────────────────────

#[test]
fn test_magnification_not_above_na_is_rejected() {
    let mut source = reference_source();
    source.optics_mut().magnification = 1.4;
    assert!(matches!(
        source.generate(),
        Err(PsfError::InvalidConfiguration(_))
    ));
}

#[test]
fn test_na_above_oil_index_is_rejected() {
    let mut source = reference_source();
    source.optics_mut().numerical_aperture = 1.6;
    assert!(matches!(
        source.generate(),
        Err(PsfError::InvalidConfiguration(_))
    ));
}

#[test]
fn test_negative_lobe_is_rejected() {
    let mut source = small_source(ModelKind::ModifiedGibsonLanni);
    source.gaussian_mut().intensity_scale = -2.0;
    assert!(matches!(
        source.generate_with(&SerialBackend),
        Err(PsfError::InvalidConfiguration(_))
    ));
}

#[test]
fn test_minimum_quadrature_order_still_generates() {
    let mut source = small_source(ModelKind::GibsonLanni);
    source.set_integration_order(0);
    let volume = source.generate_with(&SerialBackend).unwrap();
    assert!(volume.data().iter().all(|v| v.is_finite()));
    assert_abs_diff_eq!(volume.total_intensity(), 1.0, epsilon = 1e-9);
}

#[test]
fn test_backend_reports_serial_device() {
    assert_eq!(SerialBackend.device_info().compute_units, Some(1));
}
