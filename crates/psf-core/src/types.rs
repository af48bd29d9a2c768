//! Core types shared across the PSF engine.
//!
//! This module defines the physical parameter set consumed by every model,
//! the sampling grid with its recentering invariant, and the output volume.

use ndarray::Array3;
use serde::{Deserialize, Serialize};

use crate::error::PsfError;

/// Tube length of the classic (160 mm) microscope, in metres.
pub const CLASSIC_TUBE_LENGTH_M: f64 = 0.160;

/// Physical constants of the microscope and specimen for one generation pass.
///
/// Refractive indices are unitless, thicknesses and depths are micrometres,
/// detector distances are millimetres. Every layer except the immersion oil
/// thickness has a design value (what the objective was corrected for) and
/// an actual value (what is under the objective).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OpticalParams {
    /// Emission wavelength (nm).
    pub emission_wavelength_nm: f64,
    pub numerical_aperture: f64,
    pub magnification: f64,

    pub coverslip_ri_design: f64,
    pub coverslip_ri_actual: f64,
    /// Cover slip thickness (µm).
    pub coverslip_thickness_design_um: f64,
    /// Cover slip thickness (µm).
    pub coverslip_thickness_actual_um: f64,

    pub oil_ri_design: f64,
    pub oil_ri_actual: f64,
    /// Working distance of the objective in oil (µm). There is no actual
    /// counterpart: the focus position absorbs any change in oil thickness.
    pub oil_thickness_design_um: f64,

    pub specimen_ri_design: f64,
    pub specimen_ri_actual: f64,
    /// Depth of the point source below the cover slip (µm).
    pub point_source_depth_design_um: f64,
    /// Depth of the point source below the cover slip (µm).
    pub point_source_depth_actual_um: f64,

    /// Back focal plane to detector distance (mm), used by the generalized
    /// widefield model in place of the classic tube length.
    pub bfp_detector_distance_design_mm: f64,
    /// Back focal plane to detector distance (mm).
    pub bfp_detector_distance_actual_mm: f64,
    /// Insensitive border around each detector pixel along x and y (nm,
    /// specimen space).
    pub detector_border_width_nm: [f64; 2],
}

impl Default for OpticalParams {
    fn default() -> Self {
        Self {
            emission_wavelength_nm: 550.0,
            numerical_aperture: 1.4,
            magnification: 60.0,
            coverslip_ri_design: 1.522,
            coverslip_ri_actual: 1.522,
            coverslip_thickness_design_um: 170.0,
            coverslip_thickness_actual_um: 170.0,
            oil_ri_design: 1.515,
            oil_ri_actual: 1.515,
            oil_thickness_design_um: 100.0,
            specimen_ri_design: 1.33,
            specimen_ri_actual: 1.33,
            point_source_depth_design_um: 0.0,
            point_source_depth_actual_um: 0.0,
            bfp_detector_distance_design_mm: CLASSIC_TUBE_LENGTH_M * 1e3,
            bfp_detector_distance_actual_mm: CLASSIC_TUBE_LENGTH_M * 1e3,
            detector_border_width_nm: [0.0, 0.0],
        }
    }
}

impl OpticalParams {
    /// Vacuum wavenumber $k = 2\pi / \lambda$ (m⁻¹).
    pub fn wavenumber(&self) -> f64 {
        2.0 * std::f64::consts::PI / (self.emission_wavelength_nm * 1e-9)
    }

    /// Radius of the pupil in the back focal plane,
    /// $A = L \cdot NA / \sqrt{M^2 - NA^2}$ (m), for a tube length `L` (m).
    pub fn aperture_radius(&self, tube_length_m: f64) -> f64 {
        let na = self.numerical_aperture;
        let m = self.magnification;
        tube_length_m * na / (m * m - na * na).sqrt()
    }

    /// Check that the parameters describe a physically usable objective.
    pub fn validate(&self) -> Result<(), PsfError> {
        let finite = [
            ("emission_wavelength", self.emission_wavelength_nm),
            ("numerical_aperture", self.numerical_aperture),
            ("magnification", self.magnification),
            ("coverslip_ri_design", self.coverslip_ri_design),
            ("coverslip_ri_actual", self.coverslip_ri_actual),
            ("coverslip_thickness_design", self.coverslip_thickness_design_um),
            ("coverslip_thickness_actual", self.coverslip_thickness_actual_um),
            ("oil_ri_design", self.oil_ri_design),
            ("oil_ri_actual", self.oil_ri_actual),
            ("oil_thickness_design", self.oil_thickness_design_um),
            ("specimen_ri_design", self.specimen_ri_design),
            ("specimen_ri_actual", self.specimen_ri_actual),
            ("point_source_depth_design", self.point_source_depth_design_um),
            ("point_source_depth_actual", self.point_source_depth_actual_um),
            ("bfp_detector_distance_design", self.bfp_detector_distance_design_mm),
            ("bfp_detector_distance_actual", self.bfp_detector_distance_actual_mm),
            ("detector_border_width_x", self.detector_border_width_nm[0]),
            ("detector_border_width_y", self.detector_border_width_nm[1]),
        ];
        if let Some((name, value)) = finite.iter().find(|(_, v)| !v.is_finite()) {
            return Err(PsfError::InvalidConfiguration(format!(
                "{name} must be finite (got {value})"
            )));
        }

        if self.emission_wavelength_nm <= 0.0 {
            return Err(PsfError::InvalidConfiguration(format!(
                "emission wavelength must be positive (got {} nm)",
                self.emission_wavelength_nm
            )));
        }
        if self.numerical_aperture <= 0.0 {
            return Err(PsfError::InvalidConfiguration(format!(
                "numerical aperture must be positive (got {})",
                self.numerical_aperture
            )));
        }
        if self.magnification <= self.numerical_aperture {
            return Err(PsfError::InvalidConfiguration(format!(
                "magnification ({}) must exceed the numerical aperture ({})",
                self.magnification, self.numerical_aperture
            )));
        }

        let indices = [
            ("coverslip_ri_design", self.coverslip_ri_design),
            ("coverslip_ri_actual", self.coverslip_ri_actual),
            ("oil_ri_design", self.oil_ri_design),
            ("oil_ri_actual", self.oil_ri_actual),
            ("specimen_ri_design", self.specimen_ri_design),
            ("specimen_ri_actual", self.specimen_ri_actual),
        ];
        if let Some((name, n)) = indices.iter().find(|(_, n)| *n <= 0.0) {
            return Err(PsfError::InvalidConfiguration(format!(
                "refractive index {name} must be positive (got {n})"
            )));
        }
        if self.numerical_aperture >= self.oil_ri_actual
            || self.numerical_aperture >= self.oil_ri_design
        {
            return Err(PsfError::InvalidConfiguration(format!(
                "numerical aperture ({}) must be below the immersion oil index (design {}, actual {})",
                self.numerical_aperture, self.oil_ri_design, self.oil_ri_actual
            )));
        }

        let lengths = [
            ("coverslip_thickness_design", self.coverslip_thickness_design_um),
            ("coverslip_thickness_actual", self.coverslip_thickness_actual_um),
            ("oil_thickness_design", self.oil_thickness_design_um),
            ("point_source_depth_design", self.point_source_depth_design_um),
            ("point_source_depth_actual", self.point_source_depth_actual_um),
            ("detector_border_width_x", self.detector_border_width_nm[0]),
            ("detector_border_width_y", self.detector_border_width_nm[1]),
        ];
        if let Some((name, t)) = lengths.iter().find(|(_, t)| *t < 0.0) {
            return Err(PsfError::InvalidConfiguration(format!(
                "{name} must not be negative (got {t})"
            )));
        }
        if self.bfp_detector_distance_design_mm <= 0.0 || self.bfp_detector_distance_actual_mm <= 0.0 {
            return Err(PsfError::InvalidConfiguration(format!(
                "back focal plane to detector distances must be positive (design {} mm, actual {} mm)",
                self.bfp_detector_distance_design_mm, self.bfp_detector_distance_actual_mm
            )));
        }

        Ok(())
    }
}

/// Parameters of the empirical Gaussian lobe added by the modified
/// Gibson-Lanni model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GaussianLobe {
    /// Offset of the lobe centre from the point source (nm).
    pub center_nm: [f64; 3],
    /// Standard deviation along each axis (nm).
    pub sigma_nm: [f64; 3],
    /// Peak value of the lobe relative to the peak of the diffraction term.
    pub intensity_scale: f64,
}

impl Default for GaussianLobe {
    fn default() -> Self {
        Self {
            center_nm: [0.0, 0.0, 0.0],
            sigma_nm: [200.0, 200.0, 600.0],
            intensity_scale: 0.05,
        }
    }
}

impl GaussianLobe {
    /// Lobe value at `offset` (nm) from the point source.
    pub fn evaluate(&self, offset: [f64; 3]) -> f64 {
        let exponent: f64 = (0..3)
            .map(|i| {
                let d = (offset[i] - self.center_nm[i]) / self.sigma_nm[i];
                d * d
            })
            .sum();
        self.intensity_scale * (-0.5 * exponent).exp()
    }

    pub fn validate(&self) -> Result<(), PsfError> {
        if self.center_nm.iter().chain(self.sigma_nm.iter()).any(|v| !v.is_finite())
            || !self.intensity_scale.is_finite()
        {
            return Err(PsfError::InvalidConfiguration(
                "Gaussian lobe parameters must be finite".into(),
            ));
        }
        if self.sigma_nm.iter().any(|&s| s <= 0.0) {
            return Err(PsfError::InvalidConfiguration(format!(
                "Gaussian sigma must be positive on every axis (got {:?} nm)",
                self.sigma_nm
            )));
        }
        if self.intensity_scale < 0.0 {
            return Err(PsfError::InvalidConfiguration(format!(
                "Gaussian intensity scale must not be negative (got {})",
                self.intensity_scale
            )));
        }
        Ok(())
    }
}

/// Sampling grid of a PSF volume.
///
/// The origin is never set directly: it is recomputed from size, spacing and
/// point centre whenever one of them changes, so that the geometric centre of
/// the grid always lands on the point centre:
///
/// $\text{origin} = -\tfrac{1}{2}(\text{size} - 1)\,\text{spacing} + \text{pointCenter}$
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridGeometry {
    size: [usize; 3],
    spacing: [f64; 3],
    point_center: [f64; 3],
    origin: [f64; 3],
}

impl Default for GridGeometry {
    fn default() -> Self {
        Self::new([32, 32, 32], [65.0, 65.0, 100.0], [0.0, 0.0, 0.0])
    }
}

impl GridGeometry {
    /// Create a grid of `size` voxels with `spacing` nm/voxel, centred on
    /// `point_center` (nm).
    pub fn new(size: [usize; 3], spacing: [f64; 3], point_center: [f64; 3]) -> Self {
        let mut geometry = Self {
            size,
            spacing,
            point_center,
            origin: [0.0; 3],
        };
        geometry.recenter();
        geometry
    }

    pub fn size(&self) -> [usize; 3] {
        self.size
    }

    pub fn spacing(&self) -> [f64; 3] {
        self.spacing
    }

    pub fn point_center(&self) -> [f64; 3] {
        self.point_center
    }

    /// Physical position of voxel `(0, 0, 0)` (nm).
    pub fn origin(&self) -> [f64; 3] {
        self.origin
    }

    pub fn set_size(&mut self, size: [usize; 3]) {
        self.size = size;
        self.recenter();
    }

    pub fn set_spacing(&mut self, spacing: [f64; 3]) {
        self.spacing = spacing;
        self.recenter();
    }

    pub fn set_point_center(&mut self, point_center: [f64; 3]) {
        self.point_center = point_center;
        self.recenter();
    }

    fn recenter(&mut self) {
        for i in 0..3 {
            let extent = self.size[i].saturating_sub(1) as f64;
            self.origin[i] = -0.5 * extent * self.spacing[i] + self.point_center[i];
        }
    }

    /// Total number of voxels.
    pub fn voxel_count(&self) -> usize {
        self.size.iter().product()
    }

    /// Physical position (nm) of the voxel at `[ix, iy, iz]`.
    pub fn index_to_physical(&self, index: [usize; 3]) -> [f64; 3] {
        [
            self.origin[0] + index[0] as f64 * self.spacing[0],
            self.origin[1] + index[1] as f64 * self.spacing[1],
            self.origin[2] + index[2] as f64 * self.spacing[2],
        ]
    }

    pub fn validate(&self) -> Result<(), PsfError> {
        if self.size.iter().any(|&n| n == 0) {
            return Err(PsfError::InvalidConfiguration(format!(
                "grid size must be at least one voxel on every axis (got {:?})",
                self.size
            )));
        }
        let fits = self
            .size
            .iter()
            .try_fold(std::mem::size_of::<f64>(), |bytes, &n| bytes.checked_mul(n))
            .is_some_and(|bytes| bytes <= isize::MAX as usize);
        if !fits {
            return Err(PsfError::InvalidConfiguration(format!(
                "grid of {:?} voxels is too large to allocate",
                self.size
            )));
        }
        if self.spacing.iter().any(|&s| !s.is_finite() || s <= 0.0) {
            return Err(PsfError::InvalidConfiguration(format!(
                "grid spacing must be positive and finite (got {:?} nm)",
                self.spacing
            )));
        }
        if self.point_center.iter().any(|c| !c.is_finite()) {
            return Err(PsfError::InvalidConfiguration(format!(
                "point center must be finite (got {:?} nm)",
                self.point_center
            )));
        }
        Ok(())
    }
}

/// A generated PSF: a 3D intensity grid and the geometry it was sampled on.
///
/// The volume is immutable once produced. Downstream consumers read it and
/// must request a new generation after any parameter change.
#[derive(Debug, Clone)]
pub struct PsfVolume {
    /// Intensities laid out `[z, y, x]`.
    data: Array3<f64>,
    geometry: GridGeometry,
}

impl PsfVolume {
    pub(crate) fn new(data: Array3<f64>, geometry: GridGeometry) -> Self {
        Self { data, geometry }
    }

    /// Intensities laid out `[z, y, x]`.
    pub fn data(&self) -> &Array3<f64> {
        &self.data
    }

    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    /// Intensity of the voxel at `[ix, iy, iz]`.
    pub fn value(&self, index: [usize; 3]) -> f64 {
        self.data[[index[2], index[1], index[0]]]
    }

    /// Sum of all voxel intensities.
    pub fn total_intensity(&self) -> f64 {
        self.data.sum()
    }

    /// Index `[ix, iy, iz]` and value of the brightest voxel, or `None` for an
    /// empty volume.
    pub fn peak(&self) -> Option<([usize; 3], f64)> {
        self.data
            .indexed_iter()
            .fold(None, |best: Option<([usize; 3], f64)>, ((iz, iy, ix), &v)| match best {
                Some((_, b)) if b >= v => best,
                _ => Some(([ix, iy, iz], v)),
            })
    }

    pub fn into_parts(self) -> (Array3<f64>, GridGeometry) {
        (self.data, self.geometry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_recentering_places_center_voxel_on_point_center() {
        let sizes = [[1, 1, 1], [2, 5, 8], [31, 32, 33], [64, 17, 3]];
        let spacings = [[65.0, 65.0, 200.0], [10.0, 33.3, 1.5]];
        let centers = [[0.0, 0.0, 0.0], [120.0, -40.0, 7.5]];

        for size in sizes {
            for spacing in spacings {
                for center in centers {
                    let g = GridGeometry::new(size, spacing, center);
                    for axis in 0..3 {
                        let mid = (size[axis] - 1) as f64 / 2.0;
                        let pos = g.origin()[axis] + mid * spacing[axis];
                        assert_abs_diff_eq!(pos, center[axis], epsilon = 1e-9);

                        let rounded = ((size[axis] - 1) / 2) as f64;
                        let pos = g.origin()[axis] + rounded * spacing[axis];
                        assert!((pos - center[axis]).abs() <= 0.5 * spacing[axis] + 1e-9);
                    }
                }
            }
        }
    }

    #[test]
    fn test_setters_recenter() {
        let mut g = GridGeometry::new([11, 11, 11], [10.0, 10.0, 10.0], [0.0; 3]);
        assert_eq!(g.origin(), [-50.0, -50.0, -50.0]);

        g.set_size([21, 11, 11]);
        assert_eq!(g.origin()[0], -100.0);

        g.set_spacing([10.0, 20.0, 10.0]);
        assert_eq!(g.origin()[1], -100.0);

        g.set_point_center([5.0, 0.0, -5.0]);
        assert_eq!(g.origin(), [-95.0, -100.0, -55.0]);
        assert_eq!(g.index_to_physical([10, 5, 5]), [5.0, 0.0, -5.0]);
    }

    #[test]
    fn test_aperture_radius_classic() {
        let p = OpticalParams {
            numerical_aperture: 1.4,
            magnification: 100.0,
            ..Default::default()
        };
        let expected = 0.160 * 1.4 / (100.0f64 * 100.0 - 1.96).sqrt();
        assert_abs_diff_eq!(p.aperture_radius(CLASSIC_TUBE_LENGTH_M), expected, epsilon = 1e-15);
        assert_abs_diff_eq!(p.wavenumber(), 2.0 * std::f64::consts::PI / 550e-9, epsilon = 1e-3);
    }

    #[test]
    fn test_validation_rejects_magnification_below_na() {
        let p = OpticalParams {
            numerical_aperture: 1.4,
            magnification: 1.4,
            ..Default::default()
        };
        assert!(matches!(p.validate(), Err(PsfError::InvalidConfiguration(_))));
        assert!(OpticalParams::default().validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_na_above_oil_index() {
        let p = OpticalParams {
            numerical_aperture: 1.6,
            ..Default::default()
        };
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_gaussian_lobe_peak_and_falloff() {
        let lobe = GaussianLobe {
            center_nm: [10.0, 0.0, 0.0],
            sigma_nm: [100.0, 100.0, 300.0],
            intensity_scale: 0.5,
        };
        assert_abs_diff_eq!(lobe.evaluate([10.0, 0.0, 0.0]), 0.5, epsilon = 1e-15);
        let one_sigma = lobe.evaluate([110.0, 0.0, 0.0]);
        assert_abs_diff_eq!(one_sigma, 0.5 * (-0.5f64).exp(), epsilon = 1e-15);
        assert_abs_diff_eq!(lobe.evaluate([10.0, 0.0, 300.0]), one_sigma, epsilon = 1e-15);
    }

    #[test]
    fn test_gaussian_lobe_rejects_negative_scale() {
        let lobe = GaussianLobe {
            intensity_scale: -2.0,
            ..Default::default()
        };
        assert!(matches!(lobe.validate(), Err(PsfError::InvalidConfiguration(_))));
        let dark = GaussianLobe {
            intensity_scale: 0.0,
            ..Default::default()
        };
        assert!(dark.validate().is_ok());
    }

    #[test]
    fn test_grid_rejects_unallocatable_size() {
        let huge = GridGeometry::new([usize::MAX, 2, 2], [65.0, 65.0, 100.0], [0.0; 3]);
        assert!(matches!(huge.validate(), Err(PsfError::InvalidConfiguration(_))));
        let wide = GridGeometry::new([1 << 30, 1 << 30, 1 << 10], [65.0, 65.0, 100.0], [0.0; 3]);
        assert!(wide.validate().is_err());
        assert!(GridGeometry::default().validate().is_ok());
    }

    #[test]
    fn test_volume_peak_and_value_indexing() {
        let geometry = GridGeometry::new([3, 2, 2], [1.0; 3], [0.0; 3]);
        let mut data = Array3::zeros((2, 2, 3));
        data[[1, 0, 2]] = 4.0;
        data[[0, 1, 0]] = 1.0;
        let volume = PsfVolume::new(data, geometry);
        assert_eq!(volume.value([2, 0, 1]), 4.0);
        assert_eq!(volume.peak(), Some(([2, 0, 1], 4.0)));
        assert_eq!(volume.total_intensity(), 5.0);
    }
}
