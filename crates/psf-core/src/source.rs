//! The live, editable PSF configuration.
//!
//! A [`PsfSource`] owns one parameter set, one sampling grid and the
//! normalisation target of a single model. Editors mutate it freely; a
//! generation pass copies it into an immutable [`Snapshot`] first, so edits
//! made while a pass runs are never observed by the workers.

use psf_compute::{ComputeBackend, CpuBackend};

use crate::error::PsfError;
use crate::generator::GenerationPass;
use crate::models::{ModelKind, OpticalConstants, Snapshot};
use crate::parameters::{self, Parameter, ParameterInfo};
use crate::quadrature::DEFAULT_INTEGRATION_ORDER;
use crate::types::{GaussianLobe, GridGeometry, OpticalParams, PsfVolume};

/// Default sub-samples per lateral axis for pixel integration.
pub const DEFAULT_OVERSAMPLING: usize = 3;

/// Editable configuration of one PSF model.
#[derive(Debug, Clone, PartialEq)]
pub struct PsfSource {
    kind: ModelKind,
    optics: OpticalParams,
    geometry: GridGeometry,
    gaussian: GaussianLobe,
    summed_intensity: f64,
    integration_order: usize,
    oversampling: usize,
}

impl Default for PsfSource {
    fn default() -> Self {
        Self::new(ModelKind::default())
    }
}

impl PsfSource {
    /// Create a source for `kind` with default parameters.
    pub fn new(kind: ModelKind) -> Self {
        Self {
            kind,
            optics: OpticalParams::default(),
            geometry: GridGeometry::default(),
            gaussian: GaussianLobe::default(),
            summed_intensity: 1.0,
            integration_order: DEFAULT_INTEGRATION_ORDER,
            oversampling: DEFAULT_OVERSAMPLING,
        }
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    /// Switch model. Shared parameters keep their values.
    pub fn set_kind(&mut self, kind: ModelKind) {
        self.kind = kind;
    }

    pub fn optics(&self) -> &OpticalParams {
        &self.optics
    }

    pub fn optics_mut(&mut self) -> &mut OpticalParams {
        &mut self.optics
    }

    pub fn set_optics(&mut self, optics: OpticalParams) {
        self.optics = optics;
    }

    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    pub fn set_geometry(&mut self, geometry: GridGeometry) {
        self.geometry = geometry;
    }

    pub fn set_size(&mut self, size: [usize; 3]) {
        self.geometry.set_size(size);
    }

    pub fn set_spacing(&mut self, spacing: [f64; 3]) {
        self.geometry.set_spacing(spacing);
    }

    pub fn set_point_center(&mut self, point_center: [f64; 3]) {
        self.geometry.set_point_center(point_center);
    }

    pub fn gaussian(&self) -> &GaussianLobe {
        &self.gaussian
    }

    pub fn gaussian_mut(&mut self) -> &mut GaussianLobe {
        &mut self.gaussian
    }

    pub fn summed_intensity(&self) -> f64 {
        self.summed_intensity
    }

    pub fn set_summed_intensity(&mut self, summed_intensity: f64) {
        self.summed_intensity = summed_intensity;
    }

    pub fn integration_order(&self) -> usize {
        self.integration_order
    }

    pub fn set_integration_order(&mut self, order: usize) {
        self.integration_order = order;
    }

    pub fn oversampling(&self) -> usize {
        self.oversampling
    }

    pub fn set_oversampling(&mut self, oversampling: usize) {
        self.oversampling = oversampling;
    }

    /// The ordered parameter table of this model, with current values.
    pub fn parameters(&self) -> Vec<ParameterInfo> {
        parameters::parameters_for(self.kind)
            .into_iter()
            .enumerate()
            .map(|(index, p)| ParameterInfo {
                index,
                name: p.name(),
                label: p.label(),
                unit: p.unit(),
                value: self.value_of(p),
            })
            .collect()
    }

    /// Value of the parameter called `name`.
    pub fn get(&self, name: &str) -> Result<f64, PsfError> {
        let (_, p) = self.lookup(name)?;
        Ok(self.value_of(p))
    }

    /// Set the parameter called `name`.
    pub fn set(&mut self, name: &str, value: f64) -> Result<(), PsfError> {
        let (_, p) = self.lookup(name)?;
        self.assign(p, value)
    }

    /// Value of the parameter at `index` in this model's table.
    pub fn get_by_index(&self, index: usize) -> Result<f64, PsfError> {
        let p = self.parameter_at(index)?;
        Ok(self.value_of(p))
    }

    /// Set the parameter at `index` in this model's table.
    pub fn set_by_index(&mut self, index: usize, value: f64) -> Result<(), PsfError> {
        let p = self.parameter_at(index)?;
        self.assign(p, value)
    }

    fn lookup(&self, name: &str) -> Result<(usize, Parameter), PsfError> {
        parameters::find(self.kind, name).ok_or_else(|| PsfError::UnknownParameter(name.to_string()))
    }

    fn parameter_at(&self, index: usize) -> Result<Parameter, PsfError> {
        parameters::parameters_for(self.kind)
            .get(index)
            .copied()
            .ok_or_else(|| PsfError::UnknownParameter(format!("#{index} for {}", self.kind)))
    }

    fn value_of(&self, p: Parameter) -> f64 {
        use Parameter::*;
        let o = &self.optics;
        let g = &self.gaussian;
        let size = self.geometry.size();
        let spacing = self.geometry.spacing();
        let center = self.geometry.point_center();
        match p {
            SizeX => size[0] as f64,
            SizeY => size[1] as f64,
            SizeZ => size[2] as f64,
            SpacingX => spacing[0],
            SpacingY => spacing[1],
            SpacingZ => spacing[2],
            PointCenterX => center[0],
            PointCenterY => center[1],
            PointCenterZ => center[2],
            EmissionWavelength => o.emission_wavelength_nm,
            NumericalAperture => o.numerical_aperture,
            Magnification => o.magnification,
            CoverslipRiDesign => o.coverslip_ri_design,
            CoverslipRiActual => o.coverslip_ri_actual,
            CoverslipThicknessDesign => o.coverslip_thickness_design_um,
            CoverslipThicknessActual => o.coverslip_thickness_actual_um,
            OilRiDesign => o.oil_ri_design,
            OilRiActual => o.oil_ri_actual,
            OilThicknessDesign => o.oil_thickness_design_um,
            SpecimenRiDesign => o.specimen_ri_design,
            SpecimenRiActual => o.specimen_ri_actual,
            PointSourceDepthDesign => o.point_source_depth_design_um,
            PointSourceDepthActual => o.point_source_depth_actual_um,
            SummedIntensity => self.summed_intensity,
            IntegrationOrder => self.integration_order as f64,
            PixelOversampling => self.oversampling as f64,
            GaussianCenterX => g.center_nm[0],
            GaussianCenterY => g.center_nm[1],
            GaussianCenterZ => g.center_nm[2],
            GaussianSigmaX => g.sigma_nm[0],
            GaussianSigmaY => g.sigma_nm[1],
            GaussianSigmaZ => g.sigma_nm[2],
            GaussianIntensityScale => g.intensity_scale,
            BfpDetectorDistanceDesign => o.bfp_detector_distance_design_mm,
            BfpDetectorDistanceActual => o.bfp_detector_distance_actual_mm,
            DetectorBorderWidthX => o.detector_border_width_nm[0],
            DetectorBorderWidthY => o.detector_border_width_nm[1],
        }
    }

    /// Write one parameter. Values only have to be finite here; physical
    /// consistency is checked when a snapshot is taken.
    fn assign(&mut self, p: Parameter, value: f64) -> Result<(), PsfError> {
        use Parameter::*;

        let invalid = |reason: &str| PsfError::InvalidParameterValue {
            name: p.name().to_string(),
            value,
            reason: reason.to_string(),
        };
        if !value.is_finite() {
            return Err(invalid("value must be finite"));
        }
        let count = if p.is_integral() {
            if value < 0.0 || value.fract() != 0.0 {
                return Err(invalid("value must be a non-negative whole number"));
            }
            value as usize
        } else {
            0
        };

        let mut size = self.geometry.size();
        let mut spacing = self.geometry.spacing();
        let mut center = self.geometry.point_center();
        let o = &mut self.optics;
        let g = &mut self.gaussian;
        match p {
            SizeX | SizeY | SizeZ => {
                if count == 0 {
                    return Err(invalid("size must be at least one voxel"));
                }
                size[p as usize - SizeX as usize] = count;
                self.geometry.set_size(size);
            }
            SpacingX | SpacingY | SpacingZ => {
                spacing[p as usize - SpacingX as usize] = value;
                self.geometry.set_spacing(spacing);
            }
            PointCenterX | PointCenterY | PointCenterZ => {
                center[p as usize - PointCenterX as usize] = value;
                self.geometry.set_point_center(center);
            }
            EmissionWavelength => o.emission_wavelength_nm = value,
            NumericalAperture => o.numerical_aperture = value,
            Magnification => o.magnification = value,
            CoverslipRiDesign => o.coverslip_ri_design = value,
            CoverslipRiActual => o.coverslip_ri_actual = value,
            CoverslipThicknessDesign => o.coverslip_thickness_design_um = value,
            CoverslipThicknessActual => o.coverslip_thickness_actual_um = value,
            OilRiDesign => o.oil_ri_design = value,
            OilRiActual => o.oil_ri_actual = value,
            OilThicknessDesign => o.oil_thickness_design_um = value,
            SpecimenRiDesign => o.specimen_ri_design = value,
            SpecimenRiActual => o.specimen_ri_actual = value,
            PointSourceDepthDesign => o.point_source_depth_design_um = value,
            PointSourceDepthActual => o.point_source_depth_actual_um = value,
            SummedIntensity => self.summed_intensity = value,
            IntegrationOrder => self.integration_order = count,
            PixelOversampling => {
                if count == 0 {
                    return Err(invalid("oversampling must be at least 1"));
                }
                self.oversampling = count;
            }
            GaussianCenterX => g.center_nm[0] = value,
            GaussianCenterY => g.center_nm[1] = value,
            GaussianCenterZ => g.center_nm[2] = value,
            GaussianSigmaX => g.sigma_nm[0] = value,
            GaussianSigmaY => g.sigma_nm[1] = value,
            GaussianSigmaZ => g.sigma_nm[2] = value,
            GaussianIntensityScale => g.intensity_scale = value,
            BfpDetectorDistanceDesign => o.bfp_detector_distance_design_mm = value,
            BfpDetectorDistanceActual => o.bfp_detector_distance_actual_mm = value,
            DetectorBorderWidthX => o.detector_border_width_nm[0] = value,
            DetectorBorderWidthY => o.detector_border_width_nm[1] = value,
        }
        Ok(())
    }

    /// Validate the configuration and freeze it into an immutable snapshot.
    pub fn snapshot(&self) -> Result<Snapshot, PsfError> {
        self.optics.validate()?;
        self.geometry.validate()?;
        if self.kind == ModelKind::ModifiedGibsonLanni {
            self.gaussian.validate()?;
        }
        if !self.summed_intensity.is_finite() || self.summed_intensity <= 0.0 {
            return Err(PsfError::InvalidConfiguration(format!(
                "summed intensity must be positive and finite (got {})",
                self.summed_intensity
            )));
        }
        if self.oversampling == 0 {
            return Err(PsfError::InvalidConfiguration(
                "pixel oversampling must be at least 1".into(),
            ));
        }

        let constants = OpticalConstants::derive(self.kind, &self.optics);
        if !constants.aperture_radius.is_finite() || !constants.k.is_finite() {
            return Err(PsfError::InvalidConfiguration(format!(
                "derived pupil radius is not finite (NA {}, magnification {})",
                self.optics.numerical_aperture, self.optics.magnification
            )));
        }

        Ok(Snapshot {
            kind: self.kind,
            optics: self.optics,
            constants,
            geometry: self.geometry.clone(),
            gaussian: self.gaussian,
            summed_intensity: self.summed_intensity,
            integration_order: self.integration_order,
            oversampling: self.oversampling,
        })
    }

    /// Generate the PSF volume on all CPU threads.
    pub fn generate(&self) -> Result<PsfVolume, PsfError> {
        self.generate_with(&CpuBackend::new())
    }

    /// Generate the PSF volume on the given backend.
    pub fn generate_with(&self, backend: &dyn ComputeBackend) -> Result<PsfVolume, PsfError> {
        let mut pass = GenerationPass::new();
        pass.freeze(self)?;
        pass.run(backend)
    }
}
