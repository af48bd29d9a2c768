//! Named-parameter surface used by property editors and persistence.
//!
//! Every model exposes an ordered table of parameters. A parameter's index
//! is its position in that table: indices `0..COMMON.len()` are the same for
//! every model, model-specific parameters follow. The table never reorders,
//! so an index is a stable handle for a given model kind.

use std::fmt;

use serde::Serialize;

use crate::models::ModelKind;

/// Physical unit of a parameter, for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Unit {
    Unitless,
    Nanometers,
    Micrometers,
    Millimeters,
}

impl Unit {
    pub fn symbol(self) -> &'static str {
        match self {
            Unit::Unitless => "",
            Unit::Nanometers => "nm",
            Unit::Micrometers => "µm",
            Unit::Millimeters => "mm",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Every configurable quantity of any model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parameter {
    SizeX,
    SizeY,
    SizeZ,
    SpacingX,
    SpacingY,
    SpacingZ,
    PointCenterX,
    PointCenterY,
    PointCenterZ,
    EmissionWavelength,
    NumericalAperture,
    Magnification,
    CoverslipRiDesign,
    CoverslipRiActual,
    CoverslipThicknessDesign,
    CoverslipThicknessActual,
    OilRiDesign,
    OilRiActual,
    OilThicknessDesign,
    SpecimenRiDesign,
    SpecimenRiActual,
    PointSourceDepthDesign,
    PointSourceDepthActual,
    SummedIntensity,
    IntegrationOrder,
    PixelOversampling,
    GaussianCenterX,
    GaussianCenterY,
    GaussianCenterZ,
    GaussianSigmaX,
    GaussianSigmaY,
    GaussianSigmaZ,
    GaussianIntensityScale,
    BfpDetectorDistanceDesign,
    BfpDetectorDistanceActual,
    DetectorBorderWidthX,
    DetectorBorderWidthY,
}

/// Parameters shared by all models, in index order.
pub const COMMON: [Parameter; 26] = [
    Parameter::SizeX,
    Parameter::SizeY,
    Parameter::SizeZ,
    Parameter::SpacingX,
    Parameter::SpacingY,
    Parameter::SpacingZ,
    Parameter::PointCenterX,
    Parameter::PointCenterY,
    Parameter::PointCenterZ,
    Parameter::EmissionWavelength,
    Parameter::NumericalAperture,
    Parameter::Magnification,
    Parameter::CoverslipRiDesign,
    Parameter::CoverslipRiActual,
    Parameter::CoverslipThicknessDesign,
    Parameter::CoverslipThicknessActual,
    Parameter::OilRiDesign,
    Parameter::OilRiActual,
    Parameter::OilThicknessDesign,
    Parameter::SpecimenRiDesign,
    Parameter::SpecimenRiActual,
    Parameter::PointSourceDepthDesign,
    Parameter::PointSourceDepthActual,
    Parameter::SummedIntensity,
    Parameter::IntegrationOrder,
    Parameter::PixelOversampling,
];

/// Extra parameters of the modified Gibson-Lanni model.
pub const GAUSSIAN: [Parameter; 7] = [
    Parameter::GaussianCenterX,
    Parameter::GaussianCenterY,
    Parameter::GaussianCenterZ,
    Parameter::GaussianSigmaX,
    Parameter::GaussianSigmaY,
    Parameter::GaussianSigmaZ,
    Parameter::GaussianIntensityScale,
];

/// Extra parameters of the generalized widefield model.
pub const DETECTOR: [Parameter; 4] = [
    Parameter::BfpDetectorDistanceDesign,
    Parameter::BfpDetectorDistanceActual,
    Parameter::DetectorBorderWidthX,
    Parameter::DetectorBorderWidthY,
];

impl Parameter {
    /// `(name, label, unit)` of the parameter.
    fn describe(self) -> (&'static str, &'static str, Unit) {
        use Parameter::*;
        use Unit::*;
        match self {
            SizeX => ("size_x", "X size (voxels)", Unitless),
            SizeY => ("size_y", "Y size (voxels)", Unitless),
            SizeZ => ("size_z", "Z size (voxels)", Unitless),
            SpacingX => ("spacing_x", "X spacing", Nanometers),
            SpacingY => ("spacing_y", "Y spacing", Nanometers),
            SpacingZ => ("spacing_z", "Z spacing", Nanometers),
            PointCenterX => ("point_center_x", "X point center", Nanometers),
            PointCenterY => ("point_center_y", "Y point center", Nanometers),
            PointCenterZ => ("point_center_z", "Z point center", Nanometers),
            EmissionWavelength => ("emission_wavelength", "Emission wavelength", Nanometers),
            NumericalAperture => ("numerical_aperture", "Numerical aperture", Unitless),
            Magnification => ("magnification", "Magnification", Unitless),
            CoverslipRiDesign => ("coverslip_ri_design", "Cover slip refractive index (design)", Unitless),
            CoverslipRiActual => ("coverslip_ri_actual", "Cover slip refractive index (actual)", Unitless),
            CoverslipThicknessDesign => ("coverslip_thickness_design", "Cover slip thickness (design)", Micrometers),
            CoverslipThicknessActual => ("coverslip_thickness_actual", "Cover slip thickness (actual)", Micrometers),
            OilRiDesign => ("oil_ri_design", "Immersion oil refractive index (design)", Unitless),
            OilRiActual => ("oil_ri_actual", "Immersion oil refractive index (actual)", Unitless),
            OilThicknessDesign => ("oil_thickness_design", "Immersion oil thickness (design)", Micrometers),
            SpecimenRiDesign => ("specimen_ri_design", "Specimen refractive index (design)", Unitless),
            SpecimenRiActual => ("specimen_ri_actual", "Specimen refractive index (actual)", Unitless),
            PointSourceDepthDesign => ("point_source_depth_design", "Point source depth in specimen (design)", Micrometers),
            PointSourceDepthActual => ("point_source_depth_actual", "Point source depth in specimen (actual)", Micrometers),
            SummedIntensity => ("summed_intensity", "Summed intensity", Unitless),
            IntegrationOrder => ("integration_order", "Integration order", Unitless),
            PixelOversampling => ("pixel_oversampling", "Pixel oversampling", Unitless),
            GaussianCenterX => ("gaussian_center_x", "Gaussian X center offset", Nanometers),
            GaussianCenterY => ("gaussian_center_y", "Gaussian Y center offset", Nanometers),
            GaussianCenterZ => ("gaussian_center_z", "Gaussian Z center offset", Nanometers),
            GaussianSigmaX => ("gaussian_sigma_x", "Gaussian X sigma", Nanometers),
            GaussianSigmaY => ("gaussian_sigma_y", "Gaussian Y sigma", Nanometers),
            GaussianSigmaZ => ("gaussian_sigma_z", "Gaussian Z sigma", Nanometers),
            GaussianIntensityScale => ("gaussian_intensity_scale", "Gaussian intensity scale", Unitless),
            BfpDetectorDistanceDesign => ("bfp_detector_distance_design", "Back focal plane to detector distance (design)", Millimeters),
            BfpDetectorDistanceActual => ("bfp_detector_distance_actual", "Back focal plane to detector distance (actual)", Millimeters),
            DetectorBorderWidthX => ("detector_border_width_x", "Detector X border width", Nanometers),
            DetectorBorderWidthY => ("detector_border_width_y", "Detector Y border width", Nanometers),
        }
    }

    /// Stable key used for lookup and persistence.
    pub fn name(self) -> &'static str {
        self.describe().0
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        self.describe().1
    }

    pub fn unit(self) -> Unit {
        self.describe().2
    }

    /// Parameters that only accept whole numbers.
    pub fn is_integral(self) -> bool {
        matches!(
            self,
            Parameter::SizeX
                | Parameter::SizeY
                | Parameter::SizeZ
                | Parameter::IntegrationOrder
                | Parameter::PixelOversampling
        )
    }
}

/// Ordered parameter table of a model.
pub fn parameters_for(kind: ModelKind) -> Vec<Parameter> {
    let extras: &[Parameter] = match kind {
        ModelKind::GibsonLanni | ModelKind::Haeberle => &[],
        ModelKind::ModifiedGibsonLanni => &GAUSSIAN,
        ModelKind::GeneralizedWidefield => &DETECTOR,
    };
    COMMON.iter().chain(extras).copied().collect()
}

/// Look up a parameter of `kind` by name.
pub fn find(kind: ModelKind, name: &str) -> Option<(usize, Parameter)> {
    parameters_for(kind)
        .into_iter()
        .enumerate()
        .find(|(_, p)| p.name() == name)
}

/// One row of a model's parameter table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterInfo {
    pub index: usize,
    pub name: &'static str,
    pub label: &'static str,
    pub unit: Unit,
    pub value: f64,
}
