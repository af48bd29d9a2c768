//! TOML configuration deserialisation for PSF generation jobs.
//!
//! Every key has a default equal to the engine default, so the smallest
//! valid job is
//!
//! ```toml
//! [model]
//! kind = "gibson-lanni"
//! ```

use serde::Deserialize;

use psf_core::models::ModelKind;
use psf_core::quadrature::DEFAULT_INTEGRATION_ORDER;
use psf_core::source::DEFAULT_OVERSAMPLING;
use psf_core::{GaussianLobe, OpticalParams};

/// Top-level job configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobConfig {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub optics: OpticalParams,
    #[serde(default)]
    pub grid: GridConfig,
    /// Lobe of the modified Gibson-Lanni model; ignored by other models.
    #[serde(default)]
    pub gaussian: GaussianLobe,
    /// Detector geometry of the generalized widefield model. Overrides the
    /// matching `[optics]` keys when present.
    #[serde(default)]
    pub detector: Option<DetectorConfig>,
    #[serde(default)]
    pub compute: ComputeConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Model selection and numerical settings.
#[derive(Debug, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub kind: ModelKind,
    /// Simpson subinterval pairs over the pupil (default: 100).
    #[serde(default = "default_integration_order")]
    pub integration_order: usize,
    /// Sub-samples per lateral axis for pixel integration (default: 3).
    #[serde(default = "default_oversampling")]
    pub oversampling: usize,
    /// Target sum of all voxels after normalization (default: 1.0).
    #[serde(default = "default_summed_intensity")]
    pub summed_intensity: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            kind: ModelKind::default(),
            integration_order: default_integration_order(),
            oversampling: default_oversampling(),
            summed_intensity: default_summed_intensity(),
        }
    }
}

fn default_integration_order() -> usize {
    DEFAULT_INTEGRATION_ORDER
}
fn default_oversampling() -> usize {
    DEFAULT_OVERSAMPLING
}
fn default_summed_intensity() -> f64 {
    1.0
}

/// Sampling grid, in voxels and nanometres.
#[derive(Debug, Deserialize)]
pub struct GridConfig {
    #[serde(default = "default_size")]
    pub size: [usize; 3],
    #[serde(default = "default_spacing")]
    pub spacing: [f64; 3],
    #[serde(default)]
    pub point_center: [f64; 3],
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            size: default_size(),
            spacing: default_spacing(),
            point_center: [0.0; 3],
        }
    }
}

fn default_size() -> [usize; 3] {
    [32, 32, 32]
}
fn default_spacing() -> [f64; 3] {
    [65.0, 65.0, 100.0]
}

/// Detector geometry for the generalized widefield model.
#[derive(Debug, Deserialize)]
pub struct DetectorConfig {
    /// Design back focal plane to detector distance in mm.
    pub bfp_distance_design_mm: Option<f64>,
    /// Actual back focal plane to detector distance in mm.
    pub bfp_distance_actual_mm: Option<f64>,
    /// Insensitive border of each pixel along x and y, in nm.
    pub border_width_nm: Option<[f64; 2]>,
}

/// Compute backend selection.
#[derive(Debug, Deserialize)]
pub struct ComputeConfig {
    /// `"cpu"` (default) or `"serial"`.
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Worker threads for the CPU backend. Default: all cores.
    #[serde(default)]
    pub threads: Option<usize>,
}

impl Default for ComputeConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            threads: None,
        }
    }
}

fn default_backend() -> String {
    "cpu".into()
}

/// Output configuration.
#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    /// Output directory (default: "./output").
    #[serde(default = "default_output_dir")]
    pub directory: String,
    /// Whether to save the volume as CSV (default: true).
    #[serde(default = "default_true")]
    pub save_csv: bool,
    /// Whether to save volume metadata as JSON (default: true).
    #[serde(default = "default_true")]
    pub save_json: bool,
    /// Whether to save the parameter attribute file (default: true).
    #[serde(default = "default_true")]
    pub save_attributes: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            save_csv: true,
            save_json: true,
            save_attributes: true,
        }
    }
}

fn default_output_dir() -> String {
    "./output".into()
}
fn default_true() -> bool {
    true
}

/// Parse a TOML job configuration.
pub fn parse_config(content: &str) -> anyhow::Result<JobConfig> {
    let config: JobConfig = toml::from_str(content)?;
    Ok(config)
}

/// Load and parse a TOML job configuration file.
pub fn load_config(path: &std::path::Path) -> anyhow::Result<JobConfig> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}
