//! Generation runner: builds the PSF source from a job, runs it, and writes
//! the results.

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use serde::Serialize;

use psf_compute::{ComputeBackend, CpuBackend, SerialBackend};
use psf_core::parameters::ParameterInfo;
use psf_core::persistence::apply_attributes;
use psf_core::{GridGeometry, ModelKind, PsfSource, PsfVolume};

use crate::config::{ComputeConfig, JobConfig};

/// Results from a generation run.
pub struct RunOutput {
    pub source: PsfSource,
    pub volume: PsfVolume,
    pub backend: String,
    pub elapsed: Duration,
}

/// Volume metadata written next to the voxel data.
#[derive(Serialize)]
struct VolumeMetadata<'a> {
    model: ModelKind,
    method: &'static str,
    geometry: &'a GridGeometry,
    total_intensity: f64,
    peak_index: Option<[usize; 3]>,
    peak_value: Option<f64>,
    backend: &'a str,
    elapsed_seconds: f64,
    parameters: Vec<ParameterInfo>,
}

/// Build the PSF source described by a job.
///
/// `attributes`, when given, is an attribute file applied on top of the job.
pub fn build_source(job: &JobConfig, attributes: Option<&Path>) -> Result<PsfSource> {
    let mut source = PsfSource::new(job.model.kind);

    let mut optics = job.optics;
    if let Some(detector) = &job.detector {
        if let Some(d) = detector.bfp_distance_design_mm {
            optics.bfp_detector_distance_design_mm = d;
        }
        if let Some(d) = detector.bfp_distance_actual_mm {
            optics.bfp_detector_distance_actual_mm = d;
        }
        if let Some(border) = detector.border_width_nm {
            optics.detector_border_width_nm = border;
        }
    }
    source.set_optics(optics);
    source.set_geometry(GridGeometry::new(
        job.grid.size,
        job.grid.spacing,
        job.grid.point_center,
    ));
    *source.gaussian_mut() = job.gaussian;
    source.set_integration_order(job.model.integration_order);
    source.set_oversampling(job.model.oversampling);
    source.set_summed_intensity(job.model.summed_intensity);

    if let Some(path) = attributes {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read attribute file {}", path.display()))?;
        let applied = apply_attributes(&mut source, &text)
            .with_context(|| format!("Invalid attribute file {}", path.display()))?;
        println!("  Applied {} attributes from {}", applied, path.display());
    }

    Ok(source)
}

/// Run a full generation from a parsed job configuration.
pub fn run_generation(job: &JobConfig, attributes: Option<&Path>) -> Result<RunOutput> {
    log::debug!("Job configuration: {:?}", job);
    let source = build_source(job, attributes)?;
    let backend = create_backend(&job.compute)?;
    let info = backend.device_info();

    let [nx, ny, nz] = source.geometry().size();
    println!(
        "Model: {} ({}x{}x{} voxels, order {}, oversampling {})",
        source.kind().label(),
        nx,
        ny,
        nz,
        source.integration_order(),
        source.oversampling()
    );
    println!("Backend: {}", info.name);

    let start = Instant::now();
    let volume = source
        .generate_with(backend.as_ref())
        .context("PSF generation failed")?;
    let elapsed = start.elapsed();

    if let Some((index, value)) = volume.peak() {
        println!("  Peak {:.6e} at voxel {:?}", value, index);
    }
    println!(
        "  Total intensity {:.6e} ({:.2} s)",
        volume.total_intensity(),
        elapsed.as_secs_f64()
    );

    Ok(RunOutput {
        source,
        volume,
        backend: info.name,
        elapsed,
    })
}

/// Write the volume as CSV, one voxel per row, x fastest.
pub fn write_volume_csv(volume: &PsfVolume, path: &Path, source: &PsfSource) -> Result<()> {
    use std::io::{BufWriter, Write};

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let mut file = BufWriter::new(file);

    let geometry = volume.geometry();
    let optics = source.optics();
    writeln!(file, "# PSF volume: {}", source.kind().label())?;
    writeln!(file, "# Version: {}", env!("CARGO_PKG_VERSION"))?;
    writeln!(
        file,
        "# wavelength: {} nm, NA: {}, magnification: {}",
        optics.emission_wavelength_nm, optics.numerical_aperture, optics.magnification
    )?;
    writeln!(file, "# size: {:?}", geometry.size())?;
    writeln!(file, "# spacing: {:?} nm", geometry.spacing())?;
    writeln!(file, "# origin: {:?} nm", geometry.origin())?;
    writeln!(file, "#")?;
    writeln!(file, "x_nm,y_nm,z_nm,intensity")?;

    for ((iz, iy, ix), value) in volume.data().indexed_iter() {
        let [x, y, z] = geometry.index_to_physical([ix, iy, iz]);
        writeln!(file, "{:.4},{:.4},{:.4},{:.6e}", x, y, z, value)?;
    }
    file.flush()?;

    println!("Volume written to: {}", path.display());
    Ok(())
}

/// Write volume metadata and the parameter table as JSON.
pub fn write_metadata_json(output: &RunOutput, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let peak = output.volume.peak();
    let metadata = VolumeMetadata {
        model: output.source.kind(),
        method: output.source.kind().label(),
        geometry: output.volume.geometry(),
        total_intensity: output.volume.total_intensity(),
        peak_index: peak.map(|(index, _)| index),
        peak_value: peak.map(|(_, value)| value),
        backend: &output.backend,
        elapsed_seconds: output.elapsed.as_secs_f64(),
        parameters: output.source.parameters(),
    };
    let json = serde_json::to_string_pretty(&metadata)
        .map_err(|e| anyhow::anyhow!("JSON serialisation error: {}", e))?;
    std::fs::write(path, json)?;

    println!("Metadata (JSON) written to: {}", path.display());
    Ok(())
}

/// Write the attribute-style parameter file of `source`.
pub fn write_attributes(source: &PsfSource, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, source.to_attributes())
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("Parameters written to: {}", path.display());
    Ok(())
}

/// Create a compute backend from the `[compute]` section.
///
/// - `"serial"` — single-threaded reference backend.
/// - `"cpu"` (default) — Rayon thread pool, `threads` workers or all cores.
fn create_backend(config: &ComputeConfig) -> Result<Box<dyn ComputeBackend>> {
    match config.backend.as_str() {
        "serial" => Ok(Box::new(SerialBackend)),
        "cpu" | "auto" => match config.threads {
            Some(n) => Ok(Box::new(CpuBackend::with_threads(n)?)),
            None => Ok(Box::new(CpuBackend::new())),
        },
        other => anyhow::bail!("Unknown backend '{}'. Valid backends: cpu, serial", other),
    }
}
