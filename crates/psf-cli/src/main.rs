//! PSF generator command-line interface.
//!
//! Generate point-spread functions from TOML job files:
//! ```sh
//! psf-cli run job.toml
//! psf-cli run job.toml --attributes saved.psf
//! psf-cli validate job.toml
//! psf-cli models
//! psf-cli params widefield -o widefield.psf
//! ```

mod config;
mod runner;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use psf_core::{ModelKind, PsfSource};

#[derive(Parser)]
#[command(name = "psf-cli")]
#[command(about = "Widefield fluorescence point-spread function generator")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a PSF volume from a TOML job file.
    Run {
        /// Path to the job configuration file.
        config: PathBuf,
        /// Output directory (overrides config file setting).
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Attribute file applied on top of the job configuration.
        #[arg(short, long)]
        attributes: Option<PathBuf>,
    },
    /// Validate a job file, including its optical parameters, without
    /// generating.
    Validate {
        /// Path to the job configuration file.
        config: PathBuf,
    },
    /// List the available models and their parameter tables.
    Models,
    /// Print the default attribute file of a model.
    Params {
        /// Model key: gibson-lanni, haeberle, modified-gibson-lanni, widefield.
        model: String,
        /// Write to a file instead of standard output.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            output,
            attributes,
        } => {
            println!("PSF Generator");
            println!("=============");
            let job = config::load_config(&config)
                .with_context(|| format!("Failed to load {}", config.display()))?;
            println!("Configuration: {}", config.display());

            let result = runner::run_generation(&job, attributes.as_deref())?;

            // Determine output directory
            let out_dir = output.unwrap_or_else(|| PathBuf::from(&job.output.directory));

            if job.output.save_csv {
                let csv_path = out_dir.join("psf.csv");
                runner::write_volume_csv(&result.volume, &csv_path, &result.source)?;
            }

            if job.output.save_json {
                let json_path = out_dir.join("psf.json");
                runner::write_metadata_json(&result, &json_path)?;
            }

            if job.output.save_attributes {
                let attr_path = out_dir.join("psf.attributes");
                runner::write_attributes(&result.source, &attr_path)?;
            }

            println!("Generation complete.");
            Ok(())
        }
        Commands::Validate { config } => {
            let job = config::load_config(&config)
                .with_context(|| format!("Failed to load {}", config.display()))?;
            let source = runner::build_source(&job, None)?;
            source
                .snapshot()
                .with_context(|| format!("Invalid parameters in {}", config.display()))?;
            println!("Configuration is valid: {}", config.display());
            Ok(())
        }
        Commands::Models => {
            println!("Available models:");
            for kind in ModelKind::ALL {
                let source = PsfSource::new(kind);
                println!();
                println!("  {} — {}", kind.key(), kind.label());
                for p in source.parameters() {
                    println!(
                        "    {:>2}  {:<30} {:>12} {:<3}  {}",
                        p.index,
                        p.name,
                        p.value,
                        p.unit.symbol(),
                        p.label
                    );
                }
            }
            Ok(())
        }
        Commands::Params { model, output } => {
            let kind: ModelKind = model.parse()?;
            let source = PsfSource::new(kind);
            match output {
                Some(path) => runner::write_attributes(&source, &path)?,
                None => print!("{}", source.to_attributes()),
            }
            Ok(())
        }
    }
}
