//! AR5 glacier projection command
//!
//! # Usage
//!
//! ```bash
//! ipccar5 glaciers --config run.toml --nsamps 2000 \
//!   --global-output-file gslr.nc --local-output-file lslr.nc
//! ```
//!
//! Log verbosity follows `RUST_LOG` and defaults to `info`.

use clap::{Args, Parser, Subcommand};
use ipccar5::{run_glaciers, RunConfig};
use ipccar5_core::errors::Ar5Result;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ipccar5")]
#[command(about = "IPCC AR5 sea-level contributions for the FACTS framework")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Project and localize the glacier contribution
    Glaciers(GlacierArgs),
}

/// Every flag overrides the matching value of the configuration file
#[derive(Args, Debug)]
struct GlacierArgs {
    /// TOML run configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Unique identifier for this instance of the module
    #[arg(long)]
    pipeline_id: Option<String>,

    /// Seed value for the random number generator
    #[arg(long)]
    rng_seed: Option<u64>,

    /// Projection start year
    #[arg(long)]
    pyear_start: Option<i32>,

    /// Projection end year
    #[arg(long)]
    pyear_end: Option<i32>,

    /// Projection year step
    #[arg(long)]
    pyear_step: Option<i32>,

    /// Number of method samples to generate
    #[arg(long)]
    nmsamps: Option<usize>,

    /// Number of climate samples to generate
    #[arg(long)]
    ntsamps: Option<usize>,

    /// Total number of samples to generate (replaces nmsamps and ntsamps)
    #[arg(long)]
    nsamps: Option<usize>,

    /// Number of locations to process at a time
    #[arg(long)]
    chunksize: Option<usize>,

    /// Integrated temperature inputs (JSON)
    #[arg(long)]
    temperature_file: Option<PathBuf>,

    /// Glacier fit parameters (TOML)
    #[arg(long)]
    fit_file: Option<PathBuf>,

    /// Regional glacier fractions
    #[arg(long)]
    glacier_fraction_file: Option<PathBuf>,

    /// File with the name, id, lat and lon of the points to localize to
    #[arg(long)]
    location_file: Option<PathBuf>,

    /// Directory of `fprint_<region>.nc` files
    #[arg(long)]
    fingerprint_dir: Option<PathBuf>,

    /// Path of the global output file
    #[arg(long)]
    global_output_file: Option<PathBuf>,

    /// Path of the local output file
    #[arg(long)]
    local_output_file: Option<PathBuf>,
}

impl GlacierArgs {
    fn into_config(self) -> Ar5Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::from_toml_file(path)?,
            None => RunConfig::default(),
        };

        macro_rules! apply {
            ($($field:ident),* $(,)?) => {
                $(if let Some(value) = self.$field {
                    config.$field = value;
                })*
            };
        }
        apply!(
            pipeline_id,
            rng_seed,
            pyear_start,
            pyear_end,
            pyear_step,
            nmsamps,
            ntsamps,
            chunksize,
            temperature_file,
            fit_file,
            glacier_fraction_file,
            location_file,
            fingerprint_dir,
        );
        if self.nsamps.is_some() {
            config.nsamps = self.nsamps;
        }
        if self.global_output_file.is_some() {
            config.global_output_file = self.global_output_file;
        }
        if self.local_output_file.is_some() {
            config.local_output_file = self.local_output_file;
        }
        Ok(config)
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Glaciers(args) => args.into_config().and_then(|config| run_glaciers(&config)),
    };

    match result {
        Ok(summary) => {
            info!(
                scenario = %summary.scenario,
                nsamps = summary.counts.nsamps,
                years = summary.years.len(),
                regions = summary.region_names.len(),
                sites = summary.n_sites,
                "Glacier run complete"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
