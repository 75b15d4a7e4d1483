//! Run configuration
//!
//! Every field has a default, so a configuration file only needs the values that
//! differ. Command-line flags are applied on top of the file.

use ipccar5_core::errors::{Ar5Error, Ar5Result};
use ipccar5_core::sampling::SampleSpec;
use ipccar5_core::years::{ProjectionYears, Year};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Parameters of one glacier run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Unique identifier of this run, recorded in the global output
    pub pipeline_id: String,
    pub rng_seed: u64,
    pub pyear_start: Year,
    pub pyear_end: Year,
    pub pyear_step: Year,
    /// Number of method samples
    pub nmsamps: usize,
    /// Number of climate samples
    pub ntsamps: usize,
    /// Total number of samples, replaces `nmsamps` and `ntsamps` when set
    pub nsamps: Option<usize>,
    /// Number of sites localized at a time
    pub chunksize: usize,

    /// Integrated temperature inputs (JSON)
    pub temperature_file: PathBuf,
    /// Glacier fit parameters (TOML)
    pub fit_file: PathBuf,
    pub glacier_fraction_file: PathBuf,
    /// Tab-separated site list
    pub location_file: PathBuf,
    /// Directory holding `fprint_<region>.nc`
    pub fingerprint_dir: PathBuf,
    pub global_output_file: Option<PathBuf>,
    pub local_output_file: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        let years = ProjectionYears::default();
        Self {
            pipeline_id: "ipccar5-glaciers".to_string(),
            rng_seed: 1234,
            pyear_start: years.start,
            pyear_end: years.end,
            pyear_step: years.step,
            nmsamps: 1000,
            ntsamps: 450,
            nsamps: None,
            chunksize: 20,
            temperature_file: PathBuf::from("temperature.json"),
            fit_file: PathBuf::from("glacier_fit.toml"),
            glacier_fraction_file: PathBuf::from("glacier_fraction.txt"),
            location_file: PathBuf::from("location.lst"),
            fingerprint_dir: PathBuf::from("FPRINT"),
            global_output_file: None,
            local_output_file: None,
        }
    }
}

impl RunConfig {
    pub fn from_toml_str(content: &str) -> Ar5Result<Self> {
        toml::from_str(content)
            .map_err(|e| Ar5Error::Configuration(format!("invalid run configuration: {}", e)))
    }

    pub fn from_toml_file(path: &Path) -> Ar5Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Ar5Error::io(path, e))?;
        Self::from_toml_str(&content)
    }

    pub fn projection_years(&self) -> ProjectionYears {
        ProjectionYears::new(self.pyear_start, self.pyear_end, self.pyear_step)
    }

    pub fn sample_spec(&self) -> SampleSpec {
        match self.nsamps {
            Some(nsamps) => SampleSpec::Total(nsamps),
            None => SampleSpec::Factored {
                nmsamps: self.nmsamps,
                ntsamps: self.ntsamps,
            },
        }
    }
}
