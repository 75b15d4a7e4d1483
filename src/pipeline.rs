//! End-to-end glacier run
//!
//! Inputs are read once, the projection and localization are computed in memory and
//! the optional outputs are written as they become available.

use crate::config::RunConfig;
use crate::io::netcdf::{write_global, FingerprintDirectory, LocalWriter};
use crate::io::{read_locations, read_temperature};
use ipccar5_core::errors::Ar5Result;
use ipccar5_core::localize::{LocalEnsemble, Localizer, RegionalEnsemble, SiteFingerprints};
use ipccar5_core::sampling::SampleCounts;
use ipccar5_core::spatial::{FingerprintSource, Site};
use ipccar5_core::years::Year;
use ipccar5_glaciers::postprocess::{local_header, localize_glaciers, GlobalDataset};
use ipccar5_glaciers::{
    project_glaciers, GlacierFit, ProjectionEnsemble, RegionalFractions, TemperatureInputs,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::PathBuf;
use tracing::info;

/// What a run produced
#[derive(Clone, Debug, PartialEq)]
pub struct RunSummary {
    pub scenario: String,
    pub counts: SampleCounts,
    pub years: Vec<Year>,
    pub region_names: Vec<String>,
    pub n_sites: usize,
    pub global_output_file: Option<PathBuf>,
    pub local_output_file: Option<PathBuf>,
}

/// Global and regional projections of one run
#[derive(Clone, Debug, PartialEq)]
pub struct GlacierProjection {
    pub global: ProjectionEnsemble,
    pub regional: RegionalEnsemble,
}

/// Project glaciers from inputs already in memory
///
/// A fresh generator is seeded from `rng_seed` for every call.
pub fn project(
    config: &RunConfig,
    temperature: &TemperatureInputs,
    fit: &GlacierFit,
    fractions: &RegionalFractions,
) -> Ar5Result<GlacierProjection> {
    let targets = config.projection_years().years()?;
    let temperature = temperature.subset_to(&targets)?;

    let mut rng = ChaCha8Rng::seed_from_u64(config.rng_seed);
    let global = project_glaciers(&temperature, fit, config.sample_spec(), &mut rng)?;
    let regional = fractions.disaggregate(&global)?;
    Ok(GlacierProjection { global, regional })
}

/// Localize a regional projection entirely in memory
pub fn localize_in_memory<F: FingerprintSource + ?Sized>(
    config: &RunConfig,
    regional: &RegionalEnsemble,
    sites: &[Site],
    source: &F,
) -> Ar5Result<LocalEnsemble> {
    let mut local = LocalEnsemble::zeros(regional.nsamps(), regional.years().clone(), sites.to_vec());
    localize_glaciers(regional, sites, source, config.chunksize, &mut local)?;
    Ok(local)
}

/// Run the glacier workflow described by `config`
///
/// Reads the temperature, fit and fraction inputs, writes the global output, then
/// localizes to every site in the location file and streams the result to the local
/// output. Localization is skipped when no local output file is configured.
pub fn run_glaciers(config: &RunConfig) -> Ar5Result<RunSummary> {
    let temperature = read_temperature(&config.temperature_file)?;
    let fit = GlacierFit::from_toml_file(&config.fit_file)?;
    let fractions = RegionalFractions::from_file(&config.glacier_fraction_file)?;
    info!(
        scenario = temperature.scenario(),
        methods = fit.n_methods(),
        regions = fractions.n_regions(),
        "Loaded glacier inputs"
    );

    let projection = project(config, &temperature, &fit, &fractions)?;
    if let Some(path) = &config.global_output_file {
        let dataset = GlobalDataset::new(
            &projection.global,
            temperature.scenario(),
            temperature.base_year(),
            &config.pipeline_id,
        );
        write_global(path, &dataset)?;
    }

    let mut n_sites = 0;
    if let Some(path) = &config.local_output_file {
        let sites = read_locations(&config.location_file)?;
        n_sites = sites.len();
        let header = local_header(
            &projection.regional,
            &sites,
            temperature.scenario(),
            temperature.base_year(),
        );
        // Every fingerprint is read before the output file is created
        let localizer = Localizer::new(config.chunksize)?;
        let source = FingerprintDirectory::new(&config.fingerprint_dir);
        let fingerprints =
            SiteFingerprints::load(projection.regional.region_names(), &sites, &source)?;
        let mut writer = LocalWriter::create(path, &header)?;
        localizer.localize_into(&projection.regional, &fingerprints, &mut writer)?;
        info!(path = %path.display(), sites = n_sites, "Wrote local glacier projection");
    }

    Ok(RunSummary {
        scenario: temperature.scenario().to_string(),
        counts: projection.global.counts(),
        years: projection.global.years().years().to_vec(),
        region_names: projection.regional.region_names().to_vec(),
        n_sites,
        global_output_file: config.global_output_file.clone(),
        local_output_file: config.local_output_file.clone(),
    })
}
