//! Python bindings
//!
//! ```python
//! from ipccar5._lib import project_glaciers, localize
//!
//! gsl = project_glaciers(years, mean, samples, [(3.39, 0.722, 0.15)], 0.0085, 0.3157, 1000)
//! lsl = localize(gsl[:, None, :] * fractions, fingerprints, years)
//! ```

use ipccar5_glaciers::{
    GlacierFit, GlacierMethod, HistoricalOffset, MassBalanceConstants, TemperatureInputs,
};
use ipccar5_core::errors::Ar5Error;
use ipccar5_core::localize::{Localizer, RegionalEnsemble, SiteFingerprints};
use ipccar5_core::sampling::SampleSpec;
use ipccar5_core::spatial::Site;
use ipccar5_core::years::YearAxis;
use numpy::{IntoPyArray, PyArray2, PyArray3, PyReadonlyArray1, PyReadonlyArray2, PyReadonlyArray3};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn value_error(e: Ar5Error) -> PyErr {
    PyValueError::new_err(e.to_string())
}

/// Project the global glacier contribution (mm), shape (samples, years)
///
/// Each method is a `(factor, exponent, cvgl)` tuple.
#[pyfunction]
#[pyo3(signature = (years, mean, samples, methods, historical_offset, mass_limit, nsamps, rng_seed=1234))]
#[allow(clippy::too_many_arguments)]
fn project_glaciers<'py>(
    py: Python<'py>,
    years: Vec<i32>,
    mean: PyReadonlyArray1<'py, f64>,
    samples: PyReadonlyArray2<'py, f64>,
    methods: Vec<(f64, f64, f64)>,
    historical_offset: f64,
    mass_limit: f64,
    nsamps: usize,
    rng_seed: u64,
) -> PyResult<Bound<'py, PyArray2<f64>>> {
    let temperature = TemperatureInputs::new(
        "python",
        0,
        YearAxis::new(years).map_err(value_error)?,
        mean.as_array().to_owned(),
        samples.as_array().to_owned(),
    )
    .map_err(value_error)?;
    let fit = GlacierFit::new(
        methods
            .into_iter()
            .enumerate()
            .map(|(i, (factor, exponent, cvgl))| {
                GlacierMethod::new(&format!("method {}", i), factor, exponent, cvgl)
            })
            .collect(),
        MassBalanceConstants {
            historical_offset: HistoricalOffset::Uniform(historical_offset),
            mass_limit,
        },
    )
    .map_err(value_error)?;

    let mut rng = ChaCha8Rng::seed_from_u64(rng_seed);
    let ensemble = ipccar5_glaciers::project_glaciers(
        &temperature,
        &fit,
        SampleSpec::Total(nsamps),
        &mut rng,
    )
    .map_err(value_error)?;
    Ok(ensemble.into_values().into_pyarray_bound(py))
}

/// Fingerprint-weighted sum over regions
///
/// `regional` has shape (samples, regions, years) and `fingerprints` (regions, sites).
/// Returns (samples, years, sites).
#[pyfunction]
#[pyo3(signature = (regional, fingerprints, years, chunksize=20))]
fn localize<'py>(
    py: Python<'py>,
    regional: PyReadonlyArray3<'py, f64>,
    fingerprints: PyReadonlyArray2<'py, f64>,
    years: Vec<i32>,
    chunksize: usize,
) -> PyResult<Bound<'py, PyArray3<f64>>> {
    let regional = regional.as_array().to_owned();
    let fingerprints = fingerprints.as_array().to_owned();
    let names: Vec<String> = (0..regional.dim().1).map(|r| r.to_string()).collect();
    let sites: Vec<Site> = (0..fingerprints.ncols())
        .map(|k| Site::new(&k.to_string(), k as i64, f64::NAN, f64::NAN))
        .collect();

    let ensemble = RegionalEnsemble::new(names.clone(), YearAxis::new(years).map_err(value_error)?, regional)
        .map_err(value_error)?;
    let fingerprints = SiteFingerprints::new(names, fingerprints).map_err(value_error)?;
    let local = py
        .allow_threads(|| {
            Localizer::new(chunksize)?.localize(&ensemble, &sites, &fingerprints)
        })
        .map_err(value_error)?;
    Ok(local.into_values().into_pyarray_bound(py))
}

#[pymodule]
#[pyo3(name = "_lib")]
fn ipccar5(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    m.add_function(wrap_pyfunction!(project_glaciers, m)?)?;
    m.add_function(wrap_pyfunction!(localize, m)?)?;
    Ok(())
}
