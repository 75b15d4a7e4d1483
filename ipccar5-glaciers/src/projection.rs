//! Monte Carlo glacier projection
//!
//! Every realization is driven by its own integrated-temperature trajectory and
//! evaluated with the single method it was allocated to. Method uncertainty enters as
//! one standard-normal draw per realization, scaled by the method's ensemble-mean
//! projection, so it is fully correlated across years.

use crate::melt::M_TO_MM;
use crate::parameters::GlacierFit;
use crate::temperature::TemperatureInputs;
use ipccar5_core::errors::{Ar5Error, Ar5Result};
use ipccar5_core::sampling::{SampleAllocation, SampleCounts, SampleSpec};
use ipccar5_core::years::YearAxis;
use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use tracing::{debug, info};

/// Global glacier contribution for every realization
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectionEnsemble {
    years: YearAxis,
    /// Shape (samples × years)
    /// unit: mm
    values: Array2<f64>,
    allocation: SampleAllocation,
    counts: SampleCounts,
}

impl ProjectionEnsemble {
    pub fn years(&self) -> &YearAxis {
        &self.years
    }

    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    pub fn sample(&self, index: usize) -> ArrayView1<'_, f64> {
        self.values.row(index)
    }

    pub fn allocation(&self) -> &SampleAllocation {
        &self.allocation
    }

    pub fn counts(&self) -> SampleCounts {
        self.counts
    }

    pub fn nsamps(&self) -> usize {
        self.values.nrows()
    }

    pub fn into_values(self) -> Array2<f64> {
        self.values
    }
}

/// Project the global glacier contribution
///
/// `temperature` must already be restricted to the projection years. Randomness is
/// drawn from `rng` in a fixed order: the allocation first, then one uncertainty draw
/// per realization, method by method in allocation order.
///
/// # Errors
///
/// * [`Ar5Error::Configuration`] if the sample counts cannot be resolved against the
///   number of methods, or the temperature ensemble has fewer trajectories than
///   realizations requested.
/// * [`Ar5Error::DataAlignment`] if the historical offset does not cover the data years.
pub fn project_glaciers<R: Rng + ?Sized>(
    temperature: &TemperatureInputs,
    fit: &GlacierFit,
    spec: SampleSpec,
    rng: &mut R,
) -> Ar5Result<ProjectionEnsemble> {
    let counts = spec.resolve(fit.n_methods())?;
    let nsamps = counts.nsamps;
    if temperature.n_samples() < nsamps {
        return Err(Ar5Error::Configuration(format!(
            "{} realizations requested but only {} temperature samples are available",
            nsamps,
            temperature.n_samples()
        )));
    }
    info!(
        nsamps,
        nmsamps = counts.nmsamps,
        ntsamps = counts.ntsamps,
        methods = fit.n_methods(),
        scenario = temperature.scenario(),
        "Projecting glacier contribution"
    );

    let years = temperature.data_years().clone();
    let offset = fit.mass_balance.historical_offset.along(&years)?;
    let allocation = SampleAllocation::draw(nsamps, fit.n_methods(), rng)?;

    // m SLE until the final conversion
    let mut values = Array2::from_elem((nsamps, years.len()), f64::NAN);
    for (index, samples) in allocation.iter() {
        let method = &fit.methods[index];
        let mean = method.project(temperature.mean());
        let spread = &mean * method.method_uncertainty_coefficient;

        for &sample in samples {
            let z: f64 = StandardNormal.sample(rng);
            let mut row = values.row_mut(sample);
            row.assign(&method.project(temperature.sample(sample)));
            row.scaled_add(z, &spread);
        }
        debug!(method = index, name = %method.name, samples = samples.len(), "Projected method");
    }

    values += &offset.insert_axis(Axis(0));
    let capped = cap_at(&mut values, fit.mass_balance.mass_limit);
    if capped > 0 {
        info!(
            capped,
            mass_limit = fit.mass_balance.mass_limit,
            "Capped projections at the available glacier mass"
        );
    }
    values.mapv_inplace(|v| v * M_TO_MM);

    Ok(ProjectionEnsemble {
        years,
        values,
        allocation,
        counts,
    })
}

/// Clamp every value above `limit` to exactly `limit`, returning how many changed
fn cap_at(values: &mut Array2<f64>, limit: f64) -> usize {
    let mut capped = 0;
    values.map_inplace(|v| {
        if *v > limit {
            *v = limit;
            capped += 1;
        }
    });
    capped
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn cap_is_exact_and_local() {
        let mut values = array![[0.1, 0.5, 0.2], [0.31, 0.3, 0.29]];
        let capped = cap_at(&mut values, 0.3);
        assert_eq!(capped, 2);
        assert_eq!(values, array![[0.1, 0.3, 0.2], [0.3, 0.3, 0.29]]);
    }

    #[test]
    fn cap_leaves_nan() {
        let mut values = array![[f64::NAN, 1.0]];
        assert_eq!(cap_at(&mut values, 0.5), 1);
        assert!(values[[0, 0]].is_nan());
        assert_eq!(values[[0, 1]], 0.5);
    }
}
