//! Integrated-temperature inputs
//!
//! Produced by the preprocessing stage: the ensemble-mean integrated temperature and
//! one integrated-temperature trajectory per climate sample, all on the same year axis.

use ipccar5_core::errors::{Ar5Error, Ar5Result};
use ipccar5_core::years::{Year, YearAxis};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Integrated temperature statistics for one scenario
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(try_from = "TemperatureRecord")]
pub struct TemperatureInputs {
    scenario: String,
    base_year: Year,
    data_years: YearAxis,
    mean_integrated_temperature: Array1<f64>,
    /// Shape (samples × years)
    sample_integrated_temperature: Array2<f64>,
}

impl TemperatureInputs {
    pub fn new(
        scenario: &str,
        base_year: Year,
        data_years: YearAxis,
        mean_integrated_temperature: Array1<f64>,
        sample_integrated_temperature: Array2<f64>,
    ) -> Ar5Result<Self> {
        if mean_integrated_temperature.len() != data_years.len() {
            return Err(Ar5Error::alignment(
                "mean integrated temperature",
                format!(
                    "{} values for {} data years",
                    mean_integrated_temperature.len(),
                    data_years.len()
                ),
            ));
        }
        if sample_integrated_temperature.ncols() != data_years.len() {
            return Err(Ar5Error::alignment(
                "sample integrated temperature",
                format!(
                    "{} values per sample for {} data years",
                    sample_integrated_temperature.ncols(),
                    data_years.len()
                ),
            ));
        }
        Ok(Self {
            scenario: scenario.to_string(),
            base_year,
            data_years,
            mean_integrated_temperature,
            sample_integrated_temperature,
        })
    }

    pub fn scenario(&self) -> &str {
        &self.scenario
    }

    pub fn base_year(&self) -> Year {
        self.base_year
    }

    pub fn data_years(&self) -> &YearAxis {
        &self.data_years
    }

    pub fn mean(&self) -> ArrayView1<'_, f64> {
        self.mean_integrated_temperature.view()
    }

    /// Trajectory of climate sample `index`
    pub fn sample(&self, index: usize) -> ArrayView1<'_, f64> {
        self.sample_integrated_temperature.row(index)
    }

    /// Number of climate samples available
    pub fn n_samples(&self) -> usize {
        self.sample_integrated_temperature.nrows()
    }

    /// Restrict every array to the data years that are members of `targets`
    ///
    /// Target years without data are skipped with a warning.
    ///
    /// # Errors
    ///
    /// [`Ar5Error::DataAlignment`] if none of the target years has data.
    pub fn subset_to(&self, targets: &[Year]) -> Ar5Result<Self> {
        let (years, indices) = self.data_years.subset(targets);
        if years.is_empty() {
            return Err(Ar5Error::alignment(
                "temperature",
                format!(
                    "none of the projection years {:?} is covered by data years {}..={}",
                    targets,
                    self.data_years.years().first().copied().unwrap_or_default(),
                    self.data_years.years().last().copied().unwrap_or_default()
                ),
            ));
        }

        let missing: Vec<Year> = targets
            .iter()
            .copied()
            .filter(|y| !years.contains(*y))
            .collect();
        if !missing.is_empty() {
            warn!(?missing, "Projection years without temperature data are skipped");
        }

        Ok(Self {
            scenario: self.scenario.clone(),
            base_year: self.base_year,
            data_years: years,
            mean_integrated_temperature: self.mean_integrated_temperature.select(Axis(0), &indices),
            sample_integrated_temperature: self
                .sample_integrated_temperature
                .select(Axis(1), &indices),
        })
    }
}

/// Serialized form of [`TemperatureInputs`] with nested per-sample lists
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TemperatureRecord {
    pub scenario: String,
    pub base_year: Year,
    pub data_years: Vec<Year>,
    pub mean_integrated_temperature: Vec<f64>,
    pub sample_integrated_temperature: Vec<Vec<f64>>,
}

impl TryFrom<TemperatureRecord> for TemperatureInputs {
    type Error = Ar5Error;

    fn try_from(record: TemperatureRecord) -> Ar5Result<Self> {
        let n_years = record.data_years.len();
        let n_samples = record.sample_integrated_temperature.len();
        if let Some((i, row)) = record
            .sample_integrated_temperature
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != n_years)
        {
            return Err(Ar5Error::alignment(
                "sample integrated temperature",
                format!("sample {} has {} values for {} data years", i, row.len(), n_years),
            ));
        }

        let samples = Array2::from_shape_vec(
            (n_samples, n_years),
            record
                .sample_integrated_temperature
                .into_iter()
                .flatten()
                .collect(),
        )
        .map_err(|e| Ar5Error::Error(e.to_string()))?;

        TemperatureInputs::new(
            &record.scenario,
            record.base_year,
            YearAxis::new(record.data_years)?,
            Array1::from(record.mean_integrated_temperature),
            samples,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn inputs() -> TemperatureInputs {
        TemperatureInputs::new(
            "ssp245",
            2005,
            YearAxis::new(vec![2010, 2020, 2030, 2040]).unwrap(),
            array![0.5, 1.0, 1.5, 2.0],
            array![[0.4, 0.9, 1.4, 1.9], [0.6, 1.1, 1.6, 2.1]],
        )
        .unwrap()
    }

    #[test]
    fn subset_selects_member_years() {
        let subset = inputs().subset_to(&[2020, 2040, 2060]).unwrap();
        assert_eq!(subset.data_years().years(), &[2020, 2040]);
        assert_eq!(subset.mean(), array![1.0, 2.0]);
        assert_eq!(subset.sample(1), array![1.1, 2.1]);
        assert_eq!(subset.n_samples(), 2);
        assert_eq!(subset.scenario(), "ssp245");
    }

    #[test]
    fn subset_without_overlap_fails() {
        let result = inputs().subset_to(&[2100, 2110]);
        assert!(matches!(result, Err(Ar5Error::DataAlignment { .. })));
    }

    #[test]
    fn misaligned_arrays_rejected() {
        let result = TemperatureInputs::new(
            "ssp245",
            2005,
            YearAxis::new(vec![2010, 2020]).unwrap(),
            array![0.5, 1.0, 1.5],
            Array2::zeros((1, 2)),
        );
        assert!(result.is_err());

        let result = TemperatureInputs::new(
            "ssp245",
            2005,
            YearAxis::new(vec![2010, 2020]).unwrap(),
            array![0.5, 1.0],
            Array2::zeros((1, 3)),
        );
        assert!(result.is_err());
    }

    #[test]
    fn record_conversion_checks_ragged_samples() {
        let record = TemperatureRecord {
            scenario: "ssp126".to_string(),
            base_year: 2005,
            data_years: vec![2020, 2030],
            mean_integrated_temperature: vec![1.0, 2.0],
            sample_integrated_temperature: vec![vec![1.0, 2.0], vec![1.0]],
        };
        assert!(TemperatureInputs::try_from(record.clone()).is_err());

        let mut fixed = record;
        fixed.sample_integrated_temperature[1].push(2.5);
        let inputs = TemperatureInputs::try_from(fixed).unwrap();
        assert_eq!(inputs.sample(1), array![1.0, 2.5]);
    }
}
