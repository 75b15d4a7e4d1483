//! Glacier fit parameters
//!
//! The fitting stage supplies a set of empirical methods and two mass-balance
//! constants. They are loaded here from TOML:
//!
//! ```toml
//! [mass_balance]
//! historical_offset = 0.0085  # m SLE, or { years = [...], values = [...] }
//! mass_limit = 0.3157         # m SLE
//!
//! [[methods]]
//! name = "MAR2012"
//! factor = 4.35
//! exponent = 0.658
//! cvgl = 0.13
//! ```

use crate::melt::project_glacier;
use ipccar5_core::errors::{Ar5Error, Ar5Result};
use ipccar5_core::years::{Year, YearAxis};
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One empirical glacier response method
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GlacierMethod {
    /// Label of the calibration, for logging only
    #[serde(default)]
    pub name: String,
    /// Power-law scale
    /// unit: mm SLE
    pub factor: f64,
    /// Power-law exponent
    /// unit: dimensionless
    pub exponent: f64,
    /// Coefficient of variation of the method's projection
    ///
    /// Scales a per-sample standard-normal draw applied to the ensemble-mean projection.
    /// unit: dimensionless
    #[serde(alias = "cvgl")]
    pub method_uncertainty_coefficient: f64,
}

impl GlacierMethod {
    pub fn new(name: &str, factor: f64, exponent: f64, method_uncertainty_coefficient: f64) -> Self {
        Self {
            name: name.to_string(),
            factor,
            exponent,
            method_uncertainty_coefficient,
        }
    }

    /// Contribution (m SLE) of this method for an integrated-temperature trajectory
    pub fn project(&self, integrated_temperature: ArrayView1<'_, f64>) -> Array1<f64> {
        project_glacier(integrated_temperature, self.factor, self.exponent)
    }
}

/// Mass-balance correction for the period between the calibration reference and the
/// start of integration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HistoricalOffset {
    /// The same offset for every year
    Uniform(f64),
    /// One offset per year
    Annual { years: Vec<Year>, values: Vec<f64> },
}

impl Default for HistoricalOffset {
    fn default() -> Self {
        HistoricalOffset::Uniform(0.0)
    }
}

impl HistoricalOffset {
    /// Offsets (m SLE) on the given year axis
    ///
    /// # Errors
    ///
    /// [`Ar5Error::DataAlignment`] if an annual table does not cover every year.
    pub fn along(&self, years: &YearAxis) -> Ar5Result<Array1<f64>> {
        match self {
            HistoricalOffset::Uniform(offset) => Ok(Array1::from_elem(years.len(), *offset)),
            HistoricalOffset::Annual {
                years: offset_years,
                values,
            } => {
                if offset_years.len() != values.len() {
                    return Err(Ar5Error::alignment(
                        "historical offset",
                        format!("{} years for {} values", offset_years.len(), values.len()),
                    ));
                }
                let axis = YearAxis::new(offset_years.clone())?;
                let indices = axis.align_to(years, "historical offset")?;
                Ok(indices.into_iter().map(|i| values[i]).collect())
            }
        }
    }
}

/// Mass-balance constants shared by every method
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MassBalanceConstants {
    /// unit: m SLE
    #[serde(default)]
    pub historical_offset: HistoricalOffset,
    /// Upper bound on cumulative glacier mass loss, the total available glacier mass
    /// unit: m SLE
    pub mass_limit: f64,
}

/// Output of the fitting stage
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GlacierFit {
    pub methods: Vec<GlacierMethod>,
    pub mass_balance: MassBalanceConstants,
}

impl GlacierFit {
    pub fn new(methods: Vec<GlacierMethod>, mass_balance: MassBalanceConstants) -> Ar5Result<Self> {
        let fit = Self {
            methods,
            mass_balance,
        };
        fit.validate()?;
        Ok(fit)
    }

    pub fn from_toml_str(content: &str) -> Ar5Result<Self> {
        let fit: GlacierFit = toml::from_str(content)
            .map_err(|e| Ar5Error::Configuration(format!("invalid glacier fit: {}", e)))?;
        fit.validate()?;
        Ok(fit)
    }

    pub fn from_toml_file(path: &Path) -> Ar5Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Ar5Error::io(path, e))?;
        Self::from_toml_str(&content)
    }

    /// Number of glacier methods
    pub fn n_methods(&self) -> usize {
        self.methods.len()
    }

    fn validate(&self) -> Ar5Result<()> {
        if self.methods.is_empty() {
            return Err(Ar5Error::Configuration(
                "glacier fit defines no methods".to_string(),
            ));
        }
        for (index, method) in self.methods.iter().enumerate() {
            let finite = method.factor.is_finite()
                && method.exponent.is_finite()
                && method.method_uncertainty_coefficient.is_finite();
            if !finite {
                return Err(Ar5Error::Configuration(format!(
                    "glacier method {} ('{}') has non-finite parameters",
                    index, method.name
                )));
            }
        }
        if !self.mass_balance.mass_limit.is_finite() {
            return Err(Ar5Error::Configuration(
                "glacier mass limit must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    const FIT: &str = r#"
[mass_balance]
historical_offset = 0.0085
mass_limit = 0.3157

[[methods]]
name = "SLA2012"
factor = 3.39
exponent = 0.722
cvgl = 0.15

[[methods]]
name = "MAR2012"
factor = 4.35
exponent = 0.658
method_uncertainty_coefficient = 0.13
"#;

    #[test]
    fn parse_fit() {
        let fit = GlacierFit::from_toml_str(FIT).unwrap();
        assert_eq!(fit.n_methods(), 2);
        assert_eq!(fit.methods[0].method_uncertainty_coefficient, 0.15);
        assert_eq!(fit.methods[1].method_uncertainty_coefficient, 0.13);
        assert_eq!(
            fit.mass_balance.historical_offset,
            HistoricalOffset::Uniform(0.0085)
        );
        assert_eq!(fit.mass_balance.mass_limit, 0.3157);
    }

    #[test]
    fn parse_annual_offset() {
        let content = r#"
[mass_balance]
mass_limit = 0.3
historical_offset = { years = [2020, 2030, 2040], values = [0.01, 0.02, 0.03] }

[[methods]]
factor = 1.0
exponent = 1.0
cvgl = 0.0
"#;
        let fit = GlacierFit::from_toml_str(content).unwrap();
        let years = YearAxis::new(vec![2030, 2040]).unwrap();
        assert_eq!(
            fit.mass_balance.historical_offset.along(&years).unwrap(),
            array![0.02, 0.03]
        );

        let years = YearAxis::new(vec![2030, 2050]).unwrap();
        assert!(fit.mass_balance.historical_offset.along(&years).is_err());
    }

    #[test]
    fn empty_methods_rejected() {
        let content = "methods = []\n[mass_balance]\nmass_limit = 0.3\n";
        assert!(matches!(
            GlacierFit::from_toml_str(content),
            Err(Ar5Error::Configuration(_))
        ));
    }

    #[test]
    fn uniform_offset_broadcasts() {
        let years = YearAxis::new(vec![2020, 2030, 2040]).unwrap();
        assert_eq!(
            HistoricalOffset::Uniform(0.5).along(&years).unwrap(),
            array![0.5, 0.5, 0.5]
        );
        assert_eq!(
            HistoricalOffset::default().along(&years).unwrap(),
            array![0.0, 0.0, 0.0]
        );
    }
}
