//! Regional glacier mass fractions
//!
//! The fraction table is a comma-separated text file:
//!
//! ```text
//! region, 2020, 2030, 2040
//! 1, 0.10, 0.11, 0.12
//! 2, 0.05, 0.05, 0.04
//! ```
//!
//! Rows are taken as given. Region names may repeat and the fractions of a year need
//! not sum to one; every row contributes independently to the regional ensemble.

use crate::projection::ProjectionEnsemble;
use ipccar5_core::errors::{Ar5Error, Ar5Result};
use ipccar5_core::localize::RegionalEnsemble;
use ipccar5_core::years::{Year, YearAxis};
use ndarray::{Array2, Array3, Axis};
use std::collections::HashSet;
use std::io::BufRead;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, warn};

const WHAT: &str = "glacier fraction";

/// Per-year share of the global glacier contribution for each named region
#[derive(Clone, Debug, PartialEq)]
pub struct RegionalFractions {
    region_names: Vec<String>,
    years: YearAxis,
    /// Shape (regions × years)
    fractions: Array2<f64>,
}

impl RegionalFractions {
    pub fn new(region_names: Vec<String>, years: YearAxis, fractions: Array2<f64>) -> Ar5Result<Self> {
        if fractions.dim() != (region_names.len(), years.len()) {
            return Err(Ar5Error::alignment(
                WHAT,
                format!(
                    "fractions of shape {:?} for {} regions and {} years",
                    fractions.dim(),
                    region_names.len(),
                    years.len()
                ),
            ));
        }
        Ok(Self {
            region_names,
            years,
            fractions,
        })
    }

    /// Parse a fraction table
    ///
    /// Fields are separated by a comma and optional whitespace. Blank lines are skipped.
    pub fn parse<B: BufRead>(reader: B) -> Ar5Result<Self> {
        let mut lines = reader
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line))
            .filter(|(_, line)| line.as_ref().map_or(true, |l| !l.trim().is_empty()));

        let (header_line, header) = match lines.next() {
            Some((n, line)) => (n, line.map_err(|e| parse_error(n, e.to_string()))?),
            None => return Err(parse_error(0, "missing header row".to_string())),
        };
        let years = fields(&header)
            .skip(1)
            .map(|field| parse_field::<Year>(field, header_line))
            .collect::<Ar5Result<Vec<_>>>()?;
        let years = YearAxis::new(years)?;

        let mut region_names = Vec::new();
        let mut values = Vec::new();
        for (n, line) in lines {
            let line = line.map_err(|e| parse_error(n, e.to_string()))?;
            let mut parts = fields(&line);
            let name = parts.next().unwrap_or_default().to_string();
            let row = parts
                .map(|field| parse_field::<f64>(field, n))
                .collect::<Ar5Result<Vec<_>>>()?;
            if row.len() != years.len() {
                return Err(parse_error(
                    n,
                    format!(
                        "region '{}' has {} fractions for {} years",
                        name,
                        row.len(),
                        years.len()
                    ),
                ));
            }
            region_names.push(name);
            values.extend(row);
        }

        let fractions = Array2::from_shape_vec((region_names.len(), years.len()), values)
            .map_err(|e| Ar5Error::Error(e.to_string()))?;
        let parsed = Self::new(region_names, years, fractions)?;
        parsed.report_quirks();
        Ok(parsed)
    }

    pub fn from_file(path: &Path) -> Ar5Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| Ar5Error::io(path, e))?;
        Self::parse(std::io::BufReader::new(file))
    }

    pub fn region_names(&self) -> &[String] {
        &self.region_names
    }

    pub fn years(&self) -> &YearAxis {
        &self.years
    }

    pub fn fractions(&self) -> &Array2<f64> {
        &self.fractions
    }

    pub fn n_regions(&self) -> usize {
        self.region_names.len()
    }

    /// Fractions on exactly the years of `target`
    ///
    /// # Errors
    ///
    /// [`Ar5Error::DataAlignment`] naming the first target year without fractions.
    pub fn subset_to(&self, target: &YearAxis) -> Ar5Result<Self> {
        let indices = self.years.align_to(target, WHAT)?;
        Ok(Self {
            region_names: self.region_names.clone(),
            years: target.clone(),
            fractions: self.fractions.select(Axis(1), &indices),
        })
    }

    /// Split every realization of `ensemble` into regions
    ///
    /// `regional[s, r, y] = global[s, y] * fraction[r, y]`, without renormalization.
    pub fn disaggregate(&self, ensemble: &ProjectionEnsemble) -> Ar5Result<RegionalEnsemble> {
        let fractions = self.subset_to(ensemble.years())?;
        let global = ensemble.values();
        let values = Array3::from_shape_fn(
            (ensemble.nsamps(), fractions.n_regions(), fractions.years.len()),
            |(s, r, y)| global[[s, y]] * fractions.fractions[[r, y]],
        );
        debug!(
            samples = ensemble.nsamps(),
            regions = fractions.n_regions(),
            "Disaggregated global projection into regions"
        );
        RegionalEnsemble::new(fractions.region_names, fractions.years, values)
    }

    fn report_quirks(&self) {
        let mut seen = HashSet::new();
        for name in &self.region_names {
            if !seen.insert(name.as_str()) {
                warn!(region = %name, "Region listed more than once; every row contributes");
            }
        }
        for (year, total) in self
            .years
            .years()
            .iter()
            .zip(self.fractions.sum_axis(Axis(0)))
        {
            if (total - 1.0).abs() > 1e-6 {
                debug!(year, total, "Regional fractions do not sum to one");
            }
        }
    }
}

impl FromStr for RegionalFractions {
    type Err = Ar5Error;

    fn from_str(content: &str) -> Ar5Result<Self> {
        Self::parse(content.as_bytes())
    }
}

fn fields(line: &str) -> impl Iterator<Item = &str> {
    line.split(',').map(str::trim)
}

fn parse_field<T: FromStr>(field: &str, line: usize) -> Ar5Result<T>
where
    T::Err: std::fmt::Display,
{
    field
        .parse::<T>()
        .map_err(|e| parse_error(line, format!("'{}': {}", field, e)))
}

fn parse_error(line: usize, reason: String) -> Ar5Error {
    Ar5Error::Parse {
        what: WHAT.to_string(),
        line,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    const TABLE: &str = "region, 2020, 2030, 2040\n1, 0.5, 0.4, 0.3\n\n2,0.25,0.3,0.35\n";

    #[test]
    fn parse_table() {
        let fractions: RegionalFractions = TABLE.parse().unwrap();
        assert_eq!(fractions.region_names(), &["1", "2"]);
        assert_eq!(fractions.years().years(), &[2020, 2030, 2040]);
        assert_eq!(
            fractions.fractions(),
            &array![[0.5, 0.4, 0.3], [0.25, 0.3, 0.35]]
        );
    }

    #[test]
    fn subset_selects_years() {
        let fractions: RegionalFractions = TABLE.parse().unwrap();
        let subset = fractions
            .subset_to(&YearAxis::new(vec![2030, 2040]).unwrap())
            .unwrap();
        assert_eq!(subset.fractions(), &array![[0.4, 0.3], [0.3, 0.35]]);

        let missing = fractions.subset_to(&YearAxis::new(vec![2030, 2050]).unwrap());
        match missing {
            Err(Ar5Error::DataAlignment { axis, reason }) => {
                assert_eq!(axis, WHAT);
                assert!(reason.contains("2050"), "{}", reason);
            }
            other => panic!("Expected alignment error, got {:?}", other),
        }
    }

    #[test]
    fn malformed_rows_report_line() {
        let result: Ar5Result<RegionalFractions> =
            "region, 2020, 2030\n1, 0.5, 0.4\n2, 0.5, oops\n".parse();
        match result {
            Err(Ar5Error::Parse { line, .. }) => assert_eq!(line, 3),
            other => panic!("Expected parse error, got {:?}", other),
        }

        let result: Ar5Result<RegionalFractions> = "region, 2020, 2030\n1, 0.5\n".parse();
        assert!(matches!(result, Err(Ar5Error::Parse { line: 2, .. })));
    }

    #[test]
    fn empty_table_rejected() {
        let result: Ar5Result<RegionalFractions> = "\n\n".parse();
        assert!(matches!(result, Err(Ar5Error::Parse { .. })));
    }
}
