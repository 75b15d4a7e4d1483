//! Year axes
//!
//! Every array in a run (temperature trajectories, mass-balance offsets, regional
//! fractions and the projected ensembles) is indexed by a [`YearAxis`]. Inputs arrive
//! on their own axes and are subset onto the projection years with set-membership
//! semantics: a year is kept if it appears in the target set, and nothing is
//! interpolated.

use crate::errors::{Ar5Error, Ar5Result};
use serde::{Deserialize, Serialize};

/// Calendar year
pub type Year = i32;

/// A strictly increasing sequence of integer years
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Year>", into = "Vec<Year>")]
pub struct YearAxis(Vec<Year>);

impl YearAxis {
    /// Create an axis, checking that the years are strictly increasing
    pub fn new(years: Vec<Year>) -> Ar5Result<Self> {
        if let Some(w) = years.windows(2).find(|w| w[1] <= w[0]) {
            return Err(Ar5Error::alignment(
                "year",
                format!(
                    "years must be strictly increasing, found {} followed by {}",
                    w[0], w[1]
                ),
            ));
        }
        Ok(Self(years))
    }

    pub fn years(&self) -> &[Year] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Index of `year` on this axis
    pub fn position(&self, year: Year) -> Option<usize> {
        self.0.binary_search(&year).ok()
    }

    pub fn contains(&self, year: Year) -> bool {
        self.position(year).is_some()
    }

    /// Indices of the years on this axis that are members of `targets`
    ///
    /// The result is in axis order, whatever the order of `targets`.
    pub fn member_indices(&self, targets: &[Year]) -> Vec<usize> {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, y)| targets.contains(y))
            .map(|(i, _)| i)
            .collect()
    }

    /// The sub-axis of years that are members of `targets`, with their indices
    pub fn subset(&self, targets: &[Year]) -> (YearAxis, Vec<usize>) {
        let indices = self.member_indices(targets);
        let years = indices.iter().map(|&i| self.0[i]).collect();
        (YearAxis(years), indices)
    }

    /// Indices into this axis for every year of `other`
    ///
    /// Fails with a [`Ar5Error::DataAlignment`] naming `axis` and the first year of
    /// `other` that this axis does not cover.
    pub fn align_to(&self, other: &YearAxis, axis: &str) -> Ar5Result<Vec<usize>> {
        other
            .years()
            .iter()
            .map(|&year| {
                self.position(year).ok_or_else(|| {
                    Ar5Error::alignment(axis, format!("no data for projection year {}", year))
                })
            })
            .collect()
    }
}

impl TryFrom<Vec<Year>> for YearAxis {
    type Error = Ar5Error;

    fn try_from(years: Vec<Year>) -> Ar5Result<Self> {
        YearAxis::new(years)
    }
}

impl From<YearAxis> for Vec<Year> {
    fn from(axis: YearAxis) -> Self {
        axis.0
    }
}

/// The window of target years a projection is reported on
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectionYears {
    pub start: Year,
    pub end: Year,
    pub step: Year,
}

impl Default for ProjectionYears {
    fn default() -> Self {
        Self {
            start: 2020,
            end: 2150,
            step: 10,
        }
    }
}

impl ProjectionYears {
    pub fn new(start: Year, end: Year, step: Year) -> Self {
        Self { start, end, step }
    }

    /// Target years `start, start + step, ...` up to and including `end`
    pub fn years(&self) -> Ar5Result<Vec<Year>> {
        if self.step <= 0 {
            return Err(Ar5Error::Configuration(format!(
                "projection year step must be positive, got {}",
                self.step
            )));
        }
        if self.end < self.start {
            return Err(Ar5Error::Configuration(format!(
                "projection end year {} precedes start year {}",
                self.end, self.start
            )));
        }
        Ok((self.start..=self.end).step_by(self.step as usize).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unordered_years() {
        assert!(YearAxis::new(vec![2000, 2010, 2005]).is_err());
        assert!(YearAxis::new(vec![2000, 2000]).is_err());
        assert!(YearAxis::new(vec![]).is_ok());
    }

    #[test]
    fn subset_keeps_axis_order() {
        let axis = YearAxis::new((2000..2031).collect()).unwrap();
        let (sub, idx) = axis.subset(&[2030, 2010, 2020, 2100]);
        assert_eq!(sub.years(), &[2010, 2020, 2030]);
        assert_eq!(idx, vec![10, 20, 30]);
    }

    #[test]
    fn align_reports_missing_year() {
        let axis = YearAxis::new(vec![2020, 2030]).unwrap();
        let target = YearAxis::new(vec![2020, 2030, 2040]).unwrap();
        match axis.align_to(&target, "regional fraction") {
            Err(Ar5Error::DataAlignment { axis, reason }) => {
                assert_eq!(axis, "regional fraction");
                assert!(reason.contains("2040"));
            }
            other => panic!("Expected alignment error, got {:?}", other),
        }
    }

    #[test]
    fn projection_years_inclusive_end() {
        let years = ProjectionYears::new(2020, 2100, 10).years().unwrap();
        assert_eq!(years.len(), 9);
        assert_eq!(years.first(), Some(&2020));
        assert_eq!(years.last(), Some(&2100));

        let years = ProjectionYears::new(2020, 2105, 10).years().unwrap();
        assert_eq!(years.last(), Some(&2100));
    }

    #[test]
    fn projection_years_invalid() {
        assert!(ProjectionYears::new(2020, 2100, 0).years().is_err());
        assert!(ProjectionYears::new(2100, 2020, 10).years().is_err());
    }
}
