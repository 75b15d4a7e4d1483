//! Descriptions of the datasets a run produces
//!
//! Both the global and the local output share one layout: a `sea_level_change`
//! variable in millimetres with dimensions (samples, years, locations), `lat`/`lon`
//! per location and a fixed set of provenance attributes. Global output has a single
//! sentinel location (id `-1`, infinite coordinates).
//!
//! Writing the bytes is left to a writer that understands the file format; this
//! module only describes what has to be written.

use crate::spatial::Site;
use crate::years::{Year, YearAxis};
use serde::{Deserialize, Serialize};

/// Name of the data variable in every output dataset
pub const SEA_LEVEL_VARIABLE: &str = "sea_level_change";
/// Units of [`SEA_LEVEL_VARIABLE`]
pub const SEA_LEVEL_UNITS: &str = "mm";
/// zlib compression level used for the data variable
pub const COMPRESSION_LEVEL: i32 = 4;

/// Global attributes attached to an output dataset
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DatasetAttributes {
    pub description: String,
    pub history: String,
    pub source: String,
    pub scenario: String,
    pub baseyear: Year,
}

impl DatasetAttributes {
    /// Attributes stamped with the current local time
    pub fn new(description: &str, source: &str, scenario: &str, baseyear: Year) -> Self {
        Self {
            description: description.to_string(),
            history: created_now(),
            source: source.to_string(),
            scenario: scenario.to_string(),
            baseyear,
        }
    }

    /// `(name, value)` pairs in the order they are written
    pub fn string_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("description", self.description.clone()),
            ("history", self.history.clone()),
            ("source", self.source.clone()),
            ("scenario", self.scenario.clone()),
        ]
    }
}

/// `Created <ctime>` history line
pub fn created_now() -> String {
    format!(
        "Created {}",
        chrono::Local::now().format("%a %b %e %H:%M:%S %Y")
    )
}

/// Shape, coordinates and attributes of a (samples × years × locations) dataset
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DatasetHeader {
    pub attributes: DatasetAttributes,
    pub years: YearAxis,
    pub nsamps: usize,
    pub locations: Vec<Site>,
    /// Fill value for missing data, if the dataset declares one
    pub missing_value: Option<f32>,
}

impl DatasetHeader {
    /// Header for a globally-aggregated dataset with one sentinel location
    pub fn global(attributes: DatasetAttributes, years: YearAxis, nsamps: usize) -> Self {
        Self {
            attributes,
            years,
            nsamps,
            locations: vec![Site::global_sentinel()],
            missing_value: None,
        }
    }

    /// Header for a dataset localized to `sites`
    pub fn local(
        attributes: DatasetAttributes,
        years: YearAxis,
        nsamps: usize,
        sites: Vec<Site>,
    ) -> Self {
        Self {
            attributes,
            years,
            nsamps,
            locations: sites,
            missing_value: Some(f32::NAN),
        }
    }

    /// (samples, years, locations)
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.nsamps, self.years.len(), self.locations.len())
    }

    pub fn location_ids(&self) -> Vec<i64> {
        self.locations.iter().map(|s| s.id).collect()
    }

    pub fn lats(&self) -> Vec<f32> {
        self.locations.iter().map(|s| s.lat as f32).collect()
    }

    pub fn lons(&self) -> Vec<f32> {
        self.locations.iter().map(|s| s.lon as f32).collect()
    }

    pub fn sample_ids(&self) -> Vec<i64> {
        (0..self.nsamps as i64).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attributes() -> DatasetAttributes {
        DatasetAttributes::new("test output", "FACTS: test", "ssp585", 2005)
    }

    #[test]
    fn global_header_has_sentinel_location() {
        let header = DatasetHeader::global(
            attributes(),
            YearAxis::new(vec![2020, 2030]).unwrap(),
            4,
        );
        assert_eq!(header.shape(), (4, 2, 1));
        assert_eq!(header.location_ids(), vec![-1]);
        assert!(header.lats()[0].is_infinite());
        assert!(header.lons()[0].is_infinite());
        assert!(header.missing_value.is_none());
        assert_eq!(header.sample_ids(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn local_header_keeps_site_order() {
        let sites = vec![
            Site::new("New York", 12, 40.7, -74.0),
            Site::new("Tokyo", 1, 35.7, 139.7),
        ];
        let header = DatasetHeader::local(
            attributes(),
            YearAxis::new(vec![2020]).unwrap(),
            3,
            sites,
        );
        assert_eq!(header.shape(), (3, 1, 2));
        assert_eq!(header.location_ids(), vec![12, 1]);
        assert!(header.missing_value.unwrap().is_nan());
    }

    #[test]
    fn history_is_stamped() {
        let attrs = attributes();
        assert!(attrs.history.starts_with("Created "));
        assert_eq!(attrs.string_pairs().len(), 4);
    }
}
