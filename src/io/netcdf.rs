//! NetCDF fingerprints and output datasets
//!
//! Fingerprints live in one file per region, `fprint_<region>.nc`, holding a `fp`
//! variable on (`lat`, `lon`). Outputs follow the layout described by
//! [`DatasetHeader`]: `sea_level_change` on (`samples`, `years`, `locations`) plus
//! per-location `lat`/`lon`.

use ipccar5_core::dataset::DatasetHeader;
use ipccar5_core::errors::Ar5Result;
use ipccar5_core::localize::LocalSink;
use ipccar5_core::spatial::{FingerprintSource, Site};
use ipccar5_glaciers::postprocess::GlobalDataset;
use ndarray::{Array1, ArrayView3};
use std::ops::Range;
use std::path::{Path, PathBuf};

/// Fingerprint files in a directory, read on demand
#[derive(Clone, Debug)]
pub struct FingerprintDirectory {
    dir: PathBuf,
}

impl FingerprintDirectory {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    pub fn path_for(&self, region: &str) -> PathBuf {
        self.dir.join(format!("fprint_{}.nc", region))
    }
}

impl FingerprintSource for FingerprintDirectory {
    fn fingerprint(&self, region: &str, sites: &[Site]) -> Ar5Result<Array1<f64>> {
        backend::read_fingerprint(&self.path_for(region), region, sites)
    }
}

/// Write the global dataset to `path`
pub fn write_global(path: &Path, dataset: &GlobalDataset) -> Ar5Result<()> {
    backend::write_global(path, dataset)
}

/// Local dataset on disk, filled one site window at a time
pub struct LocalWriter {
    inner: backend::LocalFile,
}

impl LocalWriter {
    /// Create the file and write everything except the data values
    pub fn create(path: &Path, header: &DatasetHeader) -> Ar5Result<Self> {
        Ok(Self {
            inner: backend::LocalFile::create(path, header)?,
        })
    }
}

impl LocalSink for LocalWriter {
    fn write_chunk(&mut self, sites: Range<usize>, values: ArrayView3<'_, f64>) -> Ar5Result<()> {
        self.inner.write_chunk(sites, values)
    }
}

#[cfg(feature = "netcdf")]
mod backend {
    use super::*;
    use ipccar5_core::dataset::{COMPRESSION_LEVEL, SEA_LEVEL_UNITS, SEA_LEVEL_VARIABLE};
    use ipccar5_core::errors::Ar5Error;
    use ipccar5_core::spatial::FingerprintGrid;
    use ndarray::Array2;
    use tracing::{debug, info};

    fn netcdf_error(path: &Path, e: ::netcdf::error::Error) -> Ar5Error {
        Ar5Error::Error(format!("NetCDF error in {}: {}", path.display(), e))
    }

    pub(super) fn read_fingerprint(path: &Path, region: &str, sites: &[Site]) -> Ar5Result<Array1<f64>> {
        let missing = |reason: String| Ar5Error::FingerprintNotFound {
            region: region.to_string(),
            path: path.to_path_buf(),
            reason,
        };

        let file = ::netcdf::open(path).map_err(|e| missing(e.to_string()))?;
        let read = |name: &str| -> Ar5Result<(Vec<f64>, Vec<usize>)> {
            let variable = file
                .variable(name)
                .ok_or_else(|| missing(format!("no '{}' variable", name)))?;
            let shape = variable.dimensions().iter().map(|d| d.len()).collect();
            let values = variable
                .get_values::<f64, _>(..)
                .map_err(|e| missing(e.to_string()))?;
            Ok((values, shape))
        };

        let (lat, _) = read("lat")?;
        let (lon, _) = read("lon")?;
        let (fp, shape) = read("fp")?;
        if shape != [lat.len(), lon.len()] {
            return Err(missing(format!(
                "'fp' has shape {:?}, expected ({}, {})",
                shape,
                lat.len(),
                lon.len()
            )));
        }

        let values = Array2::from_shape_vec((lat.len(), lon.len()), fp)
            .map_err(|e| missing(e.to_string()))?;
        let grid = FingerprintGrid::new(Array1::from(lat), Array1::from(lon), values)
            .map_err(|e| missing(e.to_string()))?;
        debug!(region, path = %path.display(), "Read fingerprint grid");
        Ok(grid.sample_sites(sites))
    }

    fn define_layout(
        path: &Path,
        header: &DatasetHeader,
    ) -> Ar5Result<::netcdf::MutableFile> {
        let err = |e| netcdf_error(path, e);
        let (nsamps, nyears, nlocations) = header.shape();

        let mut file = ::netcdf::create(path).map_err(err)?;
        file.add_dimension("samples", nsamps).map_err(err)?;
        file.add_dimension("years", nyears).map_err(err)?;
        file.add_dimension("locations", nlocations).map_err(err)?;

        let mut samples = file.add_variable::<i64>("samples", &["samples"]).map_err(err)?;
        samples.put_values(&header.sample_ids(), ..).map_err(err)?;
        let mut years = file.add_variable::<i32>("years", &["years"]).map_err(err)?;
        years.put_values(header.years.years(), ..).map_err(err)?;
        let mut locations = file
            .add_variable::<i64>("locations", &["locations"])
            .map_err(err)?;
        locations.put_values(&header.location_ids(), ..).map_err(err)?;
        let mut lat = file.add_variable::<f32>("lat", &["locations"]).map_err(err)?;
        lat.put_values(&header.lats(), ..).map_err(err)?;
        let mut lon = file.add_variable::<f32>("lon", &["locations"]).map_err(err)?;
        lon.put_values(&header.lons(), ..).map_err(err)?;

        for (name, value) in header.attributes.string_pairs() {
            file.add_attribute(name, value.as_str()).map_err(err)?;
        }
        file.add_attribute("baseyear", header.attributes.baseyear)
            .map_err(err)?;
        Ok(file)
    }

    pub(super) fn write_global(path: &Path, dataset: &GlobalDataset) -> Ar5Result<()> {
        let err = |e| netcdf_error(path, e);
        let mut file = define_layout(path, &dataset.header)?;
        let mut variable = file
            .add_variable::<f64>(SEA_LEVEL_VARIABLE, &["samples", "years", "locations"])
            .map_err(err)?;
        variable
            .set_compression(COMPRESSION_LEVEL, true)
            .map_err(err)?;
        variable
            .put_attribute("units", SEA_LEVEL_UNITS)
            .map_err(err)?;
        let values: Vec<f64> = dataset.values.iter().copied().collect();
        variable.put_values(&values, ..).map_err(err)?;
        info!(path = %path.display(), "Wrote global glacier projection");
        Ok(())
    }

    pub(super) struct LocalFile {
        path: PathBuf,
        file: ::netcdf::MutableFile,
        nsamps: usize,
        nyears: usize,
    }

    impl LocalFile {
        pub(super) fn create(path: &Path, header: &DatasetHeader) -> Ar5Result<Self> {
            let err = |e| netcdf_error(path, e);
            let mut file = define_layout(path, header)?;
            let mut variable = file
                .add_variable::<f32>(SEA_LEVEL_VARIABLE, &["samples", "years", "locations"])
                .map_err(err)?;
            variable
                .set_compression(COMPRESSION_LEVEL, true)
                .map_err(err)?;
            variable
                .put_attribute("units", SEA_LEVEL_UNITS)
                .map_err(err)?;
            if let Some(missing) = header.missing_value {
                variable.set_fill_value(missing).map_err(err)?;
                variable
                    .put_attribute("missing_value", missing)
                    .map_err(err)?;
            }
            let (nsamps, nyears, _) = header.shape();
            Ok(Self {
                path: path.to_path_buf(),
                file,
                nsamps,
                nyears,
            })
        }

        pub(super) fn write_chunk(
            &mut self,
            sites: Range<usize>,
            values: ArrayView3<'_, f64>,
        ) -> Ar5Result<()> {
            let path = self.path.clone();
            let err = |e| netcdf_error(&path, e);
            let mut variable = self
                .file
                .variable_mut(SEA_LEVEL_VARIABLE)
                .ok_or_else(|| Ar5Error::Error(format!("{} has no data variable", path.display())))?;
            let data: Vec<f32> = values.iter().map(|v| *v as f32).collect();
            variable
                .put_values(&data, [0..self.nsamps, 0..self.nyears, sites.clone()])
                .map_err(err)?;
            debug!(start = sites.start, end = sites.end, "Wrote local site window");
            Ok(())
        }
    }
}

#[cfg(not(feature = "netcdf"))]
mod backend {
    use super::*;
    use ipccar5_core::errors::Ar5Error;

    fn unsupported(what: &str, path: &Path) -> Ar5Error {
        Ar5Error::Unsupported(format!(
            "{} ({}) needs NetCDF support; rebuild with the `netcdf` feature",
            what,
            path.display()
        ))
    }

    pub(super) fn read_fingerprint(path: &Path, region: &str, _sites: &[Site]) -> Ar5Result<Array1<f64>> {
        Err(unsupported(&format!("fingerprint for region '{}'", region), path))
    }

    pub(super) fn write_global(path: &Path, _dataset: &GlobalDataset) -> Ar5Result<()> {
        Err(unsupported("global output", path))
    }

    pub(super) struct LocalFile;

    impl LocalFile {
        pub(super) fn create(path: &Path, _header: &DatasetHeader) -> Ar5Result<Self> {
            Err(unsupported("local output", path))
        }

        pub(super) fn write_chunk(
            &mut self,
            _sites: Range<usize>,
            _values: ArrayView3<'_, f64>,
        ) -> Ar5Result<()> {
            Err(Ar5Error::Unsupported("local output".to_string()))
        }
    }
}

#[cfg(all(test, not(feature = "netcdf")))]
mod tests {
    use super::*;
    use ipccar5_core::errors::Ar5Error;

    #[test]
    fn fingerprint_paths() {
        let source = FingerprintDirectory::new(Path::new("/data/FPRINT"));
        assert_eq!(
            source.path_for("7"),
            PathBuf::from("/data/FPRINT/fprint_7.nc")
        );
    }

    #[test]
    fn without_netcdf_support() {
        let source = FingerprintDirectory::new(Path::new("/data/FPRINT"));
        let result = source.fingerprint("1", &[Site::new("a", 1, 0.0, 0.0)]);
        assert!(matches!(result, Err(Ar5Error::Unsupported(_))));
    }
}
