//! Sites and spatial fingerprints
//!
//! A fingerprint describes how mass lost from one source region changes relative sea
//! level at each point on the globe. Fingerprints are stored as regular lat/lon grids
//! ([`FingerprintGrid`]) and sampled at the sites being localized to.
//!
//! # Examples
//!
//! ```rust
//! use ipccar5_core::spatial::{FingerprintGrid, Site};
//! use ndarray::array;
//!
//! let grid = FingerprintGrid::new(
//!     array![-10.0, 10.0],
//!     array![0.0, 20.0],
//!     array![[1.0, 2.0], [3.0, 4.0]],
//! )
//! .unwrap();
//!
//! let site = Site::new("Midpoint", 1, 0.0, 10.0);
//! assert_eq!(grid.sample(site.lat, site.lon), 2.5);
//! ```

use crate::errors::{Ar5Error, Ar5Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// A location that projections are localized to
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub name: String,
    pub id: i64,
    /// Latitude in degrees north
    pub lat: f64,
    /// Longitude in degrees east
    pub lon: f64,
}

impl Site {
    pub fn new(name: &str, id: i64, lat: f64, lon: f64) -> Self {
        Self {
            name: name.to_string(),
            id,
            lat,
            lon,
        }
    }

    /// Placeholder location for globally-aggregated output
    ///
    /// Missing locations are marked by non-finite coordinates rather than a flag.
    pub fn global_sentinel() -> Self {
        Self::new("Global", -1, f64::INFINITY, f64::INFINITY)
    }

    pub fn is_sentinel(&self) -> bool {
        !(self.lat.is_finite() && self.lon.is_finite())
    }
}

/// A fingerprint field on a regular latitude/longitude grid
///
/// Longitudes are degrees east in `[0, 360)`. Values are indexed `[lat, lon]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FingerprintGrid {
    lat: Array1<f64>,
    lon: Array1<f64>,
    values: Array2<f64>,
}

impl FingerprintGrid {
    /// Build a grid, flipping descending axes so both increase
    ///
    /// # Errors
    ///
    /// Fails if an axis has fewer than two points, is not monotonic, or does not match
    /// the shape of `values`.
    pub fn new(lat: Array1<f64>, lon: Array1<f64>, values: Array2<f64>) -> Ar5Result<Self> {
        if values.dim() != (lat.len(), lon.len()) {
            return Err(Ar5Error::alignment(
                "fingerprint grid",
                format!(
                    "values have shape {:?} but axes have lengths ({}, {})",
                    values.dim(),
                    lat.len(),
                    lon.len()
                ),
            ));
        }

        let (lat, values) = ascending(lat, values, Axis(0), "latitude")?;
        let (lon, values) = ascending(lon, values, Axis(1), "longitude")?;
        Ok(Self { lat, lon, values })
    }

    pub fn lat(&self) -> &Array1<f64> {
        &self.lat
    }

    pub fn lon(&self) -> &Array1<f64> {
        &self.lon
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Bilinear interpolation at a single point
    ///
    /// The longitude is wrapped into `[0, 360)` first. Points outside the grid give NaN.
    pub fn sample(&self, lat: f64, lon: f64) -> f64 {
        let lon = lon.rem_euclid(360.0);
        let (Some((i, ti)), Some((j, tj))) = (bracket(&self.lat, lat), bracket(&self.lon, lon))
        else {
            return f64::NAN;
        };

        let v = &self.values;
        (1.0 - ti) * (1.0 - tj) * v[[i, j]]
            + (1.0 - ti) * tj * v[[i, j + 1]]
            + ti * (1.0 - tj) * v[[i + 1, j]]
            + ti * tj * v[[i + 1, j + 1]]
    }

    /// Sample the grid at every site, in site order
    pub fn sample_sites(&self, sites: &[Site]) -> Array1<f64> {
        sites.iter().map(|s| self.sample(s.lat, s.lon)).collect()
    }
}

fn ascending(
    axis_values: Array1<f64>,
    values: Array2<f64>,
    axis: Axis,
    name: &str,
) -> Ar5Result<(Array1<f64>, Array2<f64>)> {
    if axis_values.len() < 2 {
        return Err(Ar5Error::alignment(
            name,
            "fingerprint grid axes need at least two points",
        ));
    }
    let increasing = axis_values.windows(2).into_iter().all(|w| w[1] > w[0]);
    let decreasing = axis_values.windows(2).into_iter().all(|w| w[1] < w[0]);

    if increasing {
        Ok((axis_values, values))
    } else if decreasing {
        let n = axis_values.len();
        let flipped_axis = axis_values.iter().rev().copied().collect();
        let order: Vec<usize> = (0..n).rev().collect();
        Ok((flipped_axis, values.select(axis, &order)))
    } else {
        Err(Ar5Error::alignment(
            name,
            "fingerprint grid axis must be strictly monotonic",
        ))
    }
}

/// Lower cell index and fractional offset of `x` on an increasing axis
fn bracket(axis: &Array1<f64>, x: f64) -> Option<(usize, f64)> {
    let n = axis.len();
    if !(x >= axis[0] && x <= axis[n - 1]) {
        return None;
    }
    let upper = axis
        .as_slice()
        .map(|s| s.partition_point(|&a| a <= x))
        .unwrap_or_else(|| axis.iter().take_while(|&&a| a <= x).count());
    let i = upper.saturating_sub(1).min(n - 2);
    let t = (x - axis[i]) / (axis[i + 1] - axis[i]);
    Some((i, t))
}

/// Provides the fingerprint of a named source region at a list of sites
///
/// Implementations look up external data (gridded files, in-memory grids). A region
/// with no available fingerprint is an [`Ar5Error::FingerprintNotFound`]: every region
/// contributes to every site, so a partial result is meaningless.
pub trait FingerprintSource {
    fn fingerprint(&self, region: &str, sites: &[Site]) -> Ar5Result<Array1<f64>>;
}

/// Fingerprint grids held in memory, keyed by region name
#[derive(Clone, Debug, Default)]
pub struct GridFingerprints {
    grids: HashMap<String, FingerprintGrid>,
}

impl GridFingerprints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, region: &str, grid: FingerprintGrid) {
        self.grids.insert(region.to_string(), grid);
    }

    pub fn with_grid(mut self, region: &str, grid: FingerprintGrid) -> Self {
        self.insert(region, grid);
        self
    }
}

impl FingerprintSource for GridFingerprints {
    fn fingerprint(&self, region: &str, sites: &[Site]) -> Ar5Result<Array1<f64>> {
        self.grids
            .get(region)
            .map(|grid| grid.sample_sites(sites))
            .ok_or_else(|| Ar5Error::FingerprintNotFound {
                region: region.to_string(),
                path: PathBuf::from("<memory>"),
                reason: "no grid registered for this region".to_string(),
            })
    }
}
