//! Localization of regional ensembles to sites
//!
//! The local contribution at a site is the fingerprint-weighted sum of the regional
//! contributions:
//!
//! $$L_{s,y,k} = \sum_r R_{s,r,y} \, F_{r,k}$$
//!
//! for sample $s$, year $y$, region $r$ and site $k$. With thousands of samples, dozens
//! of years and potentially thousands of sites, the full product is large. Sites are
//! therefore processed in fixed-size windows of `chunksize` sites, so the working set
//! is `samples × years × chunksize` regardless of the number of sites.
//!
//! Within a window, regions are accumulated in the order of the ensemble's region
//! list. That order fixes floating-point rounding, so the result is bit-identical for
//! any chunk size and any number of threads.

use crate::errors::{Ar5Error, Ar5Result};
use crate::spatial::{FingerprintSource, Site};
use crate::years::YearAxis;
use ndarray::{s, Array2, Array3, ArrayView2, ArrayView3, ArrayViewMut3, Axis, Zip};
use rayon::prelude::*;
use std::ops::Range;
use tracing::{debug, info};

/// Contributions split by source region, shape (samples × regions × years)
#[derive(Clone, Debug, PartialEq)]
pub struct RegionalEnsemble {
    region_names: Vec<String>,
    years: YearAxis,
    values: Array3<f64>,
}

impl RegionalEnsemble {
    pub fn new(region_names: Vec<String>, years: YearAxis, values: Array3<f64>) -> Ar5Result<Self> {
        let (_, n_regions, n_years) = values.dim();
        if n_regions != region_names.len() {
            return Err(Ar5Error::alignment(
                "region",
                format!(
                    "{} region names for {} regional series",
                    region_names.len(),
                    n_regions
                ),
            ));
        }
        if n_years != years.len() {
            return Err(Ar5Error::alignment(
                "year",
                format!("{} years for {} regional values per sample", years.len(), n_years),
            ));
        }
        Ok(Self {
            region_names,
            years,
            values,
        })
    }

    /// Region names, possibly with repeats
    pub fn region_names(&self) -> &[String] {
        &self.region_names
    }

    pub fn years(&self) -> &YearAxis {
        &self.years
    }

    pub fn values(&self) -> &Array3<f64> {
        &self.values
    }

    pub fn nsamps(&self) -> usize {
        self.values.len_of(Axis(0))
    }

    pub fn n_regions(&self) -> usize {
        self.region_names.len()
    }

    /// The (samples × years) slice for one region
    pub fn region(&self, index: usize) -> ArrayView2<'_, f64> {
        self.values.index_axis(Axis(1), index)
    }
}

/// Fingerprints of each region sampled at each site, shape (regions × sites)
///
/// Rows follow the region order of the ensemble they were loaded for.
#[derive(Clone, Debug, PartialEq)]
pub struct SiteFingerprints {
    region_names: Vec<String>,
    values: Array2<f64>,
}

impl SiteFingerprints {
    pub fn new(region_names: Vec<String>, values: Array2<f64>) -> Ar5Result<Self> {
        if values.nrows() != region_names.len() {
            return Err(Ar5Error::alignment(
                "region",
                format!(
                    "{} region names for {} fingerprint rows",
                    region_names.len(),
                    values.nrows()
                ),
            ));
        }
        Ok(Self {
            region_names,
            values,
        })
    }

    /// Look up each region's fingerprint in turn
    ///
    /// A repeated region name is looked up again; no result is reused.
    pub fn load<F: FingerprintSource + ?Sized>(
        region_names: &[String],
        sites: &[Site],
        source: &F,
    ) -> Ar5Result<Self> {
        let mut values = Array2::zeros((region_names.len(), sites.len()));
        for (mut row, region) in values.axis_iter_mut(Axis(0)).zip(region_names) {
            let fingerprint = source.fingerprint(region, sites)?;
            if fingerprint.len() != sites.len() {
                return Err(Ar5Error::alignment(
                    "site",
                    format!(
                        "fingerprint for region '{}' has {} values for {} sites",
                        region,
                        fingerprint.len(),
                        sites.len()
                    ),
                ));
            }
            row.assign(&fingerprint);
            debug!(region = %region, "Loaded fingerprint");
        }
        Self::new(region_names.to_vec(), values)
    }

    pub fn region_names(&self) -> &[String] {
        &self.region_names
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn n_sites(&self) -> usize {
        self.values.ncols()
    }
}

/// Localized contributions, shape (samples × years × sites)
#[derive(Clone, Debug, PartialEq)]
pub struct LocalEnsemble {
    years: YearAxis,
    sites: Vec<Site>,
    values: Array3<f64>,
}

impl LocalEnsemble {
    /// An all-zero ensemble ready to receive chunks
    pub fn zeros(nsamps: usize, years: YearAxis, sites: Vec<Site>) -> Self {
        let values = Array3::zeros((nsamps, years.len(), sites.len()));
        Self {
            years,
            sites,
            values,
        }
    }

    pub fn years(&self) -> &YearAxis {
        &self.years
    }

    pub fn values(&self) -> &Array3<f64> {
        &self.values
    }

    pub fn into_values(self) -> Array3<f64> {
        self.values
    }
}

/// Receives localized values one window of sites at a time
pub trait LocalSink {
    /// `values` has shape (samples × years × sites.len())
    fn write_chunk(&mut self, sites: Range<usize>, values: ArrayView3<'_, f64>) -> Ar5Result<()>;
}

impl LocalSink for LocalEnsemble {
    fn write_chunk(&mut self, sites: Range<usize>, values: ArrayView3<'_, f64>) -> Ar5Result<()> {
        if sites.end > self.sites.len() {
            return Err(Ar5Error::alignment(
                "site",
                format!(
                    "chunk {:?} is outside the {} sites of the ensemble",
                    sites,
                    self.sites.len()
                ),
            ));
        }
        let (nsamps, nyears, _) = self.values.dim();
        if values.dim() != (nsamps, nyears, sites.len()) {
            return Err(Ar5Error::alignment(
                "chunk",
                format!(
                    "chunk of shape {:?} does not match {} samples, {} years and {} sites",
                    values.dim(),
                    nsamps,
                    nyears,
                    sites.len()
                ),
            ));
        }
        self.values.slice_mut(s![.., .., sites]).assign(&values);
        Ok(())
    }
}

/// Chunked fingerprint-weighted summation over regions
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Localizer {
    chunksize: usize,
}

impl Localizer {
    pub fn new(chunksize: usize) -> Ar5Result<Self> {
        if chunksize == 0 {
            return Err(Ar5Error::Configuration(
                "chunk size must be at least one site".to_string(),
            ));
        }
        Ok(Self { chunksize })
    }

    pub fn chunksize(&self) -> usize {
        self.chunksize
    }

    /// Consecutive site windows of at most `chunksize` sites covering `0..n_sites`
    pub fn windows(&self, n_sites: usize) -> impl Iterator<Item = Range<usize>> {
        let chunksize = self.chunksize;
        (0..n_sites)
            .step_by(chunksize)
            .map(move |start| start..(start + chunksize).min(n_sites))
    }

    /// Localize into `sink`, one window at a time
    ///
    /// Only one window's worth of output is held in memory at once.
    pub fn localize_into<S: LocalSink + ?Sized>(
        &self,
        ensemble: &RegionalEnsemble,
        fingerprints: &SiteFingerprints,
        sink: &mut S,
    ) -> Ar5Result<()> {
        check_regions(ensemble, fingerprints)?;
        info!(
            regions = ensemble.n_regions(),
            sites = fingerprints.n_sites(),
            chunksize = self.chunksize,
            "Localizing regional ensemble"
        );

        for window in self.windows(fingerprints.n_sites()) {
            let chunk = accumulate_window(ensemble, fingerprints, window.clone());
            debug!(start = window.start, end = window.end, "Localized site window");
            sink.write_chunk(window, chunk.view())?;
        }
        Ok(())
    }

    /// Localize every site into a single in-memory [`LocalEnsemble`]
    ///
    /// Windows are computed in parallel into disjoint slices of the output.
    pub fn localize(
        &self,
        ensemble: &RegionalEnsemble,
        sites: &[Site],
        fingerprints: &SiteFingerprints,
    ) -> Ar5Result<LocalEnsemble> {
        check_regions(ensemble, fingerprints)?;
        if fingerprints.n_sites() != sites.len() {
            return Err(Ar5Error::alignment(
                "site",
                format!(
                    "{} sites but fingerprints for {}",
                    sites.len(),
                    fingerprints.n_sites()
                ),
            ));
        }

        let mut local = LocalEnsemble::zeros(
            ensemble.nsamps(),
            ensemble.years().clone(),
            sites.to_vec(),
        );
        let chunksize = self.chunksize;
        let chunks: Vec<(usize, ArrayViewMut3<'_, f64>)> = local
            .values
            .axis_chunks_iter_mut(Axis(2), chunksize)
            .enumerate()
            .collect();

        chunks.into_par_iter().for_each(|(index, mut out)| {
            let start = index * chunksize;
            let window = start..start + out.len_of(Axis(2));
            out.assign(&accumulate_window(ensemble, fingerprints, window));
        });

        Ok(local)
    }
}

fn check_regions(ensemble: &RegionalEnsemble, fingerprints: &SiteFingerprints) -> Ar5Result<()> {
    if ensemble.region_names() != fingerprints.region_names() {
        return Err(Ar5Error::alignment(
            "region",
            format!(
                "ensemble regions {:?} do not match fingerprint regions {:?}",
                ensemble.region_names(),
                fingerprints.region_names()
            ),
        ));
    }
    Ok(())
}

/// Sum of `region ⊗ fingerprint[window]` over regions, in region order
fn accumulate_window(
    ensemble: &RegionalEnsemble,
    fingerprints: &SiteFingerprints,
    window: Range<usize>,
) -> Array3<f64> {
    let (nsamps, _, nyears) = ensemble.values().dim();
    let init = Array3::zeros((nsamps, nyears, window.len()));

    ensemble
        .values()
        .axis_iter(Axis(1))
        .zip(fingerprints.values().axis_iter(Axis(0)))
        .fold(init, |mut acc, (regional, fingerprint)| {
            let fingerprint = fingerprint.slice(s![window.clone()]);
            Zip::from(acc.lanes_mut(Axis(2)))
                .and(&regional)
                .for_each(|mut sites, &value| sites.scaled_add(value, &fingerprint));
            acc
        })
}
