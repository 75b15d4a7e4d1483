//! Assembly of the glacier output datasets

use crate::projection::ProjectionEnsemble;
use ipccar5_core::dataset::{DatasetAttributes, DatasetHeader};
use ipccar5_core::errors::Ar5Result;
use ipccar5_core::localize::{LocalSink, Localizer, RegionalEnsemble, SiteFingerprints};
use ipccar5_core::spatial::{FingerprintSource, Site};
use ipccar5_core::years::Year;
use ndarray::{Array3, Axis};
use tracing::info;

pub const GLOBAL_DESCRIPTION: &str =
    "Global SLR contribution from glaciers and ice caps according to AR5 workflow";
pub const LOCAL_DESCRIPTION: &str =
    "Local SLR contributions from glaciers according to AR5 workflow";
pub const LOCAL_SOURCE: &str = "SLR Framework: AR5 workflow";

/// Global contribution with its single sentinel location
#[derive(Clone, Debug, PartialEq)]
pub struct GlobalDataset {
    pub header: DatasetHeader,
    /// Shape (samples × years × 1)
    /// unit: mm
    pub values: Array3<f64>,
}

impl GlobalDataset {
    pub fn new(
        ensemble: &ProjectionEnsemble,
        scenario: &str,
        baseyear: Year,
        pipeline_id: &str,
    ) -> Self {
        let attributes = DatasetAttributes::new(
            GLOBAL_DESCRIPTION,
            &format!("FACTS: {}", pipeline_id),
            scenario,
            baseyear,
        );
        Self {
            header: DatasetHeader::global(attributes, ensemble.years().clone(), ensemble.nsamps()),
            values: ensemble.values().to_owned().insert_axis(Axis(2)),
        }
    }
}

/// Header of the localized dataset for `sites`
pub fn local_header(
    regional: &RegionalEnsemble,
    sites: &[Site],
    scenario: &str,
    baseyear: Year,
) -> DatasetHeader {
    DatasetHeader::local(
        DatasetAttributes::new(LOCAL_DESCRIPTION, LOCAL_SOURCE, scenario, baseyear),
        regional.years().clone(),
        regional.nsamps(),
        sites.to_vec(),
    )
}

/// Sample every region's fingerprint at `sites` and stream the localized ensemble into
/// `sink`, `chunksize` sites at a time
///
/// Fingerprints are looked up in region order. A region without a fingerprint fails
/// the whole localization before anything is written.
pub fn localize_glaciers<F, S>(
    regional: &RegionalEnsemble,
    sites: &[Site],
    source: &F,
    chunksize: usize,
    sink: &mut S,
) -> Ar5Result<()>
where
    F: FingerprintSource + ?Sized,
    S: LocalSink + ?Sized,
{
    let localizer = Localizer::new(chunksize)?;
    let fingerprints = SiteFingerprints::load(regional.region_names(), sites, source)?;
    info!(
        sites = sites.len(),
        regions = regional.n_regions(),
        "Loaded glacier fingerprints"
    );
    localizer.localize_into(regional, &fingerprints, sink)
}
