//! Regional disaggregation and localization of glacier projections
use approx::assert_relative_eq;
use ipccar5_core::localize::LocalEnsemble;
use ipccar5_core::sampling::SampleSpec;
use ipccar5_core::spatial::{FingerprintGrid, GridFingerprints, Site};
use ipccar5_core::years::YearAxis;
use ipccar5_glaciers::postprocess::{local_header, localize_glaciers, GlobalDataset};
use ipccar5_glaciers::{
    project_glaciers, GlacierFit, GlacierMethod, HistoricalOffset, MassBalanceConstants,
    ProjectionEnsemble, RegionalFractions, TemperatureInputs,
};
use ndarray::{array, s, Array2};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::io::Write;

// Region 4 is absent and region 7 is listed twice
const FRACTIONS: &str = "\
region, 2000, 2020, 2030, 2040
1, 0.1, 0.20, 0.25, 0.30
7, 0.2, 0.10, 0.10, 0.10
7, 0.2, 0.10, 0.10, 0.10
";

fn ensemble() -> ProjectionEnsemble {
    let years = YearAxis::new(vec![2020, 2030, 2040]).unwrap();
    let mean = array![5.0, 10.0, 20.0];
    let samples = Array2::from_shape_fn((40, 3), |(s, y)| mean[y] * (0.5 + s as f64 / 40.0));
    let inputs = TemperatureInputs::new("ssp245", 2005, years, mean, samples).unwrap();
    let fit = GlacierFit::new(
        vec![
            GlacierMethod::new("a", 4.0, 0.7, 0.1),
            GlacierMethod::new("b", 5.0, 0.65, 0.2),
        ],
        MassBalanceConstants {
            historical_offset: HistoricalOffset::Uniform(0.001),
            mass_limit: 0.4,
        },
    )
    .unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(1234);
    project_glaciers(&inputs, &fit, SampleSpec::Total(36), &mut rng).unwrap()
}

#[test]
fn duplicated_region_contributes_twice() {
    let global = ensemble();
    let fractions: RegionalFractions = FRACTIONS.parse().unwrap();
    let regional = fractions.disaggregate(&global).unwrap();

    assert_eq!(regional.region_names(), &["1", "7", "7"]);
    assert_eq!(regional.values().dim(), (36, 3, 3));
    assert_eq!(regional.region(1), regional.region(2));
    for s in 0..global.nsamps() {
        assert_eq!(regional.values()[[s, 0, 2]], global.values()[[s, 2]] * 0.30);
    }

    // Every site sees both copies of region 7 when its fingerprint is uniform
    let lat = array![-90.0, 90.0];
    let lon = array![0.0, 359.0];
    let source = GridFingerprints::new()
        .with_grid(
            "1",
            FingerprintGrid::new(lat.clone(), lon.clone(), Array2::zeros((2, 2))).unwrap(),
        )
        .with_grid(
            "7",
            FingerprintGrid::new(lat, lon, Array2::ones((2, 2))).unwrap(),
        );
    let sites = vec![
        Site::new("a", 10, 12.0, 45.0),
        Site::new("b", 11, -33.0, 151.0),
        Site::new("c", 12, 60.0, -3.0),
    ];
    let mut local = LocalEnsemble::zeros(global.nsamps(), regional.years().clone(), sites.clone());
    localize_glaciers(&regional, &sites, &source, 2, &mut local).unwrap();

    for k in 0..sites.len() {
        for s in 0..global.nsamps() {
            for y in 0..3 {
                assert_relative_eq!(
                    local.values()[[s, y, k]],
                    2.0 * 0.10 * global.values()[[s, y]],
                    max_relative = 1e-12
                );
            }
        }
    }
}

#[test]
fn fraction_years_must_cover_projection() {
    let global = ensemble();
    let fractions: RegionalFractions = "region, 2020, 2030\n1, 0.5, 0.5\n".parse().unwrap();
    assert!(matches!(
        fractions.disaggregate(&global),
        Err(ipccar5_core::errors::Ar5Error::DataAlignment { .. })
    ));
}

#[test]
fn fractions_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(FRACTIONS.as_bytes()).unwrap();
    let fractions = RegionalFractions::from_file(file.path()).unwrap();
    assert_eq!(fractions.n_regions(), 3);
    assert_eq!(fractions.years().years(), &[2000, 2020, 2030, 2040]);

    let missing = RegionalFractions::from_file(&file.path().with_extension("missing"));
    assert!(matches!(
        missing,
        Err(ipccar5_core::errors::Ar5Error::Io { .. })
    ));
}

#[test]
fn dataset_headers() {
    let global = ensemble();
    let dataset = GlobalDataset::new(&global, "ssp245", 2005, "glaciers-test");
    assert_eq!(dataset.values.dim(), (36, 3, 1));
    assert_eq!(dataset.values.slice(s![.., .., 0]), global.values());
    assert_eq!(dataset.header.attributes.source, "FACTS: glaciers-test");
    assert_eq!(dataset.header.location_ids(), vec![-1]);
    assert!(dataset.header.lats()[0].is_infinite());

    let regional = FRACTIONS
        .parse::<RegionalFractions>()
        .unwrap()
        .disaggregate(&global)
        .unwrap();
    let sites = vec![Site::new("a", 10, 12.0, 45.0)];
    let header = local_header(&regional, &sites, "ssp245", 2005);
    assert_eq!(header.shape(), (36, 3, 1));
    assert_eq!(header.attributes.source, "SLR Framework: AR5 workflow");
    assert!(header.missing_value.map_or(false, f32::is_nan));
}
