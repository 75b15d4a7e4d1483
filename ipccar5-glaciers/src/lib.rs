//! AR5 glacier and ice-cap contribution to sea level
//!
//! Global projections from an ensemble of empirical power-law methods, split into
//! glacier regions and localized through per-region fingerprints.

pub mod melt;
pub mod parameters;
pub mod postprocess;
pub mod projection;
pub mod regions;
pub mod temperature;

pub use parameters::{GlacierFit, GlacierMethod, HistoricalOffset, MassBalanceConstants};
pub use projection::{project_glaciers, ProjectionEnsemble};
pub use regions::RegionalFractions;
pub use temperature::TemperatureInputs;
