//! Core machinery for AR5-style sea-level projections
//!
//! Sample bookkeeping, year axes, spatial fingerprints and the chunked localization
//! engine shared by the glacier and ice-sheet components.

pub mod dataset;
pub mod localize;
pub mod sampling;
pub mod spatial;
pub mod years;

pub mod errors;
