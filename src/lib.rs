//! IPCC AR5 glacier contributions to sea-level rise
//!
//! Glues the projection and localization crates to their file formats: run
//! configuration, input readers, NetCDF outputs and the end-to-end [`run_glaciers`]
//! pipeline behind the `ipccar5` command.

pub mod config;
pub mod io;
pub mod pipeline;
#[cfg(feature = "python")]
pub mod python;

pub use config::RunConfig;
pub use pipeline::{run_glaciers, RunSummary};
