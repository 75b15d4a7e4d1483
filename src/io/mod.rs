//! File adapters for run inputs and outputs
//!
//! NetCDF support is only compiled with the `netcdf` feature. Without it the
//! fingerprint directory and the dataset writers fail with
//! [`Ar5Error::Unsupported`](ipccar5_core::errors::Ar5Error::Unsupported).

pub mod locations;
pub mod netcdf;
pub mod temperature;

pub use locations::read_locations;
pub use temperature::read_temperature;
