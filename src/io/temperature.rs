//! Integrated temperature reader
//!
//! The preprocessing stage hands over a JSON document with the fields of
//! [`TemperatureRecord`](ipccar5_glaciers::temperature::TemperatureRecord).

use ipccar5_core::errors::{Ar5Error, Ar5Result};
use ipccar5_glaciers::TemperatureInputs;
use std::path::Path;

pub fn read_temperature(path: &Path) -> Ar5Result<TemperatureInputs> {
    let file = std::fs::File::open(path).map_err(|e| Ar5Error::io(path, e))?;
    serde_json::from_reader(std::io::BufReader::new(file)).map_err(|e| Ar5Error::Parse {
        what: format!("temperature file {}", path.display()),
        line: e.line(),
        reason: e.to_string(),
    })
}
