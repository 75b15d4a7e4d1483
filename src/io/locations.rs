//! Site list reader
//!
//! One site per line, tab-separated: `name  id  lat  lon`.

use ipccar5_core::errors::{Ar5Error, Ar5Result};
use ipccar5_core::spatial::Site;
use std::io::BufRead;
use std::path::Path;

const WHAT: &str = "location file";

pub fn read_locations(path: &Path) -> Ar5Result<Vec<Site>> {
    let file = std::fs::File::open(path).map_err(|e| Ar5Error::io(path, e))?;
    parse_locations(std::io::BufReader::new(file))
}

pub fn parse_locations<B: BufRead>(reader: B) -> Ar5Result<Vec<Site>> {
    let mut sites = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let number = index + 1;
        let line = line.map_err(|e| parse_error(number, e.to_string()))?;
        if line.trim().is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split('\t').map(str::trim).collect();
        let [name, id, lat, lon] = parts[..] else {
            return Err(parse_error(
                number,
                format!("expected 4 tab-separated fields, found {}", parts.len()),
            ));
        };
        sites.push(Site::new(
            name,
            parse_field(id, number)?,
            parse_field(lat, number)?,
            parse_field(lon, number)?,
        ));
    }
    Ok(sites)
}

fn parse_field<T: std::str::FromStr>(field: &str, line: usize) -> Ar5Result<T>
where
    T::Err: std::fmt::Display,
{
    field
        .parse()
        .map_err(|e| parse_error(line, format!("'{}': {}", field, e)))
}

fn parse_error(line: usize, reason: String) -> Ar5Error {
    Ar5Error::Parse {
        what: WHAT.to_string(),
        line,
        reason,
    }
}
