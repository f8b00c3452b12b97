use crate::{StoreError, StoreResult};
use altis_core::{AirportRecord, CityRecord, Gazetteer};
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::info;

fn read_rows<T: DeserializeOwned, R: Read>(reader: R) -> StoreResult<Vec<T>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let row: T = result.map_err(|e| match e.position() {
            Some(pos) => StoreError::InvalidRecord {
                line: pos.line(),
                reason: e.to_string(),
            },
            None => StoreError::Csv(e),
        })?;
        rows.push(row);
    }
    Ok(rows)
}

pub fn read_cities<R: Read>(reader: R) -> StoreResult<Vec<CityRecord>> {
    read_rows(reader)
}

pub fn read_airports<R: Read>(reader: R) -> StoreResult<Vec<AirportRecord>> {
    read_rows(reader)
}

/// Build the gazetteer from the city and airport CSV files.
pub fn load_gazetteer(cities: &Path, airports: &Path) -> StoreResult<Gazetteer> {
    let cities = read_cities(File::open(cities)?)?;
    let airports = read_airports(File::open(airports)?)?;
    let gazetteer = Gazetteer::build(cities, airports);
    info!(
        cities = gazetteer.city_count(),
        airports = gazetteer.airport_count(),
        "Directory loaded"
    );
    Ok(gazetteer)
}
