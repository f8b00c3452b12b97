use crate::{LookupError, LookupResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, warn};

/// Directory identifier of a city.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CityId(pub i64);

impl fmt::Display for CityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Directory rows (as delivered by the ingestion side)
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CityRecord {
    pub id: i64,
    pub country: String,
    pub name: String,
    #[serde(default)]
    pub name_english: String,
    pub code: String,
    /// Hours east of UTC; fractional zones are allowed.
    pub utc_offset: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AirportRecord {
    pub id: i64,
    pub city_id: i64,
    pub name: String,
    #[serde(default)]
    pub name_english: String,
    #[serde(default)]
    pub code: String,
}

// ============================================================================
// Resolved entities
// ============================================================================

#[derive(Debug, Clone)]
pub struct City {
    pub id: CityId,
    pub name: String,
    pub name_english: String,
    pub country: String,
    pub code: String,
    pub utc_offset_hours: f64,
    airports: Vec<usize>,
}

impl City {
    /// UTC offset in whole seconds, rounded to the nearest second.
    pub fn utc_offset_seconds(&self) -> i64 {
        (self.utc_offset_hours * 3600.0).round() as i64
    }

    /// Human-readable form including the names of the city's airports.
    pub fn display<'a>(&'a self, gazetteer: &'a Gazetteer) -> CityDisplay<'a> {
        CityDisplay { city: self, gazetteer }
    }
}

pub struct CityDisplay<'a> {
    city: &'a City,
    gazetteer: &'a Gazetteer,
}

impl fmt::Display for CityDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let city = self.city;
        let airports = self
            .gazetteer
            .airports_of(city)
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        write!(
            f,
            "{} - {} ({}|{}|{}|{}) {}",
            city.name, city.name_english, city.id, city.code, city.country, airports, city.utc_offset_hours
        )
    }
}

#[derive(Debug, Clone)]
pub struct Airport {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub name_english: String,
    pub city_id: CityId,
    // Slot of the owning city in the gazetteer's city table. Lookup only.
    city: usize,
}

impl Airport {
    pub fn display<'a>(&'a self, gazetteer: &'a Gazetteer) -> AirportDisplay<'a> {
        AirportDisplay { airport: self, gazetteer }
    }
}

pub struct AirportDisplay<'a> {
    airport: &'a Airport,
    gazetteer: &'a Gazetteer,
}

impl fmt::Display for AirportDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let airport = self.airport;
        write!(
            f,
            "{} - {} ({}|{}|{})",
            airport.name,
            airport.name_english,
            airport.id,
            airport.code,
            self.gazetteer.city_of(airport).name
        )
    }
}

// ============================================================================
// Gazetteer
// ============================================================================

const MAX_UTC_OFFSET_HOURS: f64 = 24.0;

/// Immutable city/airport code directory, built once and shared read-only.
#[derive(Debug, Default)]
pub struct Gazetteer {
    cities: Vec<City>,
    airports: Vec<Airport>,
    by_city_code: HashMap<String, usize>,
    by_airport_code: HashMap<String, usize>,
}

impl Gazetteer {
    /// Build the directory from parsed city and airport rows.
    ///
    /// Cities with a UTC offset outside +/-24h (or not a number) are dropped with a warning.
    /// Airports that reference a city id missing from `cities` are dropped with a warning,
    /// so every airport left in the directory points at a city of the same instance.
    pub fn build<C, A>(cities: C, airports: A) -> Self
    where
        C: IntoIterator<Item = CityRecord>,
        A: IntoIterator<Item = AirportRecord>,
    {
        let mut gazetteer = Gazetteer::default();
        let mut by_city_id: HashMap<i64, usize> = HashMap::new();

        for record in cities {
            if !(-MAX_UTC_OFFSET_HOURS..=MAX_UTC_OFFSET_HOURS).contains(&record.utc_offset) {
                warn!(
                    city_id = record.id,
                    utc_offset = record.utc_offset,
                    "UTC offset out of range, dropping city"
                );
                continue;
            }
            let slot = gazetteer.cities.len();
            let code = record.code.trim().to_string();

            if by_city_id.insert(record.id, slot).is_some() {
                warn!(city_id = record.id, "Duplicate city id in directory, later row wins");
            }
            if !code.is_empty() && gazetteer.by_city_code.insert(code.clone(), slot).is_some() {
                warn!(code = %code, "Duplicate city code in directory, later row wins");
            }

            gazetteer.cities.push(City {
                id: CityId(record.id),
                name: record.name,
                name_english: record.name_english,
                country: record.country,
                code,
                utc_offset_hours: record.utc_offset,
                airports: Vec::new(),
            });
        }

        for record in airports {
            let Some(&city) = by_city_id.get(&record.city_id) else {
                warn!(
                    airport_id = record.id,
                    city_id = record.city_id,
                    name = %record.name,
                    "No city for airport, dropping it"
                );
                continue;
            };

            let slot = gazetteer.airports.len();
            let code = record.code.trim().to_string();
            if !code.is_empty() && gazetteer.by_airport_code.insert(code.clone(), slot).is_some() {
                warn!(code = %code, "Duplicate airport code in directory, later row wins");
            }

            gazetteer.cities[city].airports.push(slot);
            gazetteer.airports.push(Airport {
                id: record.id,
                code,
                name: record.name,
                name_english: record.name_english,
                city_id: gazetteer.cities[city].id,
                city,
            });
        }

        debug!(
            cities = gazetteer.cities.len(),
            airports = gazetteer.airports.len(),
            "Gazetteer built"
        );
        gazetteer
    }

    /// Resolve a city or airport code to its city. City codes take precedence.
    pub fn resolve(&self, code: &str) -> LookupResult<&City> {
        let code = code.trim();
        if let Some(&slot) = self.by_city_code.get(code) {
            return Ok(&self.cities[slot]);
        }
        if let Some(&slot) = self.by_airport_code.get(code) {
            return Ok(self.city_of(&self.airports[slot]));
        }
        Err(LookupError::UnknownCode(code.to_string()))
    }

    /// Look up an airport by its own code only.
    pub fn airport(&self, code: &str) -> LookupResult<&Airport> {
        let code = code.trim();
        self.by_airport_code
            .get(code)
            .map(|&slot| &self.airports[slot])
            .ok_or_else(|| LookupError::UnknownAirport(code.to_string()))
    }

    pub fn city_of(&self, airport: &Airport) -> &City {
        &self.cities[airport.city]
    }

    pub fn airports_of<'a>(&'a self, city: &'a City) -> impl Iterator<Item = &'a Airport> + 'a {
        city.airports.iter().map(move |&slot| &self.airports[slot])
    }

    /// Whether `airport` is one of `city`'s airports.
    pub fn serves(&self, city: &City, airport: &Airport) -> bool {
        std::ptr::eq(self.city_of(airport), city)
    }

    pub fn city_count(&self) -> usize {
        self.cities.len()
    }

    pub fn airport_count(&self) -> usize {
        self.airports.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn city(id: i64, code: &str, utc_offset: f64) -> CityRecord {
        CityRecord {
            id,
            country: "RU".to_string(),
            name: format!("City {}", code),
            name_english: code.to_string(),
            code: code.to_string(),
            utc_offset,
        }
    }

    fn airport(id: i64, city_id: i64, code: &str) -> AirportRecord {
        AirportRecord {
            id,
            city_id,
            name: format!("Airport {}", code),
            name_english: code.to_string(),
            code: code.to_string(),
        }
    }

    fn sample() -> Gazetteer {
        Gazetteer::build(
            vec![city(1, "MOW", 3.0), city(2, "LED", 3.0), city(3, "KRR", 3.0)],
            vec![
                airport(10, 1, "SVO"),
                airport(11, 1, "DME"),
                airport(20, 2, "LED"),
                airport(99, 42, "XXX"),
            ],
        )
    }

    #[test]
    fn test_resolve_prefers_city_code() {
        let gazetteer = sample();
        let city = gazetteer.resolve("LED").expect("LED should resolve");
        assert_eq!(city.id, CityId(2));
        assert_eq!(city.code, "LED");
    }

    #[test]
    fn test_resolve_falls_back_to_airport() {
        let gazetteer = sample();
        let city = gazetteer.resolve("DME").unwrap();
        assert_eq!(city.code, "MOW");
        assert!(std::ptr::eq(city, gazetteer.resolve("MOW").unwrap()));
    }

    #[test]
    fn test_resolve_trims_and_rejects_unknown() {
        let gazetteer = sample();
        assert_eq!(gazetteer.resolve(" SVO ").unwrap().code, "MOW");
        assert_eq!(
            gazetteer.resolve("ZZZ").unwrap_err(),
            LookupError::UnknownCode("ZZZ".to_string())
        );
    }

    #[test]
    fn test_orphan_airport_is_dropped() {
        let gazetteer = sample();
        assert_eq!(gazetteer.airport_count(), 3);
        assert!(gazetteer.airport("XXX").is_err());
    }

    #[test]
    fn test_city_with_unusable_offset_is_dropped() {
        let gazetteer = Gazetteer::build(
            vec![
                city(1, "MOW", 3.0),
                city(2, "BIG", 1e300),
                city(3, "NAN", f64::NAN),
                city(4, "KTM", -24.0),
            ],
            vec![airport(10, 1, "SVO"), airport(20, 2, "BGA")],
        );
        assert_eq!(gazetteer.city_count(), 2);
        assert!(gazetteer.resolve("BIG").is_err());
        assert!(gazetteer.resolve("NAN").is_err());
        assert!(gazetteer.resolve("BGA").is_err());
        assert_eq!(gazetteer.resolve("KTM").unwrap().utc_offset_seconds(), -86_400);
        assert_eq!(gazetteer.airport_count(), 1);
    }

    #[test]
    fn test_serves() {
        let gazetteer = sample();
        let moscow = gazetteer.resolve("MOW").unwrap();
        let spb = gazetteer.resolve("LED").unwrap();
        let svo = gazetteer.airport("SVO").unwrap();
        assert!(gazetteer.serves(moscow, svo));
        assert!(!gazetteer.serves(spb, svo));
        assert_eq!(gazetteer.airports_of(moscow).count(), 2);
        let krasnodar = gazetteer.resolve("KRR").unwrap();
        assert_eq!(gazetteer.airports_of(krasnodar).count(), 0);
    }

    #[test]
    fn test_city_display_lists_airports() {
        let gazetteer = sample();
        let moscow = gazetteer.resolve("MOW").unwrap();
        assert_eq!(
            moscow.display(&gazetteer).to_string(),
            "City MOW - MOW (1|MOW|RU|Airport SVO, Airport DME) 3"
        );
    }

    #[test]
    fn test_airport_display_names_city() {
        let gazetteer = sample();
        let svo = gazetteer.airport("SVO").unwrap();
        assert_eq!(svo.display(&gazetteer).to_string(), "Airport SVO - SVO (10|SVO|City MOW)");
    }

    #[test]
    fn test_fractional_offset() {
        let gazetteer = Gazetteer::build(vec![city(7, "DEL", 5.5)], Vec::new());
        assert_eq!(gazetteer.resolve("DEL").unwrap().utc_offset_seconds(), 19_800);
    }
}
