pub mod gazetteer;
pub mod segment;
pub mod timestamp;

pub use gazetteer::{Airport, AirportDisplay, AirportRecord, City, CityDisplay, CityId, CityRecord, Gazetteer};
pub use segment::FlightSegment;

/// A location code that neither the city table nor the airport table knows.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error("Unknown location code: '{0}'")]
    UnknownCode(String),
    #[error("Unknown airport code: '{0}'")]
    UnknownAirport(String),
}

/// A flight-segment descriptor that cannot be split into its parts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SegmentParseError {
    #[error("Empty segment descriptor")]
    Empty,
    #[error("Segment '{0}' has no direction token")]
    MissingDirection(String),
    #[error("Segment '{segment}' has malformed direction token '{direction}'")]
    MalformedDirection { segment: String, direction: String },
}

pub type LookupResult<T> = Result<T, LookupError>;
