use crate::{timestamp, SegmentParseError};
use chrono::NaiveDateTime;

/// One physical hop of an itinerary, parsed from a descriptor such as
/// `SU1234 SVOLED 2024-03-01 10:15:00`.
///
/// The direction token is exactly six characters: origin airport code followed by the
/// destination airport code. The departure timestamp is optional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlightSegment<'a> {
    pub raw: &'a str,
    pub flight_number: &'a str,
    pub direction: &'a str,
    pub departure: Option<NaiveDateTime>,
}

impl<'a> FlightSegment<'a> {
    pub fn parse(raw: &'a str) -> Result<Self, SegmentParseError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(SegmentParseError::Empty);
        }

        let (flight_number, rest) = raw.split_once(char::is_whitespace).unwrap_or((raw, ""));
        let rest = rest.trim_start();
        if rest.is_empty() {
            return Err(SegmentParseError::MissingDirection(raw.to_string()));
        }
        let (direction, tail) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));

        if direction.len() != 6 || !direction.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(SegmentParseError::MalformedDirection {
                segment: raw.to_string(),
                direction: direction.to_string(),
            });
        }

        let tail = tail.trim();
        let departure = if tail.is_empty() {
            None
        } else {
            match timestamp::parse(tail) {
                Ok(ts) => Some(ts),
                Err(e) => {
                    tracing::debug!(segment = raw, error = %e, "Ignoring unreadable segment departure");
                    None
                }
            }
        };

        Ok(Self {
            raw,
            flight_number,
            direction,
            departure,
        })
    }

    /// Marketing carrier: the first two characters of the descriptor.
    pub fn carrier(&self) -> &'a str {
        match self.raw.char_indices().nth(2) {
            Some((end, _)) => &self.raw[..end],
            None => self.raw,
        }
    }

    pub fn origin(&self) -> &'a str {
        &self.direction[..3]
    }

    pub fn destination(&self) -> &'a str {
        &self.direction[3..]
    }
}
