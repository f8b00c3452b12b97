use crate::features::normalized_duration;
use crate::models::{Leg, LegDirection, Offer};
use altis_core::{City, FlightSegment, Gazetteer, LookupError, SegmentParseError};
use std::ops::Range;
use tracing::warn;

/// Why a leg of an offer was left out. None of these abort the offer or the request.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecomposeError {
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error("Route part '{0}' is not a pair of location codes")]
    MalformedRoute(String),
    #[error("Segments exhausted before reaching {destination}")]
    SegmentsExhausted { destination: String },
    #[error("Unreadable segment: {0}")]
    Segment(#[from] SegmentParseError),
    #[error("Segment '{segment}' lands at unknown airport '{airport}'")]
    UnknownSegmentAirport { segment: String, airport: String },
    #[error("No {0} schedule on the offer")]
    MissingSchedule(LegDirection),
    #[error("The {0} schedule cannot be shifted to UTC")]
    ScheduleOutOfRange(LegDirection),
}

impl DecomposeError {
    /// Failures caused by walking the segment list rather than resolving the route.
    pub fn is_segment_match(&self) -> bool {
        matches!(
            self,
            DecomposeError::SegmentsExhausted { .. }
                | DecomposeError::Segment(_)
                | DecomposeError::UnknownSegmentAirport { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegSkip {
    pub direction: LegDirection,
    pub reason: DecomposeError,
    /// Segments used up by the failed attempt; they are not handed to later legs.
    pub consumed: Range<usize>,
}

#[derive(Debug, Clone)]
pub struct Decomposition<'a> {
    pub legs: Vec<Leg<'a>>,
    pub skipped: Vec<LegSkip>,
    pub segments_total: usize,
    pub segments_consumed: usize,
}

impl Decomposition<'_> {
    pub fn is_empty(&self) -> bool {
        self.legs.is_empty()
    }

    /// Every consumed segment belongs to exactly one leg attempt, in order, starting at 0.
    pub fn is_prefix_partition(&self) -> bool {
        let mut spans: Vec<Range<usize>> = self
            .legs
            .iter()
            .map(|l| l.segment_span.clone())
            .chain(self.skipped.iter().map(|s| s.consumed.clone()))
            .collect();
        spans.sort_by_key(|s| (s.start, s.end));

        let mut next = 0;
        for span in spans {
            if span.start != next {
                return false;
            }
            next = span.end;
        }
        next == self.segments_consumed && next <= self.segments_total
    }
}

/// Splits an offer into its outbound and return legs.
pub struct ItineraryDecomposer<'g> {
    gazetteer: &'g Gazetteer,
}

impl<'g> ItineraryDecomposer<'g> {
    pub fn new(gazetteer: &'g Gazetteer) -> Self {
        Self { gazetteer }
    }

    pub fn decompose<'a>(&self, offer: &'a Offer) -> Decomposition<'a>
    where
        'g: 'a,
    {
        let segments: Vec<&'a str> = if offer.flight_option.trim().is_empty() {
            Vec::new()
        } else {
            offer.flight_option.split('/').collect()
        };
        let denominator = if offer.segment_count > 0 {
            offer.segment_count
        } else {
            segments.len()
        };

        let mut decomposition = Decomposition {
            legs: Vec::new(),
            skipped: Vec::new(),
            segments_total: segments.len(),
            segments_consumed: 0,
        };
        let mut cursor = 0;

        for (index, part) in offer.route.split('/').enumerate() {
            let Some(direction) = LegDirection::from_index(index) else {
                warn!(
                    request_id = %offer.request_id,
                    offer_id = %offer.id,
                    route = %offer.route,
                    "Route has more than two parts, ignoring the rest"
                );
                break;
            };

            let start = cursor;
            match self.build_leg(offer, direction, part, &segments, &mut cursor, denominator) {
                Ok(leg) => decomposition.legs.push(leg),
                Err(reason) => {
                    warn!(
                        request_id = %offer.request_id,
                        offer_id = %offer.id,
                        %direction,
                        route = part,
                        %reason,
                        "Skipping leg"
                    );
                    decomposition.skipped.push(LegSkip {
                        direction,
                        reason,
                        consumed: start..cursor,
                    });
                }
            }
        }

        decomposition.segments_consumed = cursor;
        decomposition
    }

    fn build_leg<'a>(
        &self,
        offer: &'a Offer,
        direction: LegDirection,
        part: &str,
        segments: &[&'a str],
        cursor: &mut usize,
        denominator: usize,
    ) -> Result<Leg<'a>, DecomposeError>
    where
        'g: 'a,
    {
        let (origin, destination) = split_route(part)?;
        let from: &'a City = self.gazetteer.resolve(origin)?;
        let to: &'a City = self.gazetteer.resolve(destination)?;

        let start = *cursor;
        let mut consumed = Vec::new();
        loop {
            let Some(&raw) = segments.get(*cursor) else {
                return Err(DecomposeError::SegmentsExhausted {
                    destination: to.code.clone(),
                });
            };
            *cursor += 1;

            let segment = FlightSegment::parse(raw)?;
            let airport = self.gazetteer.airport(segment.destination()).map_err(|_| {
                DecomposeError::UnknownSegmentAirport {
                    segment: segment.raw.to_string(),
                    airport: segment.destination().to_string(),
                }
            })?;
            let arrived = self.gazetteer.serves(to, airport);
            consumed.push(segment);
            if arrived {
                break;
            }
        }

        let schedule = offer.schedule(direction);
        let (Some(requested_departure), Some(departure), Some(arrival)) =
            (schedule.requested_departure, schedule.departure, schedule.arrival)
        else {
            return Err(DecomposeError::MissingSchedule(direction));
        };
        let duration = normalized_duration(departure, arrival, from, to)
            .ok_or(DecomposeError::ScheduleOutOfRange(direction))?;

        Ok(Leg {
            offer,
            direction,
            from,
            to,
            cost: leg_cost(offer.amount, consumed.len(), denominator),
            segment_span: start..*cursor,
            segments: consumed,
            requested_departure,
            departure,
            arrival,
            duration,
        })
    }
}

/// `amount * leg_segments / total_segments`; nothing when the offer has no segments at all.
fn leg_cost(amount: f64, leg_segments: usize, total_segments: usize) -> f64 {
    if total_segments == 0 {
        return 0.0;
    }
    amount * leg_segments as f64 / total_segments as f64
}

/// `MOWLED` -> (`MOW`, `LED`): three characters of origin, the rest is the destination.
fn split_route(part: &str) -> Result<(&str, &str), DecomposeError> {
    let part = part.trim();
    let malformed = || DecomposeError::MalformedRoute(part.to_string());
    let split = part.char_indices().nth(3).map(|(i, _)| i).ok_or_else(malformed)?;
    let (origin, destination) = part.split_at(split);
    if destination.trim().is_empty() {
        return Err(malformed());
    }
    Ok((origin, destination))
}

#[cfg(test)]
mod tests {
    use super::*;
    use altis_core::{timestamp, AirportRecord, CityRecord};

    fn gazetteer() -> Gazetteer {
        let city = |id: i64, code: &str| CityRecord {
            id,
            country: "RU".to_string(),
            name: code.to_string(),
            name_english: code.to_string(),
            code: code.to_string(),
            utc_offset: 3.0,
        };
        let airport = |id: i64, city_id: i64, code: &str| AirportRecord {
            id,
            city_id,
            name: code.to_string(),
            name_english: code.to_string(),
            code: code.to_string(),
        };
        Gazetteer::build(
            vec![city(1, "MOW"), city(2, "LED"), city(3, "KZN")],
            vec![
                airport(10, 1, "SVO"),
                airport(11, 1, "DME"),
                airport(20, 2, "LED"),
                airport(30, 3, "KZN"),
            ],
        )
    }

    fn offer(route: &str, flight_option: &str, segment_count: usize) -> Offer {
        let ts = |s: &str| Some(timestamp::parse(s).unwrap());
        Offer {
            id: "1".to_string(),
            request_id: "R1".to_string(),
            request_date: None,
            client_id: "42".to_string(),
            traveller_grade: "-1".to_string(),
            route: route.to_string(),
            flight_option: flight_option.to_string(),
            amount: 900.0,
            segment_count,
            requested_departure: ts("2024-03-01 08:00:00"),
            requested_return: ts("2024-03-05 08:00:00"),
            departure: ts("2024-03-01 09:00:00"),
            arrival: ts("2024-03-01 12:30:00"),
            return_departure: ts("2024-03-05 09:00:00"),
            return_arrival: ts("2024-03-05 10:15:00"),
            cabin_class: "Economy".to_string(),
            is_baggage: false,
            refund_permitted: false,
            exchange_permitted: false,
            discounted: false,
            in_travel_policy: true,
            sent_option: Some(1),
        }
    }

    #[test]
    fn test_connection_is_consumed_until_destination_city() {
        let gazetteer = gazetteer();
        let decomposer = ItineraryDecomposer::new(&gazetteer);
        let offer = offer("KZNLED/LEDKZN", "UT1 KZNSVO/SU2 SVOLED/SU3 LEDKZN", 3);

        let result = decomposer.decompose(&offer);
        assert_eq!(result.legs.len(), 2);
        assert!(result.skipped.is_empty());

        let outbound = &result.legs[0];
        assert_eq!(outbound.direction, LegDirection::Outbound);
        assert_eq!(outbound.segments.len(), 2);
        assert_eq!(outbound.segment_span, 0..2);
        assert_eq!(outbound.cost, 600.0);

        let inbound = &result.legs[1];
        assert_eq!(inbound.direction, LegDirection::Return);
        assert_eq!(inbound.segment_span, 2..3);
        assert_eq!(inbound.cost, 300.0);
        assert!(result.is_prefix_partition());
    }

    #[test]
    fn test_airport_codes_in_route_resolve_to_city() {
        let gazetteer = gazetteer();
        let decomposer = ItineraryDecomposer::new(&gazetteer);
        let offer = offer("SVOLED", "SU2 DMELED", 1);

        let result = decomposer.decompose(&offer);
        assert_eq!(result.legs.len(), 1);
        assert_eq!(result.legs[0].from.code, "MOW");
        assert_eq!(result.legs[0].cost, offer.amount);
    }

    #[test]
    fn test_unknown_code_skips_only_that_leg() {
        let gazetteer = gazetteer();
        let decomposer = ItineraryDecomposer::new(&gazetteer);
        let offer = offer("XXXLED/LEDKZN", "SU3 LEDKZN", 2);

        let result = decomposer.decompose(&offer);
        assert_eq!(result.skipped.len(), 1);
        assert_eq!(
            result.skipped[0].reason,
            DecomposeError::Lookup(LookupError::UnknownCode("XXX".to_string()))
        );
        assert_eq!(result.skipped[0].consumed, 0..0);
        assert_eq!(result.legs.len(), 1);
        assert_eq!(result.legs[0].direction, LegDirection::Return);
        assert!(result.is_prefix_partition());
    }

    #[test]
    fn test_exhausted_segments_are_lost_for_later_legs() {
        let gazetteer = gazetteer();
        let decomposer = ItineraryDecomposer::new(&gazetteer);
        // The outbound never reaches LED, so it eats every segment.
        let offer = offer("MOWLED/LEDMOW", "SU1 SVOKZN/SU2 KZNDME", 2);

        let result = decomposer.decompose(&offer);
        assert!(result.is_empty());
        assert_eq!(result.skipped.len(), 2);
        assert!(result.skipped[0].reason.is_segment_match());
        assert_eq!(result.skipped[0].consumed, 0..2);
        assert_eq!(result.skipped[1].consumed, 2..2);
        assert_eq!(result.segments_consumed, 2);
        assert!(result.is_prefix_partition());
    }

    #[test]
    fn test_unknown_segment_airport_aborts_leg() {
        let gazetteer = gazetteer();
        let decomposer = ItineraryDecomposer::new(&gazetteer);
        let offer = offer("MOWLED", "SU1 SVOPEE/SU2 PEELED", 2);

        let result = decomposer.decompose(&offer);
        assert!(result.is_empty());
        assert!(matches!(
            result.skipped[0].reason,
            DecomposeError::UnknownSegmentAirport { ref airport, .. } if airport == "PEE"
        ));
        assert_eq!(result.segments_consumed, 1);
    }

    #[test]
    fn test_missing_return_schedule() {
        let gazetteer = gazetteer();
        let decomposer = ItineraryDecomposer::new(&gazetteer);
        let mut offer = offer("MOWLED/LEDMOW", "SU1 SVOLED/SU2 LEDSVO", 2);
        offer.return_arrival = None;

        let result = decomposer.decompose(&offer);
        assert_eq!(result.legs.len(), 1);
        assert_eq!(
            result.skipped[0].reason,
            DecomposeError::MissingSchedule(LegDirection::Return)
        );
    }

    #[test]
    fn test_third_route_part_is_ignored() {
        let gazetteer = gazetteer();
        let decomposer = ItineraryDecomposer::new(&gazetteer);
        let offer = offer("MOWLED/LEDKZN/KZNMOW", "SU1 SVOLED/SU2 LEDKZN/SU3 KZNSVO", 3);

        let result = decomposer.decompose(&offer);
        assert_eq!(result.legs.len(), 2);
        assert_eq!(result.segments_consumed, 2);
    }

    #[test]
    fn test_zero_segment_count_uses_descriptor_count() {
        let gazetteer = gazetteer();
        let decomposer = ItineraryDecomposer::new(&gazetteer);
        let offer = offer("MOWLED/LEDMOW", "SU1 SVOLED/SU2 LEDSVO", 0);

        let result = decomposer.decompose(&offer);
        assert_eq!(result.legs[0].cost, 450.0);
        assert_eq!(result.legs[1].cost, 450.0);
    }

    #[test]
    fn test_legs_with_equal_segment_counts_cost_the_same() {
        let gazetteer = gazetteer();
        let decomposer = ItineraryDecomposer::new(&gazetteer);
        let mut offer = offer("MOWLED/LEDMOW", "SU1 SVOLED/SU2 LEDSVO", 3);
        offer.amount = 1000.0;

        let result = decomposer.decompose(&offer);
        assert_eq!(result.legs.len(), 2);
        assert_eq!(result.legs[0].cost, 1000.0 / 3.0);
        assert_eq!(result.legs[1].cost, result.legs[0].cost);
    }

    #[test]
    fn test_sub_cent_amount_is_kept() {
        let gazetteer = gazetteer();
        let decomposer = ItineraryDecomposer::new(&gazetteer);
        let mut offer = offer("MOWLED", "SU1 SVOLED", 1);
        offer.amount = 99.999;

        let result = decomposer.decompose(&offer);
        assert_eq!(result.legs[0].cost, 99.999);
    }

    #[test]
    fn test_schedule_outside_date_range_skips_leg() {
        let gazetteer = gazetteer();
        let decomposer = ItineraryDecomposer::new(&gazetteer);
        let mut offer = offer("MOWLED/LEDMOW", "SU1 SVOLED/SU2 LEDSVO", 2);
        offer.departure = Some(chrono::NaiveDateTime::MIN);

        let result = decomposer.decompose(&offer);
        assert_eq!(result.legs.len(), 1);
        assert_eq!(result.legs[0].direction, LegDirection::Return);
        assert_eq!(
            result.skipped[0].reason,
            DecomposeError::ScheduleOutOfRange(LegDirection::Outbound)
        );
        assert!(result.is_prefix_partition());
    }

    #[test]
    fn test_split_route() {
        assert_eq!(split_route("MOWLED").unwrap(), ("MOW", "LED"));
        assert_eq!(split_route(" MOWLED ").unwrap(), ("MOW", "LED"));
        assert!(split_route("MOW").is_err());
        assert!(split_route("").is_err());
    }
}
