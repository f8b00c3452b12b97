use altis_core::{timestamp, City, FlightSegment};
use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// One candidate itinerary offered for a customer request (one row of the offer batch).
///
/// Field names follow the normalized batch view; the raw export names (`ValueRu`,
/// `FligtOption`, `Position ( from 1 to n)`) are accepted as aliases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offer {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "RequestID")]
    pub request_id: String,
    #[serde(rename = "RequestDate", default, with = "timestamp::optional")]
    pub request_date: Option<NaiveDateTime>,
    #[serde(rename = "ClientID")]
    pub client_id: String,
    #[serde(rename = "TravellerGrade", alias = "ValueRu", default = "grade::missing", deserialize_with = "grade::deserialize")]
    pub traveller_grade: String,
    #[serde(rename = "SearchRoute")]
    pub route: String,
    #[serde(rename = "FlightOption", alias = "FligtOption")]
    pub flight_option: String,
    #[serde(rename = "Amount", deserialize_with = "amount::deserialize")]
    pub amount: f64,
    #[serde(rename = "SegmentCount")]
    pub segment_count: usize,

    #[serde(rename = "RequestDepartureDate", default, with = "timestamp::optional")]
    pub requested_departure: Option<NaiveDateTime>,
    #[serde(rename = "RequestReturnDate", default, with = "timestamp::optional")]
    pub requested_return: Option<NaiveDateTime>,
    #[serde(rename = "DepartureDate", default, with = "timestamp::optional")]
    pub departure: Option<NaiveDateTime>,
    #[serde(rename = "ArrivalDate", default, with = "timestamp::optional")]
    pub arrival: Option<NaiveDateTime>,
    #[serde(rename = "ReturnDepatrureDate", alias = "ReturnDepartureDate", default, with = "timestamp::optional")]
    pub return_departure: Option<NaiveDateTime>,
    #[serde(rename = "ReturnArrivalDate", default, with = "timestamp::optional")]
    pub return_arrival: Option<NaiveDateTime>,

    #[serde(rename = "class", default)]
    pub cabin_class: String,
    #[serde(rename = "IsBaggage", default, deserialize_with = "flag::deserialize")]
    pub is_baggage: bool,
    #[serde(rename = "isRefundPermitted", default, deserialize_with = "flag::deserialize")]
    pub refund_permitted: bool,
    #[serde(rename = "isExchangePermitted", default, deserialize_with = "flag::deserialize")]
    pub exchange_permitted: bool,
    #[serde(rename = "isDiscount", default, deserialize_with = "flag::deserialize")]
    pub discounted: bool,
    #[serde(rename = "InTravelPolicy", default, deserialize_with = "flag::deserialize")]
    pub in_travel_policy: bool,

    /// Position at which the offer was originally presented.
    #[serde(rename = "SentOption", alias = "Position ( from 1 to n)", default)]
    pub sent_option: Option<u32>,
}

impl Offer {
    /// Requested and actual times for one direction of the trip.
    pub fn schedule(&self, direction: LegDirection) -> Schedule {
        match direction {
            LegDirection::Outbound => Schedule {
                requested_departure: self.requested_departure,
                departure: self.departure,
                arrival: self.arrival,
            },
            LegDirection::Return => Schedule {
                requested_departure: self.requested_return,
                departure: self.return_departure,
                arrival: self.return_arrival,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub requested_departure: Option<NaiveDateTime>,
    pub departure: Option<NaiveDateTime>,
    pub arrival: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LegDirection {
    Outbound,
    Return,
}

impl LegDirection {
    pub const ALL: [LegDirection; 2] = [LegDirection::Outbound, LegDirection::Return];

    /// Direction of the n-th part of a route string; only round trips are supported.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

impl fmt::Display for LegDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LegDirection::Outbound => write!(f, "outbound"),
            LegDirection::Return => write!(f, "return"),
        }
    }
}

/// A directed one-way part of an offer, ready for feature extraction.
#[derive(Debug, Clone)]
pub struct Leg<'a> {
    pub offer: &'a Offer,
    pub direction: LegDirection,
    pub from: &'a City,
    pub to: &'a City,
    pub segments: Vec<FlightSegment<'a>>,
    /// Positions of `segments` in the offer's full segment list.
    pub segment_span: Range<usize>,
    pub requested_departure: NaiveDateTime,
    pub departure: NaiveDateTime,
    pub arrival: NaiveDateTime,
    /// Share of the offer amount in proportion to the leg's segment count.
    pub cost: f64,
    /// Arrival minus departure with both ends shifted to UTC.
    pub duration: TimeDelta,
}

mod grade {
    use serde::{Deserialize, Deserializer};

    pub const MISSING: &str = "-1";

    pub fn missing() -> String {
        MISSING.to_string()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<String>::deserialize(deserializer)?
            .map(|g| g.trim().to_string())
            .filter(|g| !g.is_empty())
            .unwrap_or_else(|| MISSING.to_string()))
    }
}

mod amount {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let amount = f64::deserialize(deserializer)?;
        if !amount.is_finite() {
            return Err(serde::de::Error::custom("amount must be finite"));
        }
        Ok(amount)
    }
}

mod flag {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        let Some(text) = Option::<String>::deserialize(deserializer)? else {
            return Ok(false);
        };
        match text.trim() {
            "" | "0" | "0.0" | "false" | "False" | "FALSE" => Ok(false),
            "1" | "1.0" | "true" | "True" | "TRUE" => Ok(true),
            other => Err(serde::de::Error::custom(format!("invalid flag '{}'", other))),
        }
    }
}
