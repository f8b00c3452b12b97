use crate::models::Leg;
use altis_core::{City, CityId};
use chrono::{Datelike, NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const NANOS_PER_HOUR: i64 = 3_600_000_000_000;

/// Flight time between two local wall-clock times, both shifted to UTC first.
///
/// `None` when the shift leaves the representable date range.
pub fn normalized_duration(
    departure: NaiveDateTime,
    arrival: NaiveDateTime,
    from: &City,
    to: &City,
) -> Option<TimeDelta> {
    let departure_utc = departure.checked_sub_signed(TimeDelta::try_seconds(from.utc_offset_seconds())?)?;
    let arrival_utc = arrival.checked_sub_signed(TimeDelta::try_seconds(to.utc_offset_seconds())?)?;
    Some(arrival_utc - departure_utc)
}

/// Whole hours, floored (never rounded).
pub fn whole_hours(duration: TimeDelta) -> i64 {
    match duration.num_nanoseconds() {
        Some(nanos) => nanos.div_euclid(NANOS_PER_HOUR),
        None => duration.num_seconds().div_euclid(3600),
    }
}

/// Seconds between requested and actual departure; negative when the flight leaves early.
pub fn delta_actual_request(actual: NaiveDateTime, requested: NaiveDateTime) -> i64 {
    (actual - requested).num_seconds()
}

/// ISO day index, Monday = 0.
pub fn day_of_week(ts: NaiveDateTime) -> u32 {
    ts.weekday().num_days_from_monday()
}

// ============================================================================
// Feature columns
// ============================================================================

/// Columns of the scoring matrix, in the order the model was trained with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeatureColumn {
    ClientId,
    TravellerGrade,
    From,
    To,
    FlightCompany,
    FlightDuration,
    SegmentCount,
    DeltaActualRequest,
    DepartureDayOfWeek,
    ArrivalDayOfWeek,
    Amount,
    CabinClass,
    IsBaggage,
    RefundPermitted,
    ExchangePermitted,
    Discounted,
    InTravelPolicy,
}

impl FeatureColumn {
    pub const COUNT: usize = 17;

    pub const ALL: [FeatureColumn; Self::COUNT] = [
        FeatureColumn::ClientId,
        FeatureColumn::TravellerGrade,
        FeatureColumn::From,
        FeatureColumn::To,
        FeatureColumn::FlightCompany,
        FeatureColumn::FlightDuration,
        FeatureColumn::SegmentCount,
        FeatureColumn::DeltaActualRequest,
        FeatureColumn::DepartureDayOfWeek,
        FeatureColumn::ArrivalDayOfWeek,
        FeatureColumn::Amount,
        FeatureColumn::CabinClass,
        FeatureColumn::IsBaggage,
        FeatureColumn::RefundPermitted,
        FeatureColumn::ExchangePermitted,
        FeatureColumn::Discounted,
        FeatureColumn::InTravelPolicy,
    ];

    /// Name used by encoder dictionaries and model files.
    pub fn as_str(self) -> &'static str {
        match self {
            FeatureColumn::ClientId => "ClientID",
            FeatureColumn::TravellerGrade => "TravellerGrade",
            FeatureColumn::From => "From",
            FeatureColumn::To => "To",
            FeatureColumn::FlightCompany => "FlightCompany",
            FeatureColumn::FlightDuration => "FlightDuration",
            FeatureColumn::SegmentCount => "SegmentCount",
            FeatureColumn::DeltaActualRequest => "DeltaActualRequest",
            FeatureColumn::DepartureDayOfWeek => "DepartureDateDayOfWeek",
            FeatureColumn::ArrivalDayOfWeek => "ArrivalDateDayOfWeek",
            FeatureColumn::Amount => "Amount",
            FeatureColumn::CabinClass => "class",
            FeatureColumn::IsBaggage => "IsBaggage",
            FeatureColumn::RefundPermitted => "isRefundPermitted",
            FeatureColumn::ExchangePermitted => "isExchangePermitted",
            FeatureColumn::Discounted => "isDiscount",
            FeatureColumn::InTravelPolicy => "InTravelPolicy",
        }
    }

    /// Position in [`FeatureColumn::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for FeatureColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeatureColumn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown feature column '{}'", s))
    }
}

/// A raw feature value before encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Int(i64),
    Real(f64),
    Text(String),
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Int(v) => write!(f, "{}", v),
            Cell::Real(v) => write!(f, "{}", v),
            Cell::Text(v) => f.write_str(v),
        }
    }
}

// ============================================================================
// Per-leg features
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegFeatures {
    pub client_id: String,
    pub traveller_grade: String,
    pub from: CityId,
    pub to: CityId,
    pub flight_company: String,
    pub flight_duration_hours: i64,
    pub segment_count: usize,
    pub delta_actual_request: i64,
    pub departure_day_of_week: u32,
    pub arrival_day_of_week: u32,
    pub amount: f64,
    pub cabin_class: String,
    pub is_baggage: bool,
    pub refund_permitted: bool,
    pub exchange_permitted: bool,
    pub discounted: bool,
    pub in_travel_policy: bool,
}

impl LegFeatures {
    pub fn extract(leg: &Leg<'_>) -> Self {
        let offer = leg.offer;
        let flight_company = leg
            .segments
            .first()
            .map(|s| s.carrier().to_string())
            .unwrap_or_default();

        Self {
            client_id: offer.client_id.clone(),
            traveller_grade: offer.traveller_grade.clone(),
            from: leg.from.id,
            to: leg.to.id,
            flight_company,
            flight_duration_hours: whole_hours(leg.duration),
            segment_count: leg.segments.len(),
            delta_actual_request: delta_actual_request(leg.departure, leg.requested_departure),
            departure_day_of_week: day_of_week(leg.departure),
            arrival_day_of_week: day_of_week(leg.arrival),
            amount: leg.cost,
            cabin_class: offer.cabin_class.clone(),
            is_baggage: offer.is_baggage,
            refund_permitted: offer.refund_permitted,
            exchange_permitted: offer.exchange_permitted,
            discounted: offer.discounted,
            in_travel_policy: offer.in_travel_policy,
        }
    }

    pub fn cell(&self, column: FeatureColumn) -> Cell {
        let flag = |b: bool| Cell::Int(i64::from(b));
        match column {
            FeatureColumn::ClientId => Cell::Text(self.client_id.clone()),
            FeatureColumn::TravellerGrade => Cell::Text(self.traveller_grade.clone()),
            FeatureColumn::From => Cell::Int(self.from.0),
            FeatureColumn::To => Cell::Int(self.to.0),
            FeatureColumn::FlightCompany => Cell::Text(self.flight_company.clone()),
            FeatureColumn::FlightDuration => Cell::Int(self.flight_duration_hours),
            FeatureColumn::SegmentCount => Cell::Int(self.segment_count as i64),
            FeatureColumn::DeltaActualRequest => Cell::Int(self.delta_actual_request),
            FeatureColumn::DepartureDayOfWeek => Cell::Int(i64::from(self.departure_day_of_week)),
            FeatureColumn::ArrivalDayOfWeek => Cell::Int(i64::from(self.arrival_day_of_week)),
            FeatureColumn::Amount => Cell::Real(self.amount),
            FeatureColumn::CabinClass => Cell::Text(self.cabin_class.clone()),
            FeatureColumn::IsBaggage => flag(self.is_baggage),
            FeatureColumn::RefundPermitted => flag(self.refund_permitted),
            FeatureColumn::ExchangePermitted => flag(self.exchange_permitted),
            FeatureColumn::Discounted => flag(self.discounted),
            FeatureColumn::InTravelPolicy => flag(self.in_travel_policy),
        }
    }
}
