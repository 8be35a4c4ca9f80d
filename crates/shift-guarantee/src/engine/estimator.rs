use super::EngineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Operating zones with a fixed base hourly rate. Keys parse the same way from JSON,
/// CSV, and the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum Location {
    Downtown,
    Suburb,
    Rural,
}

impl Location {
    pub fn ordered() -> [Location; 3] {
        [Location::Downtown, Location::Suburb, Location::Rural]
    }

    pub fn key(&self) -> &'static str {
        match self {
            Location::Downtown => "downtown",
            Location::Suburb => "suburb",
            Location::Rural => "rural",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Location::Downtown => "Downtown",
            Location::Suburb => "Suburb",
            Location::Rural => "Rural",
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Location {
    type Err = EngineError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "downtown" => Ok(Location::Downtown),
            "suburb" => Ok(Location::Suburb),
            "rural" => Ok(Location::Rural),
            other => Err(EngineError::invalid(
                "location",
                format!("unknown location key '{other}'"),
            )),
        }
    }
}

impl TryFrom<String> for Location {
    type Error = EngineError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

/// Hour-of-day bands. A boundary hour belongs to the band that starts at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeBand {
    Night,
    Business,
    EveningPeak,
    Late,
}

impl TimeBand {
    pub fn for_hour(hour: u8) -> Self {
        match hour {
            0..=6 => TimeBand::Night,
            7..=16 => TimeBand::Business,
            17..=20 => TimeBand::EveningPeak,
            _ => TimeBand::Late,
        }
    }

    pub fn multiplier(&self) -> f64 {
        match self {
            TimeBand::Night => 0.8,
            TimeBand::Business => 1.0,
            TimeBand::EveningPeak => 1.4,
            TimeBand::Late => 0.8,
        }
    }
}

/// Day-of-week classes; `0` is Monday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayType {
    Weekday,
    Friday,
    Weekend,
}

impl DayType {
    pub fn for_day(day_of_week: u8) -> Self {
        match day_of_week {
            0..=3 => DayType::Weekday,
            4 => DayType::Friday,
            _ => DayType::Weekend,
        }
    }

    pub fn multiplier(&self) -> f64 {
        match self {
            DayType::Weekday => 1.1,
            DayType::Friday => 1.2,
            DayType::Weekend => 1.3,
        }
    }
}

/// Base hourly earnings per location before any multiplier is applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateCard {
    pub downtown: f64,
    pub suburb: f64,
    pub rural: f64,
}

impl RateCard {
    pub fn base_rate(&self, location: Location) -> f64 {
        match location {
            Location::Downtown => self.downtown,
            Location::Suburb => self.suburb,
            Location::Rural => self.rural,
        }
    }
}

impl Default for RateCard {
    fn default() -> Self {
        Self {
            downtown: 25.0,
            suburb: 18.0,
            rural: 15.0,
        }
    }
}

/// Deterministic multiplier-table estimator. There is no fitted model behind it.
#[derive(Debug, Clone, Default)]
pub struct EarningsEstimator {
    rates: RateCard,
}

impl EarningsEstimator {
    pub fn new(rates: RateCard) -> Self {
        Self { rates }
    }

    pub fn standard() -> Self {
        Self::default()
    }

    pub fn rates(&self) -> &RateCard {
        &self.rates
    }

    /// Predicted earnings per hour. Out-of-range inputs are clamped: hours above 23 and
    /// days above 6 fall into the last band, demand is clamped to `[0, 1]` with NaN as 0.
    pub fn predict(&self, hour: u8, day_of_week: u8, location: Location, demand_level: f64) -> f64 {
        let hour = hour.min(23);
        let day_of_week = day_of_week.min(6);

        self.rates.base_rate(location)
            * TimeBand::for_hour(hour).multiplier()
            * DayType::for_day(day_of_week).multiplier()
            * demand_multiplier(demand_level)
    }

    /// Sum of hourly predictions across a window, rolling the day forward past midnight.
    pub fn predict_shift(
        &self,
        start_hour: u8,
        day_of_week: u8,
        duration_hours: u8,
        location: Location,
        demand_level: f64,
    ) -> f64 {
        let mut hour = start_hour.min(23);
        let mut day = day_of_week.min(6);
        let mut total = 0.0;

        for _ in 0..duration_hours {
            total += self.predict(hour, day, location, demand_level);
            hour = (hour + 1) % 24;
            if hour == 0 {
                day = (day + 1) % 7;
            }
        }

        total
    }
}

/// Linear from 0.2 at zero demand to 1.2 at full demand.
pub fn demand_multiplier(demand_level: f64) -> f64 {
    let demand = if demand_level.is_nan() {
        0.0
    } else {
        demand_level.clamp(0.0, 1.0)
    };
    0.2 + demand * 1.0
}

/// Strict range check for callers that must reject rather than clamp.
pub fn validate_prediction_input(
    hour: u8,
    day_of_week: u8,
    demand_level: f64,
) -> Result<(), EngineError> {
    if hour > 23 {
        return Err(EngineError::invalid("hour", format!("{hour} is outside 0..=23")));
    }
    if day_of_week > 6 {
        return Err(EngineError::invalid(
            "day_of_week",
            format!("{day_of_week} is outside 0..=6"),
        ));
    }
    if !(0.0..=1.0).contains(&demand_level) {
        return Err(EngineError::invalid(
            "demand_level",
            format!("{demand_level} is outside [0, 1]"),
        ));
    }
    Ok(())
}
