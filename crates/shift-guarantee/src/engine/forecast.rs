use super::estimator::Location;

const FLAT_DEMAND: f64 = 0.5;

/// Four hourly demand samples per day part, indexed by offset into the part modulo 4.
struct DemandPattern {
    night: [f64; 4],
    morning: [f64; 4],
    afternoon: [f64; 4],
    evening: [f64; 4],
}

const DOWNTOWN: DemandPattern = DemandPattern {
    night: [0.4, 0.3, 0.2, 0.3],
    morning: [0.3, 0.5, 0.7, 0.8],
    afternoon: [0.6, 0.5, 0.4, 0.5],
    evening: [0.9, 1.0, 0.95, 0.8],
};

const SUBURB: DemandPattern = DemandPattern {
    night: [0.2, 0.15, 0.1, 0.2],
    morning: [0.2, 0.3, 0.4, 0.5],
    afternoon: [0.3, 0.4, 0.5, 0.6],
    evening: [0.7, 0.8, 0.75, 0.6],
};

/// Fixed day-part demand curves per location. Rural zones have no curve and
/// forecast a flat 0.5.
#[derive(Debug, Clone, Copy, Default)]
pub struct DemandForecaster;

impl DemandForecaster {
    pub fn new() -> Self {
        Self
    }

    /// Demand level in `[0, 1]` for the given hour (0..=23, larger values are clamped).
    pub fn forecast(&self, location: Location, hour: u8) -> f64 {
        let pattern = match location {
            Location::Downtown => &DOWNTOWN,
            Location::Suburb => &SUBURB,
            Location::Rural => return FLAT_DEMAND,
        };

        let hour = usize::from(hour.min(23));
        match hour {
            0..=5 => pattern.night[hour % 4],
            6..=11 => pattern.morning[(hour - 6) % 4],
            12..=16 => pattern.afternoon[(hour - 12) % 4],
            _ => pattern.evening[(hour - 17) % 4],
        }
    }

    /// Highest-demand hours, descending, earlier hour first when tied.
    pub fn peak_hours(&self, location: Location, top_n: usize) -> Vec<(u8, f64)> {
        let mut hours: Vec<(u8, f64)> = (0..24u8)
            .map(|hour| (hour, self.forecast(location, hour)))
            .collect();
        hours.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        hours.truncate(top_n);
        hours
    }
}
