//! Built-in [`SolarTimeSource`] backed by the domain's solar calculator.

use chrono::NaiveDate;

use domohub_domain::solar::{Location, SolarTimes};

use crate::ports::SolarTimeSource;

/// Computes solar times astronomically; no IO involved.
#[derive(Debug, Clone, Copy, Default)]
pub struct AstronomicalSolarSource;

impl SolarTimeSource for AstronomicalSolarSource {
    fn solar_times(&self, date: NaiveDate, location: Location) -> SolarTimes {
        SolarTimes::compute(date, location)
    }
}
