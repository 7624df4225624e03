//! Solar time port: when the sun does what, for a date and place.

use chrono::NaiveDate;

use domohub_domain::solar::{Location, SolarTimes};

/// Computes solar event instants.
pub trait SolarTimeSource: Send + Sync {
    fn solar_times(&self, date: NaiveDate, location: Location) -> SolarTimes;
}
