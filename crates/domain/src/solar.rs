//! Solar times: sunrise, sunset and twilight instants for a date and place.
//!
//! The computation follows the usual low-precision solar position formulas
//! (mean anomaly, ecliptic longitude, declination, hour angle), accurate to
//! about a minute for latitudes where the event actually happens. Events
//! that do not occur on a given date (polar day or night) are absent from
//! the resulting [`SolarTimes`].

use std::collections::BTreeMap;
use std::f64::consts::PI;

use chrono::{DateTime, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::time::Timestamp;

const RAD: f64 = PI / 180.0;
const DAY_SECS: f64 = 86_400.0;
const J1970: f64 = 2_440_588.0;
const J2000: f64 = 2_451_545.0;
const OBLIQUITY: f64 = RAD * 23.4397;
const J0: f64 = 0.0009;

/// Geographic position used for solar computations.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Location {
    /// Degrees north (negative for south).
    pub latitude: f64,
    /// Degrees east (negative for west).
    pub longitude: f64,
}

impl Location {
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Whether both coordinates are finite and within their ranges.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// A named solar event a timer can be anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolarEvent {
    /// Morning astronomical twilight ends (sun at -18°).
    #[serde(alias = "nightEnd")]
    NightEnd,
    /// Morning nautical twilight starts (sun at -12°).
    #[serde(alias = "nauticalDawn")]
    NauticalDawn,
    /// Morning civil twilight starts (sun at -6°).
    Dawn,
    /// Top edge of the sun appears on the horizon.
    Sunrise,
    /// Bottom edge of the sun touches the horizon.
    #[serde(alias = "sunriseEnd")]
    SunriseEnd,
    /// Morning golden hour ends (sun at 6°).
    #[serde(alias = "goldenHourEnd")]
    GoldenHourEnd,
    /// Sun at its highest position.
    #[serde(alias = "solarNoon")]
    SolarNoon,
    /// Evening golden hour starts.
    #[serde(alias = "goldenHour")]
    GoldenHour,
    /// Bottom edge of the sun touches the horizon.
    #[serde(alias = "sunsetStart")]
    SunsetStart,
    /// Sun disappears below the horizon.
    Sunset,
    /// Evening civil twilight ends.
    Dusk,
    /// Evening nautical twilight ends.
    #[serde(alias = "nauticalDusk")]
    NauticalDusk,
    /// Astronomical night starts.
    Night,
    /// Sun at its lowest position.
    Nadir,
}

impl std::fmt::Display for SolarEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::NightEnd => "night_end",
            Self::NauticalDawn => "nautical_dawn",
            Self::Dawn => "dawn",
            Self::Sunrise => "sunrise",
            Self::SunriseEnd => "sunrise_end",
            Self::GoldenHourEnd => "golden_hour_end",
            Self::SolarNoon => "solar_noon",
            Self::GoldenHour => "golden_hour",
            Self::SunsetStart => "sunset_start",
            Self::Sunset => "sunset",
            Self::Dusk => "dusk",
            Self::NauticalDusk => "nautical_dusk",
            Self::Night => "night",
            Self::Nadir => "nadir",
        };
        f.write_str(name)
    }
}

/// Sun altitude (degrees) and the morning/evening events crossing it.
const ALTITUDES: [(f64, SolarEvent, SolarEvent); 6] = [
    (-0.833, SolarEvent::Sunrise, SolarEvent::Sunset),
    (-0.3, SolarEvent::SunriseEnd, SolarEvent::SunsetStart),
    (-6.0, SolarEvent::Dawn, SolarEvent::Dusk),
    (-12.0, SolarEvent::NauticalDawn, SolarEvent::NauticalDusk),
    (-18.0, SolarEvent::NightEnd, SolarEvent::Night),
    (6.0, SolarEvent::GoldenHourEnd, SolarEvent::GoldenHour),
];

/// Solar event instants for one calendar date.
#[derive(Debug, Clone, PartialEq)]
pub struct SolarTimes {
    date: NaiveDate,
    times: BTreeMap<SolarEvent, Timestamp>,
}

impl SolarTimes {
    /// Compute every solar event for `date` at `location`.
    #[must_use]
    pub fn compute(date: NaiveDate, location: Location) -> Self {
        let reference = date.and_time(NaiveTime::MIN).and_utc() + chrono::Duration::hours(12);

        let lw = RAD * -location.longitude;
        let phi = RAD * location.latitude;

        let d = to_days(reference);
        let n = julian_cycle(d, lw);
        let ds = approx_transit(0.0, lw, n);

        let m = solar_mean_anomaly(ds);
        let l = ecliptic_longitude(m);
        let dec = declination(l, 0.0);

        let j_noon = solar_transit_j(ds, m, l);

        let mut times = BTreeMap::new();
        if let Some(ts) = from_julian(j_noon) {
            times.insert(SolarEvent::SolarNoon, ts);
        }
        if let Some(ts) = from_julian(j_noon - 0.5) {
            times.insert(SolarEvent::Nadir, ts);
        }

        for (altitude, morning, evening) in ALTITUDES {
            let Some(j_set) = set_j(altitude * RAD, lw, phi, dec, n, m, l) else {
                continue;
            };
            let j_rise = j_noon - (j_set - j_noon);
            if let Some(ts) = from_julian(j_rise) {
                times.insert(morning, ts);
            }
            if let Some(ts) = from_julian(j_set) {
                times.insert(evening, ts);
            }
        }

        Self { date, times }
    }

    /// Build from explicit instants (useful for fixed or external sources).
    #[must_use]
    pub fn from_times(
        date: NaiveDate,
        times: impl IntoIterator<Item = (SolarEvent, Timestamp)>,
    ) -> Self {
        Self {
            date,
            times: times.into_iter().collect(),
        }
    }

    /// The date these times were computed for.
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// The instant of `event`, or `None` when it does not occur on this date.
    #[must_use]
    pub fn get(&self, event: SolarEvent) -> Option<Timestamp> {
        self.times.get(&event).copied()
    }

    /// Iterate over the events that occur, in event order.
    pub fn iter(&self) -> impl Iterator<Item = (SolarEvent, Timestamp)> + '_ {
        self.times.iter().map(|(event, ts)| (*event, *ts))
    }
}

#[allow(clippy::cast_precision_loss)]
fn to_days(ts: Timestamp) -> f64 {
    let julian = ts.timestamp_millis() as f64 / 1000.0 / DAY_SECS - 0.5 + J1970;
    julian - J2000
}

#[allow(clippy::cast_possible_truncation)]
fn from_julian(j: f64) -> Option<Timestamp> {
    if !j.is_finite() {
        return None;
    }
    let millis = ((j + 0.5 - J1970) * DAY_SECS * 1000.0).round() as i64;
    DateTime::from_timestamp_millis(millis)
}

fn declination(l: f64, b: f64) -> f64 {
    (b.sin() * OBLIQUITY.cos() + b.cos() * OBLIQUITY.sin() * l.sin()).asin()
}

fn solar_mean_anomaly(d: f64) -> f64 {
    RAD * (357.5291 + 0.985_600_28 * d)
}

fn ecliptic_longitude(m: f64) -> f64 {
    let center = RAD * (1.9148 * m.sin() + 0.02 * (2.0 * m).sin() + 0.0003 * (3.0 * m).sin());
    let perihelion = RAD * 102.9372;
    m + center + perihelion + PI
}

fn julian_cycle(d: f64, lw: f64) -> f64 {
    (d - J0 - lw / (2.0 * PI)).round()
}

fn approx_transit(ht: f64, lw: f64, n: f64) -> f64 {
    J0 + (ht + lw) / (2.0 * PI) + n
}

fn solar_transit_j(ds: f64, m: f64, l: f64) -> f64 {
    J2000 + ds + 0.0053 * m.sin() - 0.0069 * (2.0 * l).sin()
}

fn hour_angle(h: f64, phi: f64, dec: f64) -> Option<f64> {
    let cos_w = (h.sin() - phi.sin() * dec.sin()) / (phi.cos() * dec.cos());
    (-1.0..=1.0).contains(&cos_w).then(|| cos_w.acos())
}

fn set_j(h: f64, lw: f64, phi: f64, dec: f64, n: f64, m: f64, l: f64) -> Option<f64> {
    let w = hour_angle(h, phi, dec)?;
    let a = approx_transit(w, lw, n);
    Some(solar_transit_j(a, m, l))
}
