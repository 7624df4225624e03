//! Timer: a configured rule that drives an output at a fixed time of day
//! or relative to a solar event.
//!
//! Timers come from configuration and are never persisted. Fixed-time timers
//! recur natively; solar timers must be recomputed every day because the
//! underlying instants drift.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::device::DeviceState;
use crate::error::ValidationError;
use crate::solar::{SolarEvent, SolarTimes};
use crate::time::{Timestamp, parse_time_of_day};

/// A rule that applies `state` to its device when it fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timer {
    /// Disabled timers are kept in the device description but never scheduled.
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// Target output state.
    pub state: DeviceState,
    /// When the timer fires.
    #[serde(flatten)]
    pub schedule: TimerSchedule,
}

fn enabled_by_default() -> bool {
    true
}

/// The firing rule of a [`Timer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimerSchedule {
    /// Every day at a literal wall-clock time.
    Time { time: TimeOfDay },
    /// Every day at a solar event shifted by `offset`.
    Sun {
        condition: SolarEvent,
        #[serde(default)]
        offset: SolarOffset,
    },
}

impl Timer {
    /// Build a fixed time-of-day timer.
    #[must_use]
    pub fn at(time: NaiveTime, state: impl Into<DeviceState>) -> Self {
        Self {
            enabled: true,
            state: state.into(),
            schedule: TimerSchedule::Time {
                time: TimeOfDay(time),
            },
        }
    }

    /// Build a solar-relative timer.
    #[must_use]
    pub fn sun(condition: SolarEvent, offset: SolarOffset, state: impl Into<DeviceState>) -> Self {
        Self {
            enabled: true,
            state: state.into(),
            schedule: TimerSchedule::Sun { condition, offset },
        }
    }

    /// Return a disabled copy of this timer.
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Whether this timer is anchored to a solar event.
    #[must_use]
    pub fn is_solar(&self) -> bool {
        matches!(self.schedule, TimerSchedule::Sun { .. })
    }

    /// The firing instant on the date of `times`, for solar timers.
    ///
    /// Returns `None` for fixed-time timers, or when the solar event does
    /// not occur on that date.
    #[must_use]
    pub fn solar_instant(&self, times: &SolarTimes) -> Option<Timestamp> {
        match &self.schedule {
            TimerSchedule::Sun { condition, offset } => {
                times.get(*condition).map(|ts| ts + offset.as_delta())
            }
            TimerSchedule::Time { .. } => None,
        }
    }
}

impl fmt::Display for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schedule {
            TimerSchedule::Time { time } => write!(f, "time({time}) -> {}", self.state),
            TimerSchedule::Sun { condition, offset } => {
                write!(f, "sun({condition}{offset}) -> {}", self.state)
            }
        }
    }
}

/// Wall-clock time of day, written `HH:MM` or `HH:MM:SS` in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay(NaiveTime);

impl TimeOfDay {
    #[must_use]
    pub fn new(time: NaiveTime) -> Self {
        Self(time)
    }

    #[must_use]
    pub fn as_naive(self) -> NaiveTime {
        self.0
    }
}

impl FromStr for TimeOfDay {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_time_of_day(s)
            .map(Self)
            .ok_or_else(|| ValidationError::InvalidTimeOfDay(s.to_string()))
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(value: TimeOfDay) -> Self {
        value.to_string()
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M:%S"))
    }
}

/// Signed shift applied to a solar event, written `[+-]HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SolarOffset(TimeDelta);

impl Default for SolarOffset {
    fn default() -> Self {
        Self(TimeDelta::zero())
    }
}

impl SolarOffset {
    #[must_use]
    pub fn minutes(minutes: i64) -> Self {
        Self(TimeDelta::minutes(minutes))
    }

    #[must_use]
    pub fn as_delta(self) -> TimeDelta {
        self.0
    }
}

impl FromStr for SolarOffset {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidOffset(s.to_string());
        let trimmed = s.trim();
        let (negative, body) = match trimmed.as_bytes().first() {
            Some(b'-') => (true, &trimmed[1..]),
            Some(b'+') => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };
        let (hours, minutes) = body.split_once(':').ok_or_else(invalid)?;
        let hours: i64 = hours.parse().map_err(|_| invalid())?;
        let minutes: i64 = minutes.parse().map_err(|_| invalid())?;
        if !(0..60).contains(&minutes) || !(0..24).contains(&hours) {
            return Err(invalid());
        }
        let total = hours * 60 + minutes;
        Ok(Self::minutes(if negative { -total } else { total }))
    }
}

impl TryFrom<String> for SolarOffset {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SolarOffset> for String {
    fn from(value: SolarOffset) -> Self {
        value.to_string()
    }
}

impl fmt::Display for SolarOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.0.num_minutes();
        let sign = if total < 0 { '-' } else { '+' };
        let total = total.abs();
        write!(f, "{sign}{:02}:{:02}", total / 60, total % 60)
    }
}
