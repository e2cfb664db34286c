//! Booking rules and service timeouts.
//!
//! Defaults reproduce the clinic's standard day (08:00 to 18:00) and a five
//! second budget per operation. Both can be overridden from the environment
//! or from the `[scheduling]` section of `repository.toml`.

use std::time::Duration;

use chrono::NaiveTime;

const DEFAULT_OPENING: (u32, u32) = (8, 0);
const DEFAULT_CLOSING: (u32, u32) = (18, 0);
const DEFAULT_TIMEOUT_MS: u64 = 5_000;

/// Business-hours window for appointment start times.
///
/// A booking is accepted when its start time-of-day lies in
/// `[opening, closing]`, both ends inclusive. Only the start is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookingRules {
    pub opening: NaiveTime,
    pub closing: NaiveTime,
}

impl BookingRules {
    pub fn new(opening: NaiveTime, closing: NaiveTime) -> Result<Self, String> {
        if opening > closing {
            return Err(format!(
                "opening time {} is after closing time {}",
                opening.format("%H:%M"),
                closing.format("%H:%M")
            ));
        }
        Ok(Self { opening, closing })
    }

    /// Whether `time` is an acceptable start time-of-day.
    pub fn admits(&self, time: NaiveTime) -> bool {
        time >= self.opening && time <= self.closing
    }
}

impl Default for BookingRules {
    fn default() -> Self {
        Self {
            opening: hm(DEFAULT_OPENING),
            closing: hm(DEFAULT_CLOSING),
        }
    }
}

fn hm((hour, minute): (u32, u32)) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

/// Parse a `HH:MM` (or `HH:MM:SS`) time of day.
pub fn parse_time_of_day(value: &str) -> Result<NaiveTime, String> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|e| format!("invalid time of day '{}': {}", value, e))
}

/// Settings for [`crate::scheduling::SchedulingService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulingConfig {
    pub rules: BookingRules,
    /// Budget for each service operation unless a caller overrides it.
    pub operation_timeout: Duration,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            rules: BookingRules::default(),
            operation_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

impl SchedulingConfig {
    /// Load configuration from environment variables.
    ///
    /// * `BOOKING_OPENING_TIME` - `HH:MM`, default `08:00`
    /// * `BOOKING_CLOSING_TIME` - `HH:MM`, default `18:00`
    /// * `BOOKING_TIMEOUT_MS` - per-operation timeout, default `5000`
    pub fn from_env() -> Result<Self, String> {
        let defaults = BookingRules::default();

        let opening = match std::env::var("BOOKING_OPENING_TIME") {
            Ok(v) => parse_time_of_day(&v)?,
            Err(_) => defaults.opening,
        };
        let closing = match std::env::var("BOOKING_CLOSING_TIME") {
            Ok(v) => parse_time_of_day(&v)?,
            Err(_) => defaults.closing,
        };
        let timeout_ms = match std::env::var("BOOKING_TIMEOUT_MS") {
            Ok(v) => v
                .trim()
                .parse::<u64>()
                .map_err(|e| format!("invalid BOOKING_TIMEOUT_MS '{}': {}", v, e))?,
            Err(_) => DEFAULT_TIMEOUT_MS,
        };
        if timeout_ms == 0 {
            return Err("BOOKING_TIMEOUT_MS must be greater than zero".to_string());
        }

        Ok(Self {
            rules: BookingRules::new(opening, closing)?,
            operation_timeout: Duration::from_millis(timeout_ms),
        })
    }

    pub fn with_rules(mut self, rules: BookingRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }
}
