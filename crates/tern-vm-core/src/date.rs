//! Date objects: an epoch-milliseconds timestamp plus chrono-backed
//! conversions.

use std::cell::Cell;

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};

/// A Date. The timestamp is mutable (`setTime`); everything else derives
/// from it. Invalid dates carry NaN.
#[derive(Debug)]
pub struct JsDate {
    epoch_ms: Cell<f64>,
}

impl JsDate {
    pub fn now() -> Self {
        Self { epoch_ms: Cell::new(Utc::now().timestamp_millis() as f64) }
    }

    pub fn from_epoch_ms(ms: f64) -> Self {
        Self { epoch_ms: Cell::new(ms) }
    }

    /// Parse an ISO-8601 string; invalid input produces an invalid date.
    pub fn from_iso_string(s: &str) -> Self {
        let parsed = DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.timestamp_millis() as f64)
            .or_else(|_| {
                // date-only form: midnight UTC
                chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .map(|d| d.and_hms_opt(0, 0, 0).expect("midnight is valid").and_utc().timestamp_millis() as f64)
            })
            .unwrap_or(f64::NAN);
        Self { epoch_ms: Cell::new(parsed) }
    }

    /// Component constructor (months are 0-based, as in JS).
    pub fn from_components(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32, ms: u32) -> Self {
        let ts = Utc
            .with_ymd_and_hms(year, month + 1, day.max(1), hour, min, sec)
            .single()
            .map(|dt| dt.timestamp_millis() as f64 + ms as f64)
            .unwrap_or(f64::NAN);
        Self { epoch_ms: Cell::new(ts) }
    }

    pub fn epoch_ms(&self) -> f64 {
        self.epoch_ms.get()
    }

    pub fn set_epoch_ms(&self, ms: f64) {
        self.epoch_ms.set(ms);
    }

    pub fn is_invalid(&self) -> bool {
        self.epoch_ms.get().is_nan()
    }

    fn utc(&self) -> Option<DateTime<Utc>> {
        let ms = self.epoch_ms.get();
        if ms.is_nan() {
            return None;
        }
        Utc.timestamp_millis_opt(ms as i64).single()
    }

    pub fn year(&self) -> f64 {
        self.utc().map(|d| d.year() as f64).unwrap_or(f64::NAN)
    }

    /// 0-based month.
    pub fn month(&self) -> f64 {
        self.utc().map(|d| d.month0() as f64).unwrap_or(f64::NAN)
    }

    pub fn day_of_month(&self) -> f64 {
        self.utc().map(|d| d.day() as f64).unwrap_or(f64::NAN)
    }

    /// 0 = Sunday.
    pub fn day_of_week(&self) -> f64 {
        self.utc().map(|d| d.weekday().num_days_from_sunday() as f64).unwrap_or(f64::NAN)
    }

    pub fn hours(&self) -> f64 {
        self.utc().map(|d| d.hour() as f64).unwrap_or(f64::NAN)
    }

    pub fn minutes(&self) -> f64 {
        self.utc().map(|d| d.minute() as f64).unwrap_or(f64::NAN)
    }

    pub fn seconds(&self) -> f64 {
        self.utc().map(|d| d.second() as f64).unwrap_or(f64::NAN)
    }

    pub fn milliseconds(&self) -> f64 {
        self.utc().map(|d| d.timestamp_subsec_millis() as f64).unwrap_or(f64::NAN)
    }

    pub fn to_iso_string(&self) -> String {
        match self.utc() {
            Some(d) => d.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
            None => "Invalid Date".to_string(),
        }
    }

    pub fn to_string_value(&self) -> String {
        match self.utc() {
            Some(d) => d.format("%a %b %d %Y %H:%M:%S GMT+0000 (Coordinated Universal Time)").to_string(),
            None => "Invalid Date".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_constructor_round_trips() {
        let d = JsDate::from_components(2024, 0, 15, 12, 30, 45, 250);
        assert_eq!(d.year(), 2024.0);
        assert_eq!(d.month(), 0.0);
        assert_eq!(d.day_of_month(), 15.0);
        assert_eq!(d.hours(), 12.0);
        assert_eq!(d.milliseconds(), 250.0);
    }

    #[test]
    fn iso_parse_and_format() {
        let d = JsDate::from_iso_string("2024-06-01T08:00:00.000Z");
        assert_eq!(d.to_iso_string(), "2024-06-01T08:00:00.000Z");
        let bad = JsDate::from_iso_string("not a date");
        assert!(bad.is_invalid());
        assert_eq!(bad.to_iso_string(), "Invalid Date");
    }

    #[test]
    fn date_only_parses_to_midnight_utc() {
        let d = JsDate::from_iso_string("2024-06-01");
        assert_eq!(d.hours(), 0.0);
        assert_eq!(d.day_of_month(), 1.0);
    }
}
