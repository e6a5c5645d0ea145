//! Field parsers and per-axis risk evaluators.
//!
//! Parsing never errors: unusable input becomes `None`, which the
//! evaluators turn into [`Assessment::Unassessed`].

use serde_json::Value;

use crate::{Assessment, BloodPressure, BloodPressureCategory};

/// Read a `"SYS/DIA"` string. Both parts must be integers.
pub fn parse_blood_pressure(raw: Option<&Value>) -> Option<BloodPressure> {
    let text = raw?.as_str()?;
    let (systolic, diastolic) = text.split_once('/')?;
    if diastolic.contains('/') {
        return None;
    }
    Some(BloodPressure {
        systolic: systolic.trim().parse().ok()?,
        diastolic: diastolic.trim().parse().ok()?,
    })
}

/// Read a temperature in °F from a number or a numeric string.
pub fn parse_temperature(raw: Option<&Value>) -> Option<f64> {
    let value = match raw? {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) => text.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    value.is_finite().then_some(value)
}

// 2^63 as f64; i64::MAX itself rounds up to this value.
const I64_MAX_F: f64 = 9_223_372_036_854_775_808.0;
const I64_MIN_F: f64 = -9_223_372_036_854_775_808.0;

/// Read an age in whole years from an integer or an integer string.
pub fn parse_age(raw: Option<&Value>) -> Option<i64> {
    match raw? {
        Value::Number(number) => number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|v| v.fract() == 0.0 && (I64_MIN_F..I64_MAX_F).contains(v))
                .map(|v| v as i64)
        }),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

impl BloodPressure {
    /// First matching rule wins; the order encodes precedence.
    ///
    /// A stage 1 diastolic (80..90) only counts once systolic is at least
    /// 120, which leaves systolic < 120 with diastolic in 80..90 unclassified.
    pub fn category(self) -> BloodPressureCategory {
        let Self {
            systolic: s,
            diastolic: d,
        } = self;

        if s >= 140 || d >= 90 {
            BloodPressureCategory::Stage2
        } else if s >= 130 || (d >= 80 && s >= 120) {
            BloodPressureCategory::Stage1
        } else if s >= 120 && d < 80 {
            BloodPressureCategory::Elevated
        } else if s < 120 && d < 80 {
            BloodPressureCategory::Normal
        } else {
            BloodPressureCategory::Unclassified
        }
    }
}

pub fn blood_pressure_risk(raw: Option<&Value>) -> Assessment {
    match parse_blood_pressure(raw) {
        Some(reading) => Assessment::Score(reading.category().points()),
        None => Assessment::Unassessed,
    }
}

pub(crate) fn temperature_points(temperature_f: f64) -> u8 {
    match temperature_f {
        t if t >= 101.0 => 2,
        t if t >= 99.6 => 1,
        _ => 0,
    }
}

pub fn temperature_risk(raw: Option<&Value>) -> Assessment {
    match parse_temperature(raw) {
        Some(temperature) => Assessment::Score(temperature_points(temperature)),
        None => Assessment::Unassessed,
    }
}

/// Every parseable age scores at least 1.
pub(crate) fn age_points(age_years: i64) -> u8 {
    if age_years > 65 {
        2
    } else {
        1
    }
}

pub fn age_risk(raw: Option<&Value>) -> Assessment {
    match parse_age(raw) {
        Some(age) => Assessment::Score(age_points(age)),
        None => Assessment::Unassessed,
    }
}
