//! Core risk classification for patient vital records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

mod assess;
mod vitals;

pub use assess::{aggregate, classify, is_usable, quality_issues, validate};
pub use vitals::{
    age_risk, blood_pressure_risk, parse_age, parse_blood_pressure, parse_temperature,
    temperature_risk,
};

/// Thresholds applied when folding scored records into the output sets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskConfig {
    /// Minimum total score that places a patient in the high-risk set.
    pub high_risk_threshold: u8,
    /// Temperature (°F) at or above which a patient is febrile.
    pub fever_threshold_f: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            high_risk_threshold: 4,
            fever_threshold_f: 99.6,
        }
    }
}

/// One patient's raw data as received from upstream.
///
/// Fields keep their raw JSON form; `None` means missing or `null`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatientRecord {
    pub patient_id: String,
    pub blood_pressure: Option<Value>,
    pub temperature: Option<Value>,
    pub age: Option<Value>,
}

impl PatientRecord {
    /// Build a record from one element of a page's `data` array.
    ///
    /// Never fails: anything unreadable degrades to a missing field.
    pub fn from_value(value: &Value) -> Self {
        let patient_id = match value.get("patient_id") {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => String::new(),
        };

        Self {
            patient_id,
            blood_pressure: present_field(value, "blood_pressure"),
            temperature: present_field(value, "temperature"),
            age: present_field(value, "age"),
        }
    }
}

fn present_field(value: &Value, key: &str) -> Option<Value> {
    value.get(key).filter(|field| !field.is_null()).cloned()
}

/// Parse a JSON array of raw records.
pub fn records_from_str(json: &str) -> Result<Vec<PatientRecord>, TriageError> {
    let value: Value =
        serde_json::from_str(json).map_err(|err| TriageError::Parse(err.to_string()))?;
    let items = value.as_array().ok_or_else(|| {
        TriageError::Parse("expected a JSON array of patient records".to_string())
    })?;
    Ok(items.iter().map(PatientRecord::from_value).collect())
}

/// Systolic/diastolic pair read from a `"SYS/DIA"` string.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BloodPressure {
    pub systolic: i32,
    pub diastolic: i32,
}

/// Blood pressure stage. `Unclassified` covers pairs no rule matches,
/// e.g. diastolic in [80, 90) with systolic below 120.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum BloodPressureCategory {
    Unclassified,
    Normal,
    Elevated,
    Stage1,
    Stage2,
}

impl BloodPressureCategory {
    pub fn points(self) -> u8 {
        match self {
            Self::Unclassified => 0,
            Self::Normal => 1,
            Self::Elevated => 2,
            Self::Stage1 => 3,
            Self::Stage2 => 4,
        }
    }
}

/// Outcome of scoring one axis.
///
/// `Unassessed` and `Score(0)` both collapse to 0 points, but stay
/// distinguishable until aggregation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Assessment {
    Unassessed,
    Score(u8),
}

impl Assessment {
    pub fn points(self) -> u8 {
        match self {
            Self::Unassessed => 0,
            Self::Score(points) => points,
        }
    }

    pub fn is_assessed(self) -> bool {
        matches!(self, Self::Score(_))
    }
}

/// A required field that could not be used for scoring.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum QualityIssue {
    BloodPressure,
    Temperature,
    Age,
}

/// Parsed vitals of a record that passed the quality gate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ValidatedVitals {
    pub blood_pressure: BloodPressure,
    pub temperature_f: f64,
    pub age_years: i64,
}

/// Per-axis contributions of a scored record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RiskBreakdown {
    pub blood_pressure: u8,
    pub temperature: u8,
    pub age: u8,
}

impl RiskBreakdown {
    pub fn total(&self) -> u8 {
        self.blood_pressure + self.temperature + self.age
    }
}

/// Per-record verdict.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    QualityIssue(Vec<QualityIssue>),
    Scored {
        breakdown: RiskBreakdown,
        high_risk: bool,
        febrile: bool,
    },
}

/// The three output sets, in the exact shape the submission endpoint expects.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssessmentSet {
    pub high_risk_patients: Vec<String>,
    pub fever_patients: Vec<String>,
    pub data_quality_issues: Vec<String>,
}

impl AssessmentSet {
    pub fn is_empty(&self) -> bool {
        self.high_risk_patients.is_empty()
            && self.fever_patients.is_empty()
            && self.data_quality_issues.is_empty()
    }
}

/// Summary of one assessment pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssessmentReport {
    pub generated_at: DateTime<Utc>,
    pub records_total: usize,
    pub records_scored: usize,
    pub assessment: AssessmentSet,
}

impl AssessmentReport {
    pub fn new(records_total: usize, assessment: AssessmentSet) -> Self {
        Self {
            generated_at: Utc::now(),
            records_total,
            records_scored: records_total.saturating_sub(assessment.data_quality_issues.len()),
            assessment,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TriageError {
    #[error("Could not read patient records: {0}")]
    Parse(String),
}
