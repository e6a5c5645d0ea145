//! Quality gate and aggregation of records into the output sets.

use crate::vitals::{
    age_points, parse_age, parse_blood_pressure, parse_temperature, temperature_points,
};
use crate::{
    AssessmentSet, Classification, PatientRecord, QualityIssue, RiskBreakdown, RiskConfig,
    ValidatedVitals,
};

/// Parse every required field, or report each one that is unusable.
pub fn validate(record: &PatientRecord) -> Result<ValidatedVitals, Vec<QualityIssue>> {
    let blood_pressure = parse_blood_pressure(record.blood_pressure.as_ref());
    let temperature_f = parse_temperature(record.temperature.as_ref());
    let age_years = parse_age(record.age.as_ref());

    match (blood_pressure, temperature_f, age_years) {
        (Some(blood_pressure), Some(temperature_f), Some(age_years)) => Ok(ValidatedVitals {
            blood_pressure,
            temperature_f,
            age_years,
        }),
        _ => {
            let mut issues = Vec::new();
            if blood_pressure.is_none() {
                issues.push(QualityIssue::BloodPressure);
            }
            if temperature_f.is_none() {
                issues.push(QualityIssue::Temperature);
            }
            if age_years.is_none() {
                issues.push(QualityIssue::Age);
            }
            Err(issues)
        }
    }
}

/// True when all three required fields parse.
pub fn is_usable(record: &PatientRecord) -> bool {
    validate(record).is_ok()
}

pub fn quality_issues(record: &PatientRecord) -> Vec<QualityIssue> {
    validate(record).err().unwrap_or_default()
}

impl ValidatedVitals {
    pub fn breakdown(&self) -> RiskBreakdown {
        RiskBreakdown {
            blood_pressure: self.blood_pressure.category().points(),
            temperature: temperature_points(self.temperature_f),
            age: age_points(self.age_years),
        }
    }
}

pub fn classify(record: &PatientRecord, config: &RiskConfig) -> Classification {
    match validate(record) {
        Ok(vitals) => {
            let breakdown = vitals.breakdown();
            Classification::Scored {
                high_risk: breakdown.total() >= config.high_risk_threshold,
                febrile: vitals.temperature_f >= config.fever_threshold_f,
                breakdown,
            }
        }
        Err(issues) => Classification::QualityIssue(issues),
    }
}

/// Fold records into the three output sets, preserving input order.
///
/// Duplicate identifiers are kept as they arrive.
pub fn aggregate<'a, I>(records: I, config: &RiskConfig) -> AssessmentSet
where
    I: IntoIterator<Item = &'a PatientRecord>,
{
    records
        .into_iter()
        .fold(AssessmentSet::default(), |mut set, record| {
            set.record(record, classify(record, config));
            set
        })
}

impl AssessmentSet {
    fn record(&mut self, record: &PatientRecord, classification: Classification) {
        match classification {
            Classification::QualityIssue(_) => {
                self.data_quality_issues.push(record.patient_id.clone());
            }
            Classification::Scored {
                high_risk, febrile, ..
            } => {
                if high_risk {
                    self.high_risk_patients.push(record.patient_id.clone());
                }
                if febrile {
                    self.fever_patients.push(record.patient_id.clone());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn record(value: serde_json::Value) -> PatientRecord {
        PatientRecord::from_value(&value)
    }

    #[test]
    fn usable_record_is_scored() {
        let patient = record(json!({
            "patient_id": "DEMO001",
            "blood_pressure": "130/85",
            "temperature": 99.0,
            "age": 70
        }));

        assert!(is_usable(&patient));
        match classify(&patient, &RiskConfig::default()) {
            Classification::Scored {
                breakdown,
                high_risk,
                febrile,
            } => {
                assert_eq!(
                    breakdown,
                    RiskBreakdown {
                        blood_pressure: 3,
                        temperature: 0,
                        age: 2
                    }
                );
                assert_eq!(breakdown.total(), 5);
                assert!(high_risk);
                assert!(!febrile);
            }
            other => panic!("expected a scored record, got {other:?}"),
        }
    }

    #[test]
    fn missing_age_is_a_quality_issue_only() {
        let patient = record(json!({
            "patient_id": "DEMO002",
            "blood_pressure": "160/100",
            "temperature": 102.5
        }));

        assert!(!is_usable(&patient));
        assert_eq!(quality_issues(&patient), vec![QualityIssue::Age]);

        let set = aggregate([&patient], &RiskConfig::default());
        assert_eq!(set.data_quality_issues, vec!["DEMO002".to_string()]);
        assert!(set.high_risk_patients.is_empty());
        assert!(set.fever_patients.is_empty());
    }

    #[test]
    fn every_unusable_field_is_reported() {
        let patient = record(json!({
            "patient_id": "DEMO003",
            "blood_pressure": "150/",
            "temperature": "TEMP_ERROR",
            "age": null
        }));

        assert_eq!(
            quality_issues(&patient),
            vec![
                QualityIssue::BloodPressure,
                QualityIssue::Temperature,
                QualityIssue::Age
            ]
        );
    }

    #[test]
    fn fever_is_independent_of_high_risk() {
        let patient = record(json!({
            "patient_id": "DEMO004",
            "blood_pressure": "110/70",
            "temperature": "99.6",
            "age": 30
        }));

        let set = aggregate([&patient], &RiskConfig::default());
        assert!(set.high_risk_patients.is_empty());
        assert_eq!(set.fever_patients, vec!["DEMO004".to_string()]);
    }

    #[test]
    fn duplicates_are_preserved_in_order() {
        let a = record(json!({
            "patient_id": "A",
            "blood_pressure": "150/95",
            "temperature": 101.2,
            "age": 70
        }));
        let b = record(json!({
            "patient_id": "B",
            "blood_pressure": "150/95",
            "temperature": 98.0,
            "age": 30
        }));

        let set = aggregate([&a, &b, &a], &RiskConfig::default());
        assert_eq!(set.high_risk_patients, vec!["A", "B", "A"]);
        assert_eq!(set.fever_patients, vec!["A", "A"]);
    }

    #[test]
    fn non_object_record_is_flagged() {
        let patient = record(json!("garbage"));
        assert_eq!(patient.patient_id, "");
        let set = aggregate([&patient], &RiskConfig::default());
        assert_eq!(set.data_quality_issues, vec![String::new()]);
    }

    #[test]
    fn empty_input_gives_empty_sets() {
        let set = aggregate(&Vec::<PatientRecord>::new(), &RiskConfig::default());
        assert!(set.is_empty());
        assert_eq!(
            serde_json::to_value(&set).unwrap(),
            json!({
                "high_risk_patients": [],
                "fever_patients": [],
                "data_quality_issues": []
            })
        );
    }
}
