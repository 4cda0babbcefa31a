//! Final filter on what may leave the pipeline.
//!
//! Only records whose validation qualified are exported. An empty result is a
//! successful outcome of its own, never a padded or synthesized list.

use serde::Serialize;

use crate::scoring::ScoreResult;
use crate::validator::{ValidatedRecord, ValidationResult};
use crate::BusinessRecord;

/// Coarse quality band derived from the confidence score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum QualityGrade {
    A,
    B,
    C,
    D,
}

impl QualityGrade {
    pub const fn from_confidence(confidence: u8) -> Self {
        match confidence {
            80..=u8::MAX => Self::A,
            70..=79 => Self::B,
            60..=69 => Self::C,
            _ => Self::D,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
        }
    }
}

impl std::fmt::Display for QualityGrade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An exported lead with its full provenance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualifiedLead {
    pub record: BusinessRecord,
    pub score: ScoreResult,
    pub validation: ValidationResult,
    pub grade: QualityGrade,
}

impl QualifiedLead {
    pub fn confidence(&self) -> u8 {
        self.validation.confidence_score
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExportOutcome {
    Qualified(Vec<QualifiedLead>),
    NoQualifiedResults,
}

impl ExportOutcome {
    pub fn leads(&self) -> &[QualifiedLead] {
        match self {
            Self::Qualified(leads) => leads,
            Self::NoQualifiedResults => &[],
        }
    }

    pub fn into_leads(self) -> Vec<QualifiedLead> {
        match self {
            Self::Qualified(leads) => leads,
            Self::NoQualifiedResults => Vec::new(),
        }
    }

    pub const fn status(&self) -> OutcomeStatus {
        match self {
            Self::Qualified(_) => OutcomeStatus::Qualified,
            Self::NoQualifiedResults => OutcomeStatus::NoQualifiedResults,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Qualified,
    NoQualifiedResults,
}

impl OutcomeStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Qualified => "qualified",
            Self::NoQualifiedResults => "no_qualified_results",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportGate {
    target_records: usize,
}

impl ExportGate {
    pub const fn new(target_records: usize) -> Self {
        Self { target_records }
    }

    /// Keeps qualified records in input order, capped at the target.
    pub fn finalize(&self, validated: Vec<ValidatedRecord>) -> ExportOutcome {
        let leads = validated
            .into_iter()
            .filter(|candidate| candidate.validation.qualified)
            .take(self.target_records)
            .map(|candidate| QualifiedLead {
                grade: QualityGrade::from_confidence(candidate.validation.confidence_score),
                record: candidate.record,
                score: candidate.score,
                validation: candidate.validation,
            })
            .collect::<Vec<_>>();

        if leads.is_empty() {
            ExportOutcome::NoQualifiedResults
        } else {
            ExportOutcome::Qualified(leads)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_source::CheckKind;
    use crate::validator::{FieldCheck, ValidationConfig};
    use crate::SourceId;

    fn candidate(name: &str, qualified: bool) -> ValidatedRecord {
        let record = BusinessRecord::new(SourceId::google_places(), name, "1 Elm St")
            .expect("valid record");
        let status = |check| {
            if qualified {
                FieldCheck::passed(check, "ok")
            } else {
                FieldCheck::failed(check, "no")
            }
        };
        let validation = ValidationResult::assemble(
            status(CheckKind::Phone),
            status(CheckKind::Website),
            status(CheckKind::Email),
            status(CheckKind::Address),
            90,
            &ValidationConfig::default(),
        );
        ValidatedRecord {
            record,
            score: ScoreResult {
                name: 100,
                address: 100,
                phone: 100,
                website: 100,
                source: 100,
                score: 90,
                disqualified: false,
                vetoes: Vec::new(),
                penalties: Vec::new(),
            },
            validation,
        }
    }

    #[test]
    fn exports_only_qualified_records_in_order() {
        let gate = ExportGate::new(10);
        let outcome = gate.finalize(vec![
            candidate("First", true),
            candidate("Second", false),
            candidate("Third", true),
        ]);

        let names = outcome
            .leads()
            .iter()
            .map(|lead| lead.record.name())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["First", "Third"]);
        assert!(outcome.leads().iter().all(|lead| lead.grade == QualityGrade::A));
    }

    #[test]
    fn caps_export_at_target_records() {
        let gate = ExportGate::new(1);
        let outcome = gate.finalize(vec![candidate("First", true), candidate("Second", true)]);

        assert_eq!(outcome.leads().len(), 1);
        assert_eq!(outcome.status(), OutcomeStatus::Qualified);
    }

    #[test]
    fn empty_input_is_no_qualified_results() {
        let gate = ExportGate::new(5);

        assert_eq!(gate.finalize(Vec::new()), ExportOutcome::NoQualifiedResults);
        assert_eq!(
            gate.finalize(vec![candidate("Rejected", false)]),
            ExportOutcome::NoQualifiedResults
        );
    }

    #[test]
    fn grade_bands() {
        assert_eq!(QualityGrade::from_confidence(100), QualityGrade::A);
        assert_eq!(QualityGrade::from_confidence(80), QualityGrade::A);
        assert_eq!(QualityGrade::from_confidence(79), QualityGrade::B);
        assert_eq!(QualityGrade::from_confidence(60), QualityGrade::C);
        assert_eq!(QualityGrade::from_confidence(59), QualityGrade::D);
    }
}
