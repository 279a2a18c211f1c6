//! Performance table records reviewed by SPOCs and approved by managers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::intern::{InternId, Score};
use crate::model::role::Role;

/// Performance level of the review table
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PerformanceLevel {
    /// Excellent, score above 90
    L1,
    /// Good, score between 80 and 90
    L2,
    /// Needs improvement, score below 70
    L3,
    /// Scores between 70 and 79 are not levelled
    #[serde(rename = "N/A")]
    Unrated,
}

impl PerformanceLevel {
    pub fn from_score(score: Score) -> Self {
        match score.value() {
            91.. => PerformanceLevel::L1,
            80..=90 => PerformanceLevel::L2,
            0..70 => PerformanceLevel::L3,
            _ => PerformanceLevel::Unrated,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PerformanceLevel::L1 => "L1",
            PerformanceLevel::L2 => "L2",
            PerformanceLevel::L3 => "L3",
            PerformanceLevel::Unrated => "N/A",
        }
    }
}

/// Review status of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ApprovalStatus {
    Pending,
    Approved,
}

/// Single row of the performance table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceRecord {
    pub id: u32,
    pub intern_id: InternId,
    pub name: String,
    pub location: String,
    pub language: String,
    pub email: String,
    pub college: String,
    pub business_unit: String,
    pub score: Score,
    pub level: PerformanceLevel,
    pub status: ApprovalStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_by: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_at: Option<DateTime<Utc>>,
}

/// Changes a SPOC can make to a record
///
/// The score arrives unvalidated; the level is never taken from the client as it always follows
/// the score.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordEdit {
    pub score: Option<i64>,
    pub location: Option<String>,
    pub language: Option<String>,
    pub business_unit: Option<String>,
}

impl RecordEdit {
    pub fn score(score: i64) -> Self {
        Self {
            score: Some(score),
            ..Default::default()
        }
    }
}

impl From<&PerformanceRecord> for RecordEdit {
    /// Edit setting every editable field to the record values
    fn from(record: &PerformanceRecord) -> Self {
        Self {
            score: Some(record.score.value().into()),
            location: Some(record.location.clone()),
            language: Some(record.language.clone()),
            business_unit: Some(record.business_unit.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(score: i64) -> PerformanceLevel {
        PerformanceLevel::from_score(Score::new(score).unwrap())
    }

    #[test]
    fn level_thresholds() {
        assert_eq!(level(100), PerformanceLevel::L1);
        assert_eq!(level(91), PerformanceLevel::L1);
        assert_eq!(level(90), PerformanceLevel::L2);
        assert_eq!(level(80), PerformanceLevel::L2);
        assert_eq!(level(79), PerformanceLevel::Unrated);
        assert_eq!(level(70), PerformanceLevel::Unrated);
        assert_eq!(level(69), PerformanceLevel::L3);
        assert_eq!(level(0), PerformanceLevel::L3);
    }

    #[test]
    fn unrated_serialized_as_na() {
        assert_eq!(
            serde_json::to_string(&PerformanceLevel::Unrated).unwrap(),
            "\"N/A\""
        );
    }
}
