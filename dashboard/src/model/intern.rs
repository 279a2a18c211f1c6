//! Intern records and their embedded performance

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ValidationError;

/// Performance score, always within `0..=100`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Score(u8);

impl Score {
    pub const MAX: u8 = 100;

    /// Validates the user provided score
    pub fn new(value: i64) -> Result<Self, ValidationError> {
        if (0..=Self::MAX as i64).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(ValidationError::ScoreOutOfRange(value))
        }
    }

    /// Builds the score bringing the value into the valid range
    pub fn clamped(value: i64) -> Self {
        Self(value.clamp(0, Self::MAX as i64) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn grade(self) -> Grade {
        Grade::from_score(self)
    }

    pub fn level(self) -> Level {
        Level::from_score(self)
    }
}

impl TryFrom<i64> for Score {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Score> for u8 {
    fn from(score: Score) -> Self {
        score.0
    }
}

impl std::fmt::Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Letter grade bucket of a score
///
/// Variants are ordered from the best to the worst grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    #[serde(rename = "A+")]
    APlus,
    A,
    #[serde(rename = "B+")]
    BPlus,
    B,
    C,
}

impl Grade {
    pub const ALL: [Grade; 5] = [Grade::APlus, Grade::A, Grade::BPlus, Grade::B, Grade::C];

    pub fn from_score(score: Score) -> Self {
        match score.value() {
            90.. => Grade::APlus,
            80..90 => Grade::A,
            70..80 => Grade::BPlus,
            60..70 => Grade::B,
            _ => Grade::C,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::BPlus => "B+",
            Grade::B => "B",
            Grade::C => "C",
        }
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Experience level bucket of a score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Level {
    Beginner,
    Intermediate,
    Advanced,
}

impl Level {
    pub fn from_score(score: Score) -> Self {
        match score.value() {
            85.. => Level::Advanced,
            70..85 => Level::Intermediate,
            _ => Level::Beginner,
        }
    }
}

/// Feedback rating, `1..=5`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub fn new(value: i64) -> Result<Self, ValidationError> {
        if (1..=5).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(ValidationError::RatingOutOfRange(value))
        }
    }

    pub fn clamped(value: i64) -> Self {
        Self(value.clamp(1, 5) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Rating {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

/// Feedback left on an intern by a SPOC or a manager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub id: u32,
    pub author: String,
    pub message: String,
    pub rating: Rating,
    pub timestamp: DateTime<Utc>,
}

/// Feedback as submitted, before validation
#[derive(Debug, Clone, Deserialize)]
pub struct NewFeedback {
    pub author: String,
    pub message: String,
    pub rating: i64,
}

impl NewFeedback {
    /// Validates the submission turning it into feedback with the given id
    pub fn validate(self, id: u32, timestamp: DateTime<Utc>) -> Result<Feedback, ValidationError> {
        let rating = Rating::new(self.rating)?;
        if self.message.trim().is_empty() {
            return Err(ValidationError::EmptyFeedback);
        }

        Ok(Feedback {
            id,
            author: self.author,
            message: self.message,
            rating,
            timestamp,
        })
    }
}

/// Performance embedded into the intern record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Performance {
    pub score: Score,
    pub grade: Grade,
    pub level: Level,
    /// Program progress in percents
    pub progress: u8,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    pub feedback: Vec<Feedback>,
}

impl Performance {
    /// Creates performance with grade and level derived from the score
    pub fn new(score: Score, progress: u8) -> Self {
        Self {
            score,
            grade: score.grade(),
            level: score.level(),
            progress: progress.min(100),
            strengths: vec![],
            improvements: vec![],
            feedback: vec![],
        }
    }

    pub fn with_strengths<S: Into<String>>(mut self, strengths: impl IntoIterator<Item = S>) -> Self {
        self.strengths = strengths.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_improvements<S: Into<String>>(
        mut self,
        improvements: impl IntoIterator<Item = S>,
    ) -> Self {
        self.improvements = improvements.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_feedback(mut self, feedback: Feedback) -> Self {
        self.feedback.push(feedback);
        self
    }
}

/// Partial update of an intern performance
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PerformanceUpdate {
    pub score: Option<i64>,
    pub progress: Option<i64>,
    pub strengths: Option<Vec<String>>,
    pub improvements: Option<Vec<String>>,
}

impl PerformanceUpdate {
    pub fn score(score: i64) -> Self {
        Self {
            score: Some(score),
            ..Default::default()
        }
    }

    /// Applies the update producing the new performance
    ///
    /// Every field is validated first, so on error nothing is applied. Grade and level always
    /// follow the resulting score.
    pub fn apply(self, current: &Performance) -> Result<Performance, ValidationError> {
        let score = self.score.map(Score::new).transpose()?.unwrap_or(current.score);
        let progress = match self.progress {
            Some(progress @ 0..=100) => progress as u8,
            Some(progress) => return Err(ValidationError::ProgressOutOfRange(progress)),
            None => current.progress,
        };

        Ok(Performance {
            score,
            grade: score.grade(),
            level: score.level(),
            progress,
            strengths: self.strengths.unwrap_or_else(|| current.strengths.clone()),
            improvements: self
                .improvements
                .unwrap_or_else(|| current.improvements.clone()),
            feedback: current.feedback.clone(),
        })
    }
}

/// Newtype for intern identifiers like `I346`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InternId(String);

impl InternId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for InternId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Intern record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intern {
    pub id: InternId,
    pub name: String,
    pub location: String,
    /// Main programming language
    pub language: String,
    /// Official company email
    pub email: String,
    pub college: String,
    pub primary_skills: Vec<String>,
    pub secondary_skills: Vec<String>,
    pub area_of_interest: String,
    /// Allocated business unit
    pub business_unit: String,
    pub performance: Option<Performance>,
}
