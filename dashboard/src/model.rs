//! Dashboard domain model

use thiserror::Error;

pub mod intern;
pub mod performance;
pub mod report;
pub mod role;
pub mod system;
pub mod users;

/// Rejections of user provided values, raised before any state is touched
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Score must be between 0 and 100")]
    ScoreOutOfRange(i64),
    #[error("Progress must be between 0 and 100")]
    ProgressOutOfRange(i64),
    #[error("Rating must be between 1 and 5")]
    RatingOutOfRange(i64),
    #[error("Feedback message cannot be empty")]
    EmptyFeedback,
}
