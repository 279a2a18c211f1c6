//! Aggregates over scored records
//!
//! Everything is recomputed from the records on each call.

use serde::Serialize;

use crate::model::intern::{Grade, Intern, Score};
use crate::model::performance::{PerformanceLevel, PerformanceRecord};

/// Anything carrying a performance score
pub trait Scored {
    /// `None` when the record was not scored yet
    fn score(&self) -> Option<Score>;
}

impl Scored for PerformanceRecord {
    fn score(&self) -> Option<Score> {
        Some(self.score)
    }
}

impl Scored for Intern {
    fn score(&self) -> Option<Score> {
        self.performance.as_ref().map(|performance| performance.score)
    }
}

impl Scored for Score {
    fn score(&self) -> Option<Score> {
        Some(*self)
    }
}

impl<T: Scored + ?Sized> Scored for &T {
    fn score(&self) -> Option<Score> {
        (**self).score()
    }
}

fn scores<T: Scored>(records: &[T]) -> impl Iterator<Item = u8> + '_ {
    records
        .iter()
        .filter_map(|record| record.score())
        .map(Score::value)
}

/// Average score rounded half away from zero, `None` if nothing is scored
pub fn average_score<T: Scored>(records: &[T]) -> Option<u8> {
    let (sum, count) = scores(records).fold((0u64, 0u64), |(sum, count), score| {
        (sum + score as u64, count + 1)
    });

    // Scores are non-negative, so half away from zero is half up
    (count > 0).then(|| ((2 * sum + count) / (2 * count)) as u8)
}

/// Number of records per grade, best grade first
pub fn grade_distribution<T: Scored>(records: &[T]) -> Vec<(Grade, usize)> {
    Grade::ALL
        .into_iter()
        .map(|grade| {
            let count = records
                .iter()
                .filter_map(|record| record.score())
                .filter(|score| score.grade() == grade)
                .count();
            (grade, count)
        })
        .collect()
}

/// Number of records per table performance level
pub fn level_distribution<T: Scored>(records: &[T]) -> Vec<(PerformanceLevel, usize)> {
    [
        PerformanceLevel::L1,
        PerformanceLevel::L2,
        PerformanceLevel::L3,
        PerformanceLevel::Unrated,
    ]
    .into_iter()
    .map(|level| {
        let count = records
            .iter()
            .filter_map(|record| record.score())
            .filter(|score| PerformanceLevel::from_score(*score) == level)
            .count();
        (level, count)
    })
    .collect()
}

fn ranked<T: Scored>(records: &[T]) -> Vec<(&T, Score)> {
    let mut ranked: Vec<_> = records
        .iter()
        .filter_map(|record| record.score().map(|score| (record, score)))
        .collect();
    ranked.sort_by(|(_, a), (_, b)| b.cmp(a));
    ranked
}

/// `n` best scored records, ties keep the input order
pub fn top_performers<T: Scored>(records: &[T], n: usize) -> Vec<&T> {
    ranked(records)
        .into_iter()
        .take(n)
        .map(|(record, _)| record)
        .collect()
}

/// `n` worst scored records, worst first
pub fn bottom_performers<T: Scored>(records: &[T], n: usize) -> Vec<&T> {
    let mut ranked = ranked(records);
    ranked.sort_by(|(_, a), (_, b)| a.cmp(b));
    ranked
        .into_iter()
        .take(n)
        .map(|(record, _)| record)
        .collect()
}

/// Summary shown on the dashboards
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub total: usize,
    pub scored: usize,
    pub average_score: Option<u8>,
    pub highest_score: Option<u8>,
    pub lowest_score: Option<u8>,
    pub grades: Vec<(Grade, usize)>,
    pub levels: Vec<(PerformanceLevel, usize)>,
}

impl Metrics {
    pub fn of<T: Scored>(records: &[T]) -> Self {
        Self {
            total: records.len(),
            scored: scores(records).count(),
            average_score: average_score(records),
            highest_score: scores(records).max(),
            lowest_score: scores(records).min(),
            grades: grade_distribution(records),
            levels: level_distribution(records),
        }
    }
}
