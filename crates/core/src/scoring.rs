//! Scoring: one mark per correct answer, nothing for blanks, no negative marking.

use serde::Serialize;

use crate::model::AnswerSet;

/// Number of questions whose selected option is marked correct.
///
/// Pure and idempotent; unanswered questions count as zero.
#[must_use]
pub fn score(answers: &AnswerSet) -> u32 {
    let correct = answers
        .questions()
        .filter(|q| q.is_answered_correctly())
        .count();
    u32::try_from(correct).unwrap_or(u32::MAX)
}

/// Coarse feedback band for a percentage score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PerformanceBand {
    Excellent,
    Good,
    Fair,
    NeedsImprovement,
}

impl PerformanceBand {
    #[must_use]
    pub fn from_percentage(percentage: u32) -> Self {
        match percentage {
            80.. => Self::Excellent,
            60..=79 => Self::Good,
            40..=59 => Self::Fair,
            _ => Self::NeedsImprovement,
        }
    }

    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::Excellent => "Excellent Performance!",
            Self::Good => "Good Job!",
            Self::Fair => "Fair Attempt",
            Self::NeedsImprovement => "Needs Improvement",
        }
    }
}

/// Score with derived percentage and pass/fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScoreReport {
    pub score: u32,
    pub total: u32,
    pub percentage: u32,
    pub band: PerformanceBand,
    /// `None` when the quiz defines no passing score.
    pub passed: Option<bool>,
}

impl ScoreReport {
    #[must_use]
    pub fn new(score: u32, total: u32, passing_score: Option<u32>) -> Self {
        let percentage = percentage(score, total);
        Self {
            score,
            total,
            percentage,
            band: PerformanceBand::from_percentage(percentage),
            passed: passing_score.map(|passing| score >= passing),
        }
    }
}

/// Rounded percentage (half up); zero when there are no questions.
#[must_use]
pub fn percentage(score: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let scaled = u64::from(score) * 200 + u64::from(total);
    let rounded = scaled / (2 * u64::from(total));
    u32::try_from(rounded).unwrap_or(u32::MAX)
}
