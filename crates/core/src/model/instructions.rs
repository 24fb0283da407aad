use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum InstructionsError {
    #[error("quiz title cannot be empty")]
    EmptyTitle,

    #[error("quiz duration must be > 0 minutes")]
    InvalidDuration,

    #[error("passing score ({passing}) exceeds total questions ({total})")]
    PassingScoreTooHigh { passing: u32, total: u32 },
}

/// Read-only quiz configuration shown before the session starts.
///
/// The duration seeds the countdown when the session is initialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instructions {
    title: String,
    description: String,
    duration_minutes: u32,
    total_questions: u32,
    passing_score: Option<u32>,
    additional_info: Vec<String>,
}

impl Instructions {
    /// # Errors
    ///
    /// Returns `InstructionsError` if the title is blank, the duration is zero, or the
    /// passing score cannot be reached.
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        duration_minutes: u32,
        total_questions: u32,
        passing_score: Option<u32>,
        additional_info: Vec<String>,
    ) -> Result<Self, InstructionsError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(InstructionsError::EmptyTitle);
        }
        if duration_minutes == 0 {
            return Err(InstructionsError::InvalidDuration);
        }
        if let Some(passing) = passing_score {
            if passing > total_questions {
                return Err(InstructionsError::PassingScoreTooHigh {
                    passing,
                    total: total_questions,
                });
            }
        }

        Ok(Self {
            title,
            description: description.into(),
            duration_minutes,
            total_questions,
            passing_score,
            additional_info,
        })
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn duration_minutes(&self) -> u32 {
        self.duration_minutes
    }

    #[must_use]
    pub fn duration_secs(&self) -> u32 {
        self.duration_minutes.saturating_mul(60)
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    #[must_use]
    pub fn passing_score(&self) -> Option<u32> {
        self.passing_score
    }

    #[must_use]
    pub fn additional_info(&self) -> &[String] {
        &self.additional_info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_duration_is_rejected() {
        let err = Instructions::new("Quiz", "", 0, 10, None, Vec::new()).unwrap_err();
        assert_eq!(err, InstructionsError::InvalidDuration);
    }

    #[test]
    fn duration_converts_to_seconds() {
        let instructions = Instructions::new("Quiz", "", 45, 10, Some(4), Vec::new()).unwrap();
        assert_eq!(instructions.duration_secs(), 2700);
    }

    #[test]
    fn unreachable_passing_score_is_rejected() {
        let err = Instructions::new("Quiz", "", 10, 3, Some(4), Vec::new()).unwrap_err();
        assert_eq!(
            err,
            InstructionsError::PassingScoreTooHigh {
                passing: 4,
                total: 3
            }
        );
    }
}
