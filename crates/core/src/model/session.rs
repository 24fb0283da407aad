use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::integrity::TerminationReason;
use crate::model::answer_set::AnswerRecord;
use crate::model::ids::QuizId;
use crate::model::participant::Participant;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizResultError {
    #[error("completed_at is before started_at")]
    InvalidTimeRange,

    #[error("score ({score}) exceeds total questions ({total})")]
    ScoreOutOfRange { score: u32, total: u32 },

    #[error("too many questions for a single result: {len}")]
    TooManyQuestions { len: usize },

    #[error("cheating flag does not match completion reason")]
    CheatingMismatch,
}

/// Session lifecycle. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Lifecycle {
    NotStarted,
    InProgress,
    Completed,
}

/// Why a session reached `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompletionReason {
    /// The participant confirmed submission.
    Submitted,
    /// The countdown reached zero.
    TimeExpired,
    /// The integrity monitor confirmed cheating.
    Terminated(TerminationReason),
}

impl CompletionReason {
    #[must_use]
    pub fn is_cheating(self) -> bool {
        matches!(self, Self::Terminated(_))
    }

    /// Stable storage key.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::TimeExpired => "time_expired",
            Self::Terminated(TerminationReason::RepeatedExit) => "terminated_repeated_exit",
            Self::Terminated(TerminationReason::GraceExpired) => "terminated_grace_expired",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "submitted" => Some(Self::Submitted),
            "time_expired" => Some(Self::TimeExpired),
            "terminated_repeated_exit" => Some(Self::Terminated(TerminationReason::RepeatedExit)),
            "terminated_grace_expired" => Some(Self::Terminated(TerminationReason::GraceExpired)),
            _ => None,
        }
    }
}

/// Outcome of one completed session, as handed to the results sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizResult {
    participant: Participant,
    quiz_id: QuizId,
    score: u32,
    total_questions: u32,
    completion: CompletionReason,
    answers: Vec<AnswerRecord>,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
}

impl QuizResult {
    /// Build a result from a finished session's answers.
    ///
    /// # Errors
    ///
    /// Returns `QuizResultError` if timestamps are inverted, the answer count does
    /// not fit in `u32`, or the score exceeds the question count.
    pub fn from_answers(
        participant: Participant,
        quiz_id: QuizId,
        score: u32,
        completion: CompletionReason,
        answers: Vec<AnswerRecord>,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    ) -> Result<Self, QuizResultError> {
        let total_questions = u32::try_from(answers.len())
            .map_err(|_| QuizResultError::TooManyQuestions { len: answers.len() })?;
        Self::from_persisted(
            participant,
            quiz_id,
            score,
            total_questions,
            completion.is_cheating(),
            completion,
            answers,
            started_at,
            completed_at,
        )
    }

    /// Rehydrate a result from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `QuizResultError` if the stored values are inconsistent.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        participant: Participant,
        quiz_id: QuizId,
        score: u32,
        total_questions: u32,
        cheating: bool,
        completion: CompletionReason,
        answers: Vec<AnswerRecord>,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    ) -> Result<Self, QuizResultError> {
        if completed_at < started_at {
            return Err(QuizResultError::InvalidTimeRange);
        }
        if score > total_questions {
            return Err(QuizResultError::ScoreOutOfRange {
                score,
                total: total_questions,
            });
        }
        if cheating != completion.is_cheating() {
            return Err(QuizResultError::CheatingMismatch);
        }

        Ok(Self {
            participant,
            quiz_id,
            score,
            total_questions,
            completion,
            answers,
            started_at,
            completed_at,
        })
    }

    #[must_use]
    pub fn participant(&self) -> &Participant {
        &self.participant
    }

    #[must_use]
    pub fn quiz_id(&self) -> QuizId {
        self.quiz_id
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    #[must_use]
    pub fn is_cheating(&self) -> bool {
        self.completion.is_cheating()
    }

    #[must_use]
    pub fn completion(&self) -> CompletionReason {
        self.completion
    }

    #[must_use]
    pub fn answers(&self) -> &[AnswerRecord] {
        &self.answers
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }
}
