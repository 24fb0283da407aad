//! Shared error types for the services crate.

use chrono::{DateTime, Utc};
use thiserror::Error;

use quiz_core::model::{AnswerError, AnswerSetError, InstructionsError, QuizResultError};
use storage::repository::StorageError;

/// Terminal failures while loading a quiz for a participant.
///
/// These are shown to the participant as-is and never retried automatically.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoadError {
    #[error("quiz not found")]
    NotFound,
    #[error("quiz is not yet active; it starts at {0}")]
    NotYetActive(DateTime<Utc>),
    #[error("quiz has expired; it ended at {0}")]
    Expired(DateTime<Utc>),
    #[error("no sections found for this quiz")]
    NoSectionsFound,
    #[error("no questions found for this quiz")]
    NoQuestionsFound,
    #[error("you have already attempted this quiz")]
    AlreadyAttempted,
    #[error(transparent)]
    Instructions(#[from] InstructionsError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by session services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("session has not started")]
    NotStarted,
    #[error("session already started")]
    AlreadyStarted,
    #[error("session already completed")]
    Completed,
    #[error("session is not completed yet")]
    NotCompleted,
    #[error("session runner has stopped")]
    RunnerClosed,
    #[error(transparent)]
    Unstartable(#[from] AnswerSetError),
    #[error(transparent)]
    Answer(#[from] AnswerError),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Result(#[from] QuizResultError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
