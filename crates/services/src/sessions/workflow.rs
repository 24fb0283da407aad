use std::fmt;
use std::sync::Arc;

use quiz_core::integrity::{ExclusiveDisplay, IntegrityPolicy};
use quiz_core::model::{Participant, QuizId};
use storage::repository::{
    QuizRecord, QuizRepository, ResultId, ResultsSink, Storage, StorageError,
};

use super::queries::QuizQueries;
use super::service::QuizSession;
use super::shuffle::{OptionShuffle, ThreadRngShuffle};
use super::view::ResultListItem;
use crate::Clock;
use crate::error::{LoadError, SessionError};

/// Where the completed result stands with the results sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceStatus {
    Pending,
    Stored(ResultId),
    /// The sink rejected the result; the session stays completed and
    /// `finalize` may be retried.
    Failed(String),
}

impl PersistenceStatus {
    #[must_use]
    pub fn result_id(&self) -> Option<ResultId> {
        match self {
            Self::Stored(id) => Some(*id),
            Self::Pending | Self::Failed(_) => None,
        }
    }
}

/// A participant's session for one quiz, plus its persistence state.
pub struct QuizAttempt {
    participant: Participant,
    quiz: QuizRecord,
    session: QuizSession,
    persistence: PersistenceStatus,
}

impl QuizAttempt {
    #[must_use]
    pub fn participant(&self) -> &Participant {
        &self.participant
    }

    #[must_use]
    pub fn quiz(&self) -> &QuizRecord {
        &self.quiz
    }

    #[must_use]
    pub fn quiz_id(&self) -> QuizId {
        self.quiz.id
    }

    #[must_use]
    pub fn session(&self) -> &QuizSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut QuizSession {
        &mut self.session
    }

    #[must_use]
    pub fn persistence(&self) -> &PersistenceStatus {
        &self.persistence
    }

    #[must_use]
    pub fn result_id(&self) -> Option<ResultId> {
        self.persistence.result_id()
    }
}

impl fmt::Debug for QuizAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizAttempt")
            .field("prn", &self.participant.prn)
            .field("quiz_id", &self.quiz.id)
            .field("session", &self.session)
            .field("persistence", &self.persistence)
            .finish()
    }
}

/// Orchestrates load, start, submit and result persistence.
#[derive(Clone)]
pub struct AttemptService {
    clock: Clock,
    quizzes: Arc<dyn QuizRepository>,
    results: Arc<dyn ResultsSink>,
    display: Arc<dyn ExclusiveDisplay>,
    policy: IntegrityPolicy,
    shuffle: Arc<dyn OptionShuffle>,
}

impl AttemptService {
    #[must_use]
    pub fn new(
        clock: Clock,
        quizzes: Arc<dyn QuizRepository>,
        results: Arc<dyn ResultsSink>,
        display: Arc<dyn ExclusiveDisplay>,
    ) -> Self {
        Self {
            clock,
            quizzes,
            results,
            display,
            policy: IntegrityPolicy::default(),
            shuffle: Arc::new(ThreadRngShuffle),
        }
    }

    #[must_use]
    pub fn from_storage(clock: Clock, storage: &Storage, display: Arc<dyn ExclusiveDisplay>) -> Self {
        Self::new(
            clock,
            Arc::clone(&storage.quizzes),
            Arc::clone(&storage.results),
            display,
        )
    }

    #[must_use]
    pub fn with_policy(mut self, policy: IntegrityPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_shuffle(mut self, shuffle: Arc<dyn OptionShuffle>) -> Self {
        self.shuffle = shuffle;
        self
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// Load the participant's quiz and build a session with shuffled options.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Load` for any terminal load failure.
    pub async fn load(&self, participant: Participant) -> Result<QuizAttempt, SessionError> {
        let now = self.clock.now();
        let loaded = QuizQueries::load(
            &participant.quiz_code,
            &participant.prn,
            self.quizzes.as_ref(),
            now,
        )
        .await
        .inspect_err(|err| {
            tracing::info!(code = %participant.quiz_code, error = %err, "quiz load refused");
        })?;

        let mut session = QuizSession::new(Arc::clone(&self.display), self.policy);
        session.initialize(loaded.instructions, loaded.sections)?;
        session.shuffle_options(self.shuffle.as_ref())?;

        Ok(QuizAttempt {
            participant,
            quiz: loaded.quiz,
            session,
            persistence: PersistenceStatus::Pending,
        })
    }

    /// Record the attempt and start the session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Unstartable` for empty content, a lifecycle error if
    /// already started, or `LoadError::AlreadyAttempted` if another attempt got
    /// recorded since loading.
    pub async fn start(&self, attempt: &mut QuizAttempt) -> Result<(), SessionError> {
        attempt.session.ensure_startable()?;
        let now = self.clock.now();
        match self
            .quizzes
            .record_attempt(attempt.quiz.id, &attempt.participant.prn, now)
            .await
        {
            Ok(()) => {}
            Err(StorageError::Conflict) => return Err(LoadError::AlreadyAttempted.into()),
            Err(err) => return Err(err.into()),
        }
        attempt.session.start(now)?;
        tracing::info!(
            quiz_id = attempt.quiz.id.value(),
            prn = %attempt.participant.prn,
            "attempt started"
        );
        Ok(())
    }

    /// Manual submission followed by persistence.
    ///
    /// # Errors
    ///
    /// Returns a lifecycle error if the session is not in progress. Sink failures
    /// are reported through `PersistenceStatus::Failed`.
    pub async fn submit(&self, attempt: &mut QuizAttempt) -> Result<PersistenceStatus, SessionError> {
        attempt.session.submit(self.clock.now())?;
        self.finalize(attempt).await
    }

    /// Persist a completed session's result once.
    ///
    /// Calling again after success returns the stored id without writing; after
    /// a failure it retries.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotCompleted` if the session is still running.
    pub async fn finalize(&self, attempt: &mut QuizAttempt) -> Result<PersistenceStatus, SessionError> {
        if let PersistenceStatus::Stored(_) = attempt.persistence {
            return Ok(attempt.persistence.clone());
        }

        let result = attempt
            .session
            .build_result(attempt.participant.clone(), attempt.quiz.id)?;
        attempt.persistence = match self.results.append_result(&result).await {
            Ok(id) => {
                tracing::info!(
                    result_id = id,
                    score = result.score(),
                    cheating = result.is_cheating(),
                    "quiz result persisted"
                );
                PersistenceStatus::Stored(id)
            }
            Err(err) => {
                tracing::warn!(error = %err, prn = %attempt.participant.prn, "quiz result not persisted");
                PersistenceStatus::Failed(err.to_string())
            }
        };
        Ok(attempt.persistence.clone())
    }

    /// Stored results for a quiz, newest first.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the sink cannot be read.
    pub async fn list_results(&self, quiz_id: QuizId) -> Result<Vec<ResultListItem>, SessionError> {
        let rows = self.results.list_results(quiz_id).await?;
        Ok(rows.iter().map(ResultListItem::from_row).collect())
    }
}
