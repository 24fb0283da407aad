use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quiz_core::model::{QuizId, QuizResult, Section};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Storage identifier for a persisted result.
///
/// NOTE: This is `i64` to match `SQLite` row IDs.
pub type ResultId = i64;

/// Persisted quiz header: identity, availability window and timing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizRecord {
    pub id: QuizId,
    pub code: String,
    pub title: String,
    pub instructions: Option<String>,
    pub duration_minutes: u32,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub passing_score: Option<u32>,
}

/// A stored result paired with its row id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRow {
    pub id: ResultId,
    pub result: QuizResult,
}

impl ResultRow {
    #[must_use]
    pub fn new(id: ResultId, result: QuizResult) -> Self {
        Self { id, result }
    }
}

/// Read side of quiz content plus the one-attempt-per-participant ledger.
#[async_trait]
pub trait QuizRepository: Send + Sync {
    /// Persist or replace a quiz together with its sections, questions and options.
    ///
    /// Section, question and option order is taken from the slices.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the code is taken by another quiz, or
    /// other storage errors.
    async fn upsert_quiz(
        &self,
        quiz: &QuizRecord,
        sections: &[Section],
    ) -> Result<(), StorageError>;

    /// Look up a quiz by its human-entered code.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures; a missing code is `Ok(None)`.
    async fn find_quiz_by_code(&self, code: &str) -> Result<Option<QuizRecord>, StorageError>;

    /// Sections in display order, each with ordered questions and options.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures or invalid stored rows.
    async fn list_sections(&self, quiz_id: QuizId) -> Result<Vec<Section>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn has_attempt(&self, quiz_id: QuizId, prn: &str) -> Result<bool, StorageError>;

    /// Record that `prn` started `quiz_id`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if an attempt already exists.
    async fn record_attempt(
        &self,
        quiz_id: QuizId,
        prn: &str,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError>;
}

/// Destination for completed session results.
#[async_trait]
pub trait ResultsSink: Send + Sync {
    /// Append a completed result.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the result cannot be stored.
    async fn append_result(&self, result: &QuizResult) -> Result<ResultId, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_result(&self, id: ResultId) -> Result<QuizResult, StorageError>;

    /// Results for a quiz, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_results(&self, quiz_id: QuizId) -> Result<Vec<ResultRow>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    quizzes: Arc<Mutex<HashMap<QuizId, (QuizRecord, Vec<Section>)>>>,
    attempts: Arc<Mutex<HashSet<(QuizId, String)>>>,
    results: Arc<Mutex<Vec<QuizResult>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: ToString>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl QuizRepository for InMemoryRepository {
    async fn upsert_quiz(
        &self,
        quiz: &QuizRecord,
        sections: &[Section],
    ) -> Result<(), StorageError> {
        let mut guard = self.quizzes.lock().map_err(poisoned)?;
        if guard
            .values()
            .any(|(existing, _)| existing.code == quiz.code && existing.id != quiz.id)
        {
            return Err(StorageError::Conflict);
        }
        guard.insert(quiz.id, (quiz.clone(), sections.to_vec()));
        Ok(())
    }

    async fn find_quiz_by_code(&self, code: &str) -> Result<Option<QuizRecord>, StorageError> {
        let guard = self.quizzes.lock().map_err(poisoned)?;
        Ok(guard
            .values()
            .find(|(quiz, _)| quiz.code == code)
            .map(|(quiz, _)| quiz.clone()))
    }

    async fn list_sections(&self, quiz_id: QuizId) -> Result<Vec<Section>, StorageError> {
        let guard = self.quizzes.lock().map_err(poisoned)?;
        guard
            .get(&quiz_id)
            .map(|(_, sections)| sections.clone())
            .ok_or(StorageError::NotFound)
    }

    async fn has_attempt(&self, quiz_id: QuizId, prn: &str) -> Result<bool, StorageError> {
        let guard = self.attempts.lock().map_err(poisoned)?;
        Ok(guard.contains(&(quiz_id, prn.to_owned())))
    }

    async fn record_attempt(
        &self,
        quiz_id: QuizId,
        prn: &str,
        _at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut guard = self.attempts.lock().map_err(poisoned)?;
        if !guard.insert((quiz_id, prn.to_owned())) {
            return Err(StorageError::Conflict);
        }
        Ok(())
    }
}

#[async_trait]
impl ResultsSink for InMemoryRepository {
    async fn append_result(&self, result: &QuizResult) -> Result<ResultId, StorageError> {
        let mut guard = self.results.lock().map_err(poisoned)?;
        guard.push(result.clone());
        ResultId::try_from(guard.len())
            .map_err(|_| StorageError::Serialization("result id overflow".into()))
    }

    async fn get_result(&self, id: ResultId) -> Result<QuizResult, StorageError> {
        let guard = self.results.lock().map_err(poisoned)?;
        usize::try_from(id)
            .ok()
            .and_then(|id| id.checked_sub(1))
            .and_then(|idx| guard.get(idx))
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn list_results(&self, quiz_id: QuizId) -> Result<Vec<ResultRow>, StorageError> {
        let guard = self.results.lock().map_err(poisoned)?;
        let mut rows = Vec::new();
        for (idx, result) in guard.iter().enumerate().rev() {
            if result.quiz_id() != quiz_id {
                continue;
            }
            let id = ResultId::try_from(idx + 1)
                .map_err(|_| StorageError::Serialization("result id overflow".into()))?;
            rows.push(ResultRow::new(id, result.clone()));
        }
        Ok(rows)
    }
}

/// Aggregates the quiz repository and results sink behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub quizzes: Arc<dyn QuizRepository>,
    pub results: Arc<dyn ResultsSink>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let quizzes: Arc<dyn QuizRepository> = Arc::new(repo.clone());
        let results: Arc<dyn ResultsSink> = Arc::new(repo);
        Self { quizzes, results }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use quiz_core::model::{
        AnswerOption, CompletionReason, OptionId, Participant, Question, QuestionId, SectionId,
    };
    use quiz_core::time::fixed_now;

    fn quiz(id: u64, code: &str) -> QuizRecord {
        QuizRecord {
            id: QuizId::new(id),
            code: code.into(),
            title: "Quiz".into(),
            instructions: None,
            duration_minutes: 10,
            starts_at: fixed_now() - Duration::hours(1),
            ends_at: fixed_now() + Duration::hours(1),
            passing_score: None,
        }
    }

    fn section() -> Section {
        let option = AnswerOption::new(OptionId::new(1), "yes", true).unwrap();
        let question =
            Question::new(QuestionId::new(1), SectionId::new(1), "Q", vec![option], None).unwrap();
        Section::new(SectionId::new(1), "A", None, vec![question]).unwrap()
    }

    #[tokio::test]
    async fn finds_quiz_by_code_and_lists_sections() {
        let repo = InMemoryRepository::new();
        repo.upsert_quiz(&quiz(1, "ABC"), &[section()]).await.unwrap();

        let found = repo.find_quiz_by_code("ABC").await.unwrap().unwrap();
        assert_eq!(found.id, QuizId::new(1));
        assert!(repo.find_quiz_by_code("XYZ").await.unwrap().is_none());
        assert_eq!(repo.list_sections(found.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_code_on_other_quiz_conflicts() {
        let repo = InMemoryRepository::new();
        repo.upsert_quiz(&quiz(1, "ABC"), &[]).await.unwrap();
        let err = repo.upsert_quiz(&quiz(2, "ABC"), &[]).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn second_attempt_conflicts() {
        let repo = InMemoryRepository::new();
        repo.record_attempt(QuizId::new(1), "PRN1", fixed_now())
            .await
            .unwrap();
        assert!(repo.has_attempt(QuizId::new(1), "PRN1").await.unwrap());
        let err = repo
            .record_attempt(QuizId::new(1), "PRN1", fixed_now())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn results_are_listed_newest_first() {
        let repo = InMemoryRepository::new();
        for score in [0, 1] {
            let result = QuizResult::from_answers(
                Participant::new("Ada", "ada@example.com", "PRN1", "ABC"),
                QuizId::new(1),
                score,
                CompletionReason::Submitted,
                vec![quiz_core::model::AnswerRecord {
                    question_id: QuestionId::new(1),
                    selected: Some(OptionId::new(1)),
                }],
                fixed_now(),
                fixed_now(),
            )
            .unwrap();
            repo.append_result(&result).await.unwrap();
        }

        let rows = repo.list_results(QuizId::new(1)).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, 2);
        assert_eq!(rows[0].result.score(), 1);
        assert_eq!(repo.get_result(1).await.unwrap().score(), 0);
        assert!(matches!(
            repo.get_result(9).await.unwrap_err(),
            StorageError::NotFound
        ));
    }
}
