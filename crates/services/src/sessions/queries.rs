use chrono::{DateTime, Utc};

use quiz_core::model::{Instructions, Section};
use storage::repository::{QuizRecord, QuizRepository, StorageError};

use crate::error::LoadError;

/// A quiz ready to seed a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedQuiz {
    pub quiz: QuizRecord,
    pub instructions: Instructions,
    pub sections: Vec<Section>,
}

/// Storage-backed quiz lookup.
pub struct QuizQueries;

impl QuizQueries {
    /// Load a quiz by its code for the participant identified by `prn`.
    ///
    /// Checks run in order: code, availability window, sections, questions,
    /// previous attempt. Sections without questions are dropped once at least
    /// one section has some.
    ///
    /// # Errors
    ///
    /// Returns the first failing `LoadError`.
    pub async fn load(
        code: &str,
        prn: &str,
        quizzes: &dyn QuizRepository,
        now: DateTime<Utc>,
    ) -> Result<LoadedQuiz, LoadError> {
        let quiz = quizzes
            .find_quiz_by_code(code.trim())
            .await?
            .ok_or(LoadError::NotFound)?;

        if now < quiz.starts_at {
            return Err(LoadError::NotYetActive(quiz.starts_at));
        }
        if now > quiz.ends_at {
            return Err(LoadError::Expired(quiz.ends_at));
        }

        let sections = match quizzes.list_sections(quiz.id).await {
            Ok(sections) => sections,
            Err(StorageError::NotFound) => Vec::new(),
            Err(err) => return Err(err.into()),
        };
        if sections.is_empty() {
            return Err(LoadError::NoSectionsFound);
        }
        let sections: Vec<Section> = sections.into_iter().filter(|s| !s.is_empty()).collect();
        if sections.is_empty() {
            return Err(LoadError::NoQuestionsFound);
        }

        if quizzes.has_attempt(quiz.id, prn).await? {
            return Err(LoadError::AlreadyAttempted);
        }

        let total = sections.iter().map(Section::len).sum::<usize>();
        let instructions = Instructions::new(
            quiz.title.clone(),
            quiz.instructions.clone().unwrap_or_default(),
            quiz.duration_minutes,
            u32::try_from(total).unwrap_or(u32::MAX),
            quiz.passing_score,
            Vec::new(),
        )?;

        tracing::debug!(
            quiz_id = quiz.id.value(),
            code = %quiz.code,
            sections = sections.len(),
            questions = total,
            "quiz loaded"
        );
        Ok(LoadedQuiz {
            quiz,
            instructions,
            sections,
        })
    }
}
