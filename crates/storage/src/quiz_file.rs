//! Quiz definition files.
//!
//! A quiz is authored as TOML and imported into a repository:
//!
//! ```toml
//! [quiz]
//! code = "DS-101"
//! title = "Data Structures"
//! duration_minutes = 30
//! starts_at = "2026-01-10T09:00:00Z"
//! ends_at = "2026-01-10T18:00:00Z"
//!
//! [[sections]]
//! title = "Arrays"
//!
//! [[sections.questions]]
//! text = "Index of the first element?"
//!
//! [[sections.questions.options]]
//! text = "0"
//! correct = true
//! ```
//!
//! Section, question and option ids are assigned sequentially in file order.

use std::path::Path;

use chrono::{DateTime, Utc};
use quiz_core::model::{
    AnswerOption, OptionId, Question, QuestionError, QuestionId, QuizId, Section, SectionError,
    SectionId,
};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::repository::QuizRecord;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizFileError {
    #[error("failed to read quiz file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse quiz file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("quiz code cannot be empty")]
    EmptyCode,

    #[error("quiz duration must be greater than zero")]
    InvalidDuration,

    #[error("quiz must end after it starts")]
    InvalidWindow,

    #[error("invalid image url: {0}")]
    ImageUrl(#[from] url::ParseError),

    #[error(transparent)]
    Question(#[from] QuestionError),

    #[error(transparent)]
    Section(#[from] SectionError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuizFile {
    pub quiz: QuizHeader,
    #[serde(default)]
    pub sections: Vec<SectionEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuizHeader {
    #[serde(default = "default_quiz_id")]
    pub id: u64,
    pub code: String,
    pub title: String,
    #[serde(default)]
    pub instructions: Option<String>,
    pub duration_minutes: u32,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    #[serde(default)]
    pub passing_score: Option<u32>,
}

fn default_quiz_id() -> u64 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct SectionEntry {
    pub title: String,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub questions: Vec<QuestionEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuestionEntry {
    pub text: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub options: Vec<OptionEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OptionEntry {
    pub text: String,
    #[serde(default)]
    pub correct: bool,
}

/// A validated quiz ready to hand to `QuizRepository::upsert_quiz`.
#[derive(Debug, Clone)]
pub struct ImportedQuiz {
    pub record: QuizRecord,
    pub sections: Vec<Section>,
}

impl ImportedQuiz {
    #[must_use]
    pub fn question_count(&self) -> usize {
        self.sections.iter().map(Section::len).sum()
    }
}

impl QuizFile {
    /// Parse TOML text.
    ///
    /// # Errors
    ///
    /// Returns `QuizFileError::Parse` if the text is not a valid quiz file.
    pub fn parse(raw: &str) -> Result<Self, QuizFileError> {
        Ok(toml::from_str(raw)?)
    }

    /// Validate and assign ids.
    ///
    /// # Errors
    ///
    /// Returns `QuizFileError` for an empty code, non-positive duration, an
    /// inverted window, or any invalid section, question or option.
    pub fn into_quiz(self) -> Result<ImportedQuiz, QuizFileError> {
        let header = self.quiz;
        if header.code.trim().is_empty() {
            return Err(QuizFileError::EmptyCode);
        }
        if header.duration_minutes == 0 {
            return Err(QuizFileError::InvalidDuration);
        }
        if header.ends_at <= header.starts_at {
            return Err(QuizFileError::InvalidWindow);
        }

        let mut next_question = 1_u64;
        let mut next_option = 1_u64;
        let mut sections = Vec::with_capacity(self.sections.len());
        for (section_idx, entry) in (1_u64..).zip(self.sections) {
            let section_id = SectionId::new(section_idx);
            let mut questions = Vec::with_capacity(entry.questions.len());
            for question in entry.questions {
                let mut options = Vec::with_capacity(question.options.len());
                for option in question.options {
                    options.push(AnswerOption::new(
                        OptionId::new(next_option),
                        option.text,
                        option.correct,
                    )?);
                    next_option += 1;
                }
                let image_url = question
                    .image_url
                    .filter(|raw| !raw.trim().is_empty())
                    .map(|raw| Url::parse(&raw))
                    .transpose()?;
                questions.push(Question::new(
                    QuestionId::new(next_question),
                    section_id,
                    question.text,
                    options,
                    image_url,
                )?);
                next_question += 1;
            }
            sections.push(Section::new(
                section_id,
                entry.title,
                entry.instructions,
                questions,
            )?);
        }

        Ok(ImportedQuiz {
            record: QuizRecord {
                id: QuizId::new(header.id),
                code: header.code.trim().to_owned(),
                title: header.title,
                instructions: header.instructions,
                duration_minutes: header.duration_minutes,
                starts_at: header.starts_at,
                ends_at: header.ends_at,
                passing_score: header.passing_score,
            },
            sections,
        })
    }
}

/// Read, parse and validate a quiz file.
///
/// # Errors
///
/// Returns `QuizFileError` if the file cannot be read, parsed or validated.
pub async fn load_quiz_file(path: &Path) -> Result<ImportedQuiz, QuizFileError> {
    let raw = tokio::fs::read_to_string(path).await?;
    let quiz = QuizFile::parse(&raw)?.into_quiz()?;
    tracing::info!(
        path = %path.display(),
        code = %quiz.record.code,
        sections = quiz.sections.len(),
        questions = quiz.question_count(),
        "quiz file loaded"
    );
    Ok(quiz)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [quiz]
        id = 7
        code = " DS-101 "
        title = "Data Structures"
        duration_minutes = 30
        starts_at = "2026-01-10T09:00:00Z"
        ends_at = "2026-01-10T18:00:00Z"
        passing_score = 1

        [[sections]]
        title = "Arrays"
        instructions = "Pick one"

        [[sections.questions]]
        text = "Index of the first element?"

        [[sections.questions.options]]
        text = "0"
        correct = true

        [[sections.questions.options]]
        text = "1"

        [[sections]]
        title = "Lists"

        [[sections.questions]]
        text = "Linked list access is"
        image_url = "https://example.com/list.png"

        [[sections.questions.options]]
        text = "O(n)"
        correct = true
    "#;

    #[test]
    fn assigns_sequential_ids_in_file_order() {
        let quiz = QuizFile::parse(SAMPLE).unwrap().into_quiz().unwrap();
        assert_eq!(quiz.record.id, QuizId::new(7));
        assert_eq!(quiz.record.code, "DS-101");
        assert_eq!(quiz.record.passing_score, Some(1));
        assert_eq!(quiz.sections.len(), 2);
        assert_eq!(quiz.question_count(), 2);

        let second = &quiz.sections[1];
        assert_eq!(second.id(), SectionId::new(2));
        let question = &second.questions()[0];
        assert_eq!(question.id(), QuestionId::new(2));
        assert_eq!(question.options()[0].id(), OptionId::new(3));
        assert!(question.image_url().is_some());
        assert_eq!(quiz.sections[0].instructions(), Some("Pick one"));
    }

    #[test]
    fn rejects_inverted_window() {
        let raw = SAMPLE.replace("2026-01-10T18:00:00Z", "2026-01-10T08:00:00Z");
        let err = QuizFile::parse(&raw).unwrap().into_quiz().unwrap_err();
        assert!(matches!(err, QuizFileError::InvalidWindow));
    }

    #[test]
    fn rejects_question_without_options() {
        let raw = r#"
            [quiz]
            code = "X"
            title = "T"
            duration_minutes = 5
            starts_at = "2026-01-10T09:00:00Z"
            ends_at = "2026-01-10T18:00:00Z"

            [[sections]]
            title = "S"

            [[sections.questions]]
            text = "Q"
        "#;
        let err = QuizFile::parse(raw).unwrap().into_quiz().unwrap_err();
        assert!(matches!(
            err,
            QuizFileError::Question(QuestionError::NoOptions(_))
        ));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(
            QuizFile::parse("[quiz"),
            Err(QuizFileError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let err = load_quiz_file(Path::new("/nonexistent/quiz.toml"))
            .await
            .unwrap_err();
        assert!(matches!(err, QuizFileError::Io(_)));
    }
}
