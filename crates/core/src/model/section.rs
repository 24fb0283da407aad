use thiserror::Error;

use crate::model::ids::{QuestionId, SectionId};
use crate::model::question::Question;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SectionError {
    #[error("section title cannot be empty")]
    EmptyTitle,

    #[error("question {question} belongs to section {owner}, not {section}")]
    ForeignQuestion {
        question: QuestionId,
        /// Section the question names.
        owner: SectionId,
        /// Section being built.
        section: SectionId,
    },
}

/// Ordered, titled group of questions within a quiz.
///
/// A section may be built without questions (data can arrive incrementally); a
/// session refuses to start while any section is empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    id: SectionId,
    title: String,
    instructions: Option<String>,
    questions: Vec<Question>,
}

impl Section {
    /// # Errors
    ///
    /// Returns `SectionError::EmptyTitle` for a blank title and
    /// `SectionError::ForeignQuestion` if a question names a different section.
    pub fn new(
        id: SectionId,
        title: impl Into<String>,
        instructions: Option<String>,
        questions: Vec<Question>,
    ) -> Result<Self, SectionError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(SectionError::EmptyTitle);
        }
        if let Some(q) = questions.iter().find(|q| q.section_id() != id) {
            return Err(SectionError::ForeignQuestion {
                question: q.id(),
                owner: q.section_id(),
                section: id,
            });
        }
        let instructions = instructions.filter(|s| !s.trim().is_empty());

        Ok(Self {
            id,
            title,
            instructions,
            questions,
        })
    }

    #[must_use]
    pub fn id(&self) -> SectionId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn instructions(&self) -> Option<&str> {
        self.instructions.as_deref()
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub(crate) fn questions_mut(&mut self) -> &mut [Question] {
        &mut self.questions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnswerOption, OptionId};

    fn question(id: u64, section: u64) -> Question {
        let option = AnswerOption::new(OptionId::new(1), "yes", true).unwrap();
        Question::new(
            QuestionId::new(id),
            SectionId::new(section),
            "Q",
            vec![option],
            None,
        )
        .unwrap()
    }

    #[test]
    fn rejects_question_from_other_section() {
        let err = Section::new(SectionId::new(1), "A", None, vec![question(1, 2)]).unwrap_err();
        assert_eq!(
            err,
            SectionError::ForeignQuestion {
                question: QuestionId::new(1),
                owner: SectionId::new(2),
                section: SectionId::new(1),
            }
        );
        assert_eq!(err.to_string(), "question 1 belongs to section 2, not 1");
    }

    #[test]
    fn blank_instructions_are_dropped() {
        let section = Section::new(SectionId::new(1), "A", Some("  ".into()), Vec::new()).unwrap();
        assert_eq!(section.instructions(), None);
        assert!(section.is_empty());
    }
}
