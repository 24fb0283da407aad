use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::model::ids::{OptionId, QuestionId, SectionId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text cannot be empty")]
    EmptyText,

    #[error("option text cannot be empty")]
    EmptyOptionText,

    #[error("question {0} has no options")]
    NoOptions(QuestionId),

    #[error("question {question} lists option {option} more than once")]
    DuplicateOption {
        question: QuestionId,
        option: OptionId,
    },
}

/// Rejected answer selections. The question is left untouched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AnswerError {
    #[error("unknown question {0}")]
    UnknownQuestion(QuestionId),

    #[error("option {option} does not belong to question {question}")]
    UnknownOption {
        question: QuestionId,
        option: OptionId,
    },
}

//
// ─── OPTION ────────────────────────────────────────────────────────────────────
//

/// One selectable answer. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    id: OptionId,
    text: String,
    is_correct: bool,
}

impl AnswerOption {
    /// # Errors
    ///
    /// Returns `QuestionError::EmptyOptionText` if `text` is blank.
    pub fn new(id: OptionId, text: impl Into<String>, is_correct: bool) -> Result<Self, QuestionError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(QuestionError::EmptyOptionText);
        }
        Ok(Self {
            id,
            text,
            is_correct,
        })
    }

    #[must_use]
    pub fn id(&self) -> OptionId {
        self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Correctness flag. Rendering code should go through [`QuestionView`] instead.
    #[must_use]
    pub fn is_correct(&self) -> bool {
        self.is_correct
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    section_id: SectionId,
    text: String,
    options: Vec<AnswerOption>,
    selected: Option<OptionId>,
    image_url: Option<Url>,
}

impl Question {
    /// Build an unanswered question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the text is blank, there are no options, or two
    /// options share an id.
    pub fn new(
        id: QuestionId,
        section_id: SectionId,
        text: impl Into<String>,
        options: Vec<AnswerOption>,
        image_url: Option<Url>,
    ) -> Result<Self, QuestionError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(QuestionError::EmptyText);
        }
        if options.is_empty() {
            return Err(QuestionError::NoOptions(id));
        }
        let mut seen = HashSet::with_capacity(options.len());
        for option in &options {
            if !seen.insert(option.id()) {
                return Err(QuestionError::DuplicateOption {
                    question: id,
                    option: option.id(),
                });
            }
        }

        Ok(Self {
            id,
            section_id,
            text,
            options,
            selected: None,
            image_url,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn section_id(&self) -> SectionId {
        self.section_id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn options(&self) -> &[AnswerOption] {
        &self.options
    }

    #[must_use]
    pub fn image_url(&self) -> Option<&Url> {
        self.image_url.as_ref()
    }

    #[must_use]
    pub fn selected_option_id(&self) -> Option<OptionId> {
        self.selected
    }

    #[must_use]
    pub fn selected_option(&self) -> Option<&AnswerOption> {
        let selected = self.selected?;
        self.options.iter().find(|o| o.id() == selected)
    }

    #[must_use]
    pub fn correct_option(&self) -> Option<&AnswerOption> {
        self.options.iter().find(|o| o.is_correct())
    }

    #[must_use]
    pub fn is_answered(&self) -> bool {
        self.selected.is_some()
    }

    #[must_use]
    pub fn is_answered_correctly(&self) -> bool {
        self.selected_option().is_some_and(AnswerOption::is_correct)
    }

    /// Select `option_id`, replacing any earlier choice.
    ///
    /// # Errors
    ///
    /// Returns `AnswerError::UnknownOption` if the option is not one of this question's.
    pub fn select(&mut self, option_id: OptionId) -> Result<(), AnswerError> {
        if !self.options.iter().any(|o| o.id() == option_id) {
            return Err(AnswerError::UnknownOption {
                question: self.id,
                option: option_id,
            });
        }
        self.selected = Some(option_id);
        Ok(())
    }

    /// Reorder options in place.
    ///
    /// Options are opaque outside this module, so `reorder` can only permute them;
    /// each option keeps its own correctness flag.
    pub fn reorder_options(&mut self, reorder: impl FnOnce(&mut [AnswerOption])) {
        reorder(&mut self.options);
    }

    /// Render-safe projection without correctness flags.
    #[must_use]
    pub fn view(&self) -> QuestionView {
        QuestionView {
            id: self.id,
            section_id: self.section_id,
            text: self.text.clone(),
            image_url: self.image_url.clone(),
            options: self
                .options
                .iter()
                .map(|o| OptionView {
                    id: o.id(),
                    text: o.text().to_owned(),
                })
                .collect(),
            selected: self.selected,
        }
    }
}

//
// ─── VIEWS ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionView {
    pub id: OptionId,
    pub text: String,
}

/// What the test-taker may see while a session is running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionView {
    pub id: QuestionId,
    pub section_id: SectionId,
    pub text: String,
    pub image_url: Option<Url>,
    pub options: Vec<OptionView>,
    pub selected: Option<OptionId>,
}
