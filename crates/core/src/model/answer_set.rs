use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{OptionId, QuestionId, SectionId};
use crate::model::question::{AnswerError, Question};
use crate::model::section::Section;
use crate::scoring;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AnswerSetError {
    #[error("quiz has no sections")]
    NoSections,

    #[error("section {0} has no questions")]
    EmptySection(SectionId),

    #[error("question {0} appears more than once")]
    DuplicateQuestion(QuestionId),
}

/// The answer a participant gave (or did not give) to one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question_id: QuestionId,
    pub selected: Option<OptionId>,
}

/// Sectioned questions plus the participant's selections.
///
/// Sections own their questions; every flat view is derived on demand, so a
/// question answered once reads as answered everywhere.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerSet {
    sections: Vec<Section>,
}

impl AnswerSet {
    #[must_use]
    pub fn new(sections: Vec<Section>) -> Self {
        Self { sections }
    }

    #[must_use]
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    #[must_use]
    pub fn section(&self, index: usize) -> Option<&Section> {
        self.sections.get(index)
    }

    #[must_use]
    pub fn question_at(&self, section: usize, question: usize) -> Option<&Question> {
        self.sections.get(section)?.questions().get(question)
    }

    /// Flat, read-only projection in section order.
    pub fn questions(&self) -> impl Iterator<Item = &Question> + '_ {
        self.sections.iter().flat_map(Section::questions)
    }

    #[must_use]
    pub fn question(&self, id: QuestionId) -> Option<&Question> {
        self.questions().find(|q| q.id() == id)
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.sections.iter().map(Section::len).sum()
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.questions().filter(|q| q.is_answered()).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_questions() == 0
    }

    /// Checks the shape a session needs before it can start.
    ///
    /// # Errors
    ///
    /// Returns `AnswerSetError::NoSections`, `AnswerSetError::EmptySection` or
    /// `AnswerSetError::DuplicateQuestion`.
    pub fn ensure_startable(&self) -> Result<(), AnswerSetError> {
        if self.sections.is_empty() {
            return Err(AnswerSetError::NoSections);
        }
        if let Some(section) = self.sections.iter().find(|s| s.is_empty()) {
            return Err(AnswerSetError::EmptySection(section.id()));
        }
        Self::ensure_unique(&self.sections)
    }

    /// Question ids must be unique across all sections; selection is by id.
    ///
    /// # Errors
    ///
    /// Returns `AnswerSetError::DuplicateQuestion` naming the first repeat.
    pub fn ensure_unique(sections: &[Section]) -> Result<(), AnswerSetError> {
        let mut seen = HashSet::new();
        match sections
            .iter()
            .flat_map(Section::questions)
            .find(|q| !seen.insert(q.id()))
        {
            Some(q) => Err(AnswerSetError::DuplicateQuestion(q.id())),
            None => Ok(()),
        }
    }

    /// Record `option_id` as the answer to `question_id`.
    ///
    /// # Errors
    ///
    /// Returns `AnswerError` for an unknown question or an option outside the
    /// question's list; nothing is changed in either case.
    pub fn select_option(
        &mut self,
        question_id: QuestionId,
        option_id: OptionId,
    ) -> Result<(), AnswerError> {
        let question = self
            .sections
            .iter_mut()
            .flat_map(Section::questions_mut)
            .find(|q| q.id() == question_id)
            .ok_or(AnswerError::UnknownQuestion(question_id))?;
        question.select(option_id)
    }

    /// Visit every question mutably, e.g. to shuffle options once after loading.
    pub fn for_each_question_mut(&mut self, mut f: impl FnMut(&mut Question)) {
        for section in &mut self.sections {
            for question in section.questions_mut() {
                f(question);
            }
        }
    }

    /// One mark per correct answer.
    #[must_use]
    pub fn score(&self) -> u32 {
        scoring::score(self)
    }

    #[must_use]
    pub fn answers(&self) -> Vec<AnswerRecord> {
        self.questions()
            .map(|q| AnswerRecord {
                question_id: q.id(),
                selected: q.selected_option_id(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AnswerOption;

    fn question(id: u64, section: u64) -> Question {
        let options = vec![
            AnswerOption::new(OptionId::new(id * 10 + 1), "right", true).unwrap(),
            AnswerOption::new(OptionId::new(id * 10 + 2), "wrong", false).unwrap(),
        ];
        Question::new(QuestionId::new(id), SectionId::new(section), "Q", options, None).unwrap()
    }

    fn answer_set() -> AnswerSet {
        AnswerSet::new(vec![
            Section::new(SectionId::new(1), "A", None, vec![question(1, 1), question(2, 1)])
                .unwrap(),
            Section::new(SectionId::new(2), "B", None, vec![question(3, 2)]).unwrap(),
        ])
    }

    #[test]
    fn selection_shows_in_flat_and_sectioned_views() {
        let mut set = answer_set();
        set.select_option(QuestionId::new(3), OptionId::new(31)).unwrap();

        assert_eq!(
            set.question(QuestionId::new(3)).unwrap().selected_option_id(),
            Some(OptionId::new(31))
        );
        assert_eq!(
            set.question_at(1, 0).unwrap().selected_option_id(),
            Some(OptionId::new(31))
        );
        assert_eq!(set.answered_count(), 1);
    }

    #[test]
    fn unknown_question_is_rejected() {
        let mut set = answer_set();
        let err = set
            .select_option(QuestionId::new(99), OptionId::new(1))
            .unwrap_err();
        assert_eq!(err, AnswerError::UnknownQuestion(QuestionId::new(99)));
        assert_eq!(set.answered_count(), 0);
    }

    #[test]
    fn empty_section_blocks_start() {
        let set = AnswerSet::new(vec![
            Section::new(SectionId::new(1), "A", None, vec![question(1, 1)]).unwrap(),
            Section::new(SectionId::new(2), "B", None, Vec::new()).unwrap(),
        ]);
        assert_eq!(
            set.ensure_startable(),
            Err(AnswerSetError::EmptySection(SectionId::new(2)))
        );
        assert_eq!(
            AnswerSet::default().ensure_startable(),
            Err(AnswerSetError::NoSections)
        );
    }

    #[test]
    fn repeated_question_id_blocks_start() {
        let sections = vec![
            Section::new(SectionId::new(1), "A", None, vec![question(1, 1)]).unwrap(),
            Section::new(SectionId::new(2), "B", None, vec![question(1, 2)]).unwrap(),
        ];
        assert_eq!(
            AnswerSet::ensure_unique(&sections),
            Err(AnswerSetError::DuplicateQuestion(QuestionId::new(1)))
        );
        assert_eq!(
            AnswerSet::new(sections).ensure_startable(),
            Err(AnswerSetError::DuplicateQuestion(QuestionId::new(1)))
        );
        assert_eq!(answer_set().ensure_startable(), Ok(()));
    }

    #[test]
    fn answers_list_every_question_in_order() {
        let mut set = answer_set();
        set.select_option(QuestionId::new(2), OptionId::new(22)).unwrap();
        let answers = set.answers();
        assert_eq!(answers.len(), 3);
        assert_eq!(answers[0].selected, None);
        assert_eq!(answers[1].selected, Some(OptionId::new(22)));
    }
}
