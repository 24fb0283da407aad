use thiserror::Error;

use crate::integrity::IntegrityPolicyError;
use crate::model::{
    AnswerError, AnswerSetError, InstructionsError, QuestionError, QuizResultError, SectionError,
};

/// Umbrella error for callers that do not care which domain rule failed.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Section(#[from] SectionError),
    #[error(transparent)]
    Instructions(#[from] InstructionsError),
    #[error(transparent)]
    Answer(#[from] AnswerError),
    #[error(transparent)]
    AnswerSet(#[from] AnswerSetError),
    #[error(transparent)]
    Result(#[from] QuizResultError),
    #[error(transparent)]
    Policy(#[from] IntegrityPolicyError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrity::IntegrityPolicy;
    use crate::model::{Section, SectionId};

    fn build() -> Result<(), Error> {
        let _policy = IntegrityPolicy::new(30, 2)?;
        let _section = Section::new(SectionId::new(1), "  ", None, Vec::new())?;
        Ok(())
    }

    #[test]
    fn domain_errors_convert_with_question_mark() {
        let err = build().unwrap_err();
        assert!(matches!(err, Error::Section(SectionError::EmptyTitle)));
        assert_eq!(err.to_string(), "section title cannot be empty");
    }
}
