mod answer_set;
mod ids;
mod instructions;
mod participant;
mod question;
mod section;
mod session;

pub use ids::{OptionId, ParseIdError, QuestionId, QuizId, SectionId};

pub use answer_set::{AnswerRecord, AnswerSet, AnswerSetError};
pub use instructions::{Instructions, InstructionsError};
pub use participant::Participant;
pub use question::{AnswerError, AnswerOption, OptionView, Question, QuestionError, QuestionView};
pub use section::{Section, SectionError};
pub use session::{CompletionReason, Lifecycle, QuizResult, QuizResultError};
