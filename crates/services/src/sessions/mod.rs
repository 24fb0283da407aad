mod progress;
mod queries;
mod runner;
mod service;
mod shuffle;
mod view;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::{LoadError, SessionError};
pub use progress::{QuizPosition, SessionProgress, SessionSnapshot};
pub use queries::{LoadedQuiz, QuizQueries};
pub use runner::{RunOutcome, SessionCommand, SessionHandle, SessionRunner, Ticker};
pub use service::{QuizSession, SessionEvent};
pub use shuffle::{KeepOrder, OptionShuffle, SeededShuffle, ThreadRngShuffle, shuffle_options};
pub use view::{QuestionReview, ResultListItem, ResultsView};
pub use workflow::{AttemptService, PersistenceStatus, QuizAttempt};
