use chrono::{DateTime, Utc};
use serde::Serialize;

use quiz_core::integrity::TerminationReason;
use quiz_core::model::{AnswerOption, CompletionReason, OptionView, Question, QuestionId};
use quiz_core::scoring::ScoreReport;
use storage::repository::{ResultId, ResultRow};

use super::service::QuizSession;

pub const TERMINATED_TITLE: &str = "Quiz Terminated - Cheating Detected";

/// Per-question outcome shown after a normal completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionReview {
    pub question_id: QuestionId,
    pub text: String,
    pub selected: Option<OptionView>,
    pub correct: Option<OptionView>,
    pub is_correct: bool,
}

impl QuestionReview {
    fn from_question(question: &Question) -> Self {
        let as_view = |o: &AnswerOption| OptionView {
            id: o.id(),
            text: o.text().to_owned(),
        };
        Self {
            question_id: question.id(),
            text: question.text().to_owned(),
            selected: question.selected_option().map(as_view),
            correct: question.correct_option().map(as_view),
            is_correct: question.is_answered_correctly(),
        }
    }
}

/// What the participant sees once the session is over.
///
/// A terminated session withholds the score and all correctness detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResultsView {
    Scored {
        report: ScoreReport,
        reviews: Vec<QuestionReview>,
    },
    Terminated {
        reason: TerminationReason,
        message: &'static str,
    },
}

impl ResultsView {
    /// `None` until the session has completed.
    #[must_use]
    pub fn from_session(session: &QuizSession) -> Option<Self> {
        let completion = session.completion()?;
        if let CompletionReason::Terminated(reason) = completion {
            return Some(Self::Terminated {
                reason,
                message: reason.message(),
            });
        }

        let answers = session.answers();
        let total = u32::try_from(answers.total_questions()).unwrap_or(u32::MAX);
        let passing = session.instructions().and_then(|i| i.passing_score());
        let report = ScoreReport::new(session.score()?, total, passing);
        Some(Self::Scored {
            report,
            reviews: answers.questions().map(QuestionReview::from_question).collect(),
        })
    }

    #[must_use]
    pub fn title(&self) -> &'static str {
        match self {
            Self::Scored { report, .. } => report.band.message(),
            Self::Terminated { .. } => TERMINATED_TITLE,
        }
    }

    #[must_use]
    pub fn is_terminated(&self) -> bool {
        matches!(self, Self::Terminated { .. })
    }
}

/// Presentation-agnostic list item for a stored result.
///
/// Timestamps are left unformatted for the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultListItem {
    pub id: ResultId,
    pub name: String,
    pub prn: String,
    pub score: u32,
    pub total: u32,
    pub cheating: bool,
    pub completed_at: DateTime<Utc>,
}

impl ResultListItem {
    #[must_use]
    pub fn from_row(row: &ResultRow) -> Self {
        let result = &row.result;
        Self {
            id: row.id,
            name: result.participant().name.clone(),
            prn: result.participant().prn.clone(),
            score: result.score(),
            total: result.total_questions(),
            cheating: result.is_cheating(),
            completed_at: result.completed_at(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use quiz_core::integrity::{IntegrityPolicy, UnsupportedDisplay};
    use quiz_core::model::{
        Instructions, OptionId, Participant, QuizId, QuizResult, Section, SectionId,
    };
    use quiz_core::scoring::PerformanceBand;
    use quiz_core::time::fixed_now;

    fn session(passing: Option<u32>) -> QuizSession {
        let questions = (1..=4)
            .map(|id| {
                let options = vec![
                    AnswerOption::new(OptionId::new(id * 10 + 1), "right", true).unwrap(),
                    AnswerOption::new(OptionId::new(id * 10 + 2), "wrong", false).unwrap(),
                ];
                Question::new(QuestionId::new(id), SectionId::new(1), "Q", options, None).unwrap()
            })
            .collect();
        let mut session =
            QuizSession::new(Arc::new(UnsupportedDisplay), IntegrityPolicy::default());
        session
            .initialize(
                Instructions::new("Quiz", "", 5, 4, passing, Vec::new()).unwrap(),
                vec![Section::new(SectionId::new(1), "A", None, questions).unwrap()],
            )
            .unwrap();
        session.start(fixed_now()).unwrap();
        session
    }

    #[test]
    fn no_view_before_completion() {
        assert!(ResultsView::from_session(&session(None)).is_none());
    }

    #[test]
    fn scored_view_reports_band_and_reviews() {
        let mut session = session(Some(3));
        for id in 1..=3 {
            session
                .select_option(QuestionId::new(id), OptionId::new(id * 10 + 1))
                .unwrap();
        }
        session.submit(fixed_now()).unwrap();

        let view = ResultsView::from_session(&session).unwrap();
        let ResultsView::Scored { report, reviews } = &view else {
            panic!("expected scored view");
        };
        assert_eq!(report.score, 3);
        assert_eq!(report.percentage, 75);
        assert_eq!(report.band, PerformanceBand::Good);
        assert_eq!(report.passed, Some(true));
        assert_eq!(view.title(), "Good Job!");

        assert_eq!(reviews.len(), 4);
        assert!(reviews[0].is_correct);
        assert!(reviews[3].selected.is_none());
        assert!(!reviews[3].is_correct);
        assert_eq!(reviews[3].correct.as_ref().unwrap().id, OptionId::new(41));
    }

    #[test]
    fn terminated_view_withholds_score() {
        let mut session = session(None);
        session.display_mode_changed(false, fixed_now());
        session.display_mode_changed(true, fixed_now());
        session.display_mode_changed(false, fixed_now());

        let view = ResultsView::from_session(&session).unwrap();
        assert!(view.is_terminated());
        assert_eq!(view.title(), TERMINATED_TITLE);
        assert_eq!(
            view,
            ResultsView::Terminated {
                reason: TerminationReason::RepeatedExit,
                message: TerminationReason::RepeatedExit.message(),
            }
        );
    }

    #[test]
    fn list_item_copies_row_fields() {
        let result = QuizResult::from_answers(
            Participant::new("Ada", "ada@example.com", "PRN1", "ABC"),
            QuizId::new(1),
            0,
            CompletionReason::TimeExpired,
            Vec::new(),
            fixed_now(),
            fixed_now(),
        )
        .unwrap();
        let item = ResultListItem::from_row(&ResultRow::new(5, result));
        assert_eq!(item.id, 5);
        assert_eq!(item.prn, "PRN1");
        assert_eq!(item.total, 0);
        assert!(!item.cheating);
    }
}
