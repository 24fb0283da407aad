#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use chrono::Duration;
use quiz_core::integrity::{DisplayModeError, ExclusiveDisplay};
use quiz_core::model::{
    AnswerOption, OptionId, Participant, Question, QuestionId, QuizId, Section, SectionId,
};
use quiz_core::time::fixed_now;
use services::{AttemptService, Clock, KeepOrder};
use storage::repository::{QuizRecord, Storage};

/// Display capability that records calls instead of touching a screen.
#[derive(Default)]
pub struct RecordingDisplay {
    active: AtomicBool,
    pub requests: AtomicUsize,
    pub releases: AtomicUsize,
}

impl RecordingDisplay {
    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl ExclusiveDisplay for RecordingDisplay {
    fn request(&self) -> Result<(), DisplayModeError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.active.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn release(&self) -> Result<(), DisplayModeError> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        self.active.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

pub const CODE: &str = "NET-1";

pub fn record(duration_minutes: u32) -> QuizRecord {
    QuizRecord {
        id: QuizId::new(1),
        code: CODE.into(),
        title: "Networks".into(),
        instructions: Some("Stay in fullscreen".into()),
        duration_minutes,
        starts_at: fixed_now() - Duration::hours(1),
        ends_at: fixed_now() + Duration::hours(1),
        passing_score: Some(2),
    }
}

/// Option `id*10+1` is correct, `id*10+2` is wrong.
pub fn question(id: u64, section: u64) -> Question {
    let options = vec![
        AnswerOption::new(OptionId::new(id * 10 + 1), "right", true).unwrap(),
        AnswerOption::new(OptionId::new(id * 10 + 2), "wrong", false).unwrap(),
    ];
    Question::new(
        QuestionId::new(id),
        SectionId::new(section),
        format!("Q{id}"),
        options,
        None,
    )
    .unwrap()
}

/// Section A with questions 1 and 2, section B with question 3.
pub fn sections() -> Vec<Section> {
    vec![
        Section::new(SectionId::new(1), "A", None, vec![question(1, 1), question(2, 1)]).unwrap(),
        Section::new(SectionId::new(2), "B", None, vec![question(3, 2)]).unwrap(),
    ]
}

pub fn participant(prn: &str) -> Participant {
    Participant::new("Ada", "ada@example.com", prn, CODE).with_batch("B1")
}

pub async fn seeded(storage: &Storage, duration_minutes: u32) {
    storage
        .quizzes
        .upsert_quiz(&record(duration_minutes), &sections())
        .await
        .unwrap();
}

pub fn service(storage: &Storage, display: Arc<RecordingDisplay>) -> AttemptService {
    AttemptService::from_storage(Clock::fixed(fixed_now()), storage, display)
        .with_shuffle(Arc::new(KeepOrder))
}
