use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use quiz_core::integrity::{
    ExclusiveDisplay, IntegrityEvent, IntegrityMonitor, IntegrityPolicy, IntegrityState,
    TerminationReason,
};
use quiz_core::model::{
    AnswerSet, CompletionReason, Instructions, Lifecycle, OptionId, Participant, Question,
    QuestionId, QuestionView, QuizId, QuizResult, Section,
};
use quiz_core::timer::{Countdown, Tick};

use super::progress::{QuizPosition, SessionProgress, SessionSnapshot};
use super::shuffle::{OptionShuffle, shuffle_options};
use crate::error::SessionError;

//
// ─── EVENTS ────────────────────────────────────────────────────────────────────
//

/// What a tick or display-mode change did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Nothing changed.
    Ignored,
    /// The countdown advanced.
    Ticked { remaining_secs: u32 },
    /// First loss of exclusive display; the grace timer is running.
    Warning { grace_secs: u32 },
    /// Exclusive display restored within the grace period.
    Recovered,
    Completed(CompletionReason),
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One participant's quiz session.
///
/// Owns the answers, the countdown and the integrity monitor. All mutation goes
/// through `&mut self`, so ticks, display-mode changes and user actions are
/// applied one at a time by whoever owns the session.
pub struct QuizSession {
    display: Arc<dyn ExclusiveDisplay>,
    policy: IntegrityPolicy,
    lifecycle: Lifecycle,
    instructions: Option<Instructions>,
    answers: AnswerSet,
    position: QuizPosition,
    countdown: Countdown,
    monitor: IntegrityMonitor,
    completion: Option<CompletionReason>,
    score: Option<u32>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl QuizSession {
    /// Create an empty session; call `initialize` before `start`.
    #[must_use]
    pub fn new(display: Arc<dyn ExclusiveDisplay>, policy: IntegrityPolicy) -> Self {
        Self {
            display,
            policy,
            lifecycle: Lifecycle::NotStarted,
            instructions: None,
            answers: AnswerSet::new(Vec::new()),
            position: QuizPosition::default(),
            countdown: Countdown::new(0),
            monitor: IntegrityMonitor::new(policy),
            completion: None,
            score: None,
            started_at: None,
            completed_at: None,
        }
    }

    /// (Re)populate the session. Indices, timer and integrity state are reset.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadyStarted` or `SessionError::Completed` once the
    /// session has left `NotStarted`, and `SessionError::Unstartable` if a question
    /// id repeats across sections. Nothing changes on error.
    pub fn initialize(
        &mut self,
        instructions: Instructions,
        sections: Vec<Section>,
    ) -> Result<(), SessionError> {
        self.ensure_not_started()?;
        AnswerSet::ensure_unique(&sections)?;
        self.countdown = Countdown::new(instructions.duration_secs());
        self.monitor = IntegrityMonitor::new(self.policy);
        self.answers = AnswerSet::new(sections);
        self.instructions = Some(instructions);
        self.position = QuizPosition::default();
        Ok(())
    }

    /// Randomize option order once, before the session starts.
    ///
    /// # Errors
    ///
    /// Returns an error once the session has left `NotStarted`.
    pub fn shuffle_options(&mut self, shuffle: &dyn OptionShuffle) -> Result<(), SessionError> {
        self.ensure_not_started()?;
        shuffle_options(&mut self.answers, shuffle);
        Ok(())
    }

    /// Checks that `start` would succeed, without changing anything.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Unstartable` for missing or empty sections, or a
    /// lifecycle error if the session already started.
    pub fn ensure_startable(&self) -> Result<(), SessionError> {
        self.ensure_not_started()?;
        self.answers.ensure_startable()?;
        Ok(())
    }

    /// Move to `InProgress`, start the countdown and arm the integrity monitor.
    ///
    /// Exclusive display mode is requested on a best-effort basis; a platform
    /// that refuses it leaves the monitor assuming the mode is engaged.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Unstartable` if there are no sections or a section
    /// has no questions; the lifecycle is left unchanged.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), SessionError> {
        self.ensure_startable()?;

        self.lifecycle = Lifecycle::InProgress;
        self.started_at = Some(now);
        self.position = QuizPosition::default();
        self.countdown.start();
        self.monitor.arm();
        if let Err(err) = self.display.request() {
            tracing::warn!(error = %err, "exclusive display request failed");
        }

        tracing::info!(
            questions = self.answers.total_questions(),
            sections = self.answers.sections().len(),
            duration_secs = self.countdown.total_secs(),
            "quiz session started"
        );
        Ok(())
    }

    /// Advance one question, crossing into the next section when needed.
    ///
    /// Returns `false` (and does nothing) at the last question or outside
    /// `InProgress`.
    pub fn next(&mut self) -> bool {
        if !self.is_in_progress() {
            return false;
        }
        let QuizPosition { section, question } = self.position;
        let Some(current) = self.answers.section(section) else {
            return false;
        };
        if question + 1 < current.len() {
            self.position.question += 1;
            return true;
        }
        if section + 1 < self.answers.sections().len() {
            self.position = QuizPosition {
                section: section + 1,
                question: 0,
            };
            return true;
        }
        false
    }

    /// Step back one question; from a section's first question, go to the
    /// previous section's last question.
    pub fn previous(&mut self) -> bool {
        if !self.is_in_progress() {
            return false;
        }
        let QuizPosition { section, question } = self.position;
        if question > 0 {
            self.position.question -= 1;
            return true;
        }
        if section == 0 {
            return false;
        }
        let Some(prev) = self.answers.section(section - 1) else {
            return false;
        };
        self.position = QuizPosition {
            section: section - 1,
            question: prev.len().saturating_sub(1),
        };
        true
    }

    /// Record an answer.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotStarted`/`Completed` outside `InProgress`, or
    /// `SessionError::Answer` for an unknown question or foreign option. No state
    /// changes on error.
    pub fn select_option(
        &mut self,
        question_id: QuestionId,
        option_id: OptionId,
    ) -> Result<(), SessionError> {
        self.ensure_in_progress()?;
        self.answers.select_option(question_id, option_id)?;
        Ok(())
    }

    /// Manual, confirmed submission. Releases exclusive display mode.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotStarted` or `SessionError::Completed` outside
    /// `InProgress`.
    pub fn submit(&mut self, now: DateTime<Utc>) -> Result<u32, SessionError> {
        self.ensure_in_progress()?;
        let score = self.complete(CompletionReason::Submitted, now);

        if self.display.is_active() {
            if let Err(err) = self.display.release() {
                tracing::warn!(error = %err, "exclusive display release failed");
            }
        } else {
            tracing::debug!("exclusive display already inactive at submit");
        }
        Ok(score)
    }

    /// One elapsed second.
    ///
    /// The integrity grace timer is checked first: if it and the quiz countdown
    /// both run out on the same tick, the session ends as terminated.
    pub fn tick(&mut self, now: DateTime<Utc>) -> SessionEvent {
        if !self.is_in_progress() {
            return SessionEvent::Ignored;
        }

        if let IntegrityEvent::Terminated(reason) = self.monitor.tick() {
            return self.terminate(reason, now);
        }
        self.step_countdown(now)
    }

    /// One elapsed second of quiz time, leaving the grace period alone.
    ///
    /// For drivers that time the grace period with a one-shot timer started at
    /// the loss and report it through `grace_elapsed`.
    pub fn tick_countdown(&mut self, now: DateTime<Utc>) -> SessionEvent {
        if !self.is_in_progress() {
            return SessionEvent::Ignored;
        }
        self.step_countdown(now)
    }

    /// The grace period that began at the last display loss has run out.
    ///
    /// Ignored after recovery or completion.
    pub fn grace_elapsed(&mut self, now: DateTime<Utc>) -> SessionEvent {
        if !self.is_in_progress() {
            return SessionEvent::Ignored;
        }
        match self.monitor.expire_grace() {
            IntegrityEvent::Terminated(reason) => self.terminate(reason, now),
            _ => SessionEvent::Ignored,
        }
    }

    fn step_countdown(&mut self, now: DateTime<Utc>) -> SessionEvent {
        match self.countdown.tick() {
            Tick::Ignored => SessionEvent::Ignored,
            Tick::Running { remaining } => SessionEvent::Ticked {
                remaining_secs: remaining,
            },
            Tick::Elapsed => {
                tracing::info!("quiz time expired");
                self.complete(CompletionReason::TimeExpired, now);
                SessionEvent::Completed(CompletionReason::TimeExpired)
            }
        }
    }

    /// Feed an edge of the "exclusive display mode is engaged" signal.
    pub fn display_mode_changed(&mut self, active: bool, now: DateTime<Utc>) -> SessionEvent {
        if !self.is_in_progress() {
            return SessionEvent::Ignored;
        }

        match self.monitor.on_display_change(active, now) {
            IntegrityEvent::Warning { grace_secs } => {
                tracing::warn!(
                    grace_secs,
                    exits = self.monitor.exits(),
                    "left exclusive display mode"
                );
                SessionEvent::Warning { grace_secs }
            }
            IntegrityEvent::Recovered => {
                tracing::info!(exits = self.monitor.exits(), "exclusive display restored");
                SessionEvent::Recovered
            }
            IntegrityEvent::Terminated(reason) => self.terminate(reason, now),
            IntegrityEvent::Ignored | IntegrityEvent::GraceTick { .. } => SessionEvent::Ignored,
        }
    }

    fn terminate(&mut self, reason: TerminationReason, now: DateTime<Utc>) -> SessionEvent {
        tracing::warn!(
            reason = ?reason,
            exits = self.monitor.exits(),
            "quiz terminated for integrity violation"
        );
        let completion = CompletionReason::Terminated(reason);
        self.complete(completion, now);
        SessionEvent::Completed(completion)
    }

    /// Shared finalization for every way a session can end.
    fn complete(&mut self, reason: CompletionReason, now: DateTime<Utc>) -> u32 {
        self.countdown.cancel();
        self.monitor.disarm();
        let score = self.answers.score();
        self.score = Some(score);
        self.completion = Some(reason);
        self.completed_at = Some(now);
        self.lifecycle = Lifecycle::Completed;
        tracing::info!(
            completion = reason.as_str(),
            score,
            total = self.answers.total_questions(),
            "quiz session completed"
        );
        score
    }

    fn ensure_not_started(&self) -> Result<(), SessionError> {
        match self.lifecycle {
            Lifecycle::NotStarted => Ok(()),
            Lifecycle::InProgress => Err(SessionError::AlreadyStarted),
            Lifecycle::Completed => Err(SessionError::Completed),
        }
    }

    fn ensure_in_progress(&self) -> Result<(), SessionError> {
        match self.lifecycle {
            Lifecycle::NotStarted => Err(SessionError::NotStarted),
            Lifecycle::InProgress => Ok(()),
            Lifecycle::Completed => Err(SessionError::Completed),
        }
    }

    // ─── Queries ───

    /// The question under the cursor, without correctness.
    ///
    /// `None` when there are no sections or questions to show.
    #[must_use]
    pub fn current_question(&self) -> Option<QuestionView> {
        self.current().map(Question::view)
    }

    fn current(&self) -> Option<&Question> {
        self.answers
            .question_at(self.position.section, self.position.question)
    }

    #[must_use]
    pub fn current_section(&self) -> Option<&Section> {
        self.answers.section(self.position.section)
    }

    #[must_use]
    pub fn position(&self) -> QuizPosition {
        self.position
    }

    #[must_use]
    pub fn has_previous(&self) -> bool {
        self.position.question > 0 || self.position.section > 0
    }

    #[must_use]
    pub fn has_next(&self) -> bool {
        let sections = self.answers.sections();
        let QuizPosition { section, question } = self.position;
        sections
            .get(section)
            .is_some_and(|s| question + 1 < s.len())
            || section + 1 < sections.len()
    }

    /// Remaining time as `MM:SS`; minutes may exceed 59.
    #[must_use]
    pub fn time_remaining(&self) -> String {
        self.countdown.display()
    }

    #[must_use]
    pub fn seconds_remaining(&self) -> u32 {
        self.countdown.remaining_secs()
    }

    #[must_use]
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    #[must_use]
    pub fn is_in_progress(&self) -> bool {
        self.lifecycle == Lifecycle::InProgress
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.lifecycle == Lifecycle::Completed
    }

    #[must_use]
    pub fn is_cheating(&self) -> bool {
        self.completion.is_some_and(CompletionReason::is_cheating)
    }

    #[must_use]
    pub fn score(&self) -> Option<u32> {
        self.score
    }

    #[must_use]
    pub fn completion(&self) -> Option<CompletionReason> {
        self.completion
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn policy(&self) -> IntegrityPolicy {
        self.policy
    }

    #[must_use]
    pub fn integrity_state(&self) -> IntegrityState {
        self.monitor.state()
    }

    #[must_use]
    pub fn display_exits(&self) -> u32 {
        self.monitor.exits()
    }

    #[must_use]
    pub fn last_exit_at(&self) -> Option<DateTime<Utc>> {
        self.monitor.last_exit_at()
    }

    #[must_use]
    pub fn grace_remaining_secs(&self) -> Option<u32> {
        self.monitor.grace_remaining_secs()
    }

    /// The one-time warning stays visible while the grace timer runs.
    #[must_use]
    pub fn warning_visible(&self) -> bool {
        self.monitor.state() == IntegrityState::Warned
    }

    #[must_use]
    pub fn instructions(&self) -> Option<&Instructions> {
        self.instructions.as_ref()
    }

    #[must_use]
    pub fn answers(&self) -> &AnswerSet {
        &self.answers
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let total = self.answers.total_questions();
        let answered = self.answers.answered_count();
        SessionProgress {
            total,
            answered,
            remaining: total.saturating_sub(answered),
            is_complete: self.is_complete(),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            lifecycle: self.lifecycle,
            position: self.position,
            has_previous: self.has_previous(),
            has_next: self.has_next(),
            time_remaining: self.time_remaining(),
            seconds_remaining: self.seconds_remaining(),
            integrity: self.integrity_state(),
            warning_visible: self.warning_visible(),
            grace_remaining_secs: self.grace_remaining_secs(),
            display_exits: self.display_exits(),
            progress: self.progress(),
            is_cheating: self.is_cheating(),
            score: self.score,
        }
    }

    /// Build the record handed to the results sink.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotCompleted` before completion, or
    /// `SessionError::Result` if the record is inconsistent.
    pub fn build_result(
        &self,
        participant: Participant,
        quiz_id: QuizId,
    ) -> Result<QuizResult, SessionError> {
        let (Some(completion), Some(score), Some(started_at), Some(completed_at)) = (
            self.completion,
            self.score,
            self.started_at,
            self.completed_at,
        ) else {
            return Err(SessionError::NotCompleted);
        };
        Ok(QuizResult::from_answers(
            participant,
            quiz_id,
            score,
            completion,
            self.answers.answers(),
            started_at,
            completed_at,
        )?)
    }
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("lifecycle", &self.lifecycle)
            .field("sections_len", &self.answers.sections().len())
            .field("position", &self.position)
            .field("seconds_remaining", &self.countdown.remaining_secs())
            .field("integrity", &self.monitor.state())
            .field("completion", &self.completion)
            .field("score", &self.score)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
