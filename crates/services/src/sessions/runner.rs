//! Async driver for one quiz session.
//!
//! Ticks, display-mode changes and user actions all arrive as
//! [`SessionCommand`]s on one queue and are applied by a single task, so no
//! command ever sees a half-applied state. A snapshot is published on a
//! `watch` channel after every command.
//!
//! The integrity grace period is a one-shot deadline armed when the display
//! loss is applied, not a count of quiz ticks, so it lasts the full period
//! whatever the tick phase. It is raced against the queue in the same task.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use quiz_core::model::{OptionId, QuestionId};

use super::progress::SessionSnapshot;
use super::service::QuizSession;
use super::workflow::{AttemptService, PersistenceStatus, QuizAttempt};
use crate::error::SessionError;

pub const TICK_PERIOD: Duration = Duration::from_secs(1);
const COMMAND_BUFFER: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    /// One second of quiz time. The grace period keeps its own deadline.
    Tick,
    DisplayChanged(bool),
    Next,
    Previous,
    Select {
        question: QuestionId,
        option: OptionId,
    },
    Submit,
}

//
// ─── TICKER ────────────────────────────────────────────────────────────────────
//

/// Owned interval task that feeds `SessionCommand::Tick` into a queue.
///
/// Cancelling is idempotent; dropping the ticker cancels it.
#[derive(Debug)]
pub struct Ticker {
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    /// First tick fires one `period` after start.
    #[must_use]
    pub fn start(commands: mpsc::Sender<SessionCommand>, period: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
            loop {
                interval.tick().await;
                if commands.send(SessionCommand::Tick).await.is_err() {
                    break;
                }
            }
        });
        Self {
            handle: Some(handle),
        }
    }

    /// Returns `true` only for the call that actually stopped the task.
    pub fn cancel(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.cancel();
    }
}

//
// ─── RUNNER ────────────────────────────────────────────────────────────────────
//

/// Final state of a runner once its session completed.
#[derive(Debug)]
pub struct RunOutcome {
    pub attempt: QuizAttempt,
    pub persistence: PersistenceStatus,
}

/// Caller's side of a running session.
#[derive(Debug)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    snapshots: watch::Receiver<SessionSnapshot>,
    task: JoinHandle<Result<RunOutcome, SessionError>>,
}

impl SessionHandle {
    /// # Errors
    ///
    /// Returns `SessionError::RunnerClosed` once the session has completed.
    pub async fn send(&self, command: SessionCommand) -> Result<(), SessionError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SessionError::RunnerClosed)
    }

    /// A sender for event sources such as a display-mode listener.
    #[must_use]
    pub fn commands(&self) -> mpsc::Sender<SessionCommand> {
        self.commands.clone()
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    /// Wait for the session to complete and its result to be persisted.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::RunnerClosed` if the runner task panicked or was
    /// aborted, or the error `finalize` returned.
    pub async fn join(self) -> Result<RunOutcome, SessionError> {
        self.task.await.map_err(|_| SessionError::RunnerClosed)?
    }
}

pub struct SessionRunner;

impl SessionRunner {
    /// Start the attempt and drive it on a background task.
    ///
    /// # Errors
    ///
    /// Returns whatever `AttemptService::start` returns; nothing is spawned then.
    pub async fn start(
        service: AttemptService,
        mut attempt: QuizAttempt,
    ) -> Result<SessionHandle, SessionError> {
        service.start(&mut attempt).await?;

        let (commands, queue) = mpsc::channel(COMMAND_BUFFER);
        let (publish, snapshots) = watch::channel(attempt.session().snapshot());
        let ticker = Ticker::start(commands.clone(), TICK_PERIOD);
        let task = tokio::spawn(run(service, attempt, queue, publish, ticker));

        Ok(SessionHandle {
            commands,
            snapshots,
            task,
        })
    }
}

async fn run(
    service: AttemptService,
    mut attempt: QuizAttempt,
    mut queue: mpsc::Receiver<SessionCommand>,
    publish: watch::Sender<SessionSnapshot>,
    mut ticker: Ticker,
) -> Result<RunOutcome, SessionError> {
    let grace_period = Duration::from_secs(u64::from(
        attempt.session().policy().grace_period_secs(),
    ));
    let mut grace_deadline: Option<Instant> = None;

    loop {
        let deadline = grace_deadline;
        // Grace first: a grace expiry and a final quiz tick due together end as
        // a termination.
        let command = tokio::select! {
            biased;
            () = time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => None,
            command = queue.recv() => match command {
                Some(command) => Some(command),
                None => break,
            },
        };

        match command {
            Some(command) => apply(&service, &mut attempt, command),
            None => {
                tracing::debug!("grace deadline reached");
                attempt.session_mut().grace_elapsed(service.clock().now());
            }
        }

        grace_deadline = match (attempt.session().warning_visible(), grace_deadline) {
            (true, Some(deadline)) => Some(deadline),
            (true, None) => Some(Instant::now() + grace_period),
            (false, _) => None,
        };
        publish.send_replace(snapshot(attempt.session(), grace_deadline));
        if attempt.session().is_complete() {
            break;
        }
    }
    ticker.cancel();
    queue.close();

    let persistence = if attempt.session().is_complete() {
        service.finalize(&mut attempt).await?
    } else {
        attempt.persistence().clone()
    };
    Ok(RunOutcome {
        attempt,
        persistence,
    })
}

/// Session snapshot with the grace countdown read off the live deadline.
fn snapshot(session: &QuizSession, grace_deadline: Option<Instant>) -> SessionSnapshot {
    let mut snapshot = session.snapshot();
    if let Some(deadline) = grace_deadline {
        let left = deadline.saturating_duration_since(Instant::now());
        let secs = left.as_secs() + u64::from(left.subsec_nanos() > 0);
        snapshot.grace_remaining_secs = Some(u32::try_from(secs).unwrap_or(u32::MAX));
    }
    snapshot
}

fn apply(service: &AttemptService, attempt: &mut QuizAttempt, command: SessionCommand) {
    let now = service.clock().now();
    let session = attempt.session_mut();
    match command {
        SessionCommand::Tick => {
            session.tick_countdown(now);
        }
        SessionCommand::DisplayChanged(active) => {
            session.display_mode_changed(active, now);
        }
        SessionCommand::Next => {
            session.next();
        }
        SessionCommand::Previous => {
            session.previous();
        }
        SessionCommand::Select { question, option } => {
            if let Err(err) = session.select_option(question, option) {
                tracing::warn!(error = %err, question = question.value(), "selection rejected");
            }
        }
        SessionCommand::Submit => {
            if let Err(err) = session.submit(now) {
                tracing::warn!(error = %err, "submit rejected");
            }
        }
    }
}
