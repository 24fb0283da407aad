//! Exclusive-display integrity monitor.
//!
//! The monitor only sees edges of a boolean "exclusive display mode is engaged"
//! signal. Its grace timer is driven either by one-second `tick`s or by a
//! caller-owned one-shot timer that calls `expire_grace`. Platform APIs stay
//! behind [`ExclusiveDisplay`].
//!
//! Policy (defaults):
//! - first loss of the mode: warning, 30 s grace timer starts
//! - mode restored before the grace timer elapses: grace timer is cancelled at once,
//!   state returns to compliant, the violation stays counted
//! - second loss at any later time, or grace timer elapsing: terminated
//! - terminated is absorbing; later signal changes are ignored
//!
//! Platforms that never deliver change events leave the monitor compliant. There
//! is no polling fallback.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::timer::{Countdown, Tick};

pub const DEFAULT_GRACE_PERIOD_SECS: u32 = 30;
pub const DEFAULT_MAX_DISPLAY_EXITS: u32 = 2;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum IntegrityPolicyError {
    #[error("grace period must be > 0 seconds")]
    InvalidGracePeriod,

    #[error("max display exits must be > 0")]
    InvalidMaxExits,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DisplayModeError {
    #[error("exclusive display mode is not supported on this platform")]
    Unsupported,

    #[error("exclusive display request was denied: {0}")]
    Denied(String),
}

//
// ─── CAPABILITY ────────────────────────────────────────────────────────────────
//

/// Imperative half of the display-mode capability.
///
/// The change signal itself is delivered to the session as events; this trait only
/// asks the platform to enter or leave the mode.
pub trait ExclusiveDisplay: Send + Sync {
    /// Ask the platform to engage exclusive display mode.
    ///
    /// # Errors
    ///
    /// Returns `DisplayModeError` if the platform refuses or lacks support.
    fn request(&self) -> Result<(), DisplayModeError>;

    /// Ask the platform to leave exclusive display mode.
    ///
    /// # Errors
    ///
    /// Returns `DisplayModeError` if the platform refuses or lacks support.
    fn release(&self) -> Result<(), DisplayModeError>;

    /// Best-effort current state.
    fn is_active(&self) -> bool;
}

/// Capability for platforms with no exclusive display mode at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedDisplay;

impl ExclusiveDisplay for UnsupportedDisplay {
    fn request(&self) -> Result<(), DisplayModeError> {
        Err(DisplayModeError::Unsupported)
    }

    fn release(&self) -> Result<(), DisplayModeError> {
        Err(DisplayModeError::Unsupported)
    }

    fn is_active(&self) -> bool {
        false
    }
}

//
// ─── POLICY ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityPolicy {
    grace_period_secs: u32,
    max_display_exits: u32,
}

impl Default for IntegrityPolicy {
    fn default() -> Self {
        Self {
            grace_period_secs: DEFAULT_GRACE_PERIOD_SECS,
            max_display_exits: DEFAULT_MAX_DISPLAY_EXITS,
        }
    }
}

impl IntegrityPolicy {
    /// # Errors
    ///
    /// Returns `IntegrityPolicyError` if either value is zero.
    pub fn new(grace_period_secs: u32, max_display_exits: u32) -> Result<Self, IntegrityPolicyError> {
        if grace_period_secs == 0 {
            return Err(IntegrityPolicyError::InvalidGracePeriod);
        }
        if max_display_exits == 0 {
            return Err(IntegrityPolicyError::InvalidMaxExits);
        }
        Ok(Self {
            grace_period_secs,
            max_display_exits,
        })
    }

    #[must_use]
    pub fn grace_period_secs(&self) -> u32 {
        self.grace_period_secs
    }

    /// Number of exits that confirms cheating. Exits below this get a warning.
    #[must_use]
    pub fn max_display_exits(&self) -> u32 {
        self.max_display_exits
    }
}

//
// ─── STATE MACHINE ─────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TerminationReason {
    /// Exclusive mode was left again after a warning.
    RepeatedExit,
    /// Exclusive mode was not restored within the grace period.
    GraceExpired,
}

impl TerminationReason {
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::RepeatedExit => "Quiz terminated: multiple fullscreen exits detected",
            Self::GraceExpired => "Quiz terminated: extended period outside fullscreen",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntegrityState {
    Compliant,
    /// Mode lost; waiting for recovery within the grace period.
    Warned,
    Terminated(TerminationReason),
}

/// What a signal change or tick did to the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityEvent {
    Ignored,
    /// First loss: show the one-time warning.
    Warning { grace_secs: u32 },
    /// Grace timer still running.
    GraceTick { remaining_secs: u32 },
    Recovered,
    Terminated(TerminationReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityMonitor {
    policy: IntegrityPolicy,
    state: IntegrityState,
    armed: bool,
    display_active: bool,
    exits: u32,
    last_exit_at: Option<DateTime<Utc>>,
    grace: Countdown,
}

impl IntegrityMonitor {
    #[must_use]
    pub fn new(policy: IntegrityPolicy) -> Self {
        Self {
            policy,
            state: IntegrityState::Compliant,
            armed: false,
            display_active: true,
            exits: 0,
            last_exit_at: None,
            grace: Countdown::new(policy.grace_period_secs()),
        }
    }

    /// Begin watching. The mode is assumed engaged until told otherwise.
    pub fn arm(&mut self) {
        if self.armed || self.is_terminated() {
            return;
        }
        self.armed = true;
        self.display_active = true;
    }

    /// Stop watching and cancel any pending grace timer. Idempotent.
    pub fn disarm(&mut self) {
        self.armed = false;
        self.grace.cancel();
    }

    /// Feed one edge of the display-mode signal.
    ///
    /// Repeated values are ignored, so only transitions count as violations.
    pub fn on_display_change(&mut self, active: bool, at: DateTime<Utc>) -> IntegrityEvent {
        if !self.armed || self.is_terminated() || active == self.display_active {
            return IntegrityEvent::Ignored;
        }
        self.display_active = active;

        if active {
            if self.state != IntegrityState::Warned {
                return IntegrityEvent::Ignored;
            }
            self.grace.cancel();
            self.last_exit_at = None;
            self.state = IntegrityState::Compliant;
            return IntegrityEvent::Recovered;
        }

        self.exits = self.exits.saturating_add(1);
        self.last_exit_at = Some(at);
        if self.exits >= self.policy.max_display_exits() {
            return self.terminate(TerminationReason::RepeatedExit);
        }

        self.grace = Countdown::new(self.policy.grace_period_secs());
        self.grace.start();
        self.state = IntegrityState::Warned;
        IntegrityEvent::Warning {
            grace_secs: self.policy.grace_period_secs(),
        }
    }

    /// Advance the grace timer by one second.
    pub fn tick(&mut self) -> IntegrityEvent {
        if !self.armed || self.state != IntegrityState::Warned {
            return IntegrityEvent::Ignored;
        }
        match self.grace.tick() {
            Tick::Ignored => IntegrityEvent::Ignored,
            Tick::Running { remaining } => IntegrityEvent::GraceTick {
                remaining_secs: remaining,
            },
            Tick::Elapsed => self.terminate(TerminationReason::GraceExpired),
        }
    }

    /// End the grace period now, for drivers that time it with their own
    /// one-shot timer started at the loss instead of calling `tick`.
    ///
    /// Ignored unless a warning is pending, so a timer that fires after
    /// recovery is harmless.
    pub fn expire_grace(&mut self) -> IntegrityEvent {
        if !self.armed || self.state != IntegrityState::Warned {
            return IntegrityEvent::Ignored;
        }
        self.terminate(TerminationReason::GraceExpired)
    }

    fn terminate(&mut self, reason: TerminationReason) -> IntegrityEvent {
        self.grace.cancel();
        self.state = IntegrityState::Terminated(reason);
        IntegrityEvent::Terminated(reason)
    }

    #[must_use]
    pub fn policy(&self) -> IntegrityPolicy {
        self.policy
    }

    #[must_use]
    pub fn state(&self) -> IntegrityState {
        self.state
    }

    #[must_use]
    pub fn is_terminated(&self) -> bool {
        matches!(self.state, IntegrityState::Terminated(_))
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Number of detected exits from exclusive mode.
    #[must_use]
    pub fn exits(&self) -> u32 {
        self.exits
    }

    #[must_use]
    pub fn last_exit_at(&self) -> Option<DateTime<Utc>> {
        self.last_exit_at
    }

    /// Seconds left before the grace period terminates the session.
    #[must_use]
    pub fn grace_remaining_secs(&self) -> Option<u32> {
        self.grace.is_running().then(|| self.grace.remaining_secs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn armed() -> IntegrityMonitor {
        let mut monitor = IntegrityMonitor::new(IntegrityPolicy::default());
        monitor.arm();
        monitor
    }

    #[test]
    fn first_exit_warns_and_starts_grace() {
        let mut monitor = armed();
        let event = monitor.on_display_change(false, fixed_now());
        assert_eq!(event, IntegrityEvent::Warning { grace_secs: 30 });
        assert_eq!(monitor.state(), IntegrityState::Warned);
        assert_eq!(monitor.grace_remaining_secs(), Some(30));
        assert_eq!(monitor.last_exit_at(), Some(fixed_now()));
    }

    #[test]
    fn recovery_cancels_grace_immediately_and_keeps_count() {
        let mut monitor = armed();
        monitor.on_display_change(false, fixed_now());
        for _ in 0..10 {
            monitor.tick();
        }
        assert_eq!(monitor.on_display_change(true, fixed_now()), IntegrityEvent::Recovered);
        assert_eq!(monitor.state(), IntegrityState::Compliant);
        assert_eq!(monitor.grace_remaining_secs(), None);
        assert_eq!(monitor.exits(), 1);

        // The cancelled grace timer must not fire later.
        for _ in 0..60 {
            assert_eq!(monitor.tick(), IntegrityEvent::Ignored);
        }
        assert_eq!(monitor.state(), IntegrityState::Compliant);
    }

    #[test]
    fn second_exit_terminates_regardless_of_timing() {
        let mut monitor = armed();
        monitor.on_display_change(false, fixed_now());
        monitor.on_display_change(true, fixed_now());
        let event = monitor.on_display_change(false, fixed_now());
        assert_eq!(event, IntegrityEvent::Terminated(TerminationReason::RepeatedExit));
        assert!(monitor.is_terminated());
    }

    #[test]
    fn grace_expiry_terminates_on_the_thirtieth_tick() {
        let mut monitor = armed();
        monitor.on_display_change(false, fixed_now());
        for expected in (1..30).rev() {
            assert_eq!(
                monitor.tick(),
                IntegrityEvent::GraceTick {
                    remaining_secs: expected
                }
            );
        }
        assert_eq!(
            monitor.tick(),
            IntegrityEvent::Terminated(TerminationReason::GraceExpired)
        );
    }

    #[test]
    fn external_grace_expiry_only_acts_while_warned() {
        let mut monitor = armed();
        assert_eq!(monitor.expire_grace(), IntegrityEvent::Ignored);

        monitor.on_display_change(false, fixed_now());
        monitor.on_display_change(true, fixed_now());
        assert_eq!(monitor.expire_grace(), IntegrityEvent::Ignored);
        assert_eq!(monitor.state(), IntegrityState::Compliant);

        monitor.on_display_change(false, fixed_now());
        assert!(monitor.is_terminated());
        assert_eq!(monitor.expire_grace(), IntegrityEvent::Ignored);

        let mut monitor = armed();
        monitor.on_display_change(false, fixed_now());
        assert_eq!(
            monitor.expire_grace(),
            IntegrityEvent::Terminated(TerminationReason::GraceExpired)
        );
        assert_eq!(monitor.grace_remaining_secs(), None);
    }

    #[test]
    fn terminated_is_absorbing() {
        let mut monitor = armed();
        monitor.on_display_change(false, fixed_now());
        monitor.on_display_change(true, fixed_now());
        monitor.on_display_change(false, fixed_now());
        assert_eq!(monitor.on_display_change(true, fixed_now()), IntegrityEvent::Ignored);
        assert_eq!(monitor.on_display_change(false, fixed_now()), IntegrityEvent::Ignored);
        assert_eq!(monitor.tick(), IntegrityEvent::Ignored);
        assert_eq!(
            monitor.state(),
            IntegrityState::Terminated(TerminationReason::RepeatedExit)
        );
    }

    #[test]
    fn duplicate_signal_values_are_not_violations() {
        let mut monitor = armed();
        assert_eq!(monitor.on_display_change(true, fixed_now()), IntegrityEvent::Ignored);
        monitor.on_display_change(false, fixed_now());
        assert_eq!(monitor.on_display_change(false, fixed_now()), IntegrityEvent::Ignored);
        assert_eq!(monitor.exits(), 1);
        assert_eq!(monitor.state(), IntegrityState::Warned);
    }

    #[test]
    fn unarmed_monitor_ignores_signal() {
        let mut monitor = IntegrityMonitor::new(IntegrityPolicy::default());
        assert_eq!(monitor.on_display_change(false, fixed_now()), IntegrityEvent::Ignored);
        assert_eq!(monitor.exits(), 0);
    }

    #[test]
    fn disarm_stops_pending_grace_timer() {
        let mut monitor = armed();
        monitor.on_display_change(false, fixed_now());
        monitor.disarm();
        monitor.disarm();
        for _ in 0..40 {
            assert_eq!(monitor.tick(), IntegrityEvent::Ignored);
        }
        assert!(!monitor.is_terminated());
    }

    #[test]
    fn single_exit_policy_terminates_immediately() {
        let mut monitor = IntegrityMonitor::new(IntegrityPolicy::new(30, 1).unwrap());
        monitor.arm();
        assert_eq!(
            monitor.on_display_change(false, fixed_now()),
            IntegrityEvent::Terminated(TerminationReason::RepeatedExit)
        );
    }

    #[test]
    fn policy_rejects_zero_values() {
        assert_eq!(
            IntegrityPolicy::new(0, 2),
            Err(IntegrityPolicyError::InvalidGracePeriod)
        );
        assert_eq!(
            IntegrityPolicy::new(30, 0),
            Err(IntegrityPolicyError::InvalidMaxExits)
        );
    }
}
