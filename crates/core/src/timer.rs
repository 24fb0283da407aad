//! Owned countdown driven by discrete one-second ticks.
//!
//! The countdown never reads a clock. Whoever owns it feeds `tick()` once per
//! elapsed second; this keeps expiry deterministic and testable.

/// Lifecycle of a [`Countdown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Idle,
    Running,
    Elapsed,
    Cancelled,
}

/// Result of feeding one tick into a [`Countdown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// The countdown is not running; nothing changed.
    Ignored,
    /// One second consumed; `remaining` seconds left.
    Running { remaining: u32 },
    /// This tick reached zero. Reported exactly once.
    Elapsed,
}

/// Single-owner countdown with idempotent cancellation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Countdown {
    total_secs: u32,
    remaining_secs: u32,
    state: TimerState,
}

impl Countdown {
    #[must_use]
    pub fn new(total_secs: u32) -> Self {
        Self {
            total_secs,
            remaining_secs: total_secs,
            state: TimerState::Idle,
        }
    }

    /// Start counting. Only an idle countdown can start; returns whether it did.
    pub fn start(&mut self) -> bool {
        if self.state != TimerState::Idle {
            return false;
        }
        self.state = TimerState::Running;
        true
    }

    /// Consume one second.
    pub fn tick(&mut self) -> Tick {
        if self.state != TimerState::Running {
            return Tick::Ignored;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            self.state = TimerState::Elapsed;
            return Tick::Elapsed;
        }
        Tick::Running {
            remaining: self.remaining_secs,
        }
    }

    /// Stop the countdown. Safe to call any number of times; returns `true` only
    /// for the call that actually stopped a running countdown.
    pub fn cancel(&mut self) -> bool {
        match self.state {
            TimerState::Running | TimerState::Idle => {
                let was_running = self.state == TimerState::Running;
                self.state = TimerState::Cancelled;
                was_running
            }
            TimerState::Elapsed | TimerState::Cancelled => false,
        }
    }

    #[must_use]
    pub fn total_secs(&self) -> u32 {
        self.total_secs
    }

    #[must_use]
    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    #[must_use]
    pub fn state(&self) -> TimerState {
        self.state
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    /// Remaining time as `MM:SS`.
    #[must_use]
    pub fn display(&self) -> String {
        format_mm_ss(self.remaining_secs)
    }
}

/// Formats seconds as `MM:SS`. Minutes are not wrapped at 60.
#[must_use]
pub fn format_mm_ss(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_down_and_elapses_once() {
        let mut timer = Countdown::new(3);
        assert_eq!(timer.tick(), Tick::Ignored);
        assert!(timer.start());

        assert_eq!(timer.tick(), Tick::Running { remaining: 2 });
        assert_eq!(timer.tick(), Tick::Running { remaining: 1 });
        assert_eq!(timer.tick(), Tick::Elapsed);
        assert_eq!(timer.tick(), Tick::Ignored);
        assert_eq!(timer.tick(), Tick::Ignored);
        assert_eq!(timer.remaining_secs(), 0);
        assert_eq!(timer.state(), TimerState::Elapsed);
    }

    #[test]
    fn cancel_is_idempotent_and_blocks_late_ticks() {
        let mut timer = Countdown::new(10);
        timer.start();
        timer.tick();
        assert!(timer.cancel());
        assert!(!timer.cancel());
        assert_eq!(timer.tick(), Tick::Ignored);
        assert_eq!(timer.remaining_secs(), 9);
        assert!(!timer.start());
    }

    #[test]
    fn formats_minutes_past_an_hour() {
        assert_eq!(format_mm_ss(0), "00:00");
        assert_eq!(format_mm_ss(65), "01:05");
        assert_eq!(format_mm_ss(90 * 60 + 7), "90:07");
        assert_eq!(Countdown::new(600).display(), "10:00");
    }
}
