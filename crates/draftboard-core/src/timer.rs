// Pick clock: countdown, pause toggle, and the forfeit threshold.

use serde::{Deserialize, Serialize};

/// Result of advancing the clock by one scheduler tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerTick {
    /// Seconds left after the tick. Negative once the nominal time is used up.
    pub remaining: i64,
    /// The grace period is exhausted; the team on the clock should forfeit.
    pub forfeit_now: bool,
}

/// Pure clock transition.
///
/// A paused clock does not move. A running clock counts down by
/// `delta_secs` and stops at `-grace_secs`; `forfeit_now` is raised whenever
/// the clock sits at that floor and is not paused.
pub fn advance_timer(remaining: i64, delta_secs: i64, paused: bool, grace_secs: i64) -> TimerTick {
    let floor = -grace_secs.max(0);
    if paused {
        return TimerTick {
            remaining,
            forfeit_now: false,
        };
    }
    let remaining = remaining.saturating_sub(delta_secs.max(0)).max(floor);
    TimerTick {
        remaining,
        forfeit_now: remaining <= floor,
    }
}

/// Per-pick countdown clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickTimer {
    remaining: i64,
    nominal_secs: i64,
    grace_secs: i64,
    paused: bool,
}

impl PickTimer {
    /// A running clock set to the nominal duration.
    pub fn new(nominal_secs: i64, grace_secs: i64) -> Self {
        PickTimer {
            remaining: nominal_secs,
            nominal_secs,
            grace_secs: grace_secs.max(0),
            paused: false,
        }
    }

    pub fn remaining(&self) -> i64 {
        self.remaining
    }

    pub fn nominal_secs(&self) -> i64 {
        self.nominal_secs
    }

    pub fn grace_secs(&self) -> i64 {
        self.grace_secs
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Time is up but the grace period is still running.
    pub fn is_overtime(&self) -> bool {
        self.remaining < 0
    }

    /// Advance the clock and return what happened.
    pub fn advance(&mut self, delta_secs: i64) -> TimerTick {
        let tick = advance_timer(self.remaining, delta_secs, self.paused, self.grace_secs);
        self.remaining = tick.remaining;
        tick
    }

    /// Back to the nominal duration, running.
    pub fn reset(&mut self) {
        self.remaining = self.nominal_secs;
        self.paused = false;
    }

    /// Flip between running and paused. The remaining time is kept.
    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        self.paused
    }

    /// Stop at zero for good (draft over).
    pub fn freeze(&mut self) {
        self.remaining = 0;
        self.paused = true;
    }
}
