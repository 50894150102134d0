//! Per-round countdown and stopwatch
//!
//! The timer never sleeps. Each tick is an alarm handed to the caller's
//! scheduler and fed back through [`RoundTimer::receive_tick`]. Every
//! start bumps a generation counter, so ticks scheduled by an earlier
//! timer are recognised and dropped.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::timer::TICK_INTERVAL;

/// Lifecycle of the round timer
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerState {
    /// Never started
    #[default]
    Idle,
    /// Ticking
    Running,
    /// Countdown reached zero
    Expired,
    /// Stopped before expiring
    Stopped,
}

/// What the timer measures
#[serde_with::serde_as]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerMode {
    /// Counts down from a deadline
    Countdown(#[serde_as(as = "serde_with::DurationMilliSeconds<u64>")] Duration),
    /// Counts up without a deadline
    #[default]
    Stopwatch,
}

/// Alarm messages driving the timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlarmMessage {
    /// A tick belonging to the timer started as `generation`
    Tick {
        /// Generation of the timer that scheduled this tick
        generation: u64,
    },
}

/// Timer display updates sent to the presentation layer
#[serde_with::serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum UpdateMessage {
    /// Time left on the countdown, in seconds
    Countdown {
        /// Remaining time
        #[serde_as(as = "serde_with::DurationSecondsWithFrac<f64>")]
        remaining: Duration,
    },
    /// Time spent so far, in seconds
    Stopwatch {
        /// Elapsed time
        #[serde_as(as = "serde_with::DurationSecondsWithFrac<f64>")]
        elapsed: Duration,
    },
}

/// Result of feeding a tick to the timer
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// The tick belonged to a cancelled timer or arrived after it stopped
    Ignored,
    /// The timer advanced and scheduled its next tick
    Ticked(UpdateMessage),
    /// The countdown just reached zero; reported once per timer
    Expired(UpdateMessage),
}

/// A single round's timer
#[derive(Debug, Clone, Default)]
pub struct RoundTimer {
    mode: TimerMode,
    state: TimerState,
    /// Time accumulated by ticks
    elapsed: Duration,
    generation: u64,
}

impl RoundTimer {
    /// Starts the timer, cancelling whatever was running before
    ///
    /// A positive `duration` starts a countdown, anything else a
    /// stopwatch. The first tick is scheduled immediately.
    ///
    /// # Returns
    ///
    /// The initial display value
    pub fn start<S: FnMut(crate::AlarmMessage, Duration)>(
        &mut self,
        duration: Option<Duration>,
        mut schedule: S,
    ) -> UpdateMessage {
        self.cancel();

        self.mode = match duration {
            Some(duration) if !duration.is_zero() => TimerMode::Countdown(duration),
            _ => TimerMode::Stopwatch,
        };
        self.elapsed = Duration::ZERO;
        self.state = TimerState::Running;

        log::debug!("timer {} started as {:?}", self.generation, self.mode);

        schedule(self.tick_alarm(), TICK_INTERVAL);
        self.view()
    }

    /// Invalidates the ticks of the current timer
    ///
    /// A running timer becomes [`TimerState::Stopped`]; any tick it had
    /// scheduled is ignored when it arrives.
    pub fn cancel(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        if self.state == TimerState::Running {
            self.state = TimerState::Stopped;
        }
    }

    /// Stops the timer and returns the elapsed time
    ///
    /// When the timer is not running this changes nothing and returns the
    /// last known elapsed value (zero for a timer that never ran).
    pub fn stop(&mut self) -> Duration {
        if self.state == TimerState::Running {
            self.cancel();
        }
        self.elapsed()
    }

    /// Advances the timer by one tick
    ///
    /// Ticks from an older generation or for a timer that is no longer
    /// running are ignored. A countdown reaching zero expires, reports
    /// [`TickOutcome::Expired`] and schedules nothing further.
    pub fn receive_tick<S: FnMut(crate::AlarmMessage, Duration)>(
        &mut self,
        generation: u64,
        mut schedule: S,
    ) -> TickOutcome {
        if generation != self.generation || self.state != TimerState::Running {
            return TickOutcome::Ignored;
        }

        self.elapsed = self.elapsed.saturating_add(TICK_INTERVAL);

        if let TimerMode::Countdown(duration) = self.mode {
            if self.elapsed >= duration {
                self.elapsed = duration;
                self.state = TimerState::Expired;
                log::debug!("timer {} expired", self.generation);
                return TickOutcome::Expired(self.view());
            }
        }

        schedule(self.tick_alarm(), TICK_INTERVAL);
        TickOutcome::Ticked(self.view())
    }

    fn tick_alarm(&self) -> crate::AlarmMessage {
        AlarmMessage::Tick {
            generation: self.generation,
        }
        .into()
    }

    /// Returns the current display value
    pub fn view(&self) -> UpdateMessage {
        match self.mode {
            TimerMode::Countdown(_) => UpdateMessage::Countdown {
                remaining: self.remaining().unwrap_or_default(),
            },
            TimerMode::Stopwatch => UpdateMessage::Stopwatch {
                elapsed: self.elapsed,
            },
        }
    }

    /// Returns the time spent since the timer started
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Returns the time left on a countdown, `None` for a stopwatch
    pub fn remaining(&self) -> Option<Duration> {
        match self.mode {
            TimerMode::Countdown(duration) => Some(duration.saturating_sub(self.elapsed)),
            TimerMode::Stopwatch => None,
        }
    }

    /// Returns the lifecycle state
    pub fn state(&self) -> TimerState {
        self.state
    }

    /// Returns what the timer measures
    pub fn mode(&self) -> TimerMode {
        self.mode
    }

    /// Returns whether ticks are still being accepted
    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    /// Returns the generation of the current timer
    pub fn generation(&self) -> u64 {
        self.generation
    }
}
