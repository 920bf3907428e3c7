//! Countdown bound to an activity's allotted duration.
//!
//! The timer has no thread of its own: whoever owns it calls [`PacingTimer::tick`]
//! once per wall-clock second. Ticks are ignored unless the timer is armed, and
//! remaining time never drops below zero.

/// Outcome of a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Timer not armed; nothing changed.
    Ignored,
    /// One second elapsed; time remains.
    Running { remaining_secs: u32 },
    /// This tick consumed the last second. The timer is now disarmed.
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PacingTimer {
    duration_secs: u32,
    elapsed_secs: u32,
    armed: bool,
}

impl PacingTimer {
    /// A disarmed timer for `duration_secs` whole seconds.
    #[must_use]
    pub fn new(duration_secs: u32) -> Self {
        Self {
            duration_secs,
            elapsed_secs: 0,
            armed: false,
        }
    }

    #[must_use]
    pub fn duration_secs(&self) -> u32 {
        self.duration_secs
    }

    #[must_use]
    pub fn elapsed_secs(&self) -> u32 {
        self.elapsed_secs
    }

    #[must_use]
    pub fn remaining_secs(&self) -> u32 {
        self.duration_secs.saturating_sub(self.elapsed_secs)
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.remaining_secs() == 0
    }

    /// Starts counting down. Returns `false` if there is no time left to count.
    pub fn arm(&mut self) -> bool {
        self.armed = !self.is_expired();
        self.armed
    }

    pub fn disarm(&mut self) {
        self.armed = false;
    }

    pub fn tick(&mut self) -> Tick {
        if !self.armed {
            return Tick::Ignored;
        }
        self.elapsed_secs = self.elapsed_secs.saturating_add(1).min(self.duration_secs);
        if self.is_expired() {
            self.armed = false;
            return Tick::Expired;
        }
        Tick::Running {
            remaining_secs: self.remaining_secs(),
        }
    }

    /// Rebinds the timer to a new duration.
    ///
    /// Seconds already elapsed are carried over exactly once, so the remaining
    /// time becomes `new_duration - elapsed` (floored at zero). The armed state
    /// is kept unless no time remains.
    pub fn reset(&mut self, duration_secs: u32) {
        self.duration_secs = duration_secs;
        self.elapsed_secs = self.elapsed_secs.min(duration_secs);
        if self.is_expired() {
            self.armed = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn does_not_tick_until_armed() {
        let mut timer = PacingTimer::new(10);
        assert_eq!(timer.tick(), Tick::Ignored);
        assert_eq!(timer.remaining_secs(), 10);
    }

    #[test]
    fn lesson_timer_stops_at_zero() {
        let mut timer = PacingTimer::new(300);
        assert!(timer.arm());
        for _ in 0..301 {
            timer.tick();
        }
        assert_eq!(timer.remaining_secs(), 0);
        assert!(!timer.is_armed());
        assert_eq!(timer.tick(), Tick::Ignored);
    }

    #[test]
    fn last_second_reports_expiry_once() {
        let mut timer = PacingTimer::new(2);
        timer.arm();
        assert_eq!(timer.tick(), Tick::Running { remaining_secs: 1 });
        assert_eq!(timer.tick(), Tick::Expired);
        assert_eq!(timer.tick(), Tick::Ignored);
    }

    #[test]
    fn zero_duration_cannot_be_armed() {
        let mut timer = PacingTimer::new(0);
        assert!(!timer.arm());
        assert_eq!(timer.tick(), Tick::Ignored);
    }

    #[test]
    fn reset_carries_elapsed_time_once() {
        let mut timer = PacingTimer::new(300);
        timer.arm();
        for _ in 0..100 {
            timer.tick();
        }
        timer.reset(600);
        assert_eq!(timer.remaining_secs(), 500);
        assert!(timer.is_armed());

        timer.reset(50);
        assert_eq!(timer.remaining_secs(), 0);
        assert!(!timer.is_armed());
    }

    #[test]
    fn disarm_freezes_remaining_time() {
        let mut timer = PacingTimer::new(5);
        timer.arm();
        timer.tick();
        timer.disarm();
        assert_eq!(timer.tick(), Tick::Ignored);
        assert_eq!(timer.remaining_secs(), 4);
    }
}
