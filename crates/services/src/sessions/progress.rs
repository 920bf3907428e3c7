use chrono::{DateTime, Utc};

use assess_core::model::{ActivityId, ActivityKind, OptionId, SessionId, Unit, UnitId};

use super::controller::{Completion, SessionNotice, SessionPhase};
use crate::error::SessionError;

/// Aggregated view of ledger progress, useful for UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub remaining: usize,
    pub is_complete: bool,
}

impl SessionProgress {
    #[must_use]
    pub fn new(total: usize, answered: usize, is_complete: bool) -> Self {
        let answered = answered.min(total);
        Self {
            total,
            answered,
            remaining: total - answered,
            is_complete,
        }
    }

    /// Share of units done, in `0.0..=1.0`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            return 0.0;
        }
        self.answered as f32 / self.total as f32
    }
}

/// Read-only picture of a session for the hosting shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub activity_id: ActivityId,
    pub phase: SessionPhase,
    pub kind: Option<ActivityKind>,
    pub title: Option<String>,
    pub unit_index: usize,
    pub unit_count: usize,
    pub current_unit: Option<Unit>,
    /// Answer already recorded for the current question, if any.
    pub selected_option: Option<OptionId>,
    /// Current arrangement of puzzle steps.
    pub order: Option<Vec<UnitId>>,
    /// `None` when the activity is not time-boxed.
    pub remaining_secs: Option<u32>,
    pub timer_armed: bool,
    pub progress: SessionProgress,
    pub submit_attempts: u32,
    pub notice: Option<SessionNotice>,
    /// Fatal load error, set in `Failed`.
    pub failure: Option<SessionError>,
    /// Most recent refused action; cleared by the next accepted one.
    pub rejection: Option<SessionError>,
    pub completion: Option<Completion>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Wall time spent, frozen once the session completes.
    pub elapsed_secs: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fraction_of_answered_units() {
        let progress = SessionProgress::new(4, 1, false);
        assert_eq!(progress.remaining, 3);
        assert!((progress.fraction() - 0.25).abs() < f32::EPSILON);
    }

    #[test]
    fn empty_progress_is_zero() {
        let progress = SessionProgress::default();
        assert!(progress.fraction().abs() < f32::EPSILON);
    }

    #[test]
    fn answered_is_capped_at_total() {
        let progress = SessionProgress::new(2, 5, true);
        assert_eq!(progress.answered, 2);
        assert_eq!(progress.remaining, 0);
    }
}
