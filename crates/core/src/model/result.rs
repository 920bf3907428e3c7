use serde::{Deserialize, Serialize};

use crate::model::ids::{AttemptId, UnitId};

/// Per-unit correctness as reported by the scoring authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitVerdict {
    pub unit_id: UnitId,
    pub correct: bool,
}

/// Outcome of a scored attempt. Read-only: produced by the remote scorer and
/// never recomputed on the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionResult {
    attempt_id: AttemptId,
    #[serde(default)]
    score: Option<u32>,
    #[serde(default)]
    max_score: Option<u32>,
    passed: bool,
    #[serde(default)]
    units: Vec<UnitVerdict>,
}

impl SubmissionResult {
    #[must_use]
    pub fn new(
        attempt_id: AttemptId,
        score: Option<u32>,
        max_score: Option<u32>,
        passed: bool,
        units: Vec<UnitVerdict>,
    ) -> Self {
        Self {
            attempt_id,
            score,
            max_score,
            passed,
            units,
        }
    }

    #[must_use]
    pub fn attempt_id(&self) -> &AttemptId {
        &self.attempt_id
    }

    #[must_use]
    pub fn score(&self) -> Option<u32> {
        self.score
    }

    #[must_use]
    pub fn max_score(&self) -> Option<u32> {
        self.max_score
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.passed
    }

    #[must_use]
    pub fn units(&self) -> &[UnitVerdict] {
        &self.units
    }
}
