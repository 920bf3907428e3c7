use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

use crate::model::ids::{ActivityId, UnitId};
use crate::model::unit::{Unit, UnitBody};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ActivityError {
    #[error("activity has no units")]
    NoUnits,

    #[error("duplicate unit id: {0}")]
    DuplicateUnitId(UnitId),

    #[error("unit {unit} does not belong in a {kind} activity")]
    UnitKindMismatch { unit: UnitId, kind: ActivityKind },

    #[error("question {0} has no options")]
    NoOptions(UnitId),

    #[error("question {0} repeats an option id")]
    DuplicateOptionId(UnitId),

    #[error("slide {0} has no points")]
    EmptySlide(UnitId),
}

//
// ─── KIND ──────────────────────────────────────────────────────────────────────
//

/// The three supported activity shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    /// Paced multi-slide lesson. Time-boxed, completed locally.
    Lesson,
    /// Single-answer quiz, scored remotely.
    Quiz,
    /// Step-reordering puzzle, scored remotely.
    Puzzle,
}

impl ActivityKind {
    /// Whether the activity is scored by the remote authority.
    #[must_use]
    pub fn is_scored(self) -> bool {
        !matches!(self, ActivityKind::Lesson)
    }

    fn accepts(self, body: &UnitBody) -> bool {
        matches!(
            (self, body),
            (ActivityKind::Lesson, UnitBody::Slide(_))
                | (ActivityKind::Quiz, UnitBody::Question(_))
                | (ActivityKind::Puzzle, UnitBody::Step(_))
        )
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActivityKind::Lesson => "lesson",
            ActivityKind::Quiz => "quiz",
            ActivityKind::Puzzle => "puzzle",
        };
        f.write_str(name)
    }
}

//
// ─── SCORING ───────────────────────────────────────────────────────────────────
//

/// Scoring parameters shipped with the activity. Informational only: pass/fail
/// is always decided by the scoring authority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringParams {
    pub pass_threshold: Option<u32>,
}

//
// ─── DEFINITION ────────────────────────────────────────────────────────────────
//

/// An activity as loaded from the content service.
///
/// Immutable once built; a reload replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityDefinition {
    id: ActivityId,
    title: String,
    kind: ActivityKind,
    units: Vec<Unit>,
    scoring: ScoringParams,
    duration_secs: Option<u32>,
}

impl ActivityDefinition {
    /// Builds a validated definition.
    ///
    /// # Errors
    ///
    /// Returns `ActivityError` if there are no units, unit ids repeat, a unit does not
    /// match the activity kind, or a question/slide is empty.
    pub fn new(
        id: ActivityId,
        title: impl Into<String>,
        kind: ActivityKind,
        units: Vec<Unit>,
        scoring: ScoringParams,
        duration_secs: Option<u32>,
    ) -> Result<Self, ActivityError> {
        if units.is_empty() {
            return Err(ActivityError::NoUnits);
        }

        let mut seen = HashSet::with_capacity(units.len());
        for unit in &units {
            if !seen.insert(unit.id()) {
                return Err(ActivityError::DuplicateUnitId(unit.id().clone()));
            }
            if !kind.accepts(unit.body()) {
                return Err(ActivityError::UnitKindMismatch {
                    unit: unit.id().clone(),
                    kind,
                });
            }
            match unit.body() {
                UnitBody::Question(q) => {
                    if q.options.is_empty() {
                        return Err(ActivityError::NoOptions(unit.id().clone()));
                    }
                    let distinct: HashSet<_> = q.options.iter().map(|o| &o.id).collect();
                    if distinct.len() != q.options.len() {
                        return Err(ActivityError::DuplicateOptionId(unit.id().clone()));
                    }
                }
                UnitBody::Slide(s) if s.points.is_empty() => {
                    return Err(ActivityError::EmptySlide(unit.id().clone()));
                }
                _ => {}
            }
        }

        Ok(Self {
            id,
            title: title.into(),
            kind,
            units,
            scoring,
            // A zero duration means "not time-boxed".
            duration_secs: duration_secs.filter(|secs| *secs > 0),
        })
    }

    #[must_use]
    pub fn id(&self) -> &ActivityId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn kind(&self) -> ActivityKind {
        self.kind
    }

    #[must_use]
    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    #[must_use]
    pub fn unit(&self, index: usize) -> Option<&Unit> {
        self.units.get(index)
    }

    #[must_use]
    pub fn unit_by_id(&self, id: &UnitId) -> Option<&Unit> {
        self.units.iter().find(|u| u.id() == id)
    }

    #[must_use]
    pub fn scoring(&self) -> ScoringParams {
        self.scoring
    }

    #[must_use]
    pub fn duration_secs(&self) -> Option<u32> {
        self.duration_secs
    }

    /// Pacing applies to lessons only; quizzes and puzzles are not time-boxed.
    #[must_use]
    pub fn pacing_secs(&self) -> Option<u32> {
        match self.kind {
            ActivityKind::Lesson => self.duration_secs,
            ActivityKind::Quiz | ActivityKind::Puzzle => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnswerOption, OptionId};

    fn option(id: &str) -> AnswerOption {
        AnswerOption {
            id: OptionId::new(id),
            text: id.to_uppercase(),
        }
    }

    #[test]
    fn rejects_empty_unit_list() {
        let err = ActivityDefinition::new(
            ActivityId::new("a"),
            "Empty",
            ActivityKind::Lesson,
            Vec::new(),
            ScoringParams::default(),
            None,
        )
        .unwrap_err();
        assert_eq!(err, ActivityError::NoUnits);
    }

    #[test]
    fn rejects_duplicate_unit_ids() {
        let units = vec![
            Unit::step(UnitId::new("s1"), "one"),
            Unit::step(UnitId::new("s1"), "again"),
        ];
        let err = ActivityDefinition::new(
            ActivityId::new("p"),
            "Puzzle",
            ActivityKind::Puzzle,
            units,
            ScoringParams::default(),
            None,
        )
        .unwrap_err();
        assert_eq!(err, ActivityError::DuplicateUnitId(UnitId::new("s1")));
    }

    #[test]
    fn rejects_units_of_the_wrong_kind() {
        let units = vec![Unit::step(UnitId::new("s1"), "one")];
        let err = ActivityDefinition::new(
            ActivityId::new("q"),
            "Quiz",
            ActivityKind::Quiz,
            units,
            ScoringParams::default(),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ActivityError::UnitKindMismatch { .. }));
    }

    #[test]
    fn rejects_question_with_repeated_options() {
        let units = vec![Unit::question(
            UnitId::new("q1"),
            "Pick",
            vec![option("a"), option("a")],
        )];
        let err = ActivityDefinition::new(
            ActivityId::new("q"),
            "Quiz",
            ActivityKind::Quiz,
            units,
            ScoringParams::default(),
            None,
        )
        .unwrap_err();
        assert_eq!(err, ActivityError::DuplicateOptionId(UnitId::new("q1")));
    }

    #[test]
    fn pacing_only_applies_to_lessons() {
        let quiz = ActivityDefinition::new(
            ActivityId::new("q"),
            "Quiz",
            ActivityKind::Quiz,
            vec![Unit::question(UnitId::new("q1"), "Pick", vec![option("a")])],
            ScoringParams {
                pass_threshold: Some(70),
            },
            Some(120),
        )
        .unwrap();
        assert_eq!(quiz.duration_secs(), Some(120));
        assert_eq!(quiz.pacing_secs(), None);

        let lesson = ActivityDefinition::new(
            ActivityId::new("l"),
            "Lesson",
            ActivityKind::Lesson,
            vec![Unit::slide(UnitId::new("slide-1"), None, vec!["p".into()])],
            ScoringParams::default(),
            Some(0),
        )
        .unwrap();
        assert_eq!(lesson.pacing_secs(), None);
    }
}
