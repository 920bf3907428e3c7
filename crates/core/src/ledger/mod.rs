//! Authoritative record of a learner's responses.

mod answers;
mod order;

use serde::Serialize;
use thiserror::Error;

use crate::model::{ActivityDefinition, ActivityKind, OptionId, UnitBody, UnitId};

pub use answers::{AnswerLedger, Recorded};
pub use order::OrderLedger;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LedgerError {
    #[error("unknown question: {0}")]
    UnknownQuestion(UnitId),

    #[error("option {option} is not offered by question {question}")]
    UnknownOption { question: UnitId, option: OptionId },

    #[error("step {0} appears more than once")]
    DuplicateStep(UnitId),
}

/// Responses for one activity, shaped by its kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Ledger {
    /// Lessons record no responses.
    Lesson,
    Answers(AnswerLedger),
    Order(OrderLedger),
}

impl Ledger {
    /// Builds an empty ledger for the definition's kind.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::DuplicateStep` if a puzzle repeats a step id.
    pub fn for_definition(definition: &ActivityDefinition) -> Result<Self, LedgerError> {
        match definition.kind() {
            ActivityKind::Lesson => Ok(Self::Lesson),
            ActivityKind::Quiz => Ok(Self::Answers(AnswerLedger::from_questions(
                definition.units().iter().filter_map(|unit| match unit.body() {
                    UnitBody::Question(q) => Some((
                        unit.id().clone(),
                        q.options.iter().map(|o| o.id.clone()).collect(),
                    )),
                    _ => None,
                }),
            ))),
            ActivityKind::Puzzle => {
                OrderLedger::new(definition.units().iter().map(|u| u.id().clone()).collect())
                    .map(Self::Order)
            }
        }
    }

    /// Whether every response needed for submission has been recorded.
    ///
    /// An order ledger is complete by construction.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        match self {
            Ledger::Lesson => true,
            Ledger::Answers(answers) => answers.is_complete(),
            Ledger::Order(_) => true,
        }
    }

    #[must_use]
    pub fn answered(&self) -> usize {
        match self {
            Ledger::Lesson => 0,
            Ledger::Answers(answers) => answers.answered_count(),
            Ledger::Order(order) => order.len(),
        }
    }

    #[must_use]
    pub fn as_answers(&self) -> Option<&AnswerLedger> {
        match self {
            Ledger::Answers(answers) => Some(answers),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_order(&self) -> Option<&OrderLedger> {
        match self {
            Ledger::Order(order) => Some(order),
            _ => None,
        }
    }
}
