use serde::Serialize;
use std::collections::BTreeMap;

use assess_core::model::{OptionId, UnitId};
use assess_core::Ledger;

use crate::error::Rejection;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
enum Body {
    Answers { answers: BTreeMap<UnitId, OptionId> },
    Order { order: Vec<UnitId> },
}

/// Wire body of a scoring request.
///
/// Only buildable from a ledger, so it is always complete: every question
/// answered for a quiz, the full permutation for a puzzle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SubmissionPayload {
    body: Body,
}

impl SubmissionPayload {
    /// # Errors
    ///
    /// Returns `Rejection::Incomplete` for a quiz with unanswered questions and
    /// `Rejection::WrongActivityKind` for lessons, which are never submitted.
    pub fn from_ledger(ledger: &Ledger) -> Result<Self, Rejection> {
        let body = match ledger {
            Ledger::Lesson => return Err(Rejection::WrongActivityKind),
            Ledger::Answers(answers) => {
                if !answers.is_complete() {
                    return Err(Rejection::Incomplete {
                        answered: answers.answered_count(),
                        total: answers.total(),
                    });
                }
                Body::Answers {
                    answers: answers.answers().clone(),
                }
            }
            Ledger::Order(order) => Body::Order {
                order: order.order().to_vec(),
            },
        };
        Ok(Self { body })
    }

    #[must_use]
    pub fn answers(&self) -> Option<&BTreeMap<UnitId, OptionId>> {
        match &self.body {
            Body::Answers { answers } => Some(answers),
            Body::Order { .. } => None,
        }
    }

    #[must_use]
    pub fn order(&self) -> Option<&[UnitId]> {
        match &self.body {
            Body::Order { order } => Some(order),
            Body::Answers { .. } => None,
        }
    }
}
