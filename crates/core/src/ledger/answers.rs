use serde::Serialize;
use std::collections::BTreeMap;

use super::LedgerError;
use crate::model::{OptionId, UnitId};

/// Result of offering an answer to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recorded {
    Accepted,
    /// The question already had an answer; the first one stands.
    AlreadyAnswered,
}

/// Question → selected option map for a quiz.
///
/// First answer wins: once a question is answered its entry never changes.
/// Completeness is derived from the recorded answers alone, never from the
/// learner's position in the quiz.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerLedger {
    #[serde(skip)]
    offered: BTreeMap<UnitId, Vec<OptionId>>,
    answers: BTreeMap<UnitId, OptionId>,
}

impl AnswerLedger {
    /// Creates an empty ledger for the given questions and their offered options.
    pub fn from_questions(questions: impl IntoIterator<Item = (UnitId, Vec<OptionId>)>) -> Self {
        Self {
            offered: questions.into_iter().collect(),
            answers: BTreeMap::new(),
        }
    }

    /// Records `option` for `question` unless the question is already answered.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::UnknownQuestion` or `LedgerError::UnknownOption` when the
    /// pair does not exist in the activity.
    pub fn record(&mut self, question: &UnitId, option: &OptionId) -> Result<Recorded, LedgerError> {
        let offered = self
            .offered
            .get(question)
            .ok_or_else(|| LedgerError::UnknownQuestion(question.clone()))?;
        if !offered.contains(option) {
            return Err(LedgerError::UnknownOption {
                question: question.clone(),
                option: option.clone(),
            });
        }
        if self.answers.contains_key(question) {
            return Ok(Recorded::AlreadyAnswered);
        }
        self.answers.insert(question.clone(), option.clone());
        Ok(Recorded::Accepted)
    }

    #[must_use]
    pub fn answer_for(&self, question: &UnitId) -> Option<&OptionId> {
        self.answers.get(question)
    }

    #[must_use]
    pub fn answers(&self) -> &BTreeMap<UnitId, OptionId> {
        &self.answers
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.offered.len()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.offered.keys().all(|q| self.answers.contains_key(q))
    }
}
