use serde::{Deserialize, Serialize};

use crate::model::ids::{OptionId, UnitId};

/// One selectable answer of a quiz question.
///
/// Correctness is never part of the client model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub id: OptionId,
    pub text: String,
}

/// A lesson slide: optional heading followed by bullet points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slide {
    pub heading: Option<String>,
    pub points: Vec<String>,
}

/// A single-answer quiz question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub prompt: String,
    pub options: Vec<AnswerOption>,
}

impl Question {
    #[must_use]
    pub fn has_option(&self, option: &OptionId) -> bool {
        self.options.iter().any(|o| &o.id == option)
    }
}

/// An orderable puzzle step. The correct position is withheld until scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UnitBody {
    Slide(Slide),
    Question(Question),
    Step(Step),
}

/// The atomic navigable element within an activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    id: UnitId,
    body: UnitBody,
}

impl Unit {
    #[must_use]
    pub fn new(id: UnitId, body: UnitBody) -> Self {
        Self { id, body }
    }

    #[must_use]
    pub fn slide(id: UnitId, heading: Option<String>, points: Vec<String>) -> Self {
        Self::new(id, UnitBody::Slide(Slide { heading, points }))
    }

    #[must_use]
    pub fn question(id: UnitId, prompt: impl Into<String>, options: Vec<AnswerOption>) -> Self {
        Self::new(
            id,
            UnitBody::Question(Question {
                prompt: prompt.into(),
                options,
            }),
        )
    }

    #[must_use]
    pub fn step(id: UnitId, text: impl Into<String>) -> Self {
        Self::new(id, UnitBody::Step(Step { text: text.into() }))
    }

    #[must_use]
    pub fn id(&self) -> &UnitId {
        &self.id
    }

    #[must_use]
    pub fn body(&self) -> &UnitBody {
        &self.body
    }

    #[must_use]
    pub fn as_question(&self) -> Option<&Question> {
        match &self.body {
            UnitBody::Question(q) => Some(q),
            _ => None,
        }
    }
}
