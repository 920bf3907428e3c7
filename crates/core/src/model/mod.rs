mod activity;
mod ids;
mod result;
mod unit;

pub use activity::{ActivityDefinition, ActivityError, ActivityKind, ScoringParams};
pub use ids::{ActivityId, AttemptId, OptionId, ParseIdError, SessionId, UnitId};
pub use result::{SubmissionResult, UnitVerdict};
pub use unit::{AnswerOption, Question, Slide, Step, Unit, UnitBody};
