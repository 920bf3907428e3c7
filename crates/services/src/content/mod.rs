//! Content Loader: fetches activity payloads and normalizes them into an
//! [`ActivityDefinition`](assess_core::model::ActivityDefinition).

mod normalize;
mod payload;
mod source;

pub use normalize::{decode_activity, DEFAULT_SLIDE_COUNT};
pub use payload::ContentFormat;
pub use source::{ContentSource, HttpContentSource};
