//! Submission Coordinator: serializes the ledger and performs the single
//! scoring round-trip.

mod client;
mod coordinator;
mod payload;

pub use client::{HttpScoringClient, ScoringClient};
pub use coordinator::SubmissionCoordinator;
pub use payload::SubmissionPayload;
