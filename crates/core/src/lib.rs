#![forbid(unsafe_code)]

pub mod cursor;
pub mod ledger;
pub mod model;
pub mod pacing;
pub mod time;

pub use cursor::NavigationCursor;
pub use ledger::{AnswerLedger, Ledger, LedgerError, OrderLedger, Recorded};
pub use pacing::{PacingTimer, Tick};
pub use time::Clock;
