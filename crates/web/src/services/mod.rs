//! Per-passport services.
//!
//! - [`rankings`] - live read model and ranking writes for one identity
//! - [`scanner`] - booth code scan state machine
//! - [`passport`] - the two bundled together as a session context

pub mod passport;
pub mod rankings;
pub mod scanner;

pub use passport::Passport;
pub use rankings::{RankingError, RankingStateManager, SyncState};
pub use scanner::{ScanHandler, ScanPhase, ScanStatus};
