//! # Domain Models
//!
//! Per-request entities of the lead pipeline. Nothing here is persisted; every
//! value is created for one discovery request and dropped with its report.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`BusinessRecord`] | Candidate business with provenance |
//! | [`Budget`] | Call and cost limits supplied by the caller |
//! | [`BudgetState`] | Snapshot of calls and cost spent so far |
//! | [`UtcDateTime`] | UTC timestamp used in report metadata |

mod budget;
mod record;
mod timestamp;

pub use budget::{Budget, BudgetState};
pub use record::{BusinessRecord, ContactField};
pub use timestamp::UtcDateTime;
