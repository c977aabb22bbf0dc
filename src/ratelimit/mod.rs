//! Outbound rate limiting subsystem.
//!
//! # Data Flow
//! ```text
//! submit()
//!     → admission.rs (FIFO queue → concurrency slot → spacing)
//!     → budget.rs (one unit per admitted call, refilled by one timer)
//!     → call executes holding its slot
//! ```

pub mod admission;
pub mod budget;

pub use admission::{Admission, AdmissionGate};
pub use budget::RateBudget;
