//! Task-management domain model.
//!
//! # Responsibility
//! - Define the records held by the store and exchanged with storage.
//!
//! # Invariants
//! - Tasks reference lists and tags by name, never by identifier.
//! - Due dates are local calendar days in `YYYY-MM-DD` form.

pub mod due_date;
pub mod state;
pub mod task;
