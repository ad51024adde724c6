//! Read-only projections over task state.
//!
//! # Responsibility
//! - Derive visible task subsets and calendar markers from explicit view
//!   parameters.
//!
//! # Invariants
//! - Nothing here mutates store state.
//! - View parameters are passed in as values, never read from globals.

pub mod date_index;
pub mod projection;
