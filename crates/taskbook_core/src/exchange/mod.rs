//! Whole-store import/export.

pub mod snapshot;
