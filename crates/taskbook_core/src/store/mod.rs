//! Authoritative in-memory task state.
//!
//! # Responsibility
//! - Own lists, tags and tasks and every mutation on them.
//! - Enforce list/draft invariants without touching storage.
//!
//! # Invariants
//! - Operations on unknown ids/names are silent no-ops, never errors.
//! - Only invariant violations are reported as `StoreError`.

pub mod task_store;

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Rejections raised by store mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A draft task already exists; only one may be in progress.
    DraftAlreadyExists { id: String },
    /// A task edit referenced a list that is not in the list collection.
    UnknownList(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DraftAlreadyExists { id } => {
                write!(f, "a draft task is already being created: {id}")
            }
            Self::UnknownList(name) => write!(f, "list does not exist: `{name}`"),
        }
    }
}

impl Error for StoreError {}

pub type StoreResult<T> = Result<T, StoreError>;
