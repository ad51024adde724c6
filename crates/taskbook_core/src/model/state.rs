//! Top-level collections owned by the store.
//!
//! # Responsibility
//! - Group lists, tags and tasks into the one unit that is locked, persisted
//!   and exchanged as a snapshot.
//! - Provide first-run seed data and load-time repair.
//!
//! # Invariants
//! - After `repair`, `lists` is non-empty and contains every `task.list`.
//! - After `repair`, list and tag names are unique within their collection
//!   and at most one task is a draft.
//! - Task ids are not deduplicated; id-addressed operations act on the
//!   first task carrying the id.

use crate::id::IdGenerator;
use crate::model::due_date::DueDate;
use crate::model::task::{Subtask, Task};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Default list name used when the list collection would otherwise be empty.
pub const DEFAULT_LIST_NAME: &str = "Personal";

const SEED_LISTS: [&str; 3] = ["Personal", "Work", "Shopping"];
const SEED_TAGS: [&str; 3] = ["Love", "Gift", "Priority"];

/// One of the three persisted collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Lists,
    Tags,
    Tasks,
}

impl Collection {
    pub const ALL: [Collection; 3] = [Self::Lists, Self::Tags, Self::Tasks];

    /// Field name in snapshots and suffix of the persistence key.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Lists => "lists",
            Self::Tags => "tags",
            Self::Tasks => "tasks",
        }
    }
}

/// Lists, tags and tasks as one value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreState {
    pub lists: Vec<String>,
    pub tags: Vec<String>,
    pub tasks: Vec<Task>,
}

impl StoreState {
    pub fn new(lists: Vec<String>, tags: Vec<String>, tasks: Vec<Task>) -> Self {
        Self { lists, tags, tasks }
    }

    /// Empty state holding only `default_list`.
    pub fn with_default_list(default_list: &str) -> Self {
        Self {
            lists: vec![default_list.to_string()],
            ..Self::default()
        }
    }

    /// First-run content: three lists, three tags and one example task due
    /// on `today`.
    pub fn seeded(ids: &dyn IdGenerator, today: DueDate) -> Self {
        let mut example = Task::new(ids.new_id(), "Plan a surprise Sunday breakfast", SEED_LISTS[0]);
        example.description = Some("Book a table at the favourite cafe nearby.".to_string());
        example.due = Some(today);
        example.tags = vec![SEED_TAGS[0].to_string()];
        example.subtasks = vec![
            Subtask::new(ids.new_id(), "Make the reservation"),
            Subtask::new(ids.new_id(), "Buy flowers"),
        ];

        Self {
            lists: SEED_LISTS.iter().map(|s| s.to_string()).collect(),
            tags: SEED_TAGS.iter().map(|s| s.to_string()).collect(),
            tasks: vec![example],
        }
    }

    pub fn has_list(&self, name: &str) -> bool {
        self.lists.iter().any(|l| l == name)
    }

    pub fn has_tag(&self, name: &str) -> bool {
        self.tags.iter().any(|t| t == name)
    }

    /// Restores store invariants on externally supplied state.
    ///
    /// - Repeated list and tag names are dropped, keeping the first.
    /// - List names referenced by tasks but missing from `lists` are
    ///   appended in first-reference order.
    /// - An empty result receives `default_list`.
    /// - Only the first draft task stays a draft; later ones become normal
    ///   tasks.
    ///
    /// Returns whether anything changed.
    pub fn repair(&mut self, default_list: &str) -> bool {
        let mut changed = dedupe(&mut self.lists) | dedupe(&mut self.tags);

        for task in &self.tasks {
            if !self.lists.iter().any(|l| *l == task.list) {
                self.lists.push(task.list.clone());
                changed = true;
            }
        }
        if self.lists.is_empty() {
            self.lists.push(default_list.to_string());
            changed = true;
        }

        let mut seen_draft = false;
        for task in self.tasks.iter_mut().filter(|t| t.draft) {
            if seen_draft {
                task.draft = false;
                changed = true;
            }
            seen_draft = true;
        }
        changed
    }
}

fn dedupe(names: &mut Vec<String>) -> bool {
    let before = names.len();
    let mut seen = HashSet::new();
    names.retain(|name| seen.insert(name.clone()));
    names.len() != before
}

/// Normalizes a list/tag name: trims and collapses inner whitespace.
///
/// Returns `None` for blank input.
pub fn normalize_name(raw: &str) -> Option<String> {
    let collapsed = WHITESPACE_RE.replace_all(raw.trim(), " ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed.into_owned())
    }
}
