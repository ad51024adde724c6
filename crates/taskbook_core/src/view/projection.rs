//! Task filtering by list, title search and due day.
//!
//! # Responsibility
//! - Define `ViewState`, the explicit filter input.
//! - Compute the ordered visible subset and memoize the last result.
//!
//! # Invariants
//! - Output preserves the relative order of the input tasks.
//! - A cached result is reused only for the same store revision and view.

use crate::model::due_date::DueDate;
use crate::model::task::Task;

/// Filter parameters supplied by the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ViewState {
    /// Restrict to one list; `None` shows all lists.
    pub active_list: Option<String>,
    /// Case-insensitive title substring; empty matches everything.
    pub query: String,
    /// Restrict to tasks due on this day.
    pub selected_date: Option<DueDate>,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_active_list(mut self, list: impl Into<String>) -> Self {
        self.active_list = Some(list.into());
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    pub fn with_selected_date(mut self, date: DueDate) -> Self {
        self.selected_date = Some(date);
        self
    }

    pub fn without_selected_date(mut self) -> Self {
        self.selected_date = None;
        self
    }

    /// Follows a list deletion: if `deleted` was active, `fallback` becomes
    /// active.
    pub fn after_list_deleted(mut self, deleted: &str, fallback: &str) -> Self {
        if self.active_list.as_deref() == Some(deleted) {
            self.active_list = Some(fallback.to_string());
        }
        self
    }

    /// Returns whether `task` passes all three filters.
    pub fn matches(&self, task: &Task) -> bool {
        let list_ok = self
            .active_list
            .as_deref()
            .map_or(true, |list| task.list == list);
        let query_ok = self.query.is_empty()
            || task
                .title
                .to_lowercase()
                .contains(&self.query.to_lowercase());
        let date_ok = self
            .selected_date
            .map_or(true, |date| task.due == Some(date));
        list_ok && query_ok && date_ok
    }
}

/// Returns the tasks visible under `view`, in original order.
pub fn project<'a>(tasks: &'a [Task], view: &ViewState) -> Vec<&'a Task> {
    tasks.iter().filter(|task| view.matches(task)).collect()
}

/// Single-entry memo of the last projection.
#[derive(Debug, Default)]
pub struct ProjectionCache {
    key: Option<(u64, ViewState)>,
    visible: Vec<Task>,
}

impl ProjectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the projection for `(revision, view)`, recomputing on a miss.
    pub fn get_or_compute(&mut self, revision: u64, tasks: &[Task], view: &ViewState) -> Vec<Task> {
        let hit = matches!(&self.key, Some((rev, cached)) if *rev == revision && cached == view);
        if !hit {
            self.visible = project(tasks, view).into_iter().cloned().collect();
            self.key = Some((revision, view.clone()));
        }
        self.visible.clone()
    }

    pub fn invalidate(&mut self) {
        self.key = None;
        self.visible.clear();
    }
}
