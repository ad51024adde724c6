//! Task and subtask domain model.
//!
//! # Responsibility
//! - Define the task record shared by the store, persistence and snapshots.
//! - Provide field-level helpers used by store mutations.
//!
//! # Invariants
//! - `id` is stable for the task lifetime and never reused.
//! - Subtasks are owned by exactly one task; subtask ids are unique within it.
//! - Serialized field names are the storage/exchange compatibility contract.

use crate::model::due_date::{deserialize_optional_due, DueDate};
use serde::{Deserialize, Serialize};

/// Opaque task identifier.
///
/// Kept as a plain string so imported documents may carry any id shape.
pub type TaskId = String;

/// Opaque subtask identifier, unique within its parent task.
pub type SubtaskId = String;

/// Title given to freshly created draft tasks.
pub const DRAFT_TASK_TITLE: &str = "New task";

/// Checklist item nested inside a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    pub id: SubtaskId,
    pub title: String,
    #[serde(default)]
    pub done: bool,
}

impl Subtask {
    pub fn new(id: impl Into<SubtaskId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            done: false,
        }
    }
}

/// One to-do item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    /// Display title. Not validated here; any string is accepted.
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Name of the owning list; must be a member of the store lists.
    pub list: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_due"
    )]
    pub due: Option<DueDate>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
    #[serde(default)]
    pub done: bool,
    /// Transient creation state; at most one task carries it.
    #[serde(default, skip_serializing_if = "is_false")]
    pub draft: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Task {
    /// Creates a confirmed, open task with no optional fields.
    pub fn new(id: impl Into<TaskId>, title: impl Into<String>, list: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            list: list.into(),
            due: None,
            tags: Vec::new(),
            subtasks: Vec::new(),
            done: false,
            draft: false,
        }
    }

    /// Creates a draft task placeholder in `list`.
    pub fn draft(id: impl Into<TaskId>, list: impl Into<String>) -> Self {
        let mut task = Self::new(id, DRAFT_TASK_TITLE, list);
        task.draft = true;
        task
    }

    pub fn subtask(&self, subtask_id: &str) -> Option<&Subtask> {
        self.subtasks.iter().find(|s| s.id == subtask_id)
    }

    pub fn subtask_mut(&mut self, subtask_id: &str) -> Option<&mut Subtask> {
        self.subtasks.iter_mut().find(|s| s.id == subtask_id)
    }

    /// Removes one subtask by id, returning it when present.
    pub fn remove_subtask(&mut self, subtask_id: &str) -> Option<Subtask> {
        let idx = self.subtasks.iter().position(|s| s.id == subtask_id)?;
        Some(self.subtasks.remove(idx))
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Number of finished subtasks, for progress display.
    pub fn completed_subtasks(&self) -> usize {
        self.subtasks.iter().filter(|s| s.done).count()
    }

    /// Merges `patch` into this task. Returns whether any field changed.
    pub fn apply_patch(&mut self, patch: TaskPatch) -> bool {
        let before = self.clone();
        let TaskPatch {
            title,
            description,
            list,
            due,
            tags,
            subtasks,
            done,
        } = patch;

        if let Some(title) = title {
            self.title = title;
        }
        if let Some(description) = description {
            self.description = description;
        }
        if let Some(list) = list {
            self.list = list;
        }
        if let Some(due) = due {
            self.due = due;
        }
        if let Some(tags) = tags {
            self.tags = tags;
        }
        if let Some(subtasks) = subtasks {
            self.subtasks = subtasks;
        }
        if let Some(done) = done {
            self.done = done;
        }

        *self != before
    }
}

/// Partial task edit. `None` leaves a field untouched.
///
/// `description` and `due` are doubly optional so a patch can clear them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub list: Option<String>,
    pub due: Option<Option<DueDate>>,
    pub tags: Option<Vec<String>>,
    pub subtasks: Option<Vec<Subtask>>,
    pub done: Option<bool>,
}

impl TaskPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(Some(description.into()));
        self
    }

    pub fn clear_description(mut self) -> Self {
        self.description = Some(None);
        self
    }

    pub fn list(mut self, list: impl Into<String>) -> Self {
        self.list = Some(list.into());
        self
    }

    pub fn due(mut self, due: DueDate) -> Self {
        self.due = Some(Some(due));
        self
    }

    pub fn clear_due(mut self) -> Self {
        self.due = Some(None);
        self
    }

    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.tags = Some(tags);
        self
    }

    pub fn subtasks(mut self, subtasks: Vec<Subtask>) -> Self {
        self.subtasks = Some(subtasks);
        self
    }

    pub fn done(mut self, done: bool) -> Self {
        self.done = Some(done);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::{Subtask, Task, TaskPatch, DRAFT_TASK_TITLE};
    use crate::model::due_date::DueDate;

    #[test]
    fn draft_starts_open_and_empty() {
        let task = Task::draft("t1", "Personal");
        assert!(task.draft);
        assert!(!task.done);
        assert_eq!(task.title, DRAFT_TASK_TITLE);
        assert!(task.tags.is_empty());
        assert!(task.subtasks.is_empty());
    }

    #[test]
    fn patch_merges_only_given_fields() {
        let mut task = Task::new("t1", "old", "Personal");
        task.description = Some("keep me".to_string());

        let changed = task.apply_patch(
            TaskPatch::new()
                .title("Buy milk")
                .due(DueDate::parse("2024-03-10").unwrap()),
        );

        assert!(changed);
        assert_eq!(task.title, "Buy milk");
        assert_eq!(task.description.as_deref(), Some("keep me"));
        assert_eq!(task.due.map(|d| d.to_string()).as_deref(), Some("2024-03-10"));
    }

    #[test]
    fn patch_can_clear_optional_fields() {
        let mut task = Task::new("t1", "title", "Personal");
        task.description = Some("text".to_string());
        task.due = DueDate::from_ymd(2024, 1, 1);

        assert!(task.apply_patch(TaskPatch::new().clear_description().clear_due()));
        assert!(task.description.is_none());
        assert!(task.due.is_none());
    }

    #[test]
    fn identical_patch_reports_no_change() {
        let mut task = Task::new("t1", "same", "Personal");
        assert!(!task.apply_patch(TaskPatch::new().title("same")));
        assert!(TaskPatch::new().is_empty());
    }

    #[test]
    fn serde_omits_absent_fields_and_reads_empty_due_as_none() {
        let task = Task::new("t1", "title", "Work");
        let json = serde_json::to_value(&task).unwrap();
        assert!(json.get("due").is_none());
        assert!(json.get("draft").is_none());
        assert!(json.get("description").is_none());

        let parsed: Task = serde_json::from_str(
            r#"{"id":"a","title":"x","list":"Work","due":"","subtasks":[{"id":"s","title":"y"}]}"#,
        )
        .unwrap();
        assert!(parsed.due.is_none());
        assert!(!parsed.draft);
        assert_eq!(parsed.subtasks, vec![Subtask::new("s", "y")]);
    }
}
