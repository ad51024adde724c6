//! In-memory task store and its mutation operations.
//!
//! # Responsibility
//! - Hold the current `StoreState`, the selected task and a change revision.
//! - Apply task, subtask, list and tag mutations with their cascades.
//!
//! # Invariants
//! - Lists is never empty; every task's `list` is a member of Lists.
//! - At most one task has `draft = true`.
//! - New tasks are prepended; every other operation preserves order.
//! - `revision` increases exactly when state changes.

use crate::id::IdGenerator;
use crate::model::state::{normalize_name, StoreState};
use crate::model::task::{Subtask, SubtaskId, Task, TaskId, TaskPatch};
use crate::store::{StoreError, StoreResult};

/// Outcome of deleting a list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRemoval {
    /// List every orphaned task was moved to.
    pub fallback: String,
    /// Number of tasks reassigned to `fallback`.
    pub reassigned: usize,
}

/// Owner of lists, tags and tasks.
#[derive(Debug, Clone)]
pub struct TaskStore {
    state: StoreState,
    default_list: String,
    selected: Option<TaskId>,
    revision: u64,
}

impl TaskStore {
    /// Wraps `state`, repairing list invariants first.
    pub fn new(mut state: StoreState, default_list: impl Into<String>) -> Self {
        let default_list = default_list.into();
        state.repair(&default_list);
        Self {
            state,
            default_list,
            selected: None,
            revision: 0,
        }
    }

    pub fn state(&self) -> &StoreState {
        &self.state
    }

    pub fn lists(&self) -> &[String] {
        &self.state.lists
    }

    pub fn tags(&self) -> &[String] {
        &self.state.tags
    }

    pub fn tasks(&self) -> &[Task] {
        &self.state.tasks
    }

    pub fn default_list(&self) -> &str {
        &self.default_list
    }

    /// Monotonic change counter; used as a projection cache key.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn task(&self, task_id: &str) -> Option<&Task> {
        self.state.tasks.iter().find(|t| t.id == task_id)
    }

    pub fn draft_task(&self) -> Option<&Task> {
        self.state.tasks.iter().find(|t| t.draft)
    }

    pub fn has_draft(&self) -> bool {
        self.draft_task().is_some()
    }

    pub fn selected_task_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn selected_task(&self) -> Option<&Task> {
        self.selected.as_deref().and_then(|id| self.task(id))
    }

    /// Selects an existing task. Unknown ids leave the selection unchanged.
    pub fn select(&mut self, task_id: &str) -> bool {
        if self.task(task_id).is_none() {
            return false;
        }
        self.selected = Some(task_id.to_string());
        true
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Open (not done) task count per list, in list order.
    pub fn open_counts(&self) -> Vec<(String, usize)> {
        self.state
            .lists
            .iter()
            .map(|list| {
                let open = self
                    .state
                    .tasks
                    .iter()
                    .filter(|t| t.list == *list && !t.done)
                    .count();
                (list.clone(), open)
            })
            .collect()
    }

    // === Tasks ===

    /// Starts a new task in draft state, prepends it and selects it.
    ///
    /// Falls back to the first list when `list` is unknown.
    ///
    /// # Errors
    /// - `DraftAlreadyExists` while another draft is pending.
    pub fn create_draft_task(&mut self, ids: &dyn IdGenerator, list: &str) -> StoreResult<Task> {
        if let Some(existing) = self.draft_task() {
            return Err(StoreError::DraftAlreadyExists {
                id: existing.id.clone(),
            });
        }

        let list = if self.state.has_list(list) {
            list.to_string()
        } else {
            self.first_list()
        };
        let task = Task::draft(ids.new_id(), list);
        self.state.tasks.insert(0, task.clone());
        self.selected = Some(task.id.clone());
        self.touch();
        Ok(task)
    }

    /// Turns the draft `task_id` into a normal task and closes the selection.
    pub fn confirm_draft(&mut self, task_id: &str) -> bool {
        let Some(task) = self.task_mut(task_id) else {
            return false;
        };
        if !task.draft {
            return false;
        }
        task.draft = false;
        if self.selected.as_deref() == Some(task_id) {
            self.selected = None;
        }
        self.touch();
        true
    }

    /// Deletes `task_id` only if it is still a draft.
    pub fn discard_draft(&mut self, task_id: &str) -> bool {
        match self.task(task_id) {
            Some(task) if task.draft => self.delete_task(task_id),
            _ => false,
        }
    }

    /// Removes a task and clears the selection if it pointed at it.
    pub fn delete_task(&mut self, task_id: &str) -> bool {
        let Some(idx) = self.position(task_id) else {
            return false;
        };
        self.state.tasks.remove(idx);
        if self.selected.as_deref() == Some(task_id) {
            self.selected = None;
        }
        self.touch();
        true
    }

    /// Flips `done`. Subtasks are not affected.
    pub fn toggle_done(&mut self, task_id: &str) -> bool {
        let Some(task) = self.task_mut(task_id) else {
            return false;
        };
        task.done = !task.done;
        self.touch();
        true
    }

    /// Merges `patch` into the task. Unknown ids are a no-op (`Ok(false)`).
    ///
    /// # Errors
    /// - `UnknownList` when the patch moves the task to a missing list; no
    ///   field is applied in that case.
    pub fn update_task(&mut self, task_id: &str, patch: TaskPatch) -> StoreResult<bool> {
        let Some(idx) = self.position(task_id) else {
            return Ok(false);
        };
        if let Some(list) = patch.list.as_deref() {
            if !self.state.has_list(list) {
                return Err(StoreError::UnknownList(list.to_string()));
            }
        }

        let changed = self.state.tasks[idx].apply_patch(patch);
        if changed {
            self.touch();
        }
        Ok(changed)
    }

    // === Subtasks ===

    /// Appends a subtask to `task_id`, returning the new subtask id.
    pub fn add_subtask(
        &mut self,
        ids: &dyn IdGenerator,
        task_id: &str,
        title: impl Into<String>,
    ) -> Option<SubtaskId> {
        let task = self.task_mut(task_id)?;
        let subtask = Subtask::new(ids.new_id(), title);
        let subtask_id = subtask.id.clone();
        task.subtasks.push(subtask);
        self.touch();
        Some(subtask_id)
    }

    pub fn toggle_subtask(&mut self, task_id: &str, subtask_id: &str) -> bool {
        let Some(subtask) = self.subtask_mut(task_id, subtask_id) else {
            return false;
        };
        subtask.done = !subtask.done;
        self.touch();
        true
    }

    pub fn rename_subtask(&mut self, task_id: &str, subtask_id: &str, title: &str) -> bool {
        let Some(subtask) = self.subtask_mut(task_id, subtask_id) else {
            return false;
        };
        if subtask.title == title {
            return false;
        }
        subtask.title = title.to_string();
        self.touch();
        true
    }

    pub fn remove_subtask(&mut self, task_id: &str, subtask_id: &str) -> bool {
        let removed = self
            .task_mut(task_id)
            .and_then(|task| task.remove_subtask(subtask_id))
            .is_some();
        if removed {
            self.touch();
        }
        removed
    }

    // === Task tags ===

    /// Adds `tag` to one task unless it already carries it.
    pub fn attach_tag(&mut self, task_id: &str, tag: &str) -> bool {
        let Some(tag) = normalize_name(tag) else {
            return false;
        };
        let Some(task) = self.task_mut(task_id) else {
            return false;
        };
        if task.has_tag(&tag) {
            return false;
        }
        task.tags.push(tag);
        self.touch();
        true
    }

    /// Removes every occurrence of `tag` from one task. The name is
    /// normalized the same way `attach_tag` does it.
    pub fn detach_tag(&mut self, task_id: &str, tag: &str) -> bool {
        let Some(tag) = normalize_name(tag) else {
            return false;
        };
        let Some(task) = self.task_mut(task_id) else {
            return false;
        };
        let before = task.tags.len();
        task.tags.retain(|t| *t != tag);
        let changed = task.tags.len() != before;
        if changed {
            self.touch();
        }
        changed
    }

    // === Lists ===

    /// Appends a normalized list name. Returns it when newly added.
    pub fn add_list(&mut self, name: &str) -> Option<String> {
        let name = normalize_name(name)?;
        if self.state.has_list(&name) {
            return None;
        }
        self.state.lists.push(name.clone());
        self.touch();
        Some(name)
    }

    /// Removes a list and moves its tasks to the first remaining list,
    /// inserting the default list when none remain.
    pub fn delete_list(&mut self, name: &str) -> Option<ListRemoval> {
        let idx = self.state.lists.iter().position(|l| l == name)?;
        self.state.lists.remove(idx);
        if self.state.lists.is_empty() {
            self.state.lists.push(self.default_list.clone());
        }
        let fallback = self.first_list();

        let mut reassigned = 0;
        for task in self.state.tasks.iter_mut().filter(|t| t.list == name) {
            task.list = fallback.clone();
            reassigned += 1;
        }
        self.touch();

        Some(ListRemoval {
            fallback,
            reassigned,
        })
    }

    // === Tag vocabulary ===

    /// Appends a normalized tag name. Returns it when newly added.
    pub fn add_tag(&mut self, name: &str) -> Option<String> {
        let name = normalize_name(name)?;
        if self.state.has_tag(&name) {
            return None;
        }
        self.state.tags.push(name.clone());
        self.touch();
        Some(name)
    }

    /// Removes a tag from the vocabulary only; tasks keep their copies.
    pub fn remove_tag(&mut self, name: &str) -> bool {
        let before = self.state.tags.len();
        self.state.tags.retain(|t| t != name);
        let changed = self.state.tags.len() != before;
        if changed {
            self.touch();
        }
        changed
    }

    // === Whole state ===

    /// Swaps in a complete new state (snapshot import).
    ///
    /// The selection survives only if its task still exists.
    pub fn replace_state(&mut self, mut state: StoreState) {
        state.repair(&self.default_list);
        self.state = state;
        if self.selected_task().is_none() {
            self.selected = None;
        }
        self.touch();
    }

    fn first_list(&self) -> String {
        self.state
            .lists
            .first()
            .cloned()
            .unwrap_or_else(|| self.default_list.clone())
    }

    fn position(&self, task_id: &str) -> Option<usize> {
        self.state.tasks.iter().position(|t| t.id == task_id)
    }

    fn task_mut(&mut self, task_id: &str) -> Option<&mut Task> {
        self.state.tasks.iter_mut().find(|t| t.id == task_id)
    }

    fn subtask_mut(&mut self, task_id: &str, subtask_id: &str) -> Option<&mut Subtask> {
        self.task_mut(task_id)?.subtask_mut(subtask_id)
    }

    fn touch(&mut self) {
        self.revision += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::TaskStore;
    use crate::id::PseudoRandomIdGenerator;
    use crate::model::state::StoreState;
    use crate::model::task::{Task, TaskPatch};
    use crate::store::StoreError;

    fn store_with(lists: &[&str], tasks: Vec<Task>) -> TaskStore {
        let state = StoreState::new(
            lists.iter().map(|l| l.to_string()).collect(),
            Vec::new(),
            tasks,
        );
        TaskStore::new(state, "Personal")
    }

    #[test]
    fn draft_is_prepended_and_selected() {
        let ids = PseudoRandomIdGenerator::with_seed(1);
        let mut store = store_with(&["Personal"], vec![Task::new("old", "old", "Personal")]);

        let draft = store.create_draft_task(&ids, "Personal").unwrap();
        assert_eq!(store.tasks()[0].id, draft.id);
        assert_eq!(store.selected_task_id(), Some(draft.id.as_str()));
        assert_eq!(store.revision(), 1);
    }

    #[test]
    fn second_draft_is_rejected() {
        let ids = PseudoRandomIdGenerator::with_seed(1);
        let mut store = store_with(&["Personal"], Vec::new());
        let first = store.create_draft_task(&ids, "Personal").unwrap();

        let err = store.create_draft_task(&ids, "Personal").unwrap_err();
        assert_eq!(err, StoreError::DraftAlreadyExists { id: first.id });
        assert_eq!(store.tasks().len(), 1);
    }

    #[test]
    fn draft_in_unknown_list_uses_first_list() {
        let ids = PseudoRandomIdGenerator::with_seed(1);
        let mut store = store_with(&["Work", "Home"], Vec::new());
        let draft = store.create_draft_task(&ids, "Nowhere").unwrap();
        assert_eq!(draft.list, "Work");
    }

    #[test]
    fn update_rejects_unknown_list_without_partial_apply() {
        let mut store = store_with(&["Personal"], vec![Task::new("t", "title", "Personal")]);
        let err = store
            .update_task("t", TaskPatch::new().title("changed").list("Ghost"))
            .unwrap_err();
        assert_eq!(err, StoreError::UnknownList("Ghost".to_string()));
        assert_eq!(store.task("t").unwrap().title, "title");
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn missing_ids_are_silent_no_ops() {
        let ids = PseudoRandomIdGenerator::with_seed(1);
        let mut store = store_with(&["Personal"], Vec::new());
        assert!(!store.delete_task("nope"));
        assert!(!store.toggle_done("nope"));
        assert!(!store.confirm_draft("nope"));
        assert_eq!(store.update_task("nope", TaskPatch::new().title("x")), Ok(false));
        assert!(store.add_subtask(&ids, "nope", "sub").is_none());
        assert!(!store.toggle_subtask("nope", "s"));
        assert!(!store.rename_subtask("nope", "s", "x"));
        assert!(!store.remove_subtask("nope", "s"));
        assert!(store.delete_list("nope").is_none());
        assert!(!store.remove_tag("nope"));
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn open_counts_ignore_done_tasks() {
        let mut done = Task::new("b", "b", "Work");
        done.done = true;
        let store = store_with(
            &["Personal", "Work"],
            vec![Task::new("a", "a", "Work"), done, Task::new("c", "c", "Personal")],
        );
        assert_eq!(
            store.open_counts(),
            vec![("Personal".to_string(), 1), ("Work".to_string(), 1)]
        );
    }

    #[test]
    fn detach_tag_matches_attach_normalization() {
        let mut store = store_with(&["Personal"], vec![Task::new("t", "t", "Personal")]);
        assert!(store.attach_tag("t", " Gift "));
        assert_eq!(store.task("t").unwrap().tags, vec!["Gift"]);

        assert!(store.detach_tag("t", "  Gift"));
        assert!(store.task("t").unwrap().tags.is_empty());
        assert!(!store.detach_tag("t", "   "));
    }

    #[test]
    fn replace_state_drops_stale_selection() {
        let mut store = store_with(&["Personal"], vec![Task::new("t", "t", "Personal")]);
        assert!(store.select("t"));
        store.replace_state(StoreState::with_default_list("Personal"));
        assert!(store.selected_task_id().is_none());
    }
}
